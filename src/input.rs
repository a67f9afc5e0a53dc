use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};

/// Reference station record.
#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub id: String,
    /// Display name; schedules fall back to the raw id when absent.
    #[serde(default, alias = "station_name")]
    pub name: Option<String>,
}

/// One undirected track between two stations.
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    /// Identifier; synthesized positionally (`TRKnnnn`) when empty.
    #[serde(default, alias = "track_id")]
    pub id: String,
    #[serde(alias = "from_station_id", alias = "source_station_id")]
    pub source: String,
    #[serde(alias = "to_station_id", alias = "destination_station_id")]
    pub destination: String,
    #[serde(default = "default_distance", alias = "distance")]
    pub distance_km: f64,
    /// Line speed limit in km/h.
    #[serde(default = "default_speed", alias = "max_speed_kmph")]
    pub speed_limit: f64,
    /// Determines capacity: "double" admits two trains at once, anything
    /// else one.
    #[serde(default, alias = "type", alias = "track_class")]
    pub track_type: Option<String>,
    #[serde(default = "default_track_status", alias = "track_status")]
    pub status: String,
}

impl Track {
    pub fn capacity(&self) -> u32 {
        match self.track_type.as_deref().map(|t| t.trim().to_lowercase()) {
            Some(t) if t == "double" => 2,
            _ => 1,
        }
    }
}

/// A train and its planned route.
#[derive(Debug, Clone, Deserialize)]
pub struct Train {
    #[serde(alias = "train_id")]
    pub id: String,
    /// Ordered station ids; accepts a list or a comma-separated string.
    #[serde(
        deserialize_with = "route_list",
        alias = "scheduled_route",
        alias = "scheduled_stations"
    )]
    pub route: Vec<String>,
    #[serde(default = "default_speed", alias = "max_speed_kmph")]
    pub max_speed: f64,
    /// Lower value = more important; observed range 1-5.
    #[serde(default = "default_priority", alias = "priority_level")]
    pub priority: i32,
}

/// Latest live signal for one train.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveUpdate {
    #[serde(alias = "train_id")]
    pub train: String,
    /// Reported delay; becomes the earliest start of the first segment.
    #[serde(default)]
    pub delay_minutes: i32,
    #[serde(default = "default_weather", alias = "weather_impact")]
    pub weather: String,
    #[serde(default = "default_condition", alias = "track_status")]
    pub track_condition: String,
    /// When present, anchors this train's absolute timestamps.
    #[serde(default, alias = "actual_departure_time")]
    pub actual_departure: Option<NaiveDateTime>,
}

/// Everything one optimization run consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkInput {
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub trains: Vec<Train>,
    #[serde(default)]
    pub updates: Vec<LiveUpdate>,
}

fn default_distance() -> f64 {
    1.0
}

fn default_speed() -> f64 {
    100.0
}

fn default_priority() -> i32 {
    3
}

fn default_track_status() -> String {
    "operational".to_string()
}

fn default_weather() -> String {
    "clear".to_string()
}

fn default_condition() -> String {
    "free".to_string()
}

fn route_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Route {
        Stations(Vec<String>),
        Joined(String),
    }

    let stations = match Route::deserialize(deserializer)? {
        Route::Stations(stations) => stations,
        Route::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(stations
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    NoTracks,
    NoTrains,
    DuplicateStation(String),
    DuplicateTrack(String),
    DuplicateTrain(String),
    UnroutableTrain(String),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::NoTracks => write!(f, "no tracks in input"),
            InputError::NoTrains => write!(f, "no trains in input"),
            InputError::DuplicateStation(id) => write!(f, "duplicate station id {}", id),
            InputError::DuplicateTrack(id) => write!(f, "duplicate track id {}", id),
            InputError::DuplicateTrain(id) => write!(f, "duplicate train id {}", id),
            InputError::UnroutableTrain(id) => {
                write!(f, "train {} has no resolvable route", id)
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Non-fatal finding reported alongside the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub train: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    RouteGap,
    ShortRoute,
    UnknownUpdateTrain,
}

/// Normalizes the input in place and validates it: synthesizes missing
/// track ids, applies the train cap, and rejects empty or duplicated
/// collections.
pub fn prepare(input: &mut NetworkInput, limit_trains: Option<usize>) -> Result<(), InputError> {
    for (idx, track) in input.tracks.iter_mut().enumerate() {
        if track.id.is_empty() {
            track.id = format!("TRK{:04}", idx);
        }
    }
    if let Some(cap) = limit_trains {
        input.trains.truncate(cap);
    }
    validate(input)
}

pub fn validate(input: &NetworkInput) -> Result<(), InputError> {
    if input.tracks.is_empty() {
        return Err(InputError::NoTracks);
    }
    if input.trains.is_empty() {
        return Err(InputError::NoTrains);
    }
    let mut station_ids = HashSet::new();
    for station in &input.stations {
        if !station_ids.insert(station.id.as_str()) {
            return Err(InputError::DuplicateStation(station.id.clone()));
        }
    }
    let mut track_ids = HashSet::new();
    for track in &input.tracks {
        if !track_ids.insert(track.id.as_str()) {
            return Err(InputError::DuplicateTrack(track.id.clone()));
        }
    }
    let mut train_ids = HashSet::new();
    for train in &input.trains {
        if !train_ids.insert(train.id.as_str()) {
            return Err(InputError::DuplicateTrain(train.id.clone()));
        }
    }
    Ok(())
}

/// Folds the update list down to the latest entry per train. Updates for
/// trains not present in this run are dropped with a diagnostic.
pub fn latest_updates(input: &NetworkInput) -> (HashMap<String, LiveUpdate>, Vec<Diagnostic>) {
    let known: HashSet<&str> = input.trains.iter().map(|t| t.id.as_str()).collect();
    let mut latest = HashMap::new();
    let mut diagnostics = Vec::new();
    for update in &input.updates {
        if !known.contains(update.train.as_str()) {
            warn!("live update for unknown train {}", update.train);
            diagnostics.push(Diagnostic {
                train: update.train.clone(),
                kind: DiagnosticKind::UnknownUpdateTrain,
                message: "live update references a train not in this run".to_string(),
            });
            continue;
        }
        latest.insert(update.train.clone(), update.clone());
    }
    (latest, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_defaults() {
        let track: Track =
            serde_json::from_str(r#"{"source": "A", "destination": "B"}"#).unwrap();
        assert_eq!(track.id, "");
        assert_eq!(track.distance_km, 1.0);
        assert_eq!(track.speed_limit, 100.0);
        assert_eq!(track.status, "operational");
        assert_eq!(track.capacity(), 1);
    }

    #[test]
    fn track_capacity_from_type() {
        let single: Track = serde_json::from_str(
            r#"{"source": "A", "destination": "B", "track_type": "single"}"#,
        )
        .unwrap();
        let double: Track = serde_json::from_str(
            r#"{"source": "A", "destination": "B", "track_type": " Double "}"#,
        )
        .unwrap();
        let odd: Track = serde_json::from_str(
            r#"{"source": "A", "destination": "B", "track_type": "triple"}"#,
        )
        .unwrap();
        assert_eq!(single.capacity(), 1);
        assert_eq!(double.capacity(), 2);
        assert_eq!(odd.capacity(), 1);
    }

    #[test]
    fn route_accepts_list_and_string() {
        let listed: Train =
            serde_json::from_str(r#"{"id": "T1", "route": ["A", " B ", "C"]}"#).unwrap();
        let joined: Train =
            serde_json::from_str(r#"{"id": "T1", "route": "A, B ,C,"}"#).unwrap();
        assert_eq!(listed.route, vec!["A", "B", "C"]);
        assert_eq!(joined.route, listed.route);
        assert_eq!(listed.priority, 3);
        assert_eq!(listed.max_speed, 100.0);
    }

    #[test]
    fn legacy_column_aliases() {
        let train: Train = serde_json::from_str(
            r#"{"train_id": "T9", "scheduled_route": "A,B", "priority_level": 1, "max_speed_kmph": 80}"#,
        )
        .unwrap();
        assert_eq!(train.id, "T9");
        assert_eq!(train.priority, 1);
        assert_eq!(train.max_speed, 80.0);

        let update: LiveUpdate = serde_json::from_str(
            r#"{"train_id": "T9", "weather_impact": "rain", "track_status": "occupied",
                "actual_departure_time": "2025-01-01T08:30:00"}"#,
        )
        .unwrap();
        assert_eq!(update.weather, "rain");
        assert_eq!(update.track_condition, "occupied");
        assert_eq!(
            update.actual_departure,
            Some(
                NaiveDateTime::parse_from_str("2025-01-01T08:30:00", "%Y-%m-%dT%H:%M:%S").unwrap()
            )
        );
        assert_eq!(update.delay_minutes, 0);
    }

    fn small_input() -> NetworkInput {
        serde_json::from_str(
            r#"{
                "tracks": [{"source": "A", "destination": "B"}],
                "trains": [
                    {"id": "T1", "route": "A,B"},
                    {"id": "T2", "route": "A,B"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn prepare_synthesizes_track_ids_and_caps_trains() {
        let mut input = small_input();
        prepare(&mut input, Some(1)).unwrap();
        assert_eq!(input.tracks[0].id, "TRK0000");
        assert_eq!(input.trains.len(), 1);
    }

    #[test]
    fn validate_rejects_empty_and_duplicate_collections() {
        let mut empty_tracks = small_input();
        empty_tracks.tracks.clear();
        assert_eq!(validate(&empty_tracks), Err(InputError::NoTracks));

        let mut empty_trains = small_input();
        empty_trains.trains.clear();
        assert_eq!(validate(&empty_trains), Err(InputError::NoTrains));

        let mut dup = small_input();
        dup.trains[1].id = "T1".to_string();
        assert_eq!(
            validate(&dup),
            Err(InputError::DuplicateTrain("T1".to_string()))
        );
    }

    #[test]
    fn latest_update_per_train_wins() {
        let input: NetworkInput = serde_json::from_str(
            r#"{
                "tracks": [{"source": "A", "destination": "B"}],
                "trains": [{"id": "T1", "route": "A,B"}],
                "updates": [
                    {"train": "T1", "delay_minutes": 5},
                    {"train": "T1", "delay_minutes": 9},
                    {"train": "GHOST", "delay_minutes": 1}
                ]
            }"#,
        )
        .unwrap();
        let (latest, diagnostics) = latest_updates(&input);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["T1"].delay_minutes, 9);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownUpdateTrain);
        assert_eq!(diagnostics[0].train, "GHOST");
    }
}
