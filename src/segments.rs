use std::collections::HashMap;

use log::{debug, warn};

use crate::durations::segment_minutes;
use crate::input::{Diagnostic, DiagnosticKind, InputError, LiveUpdate, Train};
use crate::network::NetworkIndex;

/// One directed traversal of a track by one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub track_id: String,
    pub from: String,
    pub to: String,
    pub duration: i32,
    pub capacity: u32,
}

/// A train's route expanded into schedulable segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainPlan {
    pub id: String,
    pub priority: i32,
    pub release_delay: i32,
    pub segments: Vec<Segment>,
}

/// Expands every train's station list into segments, in route order.
///
/// A consecutive station pair with no track is skipped and reported as a
/// route gap; a train whose whole multi-stop route resolves to nothing is
/// a configuration error. Routes with fewer than two stations schedule
/// nothing and are reported as such.
pub fn segment_trains(
    trains: &[Train],
    index: &NetworkIndex,
    updates: &HashMap<String, LiveUpdate>,
) -> Result<(Vec<TrainPlan>, Vec<Diagnostic>), InputError> {
    let mut plans = Vec::with_capacity(trains.len());
    let mut diagnostics = Vec::new();

    for train in trains {
        let update = updates.get(train.id.as_str());
        let weather = update.map(|u| u.weather.as_str()).unwrap_or("clear");
        let condition = update.map(|u| u.track_condition.as_str()).unwrap_or("free");
        let release_delay = update.map(|u| u.delay_minutes).unwrap_or(0);

        if train.route.len() < 2 {
            warn!("train {} route is too short to schedule", train.id);
            diagnostics.push(Diagnostic {
                train: train.id.clone(),
                kind: DiagnosticKind::ShortRoute,
                message: "route needs at least two stations".to_string(),
            });
            plans.push(TrainPlan {
                id: train.id.clone(),
                priority: train.priority,
                release_delay,
                segments: Vec::new(),
            });
            continue;
        }

        let mut segments = Vec::with_capacity(train.route.len() - 1);
        for step in train.route.windows(2) {
            let (from, to) = (step[0].as_str(), step[1].as_str());
            let track = match index.find(from, to) {
                Some(track) => track,
                None => {
                    warn!("train {} has no track between {} and {}", train.id, from, to);
                    diagnostics.push(Diagnostic {
                        train: train.id.clone(),
                        kind: DiagnosticKind::RouteGap,
                        message: format!("no track between {} and {}", from, to),
                    });
                    continue;
                }
            };
            let duration = segment_minutes(
                track.distance_km,
                track.speed_limit,
                train.max_speed,
                weather,
                condition,
            );
            segments.push(Segment {
                track_id: track.id.clone(),
                from: from.to_string(),
                to: to.to_string(),
                duration,
                capacity: track.capacity(),
            });
        }

        if segments.is_empty() {
            return Err(InputError::UnroutableTrain(train.id.clone()));
        }

        debug!(
            "train {}: {} segments, release {}",
            train.id,
            segments.len(),
            release_delay
        );
        plans.push(TrainPlan {
            id: train.id.clone(),
            priority: train.priority,
            release_delay,
            segments,
        });
    }

    Ok((plans, diagnostics))
}
