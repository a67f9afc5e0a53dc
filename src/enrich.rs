use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};

use crate::input::{LiveUpdate, Station};
use crate::schedule::ScheduleDocument;

pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn offset_timestamp(base: NaiveDateTime, minutes: i64) -> Option<String> {
    let delta = Duration::try_minutes(minutes)?;
    let stamp = base.checked_add_signed(delta)?;
    Some(stamp.format(TIME_FORMAT).to_string())
}

/// Fills in absolute timestamps and station display names. Each train's
/// relative minutes count from its reported actual departure when one
/// was given, otherwise from the shared base time. Unknown stations
/// keep their raw id as the display name.
pub fn enrich_with_timestamps(
    doc: &mut ScheduleDocument,
    base_now: NaiveDateTime,
    stations: &[Station],
    updates: &HashMap<String, LiveUpdate>,
) {
    let names: HashMap<&str, &str> = stations
        .iter()
        .filter_map(|s| s.name.as_deref().map(|name| (s.id.as_str(), name)))
        .collect();

    for (train_id, train) in doc.trains.iter_mut() {
        if train.schedule.is_empty() {
            continue;
        }
        let base = updates
            .get(train_id)
            .and_then(|u| u.actual_departure)
            .unwrap_or(base_now);
        for interval in train.schedule.iter_mut() {
            if let Some(name) = names.get(interval.from.as_str()) {
                interval.from_name = (*name).to_string();
            }
            if let Some(name) = names.get(interval.to.as_str()) {
                interval.to_name = (*name).to_string();
            }
            interval.start_time = offset_timestamp(base, interval.start_min);
            interval.end_time = offset_timestamp(base, interval.end_min);
        }
    }
}
