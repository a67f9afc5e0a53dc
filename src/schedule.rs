use std::collections::BTreeMap;

use serde::Serialize;

use crate::input::Diagnostic;
use crate::problem::{SchedulingModel, TimeValue, TrainId};
use crate::segments::TrainPlan;
use crate::solvers::SolveOutcome;

/// One segment of a train's final schedule. Relative times are minutes
/// from the scheduling origin; absolute timestamps are filled in by
/// [`crate::enrich`].
#[derive(Debug, Serialize)]
pub struct ScheduledInterval {
    pub segment_index: usize,
    pub track_id: String,
    pub from: String,
    pub to: String,
    pub from_name: String,
    pub to_name: String,
    pub start_min: TimeValue,
    pub end_min: TimeValue,
    pub duration_min: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrainSchedule {
    pub priority: i32,
    pub release_delay_min: i32,
    pub schedule: Vec<ScheduledInterval>,
}

/// The top-level output document.
#[derive(Debug, Serialize)]
pub struct ScheduleDocument {
    pub status: String,
    pub objective: Option<i64>,
    pub horizon: TimeValue,
    pub trains: BTreeMap<String, TrainSchedule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turns a solver outcome back into per-train interval lists. Plans and
/// model rows correspond by position. Unsolved outcomes keep every
/// train's schedule empty.
pub fn extract(
    model: &SchedulingModel,
    plans: &[TrainPlan],
    outcome: &SolveOutcome,
    diagnostics: Vec<Diagnostic>,
) -> ScheduleDocument {
    let mut trains = BTreeMap::new();
    for (idx, plan) in plans.iter().enumerate() {
        let train_id = TrainId::from(idx);
        let mut schedule = Vec::new();
        if let Some(times) = &outcome.times {
            for (k, seg) in plan.segments.iter().enumerate() {
                let start = times[train_id][k];
                schedule.push(ScheduledInterval {
                    segment_index: k,
                    track_id: seg.track_id.clone(),
                    from: seg.from.clone(),
                    to: seg.to.clone(),
                    from_name: seg.from.clone(),
                    to_name: seg.to.clone(),
                    start_min: start,
                    end_min: start + seg.duration as TimeValue,
                    duration_min: seg.duration,
                    start_time: None,
                    end_time: None,
                });
            }
        }
        trains.insert(
            plan.id.clone(),
            TrainSchedule {
                priority: plan.priority,
                release_delay_min: plan.release_delay,
                schedule,
            },
        );
    }
    ScheduleDocument {
        status: outcome.status.name().to_string(),
        objective: outcome.objective,
        horizon: model.horizon,
        trains,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Segment;
    use crate::solvers::{SolveOutcome, SolveStats, SolveStatus};
    use typed_index_collections::TiVec;

    fn corridor_plans() -> Vec<TrainPlan> {
        let seg = |track: &str, from: &str, to: &str, duration: i32| Segment {
            track_id: track.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            duration,
            capacity: 1,
        };
        vec![
            TrainPlan {
                id: "T1".to_string(),
                priority: 1,
                release_delay: 0,
                segments: vec![seg("AB", "A", "B", 62), seg("BC", "B", "C", 32)],
            },
            TrainPlan {
                id: "T2".to_string(),
                priority: 5,
                release_delay: 4,
                segments: vec![seg("AB", "A", "B", 62), seg("BC", "B", "C", 32)],
            },
        ]
    }

    #[test]
    fn solved_outcome_yields_interval_rows() {
        let plans = corridor_plans();
        let model = SchedulingModel::build(&plans);
        let times: TiVec<TrainId, Vec<i64>> =
            vec![vec![0, 62], vec![62, 124]].into_iter().collect();
        let outcome = SolveOutcome {
            status: SolveStatus::Optimal,
            objective: Some(model.objective(&times)),
            times: Some(times),
            stats: SolveStats::default(),
        };
        let doc = extract(&model, &plans, &outcome, Vec::new());

        assert_eq!(doc.status, "OPTIMAL");
        assert_eq!(doc.horizon, 482);
        let t2 = &doc.trains["T2"];
        assert_eq!(t2.release_delay_min, 4);
        assert_eq!(t2.schedule.len(), 2);
        assert_eq!(t2.schedule[1].segment_index, 1);
        assert_eq!(t2.schedule[1].track_id, "BC");
        assert_eq!(t2.schedule[1].start_min, 124);
        assert_eq!(t2.schedule[1].end_min, 156);
        assert_eq!(t2.schedule[1].duration_min, 32);
        assert_eq!(t2.schedule[1].start_time, None);
    }

    #[test]
    fn unsolved_outcome_keeps_schedules_empty() {
        let plans = corridor_plans();
        let model = SchedulingModel::build(&plans);
        let outcome = SolveOutcome {
            status: SolveStatus::Unknown,
            times: None,
            objective: None,
            stats: SolveStats::default(),
        };
        let doc = extract(&model, &plans, &outcome, Vec::new());
        assert_eq!(doc.status, "UNKNOWN");
        assert_eq!(doc.objective, None);
        assert!(doc.trains.values().all(|t| t.schedule.is_empty()));
    }

    #[test]
    fn document_serializes_with_the_expected_keys() {
        let plans = corridor_plans();
        let model = SchedulingModel::build(&plans);
        let outcome = SolveOutcome {
            status: SolveStatus::Unknown,
            times: None,
            objective: None,
            stats: SolveStats::default(),
        };
        let doc = extract(&model, &plans, &outcome, Vec::new());
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["status"], "UNKNOWN");
        assert!(value["objective"].is_null());
        assert_eq!(value["horizon"], 482);
        assert!(value["trains"]["T1"]["schedule"].is_array());
        assert!(value["diagnostics"].is_array());
    }
}
