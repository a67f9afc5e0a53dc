use std::cmp::Reverse;

use log::debug;
use typed_index_collections::TiVec;

use crate::interval::TimeInterval;
use crate::occupation::{ResourceConflicts, ResourceOccupation};
use crate::problem::{SchedulingModel, TimeValue, TrainId};
use crate::solvers::{SearchLimits, SolveOutcome, SolveStats, SolveStatus, SolverBackend};

/// Dispatches trains one at a time, highest weight first, packing each
/// segment into the earliest slot with spare capacity. Always returns a
/// valid schedule quickly, never an optimality proof.
pub fn solve(model: &SchedulingModel, _limits: &SearchLimits) -> SolveOutcome {
    let _p = hprof::enter("greedy solver");
    let stats = SolveStats::default();

    let mut order: Vec<TrainId> = (0..model.trains.len()).map(TrainId::from).collect();
    order.sort_by_key(|id| {
        (
            Reverse(model.trains[*id].weight),
            model.trains[*id].release,
            usize::from(*id),
        )
    });

    let mut conflicts = ResourceConflicts::empty(model);
    let mut starts: TiVec<TrainId, Vec<TimeValue>> = model
        .trains
        .iter()
        .map(|train| Vec::with_capacity(train.segments.len()))
        .collect();

    let mut fits = true;
    for train_id in order {
        let train = &model.trains[train_id];
        let mut t = train.release;
        for (k, seg) in train.segments.iter().enumerate() {
            let slot = conflicts.resources[seg.bucket].earliest_slot(t, seg.duration);
            conflicts.add(
                seg.bucket,
                ResourceOccupation {
                    interval: TimeInterval::duration(slot, seg.duration),
                    train: train_id,
                    segment: k as u32,
                },
            );
            starts[train_id].push(slot);
            t = slot + seg.duration;
        }
        if !train.segments.is_empty() && t > model.horizon {
            fits = false;
        }
    }

    if !fits {
        debug!("greedy dispatch ran past the horizon");
        return SolveOutcome {
            status: SolveStatus::Unknown,
            times: None,
            objective: None,
            stats,
        };
    }

    let objective = model.objective(&starts);
    debug!("greedy dispatch objective {}", objective);
    SolveOutcome {
        status: SolveStatus::Feasible,
        times: Some(starts),
        objective: Some(objective),
        stats,
    }
}

pub struct GreedySolver;

impl SolverBackend for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn solve(&mut self, model: &SchedulingModel, limits: &SearchLimits) -> SolveOutcome {
        solve(model, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{Segment, TrainPlan};

    fn seg(track_id: &str, duration: i32, capacity: u32) -> Segment {
        Segment {
            track_id: track_id.to_string(),
            from: "A".to_string(),
            to: "B".to_string(),
            duration,
            capacity,
        }
    }

    fn plan(id: &str, priority: i32, release_delay: i32, segments: Vec<Segment>) -> TrainPlan {
        TrainPlan {
            id: id.to_string(),
            priority,
            release_delay,
            segments,
        }
    }

    fn limits() -> SearchLimits {
        SearchLimits {
            time_budget: 10.0,
            workers: 1,
        }
    }

    #[test]
    fn higher_weight_dispatches_first() {
        let route = || vec![seg("AB", 62, 1), seg("BC", 32, 1)];
        let model = SchedulingModel::build(&[
            plan("T1", 1, 0, route()),
            plan("T2", 5, 0, route()),
        ]);
        let outcome = solve(&model, &limits());
        assert_eq!(outcome.status, SolveStatus::Feasible);
        assert_eq!(outcome.objective, Some(8 * 94 + 156));
        let times = outcome.times.unwrap();
        assert_eq!(times[TrainId::from(0)], vec![0, 62]);
        assert_eq!(times[TrainId::from(1)], vec![62, 124]);
    }

    #[test]
    fn equal_weights_dispatch_in_input_order() {
        let model = SchedulingModel::build(&[
            plan("A", 3, 0, vec![seg("AB", 10, 2)]),
            plan("B", 3, 0, vec![seg("AB", 10, 2)]),
            plan("C", 3, 0, vec![seg("AB", 10, 2)]),
        ]);
        let outcome = solve(&model, &limits());
        let times = outcome.times.unwrap();
        assert_eq!(times[TrainId::from(0)], vec![0]);
        assert_eq!(times[TrainId::from(1)], vec![0]);
        assert_eq!(times[TrainId::from(2)], vec![10]);
    }

    #[test]
    fn never_claims_optimality() {
        let model = SchedulingModel::build(&[plan("T1", 3, 0, vec![seg("AB", 10, 1)])]);
        let outcome = solve(&model, &limits());
        assert_eq!(outcome.status, SolveStatus::Feasible);
    }

    #[test]
    fn dispatch_past_the_horizon_is_unknown() {
        let model = SchedulingModel::build(&[plan("T1", 3, 295, vec![seg("AB", 10, 1)])]);
        assert_eq!(model.horizon, 300);
        let outcome = solve(&model, &limits());
        assert_eq!(outcome.status, SolveStatus::Unknown);
        assert!(outcome.times.is_none());
    }
}
