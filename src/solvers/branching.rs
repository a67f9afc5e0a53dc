use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Instant;

use log::debug;
use typed_index_collections::TiVec;

use crate::occupation::ResourceConflicts;
use crate::problem::{SchedulingModel, TimeValue, TrainId};
use crate::solvers::{SearchLimits, SolveOutcome, SolveStats, SolveStatus, SolverBackend};

/// Forces one train's segment to start at or after a given time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeferConstraint {
    pub train: TrainId,
    pub segment: usize,
    pub enter_after: TimeValue,
}

/// A search tree node: one added constraint plus the chain of its
/// ancestors' constraints.
pub struct SearchNode {
    pub constraint: DeferConstraint,
    pub depth: u32,
    pub parent: Option<Rc<SearchNode>>,
}

impl std::fmt::Debug for SearchNode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SearchNode")
            .field("constraint", &self.constraint)
            .field("depth", &self.depth)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

struct QueueEntry {
    bound: i64,
    seq: u64,
    node: Option<Rc<SearchNode>>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // reversed so the max-heap pops the lowest bound, oldest first
    fn cmp(&self, other: &Self) -> Ordering {
        (other.bound, other.seq).cmp(&(self.bound, self.seq))
    }
}

/// Earliest-start propagation under the node's constraint chain. Every
/// segment starts as early as its release, its predecessor, and its
/// defer constraints allow, so the result is a componentwise lower
/// bound on any feasible schedule below this node and its objective is
/// an exact subtree bound. Returns `None` when some train cannot finish
/// within the horizon.
fn evaluate(
    model: &SchedulingModel,
    node: Option<&Rc<SearchNode>>,
    extra: Option<&DeferConstraint>,
) -> Option<(i64, TiVec<TrainId, Vec<TimeValue>>)> {
    let mut earliest: TiVec<TrainId, Vec<TimeValue>> = model
        .trains
        .iter()
        .map(|train| vec![0; train.segments.len()])
        .collect();

    let mut cursor = node;
    while let Some(n) = cursor {
        let slot = &mut earliest[n.constraint.train][n.constraint.segment];
        *slot = (*slot).max(n.constraint.enter_after);
        cursor = n.parent.as_ref();
    }
    if let Some(c) = extra {
        let slot = &mut earliest[c.train][c.segment];
        *slot = (*slot).max(c.enter_after);
    }

    let mut starts: TiVec<TrainId, Vec<TimeValue>> = TiVec::new();
    let mut objective = 0i64;
    for (train_id, train) in model.trains.iter_enumerated() {
        let mut t = train.release;
        let mut row = Vec::with_capacity(train.segments.len());
        for (k, seg) in train.segments.iter().enumerate() {
            t = t.max(earliest[train_id][k]);
            row.push(t);
            t += seg.duration;
        }
        if !train.segments.is_empty() {
            if t > model.horizon {
                return None;
            }
            objective += train.weight * t;
        }
        starts.push(row);
    }
    Some((objective, starts))
}

pub fn solve(model: &SchedulingModel, limits: &SearchLimits) -> SolveOutcome {
    let _p = hprof::enter("branching search");
    let start_time = Instant::now();
    let mut stats = SolveStats::default();
    debug!(
        "branching search: {} trains, {} buckets, horizon {}, worker hint {}",
        model.trains.len(),
        model.buckets.len(),
        model.horizon,
        limits.workers
    );

    let mut conflicts = ResourceConflicts::empty(model);
    let mut queue: BinaryHeap<QueueEntry> = BinaryHeap::new();
    let mut seq = 0u64;
    let mut best: Option<(i64, TiVec<TrainId, Vec<TimeValue>>)> = None;
    let mut exhausted = true;

    match evaluate(model, None, None) {
        None => {
            return SolveOutcome {
                status: SolveStatus::Infeasible,
                times: None,
                objective: None,
                stats,
            };
        }
        Some((bound, starts)) => {
            conflicts.load(model, &starts);
            if conflicts.first_overload().is_none() {
                // the unconstrained relaxation is feasible, so it is optimal
                return SolveOutcome {
                    status: SolveStatus::Optimal,
                    times: Some(starts),
                    objective: Some(bound),
                    stats,
                };
            }
            queue.push(QueueEntry {
                bound,
                seq,
                node: None,
            });
            seq += 1;
        }
    }

    while let Some(entry) = queue.pop() {
        if start_time.elapsed().as_secs_f64() > limits.time_budget {
            exhausted = false;
            break;
        }
        if let Some((incumbent, _)) = &best {
            if entry.bound >= *incumbent {
                // best-first order: no remaining node can improve
                break;
            }
        }
        stats.nodes_explored += 1;

        let (bound, starts) = match evaluate(model, entry.node.as_ref(), None) {
            Some(v) => v,
            None => continue,
        };
        conflicts.load(model, &starts);

        match conflicts.first_overload() {
            None => {
                let improved = match &best {
                    Some((incumbent, _)) => bound < *incumbent,
                    None => true,
                };
                if improved {
                    debug!(
                        "incumbent {} after {} nodes",
                        bound, stats.nodes_explored
                    );
                    best = Some((bound, starts));
                }
            }
            Some((bucket_id, time, members)) => {
                stats.conflicts += 1;
                assert!(members.len() > model.buckets[bucket_id].capacity as usize);
                debug!(
                    "overload on {:?} at {}: {} trains over capacity {}",
                    bucket_id,
                    time,
                    members.len(),
                    model.buckets[bucket_id].capacity
                );

                // In any feasible completion, some member of the active set
                // starts last, and that member can enter no earlier than the
                // first instant another member releases its slot. One child
                // per candidate covers all completions.
                for member in members.iter() {
                    let enter_after = members
                        .iter()
                        .filter(|other| **other != *member)
                        .map(|other| other.interval.time_end)
                        .min()
                        .unwrap();
                    let constraint = DeferConstraint {
                        train: member.train,
                        segment: member.segment as usize,
                        enter_after,
                    };
                    if let Some((child_bound, _)) =
                        evaluate(model, entry.node.as_ref(), Some(&constraint))
                    {
                        let admit = match &best {
                            Some((incumbent, _)) => child_bound < *incumbent,
                            None => true,
                        };
                        if admit {
                            let depth = entry.node.as_ref().map_or(0, |n| n.depth) + 1;
                            queue.push(QueueEntry {
                                bound: child_bound,
                                seq,
                                node: Some(Rc::new(SearchNode {
                                    constraint,
                                    depth,
                                    parent: entry.node.clone(),
                                })),
                            });
                            seq += 1;
                            stats.nodes_generated += 1;
                        }
                    }
                }
            }
        }
    }

    let status = match (&best, exhausted) {
        (Some(_), true) => SolveStatus::Optimal,
        (Some(_), false) => SolveStatus::Feasible,
        (None, true) => SolveStatus::Infeasible,
        (None, false) => SolveStatus::Unknown,
    };
    debug!(
        "branching search done: {} ({} explored, {} generated, {} conflicts)",
        status.name(),
        stats.nodes_explored,
        stats.nodes_generated,
        stats.conflicts
    );

    let (objective, times) = match best {
        Some((objective, times)) => (Some(objective), Some(times)),
        None => (None, None),
    };
    SolveOutcome {
        status,
        times,
        objective,
        stats,
    }
}

pub struct BranchingSolver;

impl SolverBackend for BranchingSolver {
    fn name(&self) -> &'static str {
        "branching"
    }

    fn solve(&mut self, model: &SchedulingModel, limits: &SearchLimits) -> SolveOutcome {
        solve(model, limits)
    }
}
