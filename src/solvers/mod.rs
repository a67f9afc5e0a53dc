pub mod branching;
pub mod greedy;

use log::debug;
use typed_index_collections::TiVec;

use crate::problem::{SchedulingModel, TimeValue, TrainId};

#[derive(Debug)]
pub enum SolverError {
    UnknownBackend(String),
    InvalidSolution(String),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SolverError::UnknownBackend(name) => write!(f, "unknown solver backend {:?}", name),
            SolverError::InvalidSolution(msg) => {
                write!(f, "solver produced an invalid solution: {}", msg)
            }
        }
    }
}

impl std::error::Error for SolverError {}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolveStatus {
    /// Proven best schedule within the horizon.
    Optimal,
    /// Valid schedule without an optimality proof.
    Feasible,
    /// Proven to have no schedule within the horizon.
    Infeasible,
    /// Budget ran out before any of the above.
    Unknown,
}

impl SolveStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SearchLimits {
    /// Wall-clock budget in seconds.
    pub time_budget: f64,
    /// Advisory parallelism hint.
    pub workers: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SolveStats {
    pub nodes_explored: usize,
    pub nodes_generated: usize,
    pub conflicts: usize,
}

#[derive(Debug)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub times: Option<TiVec<TrainId, Vec<TimeValue>>>,
    pub objective: Option<i64>,
    pub stats: SolveStats,
}

pub trait SolverBackend {
    fn name(&self) -> &'static str;
    fn solve(&mut self, model: &SchedulingModel, limits: &SearchLimits) -> SolveOutcome;
}

pub fn backend_by_name(name: &str) -> Result<Box<dyn SolverBackend>, SolverError> {
    match name {
        "branching" => Ok(Box::new(branching::BranchingSolver)),
        "greedy" => Ok(Box::new(greedy::GreedySolver)),
        _ => Err(SolverError::UnknownBackend(name.to_string())),
    }
}

/// Runs a backend and re-verifies any solution it claims before the
/// result is allowed out.
pub fn run(
    backend: &mut dyn SolverBackend,
    model: &SchedulingModel,
    limits: &SearchLimits,
) -> Result<SolveOutcome, SolverError> {
    let _p = hprof::enter("solve");
    let outcome = backend.solve(model, limits);
    debug!(
        "backend {} finished with status {} ({:?})",
        backend.name(),
        outcome.status.name(),
        outcome.stats
    );

    if outcome.status.is_solved() {
        let times = outcome.times.as_ref().ok_or_else(|| {
            SolverError::InvalidSolution(format!(
                "backend {} reported {} without start times",
                backend.name(),
                outcome.status.name()
            ))
        })?;
        let objective = model.verify(times).map_err(SolverError::InvalidSolution)?;
        if outcome.objective != Some(objective) {
            return Err(SolverError::InvalidSolution(format!(
                "backend {} claimed objective {:?} but the schedule evaluates to {}",
                backend.name(),
                outcome.objective,
                objective
            )));
        }
    }

    Ok(outcome)
}
