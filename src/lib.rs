pub mod durations;
pub mod enrich;
pub mod input;
pub mod interval;
pub mod network;
pub mod occupation;
pub mod problem;
pub mod schedule;
pub mod segments;
pub mod solvers;

use chrono::{Local, NaiveDateTime};
use derive_more::From;
use log::debug;

use crate::input::{InputError, NetworkInput};
use crate::network::NetworkIndex;
use crate::problem::SchedulingModel;
use crate::schedule::ScheduleDocument;
use crate::solvers::{SearchLimits, SolverError};

#[derive(Debug, From)]
pub enum Error {
    Input(InputError),
    Solver(SolverError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Input(e) => write!(f, "{}", e),
            Error::Solver(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Input(e) => Some(e),
            Error::Solver(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Wall-clock solver budget in seconds.
    pub time_budget: f64,
    /// Keep only the first N trains of the input.
    pub limit_trains: Option<usize>,
    /// Advisory parallelism hint passed through to the backend.
    pub workers: usize,
    pub backend: String,
    /// Base time for absolute timestamps; wall clock when absent.
    pub now: Option<NaiveDateTime>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            time_budget: 20.0,
            limit_trains: None,
            workers: 8,
            backend: "branching".to_string(),
            now: None,
        }
    }
}

/// The full pipeline: validate the input, expand routes to timed
/// segments, solve for conflict-free start times, and render the
/// timetable document.
pub fn optimize(mut input: NetworkInput, opts: &RunOptions) -> Result<ScheduleDocument, Error> {
    let _p = hprof::enter("optimize");

    input::prepare(&mut input, opts.limit_trains)?;
    let (updates, mut diagnostics) = input::latest_updates(&input);
    let index = NetworkIndex::build(&input.tracks);
    let (plans, route_diagnostics) = segments::segment_trains(&input.trains, &index, &updates)?;
    diagnostics.extend(route_diagnostics);

    let model = SchedulingModel::build(&plans);
    debug!(
        "model: {} trains, {} buckets, horizon {}",
        model.trains.len(),
        model.buckets.len(),
        model.horizon
    );

    let mut backend = solvers::backend_by_name(&opts.backend)?;
    let limits = SearchLimits {
        time_budget: opts.time_budget,
        workers: opts.workers,
    };
    let outcome = solvers::run(backend.as_mut(), &model, &limits)?;

    let mut doc = schedule::extract(&model, &plans, &outcome, diagnostics);
    let now = opts.now.unwrap_or_else(|| Local::now().naive_local());
    enrich::enrich_with_timestamps(&mut doc, now, &input.stations, &updates);
    Ok(doc)
}
