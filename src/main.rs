use std::path::PathBuf;

use log::debug;
use railsched::input::NetworkInput;
use railsched::{enrich, optimize, RunOptions};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "railsched")]
struct Opt {
    /// Network and timetable input (JSON)
    #[structopt(name = "FILE", parse(from_os_str))]
    input: PathBuf,

    /// Solver backend: branching or greedy
    #[structopt(long, default_value = "branching")]
    solver: String,

    /// Wall-clock solver budget in seconds
    #[structopt(long, default_value = "20")]
    time_limit_s: f64,

    /// Keep only the first N trains of the input
    #[structopt(long)]
    limit_trains: Option<usize>,

    /// Advisory number of workers
    #[structopt(long, default_value = "8")]
    workers: usize,

    /// Base time for absolute timestamps (%Y-%m-%dT%H:%M:%S); wall clock if omitted
    #[structopt(long)]
    now: Option<String>,

    /// Print the profiling tree after the result
    #[structopt(long)]
    timing: bool,
}

pub fn main() {
    pretty_env_logger::init();
    let opt = Opt::from_args();
    debug!("{:?}", opt);
    hprof::start_frame();

    let text = std::fs::read_to_string(&opt.input).expect("could not read input file");
    let input: NetworkInput =
        serde_json::from_str(&text).expect("could not parse input file as JSON");

    let now = opt.now.as_deref().map(|s| {
        chrono::NaiveDateTime::parse_from_str(s, enrich::TIME_FORMAT)
            .expect("could not parse --now, expected %Y-%m-%dT%H:%M:%S")
    });

    let opts = RunOptions {
        time_budget: opt.time_limit_s,
        limit_trains: opt.limit_trains,
        workers: opt.workers,
        backend: opt.solver,
        now,
    };

    match optimize(input, &opts) {
        Ok(doc) => {
            println!("{}", serde_json::to_string_pretty(&doc).unwrap());
            if opt.timing {
                hprof::profiler().print_timing();
            }
        }
        Err(err) => {
            eprintln!("railsched: {}", err);
            std::process::exit(1);
        }
    }
}
