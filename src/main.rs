use std::fs::File;
use std::path::PathBuf;
#[cfg(feature = "profiling")]
use std::time::Instant;

use clap::Parser;
use log::info;

use epi_trace::reports::{write_line_list, TimeSeriesReport};
use epi_trace::{Error, EventKind, Model, Params};

// Run with a parameters file:
// cargo run -- --config input/input.json
// Try enabling logs to see some output about infections:
// RUST_LOG=epi_trace=trace cargo run -- --config input/input.json
#[derive(Parser)]
#[command(version, about = "Individual-based test-trace-isolate epidemic simulation")]
struct Args {
    /// JSON parameters file.
    #[arg(long)]
    config: PathBuf,
    /// Directory receiving the CSV reports.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
    /// Override the seed from the parameters file.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();
    #[cfg(feature = "profiling")]
    let started = Instant::now();

    let file = File::open(&args.config)?;
    let mut params: Params = serde_json::from_reader(file)?;
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    std::fs::create_dir_all(&args.output_dir)?;

    let end_time = params.end_time;
    let mut model = Model::new(params)?;
    let mut time_series = TimeSeriesReport::create(args.output_dir.join("time_series.csv"))?;
    time_series.record(&model)?;
    for _ in 0..end_time {
        model.one_time_step();
        time_series.record(&model)?;
    }
    time_series.flush()?;
    write_line_list(&model, args.output_dir.join("line_list.csv"))?;

    info!(
        "day {end_time}: {} ever infected, {} confirmed cases, {} deaths, {} quarantine person-days",
        model.total_infected(),
        model.n_cases(),
        model.n_current(EventKind::Death),
        model.n_quarantine_days()
    );
    #[cfg(feature = "profiling")]
    println!(
        "completed {end_time} days in {}",
        humantime::format_duration(started.elapsed())
    );
    Ok(())
}
