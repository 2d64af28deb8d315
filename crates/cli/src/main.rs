//! counterbench: run the shared-counter concurrency benchmark.
//!
//! Loads `counterbench.toml` (or `--config`), applies flag overrides, runs
//! each selected strategy in turn and prints one report per strategy.

mod commands;
mod format;

use std::process;

use counterbench_core::Result;
use counterbench_engine::{BenchConfig, Benchmark, StrategyReport};
use tracing::info;

use commands::{apply_overrides, build_cli, config_path, log_level};
use format::{format_error, format_reports, OutputMode};

fn main() {
    let matches = build_cli().get_matches();

    tracing_subscriber::fmt()
        .with_max_level(log_level(&matches))
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let path = config_path(&matches);

    if matches.get_flag("write-config") {
        match BenchConfig::write_default_if_missing(&path) {
            Ok(()) => {
                eprintln!("Config written to {}", path.display());
                return;
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, output_mode));
                process::exit(1);
            }
        }
    }

    let mut config = match BenchConfig::load_or_default(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };
    if let Err(e) = apply_overrides(&matches, &mut config) {
        eprintln!("{}", format_error(&e, output_mode));
        process::exit(2);
    }

    match run(&config) {
        Ok(reports) => println!("{}", format_reports(&reports, output_mode)),
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    }
}

fn run(config: &BenchConfig) -> Result<Vec<StrategyReport>> {
    let store = config.open_store()?;
    let workload = config.workload()?;
    info!(
        target: "counterbench::bench",
        backend = store.backend(),
        workers = workload.worker_count,
        iterations = workload.iterations_per_worker,
        strategies = config.strategies.len(),
        "starting benchmark"
    );
    Benchmark::new(store, workload)
        .with_retry(config.retry.clone())
        .run(&config.strategies)
}
