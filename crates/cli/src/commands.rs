//! Clap command definition and flag handling.
//!
//! Flags override values loaded from the config file; anything not given on
//! the command line keeps the file (or default) value.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use counterbench_core::Result;
use counterbench_engine::{BenchConfig, StrategyKind, CONFIG_FILE_NAME};
use tracing::Level;

/// Build the CLI command.
pub fn build_cli() -> Command {
    Command::new("counterbench")
        .about("Benchmark concurrency-control strategies for a shared counter")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help(format!("Config file (default: ./{})", CONFIG_FILE_NAME)),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .short('w')
                .value_parser(value_parser!(usize))
                .help("Concurrent workers per strategy"),
        )
        .arg(
            Arg::new("iterations")
                .long("iterations")
                .short('n')
                .value_parser(value_parser!(u64))
                .help("Increments per worker"),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .short('s')
                .action(ArgAction::Append)
                .help(
                    "Strategy to run, repeatable: lost-update, serializable, \
                     in-place, row-locking, optimistic, all",
                ),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_parser(["memory", "sqlite"])
                .help("Counter store backend"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_parser(value_parser!(PathBuf))
                .help("SQLite database path (sqlite backend)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .help("Write a commented default config file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log warnings and errors")
                .action(ArgAction::SetTrue),
        )
}

/// Config file path from `--config`, or the default name in the working directory.
pub fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Log level selected by `-v` / `-q`.
pub fn log_level(matches: &ArgMatches) -> Level {
    if matches.get_flag("verbose") {
        Level::DEBUG
    } else if matches.get_flag("quiet") {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Apply command-line overrides on top of a loaded config.
pub fn apply_overrides(matches: &ArgMatches, config: &mut BenchConfig) -> Result<()> {
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.workers = *workers;
    }
    if let Some(iterations) = matches.get_one::<u64>("iterations") {
        config.iterations = *iterations;
    }
    if let Some(values) = matches.get_many::<String>("strategy") {
        config.strategies = parse_strategies(values.map(String::as_str))?;
    }
    if let Some(backend) = matches.get_one::<String>("backend") {
        config.store.backend = backend.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("db") {
        config.store.sqlite_path = Some(path.clone());
    }
    config.validate()
}

/// Parse strategy names, expanding `all` and dropping repeats.
fn parse_strategies<'a>(values: impl Iterator<Item = &'a str>) -> Result<Vec<StrategyKind>> {
    let mut kinds = Vec::new();
    for value in values {
        if value.eq_ignore_ascii_case("all") {
            for kind in StrategyKind::ALL {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            continue;
        }
        let kind = StrategyKind::from_str(value)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}
