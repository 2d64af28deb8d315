//! Benchmarks driven from `counterbench.toml`

use counterbench::{BenchConfig, Benchmark, Error, StrategyKind, CONFIG_FILE_NAME};
use tempfile::TempDir;

fn run_config(config: &BenchConfig) -> Vec<counterbench::StrategyReport> {
    let store = config.open_store().unwrap();
    Benchmark::new(store, config.workload().unwrap())
        .with_retry(config.retry.clone())
        .run(&config.strategies)
        .unwrap()
}

#[test]
fn default_file_round_trips_and_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    BenchConfig::write_default_if_missing(&path).unwrap();
    let mut config = BenchConfig::load(&path).unwrap();
    assert_eq!(config, BenchConfig::default());

    config.workers = 3;
    config.iterations = 50;
    let reports = run_config(&config);
    assert_eq!(reports.len(), 5);
    assert!(reports
        .iter()
        .filter(|r| r.strategy.is_exact())
        .all(|r| r.outcome.is_exact()));
}

#[test]
fn file_selects_strategies_and_latency() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        r#"
workers = 2
iterations = 20
key = 7
strategies = ["optimistic", "in-place"]

[retry]
max_retries = 100000

[store]
latency = "sleep"
latency_us = 10
"#,
    )
    .unwrap();

    let config = BenchConfig::load(&path).unwrap();
    let reports = run_config(&config);

    let kinds: Vec<_> = reports.iter().map(|r| r.strategy).collect();
    assert_eq!(kinds, vec![StrategyKind::Optimistic, StrategyKind::InPlace]);
    for report in &reports {
        assert_eq!(report.outcome.final_counter, 40);
    }
}

#[test]
fn invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    std::fs::write(&path, "workers = 0\n").unwrap();
    assert!(matches!(BenchConfig::load(&path), Err(Error::InvalidConfig(_))));

    std::fs::write(&path, "strategies = [\"pessimistic\"]\n").unwrap();
    assert!(matches!(BenchConfig::load(&path), Err(Error::ConfigParse(_))));
}

#[test]
fn missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = BenchConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.workers, 10);
    assert_eq!(config.iterations, 10_000);
}
