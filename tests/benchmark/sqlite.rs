//! The same benchmark against a SQLite database file

use counterbench::{
    BenchConfig, Benchmark, CounterKey, CounterStore, SqliteConfig, SqliteCounterStore,
    StrategyKind, Workload,
};
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<dyn CounterStore> {
    Arc::new(SqliteCounterStore::open(dir.path().join("bench.db"), SqliteConfig::default()).unwrap())
}

#[test]
fn exact_strategies_are_exact_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let bench = Benchmark::new(open(&dir), Workload::new(3, 20).unwrap());

    for kind in StrategyKind::ALL.into_iter().filter(|k| k.is_exact()) {
        let report = bench.run_one(kind).unwrap();
        assert_eq!(report.outcome.final_counter, 60, "{kind}");
    }
}

#[test]
fn lost_update_never_overcounts_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let bench = Benchmark::new(open(&dir), Workload::new(3, 20).unwrap());

    let report = bench.run_one(StrategyKind::LostUpdate).unwrap();
    assert!(report.outcome.final_counter >= 1);
    assert!(report.outcome.final_counter <= 60);
}

#[test]
fn config_opens_sqlite_backend() {
    let dir = TempDir::new().unwrap();
    let mut config = BenchConfig::default();
    config.store.backend = "sqlite".to_string();
    config.store.sqlite_path = Some(dir.path().join("from-config.db"));

    let store = config.open_store().unwrap();
    assert_eq!(store.backend(), "sqlite");
    store.reset(CounterKey::DEFAULT).unwrap();
    assert_eq!(store.read(CounterKey::DEFAULT).unwrap().counter, 0);
}
