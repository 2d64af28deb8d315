//! Full benchmark runs through the public facade

use crate::common::*;
use counterbench::{
    evaluate, Benchmark, CounterKey, CounterStore, Error, StrategyKind, Workload,
};
use std::time::Duration;

// ============================================================================
// Default workload shape
// ============================================================================

#[test]
fn default_workload_loses_updates_only_without_control() {
    let db = memory_db();
    let reports = Benchmark::new(as_store(&db), Workload::default())
        .run_all()
        .unwrap();

    assert_eq!(reports.len(), 5);
    for report in &reports {
        let outcome = &report.outcome;
        assert_eq!(outcome.expected_total, 100_000);
        assert_eq!(
            outcome.lost_updates,
            outcome.expected_total - outcome.final_counter
        );
        assert!(report.attempts >= 100_000, "{}", report.strategy);

        if report.strategy.is_exact() {
            assert_eq!(outcome.final_counter, 100_000, "{}", report.strategy);
            assert_eq!(outcome.lost_updates, 0, "{}", report.strategy);
            assert_eq!(outcome.accuracy_percent, 100.0);
        } else {
            assert_eq!(report.strategy, StrategyKind::LostUpdate);
            assert!(outcome.final_counter >= 1);
            assert!(outcome.final_counter < 100_000, "no increments were lost");
            assert!(outcome.lost_updates > 0);
            assert!(outcome.accuracy_percent < 100.0);
        }
    }
}

#[test]
fn retrying_strategies_account_for_every_attempt() {
    let db = memory_db();
    for kind in [StrategyKind::Serializable, StrategyKind::Optimistic] {
        let report = run_strategy(as_store(&db), kind, 6, 300);
        assert_eq!(report.attempts, 1_800 + report.conflicts, "{kind}");
    }
}

#[test]
fn non_retrying_strategies_report_no_conflicts() {
    let db = memory_db();
    for kind in [
        StrategyKind::LostUpdate,
        StrategyKind::InPlace,
        StrategyKind::RowLocking,
    ] {
        let report = run_strategy(as_store(&db), kind, 6, 300);
        assert_eq!(report.conflicts, 0, "{kind}");
        assert_eq!(report.attempts, 1_800, "{kind}");
    }
}

// ============================================================================
// Single worker
// ============================================================================

#[test]
fn single_worker_every_strategy_is_exact() {
    let db = quiet_db();
    for kind in StrategyKind::ALL {
        let report = run_strategy(as_store(&db), kind, 1, 1_000);
        assert!(report.outcome.is_exact(), "{kind}");
        assert_eq!(report.conflicts, 0, "{kind}");
    }
}

// ============================================================================
// Other rows and evaluation
// ============================================================================

#[test]
fn workload_on_another_row_leaves_default_row_alone() {
    let db = memory_db();
    db.reset(CounterKey::DEFAULT).unwrap();
    let key = CounterKey::new(42);
    let workload = Workload::new(4, 100).unwrap().with_key(key);

    let report = Benchmark::new(as_store(&db), workload)
        .run_one(StrategyKind::RowLocking)
        .unwrap();

    assert_eq!(report.outcome.final_counter, 400);
    assert_eq!(db.read(key).unwrap().counter, 400);
    assert_eq!(db.read(CounterKey::DEFAULT).unwrap().counter, 0);
}

#[test]
fn evaluate_reports_partial_accuracy() {
    let db = quiet_db();
    db.reset(CounterKey::DEFAULT).unwrap();
    let report = run_strategy(as_store(&db), StrategyKind::InPlace, 1, 25);
    assert_eq!(report.outcome.final_counter, 25);

    let outcome = evaluate(db.as_ref(), CounterKey::DEFAULT, 100, Duration::ZERO).unwrap();
    assert_eq!(outcome.lost_updates, 75);
    assert!((outcome.accuracy_percent - 25.0).abs() < 1e-9);
}

#[test]
fn evaluate_missing_row_fails() {
    let db = quiet_db();
    let err = evaluate(db.as_ref(), CounterKey::new(9), 10, Duration::ZERO).unwrap_err();
    assert!(matches!(err, Error::RowNotFound(_)));
}
