//! Property tests over workload shapes

use crate::common::*;
use counterbench::StrategyKind;
use proptest::prelude::*;

fn exact_strategy() -> impl Strategy<Value = StrategyKind> {
    prop_oneof![
        Just(StrategyKind::Serializable),
        Just(StrategyKind::InPlace),
        Just(StrategyKind::RowLocking),
        Just(StrategyKind::Optimistic),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn exact_strategies_count_every_increment(
        kind in exact_strategy(),
        workers in 1usize..6,
        iterations in 1u64..60,
    ) {
        let db = memory_db();
        let report = run_strategy(as_store(&db), kind, workers, iterations);
        let expected = workers as i64 * iterations as i64;
        prop_assert_eq!(report.outcome.expected_total, expected);
        prop_assert_eq!(report.outcome.final_counter, expected);
        prop_assert_eq!(report.outcome.lost_updates, 0);
    }

    #[test]
    fn lost_update_stays_within_bounds(
        workers in 1usize..6,
        iterations in 1u64..60,
    ) {
        let db = memory_db();
        let report = run_strategy(as_store(&db), StrategyKind::LostUpdate, workers, iterations);
        let expected = workers as i64 * iterations as i64;
        prop_assert!(report.outcome.final_counter >= 1);
        prop_assert!(report.outcome.final_counter <= expected);
        prop_assert!(report.outcome.lost_updates >= 0);
    }
}
