//! Strategy protocol tests against a scripted session
//!
//! The scripted session lets a test decide exactly when a competing
//! transaction commits, so retry paths run deterministically.

use counterbench_core::{
    CounterKey, CounterRow, CounterSession, CounterStore, Error, IsolationLevel, Result,
    SessionId,
};
use counterbench_engine::{
    CounterDatabase, DatabaseConfig, IncrementStrategy, RetryPolicy, StatementLatency,
    StrategyKind, WorkerContext,
};

const KEY: CounterKey = CounterKey::DEFAULT;

// ============================================================================
// Scripted session
// ============================================================================

#[derive(Default)]
struct ScriptedSession {
    isolation: IsolationLevel,
    committed: CounterRow,
    pending: Option<CounterRow>,
    in_txn: bool,
    /// Before each of the next N compare-and-writes, a competitor commits +1
    competing_commits: u32,
    competitor_increments: i64,
    /// The next N commits with pending writes fail with a serialization conflict
    commit_conflicts: u32,
    /// Fail every write with a backend error
    fail_writes: bool,
    rollbacks: u32,
    rejected_cas: u32,
}

impl ScriptedSession {
    fn new(isolation: IsolationLevel) -> Self {
        Self {
            isolation,
            ..Default::default()
        }
    }

    fn current(&self) -> CounterRow {
        self.pending.unwrap_or(self.committed)
    }
}

impl CounterSession for ScriptedSession {
    fn id(&self) -> SessionId {
        SessionId::new(1)
    }

    fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_txn {
            return Err(Error::invalid_operation("already in transaction"));
        }
        self.in_txn = true;
        Ok(())
    }

    fn read(&mut self, _key: CounterKey) -> Result<CounterRow> {
        self.in_txn = true;
        Ok(self.current())
    }

    fn read_for_update(&mut self, key: CounterKey) -> Result<CounterRow> {
        self.read(key)
    }

    fn write(&mut self, _key: CounterKey, counter: i64) -> Result<()> {
        if self.fail_writes {
            return Err(Error::backend("connection reset"));
        }
        self.in_txn = true;
        self.pending = Some(self.current().with_counter(counter));
        Ok(())
    }

    fn increment(&mut self, _key: CounterKey, delta: i64) -> Result<()> {
        self.in_txn = true;
        let current = self.current();
        self.pending = Some(current.with_counter(current.counter + delta));
        Ok(())
    }

    fn compare_and_write(
        &mut self,
        _key: CounterKey,
        expected_version: i64,
        new_counter: i64,
        new_version: i64,
    ) -> Result<bool> {
        self.in_txn = true;
        if self.competing_commits > 0 {
            self.competing_commits -= 1;
            self.committed.counter += 1;
            self.committed.version += 1;
            self.competitor_increments += 1;
        }
        if self.current().version != expected_version {
            self.rejected_cas += 1;
            return Ok(false);
        }
        self.pending = Some(CounterRow::new(new_counter, new_version));
        Ok(true)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_txn {
            return Ok(());
        }
        self.in_txn = false;
        if let Some(row) = self.pending.take() {
            if self.commit_conflicts > 0 {
                self.commit_conflicts -= 1;
                return Err(Error::conflict(KEY, "scripted conflict"));
            }
            self.committed = row;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        self.in_txn = false;
        self.pending = None;
        Ok(())
    }
}

fn ctx(iterations: u64, retry: RetryPolicy) -> WorkerContext {
    WorkerContext {
        worker_id: 0,
        key: KEY,
        iterations,
        retry,
    }
}

// ============================================================================
// Optimistic
// ============================================================================

mod optimistic {
    use super::*;

    #[test]
    fn test_rejected_writes_change_nothing_and_are_retried() {
        let mut session = ScriptedSession::new(IsolationLevel::ReadCommitted);
        session.competing_commits = 4;

        let stats = StrategyKind::Optimistic
            .strategy()
            .run(&mut session, &ctx(10, RetryPolicy::default()))
            .unwrap();

        assert_eq!(stats.successes, 10);
        assert_eq!(stats.conflicts, 4);
        assert_eq!(stats.attempts, 14);
        assert_eq!(session.rejected_cas, 4);
        // Every committed row is either ours or the competitor's, nothing lost
        assert_eq!(session.committed.counter, 10 + session.competitor_increments);
        assert_eq!(session.committed.version, 14);
    }

    #[test]
    fn test_bounded_retry_gives_up() {
        let mut session = ScriptedSession::new(IsolationLevel::ReadCommitted);
        session.competing_commits = 10;

        let err = StrategyKind::Optimistic
            .strategy()
            .run(&mut session, &ctx(1, RetryPolicy::bounded(3)))
            .unwrap_err();

        match err {
            Error::RetriesExhausted {
                strategy, retries, ..
            } => {
                assert_eq!(strategy, "OPTIMISTIC CONCURRENCY");
                assert_eq!(retries, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

// ============================================================================
// Serializable
// ============================================================================

mod serializable {
    use super::*;

    #[test]
    fn test_conflicts_roll_back_and_retry_same_increment() {
        let mut session = ScriptedSession::new(IsolationLevel::Serializable);
        session.commit_conflicts = 3;

        let stats = StrategyKind::Serializable
            .strategy()
            .run(&mut session, &ctx(5, RetryPolicy::default()))
            .unwrap();

        assert_eq!(stats.successes, 5);
        assert_eq!(stats.conflicts, 3);
        assert_eq!(stats.attempts, 8);
        assert_eq!(session.rollbacks, 3);
        assert_eq!(session.committed.counter, 5);
    }

    #[test]
    fn test_retry_cap_yields_retries_exhausted() {
        let mut session = ScriptedSession::new(IsolationLevel::Serializable);
        session.commit_conflicts = u32::MAX;

        let err = StrategyKind::Serializable
            .strategy()
            .run(&mut session, &ctx(1, RetryPolicy::bounded(2)))
            .unwrap_err();

        assert!(matches!(err, Error::RetriesExhausted { retries: 3, .. }));
        assert_eq!(session.committed.counter, 0);
    }
}

// ============================================================================
// Fatal errors
// ============================================================================

mod fatal_errors {
    use super::*;

    #[test]
    fn test_fatal_error_rolls_back_and_aborts_worker() {
        for kind in [
            StrategyKind::LostUpdate,
            StrategyKind::Serializable,
            StrategyKind::RowLocking,
        ] {
            let mut session = ScriptedSession::new(kind.isolation());
            session.fail_writes = true;

            let err = kind
                .strategy()
                .run(&mut session, &ctx(3, RetryPolicy::default()))
                .unwrap_err();

            assert!(err.is_fatal(), "{kind}: {err}");
            assert_eq!(session.rollbacks, 1, "{kind}");
            assert_eq!(session.committed.counter, 0, "{kind}");
        }
    }
}

// ============================================================================
// Single worker against the in-memory database
// ============================================================================

mod single_worker {
    use super::*;

    #[test]
    fn test_every_strategy_is_exact_without_contention() {
        let db = CounterDatabase::new(DatabaseConfig::new().with_latency(StatementLatency::None));

        for kind in StrategyKind::ALL {
            db.reset(KEY).unwrap();
            let mut session = db.open_session(kind.isolation()).unwrap();
            let stats = kind
                .strategy()
                .run(session.as_mut(), &ctx(250, RetryPolicy::default()))
                .unwrap();

            assert_eq!(stats.successes, 250, "{kind}");
            assert_eq!(stats.attempts, 250, "{kind}");
            assert_eq!(stats.conflicts, 0, "{kind}");
            assert_eq!(db.read(KEY).unwrap().counter, 250, "{kind}");
        }
    }

    #[test]
    fn test_only_optimistic_bumps_version() {
        let db = CounterDatabase::new(DatabaseConfig::new().with_latency(StatementLatency::None));

        for kind in StrategyKind::ALL {
            db.reset(KEY).unwrap();
            let mut session = db.open_session(kind.isolation()).unwrap();
            kind.strategy()
                .run(session.as_mut(), &ctx(3, RetryPolicy::default()))
                .unwrap();
            let expected_version = if kind == StrategyKind::Optimistic { 3 } else { 0 };
            assert_eq!(db.read(KEY).unwrap().version, expected_version, "{kind}");
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn optimistic_counts_own_and_competing_commits(
            iterations in 1u64..40,
            competing in 0u32..40,
        ) {
            let mut session = ScriptedSession::new(IsolationLevel::ReadCommitted);
            session.competing_commits = competing;

            let stats = StrategyKind::Optimistic
                .strategy()
                .run(&mut session, &ctx(iterations, RetryPolicy::default()))
                .unwrap();

            prop_assert_eq!(stats.successes, iterations);
            prop_assert_eq!(stats.conflicts, competing as u64);
            prop_assert_eq!(session.committed.counter, iterations as i64 + competing as i64);
            prop_assert_eq!(session.committed.version, session.committed.counter);
        }

        #[test]
        fn serializable_retries_never_double_apply(
            iterations in 1u64..40,
            conflicts in 0u32..40,
        ) {
            let mut session = ScriptedSession::new(IsolationLevel::Serializable);
            session.commit_conflicts = conflicts;

            let stats = StrategyKind::Serializable
                .strategy()
                .run(&mut session, &ctx(iterations, RetryPolicy::default()))
                .unwrap();

            prop_assert_eq!(stats.attempts, iterations + conflicts as u64);
            prop_assert_eq!(session.committed.counter, iterations as i64);
        }
    }
}
