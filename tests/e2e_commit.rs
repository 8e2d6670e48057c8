//! End-to-end tests for commit and rollback sequencing across the split.
//!
//! Each test builds one unit-of-work scope, installs in-memory connections
//! by role, and drives the coordinator the way a transaction layer above
//! would. The contract under test: write side first and authoritative, read
//! side after and best-effort.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rwsplit::{
    ConnHandle, ConnId, Connection, ConnectionSource, Error, MemoryConn, MemorySink, Role, TxOp,
    UnitOfWork,
};

// ============================================================================
// Helpers: a two-sided scope, and a connection that logs to a shared journal.
// ============================================================================

fn split_scope() -> (UnitOfWork, Arc<MemoryConn>, Arc<MemoryConn>) {
    let scope = UnitOfWork::new();
    let write = Arc::new(MemoryConn::new());
    let read = Arc::new(MemoryConn::new());
    scope.registry().install(Role::Write, write.clone());
    scope.registry().install(Role::Read, read.clone());
    (scope, write, read)
}

type Journal = Arc<Mutex<Vec<(ConnId, TxOp)>>>;

/// Connection whose calls land in a journal shared across connections, so a
/// test can assert cross-connection ordering.
#[derive(Debug)]
struct JournalConn {
    id: ConnId,
    journal: Journal,
}

impl JournalConn {
    fn handle(id: u64, journal: &Journal) -> ConnHandle {
        Arc::new(Self {
            id: ConnId(id),
            journal: Arc::clone(journal),
        })
    }

    fn log(&self, op: TxOp) {
        self.journal.lock().push((self.id, op));
    }
}

impl Connection for JournalConn {
    fn id(&self) -> ConnId {
        self.id
    }

    fn commit(&self) -> rwsplit::Result<()> {
        self.log(TxOp::Commit);
        Ok(())
    }

    fn rollback(&self) -> rwsplit::Result<()> {
        self.log(TxOp::Rollback);
        Ok(())
    }

    fn close(&self) -> rwsplit::Result<()> {
        self.log(TxOp::Close);
        Ok(())
    }
}

// ============================================================================
// 1. Commit reaches the write connection before the read connection
// ============================================================================

#[test]
fn test_commit_reaches_write_before_read() {
    let scope = UnitOfWork::new();
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    scope
        .registry()
        .install(Role::Write, JournalConn::handle(1, &journal));
    scope
        .registry()
        .install(Role::Read, JournalConn::handle(2, &journal));

    let tx = scope.transaction(None, ConnectionSource::Plain);
    tx.commit().unwrap();

    assert_eq!(
        *journal.lock(),
        vec![(ConnId(1), TxOp::Commit), (ConnId(2), TxOp::Commit)]
    );
}

// ============================================================================
// 2. A write commit failure fails loudly and gates the read commit
// ============================================================================

#[test]
fn test_write_commit_failure_gates_the_read_commit() {
    let (scope, write, read) = split_scope();
    write.fail_on(TxOp::Commit);

    let tx = scope.transaction(None, ConnectionSource::Plain);
    let err = tx.commit().unwrap_err();

    assert!(matches!(
        err,
        Error::DataAccess {
            op: TxOp::Commit,
            role: Role::Write,
            ..
        }
    ));
    assert_eq!(write.count(TxOp::Commit), 1);
    assert_eq!(read.calls(), vec![]);
}

// ============================================================================
// 3. A read commit failure is recorded through the sink, never raised
// ============================================================================

#[test]
fn test_read_commit_failure_is_recorded_not_raised() {
    let (scope, write, read) = split_scope();
    read.fail_on(TxOp::Commit);
    let sink = Arc::new(MemorySink::new());

    let tx = scope
        .transaction(None, ConnectionSource::Plain)
        .with_diagnostics(sink.clone());
    tx.commit().unwrap();

    assert_eq!(write.count(TxOp::Commit), 1);
    assert_eq!(read.count(TxOp::Commit), 1);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].conn, read.id());
    assert_eq!(failures[0].role, Some(Role::Read));
    assert_eq!(failures[0].op, TxOp::Commit);
}

// ============================================================================
// 4. Single-sided and empty scopes commit cleanly
// ============================================================================

#[test]
fn test_single_sided_scopes_commit_cleanly() {
    // Write only.
    let scope = UnitOfWork::new();
    let write = Arc::new(MemoryConn::new());
    scope.registry().install(Role::Write, write.clone());
    scope
        .transaction(None, ConnectionSource::Plain)
        .commit()
        .unwrap();
    assert_eq!(write.count(TxOp::Commit), 1);

    // Read only.
    let scope = UnitOfWork::new();
    let read = Arc::new(MemoryConn::new());
    scope.registry().install(Role::Read, read.clone());
    scope
        .transaction(None, ConnectionSource::Plain)
        .commit()
        .unwrap();
    assert_eq!(read.count(TxOp::Commit), 1);

    // Nothing installed at all.
    let scope = UnitOfWork::new();
    scope
        .transaction(None, ConnectionSource::Plain)
        .commit()
        .unwrap();
}

// ============================================================================
// 5. Rollback follows the same ordering and authority rules
// ============================================================================

#[test]
fn test_rollback_follows_the_same_authority_rules() {
    let (scope, write, read) = split_scope();
    write.fail_on(TxOp::Rollback);

    let tx = scope.transaction(None, ConnectionSource::Plain);
    let err = tx.rollback().unwrap_err();

    assert!(matches!(
        err,
        Error::DataAccess {
            op: TxOp::Rollback,
            role: Role::Write,
            ..
        }
    ));
    assert_eq!(read.calls(), vec![]);
}

#[test]
fn test_read_rollback_failure_is_recorded_not_raised() {
    let (scope, write, read) = split_scope();
    read.fail_on(TxOp::Rollback);
    let sink = Arc::new(MemorySink::new());

    let tx = scope
        .transaction(None, ConnectionSource::Plain)
        .with_diagnostics(sink.clone());
    tx.rollback().unwrap();

    assert_eq!(write.count(TxOp::Rollback), 1);
    assert_eq!(sink.failures().len(), 1);
    assert_eq!(sink.failures()[0].op, TxOp::Rollback);
}

// ============================================================================
// 6. Commit leaves the registry populated; only close drains it
// ============================================================================

#[test]
fn test_commit_leaves_the_registry_populated() {
    let (scope, write, read) = split_scope();

    let tx = scope.transaction(None, ConnectionSource::Plain);
    tx.commit().unwrap();

    assert!(scope.registry().connection(Role::Write).is_some());
    assert!(scope.registry().connection(Role::Read).is_some());

    // A second boundary operation still reaches both sides.
    tx.commit().unwrap();
    assert_eq!(write.count(TxOp::Commit), 2);
    assert_eq!(read.count(TxOp::Commit), 2);
}

// ============================================================================
// 7. Property: the write outcome is authoritative for every scope shape
// ============================================================================

proptest! {
    #[test]
    fn test_write_outcome_is_authoritative(
        write_present in any::<bool>(),
        read_present in any::<bool>(),
        write_fails in any::<bool>(),
        read_fails in any::<bool>(),
        use_rollback in any::<bool>(),
    ) {
        let op = if use_rollback { TxOp::Rollback } else { TxOp::Commit };
        let scope = UnitOfWork::new();
        let write = Arc::new(MemoryConn::new());
        let read = Arc::new(MemoryConn::new());
        if write_present {
            scope.registry().install(Role::Write, write.clone());
            if write_fails {
                write.fail_on(op);
            }
        }
        if read_present {
            scope.registry().install(Role::Read, read.clone());
            if read_fails {
                read.fail_on(op);
            }
        }
        let sink = Arc::new(MemorySink::new());
        let tx = scope
            .transaction(None, ConnectionSource::Plain)
            .with_diagnostics(sink.clone());
        let outcome = if use_rollback { tx.rollback() } else { tx.commit() };

        // The call fails exactly when the write side was present and failed.
        let write_failed = write_present && write_fails;
        prop_assert_eq!(outcome.is_err(), write_failed);

        // The read side is attempted exactly when present and not gated.
        let read_attempted = read_present && !write_failed;
        prop_assert_eq!(read.count(op) == 1, read_attempted);

        // The sink sees a record exactly when a read attempt failed.
        prop_assert_eq!(!sink.is_empty(), read_attempted && read_fails);
    }
}
