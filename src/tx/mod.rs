//! Transaction coordination across the write/read split.
//!
//! [`RwTransaction`] presents one logical transaction over up to two
//! physical connections. The write connection is authoritative: its failures
//! fail the logical transaction immediately and loudly. The read connection
//! is best-effort: its failures are recorded through the diagnostic sink and
//! never surface. Ordering is part of the contract: the write side always
//! goes first, and a write error gates the read attempt for that call.
//!
//! Close adds a third concern: the caller-visible logical handle may belong
//! to a pool, in which case closing converts into a release signal on the
//! pool's tracked wrapper, and the physical connection stays alive for
//! recycling.

use std::sync::Arc;

use crate::conn::{ConnHandle, ConnId, Connection, ConnectionSource, TxOp};
use crate::diag::{DiagnosticSink, LogSink, SecondaryFailure};
use crate::pool::ReleaseRegistry;
use crate::registry::{ConnectionRegistry, Role};
use crate::{Error, Result};

// ============================================================================
// RwTransaction
// ============================================================================

/// Coordinates commit, rollback, and close across the role connections of
/// one logical unit of work.
///
/// The coordinator itself holds no per-call state: everything mutable lives
/// in the unit of work's registries, so a coordinator value can be shared or
/// re-entered within its scope. It must not serve two different units of
/// work.
pub struct RwTransaction {
    logical: Option<ConnHandle>,
    source: ConnectionSource,
    registry: Arc<ConnectionRegistry>,
    releases: Arc<ReleaseRegistry>,
    diag: Arc<dyn DiagnosticSink>,
}

/// What the pool-aware release of the logical handle decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseOutcome {
    /// No logical handle is attached to this coordinator.
    NoHandle,
    /// A tracked pool wrapper matched; ownership went back to the pool.
    ReturnedToPool,
    /// The handle was closed directly.
    Closed,
    /// The source vetoed the direct close; the handle stays open.
    Suppressed,
    /// The direct close failed; recorded through the sink.
    CloseFailed,
}

impl RwTransaction {
    /// Build a coordinator for one unit of work.
    ///
    /// `logical` is the connection object the caller interacts with. It is
    /// used only to locate the pooled wrapper at close time; commit and
    /// rollback act on the role connections in `registry`, never on it.
    pub fn new(
        logical: Option<ConnHandle>,
        source: ConnectionSource,
        registry: Arc<ConnectionRegistry>,
        releases: Arc<ReleaseRegistry>,
    ) -> Self {
        Self {
            logical,
            source,
            registry,
            releases,
            diag: Arc::new(LogSink),
        }
    }

    /// Replace the diagnostic sink. Defaults to [`LogSink`].
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diag = sink;
        self
    }

    /// Finalize the logical transaction.
    ///
    /// The write connection commits first; a write error fails the call and
    /// the read commit is not attempted. A read commit error is recorded and
    /// swallowed. Registry entries stay installed; further operations may
    /// follow before [`close`](Self::close).
    pub fn commit(&self) -> Result<()> {
        self.apply(TxOp::Commit)
    }

    /// Abort the logical transaction.
    ///
    /// Same ordering and authority rules as [`commit`](Self::commit), with
    /// rollback substituted.
    pub fn rollback(&self) -> Result<()> {
        self.apply(TxOp::Rollback)
    }

    /// Tear the unit of work down.
    ///
    /// Three steps, always in this order:
    /// 1. Release the logical handle through the pool-aware path.
    /// 2. Remove the write connection from the registry and close it;
    ///    a failure here propagates.
    /// 3. Remove the read connection from the registry and close it;
    ///    a failure here is recorded and swallowed.
    ///
    /// The registry is drained even when the pool reclaimed the logical
    /// handle or the source vetoed its close: the role connections belong
    /// to this unit of work and nothing else will clean them up.
    ///
    /// Safe to call again: a later call finds the registry empty, and the
    /// release path tolerates repetition.
    pub fn close(&self) -> Result<()> {
        let outcome = self.release_logical();
        tracing::debug!(?outcome, "released logical connection handle");

        if let Some(conn) = self.registry.remove(Role::Write) {
            conn.close()
                .map_err(|e| Error::data_access(TxOp::Close, Role::Write, &e))?;
        }
        if let Some(conn) = self.registry.remove(Role::Read) {
            if let Err(e) = conn.close() {
                self.suppress(conn.id(), Some(Role::Read), TxOp::Close, &e);
            }
        }
        Ok(())
    }

    /// Run `op` across the split: write side first and authoritative, read
    /// side after and best-effort. A missing role is skipped.
    fn apply(&self, op: TxOp) -> Result<()> {
        if let Some(conn) = self.registry.connection(Role::Write) {
            run(&conn, op).map_err(|e| Error::data_access(op, Role::Write, &e))?;
        }
        if let Some(conn) = self.registry.connection(Role::Read) {
            if let Err(e) = run(&conn, op) {
                self.suppress(conn.id(), Some(Role::Read), op, &e);
            }
        }
        Ok(())
    }

    /// Decide the fate of the logical handle: hand it back to the pool when
    /// a tracked wrapper matches, otherwise close it directly unless the
    /// source vetoes. Never fails; a direct-close error is recorded and
    /// absorbed here.
    fn release_logical(&self) -> ReleaseOutcome {
        let Some(handle) = &self.logical else {
            return ReleaseOutcome::NoHandle;
        };
        if let Some(source) = self.source.source_id()
            && let Some(wrapper) = self.releases.tracked(source)
            && wrapper.matches(handle)
        {
            wrapper.mark_released();
            return ReleaseOutcome::ReturnedToPool;
        }
        if !self.source.supports_close_suppression() || self.source.should_close(handle) {
            return match handle.close() {
                Ok(()) => ReleaseOutcome::Closed,
                Err(e) => {
                    self.suppress(handle.id(), None, TxOp::Close, &e);
                    ReleaseOutcome::CloseFailed
                }
            };
        }
        ReleaseOutcome::Suppressed
    }

    fn suppress(&self, conn: ConnId, role: Option<Role>, op: TxOp, err: &Error) {
        self.diag.record(SecondaryFailure::new(conn, role, op, err));
    }
}

fn run(conn: &ConnHandle, op: TxOp) -> Result<()> {
    match op {
        TxOp::Commit => conn.commit(),
        TxOp::Rollback => conn.rollback(),
        TxOp::Close => conn.close(),
    }
}

// ============================================================================
// Tests
// ============================================================================
