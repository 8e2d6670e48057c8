//! Diagnostics for suppressed secondary failures.
//!
//! Write-side failures fail the logical transaction loudly. Everything else
//! (read-side commit/rollback/close, the logical handle's own release) is
//! swallowed. Swallowed never means silent: each suppressed failure becomes
//! a [`SecondaryFailure`] record pushed through the coordinator's
//! [`DiagnosticSink`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::conn::{ConnId, TxOp};
use crate::registry::Role;

// ============================================================================
// SecondaryFailure
// ============================================================================

/// A failure from the non-authoritative path, recorded instead of raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryFailure {
    /// The connection the failure came from.
    pub conn: ConnId,
    /// The registry role of the failing connection, or `None` when the
    /// failure came from the logical handle's own release path.
    pub role: Option<Role>,
    /// Which lifecycle operation failed.
    pub op: TxOp,
    /// Driver error message.
    pub message: String,
    /// When the failure was recorded.
    pub at: DateTime<Utc>,
}

impl SecondaryFailure {
    /// Build a record for `err` raised by connection `conn` during `op`.
    pub fn new(conn: ConnId, role: Option<Role>, op: TxOp, err: &Error) -> Self {
        Self {
            conn,
            role,
            op,
            message: err.to_string(),
            at: Utc::now(),
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Where suppressed failures go.
///
/// The default sink logs; swap in [`MemorySink`] to assert on records in
/// tests, or implement the trait to feed an application's own diagnostics
/// channel.
pub trait DiagnosticSink: Send + Sync {
    /// Record one suppressed failure.
    fn record(&self, failure: SecondaryFailure);
}

/// Default sink: structured warn-level log emission.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, failure: SecondaryFailure) {
        let role = failure
            .role
            .map_or_else(|| "logical".to_string(), |r| r.to_string());
        tracing::warn!(
            conn = %failure.conn,
            role = %role,
            op = %failure.op,
            error = %failure.message,
            "suppressed secondary connection failure"
        );
    }
}

/// Capturing sink: keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    failures: Mutex<Vec<SecondaryFailure>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far, in order.
    pub fn failures(&self) -> Vec<SecondaryFailure> {
        self.failures.lock().clone()
    }

    /// True while nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, failure: SecondaryFailure) {
        self.failures.lock().push(failure);
    }
}

// ============================================================================
// Tests
// ============================================================================
