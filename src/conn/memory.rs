//! In-memory connections.
//!
//! [`MemoryConn`] is the reference implementation of [`Connection`]: it holds
//! no real socket, records every lifecycle call in order, and can be told to
//! fail specific operations. Use it for:
//!
//! - Driving coordinator sequencing in tests without a database
//! - Embedding the crate in applications that fake their driver layer
//!
//! [`WrappedConn`] is the delegating shape pools hand out: its own identity,
//! every operation forwarded, raw connection reachable via `target()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{ConnHandle, ConnId, Connection, TxOp};
use crate::{Error, Result};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

fn next_conn_id() -> ConnId {
    ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
}

// ============================================================================
// MemoryConn
// ============================================================================

/// In-memory connection: a call ledger instead of a socket.
#[derive(Debug)]
pub struct MemoryConn {
    id: ConnId,
    state: Mutex<ConnState>,
}

#[derive(Debug)]
struct ConnState {
    closed: bool,
    calls: Vec<TxOp>,
    fail_on: Vec<TxOp>,
}

impl MemoryConn {
    /// An open connection with a fresh process-unique id.
    pub fn new() -> Self {
        Self::with_id(next_conn_id())
    }

    /// An open connection with an explicit id, for tests that need two
    /// handles reporting equal identity.
    pub fn with_id(id: ConnId) -> Self {
        Self {
            id,
            state: Mutex::new(ConnState {
                closed: false,
                calls: Vec::new(),
                fail_on: Vec::new(),
            }),
        }
    }

    /// Convenience: a fresh connection already behind a shared handle.
    pub fn handle() -> ConnHandle {
        Arc::new(Self::new())
    }

    /// Program `op` to fail with a connection error on every attempt.
    pub fn fail_on(&self, op: TxOp) {
        self.state.lock().fail_on.push(op);
    }

    /// Whether a close has been observed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Every lifecycle call seen, in order. Failed attempts count.
    pub fn calls(&self) -> Vec<TxOp> {
        self.state.lock().calls.clone()
    }

    /// Number of times `op` was attempted.
    pub fn count(&self, op: TxOp) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    fn attempt(&self, op: TxOp) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(op);
        if op == TxOp::Close && state.closed {
            // Repeat closes are a no-op, matching driver behaviour.
            return Ok(());
        }
        if state.fail_on.contains(&op) {
            return Err(Error::Connection(format!(
                "injected {op} failure on connection {}",
                self.id
            )));
        }
        match op {
            TxOp::Close => {
                state.closed = true;
                Ok(())
            }
            TxOp::Commit | TxOp::Rollback if state.closed => Err(Error::Closed(format!(
                "connection {} is closed",
                self.id
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for MemoryConn {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MemoryConn {
    fn id(&self) -> ConnId {
        self.id
    }

    fn commit(&self) -> Result<()> {
        self.attempt(TxOp::Commit)
    }

    fn rollback(&self) -> Result<()> {
        self.attempt(TxOp::Rollback)
    }

    fn close(&self) -> Result<()> {
        self.attempt(TxOp::Close)
    }
}

// ============================================================================
// WrappedConn
// ============================================================================

/// Delegating wrapper over another connection.
///
/// Pools hand these out instead of raw handles: the wrapper has its own
/// identity, forwards every operation, and exposes the raw connection via
/// [`Connection::target`].
#[derive(Debug)]
pub struct WrappedConn {
    id: ConnId,
    raw: ConnHandle,
}

impl WrappedConn {
    /// Wrap `raw` under a fresh wrapper identity.
    pub fn new(raw: ConnHandle) -> Self {
        Self {
            id: next_conn_id(),
            raw,
        }
    }

    /// Convenience: a wrapper already behind a shared handle.
    pub fn handle(raw: ConnHandle) -> ConnHandle {
        Arc::new(Self::new(raw))
    }
}

impl Connection for WrappedConn {
    fn id(&self) -> ConnId {
        self.id
    }

    fn commit(&self) -> Result<()> {
        self.raw.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.raw.rollback()
    }

    fn close(&self) -> Result<()> {
        self.raw.close()
    }

    fn target(&self) -> Option<ConnHandle> {
        Some(Arc::clone(&self.raw))
    }
}

// ============================================================================
// Tests
// ============================================================================
