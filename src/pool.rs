//! Pool-side collaborators: tracked wrappers and the scope-level release
//! table.
//!
//! The coordinator never owns pooled connections. At close time it asks
//! whether the pool already tracks the handle being closed, and if so it
//! signals the wrapper instead of closing the raw connection. Whether
//! the physical connection is then recycled or really closed is the pool's
//! decision, made later and elsewhere.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::conn::{ConnHandle, Connection, SourceId};

// ============================================================================
// TrackedConn
// ============================================================================

/// Pool bookkeeping for one checked-out connection: the handle plus an
/// in-use/released flag.
#[derive(Debug)]
pub struct TrackedConn {
    conn: ConnHandle,
    released: AtomicBool,
}

impl TrackedConn {
    /// Track `conn` as checked out (in use).
    pub fn new(conn: ConnHandle) -> Self {
        Self {
            conn,
            released: AtomicBool::new(false),
        }
    }

    /// The tracked handle.
    pub fn connection(&self) -> ConnHandle {
        Arc::clone(&self.conn)
    }

    /// Whether `handle` refers to this wrapper's connection.
    ///
    /// Match rules, applied in order: pointer identity, id equality, then id
    /// equality against the tracked connection's unwrapped target. The third
    /// rule covers the proxy case where the pool tracks a wrapper but the
    /// caller holds the raw connection underneath it.
    pub fn matches(&self, handle: &ConnHandle) -> bool {
        if Arc::ptr_eq(&self.conn, handle) {
            return true;
        }
        if self.conn.id() == handle.id() {
            return true;
        }
        self.conn.target().is_some_and(|raw| raw.id() == handle.id())
    }

    /// Signal the pool that the handle is free again. Idempotent.
    pub fn mark_released(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Whether the handle has been released back to the pool.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

// ============================================================================
// ReleaseRegistry
// ============================================================================

/// Scope-level table of pool-tracked wrappers, keyed by source.
///
/// One table per logical unit of work, alongside the connection registry.
/// The pool layer tracks a wrapper here when it lends a connection to the
/// unit of work; the coordinator looks the wrapper up at close time.
#[derive(Debug, Default)]
pub struct ReleaseRegistry {
    tracked: Mutex<HashMap<SourceId, Arc<TrackedConn>>>,
}

impl ReleaseRegistry {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(HashMap::new()),
        }
    }

    /// Track `wrapper` for `source`, displacing any previous wrapper.
    pub fn track(&self, source: SourceId, wrapper: Arc<TrackedConn>) -> Option<Arc<TrackedConn>> {
        self.tracked.lock().insert(source, wrapper)
    }

    /// The wrapper tracked for `source`, if any.
    pub fn tracked(&self, source: SourceId) -> Option<Arc<TrackedConn>> {
        self.tracked.lock().get(&source).cloned()
    }

    /// Stop tracking `source`.
    pub fn untrack(&self, source: SourceId) -> Option<Arc<TrackedConn>> {
        self.tracked.lock().remove(&source)
    }
}

// ============================================================================
// Tests
// ============================================================================
