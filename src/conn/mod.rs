//! # Connection Contract
//!
//! The seam between the coordinator and whatever driver actually talks to
//! the database. Every physical connection the routing layer opens is held
//! behind this trait, shared between the registry, the coordinator, and any
//! pool wrapper tracking it.
//!
//! ## Implementations
//!
//! | Connection | Module | Description |
//! |------------|--------|-------------|
//! | `MemoryConn` | `memory` | In-memory reference impl for testing/embedding |
//! | `WrappedConn` | `memory` | Delegating wrapper in the shape pools hand out |

pub mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use memory::{MemoryConn, WrappedConn};

// ============================================================================
// Identity newtypes
// ============================================================================

/// Stable identity of a physical connection.
///
/// Wrapper connections carry their own id; [`Connection::target`] exposes the
/// wrapped connection so matching can reach the raw id underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a connection source, used as the release-hook lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Lifecycle vocabulary
// ============================================================================

/// A transaction lifecycle operation on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxOp {
    Commit,
    Rollback,
    Close,
}

impl std::fmt::Display for TxOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxOp::Commit => write!(f, "commit"),
            TxOp::Rollback => write!(f, "rollback"),
            TxOp::Close => write!(f, "close"),
        }
    }
}

// ============================================================================
// Connection trait
// ============================================================================

/// A live driver connection.
///
/// All operations are synchronous and blocking; the only waiting at this
/// layer is the driver's own network I/O. Implementations use interior
/// mutability; the coordinator only ever sees shared [`ConnHandle`]s.
///
/// Contract notes:
/// - `close` on an already-closed connection is a no-op, never an error.
/// - `commit`/`rollback` on a closed connection is an error.
pub trait Connection: Send + Sync + std::fmt::Debug {
    /// Stable identity used for wrapper matching.
    fn id(&self) -> ConnId;

    /// Commit the driver-level transaction on this connection.
    fn commit(&self) -> Result<()>;

    /// Roll back the driver-level transaction on this connection.
    fn rollback(&self) -> Result<()>;

    /// Close the underlying handle.
    fn close(&self) -> Result<()>;

    /// For delegating wrappers: the raw connection underneath.
    fn target(&self) -> Option<ConnHandle> {
        None
    }
}

/// Shared handle to a live connection.
pub type ConnHandle = Arc<dyn Connection>;

// ============================================================================
// Connection sources
// ============================================================================

/// What produced the logical connection, and what the coordinator may do to
/// it at close time.
///
/// This is a closed set: routing produces exactly these two shapes, and the
/// close path dispatches statically over them.
#[derive(Debug, Clone)]
pub enum ConnectionSource {
    /// Unpooled source: no wrapper tracking, direct closes always proceed.
    Plain,

    /// Pool-managed source: wrappers are tracked per unit of work, and the
    /// pool has a say over direct closes.
    Pooled {
        /// Release-hook lookup key for this source.
        id: SourceId,
        /// The pool's close policy.
        policy: ClosePolicy,
    },
}

/// A pooled source's say over direct closes.
#[derive(Debug, Clone)]
pub enum ClosePolicy {
    /// Every close request proceeds; the pool recycles on its own schedule.
    Always,

    /// Keep this pinned handle open across transactions (externally managed
    /// single connection); close everything else.
    KeepOpen(ConnHandle),
}

impl ConnectionSource {
    /// Whether this source can veto a direct close.
    pub fn supports_close_suppression(&self) -> bool {
        matches!(self, ConnectionSource::Pooled { .. })
    }

    /// Whether a direct close of `conn` should proceed.
    ///
    /// Always true for plain sources; pooled sources consult their policy.
    pub fn should_close(&self, conn: &ConnHandle) -> bool {
        match self {
            ConnectionSource::Plain => true,
            ConnectionSource::Pooled { policy, .. } => policy.should_close(conn),
        }
    }

    /// The release-hook lookup key, if this source is pooled.
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            ConnectionSource::Plain => None,
            ConnectionSource::Pooled { id, .. } => Some(*id),
        }
    }
}

impl ClosePolicy {
    fn should_close(&self, conn: &ConnHandle) -> bool {
        match self {
            ClosePolicy::Always => true,
            ClosePolicy::KeepOpen(pinned) => {
                !(Arc::ptr_eq(pinned, conn) || pinned.id() == conn.id())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
