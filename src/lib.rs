//! # rwsplit — Read/Write-Split Transaction Coordination
//!
//! One logical transaction over two physical database connections: a
//! write-capable primary and a read-only secondary. The coordinator decides
//! how commit, rollback, and close are sequenced across the pair, whose
//! outcome is authoritative, and how disposal interacts with a pool that may
//! own the connection's lifecycle.
//!
//! ## Design Principles
//!
//! 1. **Write correctness is authoritative**: a failed write commit fails the
//!    transaction loudly; a failed read commit is recorded, never raised
//! 2. **The registry holds the state**: all per-transaction state lives in
//!    the unit of work's registries, so the coordinator can be shared or
//!    re-entered within its scope
//! 3. **The pool owns pooled handles**: close converts into a release signal
//!    when the pool tracks the handle, never a physical close underneath it
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use rwsplit::{ConnectionSource, MemoryConn, Role, UnitOfWork};
//!
//! # fn example() -> rwsplit::Result<()> {
//! // One scope per logical unit of work.
//! let scope = UnitOfWork::new();
//!
//! // The routing layer opens physical connections and installs them by role.
//! let write = MemoryConn::handle();
//! let read = MemoryConn::handle();
//! scope.registry().install(Role::Write, Arc::clone(&write));
//! scope.registry().install(Role::Read, Arc::clone(&read));
//!
//! // The caller drives the logical transaction boundary.
//! let tx = scope.transaction(Some(write), ConnectionSource::Plain);
//! tx.commit()?;
//! tx.close()?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Connection Sources
//!
//! | Source | Wrapper tracking | Close suppression |
//! |--------|------------------|-------------------|
//! | `Plain` | none | never |
//! | `Pooled` | per unit of work | per [`ClosePolicy`] |

// ============================================================================
// Modules
// ============================================================================

pub mod conn;
pub mod diag;
pub mod pool;
pub mod registry;
pub mod tx;

// ============================================================================
// Re-exports: Connections
// ============================================================================

pub use conn::{
    ClosePolicy, ConnHandle, ConnId, Connection, ConnectionSource, MemoryConn, SourceId, TxOp,
    WrappedConn,
};

// ============================================================================
// Re-exports: Registries
// ============================================================================

pub use pool::{ReleaseRegistry, TrackedConn};
pub use registry::{ConnectionRegistry, Role};

// ============================================================================
// Re-exports: Diagnostics
// ============================================================================

pub use diag::{DiagnosticSink, LogSink, MemorySink, SecondaryFailure};

// ============================================================================
// Re-exports: Coordination
// ============================================================================

pub use tx::RwTransaction;

// ============================================================================
// Top-level scope handle
// ============================================================================

use std::sync::Arc;

/// A logical unit of work: one caller-visible transaction scope.
///
/// Bundles the two per-scope collaborators (the role registry the routing
/// layer populates and the release table the pool layer tracks wrappers in)
/// and builds coordinators against them. Create one per thread or task;
/// a scope never serves two concurrent units of work.
pub struct UnitOfWork {
    registry: Arc<ConnectionRegistry>,
    releases: Arc<ReleaseRegistry>,
}

impl UnitOfWork {
    /// A fresh scope with an empty registry and release table.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            releases: Arc::new(ReleaseRegistry::new()),
        }
    }

    /// The role registry the routing layer installs connections into.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The release table the pool layer tracks wrappers in.
    pub fn releases(&self) -> &Arc<ReleaseRegistry> {
        &self.releases
    }

    /// A coordinator over this scope's registries.
    ///
    /// `logical` is the connection object the caller interacts with, if any;
    /// `source` is what produced it.
    pub fn transaction(
        &self,
        logical: Option<ConnHandle>,
        source: ConnectionSource,
    ) -> RwTransaction {
        RwTransaction::new(
            logical,
            source,
            Arc::clone(&self.registry),
            Arc::clone(&self.releases),
        )
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Write-side failure: the logical transaction failed.
    #[error("data access failure during {op} on the {role} connection: {message}")]
    DataAccess {
        op: conn::TxOp,
        role: registry::Role,
        message: String,
    },

    /// Raised by a driver connection implementation.
    #[error("connection error: {0}")]
    Connection(String),

    /// A commit or rollback reached an already-closed connection.
    #[error("connection closed: {0}")]
    Closed(String),
}

impl Error {
    /// Wrap a connection failure in the caller-visible authoritative kind.
    pub(crate) fn data_access(op: conn::TxOp, role: registry::Role, source: &Error) -> Self {
        Error::DataAccess {
            op,
            role,
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
