//! Role vocabulary and the per-unit-of-work connection registry.
//!
//! The routing layer decides which physical connection a statement runs on
//! and installs that connection here under its role. The coordinator never
//! opens connections itself; it only reads this map at commit/rollback and
//! drains it at close.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::conn::ConnHandle;

// ============================================================================
// Role
// ============================================================================

/// Which side of the read/write split a connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The authoritative side: its outcome decides the logical transaction.
    Write,
    /// The best-effort side: failures are recorded, never surfaced.
    Read,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Write => write!(f, "write"),
            Role::Read => write!(f, "read"),
        }
    }
}

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Role → connection map for one logical unit of work.
///
/// At most one connection per role exists at a time; installing over an
/// occupied role displaces the previous handle and hands it back to the
/// caller, who remains responsible for it.
///
/// A registry belongs to exactly one unit of work. Concurrent units of work
/// use independent registries; nothing here arbitrates between two units of
/// work sharing one.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    slots: Mutex<HashMap<Role, ConnHandle>>,
}

impl ConnectionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Install the connection serving `role`, returning the displaced handle
    /// if the role was occupied.
    pub fn install(&self, role: Role, conn: ConnHandle) -> Option<ConnHandle> {
        self.slots.lock().insert(role, conn)
    }

    /// The connection serving `role`, if one was opened in this unit of work.
    pub fn connection(&self, role: Role) -> Option<ConnHandle> {
        self.slots.lock().get(&role).cloned()
    }

    /// Remove and return the connection serving `role`.
    pub fn remove(&self, role: Role) -> Option<ConnHandle> {
        self.slots.lock().remove(&role)
    }

    /// True once no role holds a connection.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
