//! Entity identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Next id to hand out. Zero is reserved for [`EntityId::NULL`].
static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a live entity (enemy, NPC, projectile).
///
/// IDs are never reused within a process, so per-target bookkeeping keyed
/// by `EntityId` stays correct after the owning collection swap-removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Takes the next id from the process-wide counter.
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a stored value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The stored value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Id of nothing.
    pub const NULL: Self = Self(0);

    /// False only for [`EntityId::NULL`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_roundtrip() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "#42");
    }

    #[test]
    fn test_ids_are_monotonic() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert!(b > a);
    }
}
