//! Sticky pool cursor.
//!
//! # Design Decisions
//! - One slot per target kind, created lazily on first success
//! - Last writer wins between concurrent successes
//! - Reads are clamped to the pool length so the index is always in range

use dashmap::DashMap;

use crate::pool::endpoint::TargetKind;

/// Remembers the last endpoint index that succeeded, per target kind.
#[derive(Debug, Default)]
pub struct PoolCursor {
    slots: DashMap<TargetKind, usize>,
}

impl PoolCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index for a pool of `len` endpoints.
    pub fn current(&self, kind: TargetKind, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.slots.get(&kind).map(|slot| *slot % len).unwrap_or(0)
    }

    /// Remember `index` as the preferred endpoint.
    pub fn set(&self, kind: TargetKind, index: usize) {
        self.slots.insert(kind, index);
    }

    /// Forget the remembered index for one kind.
    pub fn reset(&self, kind: TargetKind) {
        self.slots.remove(&kind);
    }

    pub fn reset_all(&self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_zero() {
        let cursor = PoolCursor::new();
        assert_eq!(cursor.current(TargetKind::Rpc, 3), 0);
        assert_eq!(cursor.current(TargetKind::Rpc, 0), 0);
    }

    #[test]
    fn test_set_and_reset() {
        let cursor = PoolCursor::new();
        cursor.set(TargetKind::Rpc, 2);
        assert_eq!(cursor.current(TargetKind::Rpc, 3), 2);
        assert_eq!(cursor.current(TargetKind::Horizon, 3), 0);

        cursor.reset(TargetKind::Rpc);
        assert_eq!(cursor.current(TargetKind::Rpc, 3), 0);
    }

    #[test]
    fn test_index_stays_in_range() {
        let cursor = PoolCursor::new();
        cursor.set(TargetKind::Horizon, 4);
        assert_eq!(cursor.current(TargetKind::Horizon, 3), 1);
    }
}
