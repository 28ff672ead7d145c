//! Sequence-stamped caches for polled directory data

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::net::protocol::{LobbySession, PlayerSnapshot};

/// Value as of one directory response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stamped<T> {
    /// Sequence number of the request that produced it
    pub seq: u64,
    pub value: T,
}

/// Latest applied response. Readers get a cheap `Arc` of the current
/// value; writers swap it out wholesale.
#[derive(Debug)]
pub struct SeqCache<T> {
    current: Arc<RwLock<Arc<Stamped<T>>>>,
    next_seq: Arc<AtomicU64>,
}

impl<T> Clone for SeqCache<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            next_seq: self.next_seq.clone(),
        }
    }
}

impl<T: Default> Default for SeqCache<T> {
    fn default() -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(Stamped::default()))),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<T: Default> SeqCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number for a request about to be issued
    pub fn issue_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the value if `seq` is newer than the applied one.
    /// Returns false for a stale response.
    pub fn apply(&self, seq: u64, value: T) -> bool {
        let mut current = self.current.write();
        if seq <= current.seq {
            trace!(seq, applied = current.seq, "Discarding stale response");
            return false;
        }
        *current = Arc::new(Stamped { seq, value });
        true
    }

    pub fn snapshot(&self) -> Arc<Stamped<T>> {
        self.current.read().clone()
    }

    /// Reset to empty when leaving a scene. Sequence numbering continues.
    pub fn clear(&self) {
        let mut current = self.current.write();
        let seq = current.seq;
        *current = Arc::new(Stamped {
            seq,
            value: T::default(),
        });
    }
}

/// Players in the current game
pub type RosterCache = SeqCache<Vec<PlayerSnapshot>>;

/// Joinable lobbies
pub type LobbyListCache = SeqCache<Vec<LobbySession>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::Position;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(x: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: Uuid::new_v4(),
            position: Position {
                x,
                ..Default::default()
            },
            health: 100,
            is_alive: true,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn out_of_order_response_is_discarded() {
        let cache = RosterCache::new();
        let first = cache.issue_seq();
        let second = cache.issue_seq();
        assert!(second > first);

        assert!(cache.apply(second, vec![entry(2.0)]));
        assert!(!cache.apply(first, vec![entry(1.0)]));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.seq, second);
        assert_eq!(snapshot.value[0].position.x, 2.0);
    }

    #[test]
    fn readers_keep_their_snapshot_across_swaps() {
        let cache = RosterCache::new();
        let seq = cache.issue_seq();
        cache.apply(seq, vec![entry(1.0)]);
        let held = cache.snapshot();

        let seq = cache.issue_seq();
        cache.apply(seq, Vec::new());
        assert_eq!(held.value.len(), 1);
        assert!(cache.snapshot().value.is_empty());
    }

    #[test]
    fn clear_keeps_sequence() {
        let cache = RosterCache::new();
        let seq = cache.issue_seq();
        cache.apply(seq, vec![entry(1.0)]);
        cache.clear();
        assert!(cache.snapshot().value.is_empty());
        assert!(!cache.apply(seq, vec![entry(1.0)]));
    }
}
