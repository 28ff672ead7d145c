//! Transient fire-impact markers with lazy expiry

use glam::Vec3;
use std::collections::BTreeMap;

/// Lifetime of an impact marker (ms)
pub const IMPACT_TTL_MS: u64 = 500;

/// Minimum spacing between expiry sweeps (ms)
pub const SWEEP_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub id: u64,
    pub position: Vec3,
    pub created_at: u64,
}

impl Impact {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) >= IMPACT_TTL_MS
    }
}

/// Arena of live impacts keyed by monotonic id.
///
/// Ids are handed out in creation order and every impact has the same
/// lifetime, so the oldest entries are always at the front of the map.
#[derive(Debug, Default)]
pub struct ImpactEffectManager {
    impacts: BTreeMap<u64, Impact>,
    next_id: u64,
    last_sweep: u64,
}

impl ImpactEffectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an impact at `position`, returning its id
    pub fn add_impact(&mut self, position: Vec3, now_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.impacts.insert(
            id,
            Impact {
                id,
                position,
                created_at: now_ms,
            },
        );
        id
    }

    /// Drop expired impacts. Runs at most once per sweep interval;
    /// returns how many were removed.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        if now_ms.saturating_sub(self.last_sweep) < SWEEP_INTERVAL_MS {
            return 0;
        }
        self.last_sweep = now_ms;

        let mut removed = 0;
        while let Some(entry) = self.impacts.first_entry() {
            if !entry.get().is_expired(now_ms) {
                break;
            }
            entry.remove();
            removed += 1;
        }
        removed
    }

    /// Impacts that should be drawn at `now_ms`
    pub fn active(&self, now_ms: u64) -> impl Iterator<Item = &Impact> + '_ {
        self.impacts.values().filter(move |impact| !impact.is_expired(now_ms))
    }

    pub fn get(&self, id: u64) -> Option<&Impact> {
        self.impacts.get(&id)
    }

    /// Stored impacts, including ones awaiting the next sweep
    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the manager like the frame loop does: one sweep attempt per frame
    fn run_frames(manager: &mut ImpactEffectManager, from: u64, to: u64, step: u64) {
        let mut now = from;
        while now <= to {
            manager.sweep(now);
            now += step;
        }
    }

    #[test]
    fn impact_present_at_400ms_and_gone_at_600ms() {
        for start in [0u64, 30, 50, 99, 170] {
            let mut manager = ImpactEffectManager::new();
            run_frames(&mut manager, 0, start, 10);
            let id = manager.add_impact(Vec3::ONE, start);

            run_frames(&mut manager, start, start + 400, 10);
            assert!(manager.get(id).is_some(), "start {start}: gone too early");
            assert_eq!(manager.active(start + 400).count(), 1);

            run_frames(&mut manager, start + 400, start + 600, 10);
            assert!(manager.get(id).is_none(), "start {start}: still stored at +600");
        }
    }

    #[test]
    fn sweep_is_throttled() {
        let mut manager = ImpactEffectManager::new();
        manager.add_impact(Vec3::ZERO, 0);
        assert_eq!(manager.sweep(50), 0);
        assert_eq!(manager.sweep(600), 1);
        manager.add_impact(Vec3::ZERO, 0);
        // Within 100ms of the previous sweep: nothing happens yet
        assert_eq!(manager.sweep(650), 0);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.sweep(700), 1);
    }

    #[test]
    fn expired_impacts_are_hidden_between_sweeps() {
        let mut manager = ImpactEffectManager::new();
        manager.add_impact(Vec3::ZERO, 0);
        manager.add_impact(Vec3::ONE, 300);
        assert_eq!(manager.active(550).count(), 1);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn ids_are_monotonic() {
        let mut manager = ImpactEffectManager::new();
        let a = manager.add_impact(Vec3::ZERO, 0);
        let b = manager.add_impact(Vec3::ZERO, 0);
        manager.sweep(1_000);
        let c = manager.add_impact(Vec3::ZERO, 1_000);
        assert!(a < b && b < c);
    }
}
