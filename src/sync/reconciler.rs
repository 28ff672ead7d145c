//! Remote avatar state: roster diffing and per-frame smoothing

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use tracing::{debug, info};

use crate::game::hit::{avatar_hitboxes, Hitbox, Shootable, TargetId};
use crate::game::movement::MovementStats;
use crate::net::protocol::{PlayerId, PlayerSnapshot};

use super::roster::Stamped;

/// Fraction of the remaining distance covered each frame
pub const SMOOTHING_FACTOR: f32 = 0.2;

/// Wrap an angle difference into [-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can land exactly on TAU for tiny negative inputs
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// A remote player as rendered locally
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAvatar {
    pub player_id: PlayerId,
    /// Smoothed (rendered) eye position
    pub position: Vec3,
    pub yaw: f32,
    pub target_position: Vec3,
    pub target_yaw: f32,
    pub health: u32,
    pub is_alive: bool,
}

impl RemoteAvatar {
    fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        let target = snapshot.position.point();
        Self {
            player_id: snapshot.player_id,
            position: target,
            yaw: snapshot.position.rotation,
            target_position: target,
            target_yaw: snapshot.position.rotation,
            health: snapshot.health,
            is_alive: snapshot.is_alive,
        }
    }

    fn retarget(&mut self, snapshot: &PlayerSnapshot) {
        self.target_position = snapshot.position.point();
        self.target_yaw = snapshot.position.rotation;
        self.health = snapshot.health;
        self.is_alive = snapshot.is_alive;
    }

    /// One frame of smoothing toward the target transform
    pub fn smooth(&mut self, factor: f32) {
        self.position = self.position.lerp(self.target_position, factor);
        self.yaw = wrap_angle(self.yaw + wrap_angle(self.target_yaw - self.yaw) * factor);
    }

    /// Ground point under the avatar.
    ///
    /// Snapshots carry eye height but no stance, so the standing eye height
    /// is assumed. A crouched peer reports a lower eye; the feet are kept on
    /// the floor instead of sinking below it.
    pub fn feet(&self) -> Vec3 {
        let y = (self.position.y - MovementStats::default().stand_height).max(0.0);
        Vec3::new(self.position.x, y, self.position.z)
    }
}

impl Shootable for RemoteAvatar {
    fn target_id(&self) -> TargetId {
        TargetId::Player(self.player_id)
    }

    fn hitboxes(&self) -> [Hitbox; 2] {
        avatar_hitboxes(self.feet())
    }
}

/// Roster membership changes found by one sync
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterChanges {
    pub joined: Vec<PlayerId>,
    pub departed: Vec<PlayerId>,
}

impl RosterChanges {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.departed.is_empty()
    }
}

/// Keeps the locally rendered avatars in line with the cached roster.
/// The local player is never rendered.
pub struct RemoteStateReconciler {
    local_id: PlayerId,
    avatars: Vec<RemoteAvatar>,
    applied_seq: u64,
    smoothing: f32,
}

impl RemoteStateReconciler {
    pub fn new(local_id: PlayerId) -> Self {
        Self {
            local_id,
            avatars: Vec::new(),
            applied_seq: 0,
            smoothing: SMOOTHING_FACTOR,
        }
    }

    pub fn avatars(&self) -> &[RemoteAvatar] {
        &self.avatars
    }

    pub fn avatar(&self, player_id: &PlayerId) -> Option<&RemoteAvatar> {
        self.avatars.iter().find(|a| &a.player_id == player_id)
    }

    /// Adopt a newer roster. Avatars absent from it are dropped; new ones
    /// appear at their reported transform.
    pub fn sync(&mut self, roster: &Stamped<Vec<PlayerSnapshot>>) -> RosterChanges {
        let mut changes = RosterChanges::default();
        if roster.seq <= self.applied_seq {
            return changes;
        }
        self.applied_seq = roster.seq;

        let remote: Vec<&PlayerSnapshot> = roster
            .value
            .iter()
            .filter(|p| p.player_id != self.local_id)
            .collect();

        self.avatars.retain(|avatar| {
            let present = remote.iter().any(|p| p.player_id == avatar.player_id);
            if !present {
                changes.departed.push(avatar.player_id);
            }
            present
        });

        for snapshot in remote {
            match self.avatars.iter_mut().find(|a| a.player_id == snapshot.player_id) {
                Some(avatar) => avatar.retarget(snapshot),
                None => {
                    self.avatars.push(RemoteAvatar::from_snapshot(snapshot));
                    changes.joined.push(snapshot.player_id);
                }
            }
        }

        for player_id in &changes.joined {
            info!(player_id = %player_id, "Remote player appeared");
        }
        for player_id in &changes.departed {
            info!(player_id = %player_id, "Remote player left");
        }
        if !changes.is_empty() {
            debug!(seq = roster.seq, avatars = self.avatars.len(), "Roster reconciled");
        }
        changes
    }

    /// Per-frame smoothing of every avatar
    pub fn update(&mut self) {
        for avatar in &mut self.avatars {
            avatar.smooth(self.smoothing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::Position;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot(player_id: PlayerId, x: f32, rotation: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id,
            position: Position {
                x,
                y: 1.6,
                z: 0.0,
                rotation,
            },
            health: 100,
            is_alive: true,
            last_updated: Utc::now(),
        }
    }

    fn roster(seq: u64, players: Vec<PlayerSnapshot>) -> Stamped<Vec<PlayerSnapshot>> {
        Stamped { seq, value: players }
    }

    #[test]
    fn local_identity_is_never_rendered() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut reconciler = RemoteStateReconciler::new(me);

        let changes = reconciler.sync(&roster(1, vec![snapshot(me, 0.0, 0.0), snapshot(other, 1.0, 0.0)]));
        assert_eq!(changes.joined, vec![other]);
        assert!(reconciler.avatar(&me).is_none());
        assert_eq!(reconciler.avatars().len(), 1);
    }

    #[test]
    fn absence_removes_avatar() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut reconciler = RemoteStateReconciler::new(me);

        reconciler.sync(&roster(1, vec![snapshot(other, 1.0, 0.0)]));
        let changes = reconciler.sync(&roster(2, vec![snapshot(me, 0.0, 0.0)]));
        assert_eq!(changes.departed, vec![other]);
        assert!(reconciler.avatars().is_empty());
    }

    #[test]
    fn already_applied_roster_is_ignored() {
        let other = Uuid::new_v4();
        let mut reconciler = RemoteStateReconciler::new(Uuid::new_v4());
        reconciler.sync(&roster(3, vec![snapshot(other, 1.0, 0.0)]));
        reconciler.sync(&roster(3, Vec::new()));
        assert_eq!(reconciler.avatars().len(), 1);
    }

    #[test]
    fn smoothing_covers_a_fifth_per_frame() {
        let other = Uuid::new_v4();
        let mut reconciler = RemoteStateReconciler::new(Uuid::new_v4());
        reconciler.sync(&roster(1, vec![snapshot(other, 0.0, 0.0)]));
        reconciler.sync(&roster(2, vec![snapshot(other, 10.0, 0.0)]));

        reconciler.update();
        assert!((reconciler.avatars()[0].position.x - 2.0).abs() < 1e-5);
        reconciler.update();
        assert!((reconciler.avatars()[0].position.x - 3.6).abs() < 1e-5);
    }

    #[test]
    fn yaw_takes_the_short_way_round() {
        let other = Uuid::new_v4();
        let mut reconciler = RemoteStateReconciler::new(Uuid::new_v4());
        reconciler.sync(&roster(1, vec![snapshot(other, 0.0, 3.0)]));
        reconciler.sync(&roster(2, vec![snapshot(other, 0.0, -3.0)]));

        reconciler.update();
        let yaw = reconciler.avatars()[0].yaw;
        // Short path crosses PI: 3.0 -> ~3.057, not toward zero
        assert!(yaw > 3.0 || yaw < -3.0, "yaw {yaw} went the long way");
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        for i in -100..=100 {
            let angle = i as f32 * 0.37;
            let wrapped = wrap_angle(angle);
            assert!((-PI..=PI).contains(&wrapped), "{angle} -> {wrapped}");
            assert!(((angle - wrapped) / TAU - ((angle - wrapped) / TAU).round()).abs() < 1e-4);
        }
    }

    #[test]
    fn avatar_hitboxes_sit_on_the_ground() {
        let other = Uuid::new_v4();
        let mut reconciler = RemoteStateReconciler::new(Uuid::new_v4());
        reconciler.sync(&roster(1, vec![snapshot(other, 0.0, 0.0)]));
        let avatar = &reconciler.avatars()[0];
        assert!(avatar.feet().y.abs() < 1e-6);
        assert_eq!(avatar.target_id(), TargetId::Player(other));
    }

    #[test]
    fn crouched_avatar_stays_on_the_floor() {
        let other = Uuid::new_v4();
        let mut crouched = snapshot(other, 2.0, 0.0);
        crouched.position.y = MovementStats::default().crouch_height;

        let mut reconciler = RemoteStateReconciler::new(Uuid::new_v4());
        reconciler.sync(&roster(1, vec![crouched]));
        let feet = reconciler.avatars()[0].feet();
        assert_eq!(feet.y, 0.0);
        assert_eq!(feet.x, 2.0);
    }
}
