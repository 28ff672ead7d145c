//! Weapon fire gating and spread

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::movement::PlayerKinematicState;

/// How long the visual firing flag stays raised after an accepted shot (ms)
pub const FIRING_FLAG_MS: u64 = 50;

/// Weapons available to the local player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Accurate, moderate rate of fire
    Rifle,
    /// Fast but loose
    Smg,
}

impl Default for WeaponKind {
    fn default() -> Self {
        Self::Rifle
    }
}

/// Weapon name that matches no weapon
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weapon: {0}")]
pub struct UnknownWeapon(pub String);

impl std::str::FromStr for WeaponKind {
    type Err = UnknownWeapon;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rifle" => Ok(Self::Rifle),
            "smg" => Ok(Self::Smg),
            _ => Err(UnknownWeapon(s.trim().to_string())),
        }
    }
}

/// Weapon stats per weapon kind
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    pub name: &'static str,
    /// Minimum spacing between accepted shots (ms)
    pub fire_interval_ms: u64,
    /// Full width of the spread window on each lateral axis
    pub spread: f32,
    /// Damage per hit
    pub damage: f32,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Rifle => Self {
                name: "Tactical Rifle",
                fire_interval_ms: 150,
                spread: 0.02,
                damage: 30.0,
            },
            WeaponKind::Smg => Self {
                name: "Rapid SMG",
                fire_interval_ms: 80,
                spread: 0.05,
                damage: 20.0,
            },
        }
    }
}

/// Visual weapon state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    Idle,
    Firing,
}

/// An accepted shot, ready for hit resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireEvent {
    pub origin: Vec3,
    /// Unit direction after spread
    pub direction: Vec3,
    pub weapon: WeaponKind,
    pub damage: f32,
    pub fired_at: u64,
}

/// Rate-gates fire requests and computes spread-adjusted rays
#[derive(Debug, Clone)]
pub struct WeaponFireController {
    active: WeaponKind,
    /// Last accepted shot per weapon; survives weapon switches
    last_fire: HashMap<WeaponKind, u64>,
    firing_until: Option<u64>,
    rng: ChaCha8Rng,
}

impl WeaponFireController {
    pub fn new(active: WeaponKind, seed: u64) -> Self {
        Self {
            active,
            last_fire: HashMap::new(),
            firing_until: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn active(&self) -> WeaponKind {
        self.active
    }

    pub fn stats(&self) -> WeaponStats {
        WeaponStats::for_kind(self.active)
    }

    pub fn state(&self) -> FireState {
        if self.firing_until.is_some() {
            FireState::Firing
        } else {
            FireState::Idle
        }
    }

    /// Check if the active weapon would accept a shot at `now_ms`
    pub fn can_fire(&self, now_ms: u64) -> bool {
        match self.last_fire.get(&self.active) {
            Some(&last) => now_ms.saturating_sub(last) >= self.stats().fire_interval_ms,
            None => true,
        }
    }

    /// Switch weapons. Only the visual timer is reset.
    pub fn switch_weapon(&mut self, kind: WeaponKind) {
        if kind != self.active {
            self.active = kind;
            self.firing_until = None;
        }
    }

    /// Expire the visual firing flag
    pub fn update(&mut self, now_ms: u64) {
        if let Some(until) = self.firing_until {
            if now_ms >= until {
                self.firing_until = None;
            }
        }
    }

    /// Request a shot from the player's eye along their view.
    /// Returns `None` if the fire-rate interval has not elapsed.
    pub fn try_fire(&mut self, now_ms: u64, view: &PlayerKinematicState) -> Option<FireEvent> {
        if !self.can_fire(now_ms) {
            return None;
        }

        let stats = self.stats();
        self.last_fire.insert(self.active, now_ms);
        self.firing_until = Some(now_ms + FIRING_FLAG_MS);

        let rotation = view.view_rotation();
        let forward = rotation * Vec3::NEG_Z;
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;

        let half = stats.spread / 2.0;
        let offset_right = self.rng.gen_range(-half..=half);
        let offset_up = self.rng.gen_range(-half..=half);
        let direction = (forward + right * offset_right + up * offset_up)
            .try_normalize()
            .unwrap_or(forward);

        Some(FireEvent {
            origin: view.position,
            direction,
            weapon: self.active,
            damage: stats.damage,
            fired_at: now_ms,
        })
    }
}
