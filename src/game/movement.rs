//! First-person kinematic movement and arena constraints

use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Movement constants for the local player
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// Radians of look rotation per pixel of mouse travel
    pub sensitivity: f32,
    /// Walking speed (units per second)
    pub base_speed: f32,
    /// Sprinting speed (units per second)
    pub sprint_speed: f32,
    /// Horizontal velocity multiplier applied per frame with no movement key held
    pub idle_decay: f32,
    /// Downward acceleration while airborne
    pub gravity: f32,
    /// Initial vertical velocity of a jump
    pub jump_velocity: f32,
    /// Eye height when standing
    pub stand_height: f32,
    /// Eye height when crouched
    pub crouch_height: f32,
    /// Playable rectangle on the ground plane
    pub arena: Arena,
}

impl Default for MovementStats {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            base_speed: 4.0,
            sprint_speed: 8.0,
            idle_decay: 0.9,
            gravity: 20.0,
            jump_velocity: 5.0,
            stand_height: 1.6,
            crouch_height: 1.2,
            arena: Arena::default(),
        }
    }
}

impl MovementStats {
    pub fn eye_height(&self, crouching: bool) -> f32 {
        if crouching {
            self.crouch_height
        } else {
            self.stand_height
        }
    }
}

/// Axis-aligned rectangle on the XZ plane
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            min_x: -9.0,
            max_x: 9.0,
            min_z: -25.0,
            max_z: 25.0,
        }
    }
}

impl Arena {
    pub fn clamp(&self, position: &mut Vec3) {
        position.x = position.x.clamp(self.min_x, self.max_x);
        position.z = position.z.clamp(self.min_z, self.max_z);
    }
}

/// Held movement keys for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
}

impl MoveKeys {
    pub fn any_direction(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }
}

/// Raw per-frame movement input. `jump` and `crouch` are held states;
/// the controller derives their rising edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementInput {
    pub keys: MoveKeys,
    pub mouse_dx: f32,
    pub mouse_dy: f32,
    pub jump: bool,
    pub crouch: bool,
}

/// Kinematic state of the local player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerKinematicState {
    pub position: Vec3,
    /// Rotation about the vertical axis (radians)
    pub yaw: f32,
    /// Look elevation, clamped to [-PI/2, PI/2]
    pub pitch: f32,
    pub velocity: Vec3,
    pub airborne: bool,
    pub crouching: bool,
}

impl PlayerKinematicState {
    pub fn spawn(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            velocity: Vec3::ZERO,
            airborne: false,
            crouching: false,
        }
    }

    /// View rotation (yaw then pitch)
    pub fn view_rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Unit view direction; yaw 0 / pitch 0 looks down -Z
    pub fn forward(&self) -> Vec3 {
        self.view_rotation() * Vec3::NEG_Z
    }
}

/// Default spawn point for every scene
pub const SPAWN_POINT: Vec3 = Vec3::new(0.0, 1.6, 5.0);

/// Integrates player input into position and orientation each frame
#[derive(Debug, Clone)]
pub struct KinematicController {
    stats: MovementStats,
    state: PlayerKinematicState,
    jump_held: bool,
    crouch_held: bool,
}

impl KinematicController {
    pub fn new(stats: MovementStats, spawn: Vec3) -> Self {
        Self {
            stats,
            state: PlayerKinematicState::spawn(spawn),
            jump_held: false,
            crouch_held: false,
        }
    }

    pub fn state(&self) -> &PlayerKinematicState {
        &self.state
    }

    pub fn stats(&self) -> &MovementStats {
        &self.stats
    }

    /// Advance the player by one frame
    pub fn update(&mut self, input: &MovementInput, dt: f32) {
        let stats = self.stats;
        let dt = dt.max(0.0);

        // Mouse look
        let state = &mut self.state;
        state.yaw -= input.mouse_dx * stats.sensitivity;
        state.pitch = (state.pitch - input.mouse_dy * stats.sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);

        // Edge-triggered stance and jump
        if input.crouch && !self.crouch_held {
            state.crouching = !state.crouching;
        }
        self.crouch_held = input.crouch;

        if input.jump && !self.jump_held && !state.airborne {
            state.airborne = true;
            state.velocity.y = stats.jump_velocity;
        }
        self.jump_held = input.jump;

        // Horizontal movement
        let keys = input.keys;
        if keys.any_direction() {
            let mut direction = Vec3::ZERO;
            if keys.forward {
                direction.z -= 1.0;
            }
            if keys.back {
                direction.z += 1.0;
            }
            if keys.left {
                direction.x -= 1.0;
            }
            if keys.right {
                direction.x += 1.0;
            }

            // Opposing keys cancel out and count as no movement
            if let Some(direction) = direction.try_normalize() {
                let speed = if keys.sprint { stats.sprint_speed } else { stats.base_speed };
                let world = Quat::from_rotation_y(state.yaw) * direction;
                state.velocity.x = world.x * speed;
                state.velocity.z = world.z * speed;
            } else {
                state.velocity.x *= stats.idle_decay;
                state.velocity.z *= stats.idle_decay;
            }
        } else {
            state.velocity.x *= stats.idle_decay;
            state.velocity.z *= stats.idle_decay;
        }

        // Vertical motion
        let height = stats.eye_height(state.crouching);
        if state.airborne {
            state.velocity.y -= stats.gravity * dt;
        } else {
            state.position.y = height;
            state.velocity.y = 0.0;
        }

        state.position += state.velocity * dt;

        // Landing
        if state.airborne && state.velocity.y <= 0.0 && state.position.y <= height {
            state.position.y = height;
            state.velocity.y = 0.0;
            state.airborne = false;
        }

        stats.arena.clamp(&mut state.position);
    }
}

impl Default for KinematicController {
    fn default() -> Self {
        Self::new(MovementStats::default(), SPAWN_POINT)
    }
}
