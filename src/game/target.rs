//! Practice targets bouncing inside fixed lanes

use glam::Vec3;

use super::hit::{target_hitboxes, Hitbox, Shootable, TargetId};

/// Lane a target is confined to on the ground plane. A degenerate axis
/// (min == max) pins the target on that axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl TargetBounds {
    pub fn contains(&self, position: Vec3) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.z >= self.min_z
            && position.z <= self.max_z
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingTarget {
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub bounds: TargetBounds,
}

/// Axis the bounce happened on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceAxis {
    X,
    Z,
}

impl MovingTarget {
    pub fn new(id: u32, position: Vec3, velocity: Vec3, bounds: TargetBounds) -> Self {
        Self {
            id,
            position,
            velocity,
            bounds,
        }
    }

    /// A target that never moves
    pub fn fixed(id: u32, position: Vec3) -> Self {
        Self::new(
            id,
            position,
            Vec3::ZERO,
            TargetBounds {
                min_x: position.x,
                max_x: position.x,
                min_z: position.z,
                max_z: position.z,
            },
        )
    }

    /// Advance by `dt` seconds, returning the axes that bounced
    pub fn step(&mut self, dt: f32) -> Vec<BounceAxis> {
        let mut bounces = Vec::new();
        if bounce_axis(&mut self.position.x, &mut self.velocity.x, self.bounds.min_x, self.bounds.max_x, dt) {
            bounces.push(BounceAxis::X);
        }
        if bounce_axis(&mut self.position.z, &mut self.velocity.z, self.bounds.min_z, self.bounds.max_z, dt) {
            bounces.push(BounceAxis::Z);
        }
        bounces
    }
}

/// Integrate one axis; on reaching or crossing a bound the overshoot is
/// reflected back inside and the velocity flips.
fn bounce_axis(position: &mut f32, velocity: &mut f32, min: f32, max: f32, dt: f32) -> bool {
    if max <= min || *velocity == 0.0 {
        return false;
    }

    let next = *position + *velocity * dt;
    let bounced = if next <= min && *velocity < 0.0 {
        *position = (2.0 * min - next).min(max);
        true
    } else if next >= max && *velocity > 0.0 {
        *position = (2.0 * max - next).max(min);
        true
    } else {
        *position = next;
        false
    };

    if bounced {
        *velocity = -*velocity;
    }
    bounced
}

impl Shootable for MovingTarget {
    fn target_id(&self) -> TargetId {
        TargetId::Target(self.id)
    }

    fn hitboxes(&self) -> [Hitbox; 2] {
        target_hitboxes(self.position)
    }
}

/// A bounce that happened during a simulation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounce {
    pub target_id: u32,
    pub axis: BounceAxis,
}

/// Owns and advances the scene's practice targets
#[derive(Debug, Clone, Default)]
pub struct MovingTargetSimulator {
    targets: Vec<MovingTarget>,
}

impl MovingTargetSimulator {
    pub fn new(targets: Vec<MovingTarget>) -> Self {
        Self { targets }
    }

    /// The three lanes of the offline skirmish
    pub fn skirmish() -> Self {
        Self::new(vec![
            MovingTarget::new(
                1,
                Vec3::new(-5.0, 1.0, -15.0),
                Vec3::new(2.0, 0.0, 0.0),
                TargetBounds {
                    min_x: -8.0,
                    max_x: -2.0,
                    min_z: -15.0,
                    max_z: -15.0,
                },
            ),
            MovingTarget::new(
                2,
                Vec3::new(5.0, 1.0, -18.0),
                Vec3::new(-1.5, 0.0, 0.0),
                TargetBounds {
                    min_x: 2.0,
                    max_x: 8.0,
                    min_z: -18.0,
                    max_z: -18.0,
                },
            ),
            MovingTarget::new(
                3,
                Vec3::new(0.0, 1.0, -22.0),
                Vec3::new(0.0, 0.0, 1.2),
                TargetBounds {
                    min_x: 0.0,
                    max_x: 0.0,
                    min_z: -25.0,
                    max_z: -19.0,
                },
            ),
        ])
    }

    /// Static dummies of the training range
    pub fn training_dummies() -> Self {
        Self::new(vec![
            MovingTarget::fixed(1, Vec3::new(0.0, 1.0, -15.0)),
            MovingTarget::fixed(2, Vec3::new(4.0, 1.0, -18.0)),
            MovingTarget::fixed(3, Vec3::new(-4.0, 1.0, -18.0)),
        ])
    }

    pub fn targets(&self) -> &[MovingTarget] {
        &self.targets
    }

    /// Advance every target by `dt` seconds
    pub fn step(&mut self, dt: f32) -> Vec<Bounce> {
        let mut bounces = Vec::new();
        for target in &mut self.targets {
            for axis in target.step(dt) {
                bounces.push(Bounce {
                    target_id: target.id,
                    axis,
                });
            }
        }
        bounces
    }
}
