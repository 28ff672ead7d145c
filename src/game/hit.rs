//! Ray-based hit detection against targets and avatars

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::impact::ImpactEffectManager;
use super::weapon::FireEvent;

/// Miss distance used by the offline skirmish
pub const SKIRMISH_MAX_RANGE: f32 = 30.0;

/// Miss distance used by training and online scenes
pub const DEFAULT_MAX_RANGE: f32 = 20.0;

/// A ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl From<&FireEvent> for Ray {
    fn from(fire: &FireEvent) -> Self {
        Ray::new(fire.origin, fire.direction)
    }
}

/// Hit volume primitives. Cylinders and capsules are vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hitbox {
    Sphere { center: Vec3, radius: f32 },
    Cylinder { center: Vec3, radius: f32, half_height: f32 },
    Capsule { bottom: Vec3, top_y: f32, radius: f32 },
}

impl Hitbox {
    /// Distance along the ray to the first surface crossing, if any
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        match *self {
            Hitbox::Sphere { center, radius } => ray_sphere(ray, center, radius),
            Hitbox::Cylinder {
                center,
                radius,
                half_height,
            } => {
                let min_y = center.y - half_height;
                let max_y = center.y + half_height;
                let side = ray_vertical_tube(ray, center, radius, min_y, max_y);
                let caps = ray_disc(ray, center, radius, min_y).into_iter().chain(ray_disc(ray, center, radius, max_y));
                side.into_iter().chain(caps).reduce(f32::min)
            }
            Hitbox::Capsule { bottom, top_y, radius } => {
                let top = Vec3::new(bottom.x, top_y, bottom.z);
                let side = ray_vertical_tube(ray, bottom, radius, bottom.y, top_y);
                [side, ray_sphere(ray, bottom, radius), ray_sphere(ray, top, radius)]
                    .into_iter()
                    .flatten()
                    .reduce(f32::min)
            }
        }
    }
}

fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let near = -b - root;
    let far = -b + root;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Open vertical tube around `axis` (x/z) between `min_y` and `max_y`
fn ray_vertical_tube(ray: &Ray, axis: Vec3, radius: f32, min_y: f32, max_y: f32) -> Option<f32> {
    let (dx, dz) = (ray.direction.x, ray.direction.z);
    let a = dx * dx + dz * dz;
    if a < 1e-9 {
        return None;
    }
    let (ox, oz) = (ray.origin.x - axis.x, ray.origin.z - axis.z);
    let b = ox * dx + oz * dz;
    let c = ox * ox + oz * oz - radius * radius;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    [(-b - root) / a, (-b + root) / a].into_iter().find(|&t| {
        let y = ray.origin.y + ray.direction.y * t;
        t >= 0.0 && y >= min_y && y <= max_y
    })
}

/// Horizontal disc of `radius` around `axis` at height `y`
fn ray_disc(ray: &Ray, axis: Vec3, radius: f32, y: f32) -> Option<f32> {
    if ray.direction.y.abs() < 1e-9 {
        return None;
    }
    let t = (y - ray.origin.y) / ray.direction.y;
    if t < 0.0 {
        return None;
    }
    let p = ray.at(t);
    let (dx, dz) = (p.x - axis.x, p.z - axis.z);
    (dx * dx + dz * dz <= radius * radius).then_some(t)
}

/// Hit volumes of a practice target centred on `position`
pub fn target_hitboxes(position: Vec3) -> [Hitbox; 2] {
    [
        Hitbox::Cylinder {
            center: position,
            radius: 0.3,
            half_height: 1.0,
        },
        Hitbox::Sphere {
            center: position + Vec3::new(0.0, 1.2, 0.0),
            radius: 0.4,
        },
    ]
}

/// Hit volumes of a remote avatar whose origin is `position`
pub fn avatar_hitboxes(position: Vec3) -> [Hitbox; 2] {
    [
        Hitbox::Capsule {
            bottom: position + Vec3::new(0.0, 0.5, 0.0),
            top_y: position.y + 1.3,
            radius: 0.3,
        },
        Hitbox::Sphere {
            center: position + Vec3::new(0.0, 1.7, 0.0),
            radius: 0.25,
        },
    ]
}

/// Identity of anything that can be shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TargetId {
    Target(u32),
    Player(Uuid),
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetId::Target(id) => write!(f, "target:{}", id),
            TargetId::Player(id) => write!(f, "player:{}", id),
        }
    }
}

/// Registry members the engine can test a ray against
pub trait Shootable {
    fn target_id(&self) -> TargetId;

    fn hitboxes(&self) -> [Hitbox; 2];

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.hitboxes()
            .iter()
            .filter_map(|hitbox| hitbox.intersect(ray))
            .reduce(f32::min)
    }
}

/// Which intersecting registry member wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitSelection {
    /// Closest intersection along the ray
    #[default]
    Nearest,
    /// First member in registry order that intersects at all
    RegistryOrder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub target: TargetId,
    pub point: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Miss {
    /// Synthetic far point at max range
    pub point: Vec3,
}

/// Resolution of a single shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotOutcome {
    Hit(Hit),
    Miss(Miss),
}

impl ShotOutcome {
    /// Where the impact effect goes
    pub fn point(&self) -> Vec3 {
        match self {
            ShotOutcome::Hit(hit) => hit.point,
            ShotOutcome::Miss(miss) => miss.point,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, ShotOutcome::Hit(_))
    }
}

/// Resolves fired rays against the live registry
#[derive(Debug, Clone, Copy)]
pub struct HitDetectionEngine {
    max_range: f32,
    selection: HitSelection,
}

impl HitDetectionEngine {
    pub fn new(max_range: f32, selection: HitSelection) -> Self {
        Self { max_range, selection }
    }

    pub fn max_range(&self) -> f32 {
        self.max_range
    }

    /// Cast the shot's ray against every registry member
    pub fn resolve<'a, T, I>(&self, fire: &FireEvent, registry: I) -> ShotOutcome
    where
        T: Shootable + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let ray = Ray::from(fire);
        let mut best: Option<Hit> = None;

        for member in registry {
            let Some(distance) = member.intersect(&ray) else {
                continue;
            };
            let hit = Hit {
                target: member.target_id(),
                point: ray.at(distance),
                distance,
            };
            match self.selection {
                HitSelection::RegistryOrder => return ShotOutcome::Hit(hit),
                HitSelection::Nearest => {
                    if best.map_or(true, |b| distance < b.distance) {
                        best = Some(hit);
                    }
                }
            }
        }

        match best {
            Some(hit) => ShotOutcome::Hit(hit),
            None => ShotOutcome::Miss(Miss {
                point: ray.at(self.max_range),
            }),
        }
    }

    /// Resolve a shot, run the matching callback, then enqueue the impact
    pub fn resolve_and_apply<'a, T, I, H, M>(
        &self,
        fire: &FireEvent,
        registry: I,
        impacts: &mut ImpactEffectManager,
        now_ms: u64,
        on_hit: H,
        on_miss: M,
    ) -> ShotOutcome
    where
        T: Shootable + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
        H: FnOnce(&Hit),
        M: FnOnce(&Miss),
    {
        let outcome = self.resolve(fire, registry);
        match &outcome {
            ShotOutcome::Hit(hit) => on_hit(hit),
            ShotOutcome::Miss(miss) => on_miss(miss),
        }
        impacts.add_impact(outcome.point(), now_ms);
        outcome
    }
}

impl Default for HitDetectionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RANGE, HitSelection::Nearest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::weapon::WeaponKind;

    struct Dummy {
        id: u32,
        position: Vec3,
    }

    impl Shootable for Dummy {
        fn target_id(&self) -> TargetId {
            TargetId::Target(self.id)
        }

        fn hitboxes(&self) -> [Hitbox; 2] {
            target_hitboxes(self.position)
        }
    }

    fn shot(origin: Vec3, direction: Vec3) -> FireEvent {
        FireEvent {
            origin,
            direction: direction.normalize(),
            weapon: WeaponKind::Rifle,
            damage: 30.0,
            fired_at: 0,
        }
    }

    #[test]
    fn ray_through_body_hits_cylinder_surface() {
        let engine = HitDetectionEngine::new(SKIRMISH_MAX_RANGE, HitSelection::Nearest);
        let dummy = Dummy {
            id: 1,
            position: Vec3::new(0.0, 1.0, -15.0),
        };
        let outcome = engine.resolve(&shot(Vec3::new(0.0, 1.0, 5.0), Vec3::NEG_Z), [&dummy]);

        let ShotOutcome::Hit(hit) = outcome else {
            panic!("expected hit, got {:?}", outcome);
        };
        assert_eq!(hit.target, TargetId::Target(1));
        assert!((hit.point - Vec3::new(0.0, 1.0, -14.7)).length() < 1e-4);
        assert!((hit.distance - 19.7).abs() < 1e-4);
    }

    #[test]
    fn ray_over_body_hits_head_sphere() {
        let engine = HitDetectionEngine::default();
        let dummy = Dummy {
            id: 4,
            position: Vec3::new(0.0, 1.0, -10.0),
        };
        let outcome = engine.resolve(&shot(Vec3::new(0.0, 2.2, 0.0), Vec3::NEG_Z), [&dummy]);
        let ShotOutcome::Hit(hit) = outcome else {
            panic!("expected head hit");
        };
        let head = Vec3::new(0.0, 2.2, -10.0);
        assert!(((hit.point - head).length() - 0.4).abs() < 1e-4);
    }

    #[test]
    fn clean_miss_lands_at_max_range() {
        let engine = HitDetectionEngine::new(SKIRMISH_MAX_RANGE, HitSelection::Nearest);
        let dummy = Dummy {
            id: 1,
            position: Vec3::new(5.0, 1.0, -15.0),
        };
        let origin = Vec3::new(0.0, 1.6, 5.0);
        let outcome = engine.resolve(&shot(origin, Vec3::NEG_Z), [&dummy]);
        assert_eq!(
            outcome,
            ShotOutcome::Miss(Miss {
                point: origin + Vec3::NEG_Z * 30.0
            })
        );
    }

    #[test]
    fn selection_policy_decides_between_stacked_targets() {
        let far = Dummy {
            id: 1,
            position: Vec3::new(0.0, 1.0, -20.0),
        };
        let near = Dummy {
            id: 2,
            position: Vec3::new(0.0, 1.0, -10.0),
        };
        let fire = shot(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z);

        let nearest = HitDetectionEngine::new(30.0, HitSelection::Nearest).resolve(&fire, [&far, &near]);
        let ordered = HitDetectionEngine::new(30.0, HitSelection::RegistryOrder).resolve(&fire, [&far, &near]);

        assert!(matches!(nearest, ShotOutcome::Hit(Hit { target: TargetId::Target(2), .. })));
        assert!(matches!(ordered, ShotOutcome::Hit(Hit { target: TargetId::Target(1), .. })));
    }

    #[test]
    fn shooting_down_onto_cylinder_hits_top_cap() {
        let hitbox = Hitbox::Cylinder {
            center: Vec3::ZERO,
            radius: 0.3,
            half_height: 1.0,
        };
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.0), Vec3::NEG_Y);
        let t = hitbox.intersect(&ray).expect("cap hit");
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn avatar_capsule_catches_body_shots() {
        let ray = Ray::new(Vec3::new(0.0, 0.9, 10.0), Vec3::NEG_Z);
        let t = avatar_hitboxes(Vec3::ZERO)
            .iter()
            .filter_map(|h| h.intersect(&ray))
            .reduce(f32::min)
            .expect("body hit");
        assert!((t - 9.7).abs() < 1e-4);

        let over = Ray::new(Vec3::new(0.0, 2.5, 10.0), Vec3::NEG_Z);
        assert!(avatar_hitboxes(Vec3::ZERO).iter().all(|h| h.intersect(&over).is_none()));
    }

    #[test]
    fn callbacks_run_before_impact_is_enqueued() {
        let engine = HitDetectionEngine::default();
        let mut impacts = ImpactEffectManager::new();
        let dummy = Dummy {
            id: 3,
            position: Vec3::new(0.0, 1.0, -5.0),
        };

        let mut hits = 0;
        let mut misses = 0;
        let outcome = engine.resolve_and_apply(
            &shot(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z),
            [&dummy],
            &mut impacts,
            10,
            |_| hits += 1,
            |_| misses += 1,
        );
        assert!(outcome.is_hit());
        assert_eq!((hits, misses), (1, 0));
        assert_eq!(impacts.active(10).count(), 1);

        let empty: [&Dummy; 0] = [];
        engine.resolve_and_apply(
            &shot(Vec3::ZERO, Vec3::X),
            empty,
            &mut impacts,
            20,
            |_| hits += 1,
            |_| misses += 1,
        );
        assert_eq!((hits, misses), (1, 1));
        assert_eq!(impacts.active(20).count(), 2);
    }
}
