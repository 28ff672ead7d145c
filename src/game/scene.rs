//! Per-frame orchestration of the local simulation

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::time::SimClock;

use super::hit::{Hit, HitDetectionEngine, HitSelection, Miss, Shootable, ShotOutcome, DEFAULT_MAX_RANGE, SKIRMISH_MAX_RANGE};
use super::impact::ImpactEffectManager;
use super::movement::{KinematicController, MovementStats, PlayerKinematicState, SPAWN_POINT};
use super::target::{Bounce, MovingTargetSimulator};
use super::weapon::{FireEvent, FireState, WeaponFireController, WeaponKind};
use super::FrameInput;

/// Which scene the player is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Static dummies, solo
    Training,
    /// Moving targets, offline
    Skirmish,
    /// Remote players from the directory roster
    OnlineMatch,
}

/// Mode name that matches no scene
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game mode: {0}")]
pub struct UnknownMode(pub String);

impl std::str::FromStr for SceneKind {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "training" => Ok(Self::Training),
            "skirmish" | "offline" => Ok(Self::Skirmish),
            "online" | "online_match" => Ok(Self::OnlineMatch),
            _ => Err(UnknownMode(s.trim().to_string())),
        }
    }
}

/// Points awarded per hit
pub const HIT_POINTS: u32 = 10;

/// Hit and miss counters shown on the HUD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    pub hits: u32,
    pub misses: u32,
    pub points: u32,
}

impl ScoreBoard {
    pub fn shots(&self) -> u32 {
        self.hits + self.misses
    }

    /// Hit ratio in [0, 1]; zero before the first shot
    pub fn accuracy(&self) -> f32 {
        match self.shots() {
            0 => 0.0,
            shots => self.hits as f32 / shots as f32,
        }
    }
}

/// Things that happened during a frame
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Fired(FireEvent),
    Hit(Hit),
    Miss(Miss),
    WeaponSwitched(WeaponKind),
    TargetBounced(Bounce),
}

/// Scene construction options
#[derive(Debug, Clone, Copy)]
pub struct SceneOptions {
    pub weapon: WeaponKind,
    pub seed: u64,
    pub selection: HitSelection,
    pub movement: MovementStats,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            weapon: WeaponKind::Rifle,
            seed: 0,
            selection: HitSelection::Nearest,
            movement: MovementStats::default(),
        }
    }
}

/// All local simulation state of the active scene
pub struct Scene {
    kind: SceneKind,
    clock: SimClock,
    frame: u64,
    player: KinematicController,
    weapon: WeaponFireController,
    hit_engine: HitDetectionEngine,
    impacts: ImpactEffectManager,
    targets: MovingTargetSimulator,
    score: ScoreBoard,
}

impl Scene {
    pub fn new(kind: SceneKind, options: SceneOptions) -> Self {
        let (targets, max_range) = match kind {
            SceneKind::Training => (MovingTargetSimulator::training_dummies(), DEFAULT_MAX_RANGE),
            SceneKind::Skirmish => (MovingTargetSimulator::skirmish(), SKIRMISH_MAX_RANGE),
            SceneKind::OnlineMatch => (MovingTargetSimulator::default(), DEFAULT_MAX_RANGE),
        };

        Self {
            kind,
            clock: SimClock::new(),
            frame: 0,
            player: KinematicController::new(options.movement, SPAWN_POINT),
            weapon: WeaponFireController::new(options.weapon, options.seed),
            hit_engine: HitDetectionEngine::new(max_range, options.selection),
            impacts: ImpactEffectManager::new(),
            targets,
            score: ScoreBoard::default(),
        }
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn player(&self) -> &PlayerKinematicState {
        self.player.state()
    }

    pub fn weapon(&self) -> &WeaponFireController {
        &self.weapon
    }

    pub fn fire_state(&self) -> FireState {
        self.weapon.state()
    }

    pub fn impacts(&self) -> &ImpactEffectManager {
        &self.impacts
    }

    pub fn targets(&self) -> &MovingTargetSimulator {
        &self.targets
    }

    pub fn score(&self) -> ScoreBoard {
        self.score
    }

    /// Step an offline scene (no remote avatars)
    pub fn step(&mut self, input: &FrameInput, dt: f32) -> Vec<SceneEvent> {
        self.step_with_avatars::<super::target::MovingTarget>(input, dt, &[])
    }

    /// Step one frame. `avatars` joins the hit registry after the scene's
    /// own targets.
    pub fn step_with_avatars<A: Shootable>(
        &mut self,
        input: &FrameInput,
        dt: f32,
        avatars: &[A],
    ) -> Vec<SceneEvent> {
        let mut events = Vec::new();
        self.clock.advance_secs(dt);
        self.frame += 1;
        let now = self.clock.now_ms();

        if let Some(kind) = input.switch_weapon {
            if kind != self.weapon.active() {
                self.weapon.switch_weapon(kind);
                events.push(SceneEvent::WeaponSwitched(kind));
            }
        }

        self.player.update(&input.movement, dt);

        events.extend(self.targets.step(dt).into_iter().map(SceneEvent::TargetBounced));

        self.weapon.update(now);
        if input.fire {
            if let Some(fire) = self.weapon.try_fire(now, self.player.state()) {
                events.push(SceneEvent::Fired(fire));

                let registry: Vec<&dyn Shootable> = self
                    .targets
                    .targets()
                    .iter()
                    .map(|t| t as &dyn Shootable)
                    .chain(avatars.iter().map(|a| a as &dyn Shootable))
                    .collect();

                let ScoreBoard { hits, misses, points } = &mut self.score;
                let outcome = self.hit_engine.resolve_and_apply(
                    &fire,
                    registry.iter().copied(),
                    &mut self.impacts,
                    now,
                    |_| {
                        *hits += 1;
                        *points += HIT_POINTS;
                    },
                    |_| *misses += 1,
                );

                match outcome {
                    ShotOutcome::Hit(hit) => {
                        debug!(target_id = %hit.target, distance = hit.distance, "Shot hit");
                        events.push(SceneEvent::Hit(hit));
                    }
                    ShotOutcome::Miss(miss) => events.push(SceneEvent::Miss(miss)),
                }
            }
        }

        self.impacts.sweep(now);

        events
    }
}
