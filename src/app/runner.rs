//! Fixed-step frame loop driving a scene
//!
//! One loop iteration is one frame: sample input, reconcile remote state,
//! step the scene, publish the local pose and settle network results.
//! Network work runs on spawned tasks; the loop keeps simulating on cached
//! state while requests are outstanding.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::game::{FrameInput, Scene, SceneEvent, SceneKind, SceneOptions, ScoreBoard};
use crate::lobby::{LobbyController, MapInfo, SessionError};
use crate::net::{IdentityError, IdentityProvider};
use crate::sync::poller::{spawn_lobby_list_poller, spawn_roster_poller};
use crate::sync::{LobbyListCache, PositionPublisher, PublishEvent, RemoteStateReconciler, RosterCache};
use crate::util::time::frame_delta;

use super::input::InputSource;
use super::peers::LocalPeer;
use super::state::ClientState;

/// Session failures that end an online run before it starts
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What a finished session produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub mode: SceneKind,
    pub frames: u64,
    pub sim_ms: u64,
    pub score: ScoreBoard,
}

/// Paces frames and watches the scene-exit flag
pub struct FrameRunner {
    dt: f32,
    ticker: Interval,
    shutdown: watch::Receiver<bool>,
}

impl FrameRunner {
    pub fn new(frame_rate: u32, shutdown: watch::Receiver<bool>) -> Self {
        let dt = frame_delta(frame_rate);
        let mut ticker = interval(Duration::from_secs_f32(dt));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { dt, ticker, shutdown }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Wait for the next frame; false once the scene is being left
    pub async fn next_frame(&mut self) -> bool {
        if *self.shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = self.ticker.tick() => {}
            changed = self.shutdown.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
        !*self.shutdown.borrow()
    }
}

fn log_events(events: &[SceneEvent]) {
    for event in events {
        match event {
            SceneEvent::WeaponSwitched(kind) => info!(weapon = ?kind, "Weapon switched"),
            SceneEvent::TargetBounced(bounce) => {
                debug!(target_id = bounce.target_id, axis = ?bounce.axis, "Target bounced")
            }
            SceneEvent::Miss(miss) => debug!(point = ?miss.point, "Shot missed"),
            SceneEvent::Fired(_) | SceneEvent::Hit(_) => {}
        }
    }
}

/// What the HUD would draw this frame
fn trace_hud(scene: &Scene) {
    let now = scene.now_ms();
    trace!(
        frame = scene.frame(),
        weapon = scene.weapon().stats().name,
        fire = ?scene.fire_state(),
        impacts = scene.impacts().active(now).count(),
        points = scene.score().points,
        "HUD"
    );
}

fn scene_options(state: &ClientState) -> SceneOptions {
    SceneOptions {
        weapon: state.config.weapon,
        seed: state.config.rng_seed,
        ..Default::default()
    }
}

/// Training or skirmish: purely local
pub async fn run_offline(
    state: &ClientState,
    kind: SceneKind,
    input: &mut dyn InputSource,
    shutdown: watch::Receiver<bool>,
) -> SessionSummary {
    let mut scene = Scene::new(kind, scene_options(state));
    let mut runner = FrameRunner::new(state.config.frame_rate, shutdown);
    info!(mode = ?kind, "Scene entered");

    while runner.next_frame().await {
        let frame: FrameInput = input.sample(runner.dt());
        let events = scene.step(&frame, runner.dt());
        log_events(&events);
        trace_hud(&scene);
    }

    summarize(kind, &scene)
}

/// Online match: host a lobby, play until shutdown, then end the game
pub async fn run_online(
    state: &ClientState,
    input: &mut dyn InputSource,
    shutdown: watch::Receiver<bool>,
) -> Result<SessionSummary, RunError> {
    let identity = match state.identity.login().await {
        Ok(identity) => identity,
        Err(e) => {
            state.notifier.error(e.user_message());
            return Err(e.into());
        }
    };
    let directory = state.directory.clone();
    let mut lobby = LobbyController::new(directory.clone(), identity.player_id, state.notifier.clone());

    // Lobby phase
    let (lobby_exit_tx, lobby_exit_rx) = watch::channel(false);
    let lobby_list = LobbyListCache::new();
    let lobby_poller = spawn_lobby_list_poller(directory.clone(), lobby_list.clone(), lobby_exit_rx);

    let created = lobby.create().await?;
    let mut peers = Vec::new();
    if let Some(local) = &state.local_directory {
        for _ in 0..state.config.local_peers {
            match LocalPeer::join(local).await {
                Ok(peer) => peers.push(peer),
                Err(e) => warn!(error = %e, "Local peer failed to join"),
            }
        }
    }
    lobby.observe(&lobby_list.snapshot().value);
    let selected = lobby.select_map(state.config.map).await?;
    info!(
        lobby_id = created.id,
        members = selected.members.len(),
        map = MapInfo::of(selected.selected_map).name,
        "Lobby ready"
    );
    let game = lobby.start().await?;
    let _ = lobby_exit_tx.send(true);
    let _ = lobby_poller.await;

    // Match phase
    let (game_exit_tx, game_exit_rx) = watch::channel(false);
    let roster = RosterCache::new();
    let roster_poller = spawn_roster_poller(directory.clone(), roster.clone(), game_exit_rx.clone());
    let peer_tasks: Vec<_> = peers
        .into_iter()
        .enumerate()
        .map(|(i, peer)| peer.spawn(state.config.rng_seed.wrapping_add(i as u64 + 1), game_exit_rx.clone()))
        .collect();

    let mut reconciler = RemoteStateReconciler::new(identity.player_id);
    let mut publisher = PositionPublisher::new(directory.clone(), roster.clone(), game_exit_rx);
    publisher.force_next();

    let mut scene = Scene::new(SceneKind::OnlineMatch, scene_options(state));
    let mut runner = FrameRunner::new(state.config.frame_rate, shutdown);
    let mut publish_failing = false;
    info!(game_id = game.id, "Match entered");

    while runner.next_frame().await {
        let frame = input.sample(runner.dt());

        reconciler.sync(&roster.snapshot());
        reconciler.update();

        let events = scene.step_with_avatars(&frame, runner.dt(), reconciler.avatars());
        log_events(&events);
        trace_hud(&scene);

        publisher.tick(scene.now_ms(), scene.player());
        for event in publisher.drain() {
            match event {
                PublishEvent::Confirmed { .. } => publish_failing = false,
                PublishEvent::Failed { error, .. } => {
                    // One toast per outage
                    if !publish_failing {
                        state.notifier.error(error.user_message());
                    }
                    publish_failing = true;
                }
            }
        }
    }

    // Leaving the scene: stop new network work, let in-flight requests finish
    let _ = game_exit_tx.send(true);
    let _ = roster_poller.await;
    for task in peer_tasks {
        let _ = task.await;
    }

    if let Err(e) = lobby.end().await {
        warn!(error = %e, "Failed to end game");
    }
    roster.clear();

    Ok(summarize(SceneKind::OnlineMatch, &scene))
}

fn summarize(mode: SceneKind, scene: &Scene) -> SessionSummary {
    let score = scene.score();
    info!(
        mode = ?mode,
        frames = scene.frame(),
        hits = score.hits,
        misses = score.misses,
        points = score.points,
        accuracy = score.accuracy(),
        "Scene exited"
    );
    SessionSummary {
        mode,
        frames: scene.frame(),
        sim_ms: scene.now_ms(),
        score,
    }
}

/// Run the configured mode until `shutdown` flips
pub async fn run_session(
    state: &ClientState,
    input: &mut dyn InputSource,
    shutdown: watch::Receiver<bool>,
) -> Result<SessionSummary, RunError> {
    match state.config.mode {
        SceneKind::OnlineMatch => run_online(state, input, shutdown).await,
        kind => Ok(run_offline(state, kind, input, shutdown).await),
    }
}
