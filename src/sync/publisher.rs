//! Throttled publishing of the local player's position

use std::sync::Arc;

use glam::Vec3;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::game::movement::PlayerKinematicState;
use crate::net::protocol::Position;
use crate::net::{DirectoryError, DirectoryService};
use crate::util::time::PUBLISH_THROTTLE_MS;

use super::reconciler::wrap_angle;
use super::roster::RosterCache;

/// Minimum position change worth publishing (units)
pub const POSITION_THRESHOLD: f32 = 0.01;
/// Minimum yaw change worth publishing (radians)
pub const YAW_THRESHOLD: f32 = 0.01;

/// Position and yaw as sent to the directory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw: f32,
}

impl Pose {
    pub fn of(state: &PlayerKinematicState) -> Self {
        Self {
            position: state.position,
            yaw: state.yaw,
        }
    }

    fn differs_from(&self, other: &Pose) -> bool {
        self.position.distance(other.position) > POSITION_THRESHOLD
            || wrap_angle(self.yaw - other.yaw).abs() > YAW_THRESHOLD
    }
}

/// An issued publish
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ticket {
    pub id: u64,
    pub pose: Pose,
}

/// Throttle and change detection with pending/confirmed/failed bookkeeping.
///
/// Issuing a ticket advances `sent` optimistically. A failure of the most
/// recent ticket rolls `sent` back to the last confirmed pose, so the next
/// window publishes again even if the player stands still.
#[derive(Debug, Clone)]
pub struct PublishGate {
    throttle_ms: u64,
    last_attempt_ms: Option<u64>,
    sent: Option<Pose>,
    confirmed: Option<Ticket>,
    latest_issued: u64,
    pending: Vec<u64>,
    force: bool,
}

impl Default for PublishGate {
    fn default() -> Self {
        Self::new(PUBLISH_THROTTLE_MS)
    }
}

impl PublishGate {
    pub fn new(throttle_ms: u64) -> Self {
        Self {
            throttle_ms,
            last_attempt_ms: None,
            sent: None,
            confirmed: None,
            latest_issued: 0,
            pending: Vec::new(),
            force: false,
        }
    }

    /// Publish on the next open window regardless of movement
    pub fn force_next(&mut self) {
        self.force = true;
    }

    /// Decide whether `pose` goes out now; issues a ticket if so
    pub fn poll(&mut self, now_ms: u64, pose: Pose) -> Option<Ticket> {
        if let Some(last) = self.last_attempt_ms {
            if now_ms.saturating_sub(last) < self.throttle_ms {
                return None;
            }
        }

        let changed = match &self.sent {
            Some(sent) => pose.differs_from(sent),
            None => true,
        };
        if !changed && !self.force {
            return None;
        }

        self.latest_issued += 1;
        let ticket = Ticket {
            id: self.latest_issued,
            pose,
        };
        self.last_attempt_ms = Some(now_ms);
        self.sent = Some(pose);
        self.pending.push(ticket.id);
        self.force = false;
        Some(ticket)
    }

    pub fn confirm(&mut self, ticket: Ticket) {
        self.pending.retain(|id| *id != ticket.id);
        if self.confirmed.map_or(true, |c| c.id < ticket.id) {
            self.confirmed = Some(ticket);
        }
    }

    pub fn fail(&mut self, ticket: Ticket) {
        self.pending.retain(|id| *id != ticket.id);
        if ticket.id == self.latest_issued {
            self.sent = self.confirmed.map(|c| c.pose);
        }
    }

    pub fn sent(&self) -> Option<Pose> {
        self.sent
    }

    pub fn confirmed(&self) -> Option<Pose> {
        self.confirmed.map(|c| c.pose)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Outcome of an issued publish, reported back to the frame loop
#[derive(Debug)]
pub enum PublishEvent {
    Confirmed { ticket: Ticket, roster_size: usize },
    Failed { ticket: Ticket, error: DirectoryError },
}

struct PublishResult {
    ticket: Ticket,
    outcome: Result<usize, DirectoryError>,
}

/// Sends the local pose to the directory and feeds the returned roster
/// into the shared cache
pub struct PositionPublisher<D> {
    directory: Arc<D>,
    roster: RosterCache,
    gate: PublishGate,
    results_tx: mpsc::UnboundedSender<PublishResult>,
    results_rx: mpsc::UnboundedReceiver<PublishResult>,
    shutdown: watch::Receiver<bool>,
}

impl<D: DirectoryService> PositionPublisher<D> {
    pub fn new(directory: Arc<D>, roster: RosterCache, shutdown: watch::Receiver<bool>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            directory,
            roster,
            gate: PublishGate::default(),
            results_tx,
            results_rx,
            shutdown,
        }
    }

    pub fn force_next(&mut self) {
        self.gate.force_next();
    }

    pub fn gate(&self) -> &PublishGate {
        &self.gate
    }

    /// Called once per frame; spawns a publish when the gate opens
    pub fn tick(&mut self, now_ms: u64, state: &PlayerKinematicState) -> Option<Ticket> {
        if *self.shutdown.borrow() {
            return None;
        }

        let ticket = self.gate.poll(now_ms, Pose::of(state))?;
        let seq = self.roster.issue_seq();
        let position = Position::new(ticket.pose.position, ticket.pose.yaw);
        let directory = self.directory.clone();
        let roster = self.roster.clone();
        let results_tx = self.results_tx.clone();

        trace!(ticket = ticket.id, seq, "Publishing position");
        tokio::spawn(async move {
            let outcome = directory.update_player_position(position).await.map(|players| {
                let count = players.len();
                roster.apply(seq, players);
                count
            });
            // Receiver gone means the scene was left
            let _ = results_tx.send(PublishResult { ticket, outcome });
        });

        Some(ticket)
    }

    /// Settle finished publishes
    pub fn drain(&mut self) -> Vec<PublishEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.results_rx.try_recv() {
            match result.outcome {
                Ok(roster_size) => {
                    self.gate.confirm(result.ticket);
                    events.push(PublishEvent::Confirmed {
                        ticket: result.ticket,
                        roster_size,
                    });
                }
                Err(error) => {
                    warn!(ticket = result.ticket.id, error = %error, "Position publish failed, rolling back");
                    self.gate.fail(result.ticket);
                    events.push(PublishEvent::Failed {
                        ticket: result.ticket,
                        error,
                    });
                }
            }
        }
        if !events.is_empty() {
            debug!(settled = events.len(), pending = self.gate.pending(), "Publishes settled");
        }
        events
    }
}
