//! Periodic directory polling

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::net::DirectoryService;
use crate::util::time::{LOBBY_POLL_MS, ROSTER_POLL_MS};

use super::roster::{LobbyListCache, RosterCache};

/// At most one request per resource in flight
#[derive(Debug, Clone, Default)]
pub struct PollGate {
    in_flight: Arc<AtomicBool>,
}

/// Held for the lifetime of a request; releases the gate on drop
#[derive(Debug)]
pub struct PollGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl PollGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or None if a request is already outstanding
    pub fn try_begin(&self) -> Option<PollGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| PollGuard {
                in_flight: self.in_flight.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Run `poll` every `period` until `shutdown` flips to true.
///
/// Ticks that find the previous request still outstanding are skipped.
/// Requests are spawned detached, so shutdown stops new requests without
/// aborting one already in flight.
pub fn spawn_poll_loop<F, Fut>(
    resource: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut poll: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let gate = PollGate::new();

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            match gate.try_begin() {
                Some(guard) => {
                    let request = poll();
                    tokio::spawn(async move {
                        request.await;
                        drop(guard);
                    });
                }
                None => trace!(resource, "Previous poll still in flight, skipping"),
            }
        }

        debug!(resource, "Poller stopped");
    })
}

/// Poll the in-game roster into `cache`
pub fn spawn_roster_poller<D: DirectoryService>(
    directory: Arc<D>,
    cache: RosterCache,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_poll_loop("roster", Duration::from_millis(ROSTER_POLL_MS), shutdown, move || {
        let directory = directory.clone();
        let cache = cache.clone();
        let seq = cache.issue_seq();
        async move {
            match directory.get_players_in_game().await {
                Ok(players) => {
                    cache.apply(seq, players);
                }
                Err(e) => warn!(error = %e, kind = ?e.kind(), "Roster poll failed"),
            }
        }
    })
}

/// Poll the joinable lobby list into `cache`
pub fn spawn_lobby_list_poller<D: DirectoryService>(
    directory: Arc<D>,
    cache: LobbyListCache,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    spawn_poll_loop("lobby_list", Duration::from_millis(LOBBY_POLL_MS), shutdown, move || {
        let directory = directory.clone();
        let cache = cache.clone();
        let seq = cache.issue_seq();
        async move {
            match directory.get_active_lobbies().await {
                Ok(lobbies) => {
                    cache.apply(seq, lobbies);
                }
                Err(e) => warn!(error = %e, kind = ?e.kind(), "Lobby list poll failed"),
            }
        }
    })
}
