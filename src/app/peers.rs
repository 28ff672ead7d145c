//! Simulated peers for local online sessions

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::game::movement::{KinematicController, MovementStats, SPAWN_POINT};
use crate::net::error::ErrorKind;
use crate::net::protocol::{PlayerId, Position};
use crate::net::{DirectoryError, DirectoryService, IdentityProvider, LocalDirectory, LocalDirectoryClient, LocalIdentityProvider};
use crate::util::time::PUBLISH_THROTTLE_MS;

use super::input::{InputSource, ScriptedInput};

/// A bot player sharing the in-process directory
pub struct LocalPeer {
    pub player_id: PlayerId,
    client: Arc<LocalDirectoryClient>,
}

impl LocalPeer {
    /// Sign in a fresh identity and join whatever lobby is open
    pub async fn join(directory: &LocalDirectory) -> Result<Self, DirectoryError> {
        let player_id = Uuid::new_v4();
        let identity = LocalIdentityProvider::signed_in(player_id);
        let client = Arc::new(directory.connect(identity.slot()));
        let lobby = client.join_lobby().await?;
        debug!(player_id = %player_id, lobby_id = lobby.id, "Local peer joined");
        Ok(Self { player_id, client })
    }

    /// Walk around and report positions until shutdown
    pub fn spawn(self, seed: u64, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let step = Duration::from_millis(PUBLISH_THROTTLE_MS);
            let dt = step.as_secs_f32();
            let mut input = ScriptedInput::new(seed, Default::default());
            let mut body = KinematicController::new(MovementStats::default(), SPAWN_POINT);
            let mut ticker = interval(step);
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

                body.update(&input.sample(dt).movement, dt);
                let state = body.state();
                let position = Position::new(state.position, state.yaw);
                match self.client.update_player_position(position).await {
                    Ok(_) => {}
                    // Game not started yet, or already over
                    Err(e) if e.kind() == ErrorKind::NotFound => trace!(player_id = %self.player_id, "Peer idle"),
                    Err(e) => debug!(player_id = %self.player_id, error = %e, "Peer update failed"),
                }
            }

            debug!(player_id = %self.player_id, "Local peer stopped");
        })
    }
}
