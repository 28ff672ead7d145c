//! Player identity handling

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::error::IdentityError;
use super::protocol::PlayerId;

/// Authenticated player identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub player_id: PlayerId,
    /// Bearer token presented to the directory
    pub token: String,
}

/// Shared slot holding the current identity.
/// Directory clients read it on every call.
#[derive(Debug, Clone, Default)]
pub struct IdentitySlot {
    inner: Arc<RwLock<Option<Identity>>>,
}

impl IdentitySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Identity> {
        self.inner.read().clone()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.inner.read().as_ref().map(|i| i.player_id)
    }

    pub fn set(&self, identity: Option<Identity>) {
        *self.inner.write() = identity;
    }
}

pub trait IdentityProvider: Send + Sync + 'static {
    /// Sign in, returning the (possibly already) current identity
    fn login(&self) -> impl Future<Output = Result<Identity, IdentityError>> + Send;

    /// Sign out
    fn clear(&self);

    fn current(&self) -> Option<Identity>;

    /// Slot shared with directory clients
    fn slot(&self) -> IdentitySlot;
}

/// Device-local identity: a fresh random player id per login session
#[derive(Debug, Clone, Default)]
pub struct LocalIdentityProvider {
    slot: IdentitySlot,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider already signed in as `player_id`
    pub fn signed_in(player_id: PlayerId) -> Self {
        let provider = Self::new();
        provider.slot.set(Some(Identity {
            player_id,
            token: player_id.simple().to_string(),
        }));
        provider
    }
}

impl IdentityProvider for LocalIdentityProvider {
    async fn login(&self) -> Result<Identity, IdentityError> {
        if let Some(identity) = self.slot.get() {
            return Ok(identity);
        }

        let player_id = Uuid::new_v4();
        let identity = Identity {
            player_id,
            token: player_id.simple().to_string(),
        };
        self.slot.set(Some(identity.clone()));
        info!(player_id = %player_id, "Signed in with local identity");
        Ok(identity)
    }

    fn clear(&self) {
        if let Some(identity) = self.slot.get() {
            info!(player_id = %identity.player_id, "Signed out");
        }
        self.slot.set(None);
    }

    fn current(&self) -> Option<Identity> {
        self.slot.get()
    }

    fn slot(&self) -> IdentitySlot {
        self.slot.clone()
    }
}
