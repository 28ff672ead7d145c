//! HTTP/JSON session directory client

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::util::rate_limit::OutboundLimiter;

use super::directory::DirectoryService;
use super::error::DirectoryError;
use super::identity::IdentitySlot;
use super::protocol::{
    EmptyRequest, FaultBody, GameId, GameMap, GameRequest, GameSession, LobbyId, LobbyRequest, LobbySession,
    PlayerSnapshot, Position, SelectMapRequest,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory client speaking `POST {base}/rpc/{method}`.
/// Requests carry the current identity's bearer token.
#[derive(Clone)]
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    identity: IdentitySlot,
    limiter: OutboundLimiter,
}

impl HttpDirectory {
    pub fn new(base_url: &str, identity: IdentitySlot) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
            limiter: OutboundLimiter::default(),
        }
    }

    pub fn with_limiter(mut self, limiter: OutboundLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Get the URL for an RPC method
    fn rpc_url(&self, method: &str) -> String {
        format!("{}/rpc/{}", self.base_url, method)
    }

    /// Make an authenticated RPC call
    async fn call<T: Serialize, R: DeserializeOwned>(&self, method: &str, body: &T) -> Result<R, DirectoryError> {
        let identity = self
            .identity
            .get()
            .ok_or_else(|| DirectoryError::Fault("Unauthorized: anonymous caller".to_string()))?;

        if !self.limiter.check() {
            warn!(method, "Directory request throttled");
            return Err(DirectoryError::Throttled);
        }

        debug!(method, "Directory request");

        let response = self
            .client
            .post(self.rpc_url(method))
            .header("Authorization", format!("Bearer {}", identity.token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(DirectoryError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            // Prefer the structured fault text when present
            let body = serde_json::from_str::<FaultBody>(&text)
                .map(|fault| fault.error)
                .unwrap_or(text);
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(DirectoryError::Parse)
    }
}

impl DirectoryService for HttpDirectory {
    async fn join_lobby(&self) -> Result<LobbySession, DirectoryError> {
        self.call("join_lobby", &EmptyRequest::default()).await
    }

    async fn create_lobby(&self) -> Result<LobbySession, DirectoryError> {
        self.call("create_lobby", &EmptyRequest::default()).await
    }

    async fn leave_lobby(&self, lobby_id: LobbyId) -> Result<LobbySession, DirectoryError> {
        self.call("leave_lobby", &LobbyRequest { lobby_id }).await
    }

    async fn get_active_lobbies(&self) -> Result<Vec<LobbySession>, DirectoryError> {
        self.call("get_active_lobbies", &EmptyRequest::default()).await
    }

    async fn select_map(&self, lobby_id: LobbyId, map: GameMap) -> Result<LobbySession, DirectoryError> {
        self.call("select_map", &SelectMapRequest { lobby_id, map }).await
    }

    async fn start_game(&self, lobby_id: LobbyId) -> Result<GameSession, DirectoryError> {
        self.call("start_game", &LobbyRequest { lobby_id }).await
    }

    async fn get_players_in_game(&self) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        self.call("get_players_in_game", &EmptyRequest::default()).await
    }

    async fn update_player_position(&self, position: Position) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        self.call("update_player_position", &position).await
    }

    async fn end_game(&self, game_id: GameId) -> Result<GameSession, DirectoryError> {
        self.call("end_game", &GameRequest { game_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::error::ErrorKind;
    use crate::net::identity::{IdentityProvider, LocalIdentityProvider};
    use uuid::Uuid;

    #[test]
    fn rpc_urls_drop_trailing_slash() {
        let directory = HttpDirectory::new("http://localhost:9000/", IdentitySlot::new());
        assert_eq!(directory.rpc_url("join_lobby"), "http://localhost:9000/rpc/join_lobby");
    }

    #[tokio::test]
    async fn anonymous_calls_fail_before_sending() {
        let directory = HttpDirectory::new("http://127.0.0.1:9", IdentitySlot::new());
        let err = directory.join_lobby().await.expect_err("no identity");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.user_message(), "Please sign in to continue");
    }

    #[tokio::test]
    async fn exhausted_budget_fails_fast() {
        let provider = LocalIdentityProvider::signed_in(Uuid::new_v4());
        let limiter = OutboundLimiter::new(1);
        assert!(limiter.check());
        let directory = HttpDirectory::new("http://127.0.0.1:9", provider.slot()).with_limiter(limiter);
        let err = directory.get_active_lobbies().await.expect_err("throttled");
        assert!(matches!(err, DirectoryError::Throttled));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
