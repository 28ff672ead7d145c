//! Session directory interface

use std::future::Future;

use super::error::DirectoryError;
use super::protocol::{GameId, GameMap, GameSession, LobbyId, LobbySession, PlayerSnapshot, Position};

/// Remote authority for lobbies, games and the player roster.
/// Every call acts on behalf of the current identity.
pub trait DirectoryService: Send + Sync + 'static {
    /// Join an open lobby, or get a new one if none has room
    fn join_lobby(&self) -> impl Future<Output = Result<LobbySession, DirectoryError>> + Send;

    /// Always a new lobby owned by the caller
    fn create_lobby(&self) -> impl Future<Output = Result<LobbySession, DirectoryError>> + Send;

    fn leave_lobby(
        &self,
        lobby_id: LobbyId,
    ) -> impl Future<Output = Result<LobbySession, DirectoryError>> + Send;

    fn get_active_lobbies(&self) -> impl Future<Output = Result<Vec<LobbySession>, DirectoryError>> + Send;

    /// Owner only
    fn select_map(
        &self,
        lobby_id: LobbyId,
        map: GameMap,
    ) -> impl Future<Output = Result<LobbySession, DirectoryError>> + Send;

    /// Owner only
    fn start_game(
        &self,
        lobby_id: LobbyId,
    ) -> impl Future<Output = Result<GameSession, DirectoryError>> + Send;

    /// Roster of the caller's current game
    fn get_players_in_game(&self) -> impl Future<Output = Result<Vec<PlayerSnapshot>, DirectoryError>> + Send;

    /// Report the caller's position; returns the updated roster
    fn update_player_position(
        &self,
        position: Position,
    ) -> impl Future<Output = Result<Vec<PlayerSnapshot>, DirectoryError>> + Send;

    fn end_game(&self, game_id: GameId) -> impl Future<Output = Result<GameSession, DirectoryError>> + Send;
}

/// Directory selected at startup: remote over HTTP or in-process
#[derive(Clone)]
pub enum Directory {
    Http(super::http::HttpDirectory),
    Local(super::memory::LocalDirectoryClient),
}

macro_rules! delegate {
    ($self:ident, $call:ident ( $($arg:expr),* )) => {
        match $self {
            Directory::Http(d) => d.$call($($arg),*).await,
            Directory::Local(d) => d.$call($($arg),*).await,
        }
    };
}

impl DirectoryService for Directory {
    async fn join_lobby(&self) -> Result<LobbySession, DirectoryError> {
        delegate!(self, join_lobby())
    }

    async fn create_lobby(&self) -> Result<LobbySession, DirectoryError> {
        delegate!(self, create_lobby())
    }

    async fn leave_lobby(&self, lobby_id: LobbyId) -> Result<LobbySession, DirectoryError> {
        delegate!(self, leave_lobby(lobby_id))
    }

    async fn get_active_lobbies(&self) -> Result<Vec<LobbySession>, DirectoryError> {
        delegate!(self, get_active_lobbies())
    }

    async fn select_map(&self, lobby_id: LobbyId, map: GameMap) -> Result<LobbySession, DirectoryError> {
        delegate!(self, select_map(lobby_id, map))
    }

    async fn start_game(&self, lobby_id: LobbyId) -> Result<GameSession, DirectoryError> {
        delegate!(self, start_game(lobby_id))
    }

    async fn get_players_in_game(&self) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        delegate!(self, get_players_in_game())
    }

    async fn update_player_position(&self, position: Position) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        delegate!(self, update_player_position(position))
    }

    async fn end_game(&self, game_id: GameId) -> Result<GameSession, DirectoryError> {
        delegate!(self, end_game(game_id))
    }
}
