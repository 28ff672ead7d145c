//! In-process session directory
//!
//! Holds lobbies, games and the position roster in memory and enforces the
//! same ownership and membership rules a remote directory does. Used for
//! local play and as the directory behind async tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};

use super::directory::DirectoryService;
use super::error::DirectoryError;
use super::identity::IdentitySlot;
use super::protocol::{
    GameId, GameMap, GameSession, LobbyId, LobbySession, LobbyStatus, PlayerId, PlayerSnapshot, Position,
};

/// Lobby capacity
pub const MAX_LOBBY_MEMBERS: usize = 8;

const SPAWN_POSITION: Position = Position {
    x: 0.0,
    y: 1.6,
    z: 5.0,
    rotation: 0.0,
};

fn fault(text: &str) -> DirectoryError {
    DirectoryError::Fault(text.to_string())
}

struct DirectoryTables {
    lobbies: DashMap<LobbyId, LobbySession>,
    games: DashMap<GameId, GameSession>,
    /// Map of player -> current game
    player_games: DashMap<PlayerId, GameId>,
    positions: DashMap<PlayerId, PlayerSnapshot>,
    next_lobby: AtomicU64,
    next_game: AtomicU64,
    available: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicU64,
}

/// Shared directory state. Clone freely; every clone is the same directory.
#[derive(Clone)]
pub struct LocalDirectory {
    tables: Arc<DirectoryTables>,
}

impl Default for LocalDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalDirectory {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(DirectoryTables {
                lobbies: DashMap::new(),
                games: DashMap::new(),
                player_games: DashMap::new(),
                positions: DashMap::new(),
                next_lobby: AtomicU64::new(1),
                next_game: AtomicU64::new(1),
                available: AtomicBool::new(true),
                latency_ms: AtomicU64::new(0),
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Client acting as whoever currently holds `identity`
    pub fn connect(&self, identity: IdentitySlot) -> LocalDirectoryClient {
        LocalDirectoryClient {
            directory: self.clone(),
            identity,
        }
    }

    /// Simulate an outage; calls fail with ConnectionNotReady while down
    pub fn set_available(&self, available: bool) {
        self.tables.available.store(available, Ordering::SeqCst);
    }

    /// Artificial delay applied to every call
    pub fn set_latency(&self, latency: Duration) {
        self.tables
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Calls received so far
    pub fn call_count(&self) -> u64 {
        self.tables.calls.load(Ordering::SeqCst)
    }

    pub fn lobby(&self, lobby_id: LobbyId) -> Option<LobbySession> {
        self.tables.lobbies.get(&lobby_id).map(|l| l.clone())
    }

    pub fn game(&self, game_id: GameId) -> Option<GameSession> {
        self.tables.games.get(&game_id).map(|g| g.clone())
    }

    fn join_lobby(&self, caller: PlayerId) -> Result<LobbySession, DirectoryError> {
        if let Some(lobby) = self.waiting_lobby_of(caller) {
            return Ok(lobby);
        }

        let open = self
            .tables
            .lobbies
            .iter()
            .filter(|l| l.status == LobbyStatus::Waiting && l.members.len() < MAX_LOBBY_MEMBERS)
            .map(|l| *l.key())
            .min();

        if let Some(lobby_id) = open {
            if let Some(mut lobby) = self.tables.lobbies.get_mut(&lobby_id) {
                if lobby.status == LobbyStatus::Waiting && lobby.members.len() < MAX_LOBBY_MEMBERS {
                    lobby.members.push(caller);
                    info!(lobby_id, player_id = %caller, "Player joined lobby");
                    return Ok(lobby.clone());
                }
            }
        }

        Ok(self.open_lobby(caller))
    }

    fn create_lobby(&self, caller: PlayerId) -> LobbySession {
        self.detach(caller);
        self.open_lobby(caller)
    }

    fn open_lobby(&self, owner: PlayerId) -> LobbySession {
        let lobby = LobbySession {
            id: self.tables.next_lobby.fetch_add(1, Ordering::SeqCst),
            owner,
            members: vec![owner],
            selected_map: GameMap::default(),
            status: LobbyStatus::Waiting,
        };
        self.tables.lobbies.insert(lobby.id, lobby.clone());
        info!(lobby_id = lobby.id, owner = %owner, "Lobby created");
        lobby
    }

    fn waiting_lobby_of(&self, player: PlayerId) -> Option<LobbySession> {
        self.tables
            .lobbies
            .iter()
            .find(|l| l.status == LobbyStatus::Waiting && l.is_member(&player))
            .map(|l| l.clone())
    }

    /// Remove `player` from every waiting lobby they are in
    fn detach(&self, player: PlayerId) {
        let ids: Vec<LobbyId> = self
            .tables
            .lobbies
            .iter()
            .filter(|l| l.status == LobbyStatus::Waiting && l.is_member(&player))
            .map(|l| *l.key())
            .collect();
        for lobby_id in ids {
            self.remove_member(lobby_id, player);
        }
    }

    /// Drop a member, handing ownership to the next member; empty lobbies close
    fn remove_member(&self, lobby_id: LobbyId, player: PlayerId) -> Option<LobbySession> {
        let snapshot = {
            let mut lobby = self.tables.lobbies.get_mut(&lobby_id)?;
            lobby.members.retain(|m| m != &player);
            if lobby.owner == player {
                if let Some(next) = lobby.members.first().copied() {
                    lobby.owner = next;
                }
            }
            lobby.clone()
        };

        if snapshot.members.is_empty() {
            self.tables.lobbies.remove(&lobby_id);
            debug!(lobby_id, "Lobby closed");
        }
        Some(snapshot)
    }

    fn leave_lobby(&self, caller: PlayerId, lobby_id: LobbyId) -> Result<LobbySession, DirectoryError> {
        let lobby = self.lobby(lobby_id).ok_or_else(|| fault("Lobby not found"))?;
        if !lobby.is_member(&caller) {
            return Err(fault("Unauthorized: not a member of this lobby"));
        }
        let lobby = self
            .remove_member(lobby_id, caller)
            .ok_or_else(|| fault("Lobby not found"))?;
        info!(lobby_id, player_id = %caller, "Player left lobby");
        Ok(lobby)
    }

    fn active_lobbies(&self) -> Vec<LobbySession> {
        let mut lobbies: Vec<LobbySession> = self
            .tables
            .lobbies
            .iter()
            .filter(|l| l.status == LobbyStatus::Waiting)
            .map(|l| l.clone())
            .collect();
        lobbies.sort_by_key(|l| l.id);
        lobbies
    }

    fn select_map(&self, caller: PlayerId, lobby_id: LobbyId, map: GameMap) -> Result<LobbySession, DirectoryError> {
        let mut lobby = self
            .tables
            .lobbies
            .get_mut(&lobby_id)
            .ok_or_else(|| fault("Lobby not found"))?;
        if !lobby.is_owner(&caller) {
            return Err(fault("Unauthorized: only the lobby owner can select the map"));
        }
        if lobby.status != LobbyStatus::Waiting {
            return Err(fault("Lobby already started"));
        }
        lobby.selected_map = map;
        info!(lobby_id, ?map, "Map selected");
        Ok(lobby.clone())
    }

    fn start_game(&self, caller: PlayerId, lobby_id: LobbyId) -> Result<GameSession, DirectoryError> {
        let (members, map) = {
            let mut lobby = self
                .tables
                .lobbies
                .get_mut(&lobby_id)
                .ok_or_else(|| fault("Lobby not found"))?;
            if !lobby.is_owner(&caller) {
                return Err(fault("Unauthorized: only the lobby owner can start the game"));
            }
            if lobby.status != LobbyStatus::Waiting {
                return Err(fault("Lobby already started"));
            }
            lobby.status = LobbyStatus::Started;
            (lobby.members.clone(), lobby.selected_map)
        };

        let now = Utc::now();
        let game = GameSession {
            id: self.tables.next_game.fetch_add(1, Ordering::SeqCst),
            lobby_id,
            started: true,
            last_update: now,
            members: members.clone(),
            map,
        };
        self.tables.games.insert(game.id, game.clone());

        for member in members {
            self.tables.player_games.insert(member, game.id);
            self.tables.positions.insert(
                member,
                PlayerSnapshot {
                    player_id: member,
                    position: SPAWN_POSITION,
                    health: 100,
                    is_alive: true,
                    last_updated: now,
                },
            );
        }

        info!(game_id = game.id, lobby_id, player_count = game.members.len(), "Game started");
        Ok(game)
    }

    fn roster(&self, game_id: GameId) -> Vec<PlayerSnapshot> {
        let members = match self.tables.games.get(&game_id) {
            Some(game) => game.members.clone(),
            None => return Vec::new(),
        };
        members
            .iter()
            .filter_map(|m| self.tables.positions.get(m).map(|p| p.clone()))
            .collect()
    }

    fn players_in_game(&self, caller: PlayerId) -> Vec<PlayerSnapshot> {
        let game_id = self.tables.player_games.get(&caller).map(|g| *g);
        game_id.map(|id| self.roster(id)).unwrap_or_default()
    }

    fn update_player_position(&self, caller: PlayerId, position: Position) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        let game_id = self
            .tables
            .player_games
            .get(&caller)
            .map(|g| *g)
            .ok_or_else(|| fault("Player not found in any game"))?;

        let now = Utc::now();
        self.tables.positions.insert(
            caller,
            PlayerSnapshot {
                player_id: caller,
                position,
                health: 100,
                is_alive: true,
                last_updated: now,
            },
        );
        if let Some(mut game) = self.tables.games.get_mut(&game_id) {
            game.last_update = now;
        }

        Ok(self.roster(game_id))
    }

    fn end_game(&self, caller: PlayerId, game_id: GameId) -> Result<GameSession, DirectoryError> {
        let game = {
            let mut game = self
                .tables
                .games
                .get_mut(&game_id)
                .ok_or_else(|| fault("Game not found"))?;
            if !game.members.contains(&caller) {
                return Err(fault("Unauthorized: not a player in this game"));
            }
            game.started = false;
            game.last_update = Utc::now();
            game.clone()
        };

        for member in &game.members {
            self.tables.player_games.remove_if(member, |_, g| *g == game_id);
            self.tables.positions.remove(member);
        }
        self.tables.lobbies.remove(&game.lobby_id);

        info!(game_id, "Game ended");
        Ok(game)
    }
}

/// Directory handle bound to an identity slot
#[derive(Clone)]
pub struct LocalDirectoryClient {
    directory: LocalDirectory,
    identity: IdentitySlot,
}

impl LocalDirectoryClient {
    /// Common prologue: count, delay, availability and caller lookup
    async fn enter(&self) -> Result<PlayerId, DirectoryError> {
        let tables = &self.directory.tables;
        tables.calls.fetch_add(1, Ordering::SeqCst);

        let latency = tables.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if !tables.available.load(Ordering::SeqCst) {
            return Err(DirectoryError::NotReady);
        }

        self.identity
            .player_id()
            .ok_or_else(|| fault("Unauthorized: only authenticated users can use the directory"))
    }
}

impl DirectoryService for LocalDirectoryClient {
    async fn join_lobby(&self) -> Result<LobbySession, DirectoryError> {
        let caller = self.enter().await?;
        self.directory.join_lobby(caller)
    }

    async fn create_lobby(&self) -> Result<LobbySession, DirectoryError> {
        let caller = self.enter().await?;
        Ok(self.directory.create_lobby(caller))
    }

    async fn leave_lobby(&self, lobby_id: LobbyId) -> Result<LobbySession, DirectoryError> {
        let caller = self.enter().await?;
        self.directory.leave_lobby(caller, lobby_id)
    }

    async fn get_active_lobbies(&self) -> Result<Vec<LobbySession>, DirectoryError> {
        self.enter().await?;
        Ok(self.directory.active_lobbies())
    }

    async fn select_map(&self, lobby_id: LobbyId, map: GameMap) -> Result<LobbySession, DirectoryError> {
        let caller = self.enter().await?;
        self.directory.select_map(caller, lobby_id, map)
    }

    async fn start_game(&self, lobby_id: LobbyId) -> Result<GameSession, DirectoryError> {
        let caller = self.enter().await?;
        self.directory.start_game(caller, lobby_id)
    }

    async fn get_players_in_game(&self) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        let caller = self.enter().await?;
        Ok(self.directory.players_in_game(caller))
    }

    async fn update_player_position(&self, position: Position) -> Result<Vec<PlayerSnapshot>, DirectoryError> {
        let caller = self.enter().await?;
        self.directory.update_player_position(caller, position)
    }

    async fn end_game(&self, game_id: GameId) -> Result<GameSession, DirectoryError> {
        let caller = self.enter().await?;
        self.directory.end_game(caller, game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::error::ErrorKind;
    use crate::net::identity::{IdentityProvider, LocalIdentityProvider};
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    fn player(directory: &LocalDirectory) -> (PlayerId, LocalDirectoryClient) {
        let id = Uuid::new_v4();
        let provider = LocalIdentityProvider::signed_in(id);
        (id, directory.connect(provider.slot()))
    }

    #[tokio::test]
    async fn join_fills_open_lobby_before_creating() {
        let directory = LocalDirectory::new();
        let (host, host_client) = player(&directory);
        let (guest, guest_client) = player(&directory);

        let created = assert_ok!(host_client.join_lobby().await);
        assert_eq!(created.owner, host);

        let joined = assert_ok!(guest_client.join_lobby().await);
        assert_eq!(joined.id, created.id);
        assert_eq!(joined.members, vec![host, guest]);

        // Joining again is a no-op
        let again = guest_client.join_lobby().await.expect("join");
        assert_eq!(again.members.len(), 2);
    }

    #[tokio::test]
    async fn guest_cannot_select_map_or_start() {
        let directory = LocalDirectory::new();
        let (_, host_client) = player(&directory);
        let (_, guest_client) = player(&directory);

        let lobby = host_client.create_lobby().await.expect("create");
        guest_client.join_lobby().await.expect("join");

        let err = guest_client
            .select_map(lobby.id, GameMap::City)
            .await
            .expect_err("guest");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let err = assert_err!(guest_client.start_game(lobby.id).await);
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let lobby = host_client.select_map(lobby.id, GameMap::City).await.expect("host");
        assert_eq!(lobby.selected_map, GameMap::City);
    }

    #[tokio::test]
    async fn started_game_shares_roster() {
        let directory = LocalDirectory::new();
        let (host, host_client) = player(&directory);
        let (guest, guest_client) = player(&directory);

        let lobby = host_client.create_lobby().await.expect("create");
        guest_client.join_lobby().await.expect("join");
        let game = host_client.start_game(lobby.id).await.expect("start");
        assert!(game.started);
        assert!(host_client.get_active_lobbies().await.expect("list").is_empty());

        let moved = Position {
            x: 3.0,
            y: 1.6,
            z: -1.0,
            rotation: 0.5,
        };
        let roster = guest_client.update_player_position(moved).await.expect("update");
        assert_eq!(roster.len(), 2);

        let seen = host_client.get_players_in_game().await.expect("roster");
        let guest_entry = seen.iter().find(|p| p.player_id == guest).expect("guest listed");
        assert_eq!(guest_entry.position, moved);
        assert!(seen.iter().any(|p| p.player_id == host));

        let ended = host_client.end_game(game.id).await.expect("end");
        assert!(!ended.started);
        assert!(guest_client.get_players_in_game().await.expect("roster").is_empty());
        assert!(directory.lobby(lobby.id).is_none());
    }

    #[tokio::test]
    async fn owner_leaving_hands_over_lobby() {
        let directory = LocalDirectory::new();
        let (host, host_client) = player(&directory);
        let (guest, guest_client) = player(&directory);

        let lobby = host_client.create_lobby().await.expect("create");
        guest_client.join_lobby().await.expect("join");

        let after = host_client.leave_lobby(lobby.id).await.expect("leave");
        assert_eq!(after.owner, guest);
        assert!(!after.is_member(&host));

        let err = host_client.leave_lobby(lobby.id).await.expect_err("not member");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        guest_client.leave_lobby(lobby.id).await.expect("leave");
        let err = guest_client.leave_lobby(lobby.id).await.expect_err("closed");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn outage_and_anonymous_calls_are_classified() {
        let directory = LocalDirectory::new();
        let anonymous = directory.connect(IdentitySlot::new());
        let err = anonymous.join_lobby().await.expect_err("anonymous");
        assert_eq!(err.user_message(), "You must be signed in to perform this action");

        let (_, client) = player(&directory);
        directory.set_available(false);
        let err = assert_err!(client.get_active_lobbies().await);
        assert_eq!(err.kind(), ErrorKind::ConnectionNotReady);
        assert_eq!(directory.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_every_call() {
        let directory = LocalDirectory::new();
        let (_, client) = player(&directory);
        directory.set_latency(Duration::from_millis(300));

        let started = tokio::time::Instant::now();
        assert_ok!(client.get_active_lobbies().await);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn position_update_outside_game_is_not_found() {
        let directory = LocalDirectory::new();
        let (_, client) = player(&directory);
        let err = client
            .update_player_position(Position::default())
            .await
            .expect_err("no game");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
