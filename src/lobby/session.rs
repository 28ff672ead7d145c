//! Lobby and game session lifecycle

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::notify::Notifier;
use crate::net::error::{user_message, ErrorKind};
use crate::net::protocol::{GameMap, GameSession, LobbySession, PlayerId};
use crate::net::{DirectoryError, DirectoryService};

use super::maps::MapInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyRole {
    Host,
    Guest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NoLobby,
    InLobby { lobby: LobbySession, role: LobbyRole },
    InGame { game: GameSession },
}

/// Requested transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Join,
    Leave,
    SelectMap(GameMap),
    Start,
    End,
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Self::Create => "create a lobby",
            Self::Join => "join a lobby",
            Self::Leave => "leave the lobby",
            Self::SelectMap(_) => "select the map",
            Self::Start => "start the game",
            Self::End => "end the game",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unauthorized: only the lobby host can {0}")]
    NotHost(&'static str),

    #[error("Cannot {0}: lobby not found in current session")]
    NotInLobby(&'static str),

    #[error("Cannot {0}: game not found in current session")]
    NotInGame(&'static str),

    #[error("Cannot {0} while already in a session")]
    AlreadyInSession(&'static str),

    #[error("Cannot {0} while another request is pending")]
    Busy(&'static str),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotHost(_) => ErrorKind::Unauthorized,
            Self::NotInLobby(_) | Self::NotInGame(_) => ErrorKind::NotFound,
            Self::AlreadyInSession(_) | Self::Busy(_) => ErrorKind::Unknown,
            Self::Directory(e) => e.kind(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        user_message(self.kind(), &self.to_string())
    }
}

/// Local view of the session lifecycle.
///
/// Transitions are provisional: `begin` checks the precondition and marks a
/// request pending, the state only moves when the directory's answer is
/// confirmed. The role is always derived from the confirmed lobby owner.
#[derive(Debug, Clone)]
pub struct LobbySessionStateMachine {
    local_id: PlayerId,
    state: SessionState,
    pending: Option<Transition>,
}

impl LobbySessionStateMachine {
    pub fn new(local_id: PlayerId) -> Self {
        Self {
            local_id,
            state: SessionState::NoLobby,
            pending: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending(&self) -> Option<Transition> {
        self.pending
    }

    pub fn role(&self) -> Option<LobbyRole> {
        match &self.state {
            SessionState::InLobby { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn lobby(&self) -> Option<&LobbySession> {
        match &self.state {
            SessionState::InLobby { lobby, .. } => Some(lobby),
            _ => None,
        }
    }

    pub fn game(&self) -> Option<&GameSession> {
        match &self.state {
            SessionState::InGame { game } => Some(game),
            _ => None,
        }
    }

    /// Check the precondition of `transition` and mark it pending
    pub fn begin(&mut self, transition: Transition) -> Result<(), SessionError> {
        let action = transition.name();
        if self.pending.is_some() {
            return Err(SessionError::Busy(action));
        }

        match (transition, &self.state) {
            (Transition::Create | Transition::Join, SessionState::NoLobby) => {}
            (Transition::Create | Transition::Join, _) => return Err(SessionError::AlreadyInSession(action)),
            (Transition::Leave, SessionState::InLobby { .. }) => {}
            (Transition::SelectMap(_) | Transition::Start, SessionState::InLobby { role, .. }) => {
                if *role != LobbyRole::Host {
                    return Err(SessionError::NotHost(action));
                }
            }
            (Transition::Leave | Transition::SelectMap(_) | Transition::Start, _) => {
                return Err(SessionError::NotInLobby(action))
            }
            (Transition::End, SessionState::InGame { .. }) => {}
            (Transition::End, _) => return Err(SessionError::NotInGame(action)),
        }

        self.pending = Some(transition);
        Ok(())
    }

    /// Directory answered a lobby transition
    pub fn confirm_lobby(&mut self, lobby: LobbySession) {
        self.pending = None;
        self.state = if lobby.is_member(&self.local_id) {
            let role = self.role_in(&lobby);
            SessionState::InLobby { lobby, role }
        } else {
            SessionState::NoLobby
        };
    }

    /// Directory answered a game transition
    pub fn confirm_game(&mut self, game: GameSession) {
        self.pending = None;
        self.state = if game.started {
            SessionState::InGame { game }
        } else {
            SessionState::NoLobby
        };
    }

    /// Request failed; prior state stands
    pub fn abort(&mut self) {
        self.pending = None;
    }

    /// Adopt a polled copy of the current lobby
    pub fn observe(&mut self, lobbies: &[LobbySession]) {
        if self.pending.is_some() {
            return;
        }
        let current = match &self.state {
            SessionState::InLobby { lobby, .. } => lobby.id,
            _ => return,
        };
        if let Some(latest) = lobbies.iter().find(|l| l.id == current) {
            if latest.is_member(&self.local_id) {
                let role = self.role_in(latest);
                self.state = SessionState::InLobby {
                    lobby: latest.clone(),
                    role,
                };
            }
        }
    }

    fn role_in(&self, lobby: &LobbySession) -> LobbyRole {
        if lobby.is_owner(&self.local_id) {
            LobbyRole::Host
        } else {
            LobbyRole::Guest
        }
    }
}

/// Drives the state machine against the directory, reporting failures as
/// toasts
pub struct LobbyController<D> {
    directory: Arc<D>,
    machine: LobbySessionStateMachine,
    notifier: Notifier,
}

impl<D: DirectoryService> LobbyController<D> {
    pub fn new(directory: Arc<D>, local_id: PlayerId, notifier: Notifier) -> Self {
        Self {
            directory,
            machine: LobbySessionStateMachine::new(local_id),
            notifier,
        }
    }

    pub fn machine(&self) -> &LobbySessionStateMachine {
        &self.machine
    }

    pub fn observe(&mut self, lobbies: &[LobbySession]) {
        self.machine.observe(lobbies);
    }

    pub async fn create(&mut self) -> Result<LobbySession, SessionError> {
        self.begin(Transition::Create)?;
        match self.directory.create_lobby().await {
            Ok(lobby) => {
                info!(lobby_id = lobby.id, "Created lobby");
                self.notifier.success("Lobby created");
                self.machine.confirm_lobby(lobby.clone());
                Ok(lobby)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    pub async fn join(&mut self) -> Result<LobbySession, SessionError> {
        self.begin(Transition::Join)?;
        match self.directory.join_lobby().await {
            Ok(lobby) => {
                info!(lobby_id = lobby.id, members = lobby.members.len(), "Joined lobby");
                self.notifier.success("Joined lobby");
                self.machine.confirm_lobby(lobby.clone());
                Ok(lobby)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    pub async fn leave(&mut self) -> Result<LobbySession, SessionError> {
        self.begin(Transition::Leave)?;
        let lobby_id = self.lobby_id();
        match self.directory.leave_lobby(lobby_id).await {
            Ok(lobby) => {
                info!(lobby_id, "Left lobby");
                self.machine.confirm_lobby(lobby.clone());
                Ok(lobby)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    pub async fn select_map(&mut self, map: GameMap) -> Result<LobbySession, SessionError> {
        self.begin(Transition::SelectMap(map))?;
        let lobby_id = self.lobby_id();
        match self.directory.select_map(lobby_id, map).await {
            Ok(lobby) => {
                info!(lobby_id, map = MapInfo::of(lobby.selected_map).name, "Map selected");
                self.machine.confirm_lobby(lobby.clone());
                Ok(lobby)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    pub async fn start(&mut self) -> Result<GameSession, SessionError> {
        self.begin(Transition::Start)?;
        let lobby_id = self.lobby_id();
        match self.directory.start_game(lobby_id).await {
            Ok(game) => {
                info!(game_id = game.id, lobby_id, "Game started");
                self.notifier.success("Game started");
                self.machine.confirm_game(game.clone());
                Ok(game)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    pub async fn end(&mut self) -> Result<GameSession, SessionError> {
        self.begin(Transition::End)?;
        let game_id = self.machine.game().map(|g| g.id).unwrap_or_default();
        match self.directory.end_game(game_id).await {
            Ok(game) => {
                info!(game_id, "Game ended");
                self.machine.confirm_game(game.clone());
                Ok(game)
            }
            Err(e) => self.fail(e.into()),
        }
    }

    fn begin(&mut self, transition: Transition) -> Result<(), SessionError> {
        if let Err(e) = self.machine.begin(transition) {
            warn!(error = %e, "Session transition rejected");
            self.notifier.error(e.user_message());
            return Err(e);
        }
        Ok(())
    }

    fn lobby_id(&self) -> u64 {
        self.machine.lobby().map(|l| l.id).unwrap_or_default()
    }

    fn fail<T>(&mut self, error: SessionError) -> Result<T, SessionError> {
        self.machine.abort();
        warn!(error = %error, kind = ?error.kind(), "Directory request failed");
        self.notifier.error(error.user_message());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::notify::ToastLevel;
    use crate::net::identity::{IdentityProvider, LocalIdentityProvider};
    use crate::net::{LocalDirectory, LocalDirectoryClient};
    use uuid::Uuid;

    fn controller(directory: &LocalDirectory) -> (PlayerId, LobbyController<LocalDirectoryClient>, Notifier) {
        let id = Uuid::new_v4();
        let provider = LocalIdentityProvider::signed_in(id);
        let notifier = Notifier::default();
        let client = Arc::new(directory.connect(provider.slot()));
        (id, LobbyController::new(client, id, notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn host_runs_full_lifecycle() {
        let directory = LocalDirectory::new();
        let (_, mut host, _) = controller(&directory);

        let lobby = host.create().await.expect("create");
        assert_eq!(host.machine().role(), Some(LobbyRole::Host));

        let lobby = host.select_map(GameMap::Desert).await.expect("select");
        assert_eq!(lobby.selected_map, GameMap::Desert);
        assert_eq!(host.machine().lobby().map(|l| l.selected_map), Some(GameMap::Desert));

        let game = host.start().await.expect("start");
        assert_eq!(game.lobby_id, lobby.id);
        assert!(matches!(host.machine().state(), SessionState::InGame { .. }));

        host.end().await.expect("end");
        assert_eq!(host.machine().state(), &SessionState::NoLobby);
    }

    #[tokio::test]
    async fn guest_is_rejected_locally() {
        let directory = LocalDirectory::new();
        let (_, mut host, _) = controller(&directory);
        let (_, mut guest, notifier) = controller(&directory);
        let mut toasts = notifier.subscribe();

        let lobby = host.create().await.expect("create");
        guest.join().await.expect("join");
        assert_eq!(guest.machine().role(), Some(LobbyRole::Guest));

        let calls = directory.call_count();
        let err = guest.select_map(GameMap::City).await.expect_err("guest");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let err = guest.start().await.expect_err("guest");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(directory.call_count(), calls);

        // Prior state untouched
        assert_eq!(guest.machine().lobby().map(|l| l.id), Some(lobby.id));
        assert_eq!(guest.machine().pending(), None);

        let _joined = toasts.recv().await.expect("join toast");
        let toast = toasts.recv().await.expect("error toast");
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.message, "You do not have permission to perform this action");
    }

    #[tokio::test]
    async fn role_follows_confirmed_owner() {
        let directory = LocalDirectory::new();
        let (_, mut host, _) = controller(&directory);
        let (guest_id, mut guest, _) = controller(&directory);

        let lobby = host.create().await.expect("create");
        guest.join().await.expect("join");
        host.leave().await.expect("leave");
        assert_eq!(host.machine().state(), &SessionState::NoLobby);

        let latest = directory.lobby(lobby.id).expect("lobby still open");
        assert_eq!(latest.owner, guest_id);
        guest.observe(&[latest]);
        assert_eq!(guest.machine().role(), Some(LobbyRole::Host));
        guest.select_map(GameMap::Jungle).await.expect("now host");
    }

    #[tokio::test]
    async fn directory_failure_keeps_prior_state() {
        let directory = LocalDirectory::new();
        let (_, mut host, _) = controller(&directory);
        host.create().await.expect("create");

        directory.set_available(false);
        let err = host.start().await.expect_err("down");
        assert_eq!(err.kind(), ErrorKind::ConnectionNotReady);
        assert_eq!(host.machine().role(), Some(LobbyRole::Host));
        assert_eq!(host.machine().pending(), None);
    }

    #[test]
    fn transitions_need_matching_state() {
        let mut machine = LobbySessionStateMachine::new(Uuid::new_v4());
        assert!(matches!(machine.begin(Transition::Leave), Err(SessionError::NotInLobby(_))));
        assert!(matches!(machine.begin(Transition::End), Err(SessionError::NotInGame(_))));
        machine.begin(Transition::Create).expect("create");
        assert!(matches!(machine.begin(Transition::Join), Err(SessionError::Busy(_))));
        machine.abort();
        assert_eq!(machine.state(), &SessionState::NoLobby);
    }
}
