//! Lobby lifecycle and map selection

pub mod maps;
pub mod session;

pub use maps::MapInfo;
pub use session::{LobbyController, LobbyRole, LobbySessionStateMachine, SessionError, SessionState};
