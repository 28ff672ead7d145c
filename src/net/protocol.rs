//! Directory service wire types
//! These are the payloads exchanged with the session directory

use chrono::{DateTime, Utc};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;
pub type LobbyId = u64;
pub type GameId = u64;

/// Maps a lobby can be played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMap {
    Island,
    Jungle,
    City,
    Desert,
}

impl Default for GameMap {
    fn default() -> Self {
        Self::Island
    }
}

/// Map name that matches no map
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown map: {0}")]
pub struct UnknownMap(pub String);

impl std::str::FromStr for GameMap {
    type Err = UnknownMap;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "island" => Ok(Self::Island),
            "jungle" => Ok(Self::Jungle),
            "city" => Ok(Self::City),
            "desert" => Ok(Self::Desert),
            _ => Err(UnknownMap(s.trim().to_string())),
        }
    }
}

/// Reported player transform
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians
    pub rotation: f32,
}

impl Position {
    pub fn new(point: Vec3, yaw: f32) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            rotation: yaw,
        }
    }

    pub fn point(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// One roster entry as last reported by the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub position: Position,
    /// Health (0-100)
    pub health: u32,
    pub is_alive: bool,
    pub last_updated: DateTime<Utc>,
}

/// Lobby lifecycle as seen by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Waiting,
    Started,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbySession {
    pub id: LobbyId,
    pub owner: PlayerId,
    /// Unique member identities, owner included
    pub members: Vec<PlayerId>,
    pub selected_map: GameMap,
    pub status: LobbyStatus,
}

impl LobbySession {
    pub fn is_member(&self, player: &PlayerId) -> bool {
        self.members.contains(player)
    }

    pub fn is_owner(&self, player: &PlayerId) -> bool {
        &self.owner == player
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: GameId,
    /// Lobby the game was started from
    pub lobby_id: LobbyId,
    pub started: bool,
    pub last_update: DateTime<Utc>,
    pub members: Vec<PlayerId>,
    pub map: GameMap,
}

/// Request bodies for the HTTP binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyRequest {
    pub lobby_id: LobbyId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectMapRequest {
    pub lobby_id: LobbyId,
    pub map: GameMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRequest {
    pub game_id: GameId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyRequest {}

/// Fault body returned with non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_wire_format_uses_snake_case() {
        let lobby = LobbySession {
            id: 7,
            owner: Uuid::nil(),
            members: vec![Uuid::nil()],
            selected_map: GameMap::Desert,
            status: LobbyStatus::Waiting,
        };
        let json = serde_json::to_value(&lobby).expect("serialize");
        assert_eq!(json["selected_map"], "desert");
        assert_eq!(json["status"], "waiting");
    }

    #[test]
    fn position_carries_yaw_as_rotation() {
        let position = Position::new(Vec3::new(1.0, 1.6, -2.0), 0.5);
        let json = serde_json::to_string(&position).expect("serialize");
        assert_eq!(json, r#"{"x":1.0,"y":1.6,"z":-2.0,"rotation":0.5}"#);
        assert_eq!(position.point(), Vec3::new(1.0, 1.6, -2.0));
    }

    #[test]
    fn map_names_parse() {
        assert_eq!("Jungle".parse::<GameMap>(), Ok(GameMap::Jungle));
        assert_eq!("moon".parse::<GameMap>(), Err(UnknownMap("moon".to_string())));
    }
}
