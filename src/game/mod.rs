//! Local simulation modules

pub mod hit;
pub mod impact;
pub mod movement;
pub mod scene;
pub mod target;
pub mod weapon;

pub use scene::{Scene, SceneEvent, SceneKind, SceneOptions, ScoreBoard};

use movement::MovementInput;
use weapon::WeaponKind;

/// Everything the player did during one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub movement: MovementInput,
    /// Trigger held
    pub fire: bool,
    /// Weapon requested this frame, if any
    pub switch_weapon: Option<WeaponKind>,
}
