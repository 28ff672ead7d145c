//! Strikepoint client core
//!
//! Local simulation (movement, weapons, hit detection, impacts, targets),
//! the lobby and game lifecycle against the session directory, and the
//! roster sync that keeps remote players in view. The `strikepoint` binary
//! runs one headless session on top of this library.

pub mod app;
pub mod config;
pub mod game;
pub mod lobby;
pub mod net;
pub mod sync;
pub mod util;
