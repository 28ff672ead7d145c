//! Client session wiring

pub mod input;
pub mod notify;
pub mod peers;
pub mod runner;
pub mod state;

pub use state::ClientState;
