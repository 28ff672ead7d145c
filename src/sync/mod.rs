//! Keeping the local player and the directory roster in step

pub mod poller;
pub mod publisher;
pub mod reconciler;
pub mod roster;

pub use publisher::{PositionPublisher, PublishEvent};
pub use reconciler::{RemoteAvatar, RemoteStateReconciler};
pub use roster::{LobbyListCache, RosterCache};
