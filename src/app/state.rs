//! Client state shared across the session

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::net::{Directory, HttpDirectory, IdentityProvider, LocalDirectory, LocalIdentityProvider};

use super::notify::Notifier;

/// Shared client state
#[derive(Clone)]
pub struct ClientState {
    pub config: Arc<Config>,
    pub identity: LocalIdentityProvider,
    pub directory: Arc<Directory>,
    /// Present when running against the in-process directory
    pub local_directory: Option<LocalDirectory>,
    pub notifier: Notifier,
}

impl ClientState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let identity = LocalIdentityProvider::new();

        let (directory, local_directory) = match &config.directory_url {
            Some(url) => {
                info!(url = %url, "Using HTTP directory");
                (Directory::Http(HttpDirectory::new(url, identity.slot())), None)
            }
            None => {
                info!("Using in-process directory");
                let local = LocalDirectory::new();
                (Directory::Local(local.connect(identity.slot())), Some(local))
            }
        };

        Self {
            config,
            identity,
            directory: Arc::new(directory),
            local_directory,
            notifier: Notifier::default(),
        }
    }
}
