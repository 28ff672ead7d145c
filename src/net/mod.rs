//! Session directory access: wire types, clients and identity

pub mod directory;
pub mod error;
pub mod http;
pub mod identity;
pub mod memory;
pub mod protocol;

pub use directory::{Directory, DirectoryService};
pub use error::{DirectoryError, ErrorKind, IdentityError};
pub use http::HttpDirectory;
pub use identity::{Identity, IdentityProvider, IdentitySlot, LocalIdentityProvider};
pub use memory::{LocalDirectory, LocalDirectoryClient};
