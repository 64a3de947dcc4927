pub mod bundle;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod launch;
pub mod localize;
pub mod preparer;
pub mod serialize;
pub mod storage;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::bundle::{ArtifactNode, Bundler, DependencyGraph};
    pub use crate::config::PreparerConfig;
    pub use crate::credentials::{CredentialWarning, Identity, SecureStore, TokenIssuer};
    pub use crate::error::{PrepareError, Stage};
    pub use crate::fetch::ResourceFetcher;
    pub use crate::launch::{
        ClusterClient, LaunchDescriptor, ProcessController, ProcessLauncher, ProcessStatus,
    };
    pub use crate::preparer::{Backends, Preparer, Submission};
    pub use crate::storage::{Location, MemoryStorage, SharedStorage, Stat};
}
