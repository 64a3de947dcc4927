//! Single-host backends for the preparer.
//!
//! A directory stands in for the shared file system and masters run as
//! subprocesses with rlimit ceilings, so a whole submission can be exercised
//! on one machine.
mod cluster;
mod config;
mod controller;
mod error;
mod fetch;
mod limits;
mod storage;

pub use cluster::{
    CREDENTIALS_FILE, ENV_CREDENTIALS_FILE, ENV_LOG_DIR, LOGS_DIR, LocalCluster, LocalLauncher,
};
pub use config::LocalClusterConfig;
pub use controller::LocalController;
pub use error::LocalError;
pub use fetch::LocalFetcher;
pub use limits::{ProcessLimits, attach_limits};
pub use storage::LocalStorage;
