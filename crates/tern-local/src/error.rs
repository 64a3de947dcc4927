use thiserror::Error;

use tern_core::error::LaunchError;

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("invalid local cluster configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("path escapes the storage root: {0}")]
    PathEscape(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LocalError> for LaunchError {
    fn from(e: LocalError) -> Self {
        match e {
            LocalError::Io(e) => LaunchError::Io(e),
            other => LaunchError::Controller(other.to_string()),
        }
    }
}
