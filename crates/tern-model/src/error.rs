use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("invalid resource uri: {0}")]
    InvalidUri(String),

    #[error("invalid document version: {0}")]
    InvalidVersion(String),

    #[error("incompatible specification version {found} (supported major: {supported})")]
    IncompatibleVersion { found: String, supported: u32 },

    #[error("unexpected document kind: expected {expected}, got {found}")]
    UnexpectedDocument { expected: String, found: String },

    #[error("unknown artifact key: {0}")]
    UnknownArtifact(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
