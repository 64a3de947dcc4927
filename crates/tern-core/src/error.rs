use std::{fmt, io};

use thiserror::Error;

use tern_model::{ArtifactKey, ModelError};

/// Pipeline stage a [`PrepareError`] originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Credentials,
    Bundle,
    Localize,
    Serialize,
    Launch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Credentials => "credentials",
            Stage::Bundle => "bundle",
            Stage::Localize => "localize",
            Stage::Serialize => "serialize",
            Stage::Launch => "launch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("secure store holds '{found}', expected a credential set")]
    UnsupportedCredentialType { found: &'static str },
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("unable to resolve artifact '{artifact}' (required by {required_by})")]
    DependencyResolution {
        artifact: String,
        required_by: String,
    },

    #[error("launcher must not depend on '{artifact}'")]
    LauncherHasDependencies { artifact: String },

    #[error("failed to read artifact '{artifact}': {source}")]
    Unreadable {
        artifact: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid dependency graph: {0}")]
    InvalidGraph(String),

    #[error("archive error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("failed to stage resource '{resource}' of unit '{unit}': {source}")]
    ResourceStaging {
        unit: String,
        resource: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to stage artifact '{artifact}': {source}")]
    Artifact {
        artifact: ArtifactKey,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch '{uri}': {source}")]
    Fetch {
        uri: String,
        #[source]
        source: io::Error,
    },

    #[error("resource '{uri}' cannot be bundled: {reason}")]
    BundleResource { uri: String, reason: String },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("command references '{0}' which is not among the localized resources")]
    UnresolvedArtifact(ArtifactKey),

    #[error("invalid launch descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("controller error: {0}")]
    Controller(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure of one pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fatal error of a submission attempt.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PrepareError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl PrepareError {
    pub fn new(stage: Stage, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// Adapter for `map_err`.
    pub(crate) fn at<E: Into<StageError>>(stage: Stage) -> impl FnOnce(E) -> Self {
        move |e| Self::new(stage, e)
    }
}

pub type PrepareResult<T> = Result<T, PrepareError>;
