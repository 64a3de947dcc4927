use tern_model::{ArtifactKey, CredentialSet, Env, ResourceDescriptor};

use crate::error::LaunchError;

/// Placeholder for the container log directory, substituted by the launcher.
pub const LOG_DIR: &str = "<LOG_DIR>";

/// Default stdout redirection target.
pub const STDOUT: &str = "<LOG_DIR>/stdout";

/// Default stderr redirection target.
pub const STDERR: &str = "<LOG_DIR>/stderr";

#[derive(Clone, Debug, PartialEq, Eq)]
enum CommandToken {
    Literal(String),
    /// File name of a localized artifact followed by `suffix`.
    Artifact { key: ArtifactKey, suffix: String },
}

/// Everything a cluster launcher needs to start the master process.
///
/// Built once through [`LaunchDescriptor::builder`] and consumed by value on
/// submission.
#[derive(Clone, Debug)]
pub struct LaunchDescriptor {
    env: Env,
    resources: Vec<ResourceDescriptor>,
    credentials: Vec<u8>,
    command: Vec<String>,
    memory_mb: u32,
    virtual_cores: u32,
    stdout: String,
    stderr: String,
}

impl LaunchDescriptor {
    pub fn builder() -> LaunchDescriptorBuilder {
        LaunchDescriptorBuilder::default()
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Files localized into the master's working directory.
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Serialized [`CredentialSet`].
    pub fn credentials(&self) -> &[u8] {
        &self.credentials
    }

    /// Command tokens; `$VAR` references are left for the launcher to expand.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn memory_mb(&self) -> u32 {
        self.memory_mb
    }

    pub fn virtual_cores(&self) -> u32 {
        self.virtual_cores
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

#[derive(Debug, Default)]
pub struct LaunchDescriptorBuilder {
    env: Env,
    resources: Vec<ResourceDescriptor>,
    credentials: CredentialSet,
    command: Vec<CommandToken>,
    memory_mb: u32,
    virtual_cores: u32,
    stdout: Option<String>,
    stderr: Option<String>,
}

impl LaunchDescriptorBuilder {
    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn resources<I>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = ResourceDescriptor>,
    {
        self.resources.extend(resources);
        self
    }

    pub fn credentials(mut self, credentials: CredentialSet) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn memory_mb(mut self, mb: u32) -> Self {
        self.memory_mb = mb;
        self
    }

    pub fn virtual_cores(mut self, cores: u32) -> Self {
        self.virtual_cores = cores;
        self
    }

    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.command.push(CommandToken::Literal(token.into()));
        self
    }

    pub fn args<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command
            .extend(tokens.into_iter().map(|t| CommandToken::Literal(t.into())));
        self
    }

    /// Reference a localized artifact by key; resolved in [`Self::build`].
    pub fn artifact(self, key: ArtifactKey) -> Self {
        self.artifact_with_suffix(key, "")
    }

    pub fn artifact_with_suffix(mut self, key: ArtifactKey, suffix: impl Into<String>) -> Self {
        self.command.push(CommandToken::Artifact {
            key,
            suffix: suffix.into(),
        });
        self
    }

    pub fn stdout(mut self, target: impl Into<String>) -> Self {
        self.stdout = Some(target.into());
        self
    }

    pub fn stderr(mut self, target: impl Into<String>) -> Self {
        self.stderr = Some(target.into());
        self
    }

    /// Resolve artifact references against the resource list and freeze the descriptor.
    pub fn build(self) -> Result<LaunchDescriptor, LaunchError> {
        if self.command.is_empty() {
            return Err(LaunchError::InvalidDescriptor("empty command".into()));
        }
        if self.memory_mb == 0 {
            return Err(LaunchError::InvalidDescriptor(
                "memory request must be positive".into(),
            ));
        }
        if self.virtual_cores == 0 {
            return Err(LaunchError::InvalidDescriptor(
                "virtual core request must be positive".into(),
            ));
        }

        let mut command = Vec::with_capacity(self.command.len());
        for token in self.command {
            match token {
                CommandToken::Literal(s) => command.push(s),
                CommandToken::Artifact { key, suffix } => {
                    let name = key.file_name();
                    if !self.resources.iter().any(|r| r.name() == name) {
                        return Err(LaunchError::UnresolvedArtifact(key));
                    }
                    command.push(format!("{name}{suffix}"));
                }
            }
        }

        let credentials = self
            .credentials
            .to_bytes()
            .map_err(|e| LaunchError::InvalidDescriptor(format!("credentials: {e}")))?;

        Ok(LaunchDescriptor {
            env: self.env,
            resources: self.resources,
            credentials,
            command,
            memory_mb: self.memory_mb,
            virtual_cores: self.virtual_cores,
            stdout: self.stdout.unwrap_or_else(|| STDOUT.to_string()),
            stderr: self.stderr.unwrap_or_else(|| STDERR.to_string()),
        })
    }
}
