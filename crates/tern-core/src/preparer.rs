//! Submission orchestration.
//!
//! [`Preparer`] collects what the caller wants to run, then [`Preparer::start`]
//! walks the pipeline once, in this order:
//! 1. validate configuration and specification;
//! 2. allocate an application id from the cluster client;
//! 3. gather credentials;
//! 4. bundle and stage the master and worker closures;
//! 5. localize unit resources;
//! 6. stage the rewritten spec, logging template, launcher, runtime options,
//!    arguments and the localization manifest;
//! 7. build the launch descriptor and submit it.
//!
//! The first fatal error aborts the run. Staged files are left in place; the
//! next attempt uses a fresh run id and never collides with them.
use std::{collections::HashSet, io, sync::Arc};

use tern_model::{
    ApplicationId, ApplicationSpec, ArtifactKey, ArtifactMap, Arguments, CredentialSet,
    ENV_APP_DIR, ENV_APP_ID, ENV_APP_NAME, ENV_CONF_DIR, ENV_COORD_CONNECT, ENV_FS_USER,
    ENV_RESERVED_MEMORY_MB, ENV_RUN_ID, Env, ResourceUri, RunId,
};
use tracing::{debug, info, instrument};

use crate::{
    bundle::{BundleRequest, Bundler, CLASSPATH_ENTRY, DependencyGraph},
    config::PreparerConfig,
    credentials::{CredentialPropagator, CredentialWarning, Identity, SecureStore, TokenIssuer},
    error::{LaunchError, PrepareError, PrepareResult, Stage, StagingError},
    fetch::{ResourceFetcher, unsupported},
    launch::{ClusterClient, LaunchDescriptor, ProcessController, STDERR, STDOUT},
    localize::Localizer,
    serialize::{self, LOGGING_TEMPLATE},
    storage::{Location, SharedStorage, stage_bytes},
};

/// Coordination-service namespace of an application.
pub fn coordination_namespace(connect: &str, app: &str) -> String {
    format!("{}/{}", connect.trim_end_matches('/'), app)
}

/// External collaborators a preparer works against.
#[derive(Clone)]
pub struct Backends {
    pub storage: Arc<dyn SharedStorage>,
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub cluster: Arc<dyn ClusterClient>,
    pub graph: Arc<DependencyGraph>,
}

/// Outcome of a successful submission.
pub struct Submission {
    pub run_id: RunId,
    pub application_id: ApplicationId,
    pub controller: Box<dyn ProcessController>,
    pub warnings: Vec<CredentialWarning>,
    pub artifacts: ArtifactMap,
}

/// Prepares and submits one application.
pub struct Preparer {
    spec: ApplicationSpec,
    config: PreparerConfig,
    backends: Backends,
    credentials: CredentialPropagator,
    run_id: RunId,
    user: String,
    arguments: Arguments,
    dependencies: Vec<String>,
    resources: Vec<ResourceUri>,
    class_paths: Vec<String>,
}

impl Preparer {
    pub fn new(
        spec: ApplicationSpec,
        config: PreparerConfig,
        backends: Backends,
        identity: Identity,
    ) -> Self {
        Self {
            user: identity.user().to_string(),
            credentials: CredentialPropagator::new(identity),
            spec,
            config,
            backends,
            run_id: RunId::generate(),
            arguments: Arguments::new(),
            dependencies: Vec::new(),
            resources: Vec::new(),
            class_paths: Vec::new(),
        }
    }

    /// Submit as `user` instead of the identity's own user.
    pub fn set_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Replace the generated run id, e.g. for reproducible tests.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_application_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.push_application(args);
        self
    }

    pub fn with_arguments<I, S>(mut self, unit: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.push_unit(unit, args);
        self
    }

    /// Extra code artifacts packaged with the workers.
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Extra files packaged verbatim with the workers.
    pub fn with_resources<I>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = ResourceUri>,
    {
        self.resources.extend(uris);
        self
    }

    /// Extra class path entries recorded in the launcher package.
    pub fn with_class_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_token_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.credentials.add_issuer(issuer);
        self
    }

    /// Merge caller credentials; anything but a [`CredentialSet`] fails here, before any I/O.
    pub fn add_secure_store(mut self, store: SecureStore) -> PrepareResult<Self> {
        self.credentials
            .merge_secure_store(&store)
            .map_err(PrepareError::at(Stage::Credentials))?;
        Ok(self)
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Staging directory of this run: `/<app>/<run id>`.
    pub fn app_location(&self) -> Location {
        self.backends
            .storage
            .resolve(&format!("/{}/{}", self.spec.name, self.run_id))
    }

    #[instrument(skip_all, fields(app = %self.spec.name, run_id = %self.run_id))]
    pub async fn start(self) -> PrepareResult<Submission> {
        self.config.validate().map_err(PrepareError::at(Stage::Config))?;
        self.spec.validate().map_err(PrepareError::at(Stage::Config))?;

        let launcher = self
            .backends
            .cluster
            .create_launcher(&self.user, &self.spec)
            .await
            .map_err(PrepareError::at(Stage::Launch))?;
        let application_id = launcher.application_id().clone();
        info!(%application_id, cluster = self.backends.cluster.name(), "application id allocated");

        let home = self.backends.storage.home();
        let gathered = self
            .credentials
            .gather(self.backends.cluster.name(), &home)
            .await;

        let artifacts = self.stage().await?;
        let descriptor = self
            .descriptor(&application_id, &artifacts, gathered.credentials)
            .map_err(PrepareError::at(Stage::Launch))?;

        debug!(%application_id, command = ?descriptor.command(), "submitting master");
        let controller = launcher
            .launch(descriptor)
            .await
            .map_err(PrepareError::at(Stage::Launch))?;
        info!(%application_id, artifacts = artifacts.len(), "application submitted");

        Ok(Submission {
            run_id: self.run_id,
            application_id,
            controller,
            warnings: gathered.warnings,
            artifacts,
        })
    }

    /// Produce every artifact the master needs.
    ///
    /// An artifact is registered only after its bytes are fully written.
    async fn stage(&self) -> PrepareResult<ArtifactMap> {
        let root = self.app_location();
        let bundler = Bundler::new(self.backends.graph.clone())
            .with_excludes(self.config.bundle_excludes.iter().cloned());
        let mut artifacts = ArtifactMap::new();

        let master = self.master_request();
        self.stage_bundle(&mut artifacts, &root, &bundler, ArtifactKey::MasterPackage, master)
            .await?;
        let worker = self.worker_request().await?;
        self.stage_bundle(&mut artifacts, &root, &bundler, ArtifactKey::WorkerPackage, worker)
            .await?;

        let localized = Localizer::new(
            self.backends.storage.clone(),
            self.backends.fetcher.clone(),
            root.clone(),
        )
        .localize(&self.spec)
        .await
        .map_err(PrepareError::at(Stage::Localize))?;

        let spec = serialize::rewrite(&self.spec, &localized);
        let bytes = serialize::encode_spec(&spec).map_err(PrepareError::at(Stage::Serialize))?;
        self.stage_artifact(&mut artifacts, &root, Stage::Serialize, ArtifactKey::Spec, bytes)
            .await?;

        self.stage_artifact(
            &mut artifacts,
            &root,
            Stage::Serialize,
            ArtifactKey::LoggingTemplate,
            LOGGING_TEMPLATE.as_bytes().to_vec(),
        )
        .await?;

        let launcher = self.launcher_request();
        self.stage_bundle(&mut artifacts, &root, &bundler, ArtifactKey::LauncherPackage, launcher)
            .await?;

        if let Some(bytes) = serialize::encode_runtime_options(&self.config.runtime_options) {
            let key = ArtifactKey::RuntimeOptions;
            self.stage_artifact(&mut artifacts, &root, Stage::Serialize, key, bytes)
                .await?;
        }

        let bytes = serialize::encode_arguments(&self.arguments)
            .map_err(PrepareError::at(Stage::Serialize))?;
        self.stage_artifact(&mut artifacts, &root, Stage::Serialize, ArtifactKey::Arguments, bytes)
            .await?;

        let bytes = serialize::encode_manifest(&artifacts)
            .map_err(PrepareError::at(Stage::Serialize))?;
        let key = ArtifactKey::LocalizeManifest;
        self.stage_artifact(&mut artifacts, &root, Stage::Serialize, key, bytes)
            .await?;

        Ok(artifacts)
    }

    async fn stage_bundle(
        &self,
        artifacts: &mut ArtifactMap,
        root: &Location,
        bundler: &Bundler,
        key: ArtifactKey,
        request: BundleRequest,
    ) -> PrepareResult<()> {
        let bundle = bundler
            .create_bundle(request)
            .await
            .map_err(PrepareError::at(Stage::Bundle))?;
        debug!(artifact = %key, closure = ?bundle.artifacts, "bundle built");
        self.stage_artifact(artifacts, root, Stage::Bundle, key, bundle.bytes)
            .await
    }

    async fn stage_artifact(
        &self,
        artifacts: &mut ArtifactMap,
        root: &Location,
        stage: Stage,
        key: ArtifactKey,
        bytes: Vec<u8>,
    ) -> PrepareResult<()> {
        let descriptor = stage_bytes(self.backends.storage.as_ref(), root, key.file_name(), bytes)
            .await
            .map_err(|source| {
                PrepareError::new(stage, StagingError::Artifact { artifact: key, source })
            })?;
        debug!(
            artifact = %key,
            uri = %descriptor.uri(),
            size = descriptor.size_bytes().unwrap_or_default(),
            "artifact staged"
        );
        artifacts.insert(key, descriptor);
        Ok(())
    }

    /// Master entry point, cluster client and declared event handler.
    fn master_request(&self) -> BundleRequest {
        let mut entries = vec![self.config.master_entry.clone()];
        if let Some(client) = self.backends.cluster.client_artifact() {
            entries.push(client.to_string());
        }
        if let Some(handler) = &self.spec.event_handler {
            if !handler.is_log_only() {
                entries.push(handler.entry_point.clone());
            }
        }
        BundleRequest::new(entries)
    }

    /// Container entry point, caller dependencies, every unit's entry point and caller resources.
    ///
    /// Resources in shared storage are read from it; others go through the
    /// fetcher. Each lands under its file name, which must be unique.
    async fn worker_request(&self) -> PrepareResult<BundleRequest> {
        let entries = std::iter::once(self.config.container_entry.clone())
            .chain(self.dependencies.iter().cloned())
            .chain(self.spec.units.values().map(|u| u.executable.entry_point.clone()));
        let mut request = BundleRequest::new(entries);

        let mut names = HashSet::new();
        for uri in &self.resources {
            let rejected = |reason: String| {
                PrepareError::new(
                    Stage::Bundle,
                    StagingError::BundleResource {
                        uri: uri.to_string(),
                        reason,
                    },
                )
            };
            let name = uri
                .file_name()
                .filter(|n| *n != "." && *n != "..")
                .ok_or_else(|| rejected("path has no file name".into()))?;
            if !names.insert(name) {
                return Err(rejected(format!("another resource is already named '{name}'")));
            }

            let data = self.read_resource(uri).await.map_err(|source| {
                PrepareError::new(
                    Stage::Bundle,
                    StagingError::Fetch {
                        uri: uri.to_string(),
                        source,
                    },
                )
            })?;
            request = request.with_resource(name, data);
        }
        Ok(request)
    }

    async fn read_resource(&self, uri: &ResourceUri) -> io::Result<Vec<u8>> {
        let Backends { storage, fetcher, .. } = &self.backends;
        if storage.owns(uri) {
            storage.read(&Location::new(uri.clone())).await
        } else if fetcher.supports(uri) {
            fetcher.fetch(uri).await
        } else {
            Err(unsupported(fetcher.as_ref(), uri))
        }
    }

    /// Launcher closure, restricted to the launcher's own artifacts.
    fn launcher_request(&self) -> BundleRequest {
        let entry = &self.config.launcher_entry;
        let mut request = BundleRequest::new([entry.clone()]).restrict_to(entry.clone());
        if !self.class_paths.is_empty() {
            request = request.with_file(CLASSPATH_ENTRY, self.class_paths.join(":").into_bytes());
        }
        request
    }

    fn environment(&self, application_id: &ApplicationId) -> Env {
        Env::new()
            .with(ENV_FS_USER, self.backends.storage.owner())
            .with(ENV_APP_DIR, self.app_location().uri().as_str())
            .with(
                ENV_COORD_CONNECT,
                coordination_namespace(&self.config.coordination_connect, &self.spec.name),
            )
            .with(ENV_RUN_ID, self.run_id.as_str())
            .with(ENV_RESERVED_MEMORY_MB, self.config.reserved_memory_mb.to_string())
            .with(ENV_APP_NAME, self.spec.name.as_str())
            .with(ENV_APP_ID, application_id.as_str())
    }

    /// `<runtime> --tmpdir=tmp --app-id=.. --app-name=.. --path launcher.tar:$CONF
    /// --max-memory=<heap>m <options..> <launcher> master.tar <master> false`
    fn descriptor(
        &self,
        application_id: &ApplicationId,
        artifacts: &ArtifactMap,
        credentials: CredentialSet,
    ) -> Result<LaunchDescriptor, LaunchError> {
        let cfg = &self.config;
        LaunchDescriptor::builder()
            .env(self.environment(application_id))
            .resources(artifacts.descriptors().cloned())
            .credentials(credentials)
            .memory_mb(cfg.master_memory_mb)
            .virtual_cores(cfg.master_virtual_cores)
            .arg(cfg.runtime.as_str())
            .arg("--tmpdir=tmp")
            .arg(format!("--app-id=${ENV_APP_ID}"))
            .arg(format!("--app-name=${ENV_APP_NAME}"))
            .arg("--path")
            .artifact_with_suffix(ArtifactKey::LauncherPackage, format!(":${ENV_CONF_DIR}"))
            .arg(format!("--max-memory={}m", cfg.master_heap_mb()))
            .args(cfg.runtime_options.iter().map(|o| o.trim()).filter(|o| !o.is_empty()))
            .arg(cfg.launcher_entry.as_str())
            .artifact(ArtifactKey::MasterPackage)
            .arg(cfg.master_entry.as_str())
            .arg("false")
            .stdout(STDOUT)
            .stderr(STDERR)
            .build()
    }
}
