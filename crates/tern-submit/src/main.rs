use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use tern_core::{
    bundle::DependencyGraph,
    credentials::Identity,
    launch::ProcessStatus,
    preparer::{Backends, Preparer},
};
use tern_local::{LocalCluster, LocalFetcher, LocalStorage};
use tern_model::{CredentialSet, RunId};
use tern_observe::{LoggerLevel, init_local_offset, init_logger};

mod config;
use config::SubmitConfig;

/// Stage an application and launch its master on this host.
#[derive(Debug, Parser)]
#[command(name = "tern-submit", version)]
struct Cli {
    /// Submission file (JSON).
    #[arg(short, long, default_value = "submit.json")]
    config: PathBuf,

    /// Override the configured log filter, e.g. `tern_core=debug,info`.
    #[arg(long)]
    log: Option<LoggerLevel>,

    /// Reuse a run id instead of minting one.
    #[arg(long)]
    run_id: Option<String>,

    /// Wait for the master and exit with its status.
    #[arg(long)]
    wait: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Local offset detection needs a single-threaded process.
    init_local_offset();

    let mut cfg = SubmitConfig::load(&cli.config)?;
    if let Some(level) = cli.log.clone() {
        cfg.logger = cfg.logger.with_level(level);
    }
    init_logger(&cfg.logger)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(submit(cli, cfg))
}

async fn submit(cli: Cli, cfg: SubmitConfig) -> anyhow::Result<ExitCode> {
    let user = cfg.user();
    let identity = match &cfg.credentials {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading credentials {}", path.display()))?;
            Identity::secure(&user, CredentialSet::from_bytes(&bytes)?)
        }
        None => Identity::insecure(&user),
    };

    let graph_bytes = std::fs::read(&cfg.graph)
        .with_context(|| format!("reading graph {}", cfg.graph.display()))?;
    let graph = DependencyGraph::from_json(&graph_bytes, cfg.graph.parent())?;
    info!(nodes = graph.len(), "dependency graph loaded");

    // Relative resource paths are relative to the submission file.
    let base = cli.config.parent().unwrap_or(Path::new(".")).to_path_buf();
    let storage = Arc::new(LocalStorage::new(&cfg.storage_root, &user));
    let backends = Backends {
        storage: storage.clone(),
        fetcher: Arc::new(LocalFetcher::new().with_base(base)),
        cluster: Arc::new(LocalCluster::new(cfg.cluster.clone(), storage)),
        graph: Arc::new(graph),
    };

    let spec = cfg.application.clone().context("no application to submit")?;
    let mut preparer = Preparer::new(spec, cfg.preparer.clone(), backends, identity)
        .with_application_arguments(cfg.arguments.clone())
        .with_dependencies(cfg.dependencies.clone())
        .with_resources(cfg.resources.clone())
        .with_class_paths(cfg.class_paths.clone());
    for (unit, args) in &cfg.unit_arguments {
        preparer = preparer.with_arguments(unit, args.clone());
    }
    if let Some(id) = cli.run_id {
        preparer = preparer.with_run_id(RunId::from_string(id));
    }

    let submission = preparer.start().await?;
    for warning in &submission.warnings {
        warn!(%warning, "credential propagation degraded");
    }
    info!(
        application_id = %submission.application_id,
        run_id = %submission.run_id,
        artifacts = submission.artifacts.len(),
        "application submitted"
    );

    if !cli.wait {
        return Ok(ExitCode::SUCCESS);
    }
    let status = submission.controller.wait().await?;
    info!(application_id = %submission.application_id, %status, "master finished");
    Ok(match status {
        ProcessStatus::Exited { code: Some(0) } => ExitCode::SUCCESS,
        ProcessStatus::Exited { code: Some(c) } => ExitCode::from(c.clamp(1, 255) as u8),
        _ => ExitCode::FAILURE,
    })
}
