//! Well-known keys shared between the submitting side and the master.
//!
//! The master discovers its staging context exclusively through these
//! environment variables, so both sides must agree on the exact names.

/// Name of the identity that owns the staging namespace.
pub const ENV_FS_USER: &str = "TERN_FS_USER";

/// URI of the staging namespace root (`/<app>/<run>`).
pub const ENV_APP_DIR: &str = "TERN_APP_DIR";

/// Coordination-service connection string, already namespaced by application.
pub const ENV_COORD_CONNECT: &str = "TERN_COORD_CONNECT";

/// Run identifier of the submission attempt.
pub const ENV_RUN_ID: &str = "TERN_RUN_ID";

/// Memory (MB) the master must reserve when sizing worker processes.
pub const ENV_RESERVED_MEMORY_MB: &str = "TERN_RESERVED_MEMORY_MB";

/// Application name.
pub const ENV_APP_NAME: &str = "TERN_APP_NAME";

/// Application id allocated by the cluster resource manager.
pub const ENV_APP_ID: &str = "TERN_APP_ID";

/// Directory with cluster client configuration on the node running the master.
///
/// Provided by the node, never set by the submitter.
pub const ENV_CONF_DIR: &str = "TERN_CONF_DIR";

/// Entry point of the event handler used when the application declares none.
pub const LOG_ONLY_EVENT_HANDLER: &str = "tern.event.log-only";
