//! Process-wide logging for the tern tools.
//!
//! The submitter installs a subscriber from a [`LoggerConfig`]; launched
//! processes receive the same configuration as a staged JSON document.

mod config;
mod error;
mod log;
mod object;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerRfc3339, LoggerTimeZone, init_local_offset};

/// Install the global tracing subscriber.
///
/// With [`LoggerTimeZone::Local`], call [`init_local_offset`] from `main()`
/// before any threads are spawned.
///
/// ```rust,no_run
/// use tern_observe::{LoggerConfig, init_logger};
///
/// init_logger(&LoggerConfig::default()).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => log::logger_text(cfg),
        LoggerFormat::Json => log::logger_json(cfg),
        LoggerFormat::Journald => log::logger_journald(cfg),
    }
}
