//! Logging setup shared by reticle binaries.
mod config;
pub use config::LoggerConfig;

mod error;
pub use error::{LoggerError, LoggerResult};

mod format;
pub use format::LoggerFormat;

mod level;
pub use level::LoggerLevel;

mod timer;
pub use timer::{LoggerRfc3339, LoggerTimeZone, init_local_offset};

mod install;

/// Installs the global tracing subscriber described by `cfg`.
///
/// With [`LoggerTimeZone::Local`], call [`init_local_offset`] from `main()` before the
/// tokio runtime starts; offset detection is unreliable once threads exist.
///
/// ```rust
/// use reticle_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// init_logger(&config).expect("logger");
/// tracing::info!("logger initialized");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => install::text(cfg),
        LoggerFormat::Json => install::json(cfg),
        LoggerFormat::Journald => install::journald(cfg),
    }
}
