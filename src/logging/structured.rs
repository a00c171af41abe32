//! Console and rolling-file subscribers for the worker
//!
//! Console output is always on. When `logging.local_enabled` is set, the same
//! events are also written as JSON lines to a rolling file.

use crate::config::LoggingConfig;
use crate::domain::{Result, WorkerError};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Name of the rolling log file inside `logging.local_path`
const LOG_FILE_PREFIX: &str = "doctor-worker.log";

const LEVELS: [(&str, Level); 5] = [
    ("trace", Level::TRACE),
    ("debug", Level::DEBUG),
    ("info", Level::INFO),
    ("warn", Level::WARN),
    ("error", Level::ERROR),
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the background file writer alive; dropping it flushes pending lines
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// `RUST_LOG`, when set, takes precedence over `log_level`.
///
/// # Errors
///
/// Returns [`WorkerError::Configuration`] for an unknown level or an
/// uncreatable log directory.
pub fn init_logging(log_level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = level_named(log_level)?;
    let filter = env_filter(level);

    let mut layers: Vec<BoxedLayer> = vec![tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter.clone())
        .boxed()];

    let mut file_guard = None;
    if config.local_enabled {
        let (writer, guard) = open_log_file(config)?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_thread_names(true)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        );
        file_guard = Some(guard);
    }

    tracing_subscriber::registry().with(layers).init();

    tracing::debug!(
        %level,
        file = config.local_enabled,
        path = %config.local_path,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("doctor_worker={level}")))
}

fn open_log_file(config: &LoggingConfig) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        WorkerError::Configuration(format!(
            "Cannot create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation_for(&config.local_rotation),
        &config.local_path,
        LOG_FILE_PREFIX,
    );
    Ok(tracing_appender::non_blocking(appender))
}

fn rotation_for(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn level_named(name: &str) -> Result<Level> {
    let wanted = name.to_ascii_lowercase();
    LEVELS
        .iter()
        .find(|(label, _)| *label == wanted)
        .map(|(_, level)| *level)
        .ok_or_else(|| {
            WorkerError::Configuration(format!(
                "Invalid log level '{name}'. Must be one of: trace, debug, info, warn, error"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_named_ignores_case() {
        for (label, level) in LEVELS {
            assert_eq!(level_named(label).unwrap(), level);
            assert_eq!(level_named(&label.to_uppercase()).unwrap(), level);
        }
    }

    #[test]
    fn test_unknown_level_names_the_input() {
        let error = level_named("verbose").unwrap_err();
        assert!(error.to_string().contains("'verbose'"));
        assert!(level_named("").is_err());
    }

    #[test]
    fn test_rotation_falls_back_to_daily() {
        assert_eq!(rotation_for("hourly"), Rotation::HOURLY);
        assert_eq!(rotation_for("never"), Rotation::NEVER);
        assert_eq!(rotation_for("weekly"), Rotation::DAILY);
    }
}
