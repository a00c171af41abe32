//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Human-readable console output
//! - Configurable log levels (`--log-level`, `application.log_level`, `RUST_LOG`)
//! - Optional JSON file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use doctor_worker::logging::init_logging;
//! use doctor_worker::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(queue = "waiting_room", "Waiting for patients");
//! ```

pub mod console;
pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Print a line to stdout without panicking when stdout is gone
///
/// Takes the same arguments as `println!`.
///
/// # Example
///
/// ```no_run
/// use doctor_worker::console;
///
/// console!("⏳ Waiting for patients in '{}' queue...", "waiting_room");
/// console!();
/// ```
#[macro_export]
macro_rules! console {
    () => {
        $crate::logging::console::write_line(&mut ::std::io::stdout().lock(), format_args!(""))
    };
    ($($arg:tt)*) => {
        $crate::logging::console::write_line(
            &mut ::std::io::stdout().lock(),
            format_args!($($arg)*),
        )
    };
}

/// Log a failed connection attempt that will be retried
///
/// # Example
///
/// ```no_run
/// use doctor_worker::log_retry_attempt;
///
/// log_retry_attempt!("Redis", 2, 10, "Connection refused");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($service:expr, $attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            service = $service,
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "{} connection attempt {}/{} failed",
            $service,
            $attempt,
            $max_attempts
        );
    };
}

/// Log the terminal state of one dequeued patient
///
/// # Example
///
/// ```no_run
/// use doctor_worker::log_treatment_outcome;
///
/// log_treatment_outcome!("p1", "Jane Doe", "persisted");
/// ```
#[macro_export]
macro_rules! log_treatment_outcome {
    ($patient_id:expr, $patient_name:expr, $state:expr) => {
        tracing::info!(
            patient_id = %$patient_id,
            patient_name = %$patient_name,
            state = %$state,
            "Treatment finished"
        );
    };
    ($patient_id:expr, $patient_name:expr, $state:expr, $error:expr) => {
        tracing::error!(
            patient_id = %$patient_id,
            patient_name = %$patient_name,
            state = %$state,
            error = %$error,
            "Treatment failed"
        );
    };
}
