//! Validate config command implementation
//!
//! This module implements the `validate-config` command. Loading already
//! validates, so by the time this runs the configuration is known good and
//! only the summary remains to be printed.

use crate::config::{redact_url, WorkerConfig};
use crate::console;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config: &WorkerConfig) -> anyhow::Result<i32> {
        tracing::info!("Validating configuration");

        if let Err(e) = config.validate() {
            console!("❌ Configuration validation failed");
            console!("   Error: {e}");
            return Ok(2);
        }

        console!("✅ Configuration is valid");
        console!();
        for line in summary_lines(config) {
            console!("{line}");
        }
        console!();
        Ok(0)
    }
}

/// Human-readable configuration summary with credentials redacted
pub fn summary_lines(config: &WorkerConfig) -> Vec<String> {
    let block = match config.redis.block_timeout_seconds {
        0 => "forever".to_string(),
        seconds => format!("{seconds}s"),
    };
    let file_logging = if config.logging.local_enabled {
        format!(
            "{} ({})",
            config.logging.local_path, config.logging.local_rotation
        )
    } else {
        "disabled".to_string()
    };

    vec![
        "Configuration Summary:".to_string(),
        format!("  Log Level: {}", config.application.log_level),
        format!("  Redis: {}", config.redis.url),
        format!("  Queue: {}", config.redis.queue_name),
        format!("  Dequeue Wait: {block}"),
        format!(
            "  PostgreSQL: {}",
            redact_url(config.postgresql.connection_string.expose_secret().as_str())
        ),
        format!(
            "  Treatment Time: {}s",
            config.treatment.treatment_time_seconds
        ),
        format!(
            "  Connection Retry: {} attempts, {}s apart",
            config.retry.max_attempts, config.retry.delay_seconds
        ),
        format!("  File Logging: {file_logging}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_summary_redacts_password() {
        let mut config = WorkerConfig::default();
        config.postgresql.connection_string =
            secret_string("postgresql://admin:s3cret@db:5432/mediqueue");

        let summary = summary_lines(&config).join("\n");
        assert!(!summary.contains("s3cret"));
        assert!(summary.contains("Queue: waiting_room"));
        assert!(summary.contains("Dequeue Wait: forever"));
    }

    #[tokio::test]
    async fn test_validate_rejects_invalid_config() {
        let mut config = WorkerConfig::default();
        config.redis.queue_name = "  ".to_string();

        let code = ValidateArgs {}.execute(&config).await.unwrap();
        assert_eq!(code, 2);
    }
}
