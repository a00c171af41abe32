//! Run command implementation
//!
//! This module implements the `run` command, the long-running worker loop.

use crate::config::{redact_url, WorkerConfig};
use crate::console;
use crate::core::summary::SessionSummary;
use crate::core::worker::Worker;
use crate::domain::errors::ConnectionError;
use clap::Args;
use secrecy::ExposeSecret;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Override treatment time in seconds
    #[arg(long, value_name = "SECONDS")]
    pub treatment_time: Option<u64>,

    /// Override the waiting room queue name
    #[arg(long)]
    pub queue: Option<String>,

    /// Poll with this BRPOP timeout instead of blocking forever
    #[arg(long, value_name = "SECONDS")]
    pub block_timeout: Option<u64>,
}

impl RunArgs {
    /// Apply CLI overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut WorkerConfig) {
        if let Some(seconds) = self.treatment_time {
            config.treatment.treatment_time_seconds = seconds;
        }
        if let Some(ref queue) = self.queue {
            config.redis.queue_name = queue.clone();
        }
        if let Some(seconds) = self.block_timeout {
            config.redis.block_timeout_seconds = seconds;
        }
    }

    /// Execute the run command
    pub async fn execute(
        &self,
        mut config: WorkerConfig,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            console!("❌ Invalid configuration: {e}");
            return Ok(2);
        }

        console!();
        console!("{}", "=".repeat(50));
        console!("  Doctor Worker Starting");
        console!("{}", "=".repeat(50));
        console!();

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            redis = %config.redis.url,
            postgresql = %redact_url(config.postgresql.connection_string.expose_secret().as_str()),
            "Starting doctor worker"
        );

        let worker = match Worker::connect(&config, &shutdown_signal).await {
            Ok(worker) => worker,
            Err(e @ ConnectionError::Interrupted { .. }) => {
                tracing::info!(error = %e, "Shutdown before startup completed");
                console!("Interrupted before connecting. Goodbye!");
                return Ok(0);
            }
            Err(e) => {
                tracing::error!(error = %e, "Startup connection failed");
                console!("❌ {e}");
                return Ok(4);
            }
        };

        console!(
            "⏳ Waiting for patients in '{}' queue...",
            worker.settings().queue_name
        );
        console!(
            "   Treatment time: {} seconds per patient",
            worker.settings().treatment_time.as_secs()
        );

        match worker.with_console_output(true).run(shutdown_signal).await {
            Ok(summary) => {
                print_summary(&summary);
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Doctor worker stopped");
                console!();
                console!("❌ {e}");
                console!("Connections closed.");
                Ok(e.exit_code())
            }
        }
    }
}

fn print_summary(summary: &SessionSummary) {
    console!();
    console!("{}", "=".repeat(50));
    console!("👋 Shutting down doctor worker...");
    console!(
        "   Total patients treated this session: {}",
        summary.patients_treated
    );
    if summary.unsuccessful() > 0 {
        console!(
            "   Not treated: {} ({} rejected, {} failed to save)",
            summary.unsuccessful(),
            summary.rejected,
            summary.failed
        );
    }
    console!("   Session duration: {}s", summary.duration.as_secs());
    console!("Connections closed. Goodbye!");
    console!("{}", "=".repeat(50));
}
