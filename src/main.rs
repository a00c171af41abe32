// Doctor Worker - MediQueue patient treatment worker
// Copyright (c) 2025 MediQueue Contributors
// Licensed under the MIT License

use clap::Parser;
use doctor_worker::cli::commands::run::RunArgs;
use doctor_worker::cli::{Cli, Commands};
use doctor_worker::config::{load_config, LoggingConfig, WorkerConfig};
use doctor_worker::console;
use doctor_worker::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let mut cli = Cli::parse();
    let command = cli
        .command
        .take()
        .unwrap_or_else(|| Commands::Run(RunArgs::default()));

    // init writes the config file, so it must not require one
    if let Commands::Init(args) = &command {
        let level = cli.log_level.as_deref().unwrap_or("info");
        let guard = match init_logging(level, &LoggingConfig::default()) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Failed to initialize logging: {e}");
                process::exit(5);
            }
        };
        let exit_code = match args.execute().await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {e}");
                5
            }
        };
        drop(guard);
        process::exit(exit_code);
    }

    let config = match load_config(cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration");
            eprintln!("   Error: {e}");
            process::exit(e.exit_code());
        }
    };

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.application.log_level.clone());
    let logging_guard = match init_logging(&log_level, &config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(e.exit_code());
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Doctor Worker - MediQueue patient treatment worker"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx);

    let exit_code = match execute_command(command, config, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    // flush file logs before exiting
    drop(logging_guard);
    process::exit(exit_code);
}

/// Translate SIGINT/SIGTERM into the shutdown channel
fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler, Ctrl+C only");
                    if tokio::signal::ctrl_c().await.is_ok() {
                        notify_shutdown(&shutdown_tx, "SIGINT");
                    }
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => notify_shutdown(&shutdown_tx, "SIGINT"),
                _ = sigterm.recv() => notify_shutdown(&shutdown_tx, "SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                notify_shutdown(&shutdown_tx, "SIGINT");
            }
        }
    });
}

fn notify_shutdown(shutdown_tx: &watch::Sender<bool>, signal: &str) {
    tracing::info!(signal, "Shutdown signal received, finishing current patient");
    console!("\n⚠️  Shutdown signal received, finishing current patient...");
    let _ = shutdown_tx.send(true);
}

async fn execute_command(
    command: Commands,
    config: WorkerConfig,
    shutdown_signal: watch::Receiver<bool>,
) -> anyhow::Result<i32> {
    match command {
        Commands::Run(args) => args.execute(config, shutdown_signal).await,
        Commands::ValidateConfig(args) => args.execute(&config).await,
        Commands::Status(args) => args.execute(&config).await,
        Commands::Init(args) => args.execute().await,
    }
}
