// Doctor Worker - MediQueue patient treatment worker
// Copyright (c) 2025 MediQueue Contributors
// Licensed under the MIT License

//! # Doctor Worker
//!
//! A single-consumer worker that drains the Redis `waiting_room` list and
//! records one treatment per successfully processed patient in PostgreSQL.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Worker loop, treatment processing, session summary
//! - [`adapters`] - Redis queue, PostgreSQL store, connection retry
//! - [`domain`] - Admission events, treatment records, error taxonomy
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doctor_worker::config::load_config;
//! use doctor_worker::core::Worker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config(None)?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let worker = Worker::connect(&config, &shutdown_rx).await?;
//!     let summary = worker.run(shutdown_rx).await?;
//!
//!     println!("Treated {} patients", summary.patients_treated);
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery
//!
//! Items are popped with `BRPOP` and are gone from the queue once popped.
//! A payload that cannot be decoded or saved is logged and dropped; there is
//! no re-enqueue. Each successful item produces exactly one committed row.
//!
//! ## Error Handling
//!
//! [`domain::WorkerError`] wraps the three error families:
//!
//! - [`domain::ConnectionError`] - fatal at startup
//! - [`domain::DecodeError`] - the item is rejected, the loop continues
//! - [`domain::PersistenceError`] - the transaction is rolled back, the loop continues

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
