//! Core business logic for the doctor worker.
//!
//! # Modules
//!
//! - [`treatment`] - Per-patient processing: decode, treat, persist
//! - [`worker`] - The consumer loop that owns both connections
//! - [`summary`] - Session counters reported at shutdown
//!
//! # Worker Workflow
//!
//! 1. **Connect**: Redis, then PostgreSQL, each with fixed-delay retry
//! 2. **Bootstrap**: Create `medical_records` if it does not exist
//! 3. **Dequeue**: Block on `BRPOP waiting_room`
//! 4. **Treat**: Decode, announce, wait out the treatment time
//! 5. **Persist**: Insert one record in its own transaction
//! 6. **Report**: Close both handles and log the session summary
//!
//! # Example
//!
//! ```rust,no_run
//! use doctor_worker::config::load_config;
//! use doctor_worker::core::worker::Worker;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let worker = Worker::connect(&config, &shutdown_rx).await?;
//! let summary = worker.run(shutdown_rx).await?;
//!
//! println!("Patients treated: {}", summary.patients_treated);
//! # Ok(())
//! # }
//! ```

pub mod summary;
pub mod treatment;
pub mod worker;

pub use summary::SessionSummary;
pub use treatment::{Outcome, TreatmentError, TreatmentProcessor, TreatmentState};
pub use worker::{Worker, WorkerSettings};
