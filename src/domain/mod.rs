//! Domain models and types for the doctor worker.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`PatientId`], [`RecordId`])
//! - **Admission events** decoded from the waiting room ([`AdmissionEvent`])
//! - **Treatment records** written to the store ([`NewTreatmentRecord`], [`TreatmentRecord`])
//! - **Error types** ([`WorkerError`], [`ConnectionError`], [`DecodeError`], [`PersistenceError`])
//! - **Result type alias** ([`Result`])
//!
//! # Decoding
//!
//! ```rust
//! use doctor_worker::domain::AdmissionEvent;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let event = AdmissionEvent::decode(
//!     r#"{"id":"p1","name":"Jane Doe","condition":"flu","admittedAt":"2024-01-01T10:00:00Z"}"#,
//! )?;
//! assert_eq!(event.name, "Jane Doe");
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod patient;
pub mod result;
pub mod treatment;

// Re-export commonly used types for convenience
pub use errors::{ConnectionError, DecodeError, PersistenceError, WorkerError};
pub use ids::{PatientId, RecordId};
pub use patient::{parse_admission_timestamp, AdmissionEvent};
pub use result::Result;
pub use treatment::{NewTreatmentRecord, TreatmentRecord};
