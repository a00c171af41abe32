//! Per-patient treatment processing
//!
//! Each dequeued payload walks a small state machine:
//!
//! ```text
//! Received -> Decoding -> Decoded  -> Processing -> Persisted
//!                      \-> Rejected              \-> PersistFailed
//! ```
//!
//! Only `Persisted` counts as a success. Failures are final for that item;
//! nothing is retried or re-enqueued.

use crate::adapters::traits::TreatmentStore;
use crate::domain::errors::{DecodeError, PersistenceError};
use crate::domain::ids::{PatientId, RecordId};
use crate::domain::patient::AdmissionEvent;
use crate::domain::treatment::NewTreatmentRecord;
use crate::console;
use crate::log_treatment_outcome;
use std::fmt;
use std::time::Duration;

/// Where a single item is in its processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreatmentState {
    Received,
    Decoding,
    Decoded,
    Rejected,
    Processing,
    Persisted,
    PersistFailed,
}

impl fmt::Display for TreatmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreatmentState::Received => "received",
            TreatmentState::Decoding => "decoding",
            TreatmentState::Decoded => "decoded",
            TreatmentState::Rejected => "rejected",
            TreatmentState::Processing => "processing",
            TreatmentState::Persisted => "persisted",
            TreatmentState::PersistFailed => "persist_failed",
        };
        f.write_str(name)
    }
}

/// Why an item did not reach `Persisted`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreatmentError {
    #[error("Invalid patient payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to save medical record: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result of processing one dequeued payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        record_id: RecordId,
        patient_id: PatientId,
    },
    Failure {
        state: TreatmentState,
        error: TreatmentError,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Terminal state the item ended in
    pub fn terminal_state(&self) -> TreatmentState {
        match self {
            Outcome::Success { .. } => TreatmentState::Persisted,
            Outcome::Failure { state, .. } => *state,
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Outcome::Success { record_id, .. } => Some(*record_id),
            Outcome::Failure { .. } => None,
        }
    }
}

/// Turns one raw payload into at most one committed treatment record
#[derive(Debug, Clone)]
pub struct TreatmentProcessor {
    treatment_time: Duration,
    console_output: bool,
}

impl TreatmentProcessor {
    pub fn new(treatment_time: Duration) -> Self {
        Self {
            treatment_time,
            console_output: false,
        }
    }

    /// Also print the "now treating" block to stdout
    pub fn with_console_output(mut self, enabled: bool) -> Self {
        self.console_output = enabled;
        self
    }

    pub fn treatment_time(&self) -> Duration {
        self.treatment_time
    }

    /// Process one payload against `store`
    ///
    /// A payload that does not decode never opens a transaction. Once the
    /// transaction is open, any timestamp or insert failure rolls it back.
    pub async fn process<S>(&self, raw: &str, store: &mut S) -> Outcome
    where
        S: TreatmentStore + ?Sized,
    {
        tracing::debug!(state = %TreatmentState::Received, bytes = raw.len(), "Payload received");

        let event = match AdmissionEvent::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    state = %TreatmentState::Rejected,
                    error = %e,
                    payload = %raw,
                    "Invalid patient data"
                );
                return Outcome::Failure {
                    state: TreatmentState::Rejected,
                    error: e.into(),
                };
            }
        };

        tracing::debug!(state = %TreatmentState::Decoded, patient_id = %event.id, "Payload decoded");
        self.announce(&event);

        tracing::debug!(
            state = %TreatmentState::Processing,
            treatment_secs = self.treatment_time.as_secs_f64(),
            "Treating patient"
        );
        tokio::time::sleep(self.treatment_time).await;

        match persist(&event, store).await {
            Ok(record_id) => {
                log_treatment_outcome!(event.id, event.name, TreatmentState::Persisted);
                tracing::info!(record_id = %record_id, "Medical record saved");
                if self.console_output {
                    console!("  ✓ {} treated, medical record #{record_id} saved", event.name);
                }
                Outcome::Success {
                    record_id,
                    patient_id: event.id,
                }
            }
            Err(e) => {
                log_treatment_outcome!(event.id, event.name, TreatmentState::PersistFailed, e);
                if self.console_output {
                    console!("  ✗ Failed to save record for {}: {e}", event.name);
                }
                Outcome::Failure {
                    state: TreatmentState::PersistFailed,
                    error: e.into(),
                }
            }
        }
    }

    fn announce(&self, event: &AdmissionEvent) {
        tracing::info!(
            patient_id = %event.id,
            patient_name = %event.name,
            condition = %event.condition,
            admitted_at = %event.admitted_at,
            "Now treating {}",
            event.name
        );

        if self.console_output {
            console!(
                "\n🩺 Now treating: {}\n   ID:        {}\n   Condition: {}\n   Admitted:  {}",
                event.name,
                event.id,
                event.condition,
                event.admitted_at
            );
        }
    }
}

/// Insert the record in its own transaction, rolling back on any failure
async fn persist<S>(event: &AdmissionEvent, store: &mut S) -> Result<RecordId, PersistenceError>
where
    S: TreatmentStore + ?Sized,
{
    store.begin().await?;

    let inserted = match NewTreatmentRecord::from_event(event) {
        Ok(record) => store.insert_record(&record).await,
        Err(e) => Err(e),
    };

    let result = match inserted {
        Ok(record_id) => store.commit().await.map(|()| record_id),
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        if let Err(rollback_error) = store.rollback().await {
            tracing::warn!(
                error = %rollback_error,
                cause = %e,
                "Rollback after failed insert did not succeed"
            );
        }
    }

    result
}
