//! Treatment records
//!
//! A treatment record is the durable row written once per successfully
//! treated patient. It is never updated or deleted by the worker.

use super::errors::PersistenceError;
use super::ids::RecordId;
use super::patient::AdmissionEvent;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Values inserted for a new treatment record
///
/// `id` and `treated_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTreatmentRecord {
    pub patient_id: String,
    pub patient_name: String,
    pub condition: String,
    pub admitted_at: NaiveDateTime,
}

impl NewTreatmentRecord {
    /// Build the insert values from a decoded admission event
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidTimestamp`] if `admittedAt` is not ISO-8601.
    pub fn from_event(event: &AdmissionEvent) -> Result<Self, PersistenceError> {
        Ok(Self {
            patient_id: event.id.as_str().to_string(),
            patient_name: event.name.clone(),
            condition: event.condition.clone(),
            admitted_at: event.admitted_at_timestamp()?,
        })
    }
}

/// A stored treatment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub id: RecordId,
    pub patient_id: String,
    pub patient_name: String,
    pub condition: String,
    pub admitted_at: NaiveDateTime,
    /// Filled by the column default; nullable in the table definition
    pub treated_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_from_event() {
        let event = AdmissionEvent::decode(
            r#"{"id":"p1","name":"Jane Doe","condition":"flu","admittedAt":"2024-01-01T10:00:00Z"}"#,
        )
        .unwrap();

        let record = NewTreatmentRecord::from_event(&event).unwrap();
        assert_eq!(record.patient_id, "p1");
        assert_eq!(record.patient_name, "Jane Doe");
        assert_eq!(record.condition, "flu");
        assert_eq!(
            record.admitted_at,
            "2024-01-01T10:00:00".parse::<NaiveDateTime>().unwrap()
        );
    }

    #[test]
    fn test_new_record_rejects_bad_timestamp() {
        let event = AdmissionEvent::decode(
            r#"{"id":"p1","name":"Jane Doe","condition":"flu","admittedAt":"last tuesday"}"#,
        )
        .unwrap();

        assert!(matches!(
            NewTreatmentRecord::from_event(&event),
            Err(PersistenceError::InvalidTimestamp { .. })
        ));
    }
}
