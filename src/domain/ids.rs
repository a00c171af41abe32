//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Patient identifier newtype wrapper
///
/// Opaque identifier assigned by the producer when the patient is admitted.
/// Usually a UUID, but any non-blank string is accepted; the store column
/// length is enforced by the database, not here.
///
/// # Examples
///
/// ```
/// use doctor_worker::domain::ids::PatientId;
/// use std::str::FromStr;
///
/// let id = PatientId::from_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
/// assert_eq!(id.as_str(), "7d44b88c-4199-4bad-97dc-d78268e01398");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientId(String);

impl PatientId {
    /// Creates a new PatientId, rejecting blank identifiers
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Patient ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the patient ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Store-assigned surrogate key of a treatment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i32);

impl RecordId {
    /// Returns the raw key
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
