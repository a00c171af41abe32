//! Queue and store abstraction traits
//!
//! The worker loop and the treatment processor only talk to these traits, so
//! they run unchanged against Redis/PostgreSQL or against in-memory fakes.

use crate::domain::errors::{ConnectionError, PersistenceError};
use crate::domain::ids::RecordId;
use crate::domain::treatment::NewTreatmentRecord;
use async_trait::async_trait;
use std::time::Duration;

/// How long a dequeue waits for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Wait until an item arrives
    Forever,
    /// Give up after the duration and return `None`
    Timeout(Duration),
}

impl BlockMode {
    /// `0` means block forever, anything else is a timeout in seconds
    pub fn from_seconds(seconds: u64) -> Self {
        if seconds == 0 {
            BlockMode::Forever
        } else {
            BlockMode::Timeout(Duration::from_secs(seconds))
        }
    }

    /// Timeout argument for `BRPOP` (whole seconds, 0 = forever)
    pub fn as_brpop_timeout(&self) -> u64 {
        match self {
            BlockMode::Forever => 0,
            BlockMode::Timeout(d) => d.as_secs().max(1),
        }
    }
}

/// One item popped from the waiting room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    /// Queue the item came from
    pub queue: String,

    /// Raw payload as stored by the producer
    pub payload: String,
}

/// Blocking FIFO queue of admission payloads
#[async_trait]
pub trait PatientQueue: Send {
    /// Pop the oldest item from `queue_name`
    ///
    /// Returns `Ok(None)` only when `block` is a timeout and it expired.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if the queue server cannot be reached.
    async fn dequeue(
        &mut self,
        queue_name: &str,
        block: BlockMode,
    ) -> Result<Option<Dequeued>, ConnectionError>;

    /// Release the connection; later calls fail with [`ConnectionError::Closed`]
    async fn close(&mut self);
}

/// Relational store for treatment records
///
/// Transactions are explicit: callers pair [`begin`](TreatmentStore::begin)
/// with exactly one of [`commit`](TreatmentStore::commit) or
/// [`rollback`](TreatmentStore::rollback).
#[async_trait]
pub trait TreatmentStore: Send {
    /// Create the `medical_records` table if it does not exist
    ///
    /// Committed immediately and safe to call on every startup.
    async fn bootstrap_schema(&mut self) -> Result<(), PersistenceError>;

    /// Open a transaction
    async fn begin(&mut self) -> Result<(), PersistenceError>;

    /// Insert one record inside the open transaction
    async fn insert_record(
        &mut self,
        record: &NewTreatmentRecord,
    ) -> Result<RecordId, PersistenceError>;

    /// Commit the open transaction
    async fn commit(&mut self) -> Result<(), PersistenceError>;

    /// Roll back the open transaction
    async fn rollback(&mut self) -> Result<(), PersistenceError>;

    /// Number of committed treatment records
    async fn count_records(&mut self) -> Result<i64, PersistenceError>;

    /// Release the connection
    async fn close(&mut self);
}
