//! Domain error types
//!
//! This module defines the error hierarchy for the doctor worker.
//! The taxonomy is closed: connection failures, payload decode failures and
//! persistence failures are distinct kinds, and third-party client error types
//! never cross the adapter boundary.

use thiserror::Error;

/// Main worker error type
///
/// This is the primary error type used throughout the application.
/// Only [`WorkerError::Connection`] at startup is treated as fatal by the
/// worker loop; decode and persistence errors are contained per item.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Queue or store could not be reached
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Queue payload could not be decoded into an admission event
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Treatment record could not be written
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Connection errors for the queue and the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// All connection attempts were used up
    #[error("Failed to connect to {service} after {attempts} attempts: {message}")]
    Exhausted {
        service: String,
        attempts: u32,
        message: String,
    },

    /// An established connection stopped working
    #[error("Lost connection to {service}: {message}")]
    Lost { service: String, message: String },

    /// The configured address cannot be used to connect
    #[error("Invalid address for {service}: {message}")]
    InvalidAddress { service: String, message: String },

    /// Shutdown was requested before a connection was established;
    /// `attempts` counts the attempts started
    #[error("Connecting to {service} interrupted by shutdown after {attempts} attempt(s)")]
    Interrupted { service: String, attempts: u32 },

    /// The handle was already closed
    #[error("Connection to {0} is closed")]
    Closed(String),
}

/// Errors raised while decoding a queue payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload is not a JSON object
    #[error("Malformed patient payload: {0}")]
    Malformed(String),

    /// A required key is absent
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// A required key is present but unusable
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors raised while persisting a treatment record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// `admittedAt` is not an ISO-8601 timestamp
    #[error("Invalid admission timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Schema bootstrap failed
    #[error("Failed to initialize schema: {0}")]
    Schema(String),

    /// Insert statement failed
    #[error("Failed to insert treatment record: {0}")]
    InsertFailed(String),

    /// BEGIN, COMMIT or ROLLBACK failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Read query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The store handle was already closed
    #[error("Store connection is closed")]
    Closed,
}

impl WorkerError {
    /// Process exit code for this error
    ///
    /// 2 for configuration problems, 4 for connection failures, 5 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Configuration(_) => 2,
            WorkerError::Connection(_) => 4,
            _ => 5,
        }
    }
}
