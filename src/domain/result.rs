//! Result type alias for the doctor worker

use super::errors::WorkerError;

/// Result type alias for worker operations
///
/// # Examples
///
/// ```
/// use doctor_worker::domain::result::Result;
/// use doctor_worker::domain::errors::WorkerError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(WorkerError::Configuration("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, WorkerError>;
