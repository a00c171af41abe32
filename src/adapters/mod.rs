//! External service adapters
//!
//! - [`redis`] - the waiting-room queue
//! - [`postgresql`] - the treatment record store
//! - [`retry`] - fixed-delay startup connection retry shared by both
//! - [`traits`] - the seams the worker is written against

pub mod postgresql;
pub mod redis;
pub mod retry;
pub mod traits;

pub use postgresql::PostgresStore;
pub use self::redis::{RedisAddress, RedisQueue};
pub use retry::{connect_with_retry, no_shutdown, RetryPolicy};
pub use traits::{BlockMode, Dequeued, PatientQueue, TreatmentStore};
