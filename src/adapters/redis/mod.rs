//! Redis waiting-room queue
//!
//! Patients are pushed on the left of a Redis list by the producer and popped
//! from the right here, so the list behaves as a FIFO queue.

pub mod client;

pub use client::{RedisAddress, RedisQueue};
