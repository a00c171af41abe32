//! PostgreSQL treatment record store
//!
//! This module provides the store the worker writes one row per treated
//! patient into.

pub mod client;
pub mod models;

pub use client::PostgresStore;
