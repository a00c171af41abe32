//! Session summary and reporting

use super::treatment::{Outcome, TreatmentState};
use std::time::Duration;

/// Counters for one worker session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Items popped from the queue
    pub dequeued: usize,

    /// Items that ended `Persisted`
    pub patients_treated: usize,

    /// Items whose payload did not decode
    pub rejected: usize,

    /// Items that decoded but could not be saved
    pub failed: usize,

    /// The loop stopped on a shutdown signal
    pub interrupted: bool,

    /// Wall-clock time between loop start and shutdown
    pub duration: Duration,
}

impl SessionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one processed item
    pub fn record(&mut self, outcome: &Outcome) {
        self.dequeued += 1;
        match outcome.terminal_state() {
            TreatmentState::Persisted => self.patients_treated += 1,
            TreatmentState::Rejected => self.rejected += 1,
            _ => self.failed += 1,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Items that did not produce a record
    pub fn unsuccessful(&self) -> usize {
        self.rejected + self.failed
    }

    pub fn log_summary(&self) {
        tracing::info!(
            patients_treated = self.patients_treated,
            dequeued = self.dequeued,
            rejected = self.rejected,
            failed = self.failed,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            "Doctor session ended"
        );
    }
}
