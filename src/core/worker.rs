//! Worker loop
//!
//! One worker owns one queue connection and one store connection for its
//! whole lifetime and handles items strictly one at a time, in the order the
//! queue delivers them.

use super::summary::SessionSummary;
use super::treatment::TreatmentProcessor;
use crate::adapters::postgresql::PostgresStore;
use crate::adapters::redis::RedisQueue;
use crate::adapters::retry::RetryPolicy;
use crate::adapters::traits::{BlockMode, PatientQueue, TreatmentStore};
use crate::config::WorkerConfig;
use crate::domain::errors::{ConnectionError, WorkerError};
use crate::domain::result::Result;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Loop parameters taken from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub queue_name: String,
    pub block: BlockMode,
    pub treatment_time: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            queue_name: config.redis.queue_name.clone(),
            block: BlockMode::from_seconds(config.redis.block_timeout_seconds),
            treatment_time: config.treatment.treatment_time(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

/// Single-consumer doctor worker
pub struct Worker<Q, S> {
    queue: Q,
    store: S,
    settings: WorkerSettings,
    processor: TreatmentProcessor,
}

impl<Q, S> Worker<Q, S>
where
    Q: PatientQueue,
    S: TreatmentStore,
{
    pub fn new(queue: Q, store: S, settings: WorkerSettings) -> Self {
        let processor = TreatmentProcessor::new(settings.treatment_time);
        Self {
            queue,
            store,
            settings,
            processor,
        }
    }

    /// Print progress blocks to stdout while treating
    pub fn with_console_output(mut self, enabled: bool) -> Self {
        self.processor = self.processor.with_console_output(enabled);
        self
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    ///
    /// The schema is bootstrapped once before the first dequeue. Shutdown is
    /// observed between items and while waiting on the queue, never during
    /// processing. Both handles are closed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Persistence`] if the schema cannot be created
    /// and [`WorkerError::Connection`] if the queue connection is lost.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<SessionSummary> {
        let started = Instant::now();
        let mut summary = SessionSummary::new();

        let result = self.drain(&mut shutdown, &mut summary).await;

        self.queue.close().await;
        self.store.close().await;

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();

        result.map(|()| summary)
    }

    async fn drain(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
        summary: &mut SessionSummary,
    ) -> Result<()> {
        self.store.bootstrap_schema().await?;

        tracing::info!(
            queue = %self.settings.queue_name,
            treatment_secs = self.settings.treatment_time.as_secs(),
            "Waiting for patients"
        );

        loop {
            if *shutdown.borrow_and_update() {
                summary.interrupted = true;
                return Ok(());
            }

            // one BRPOP per iteration; a spurious wake-up keeps awaiting it
            let dequeued = {
                let dequeue = self.queue.dequeue(&self.settings.queue_name, self.settings.block);
                tokio::pin!(dequeue);

                loop {
                    tokio::select! {
                        biased;

                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                tracing::debug!("Shutdown sender dropped");
                                summary.interrupted = true;
                                return Ok(());
                            }
                            if *shutdown.borrow_and_update() {
                                summary.interrupted = true;
                                return Ok(());
                            }
                        }
                        item = &mut dequeue => break item,
                    }
                }
            };

            match dequeued {
                Ok(Some(item)) => {
                    let outcome = self.processor.process(&item.payload, &mut self.store).await;
                    summary.record(&outcome);
                }
                Ok(None) => {
                    tracing::trace!(queue = %self.settings.queue_name, "Waiting room empty");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Lost connection to the waiting room");
                    return Err(WorkerError::Connection(e));
                }
            }
        }
    }
}

impl Worker<RedisQueue, PostgresStore> {
    /// Connect to Redis, then PostgreSQL, each with the configured retry policy
    ///
    /// A `true` on `shutdown` abandons the retries.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConnectionError`], [`ConnectionError::Interrupted`]
    /// included; an already open Redis handle is closed before returning.
    pub async fn connect(
        config: &WorkerConfig,
        shutdown: &watch::Receiver<bool>,
    ) -> std::result::Result<Self, ConnectionError> {
        let policy = RetryPolicy::from(&config.retry);

        let mut queue = RedisQueue::connect(&config.redis, &policy, shutdown.clone()).await?;
        let store = match PostgresStore::connect(&config.postgresql, &policy, shutdown.clone()).await
        {
            Ok(store) => store,
            Err(e) => {
                queue.close().await;
                return Err(e);
            }
        };

        Ok(Self::new(queue, store, WorkerSettings::from_config(config)))
    }
}
