//! In-memory queue and store shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use doctor_worker::adapters::traits::{BlockMode, Dequeued, PatientQueue, TreatmentStore};
use doctor_worker::domain::{
    ConnectionError, NewTreatmentRecord, PersistenceError, RecordId, TreatmentRecord,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Build a well-formed admission payload
pub fn payload(id: &str, name: &str, condition: &str, admitted_at: &str) -> String {
    serde_json::json!({
        "id": id,
        "name": name,
        "condition": condition,
        "admittedAt": admitted_at,
    })
    .to_string()
}

#[derive(Default)]
pub struct QueueState {
    pub items: VecDeque<String>,
    pub dequeued: usize,
    /// Every dequeue call, including ones that found the queue empty
    pub dequeue_calls: usize,
    pub closed: bool,
    /// Fail every dequeue once set
    pub lost: bool,
}

/// FIFO queue that waits forever (or for the timeout) once empty
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
    shutdown_when_drained: Option<watch::Sender<bool>>,
}

impl InMemoryQueue {
    pub fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = Self::default();
        queue
            .state()
            .items
            .extend(items.into_iter().map(Into::into));
        queue
    }

    /// Request shutdown the first time the queue is found empty
    pub fn shutdown_when_drained(mut self, sender: watch::Sender<bool>) -> Self {
        self.shutdown_when_drained = Some(sender);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl PatientQueue for InMemoryQueue {
    async fn dequeue(
        &mut self,
        queue_name: &str,
        block: BlockMode,
    ) -> Result<Option<Dequeued>, ConnectionError> {
        let next = {
            let mut state = self.state();
            state.dequeue_calls += 1;
            if state.closed {
                return Err(ConnectionError::Closed("Redis".to_string()));
            }
            if state.lost {
                return Err(ConnectionError::Lost {
                    service: "Redis".to_string(),
                    message: "Connection reset by peer".to_string(),
                });
            }
            let next = state.items.pop_front();
            if next.is_some() {
                state.dequeued += 1;
            }
            next
        };

        if let Some(payload) = next {
            return Ok(Some(Dequeued {
                queue: queue_name.to_string(),
                payload,
            }));
        }

        if let Some(sender) = &self.shutdown_when_drained {
            let _ = sender.send(true);
        }

        match block {
            BlockMode::Forever => std::future::pending().await,
            BlockMode::Timeout(timeout) => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        self.state().closed = true;
    }
}

#[derive(Default)]
pub struct StoreState {
    pub committed: Vec<TreatmentRecord>,
    pending: Option<Vec<NewTreatmentRecord>>,
    next_id: i32,
    /// Store operations in call order
    pub calls: Vec<&'static str>,
    pub bootstraps: usize,
    pub fail_inserts: bool,
    pub fail_bootstrap: bool,
    pub closed: bool,
}

/// Transactional store enforcing the `medical_records` column limits
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    pub fn committed(&self) -> Vec<TreatmentRecord> {
        self.state().committed.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn in_transaction(&self) -> bool {
        self.state().pending.is_some()
    }
}

#[async_trait]
impl TreatmentStore for InMemoryStore {
    async fn bootstrap_schema(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state();
        state.calls.push("bootstrap");
        if state.fail_bootstrap {
            return Err(PersistenceError::Schema("permission denied".to_string()));
        }
        state.bootstraps += 1;
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state();
        state.calls.push("begin");
        if state.pending.is_some() {
            return Err(PersistenceError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        state.pending = Some(Vec::new());
        Ok(())
    }

    async fn insert_record(
        &mut self,
        record: &NewTreatmentRecord,
    ) -> Result<RecordId, PersistenceError> {
        let mut state = self.state();
        state.calls.push("insert");

        if state.fail_inserts {
            return Err(PersistenceError::InsertFailed(
                "server closed the connection".to_string(),
            ));
        }
        if record.patient_id.chars().count() > 36 {
            return Err(PersistenceError::InsertFailed(
                "value too long for type character varying(36)".to_string(),
            ));
        }
        if record.patient_name.chars().count() > 255 {
            return Err(PersistenceError::InsertFailed(
                "value too long for type character varying(255)".to_string(),
            ));
        }

        state.next_id += 1;
        let id = RecordId(state.next_id);
        match state.pending.as_mut() {
            Some(pending) => {
                pending.push(record.clone());
                Ok(id)
            }
            None => Err(PersistenceError::Transaction(
                "no transaction open".to_string(),
            )),
        }
    }

    async fn commit(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state();
        state.calls.push("commit");
        let pending = state
            .pending
            .take()
            .ok_or_else(|| PersistenceError::Transaction("no transaction open".to_string()))?;

        let first_id = state.next_id - pending.len() as i32 + 1;
        let treated_at = Utc::now().naive_utc();
        for (offset, record) in pending.into_iter().enumerate() {
            state.committed.push(TreatmentRecord {
                id: RecordId(first_id + offset as i32),
                patient_id: record.patient_id,
                patient_name: record.patient_name,
                condition: record.condition,
                admitted_at: record.admitted_at,
                treated_at: Some(treated_at),
            });
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state();
        state.calls.push("rollback");
        state.pending = None;
        Ok(())
    }

    async fn count_records(&mut self) -> Result<i64, PersistenceError> {
        Ok(self.state().committed.len() as i64)
    }

    async fn close(&mut self) {
        self.state().closed = true;
    }
}
