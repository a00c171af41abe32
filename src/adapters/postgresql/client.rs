//! PostgreSQL client implementation
//!
//! One `tokio_postgres` connection, no pool. Transactions are driven with
//! plain `BEGIN` / `COMMIT` / `ROLLBACK` so the caller decides the outcome.

use super::models::{
    record_from_row, COUNT_RECORDS_SQL, CREATE_TABLE_SQL, INSERT_RECORD_SQL, SELECT_RECENT_SQL,
    SELECT_RECORD_SQL,
};
use crate::adapters::retry::{connect_with_retry, RetryPolicy};
use crate::adapters::traits::TreatmentStore;
use crate::config::{redact_url, PostgreSQLConfig};
use crate::domain::errors::{ConnectionError, PersistenceError};
use crate::domain::ids::RecordId;
use crate::domain::treatment::{NewTreatmentRecord, TreatmentRecord};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use secrecy::ExposeSecret;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

const SERVICE: &str = "PostgreSQL";

/// Treatment record store backed by PostgreSQL
pub struct PostgresStore {
    client: Option<Client>,
    connection_task: Option<JoinHandle<()>>,
    /// Connection string with credentials removed, for logs
    target: String,
}

impl PostgresStore {
    /// Connect to PostgreSQL, retrying per `policy`
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidAddress`] if the connection string
    /// does not parse, [`ConnectionError::Exhausted`] once every attempt failed
    /// and [`ConnectionError::Interrupted`] if `shutdown` fires first.
    pub async fn connect(
        config: &PostgreSQLConfig,
        policy: &RetryPolicy,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ConnectionError> {
        let dsn = config.connection_string.expose_secret().as_str();
        let target = redact_url(dsn);

        let pg_config: tokio_postgres::Config =
            dsn.parse().map_err(|e: tokio_postgres::Error| {
                ConnectionError::InvalidAddress {
                    service: SERVICE.to_string(),
                    message: format!("Invalid PostgreSQL connection string: {e}"),
                }
            })?;

        let (client, connection) =
            connect_with_retry(SERVICE, policy, shutdown, |_| pg_config.connect(NoTls)).await?;

        let connection_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection terminated");
            }
        });

        tracing::info!(target = %target, "Connected to PostgreSQL");

        Ok(Self {
            client: Some(client),
            connection_task: Some(connection_task),
            target,
        })
    }

    /// Connection target without credentials
    pub fn target(&self) -> &str {
        &self.target
    }

    fn client(&self) -> Result<&Client, PersistenceError> {
        self.client.as_ref().ok_or(PersistenceError::Closed)
    }

    async fn run_statement(&self, sql: &str) -> Result<(), PersistenceError> {
        self.client()?
            .batch_execute(sql)
            .await
            .map_err(|e| PersistenceError::Transaction(format!("{sql} failed: {e}")))
    }

    /// Fetch one record by surrogate key
    pub async fn fetch_record(
        &self,
        id: RecordId,
    ) -> Result<Option<TreatmentRecord>, PersistenceError> {
        let row = self
            .client()?
            .query_opt(SELECT_RECORD_SQL, &[&id.value()])
            .await
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Most recent records, newest first
    pub async fn recent_records(
        &self,
        limit: i64,
    ) -> Result<Vec<TreatmentRecord>, PersistenceError> {
        let rows = self
            .client()?
            .query(SELECT_RECENT_SQL, &[&limit])
            .await
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

        rows.iter().map(record_from_row).collect()
    }

    /// Server clock in the session time zone, as stored by `treated_at`
    pub async fn server_time(&self) -> Result<NaiveDateTime, PersistenceError> {
        let row = self
            .client()?
            .query_one("SELECT LOCALTIMESTAMP", &[])
            .await
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

        row.try_get(0)
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl TreatmentStore for PostgresStore {
    async fn bootstrap_schema(&mut self) -> Result<(), PersistenceError> {
        self.client()?
            .batch_execute(CREATE_TABLE_SQL)
            .await
            .map_err(|e| PersistenceError::Schema(e.to_string()))?;

        tracing::info!("Database initialized - medical_records table ready");
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), PersistenceError> {
        self.run_statement("BEGIN").await
    }

    async fn insert_record(
        &mut self,
        record: &NewTreatmentRecord,
    ) -> Result<RecordId, PersistenceError> {
        let row = self
            .client()?
            .query_one(
                INSERT_RECORD_SQL,
                &[
                    &record.patient_id,
                    &record.patient_name,
                    &record.condition,
                    &record.admitted_at,
                ],
            )
            .await
            .map_err(|e| PersistenceError::InsertFailed(e.to_string()))?;

        row.try_get::<_, i32>(0)
            .map(RecordId)
            .map_err(|e| PersistenceError::InsertFailed(e.to_string()))
    }

    async fn commit(&mut self) -> Result<(), PersistenceError> {
        self.run_statement("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), PersistenceError> {
        self.run_statement("ROLLBACK").await
    }

    async fn count_records(&mut self) -> Result<i64, PersistenceError> {
        let row = self
            .client()?
            .query_one(COUNT_RECORDS_SQL, &[])
            .await
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

        row.try_get(0)
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))
    }

    async fn close(&mut self) {
        // dropping the client ends the connection future
        if self.client.take().is_some() {
            if let Some(task) = self.connection_task.take() {
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "PostgreSQL connection task did not finish cleanly");
                }
            }
            tracing::debug!(target = %self.target, "PostgreSQL connection closed");
        }
    }
}
