//! Status command implementation
//!
//! This module implements the `status` command for displaying the waiting
//! room length and the most recent treatment records.

use crate::adapters::postgresql::PostgresStore;
use crate::adapters::redis::RedisQueue;
use crate::adapters::retry::{no_shutdown, RetryPolicy};
use crate::adapters::traits::{PatientQueue, TreatmentStore};
use crate::config::WorkerConfig;
use crate::console;
use crate::domain::treatment::TreatmentRecord;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of recent treatment records to show
    #[arg(long, default_value_t = 5)]
    pub recent: i64,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config: &WorkerConfig) -> anyhow::Result<i32> {
        tracing::info!("Checking worker status");

        console!("📊 Doctor Worker Status");
        console!();

        // one attempt each, status should answer quickly
        let policy = RetryPolicy::single();

        let mut queue = match RedisQueue::connect(&config.redis, &policy, no_shutdown()).await {
            Ok(q) => q,
            Err(e) => {
                console!("❌ Failed to connect to Redis");
                console!("   Error: {e}");
                return Ok(4);
            }
        };

        let mut store = match PostgresStore::connect(&config.postgresql, &policy, no_shutdown()).await {
            Ok(s) => s,
            Err(e) => {
                queue.close().await;
                console!("❌ Failed to connect to PostgreSQL");
                console!("   Error: {e}");
                return Ok(4);
            }
        };

        let code = self.report(config, &mut queue, &mut store).await;

        queue.close().await;
        store.close().await;
        Ok(code)
    }

    async fn report(
        &self,
        config: &WorkerConfig,
        queue: &mut RedisQueue,
        store: &mut PostgresStore,
    ) -> i32 {
        let waiting = match queue.queue_length(&config.redis.queue_name).await {
            Ok(n) => n,
            Err(e) => {
                console!("❌ Failed to read the waiting room");
                console!("   Error: {e}");
                return 4;
            }
        };

        console!(
            "Waiting room '{}' on {}: {} patient(s)",
            config.redis.queue_name,
            queue.address(),
            waiting
        );

        // the table may not exist before the first worker run
        if let Err(e) = store.bootstrap_schema().await {
            console!("❌ Failed to prepare medical_records");
            console!("   Error: {e}");
            return 5;
        }

        let total = match store.count_records().await {
            Ok(n) => n,
            Err(e) => {
                console!("❌ Failed to count medical records");
                console!("   Error: {e}");
                return 5;
            }
        };
        console!("Medical records on {}: {}", store.target(), total);

        if total == 0 || self.recent <= 0 {
            console!();
            return 0;
        }

        let records = match store.recent_records(self.recent).await {
            Ok(r) => r,
            Err(e) => {
                console!("❌ Failed to load recent records");
                console!("   Error: {e}");
                return 5;
            }
        };

        console!();
        console!("Most recent treatments:");
        console!();
        for line in record_table(&records) {
            console!("{line}");
        }
        console!();
        0
    }
}

/// Render records as fixed-width table rows, header first
pub fn record_table(records: &[TreatmentRecord]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{:<8} {:<38} {:<25} {:<20} {:<20}",
            "Record", "Patient ID", "Name", "Admitted", "Treated"
        ),
        "-".repeat(112),
    ];

    for record in records {
        let treated = record
            .treated_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        lines.push(format!(
            "{:<8} {:<38} {:<25} {:<20} {:<20}",
            record.id,
            record.patient_id,
            record.patient_name,
            record.admitted_at.format("%Y-%m-%d %H:%M:%S"),
            treated
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::RecordId;
    use chrono::NaiveDateTime;

    #[test]
    fn test_record_table() {
        let admitted: NaiveDateTime = "2024-01-01T10:00:00".parse().unwrap();
        let records = vec![
            TreatmentRecord {
                id: RecordId(2),
                patient_id: "p2".to_string(),
                patient_name: "John Roe".to_string(),
                condition: "sprain".to_string(),
                admitted_at: admitted,
                treated_at: None,
            },
            TreatmentRecord {
                id: RecordId(1),
                patient_id: "p1".to_string(),
                patient_name: "Jane Doe".to_string(),
                condition: "flu".to_string(),
                admitted_at: admitted,
                treated_at: Some("2024-01-01T10:00:05".parse().unwrap()),
            },
        ];

        let lines = record_table(&records);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Record"));
        assert!(lines[2].contains("John Roe"));
        assert!(lines[3].contains("2024-01-01 10:00:05"));
    }

    #[test]
    fn test_record_table_empty() {
        assert_eq!(record_table(&[]).len(), 2);
    }
}
