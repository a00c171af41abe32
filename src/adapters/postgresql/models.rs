//! PostgreSQL table definition and row mapping
//!
//! A single table holds every treatment record:
//!
//! | column         | type           |
//! |----------------|----------------|
//! | `id`           | `SERIAL` PK    |
//! | `patient_id`   | `VARCHAR(36)`  |
//! | `patient_name` | `VARCHAR(255)` |
//! | `condition`    | `TEXT`         |
//! | `admitted_at`  | `TIMESTAMP`    |
//! | `treated_at`   | `TIMESTAMP DEFAULT NOW()` |

use crate::domain::errors::PersistenceError;
use crate::domain::ids::RecordId;
use crate::domain::treatment::TreatmentRecord;
use tokio_postgres::Row;

pub const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS medical_records (
    id SERIAL PRIMARY KEY,
    patient_id VARCHAR(36) NOT NULL,
    patient_name VARCHAR(255) NOT NULL,
    condition TEXT NOT NULL,
    admitted_at TIMESTAMP NOT NULL,
    treated_at TIMESTAMP DEFAULT NOW()
);
";

pub const INSERT_RECORD_SQL: &str = "
INSERT INTO medical_records (patient_id, patient_name, condition, admitted_at)
VALUES ($1, $2, $3, $4)
RETURNING id
";

pub const COUNT_RECORDS_SQL: &str = "SELECT COUNT(*) FROM medical_records";

pub const SELECT_RECORD_SQL: &str = "
SELECT id, patient_id, patient_name, condition, admitted_at, treated_at
FROM medical_records
WHERE id = $1
";

pub const SELECT_RECENT_SQL: &str = "
SELECT id, patient_id, patient_name, condition, admitted_at, treated_at
FROM medical_records
ORDER BY id DESC
LIMIT $1
";

/// Map a `medical_records` row to a [`TreatmentRecord`]
pub fn record_from_row(row: &Row) -> Result<TreatmentRecord, PersistenceError> {
    let column = |e: tokio_postgres::Error| PersistenceError::QueryFailed(e.to_string());

    Ok(TreatmentRecord {
        id: RecordId(row.try_get("id").map_err(column)?),
        patient_id: row.try_get("patient_id").map_err(column)?,
        patient_name: row.try_get("patient_name").map_err(column)?,
        condition: row.try_get("condition").map_err(column)?,
        admitted_at: row.try_get("admitted_at").map_err(column)?,
        treated_at: row.try_get("treated_at").map_err(column)?,
    })
}
