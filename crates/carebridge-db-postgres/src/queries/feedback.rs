//! Feedback queries.

use chrono::{DateTime, Utc};
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgConnection;
use uuid::Uuid;

use carebridge_core::id::generate_id;
use carebridge_core::{Feedback, PatientId};
use carebridge_storage::StorageError;

use super::chrono_to_time;
use crate::error::map_query_err;

/// Inserts a feedback entry. The caller verifies the episode-status gate
/// under the patient's row lock before calling this.
pub async fn insert(
    conn: &mut PgConnection,
    patient_id: PatientId,
    content: &str,
) -> Result<Feedback, StorageError> {
    let id = generate_id();
    let created_at: DateTime<Utc> = query_scalar(
        "INSERT INTO feedback (id, patient_id, content) VALUES ($1, $2, $3) RETURNING created_at",
    )
    .bind(id)
    .bind(patient_id)
    .bind(content)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "insert feedback"))?;

    Ok(Feedback {
        id,
        patient_id,
        content: content.to_string(),
        created_at: chrono_to_time(created_at),
    })
}

/// Reads a patient's feedback entries in creation order.
pub async fn list(
    conn: &mut PgConnection,
    patient_id: PatientId,
) -> Result<Vec<Feedback>, StorageError> {
    let rows: Vec<(Uuid, Uuid, String, DateTime<Utc>)> = query_as(
        "SELECT id, patient_id, content, created_at FROM feedback \
         WHERE patient_id = $1 ORDER BY created_at, id",
    )
    .bind(patient_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "read feedback"))?;

    Ok(rows
        .into_iter()
        .map(|(id, patient_id, content, created_at)| Feedback {
            id,
            patient_id,
            content,
            created_at: chrono_to_time(created_at),
        })
        .collect())
}
