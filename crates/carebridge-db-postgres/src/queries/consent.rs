//! Consent-record queries for the episode-completion protocol.
//!
//! Callers hold the patient's row lock (see `patients::load_for_update`)
//! for the whole acceptance step, so these queries never race each other
//! for one patient.

use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgConnection;
use uuid::Uuid;

use carebridge_core::id::generate_id;
use carebridge_core::{PartyRole, PatientId, PatientStatus, StatusChangeRequest};
use carebridge_storage::StorageError;

use super::{chrono_to_time, parse_column};
use crate::error::map_query_err;

type ConsentRow = (Uuid, Uuid, String, bool, bool, DateTime<Utc>);

fn row_to_request(row: ConsentRow) -> Result<StatusChangeRequest, StorageError> {
    Ok(StatusChangeRequest {
        id: row.0,
        patient_id: row.1,
        target_status: parse_column(&row.2, "target_status")?,
        doctor_accepted: row.3,
        clinic_accepted: row.4,
        created_at: chrono_to_time(row.5),
    })
}

/// Reads the pending record for (patient, target), if any.
pub async fn find(
    conn: &mut PgConnection,
    patient_id: PatientId,
    target: PatientStatus,
) -> Result<Option<StatusChangeRequest>, StorageError> {
    let row: Option<ConsentRow> = query_as(
        "SELECT id, patient_id, target_status, doctor_accepted, clinic_accepted, created_at \
         FROM status_change_requests WHERE patient_id = $1 AND target_status = $2",
    )
    .bind(patient_id)
    .bind(target.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "read consent record"))?;

    row.map(row_to_request).transpose()
}

/// Creates the record with the accepting role's flag already set.
///
/// A unique-violation here means another transaction created the record
/// despite the patient row lock; it maps to a retryable conflict.
pub async fn insert(
    conn: &mut PgConnection,
    patient_id: PatientId,
    target: PatientStatus,
    role: PartyRole,
) -> Result<StatusChangeRequest, StorageError> {
    let id = generate_id();
    let (doctor_accepted, clinic_accepted) = match role {
        PartyRole::Doctor => (true, false),
        PartyRole::Clinic => (false, true),
    };

    let created_at: DateTime<Utc> = sqlx_core::query_scalar::query_scalar(
        "INSERT INTO status_change_requests \
         (id, patient_id, target_status, doctor_accepted, clinic_accepted) \
         VALUES ($1, $2, $3, $4, $5) RETURNING created_at",
    )
    .bind(id)
    .bind(patient_id)
    .bind(target.to_string())
    .bind(doctor_accepted)
    .bind(clinic_accepted)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "create consent record"))?;

    Ok(StatusChangeRequest {
        id,
        patient_id,
        target_status: target,
        doctor_accepted,
        clinic_accepted,
        created_at: chrono_to_time(created_at),
    })
}

/// Sets the accepting role's flag and returns the updated record.
pub async fn set_accepted(
    conn: &mut PgConnection,
    id: Uuid,
    role: PartyRole,
) -> Result<StatusChangeRequest, StorageError> {
    let column = match role {
        PartyRole::Doctor => "doctor_accepted",
        PartyRole::Clinic => "clinic_accepted",
    };
    let sql = format!(
        "UPDATE status_change_requests SET {column} = TRUE WHERE id = $1 \
         RETURNING id, patient_id, target_status, doctor_accepted, clinic_accepted, created_at"
    );

    let row: ConsentRow = query_as(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "record acceptance"))?;

    row_to_request(row)
}

/// Deletes the record, consumed by the transition it authorized.
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<(), StorageError> {
    query("DELETE FROM status_change_requests WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "delete consent record"))?;
    Ok(())
}

/// Deletes any record for (patient, target); used when completion applies
/// without a counterpart.
pub async fn delete_for_patient(
    conn: &mut PgConnection,
    patient_id: PatientId,
    target: PatientStatus,
) -> Result<(), StorageError> {
    query("DELETE FROM status_change_requests WHERE patient_id = $1 AND target_status = $2")
        .bind(patient_id)
        .bind(target.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "clear consent record"))?;
    Ok(())
}
