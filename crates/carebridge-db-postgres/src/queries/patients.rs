//! Patient and assignment queries.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgConnection;
use uuid::Uuid;

use carebridge_core::id::generate_id;
use carebridge_core::{DoctorId, GeoPoint, Patient, PatientId, PatientStatus};
use carebridge_storage::{NewPatient, StorageError};

use super::{chrono_date_to_time, chrono_to_time, parse_column, time_date_to_chrono};
use crate::error::map_query_err;

type PatientRow = (
    Uuid,               // id
    String,             // name
    String,             // phone
    String,             // gender
    NaiveDate,          // date_of_birth
    String,             // address
    Option<f64>,        // lat
    Option<f64>,        // lng
    Uuid,               // clinic_id
    String,             // status
    Option<String>,     // procedure_note
    DateTime<Utc>,      // created_at
);

const PATIENT_COLUMNS: &str = "id, name, phone, gender, date_of_birth, address, lat, lng, \
                               clinic_id, status, procedure_note, created_at";

fn row_to_patient(row: PatientRow, doctor_ids: Vec<DoctorId>) -> Result<Patient, StorageError> {
    let location = match (row.6, row.7) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };
    Ok(Patient {
        id: row.0,
        name: row.1,
        phone: row.2,
        gender: parse_column(&row.3, "gender")?,
        date_of_birth: chrono_date_to_time(row.4),
        address: row.5,
        location,
        clinic_id: row.8,
        status: parse_column(&row.9, "status")?,
        procedure_note: row.10,
        doctor_ids,
        created_at: chrono_to_time(row.11),
    })
}

/// Inserts a new patient with an active episode and no assigned doctors.
pub async fn insert(conn: &mut PgConnection, new: &NewPatient) -> Result<Patient, StorageError> {
    let id = generate_id();
    let (lat, lng) = match new.location {
        Some(point) => (Some(point.lat), Some(point.lng)),
        None => (None, None),
    };

    let created_at: DateTime<Utc> = query_scalar(
        "INSERT INTO patients (id, name, phone, gender, date_of_birth, address, lat, lng, \
         clinic_id, status, procedure_note) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', $10) \
         RETURNING created_at",
    )
    .bind(id)
    .bind(&new.name)
    .bind(&new.phone)
    .bind(new.gender.to_string())
    .bind(time_date_to_chrono(new.date_of_birth))
    .bind(&new.address)
    .bind(lat)
    .bind(lng)
    .bind(new.clinic_id)
    .bind(&new.procedure_note)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "insert patient"))?;

    Ok(Patient {
        id,
        name: new.name.clone(),
        phone: new.phone.clone(),
        gender: new.gender,
        date_of_birth: new.date_of_birth,
        address: new.address.clone(),
        location: new.location,
        clinic_id: new.clinic_id,
        status: PatientStatus::Active,
        doctor_ids: Vec::new(),
        procedure_note: new.procedure_note.clone(),
        created_at: chrono_to_time(created_at),
    })
}

/// Loads a patient with its assigned-doctor set.
pub async fn load(
    conn: &mut PgConnection,
    id: PatientId,
) -> Result<Option<Patient>, StorageError> {
    load_inner(conn, id, false).await
}

/// Loads a patient with its row locked for the rest of the transaction.
///
/// The row lock is what serializes concurrent consent acceptances on the
/// same patient.
pub async fn load_for_update(
    conn: &mut PgConnection,
    id: PatientId,
) -> Result<Option<Patient>, StorageError> {
    load_inner(conn, id, true).await
}

async fn load_inner(
    conn: &mut PgConnection,
    id: PatientId,
    lock: bool,
) -> Result<Option<Patient>, StorageError> {
    let suffix = if lock { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1{suffix}");

    let row: Option<PatientRow> = query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "read patient"))?;

    match row {
        Some(row) => {
            let doctors = doctor_ids(conn, id).await?;
            Ok(Some(row_to_patient(row, doctors)?))
        }
        None => Ok(None),
    }
}

/// Reads the patient's assigned-doctor ids in assignment order.
pub async fn doctor_ids(
    conn: &mut PgConnection,
    patient_id: PatientId,
) -> Result<Vec<DoctorId>, StorageError> {
    query_scalar(
        "SELECT doctor_id FROM patient_doctors WHERE patient_id = $1 ORDER BY assigned_at, doctor_id",
    )
    .bind(patient_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "read assigned doctors"))
}

/// Deletes a patient; doctor links, consent records, and feedback cascade.
///
/// Returns `false` when no such patient existed.
pub async fn delete(conn: &mut PgConnection, id: PatientId) -> Result<bool, StorageError> {
    let result = query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "delete patient"))?;
    Ok(result.rows_affected() > 0)
}

/// Moves a patient to another clinic. Returns `false` when missing.
pub async fn set_clinic(
    conn: &mut PgConnection,
    id: PatientId,
    clinic_id: Uuid,
) -> Result<bool, StorageError> {
    let result = query("UPDATE patients SET clinic_id = $2 WHERE id = $1")
        .bind(id)
        .bind(clinic_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "transfer patient"))?;
    Ok(result.rows_affected() > 0)
}

/// Applies a status directly. Returns `false` when missing.
pub async fn set_status(
    conn: &mut PgConnection,
    id: PatientId,
    status: PatientStatus,
) -> Result<bool, StorageError> {
    let result = query("UPDATE patients SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "update patient status"))?;
    Ok(result.rows_affected() > 0)
}

/// Returns whether the patient exists.
pub async fn exists(conn: &mut PgConnection, id: PatientId) -> Result<bool, StorageError> {
    let found: Option<i32> = query_scalar("SELECT 1 FROM patients WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "check patient"))?;
    Ok(found.is_some())
}

/// Links a doctor to a patient. Idempotent via ON CONFLICT.
pub async fn add_doctor(
    conn: &mut PgConnection,
    patient_id: PatientId,
    doctor_id: DoctorId,
) -> Result<(), StorageError> {
    query(
        "INSERT INTO patient_doctors (patient_id, doctor_id) VALUES ($1, $2) \
         ON CONFLICT (patient_id, doctor_id) DO NOTHING",
    )
    .bind(patient_id)
    .bind(doctor_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "assign doctor"))?;
    Ok(())
}

/// Unlinks a doctor from a patient. Idempotent.
pub async fn remove_doctor(
    conn: &mut PgConnection,
    patient_id: PatientId,
    doctor_id: DoctorId,
) -> Result<(), StorageError> {
    query("DELETE FROM patient_doctors WHERE patient_id = $1 AND doctor_id = $2")
        .bind(patient_id)
        .bind(doctor_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "unassign doctor"))?;
    Ok(())
}
