//! Chat and participant queries.

use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgConnection;
use uuid::Uuid;

use carebridge_core::id::generate_id;
use carebridge_core::{Chat, ChatId, ChatParticipant, ClinicId, DoctorId, Party, PatientId};
use carebridge_storage::StorageError;

use super::{chrono_to_time, party_from_columns};
use crate::error::map_query_err;

type ChatRow = (Uuid, Uuid, Option<DateTime<Utc>>, DateTime<Utc>);

const CHAT_COLUMNS: &str = "id, patient_id, last_message_at, created_at";

fn row_to_chat(row: ChatRow) -> Chat {
    Chat {
        id: row.0,
        patient_id: row.1,
        last_message_at: row.2.map(chrono_to_time),
        created_at: chrono_to_time(row.3),
    }
}

/// Looks up the chat for a (patient, clinic, doctor) triple.
pub async fn find_by_triple(
    conn: &mut PgConnection,
    patient_id: PatientId,
    clinic_id: ClinicId,
    doctor_id: DoctorId,
) -> Result<Option<Chat>, StorageError> {
    let sql = format!(
        "SELECT {CHAT_COLUMNS} FROM chats \
         WHERE patient_id = $1 AND clinic_id = $2 AND doctor_id = $3"
    );
    let row: Option<ChatRow> = query_as(&sql)
        .bind(patient_id)
        .bind(clinic_id)
        .bind(doctor_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "find chat by triple"))?;
    Ok(row.map(row_to_chat))
}

/// Reads a chat by id.
pub async fn load(conn: &mut PgConnection, id: ChatId) -> Result<Option<Chat>, StorageError> {
    let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1");
    let row: Option<ChatRow> = query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "read chat"))?;
    Ok(row.map(row_to_chat))
}

/// Reads a chat by id with its row locked for the rest of the transaction.
pub async fn load_for_update(
    conn: &mut PgConnection,
    id: ChatId,
) -> Result<Option<Chat>, StorageError> {
    let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1 FOR UPDATE");
    let row: Option<ChatRow> = query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "read chat"))?;
    Ok(row.map(row_to_chat))
}

/// Inserts a chat for the triple.
///
/// A unique violation on the triple maps to a retryable conflict; the
/// racing caller re-reads the winner's chat.
pub async fn insert(
    conn: &mut PgConnection,
    patient_id: PatientId,
    clinic_id: ClinicId,
    doctor_id: DoctorId,
) -> Result<Chat, StorageError> {
    let id = generate_id();
    let created_at: DateTime<Utc> = sqlx_core::query_scalar::query_scalar(
        "INSERT INTO chats (id, patient_id, clinic_id, doctor_id) VALUES ($1, $2, $3, $4) \
         RETURNING created_at",
    )
    .bind(id)
    .bind(patient_id)
    .bind(clinic_id)
    .bind(doctor_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "create chat"))?;

    Ok(Chat {
        id,
        patient_id,
        last_message_at: None,
        created_at: chrono_to_time(created_at),
    })
}

/// Inserts the chat's two participant rows.
pub async fn insert_participants(
    conn: &mut PgConnection,
    chat_id: ChatId,
    clinic_id: ClinicId,
    doctor_id: DoctorId,
) -> Result<Vec<ChatParticipant>, StorageError> {
    let clinic_row = ChatParticipant {
        id: generate_id(),
        chat_id,
        party: Party::Clinic(clinic_id),
    };
    let doctor_row = ChatParticipant {
        id: generate_id(),
        chat_id,
        party: Party::Doctor(doctor_id),
    };

    query(
        "INSERT INTO chat_participants (id, chat_id, clinic_id, doctor_id) \
         VALUES ($1, $2, $3, NULL), ($4, $2, NULL, $5)",
    )
    .bind(clinic_row.id)
    .bind(chat_id)
    .bind(clinic_id)
    .bind(doctor_row.id)
    .bind(doctor_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "create chat participants"))?;

    Ok(vec![clinic_row, doctor_row])
}

/// Reads a chat's participants.
pub async fn participants(
    conn: &mut PgConnection,
    chat_id: ChatId,
) -> Result<Vec<ChatParticipant>, StorageError> {
    let rows: Vec<(Uuid, Uuid, Option<Uuid>, Option<Uuid>)> = query_as(
        "SELECT id, chat_id, clinic_id, doctor_id FROM chat_participants \
         WHERE chat_id = $1 ORDER BY created_at, id",
    )
    .bind(chat_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "read chat participants"))?;

    rows.into_iter()
        .map(|(id, chat_id, clinic_id, doctor_id)| {
            Ok(ChatParticipant {
                id,
                chat_id,
                party: party_from_columns(clinic_id, doctor_id)?,
            })
        })
        .collect()
}

/// Bumps the chat's last-message marker.
pub async fn set_last_message_at(
    conn: &mut PgConnection,
    chat_id: ChatId,
    at: DateTime<Utc>,
) -> Result<(), StorageError> {
    query("UPDATE chats SET last_message_at = $2 WHERE id = $1")
        .bind(chat_id)
        .bind(at)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "update last_message_at"))?;
    Ok(())
}
