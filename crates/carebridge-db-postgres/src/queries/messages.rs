//! Message and attachment queries.

use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgConnection;
use uuid::Uuid;

use carebridge_core::id::generate_id;
use carebridge_core::{Attachment, ChatId, Message, MessageId, MessageOrder, Party};
use carebridge_storage::{NewAttachment, StorageError};

use super::{chrono_to_time, parse_column, party_from_columns, party_to_columns};
use crate::error::map_query_err;

type MessageRow = (
    Uuid,                // id
    Uuid,                // chat_id
    String,              // content
    Option<Uuid>,        // sender_clinic_id
    Option<Uuid>,        // sender_doctor_id
    DateTime<Utc>,       // created_at
);

const MESSAGE_COLUMNS: &str =
    "id, chat_id, content, sender_clinic_id, sender_doctor_id, created_at";

fn row_to_message(row: MessageRow) -> Result<Message, StorageError> {
    Ok(Message {
        id: row.0,
        chat_id: row.1,
        content: row.2,
        sender: party_from_columns(row.3, row.4)?,
        attachments: Vec::new(),
        created_at: chrono_to_time(row.5),
    })
}

/// Returns whether the party is a participant of the chat.
pub async fn is_participant(
    conn: &mut PgConnection,
    chat_id: ChatId,
    party: Party,
) -> Result<bool, StorageError> {
    let (clinic_id, doctor_id) = party_to_columns(party);
    let found: Option<i32> = query_scalar(
        "SELECT 1 FROM chat_participants WHERE chat_id = $1 \
         AND ($2::uuid IS NOT NULL AND clinic_id = $2 \
              OR $3::uuid IS NOT NULL AND doctor_id = $3)",
    )
    .bind(chat_id)
    .bind(clinic_id)
    .bind(doctor_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "check chat participant"))?;
    Ok(found.is_some())
}

/// Inserts the message row; `created_at` is assigned by the database at
/// commit-side `clock_timestamp()`.
pub async fn insert(
    conn: &mut PgConnection,
    chat_id: ChatId,
    content: &str,
    sender: Party,
) -> Result<(MessageId, DateTime<Utc>), StorageError> {
    let id = generate_id();
    let (clinic_id, doctor_id) = party_to_columns(sender);

    let created_at: DateTime<Utc> = query_scalar(
        "INSERT INTO messages (id, chat_id, content, sender_clinic_id, sender_doctor_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING created_at",
    )
    .bind(id)
    .bind(chat_id)
    .bind(content)
    .bind(clinic_id)
    .bind(doctor_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "insert message"))?;

    Ok((id, created_at))
}

/// Inserts one attachment row of a message.
pub async fn insert_attachment(
    conn: &mut PgConnection,
    message_id: MessageId,
    new: &NewAttachment,
) -> Result<Attachment, StorageError> {
    let id = generate_id();
    query("INSERT INTO attachments (id, message_id, filename, url, kind) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(message_id)
        .bind(&new.filename)
        .bind(&new.url)
        .bind(new.kind.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "insert attachment"))?;

    Ok(Attachment {
        id,
        message_id,
        filename: new.filename.clone(),
        url: new.url.clone(),
        kind: new.kind,
    })
}

/// Counts the messages of a chat.
pub async fn count(conn: &mut PgConnection, chat_id: ChatId) -> Result<u64, StorageError> {
    let total: i64 = query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
        .bind(chat_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "count messages"))?;
    Ok(total.max(0) as u64)
}

/// Reads one window of a chat's history, attachments included.
///
/// `ChronologicalAsc` pages forward from the oldest message;
/// `NewestFirst` pages backward from the newest: the query reads
/// descending and the window is reversed so it always returns
/// chronologically.
pub async fn window(
    conn: &mut PgConnection,
    chat_id: ChatId,
    offset: u64,
    limit: u32,
    order: MessageOrder,
) -> Result<Vec<Message>, StorageError> {
    let direction = match order {
        MessageOrder::ChronologicalAsc => "ASC",
        MessageOrder::NewestFirst => "DESC",
    };
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = $1 \
         ORDER BY created_at {direction}, id {direction} LIMIT $2 OFFSET $3"
    );

    let rows: Vec<MessageRow> = query_as(&sql)
        .bind(chat_id)
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "read message window"))?;

    let mut messages = rows
        .into_iter()
        .map(row_to_message)
        .collect::<Result<Vec<_>, _>>()?;
    if order == MessageOrder::NewestFirst {
        messages.reverse();
    }

    attach_all(conn, &mut messages).await?;
    Ok(messages)
}

/// Reads one message by id, attachments included.
pub async fn load(
    conn: &mut PgConnection,
    id: MessageId,
) -> Result<Option<Message>, StorageError> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
    let row: Option<MessageRow> = query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_query_err(e, "read message"))?;

    match row {
        Some(row) => {
            let mut messages = vec![row_to_message(row)?];
            attach_all(conn, &mut messages).await?;
            Ok(messages.pop())
        }
        None => Ok(None),
    }
}

/// Loads and distributes the attachments of the given messages.
async fn attach_all(
    conn: &mut PgConnection,
    messages: &mut [Message],
) -> Result<(), StorageError> {
    if messages.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();

    let rows: Vec<(Uuid, Uuid, String, String, String)> = query_as(
        "SELECT id, message_id, filename, url, kind FROM attachments \
         WHERE message_id = ANY($1) ORDER BY created_at, id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_query_err(e, "read attachments"))?;

    for (id, message_id, filename, url, kind) in rows {
        let attachment = Attachment {
            id,
            message_id,
            filename,
            url,
            kind: parse_column(&kind, "kind")?,
        };
        if let Some(message) = messages.iter_mut().find(|m| m.id == message_id) {
            message.attachments.push(attachment);
        }
    }
    Ok(())
}
