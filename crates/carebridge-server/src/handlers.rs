//! Route handlers for the CareBridge API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use carebridge_core::{MessageOrder, Party, PartyRole, PatientStatus};
use carebridge_coordination::CoordinationError;
use carebridge_storage::{NewAttachment, NewPatient};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "CareBridge Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

// ---- Patients ----

pub async fn create_patient(
    State(state): State<AppState>,
    Json(body): Json<NewPatient>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state.patients.create_patient(body).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn read_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state.patients.patient(id).await?;
    Ok(Json(patient))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.patients.delete_patient(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody {
    clinic_id: Uuid,
}

pub async fn transfer_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransferBody>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state.patients.transfer_patient(id, body.clinic_id).await?;
    Ok(Json(patient))
}

pub async fn assign_doctor(
    State(state): State<AppState>,
    Path((id, doctor_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state.patients.assign_doctor(id, doctor_id).await?;
    Ok(Json(patient))
}

pub async fn unassign_doctor(
    State(state): State<AppState>,
    Path((id, doctor_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state.patients.unassign_doctor(id, doctor_id).await?;
    Ok(Json(patient))
}

pub async fn list_doctors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let doctors = state.assignments.assigned_doctors(id).await?;
    Ok(Json(doctors))
}

// ---- Status transitions ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeBody {
    target_status: String,
    role: PartyRole,
}

pub async fn request_status_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChangeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let target: PatientStatus = body
        .target_status
        .parse()
        .map_err(|e: carebridge_core::CoreError| CoordinationError::validation(e.to_string()))?;
    let outcome = state
        .coordinator
        .request_status_change(id, target, body.role)
        .await?;
    Ok(Json(outcome))
}

// ---- Feedback ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    content: String,
}

pub async fn create_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FeedbackBody>,
) -> Result<impl IntoResponse, ApiError> {
    let feedback = state.patients.add_feedback(id, body.content).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

pub async fn list_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.patients.feedback_for(id).await?;
    Ok(Json(entries))
}

// ---- Chats ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatBody {
    doctor_id: Uuid,
    clinic_id: Uuid,
    patient_id: Uuid,
}

pub async fn get_or_create_chat(
    State(state): State<AppState>,
    Json(body): Json<CreateChatBody>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state
        .chats
        .get_or_create_chat(body.doctor_id, body.clinic_id, body.patient_id)
        .await?;
    let status = if chat.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(chat)))
}

// ---- Messages ----

#[derive(Deserialize)]
pub struct MessagesQuery {
    page: Option<u32>,
    limit: Option<u32>,
    order: Option<String>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let order = match query.order.as_deref() {
        Some(raw) => raw
            .parse::<MessageOrder>()
            .map_err(|e| CoordinationError::validation(e.to_string()))?,
        None => MessageOrder::default(),
    };
    let history = state
        .messages
        .get_messages(
            chat_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
            order,
        )
        .await?;
    Ok(Json(history))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    #[serde(default)]
    content: String,
    sender: Party,
    #[serde(default)]
    attachments: Vec<NewAttachment>,
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .messages
        .send_message(chat_id, body.content, body.sender, body.attachments)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadBody {
    reader: Party,
}

pub async fn mark_message_as_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(body): Json<MarkReadBody>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .messages
        .mark_message_as_read(message_id, body.reader)
        .await?;
    Ok(Json(message))
}
