//! PostgreSQL implementation of the `CareStore` trait.
//!
//! Every composite operation opens one transaction and commits or rolls
//! back as a unit. Consent acceptance and feedback insertion lock the
//! patient row (`SELECT … FOR UPDATE`) for the whole read-modify-write;
//! message appends lock the chat row. A dropped transaction rolls back
//! automatically per sqlx semantics.

use async_trait::async_trait;
use sqlx_core::pool::PoolConnection;
use sqlx_postgres::{PgPool, PgTransaction, Postgres};
use tracing::instrument;

use carebridge_core::{
    Chat, ChatId, ChatParticipant, ClinicId, DoctorId, Feedback, Message, MessageId, MessageOrder,
    PartyRole, Patient, PatientId, PatientStatus, StatusChangeRequest,
};
use carebridge_storage::{
    CareStore, ChatSnapshot, CompletionConsent, MessagePage, NewMessage, NewPatient, StorageError,
};

use crate::config::PostgresConfig;
use crate::error::map_query_err;
use crate::{migrations, pool, queries};

/// PostgreSQL storage backend for the care-coordination core.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new `PostgresStore` with the given configuration.
    ///
    /// This will create a connection pool and, if configured, run the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresStore` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> Result<PoolConnection<Postgres>, StorageError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_query_err(e, "acquire connection"))
    }

    async fn begin(&self) -> Result<PgTransaction<'static>, StorageError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_query_err(e, "begin transaction"))
    }
}

async fn commit(tx: PgTransaction<'static>) -> Result<(), StorageError> {
    tx.commit()
        .await
        .map_err(|e| map_query_err(e, "commit transaction"))
}

#[async_trait]
impl CareStore for PostgresStore {
    #[instrument(skip(self, new), fields(clinic_id = %new.clinic_id))]
    async fn create_patient(&self, new: NewPatient) -> Result<Patient, StorageError> {
        let mut conn = self.conn().await?;
        queries::patients::insert(&mut conn, &new).await
    }

    async fn patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError> {
        let mut conn = self.conn().await?;
        queries::patients::load(&mut conn, id).await
    }

    #[instrument(skip(self))]
    async fn delete_patient(&self, id: PatientId) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        if !queries::patients::delete(&mut conn, id).await? {
            return Err(StorageError::not_found("Patient", id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn transfer_patient(
        &self,
        id: PatientId,
        new_clinic_id: ClinicId,
    ) -> Result<Patient, StorageError> {
        let mut conn = self.conn().await?;
        if !queries::patients::set_clinic(&mut conn, id, new_clinic_id).await? {
            return Err(StorageError::not_found("Patient", id));
        }
        queries::patients::load(&mut conn, id)
            .await?
            .ok_or_else(|| StorageError::not_found("Patient", id))
    }

    #[instrument(skip(self))]
    async fn assign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient, StorageError> {
        let mut tx = self.begin().await?;
        if !queries::patients::exists(&mut tx, patient_id).await? {
            return Err(StorageError::not_found("Patient", patient_id));
        }
        queries::patients::add_doctor(&mut tx, patient_id, doctor_id).await?;
        let patient = queries::patients::load(&mut tx, patient_id)
            .await?
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;
        commit(tx).await?;
        Ok(patient)
    }

    #[instrument(skip(self))]
    async fn unassign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient, StorageError> {
        let mut tx = self.begin().await?;
        if !queries::patients::exists(&mut tx, patient_id).await? {
            return Err(StorageError::not_found("Patient", patient_id));
        }
        queries::patients::remove_doctor(&mut tx, patient_id, doctor_id).await?;
        let patient = queries::patients::load(&mut tx, patient_id)
            .await?
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;
        commit(tx).await?;
        Ok(patient)
    }

    #[instrument(skip(self))]
    async fn update_patient_status(
        &self,
        patient_id: PatientId,
        status: PatientStatus,
    ) -> Result<Patient, StorageError> {
        let mut conn = self.conn().await?;
        if !queries::patients::set_status(&mut conn, patient_id, status).await? {
            return Err(StorageError::not_found("Patient", patient_id));
        }
        queries::patients::load(&mut conn, patient_id)
            .await?
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))
    }

    #[instrument(skip(self))]
    async fn accept_completion(
        &self,
        patient_id: PatientId,
        role: PartyRole,
    ) -> Result<CompletionConsent, StorageError> {
        let target = PatientStatus::Completed;
        let mut tx = self.begin().await?;

        // The row lock serializes concurrent acceptances on this patient.
        let Some(mut patient) = queries::patients::load_for_update(&mut tx, patient_id).await?
        else {
            return Err(StorageError::not_found("Patient", patient_id));
        };

        // Terminal state is absorbing.
        if patient.status == PatientStatus::Completed {
            queries::consent::delete_for_patient(&mut tx, patient_id, target).await?;
            commit(tx).await?;
            return Ok(CompletionConsent::Completed(patient));
        }

        // No counterpart to consent: close immediately, no consent record.
        if patient.has_no_doctors() {
            queries::patients::set_status(&mut tx, patient_id, target).await?;
            queries::consent::delete_for_patient(&mut tx, patient_id, target).await?;
            commit(tx).await?;
            patient.status = target;
            return Ok(CompletionConsent::Completed(patient));
        }

        match queries::consent::find(&mut tx, patient_id, target).await? {
            None => {
                let request = queries::consent::insert(&mut tx, patient_id, target, role).await?;
                commit(tx).await?;
                Ok(CompletionConsent::Pending(request))
            }
            Some(request) if request.accepted_by(role) => {
                // No writes to keep; release the row lock.
                tx.rollback()
                    .await
                    .map_err(|e| map_query_err(e, "rollback transaction"))?;
                Ok(CompletionConsent::AlreadyAccepted(request))
            }
            Some(request) => {
                let updated = queries::consent::set_accepted(&mut tx, request.id, role).await?;
                if updated.is_resolved() {
                    queries::consent::delete(&mut tx, updated.id).await?;
                    queries::patients::set_status(&mut tx, patient_id, target).await?;
                    commit(tx).await?;
                    patient.status = target;
                    Ok(CompletionConsent::Completed(patient))
                } else {
                    commit(tx).await?;
                    Ok(CompletionConsent::Pending(updated))
                }
            }
        }
    }

    async fn pending_completion(
        &self,
        patient_id: PatientId,
    ) -> Result<Option<StatusChangeRequest>, StorageError> {
        let mut conn = self.conn().await?;
        queries::consent::find(&mut conn, patient_id, PatientStatus::Completed).await
    }

    #[instrument(skip(self))]
    async fn find_or_create_chat(
        &self,
        patient_id: PatientId,
        clinic_id: ClinicId,
        doctor_id: DoctorId,
    ) -> Result<ChatSnapshot, StorageError> {
        let mut conn = self.conn().await?;

        if let Some(chat) =
            queries::chats::find_by_triple(&mut conn, patient_id, clinic_id, doctor_id).await?
        {
            let participants = queries::chats::participants(&mut conn, chat.id).await?;
            let message_count = queries::messages::count(&mut conn, chat.id).await?;
            return Ok(ChatSnapshot {
                chat,
                participants,
                message_count,
                created: false,
            });
        }
        drop(conn);

        // A racing first caller loses on the triple's unique index; the
        // insert maps that to a retryable conflict and the caller re-reads.
        let mut tx = self.begin().await?;
        let chat = queries::chats::insert(&mut tx, patient_id, clinic_id, doctor_id).await?;
        let participants =
            queries::chats::insert_participants(&mut tx, chat.id, clinic_id, doctor_id).await?;
        commit(tx).await?;

        Ok(ChatSnapshot {
            chat,
            participants,
            message_count: 0,
            created: true,
        })
    }

    async fn chat(&self, id: ChatId) -> Result<Option<Chat>, StorageError> {
        let mut conn = self.conn().await?;
        queries::chats::load(&mut conn, id).await
    }

    async fn chat_participants(&self, id: ChatId) -> Result<Vec<ChatParticipant>, StorageError> {
        let mut conn = self.conn().await?;
        if queries::chats::load(&mut conn, id).await?.is_none() {
            return Err(StorageError::not_found("Chat", id));
        }
        queries::chats::participants(&mut conn, id).await
    }

    #[instrument(skip(self, new), fields(chat_id = %new.chat_id, sender = %new.sender))]
    async fn append_message(&self, new: NewMessage) -> Result<Message, StorageError> {
        let mut tx = self.begin().await?;

        // Lock the chat row: serializes the last_message_at bump and keeps
        // the participant check stable for the rest of the write.
        if queries::chats::load_for_update(&mut tx, new.chat_id)
            .await?
            .is_none()
        {
            return Err(StorageError::not_found("Chat", new.chat_id));
        }
        // Same error as a missing chat, so callers cannot probe existence.
        if !queries::messages::is_participant(&mut tx, new.chat_id, new.sender).await? {
            return Err(StorageError::not_found("Chat", new.chat_id));
        }

        let (message_id, created_at) =
            queries::messages::insert(&mut tx, new.chat_id, &new.content, new.sender).await?;

        let mut attachments = Vec::with_capacity(new.attachments.len());
        for attachment in &new.attachments {
            attachments.push(
                queries::messages::insert_attachment(&mut tx, message_id, attachment).await?,
            );
        }

        queries::chats::set_last_message_at(&mut tx, new.chat_id, created_at).await?;
        commit(tx).await?;

        Ok(Message {
            id: message_id,
            chat_id: new.chat_id,
            content: new.content,
            sender: new.sender,
            attachments,
            created_at: queries::chrono_to_time(created_at),
        })
    }

    async fn messages_page(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u32,
        order: MessageOrder,
    ) -> Result<MessagePage, StorageError> {
        let mut conn = self.conn().await?;
        if queries::chats::load(&mut conn, chat_id).await?.is_none() {
            return Err(StorageError::not_found("Chat", chat_id));
        }
        let total = queries::messages::count(&mut conn, chat_id).await?;
        let messages = queries::messages::window(&mut conn, chat_id, offset, limit, order).await?;
        Ok(MessagePage { messages, total })
    }

    async fn message(&self, id: MessageId) -> Result<Option<Message>, StorageError> {
        let mut conn = self.conn().await?;
        queries::messages::load(&mut conn, id).await
    }

    #[instrument(skip(self, content))]
    async fn add_feedback(
        &self,
        patient_id: PatientId,
        content: String,
    ) -> Result<Feedback, StorageError> {
        let mut tx = self.begin().await?;

        // The status gate holds under the patient's row lock.
        let Some(patient) = queries::patients::load_for_update(&mut tx, patient_id).await? else {
            return Err(StorageError::not_found("Patient", patient_id));
        };
        if patient.status == PatientStatus::Active {
            return Err(StorageError::invalid_record(
                "feedback requires the care episode to be closed",
            ));
        }

        let feedback = queries::feedback::insert(&mut tx, patient_id, &content).await?;
        commit(tx).await?;
        Ok(feedback)
    }

    async fn feedback_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Feedback>, StorageError> {
        let mut conn = self.conn().await?;
        if !queries::patients::exists(&mut conn, patient_id).await? {
            return Err(StorageError::not_found("Patient", patient_id));
        }
        queries::feedback::list(&mut conn, patient_id).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
