use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use carebridge_core::id::generate_id;
use carebridge_core::{
    Chat, ChatId, ChatParticipant, ClinicId, DoctorId, Feedback, Message, MessageId, MessageOrder,
    Party, PartyRole, Patient, PatientId, PatientStatus, StatusChangeRequest,
};
use carebridge_storage::{
    CareStore, ChatSnapshot, CompletionConsent, MessagePage, NewMessage, NewPatient, StorageError,
};

/// In-memory care store.
///
/// All tables live under a single `RwLock`; reads share the lock, every
/// mutating operation takes it exclusively for its whole read-modify-write.
/// That makes each `CareStore` operation one serialized transaction, which
/// is exactly the isolation the consent protocol and the idempotent chat
/// creation rely on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    patients: HashMap<PatientId, Patient>,
    /// Pending episode-completion consent, at most one per patient.
    consents: HashMap<PatientId, StatusChangeRequest>,
    chats: HashMap<ChatId, Chat>,
    participants: HashMap<ChatId, Vec<ChatParticipant>>,
    /// Uniqueness index for the (patient, clinic, doctor) triple.
    chat_index: HashMap<(PatientId, ClinicId, DoctorId), ChatId>,
    /// Messages per chat in commit order; each message owns its attachments.
    messages: HashMap<ChatId, Vec<Message>>,
    message_index: HashMap<MessageId, ChatId>,
    feedback: HashMap<PatientId, Vec<Feedback>>,
    /// Last issued commit timestamp, for a total order on message times.
    last_stamp: Option<OffsetDateTime>,
}

impl StoreInner {
    /// Issues a strictly increasing commit timestamp.
    fn tick(&mut self) -> OffsetDateTime {
        let mut now = OffsetDateTime::now_utc();
        if let Some(last) = self.last_stamp
            && now <= last
        {
            now = last + time::Duration::microseconds(1);
        }
        self.last_stamp = Some(now);
        now
    }
}

impl MemoryStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CareStore for MemoryStore {
    async fn create_patient(&self, new: NewPatient) -> Result<Patient, StorageError> {
        let mut guard = self.inner.write().await;
        let created_at = guard.tick();
        let patient = Patient {
            id: generate_id(),
            name: new.name,
            phone: new.phone,
            gender: new.gender,
            date_of_birth: new.date_of_birth,
            address: new.address,
            location: new.location,
            clinic_id: new.clinic_id,
            status: PatientStatus::Active,
            doctor_ids: Vec::new(),
            procedure_note: new.procedure_note,
            created_at,
        };
        guard.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError> {
        let guard = self.inner.read().await;
        Ok(guard.patients.get(&id).cloned())
    }

    async fn delete_patient(&self, id: PatientId) -> Result<(), StorageError> {
        let mut guard = self.inner.write().await;
        if guard.patients.remove(&id).is_none() {
            return Err(StorageError::not_found("Patient", id));
        }
        guard.feedback.remove(&id);
        guard.consents.remove(&id);
        Ok(())
    }

    async fn transfer_patient(
        &self,
        id: PatientId,
        new_clinic_id: ClinicId,
    ) -> Result<Patient, StorageError> {
        let mut guard = self.inner.write().await;
        let patient = guard
            .patients
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Patient", id))?;
        patient.clinic_id = new_clinic_id;
        Ok(patient.clone())
    }

    async fn assign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient, StorageError> {
        let mut guard = self.inner.write().await;
        let patient = guard
            .patients
            .get_mut(&patient_id)
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;
        if !patient.doctor_ids.contains(&doctor_id) {
            patient.doctor_ids.push(doctor_id);
        }
        Ok(patient.clone())
    }

    async fn unassign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient, StorageError> {
        let mut guard = self.inner.write().await;
        let patient = guard
            .patients
            .get_mut(&patient_id)
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;
        patient.doctor_ids.retain(|id| *id != doctor_id);
        Ok(patient.clone())
    }

    async fn update_patient_status(
        &self,
        patient_id: PatientId,
        status: PatientStatus,
    ) -> Result<Patient, StorageError> {
        let mut guard = self.inner.write().await;
        let patient = guard
            .patients
            .get_mut(&patient_id)
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;
        patient.status = status;
        Ok(patient.clone())
    }

    async fn accept_completion(
        &self,
        patient_id: PatientId,
        role: PartyRole,
    ) -> Result<CompletionConsent, StorageError> {
        let mut guard = self.inner.write().await;
        let created_at = guard.tick();
        let inner = &mut *guard;
        let patient = inner
            .patients
            .get_mut(&patient_id)
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;

        // Terminal state is absorbing.
        if patient.status == PatientStatus::Completed {
            inner.consents.remove(&patient_id);
            return Ok(CompletionConsent::Completed(patient.clone()));
        }

        // No counterpart to consent: close immediately, no consent record.
        if patient.has_no_doctors() {
            patient.status = PatientStatus::Completed;
            inner.consents.remove(&patient_id);
            return Ok(CompletionConsent::Completed(patient.clone()));
        }

        match inner.consents.get_mut(&patient_id) {
            None => {
                let mut request = StatusChangeRequest {
                    id: generate_id(),
                    patient_id,
                    target_status: PatientStatus::Completed,
                    doctor_accepted: false,
                    clinic_accepted: false,
                    created_at,
                };
                request.accept(role);
                inner.consents.insert(patient_id, request.clone());
                Ok(CompletionConsent::Pending(request))
            }
            Some(request) if request.accepted_by(role) => {
                Ok(CompletionConsent::AlreadyAccepted(request.clone()))
            }
            Some(request) => {
                request.accept(role);
                if request.is_resolved() {
                    inner.consents.remove(&patient_id);
                    patient.status = PatientStatus::Completed;
                    Ok(CompletionConsent::Completed(patient.clone()))
                } else {
                    Ok(CompletionConsent::Pending(request.clone()))
                }
            }
        }
    }

    async fn pending_completion(
        &self,
        patient_id: PatientId,
    ) -> Result<Option<StatusChangeRequest>, StorageError> {
        let guard = self.inner.read().await;
        Ok(guard.consents.get(&patient_id).cloned())
    }

    async fn find_or_create_chat(
        &self,
        patient_id: PatientId,
        clinic_id: ClinicId,
        doctor_id: DoctorId,
    ) -> Result<ChatSnapshot, StorageError> {
        let mut guard = self.inner.write().await;
        let key = (patient_id, clinic_id, doctor_id);

        if let Some(chat_id) = guard.chat_index.get(&key).copied() {
            let chat = guard
                .chats
                .get(&chat_id)
                .cloned()
                .ok_or_else(|| StorageError::internal("chat index points at a missing chat"))?;
            let participants = guard.participants.get(&chat_id).cloned().unwrap_or_default();
            let message_count = guard.messages.get(&chat_id).map_or(0, |m| m.len() as u64);
            return Ok(ChatSnapshot {
                chat,
                participants,
                message_count,
                created: false,
            });
        }

        let created_at = guard.tick();
        let chat = Chat {
            id: generate_id(),
            patient_id,
            last_message_at: None,
            created_at,
        };
        let participants = vec![
            ChatParticipant {
                id: generate_id(),
                chat_id: chat.id,
                party: Party::Clinic(clinic_id),
            },
            ChatParticipant {
                id: generate_id(),
                chat_id: chat.id,
                party: Party::Doctor(doctor_id),
            },
        ];
        guard.chat_index.insert(key, chat.id);
        guard.participants.insert(chat.id, participants.clone());
        guard.messages.insert(chat.id, Vec::new());
        guard.chats.insert(chat.id, chat.clone());

        Ok(ChatSnapshot {
            chat,
            participants,
            message_count: 0,
            created: true,
        })
    }

    async fn chat(&self, id: ChatId) -> Result<Option<Chat>, StorageError> {
        let guard = self.inner.read().await;
        Ok(guard.chats.get(&id).cloned())
    }

    async fn chat_participants(&self, id: ChatId) -> Result<Vec<ChatParticipant>, StorageError> {
        let guard = self.inner.read().await;
        guard
            .participants
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Chat", id))
    }

    async fn append_message(&self, new: NewMessage) -> Result<Message, StorageError> {
        let mut guard = self.inner.write().await;
        let created_at = guard.tick();
        let inner = &mut *guard;

        let chat = inner
            .chats
            .get_mut(&new.chat_id)
            .ok_or_else(|| StorageError::not_found("Chat", new.chat_id))?;

        // A non-participant sender reports the same NotFound as a missing
        // chat, so callers cannot probe for chat existence.
        let is_participant = inner
            .participants
            .get(&new.chat_id)
            .is_some_and(|list| list.iter().any(|p| p.party == new.sender));
        if !is_participant {
            return Err(StorageError::not_found("Chat", new.chat_id));
        }

        let message_id = generate_id();
        let message = Message {
            id: message_id,
            chat_id: new.chat_id,
            content: new.content,
            sender: new.sender,
            attachments: new
                .attachments
                .into_iter()
                .map(|a| a.into_attachment(message_id))
                .collect(),
            created_at,
        };

        chat.last_message_at = Some(created_at);
        inner.message_index.insert(message_id, new.chat_id);
        inner
            .messages
            .entry(new.chat_id)
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn messages_page(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u32,
        order: MessageOrder,
    ) -> Result<MessagePage, StorageError> {
        let guard = self.inner.read().await;
        if !guard.chats.contains_key(&chat_id) {
            return Err(StorageError::not_found("Chat", chat_id));
        }
        let all = guard.messages.get(&chat_id).cloned().unwrap_or_default();
        let total = all.len() as u64;
        let limit = u64::from(limit);

        let messages = match order {
            MessageOrder::ChronologicalAsc => all
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            MessageOrder::NewestFirst => {
                // Cut the window from the newest end, keep it chronological.
                let end = total.saturating_sub(offset);
                let start = end.saturating_sub(limit);
                all[start as usize..end as usize].to_vec()
            }
        };

        Ok(MessagePage { messages, total })
    }

    async fn message(&self, id: MessageId) -> Result<Option<Message>, StorageError> {
        let guard = self.inner.read().await;
        let Some(chat_id) = guard.message_index.get(&id) else {
            return Ok(None);
        };
        Ok(guard
            .messages
            .get(chat_id)
            .and_then(|list| list.iter().find(|m| m.id == id))
            .cloned())
    }

    async fn add_feedback(
        &self,
        patient_id: PatientId,
        content: String,
    ) -> Result<Feedback, StorageError> {
        let mut guard = self.inner.write().await;
        let created_at = guard.tick();
        let inner = &mut *guard;
        let patient = inner
            .patients
            .get(&patient_id)
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))?;
        if patient.status == PatientStatus::Active {
            return Err(StorageError::invalid_record(
                "feedback requires the care episode to be closed",
            ));
        }
        let feedback = Feedback {
            id: generate_id(),
            patient_id,
            content,
            created_at,
        };
        inner
            .feedback
            .entry(patient_id)
            .or_default()
            .push(feedback.clone());
        Ok(feedback)
    }

    async fn feedback_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Feedback>, StorageError> {
        let guard = self.inner.read().await;
        if !guard.patients.contains_key(&patient_id) {
            return Err(StorageError::not_found("Patient", patient_id));
        }
        Ok(guard.feedback.get(&patient_id).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_core::Gender;
    use time::Date;

    fn new_patient(clinic_id: ClinicId) -> NewPatient {
        NewPatient {
            name: "Sam Okafor".into(),
            phone: "+44 20 7946 0123".into(),
            gender: Gender::Female,
            date_of_birth: Date::from_calendar_date(1992, time::Month::July, 3).unwrap(),
            address: "12 Harley Street, London".into(),
            location: None,
            clinic_id,
            procedure_note: None,
        }
    }

    #[tokio::test]
    async fn create_and_read_patient() {
        let store = MemoryStore::new();
        let clinic = generate_id();
        let created = store.create_patient(new_patient(clinic)).await.unwrap();

        let loaded = store.patient(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.clinic_id, clinic);
        assert_eq!(loaded.status, PatientStatus::Active);
        assert!(loaded.doctor_ids.is_empty());
    }

    #[tokio::test]
    async fn assignment_is_idempotent() {
        let store = MemoryStore::new();
        let patient = store
            .create_patient(new_patient(generate_id()))
            .await
            .unwrap();
        let doctor = generate_id();

        store.assign_doctor(patient.id, doctor).await.unwrap();
        let again = store.assign_doctor(patient.id, doctor).await.unwrap();
        assert_eq!(again.doctor_ids, vec![doctor]);

        let removed = store.unassign_doctor(patient.id, doctor).await.unwrap();
        assert!(removed.doctor_ids.is_empty());
    }

    #[tokio::test]
    async fn completion_without_doctors_skips_consent() {
        let store = MemoryStore::new();
        let patient = store
            .create_patient(new_patient(generate_id()))
            .await
            .unwrap();

        let outcome = store
            .accept_completion(patient.id, PartyRole::Clinic)
            .await
            .unwrap();
        let CompletionConsent::Completed(updated) = outcome else {
            panic!("expected immediate completion");
        };
        assert_eq!(updated.status, PatientStatus::Completed);
        assert!(store.pending_completion(patient.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completion_with_doctor_requires_both_parties() {
        let store = MemoryStore::new();
        let patient = store
            .create_patient(new_patient(generate_id()))
            .await
            .unwrap();
        store
            .assign_doctor(patient.id, generate_id())
            .await
            .unwrap();

        let first = store
            .accept_completion(patient.id, PartyRole::Clinic)
            .await
            .unwrap();
        assert!(matches!(first, CompletionConsent::Pending(_)));

        let repeat = store
            .accept_completion(patient.id, PartyRole::Clinic)
            .await
            .unwrap();
        assert!(matches!(repeat, CompletionConsent::AlreadyAccepted(_)));

        let second = store
            .accept_completion(patient.id, PartyRole::Doctor)
            .await
            .unwrap();
        let CompletionConsent::Completed(updated) = second else {
            panic!("expected completion on counterpart acceptance");
        };
        assert_eq!(updated.status, PatientStatus::Completed);
        assert!(store.pending_completion(patient.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chat_creation_is_idempotent_for_triple() {
        let store = MemoryStore::new();
        let (patient, clinic, doctor) = (generate_id(), generate_id(), generate_id());

        let first = store
            .find_or_create_chat(patient, clinic, doctor)
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.participants.len(), 2);

        let second = store
            .find_or_create_chat(patient, clinic, doctor)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.chat.id, first.chat.id);
    }

    #[tokio::test]
    async fn append_rejects_non_participant_as_not_found() {
        let store = MemoryStore::new();
        let snapshot = store
            .find_or_create_chat(generate_id(), generate_id(), generate_id())
            .await
            .unwrap();

        let err = store
            .append_message(NewMessage {
                chat_id: snapshot.chat.id,
                content: "hi".into(),
                sender: Party::Doctor(generate_id()),
                attachments: vec![],
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn append_updates_last_message_at_and_order() {
        let store = MemoryStore::new();
        let clinic = generate_id();
        let snapshot = store
            .find_or_create_chat(generate_id(), clinic, generate_id())
            .await
            .unwrap();
        let chat_id = snapshot.chat.id;

        for i in 0..3 {
            store
                .append_message(NewMessage {
                    chat_id,
                    content: format!("message {i}"),
                    sender: Party::Clinic(clinic),
                    attachments: vec![],
                })
                .await
                .unwrap();
        }

        let chat = store.chat(chat_id).await.unwrap().unwrap();
        assert!(chat.last_message_at.is_some());

        let page = store
            .messages_page(chat_id, 0, 10, MessageOrder::ChronologicalAsc)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let contents: Vec<_> = page.messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["message 0", "message 1", "message 2"]);
        assert!(page.messages[0].created_at < page.messages[2].created_at);
    }

    #[tokio::test]
    async fn newest_first_window_is_cut_from_the_end() {
        let store = MemoryStore::new();
        let clinic = generate_id();
        let snapshot = store
            .find_or_create_chat(generate_id(), clinic, generate_id())
            .await
            .unwrap();
        let chat_id = snapshot.chat.id;

        for i in 0..5 {
            store
                .append_message(NewMessage {
                    chat_id,
                    content: format!("m{i}"),
                    sender: Party::Clinic(clinic),
                    attachments: vec![],
                })
                .await
                .unwrap();
        }

        let page = store
            .messages_page(chat_id, 0, 2, MessageOrder::NewestFirst)
            .await
            .unwrap();
        let contents: Vec<_> = page.messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);

        let next = store
            .messages_page(chat_id, 2, 2, MessageOrder::NewestFirst)
            .await
            .unwrap();
        let contents: Vec<_> = next.messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn feedback_gate_follows_episode_status() {
        let store = MemoryStore::new();
        let patient = store
            .create_patient(new_patient(generate_id()))
            .await
            .unwrap();

        let err = store
            .add_feedback(patient.id, "too early".into())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord { .. }));

        store
            .accept_completion(patient.id, PartyRole::Clinic)
            .await
            .unwrap();
        store
            .add_feedback(patient.id, "smooth recovery".into())
            .await
            .unwrap();

        let entries = store.feedback_for_patient(patient.id).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn delete_patient_cascades_feedback() {
        let store = MemoryStore::new();
        let patient = store
            .create_patient(new_patient(generate_id()))
            .await
            .unwrap();
        store
            .accept_completion(patient.id, PartyRole::Clinic)
            .await
            .unwrap();
        store
            .add_feedback(patient.id, "note".into())
            .await
            .unwrap();

        store.delete_patient(patient.id).await.unwrap();
        assert!(store.patient(patient.id).await.unwrap().is_none());
        assert!(store.feedback_for_patient(patient.id).await.is_err());
    }
}
