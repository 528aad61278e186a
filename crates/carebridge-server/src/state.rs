//! Shared application state.

use std::sync::Arc;

use carebridge_coordination::{
    AssignmentRegistry, ChatRegistry, MessageService, PatientService, StatusTransitionCoordinator,
};
use carebridge_realtime::RealtimeBroadcaster;
use carebridge_storage::CareStore;

/// Handles to the coordination services, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub patients: PatientService,
    pub coordinator: StatusTransitionCoordinator,
    pub assignments: AssignmentRegistry,
    pub chats: ChatRegistry,
    pub messages: MessageService,
}

impl AppState {
    /// Wires the services over a store and a broadcaster.
    #[must_use]
    pub fn new(store: Arc<dyn CareStore>, broadcaster: Arc<dyn RealtimeBroadcaster>) -> Self {
        Self {
            patients: PatientService::new(store.clone()),
            coordinator: StatusTransitionCoordinator::new(store.clone()),
            assignments: AssignmentRegistry::new(store.clone()),
            chats: ChatRegistry::new(store.clone()),
            messages: MessageService::new(store, broadcaster),
        }
    }

    /// Replaces the message service, e.g. to apply a broadcast timeout.
    #[must_use]
    pub fn with_messages(mut self, messages: MessageService) -> Self {
        self.messages = messages;
        self
    }
}
