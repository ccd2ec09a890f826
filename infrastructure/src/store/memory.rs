//! In-memory conversation store.
//!
//! Durable persistence formats are outside the core; this adapter backs
//! single-process usage and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use council_application::{ConversationStore, ConversationSummary, StoreError};
use council_domain::{Conversation, ConversationId};

/// Process-local conversation store.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .read()
            .map_err(|e| StoreError::Io(e.to_string()))?
            .get(id)
            .cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.conversations
            .write()
            .map_err(|e| StoreError::Io(e.to_string()))?
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        let conversations = self
            .conversations
            .read()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let mut summaries: Vec<ConversationSummary> = conversations
            .values()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                turn_count: c.turns.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}
