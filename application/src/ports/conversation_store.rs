//! Conversation persistence port
//!
//! The storage format and file-system layout are external concerns; the
//! core only loads and saves whole conversations by id.

use async_trait::async_trait;
use council_domain::{Conversation, ConversationId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Io(String),
}

/// Conversation metadata for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub turn_count: usize,
}

/// Load/save access to conversations
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, id: &ConversationId) -> Result<Option<Conversation>, StoreError>;

    async fn save(&self, conversation: &Conversation) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<ConversationSummary>, StoreError>;
}
