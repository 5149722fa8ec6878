use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ChatMessage, Conversation, Document, DocumentUpdate, MessageRole, NewDocument, NewUser, User,
    UserUpdate,
};

/// Account storage
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `EmailTaken` when the email is already registered
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with `UserNotFound` when no such user exists
    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<User>;
}

/// Document storage. Every lookup is scoped to the owning user.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(&self, user_id: &str, document: NewDocument) -> Result<Document>;

    async fn get_document(&self, user_id: &str, document_id: &str) -> Result<Option<Document>>;

    /// Most recently updated first
    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>>;

    /// Applies the given fields and refreshes `updated_at`
    async fn update_document(
        &self,
        user_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document>;

    async fn delete_document(&self, user_id: &str, document_id: &str) -> Result<()>;

    /// Case-insensitive substring match on title or content, most recently updated first
    async fn search_documents(&self, user_id: &str, query: &str) -> Result<Vec<Document>>;
}

/// Conversation and message storage
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns `false` without touching anything if the id already exists
    async fn insert_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Most recently active first
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Removes the conversation and all of its messages
    async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<()>;

    /// Appends a message and refreshes the conversation's `last_updated`
    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage>;

    /// All messages in insertion order
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;

    async fn count_messages(&self, conversation_id: &str) -> Result<u64>;
}

/// A complete storage backend
#[async_trait]
pub trait PersistenceClient: UserStore + DocumentStore + ConversationStore {
    /// Round trip to the backend, used by health checks
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;

    fn document_store(self: Arc<Self>) -> Arc<dyn DocumentStore>;

    fn conversation_store(self: Arc<Self>) -> Arc<dyn ConversationStore>;
}
