use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PersistError, Result};
use crate::models::{
    ChatMessage, Conversation, Document, DocumentUpdate, MessageRole, NewDocument, NewUser, User,
    UserUpdate,
};
use crate::trait_client::{ConversationStore, DocumentStore, PersistenceClient, UserStore};

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    documents: HashMap<String, Document>,
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

/// Process-local backend for development and tests. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryPersistenceClient {
    state: RwLock<MemoryState>,
}

impl InMemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// Keeps timestamps non-decreasing when the wall clock does not advance or steps back
fn monotonic_now(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

fn by_recent_update(docs: &mut [Document]) {
    docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

#[async_trait]
impl UserStore for InMemoryPersistenceClient {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(PersistError::EmailTaken(user.email));
        }

        let created = User {
            id: new_id(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| PersistError::UserNotFound(user_id.to_string()))?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl DocumentStore for InMemoryPersistenceClient {
    async fn create_document(&self, user_id: &str, document: NewDocument) -> Result<Document> {
        let now = Utc::now();
        let created = Document {
            id: new_id(),
            user_id: user_id.to_string(),
            title: document.title,
            content: document.content,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.write().await;
        state.documents.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_document(&self, user_id: &str, document_id: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(document_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut docs: Vec<Document> = state
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        by_recent_update(&mut docs);
        Ok(docs)
    }

    async fn update_document(
        &self,
        user_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document> {
        let mut state = self.state.write().await;
        let doc = state
            .documents
            .get_mut(document_id)
            .filter(|d| d.user_id == user_id)
            .ok_or_else(|| PersistError::DocumentNotFound(document_id.to_string()))?;

        if let Some(title) = update.title {
            doc.title = title;
        }
        if let Some(content) = update.content {
            doc.content = content;
        }
        doc.updated_at = monotonic_now(Some(doc.updated_at));
        Ok(doc.clone())
    }

    async fn delete_document(&self, user_id: &str, document_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let owned = state
            .documents
            .get(document_id)
            .is_some_and(|d| d.user_id == user_id);
        if !owned {
            return Err(PersistError::DocumentNotFound(document_id.to_string()));
        }
        state.documents.remove(document_id);
        Ok(())
    }

    async fn search_documents(&self, user_id: &str, query: &str) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut docs: Vec<Document> = state
            .documents
            .values()
            .filter(|d| d.user_id == user_id && d.matches(query))
            .cloned()
            .collect();
        by_recent_update(&mut docs);
        Ok(docs)
    }
}

#[async_trait]
impl ConversationStore for InMemoryPersistenceClient {
    async fn insert_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.conversations.contains_key(conversation_id) {
            return Ok(false);
        }

        let now = Utc::now();
        state.conversations.insert(
            conversation_id.to_string(),
            Conversation {
                id: conversation_id.to_string(),
                user_id: user_id.to_string(),
                created_at: now,
                last_updated: now,
            },
        );
        state.messages.insert(conversation_id.to_string(), Vec::new());
        Ok(true)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self.state.read().await.conversations.get(conversation_id).cloned())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let state = self.state.read().await;
        let mut convs: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        convs.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(convs)
    }

    async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let owned = state
            .conversations
            .get(conversation_id)
            .is_some_and(|c| c.user_id == user_id);
        if !owned {
            return Err(PersistError::ConversationNotFound(conversation_id.to_string()));
        }
        state.conversations.remove(conversation_id);
        state.messages.remove(conversation_id);
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| PersistError::ConversationNotFound(conversation_id.to_string()))?;
        let messages = state.messages.entry(conversation_id.to_string()).or_default();

        let timestamp = monotonic_now(messages.last().map(|m| m.timestamp));
        let message = ChatMessage {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        };
        messages.push(message.clone());
        conversation.last_updated = timestamp;
        Ok(message)
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let state = self.state.read().await;
        Ok(state.messages.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn count_messages(&self, conversation_id: &str) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .get(conversation_id)
            .map(|m| m.len() as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl PersistenceClient for InMemoryPersistenceClient {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn document_store(self: Arc<Self>) -> Arc<dyn DocumentStore> {
        self
    }

    fn conversation_store(self: Arc<Self>) -> Arc<dyn ConversationStore> {
        self
    }
}
