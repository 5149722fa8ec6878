use std::sync::Arc;

use async_trait::async_trait;
use bson::doc;
use mongodb::Client;

use crate::dbs::mongo::repositories::{
    MongoConversationRepository, MongoDocumentRepository, MongoMessageRepository,
    MongoUserRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{
    ChatMessage, Conversation, Document, DocumentUpdate, MessageRole, NewDocument, NewUser, User,
    UserUpdate,
};
use crate::trait_client::{ConversationStore, DocumentStore, PersistenceClient, UserStore};

pub struct MongoPersistenceClient {
    client: Client,
    database: String,
    user_repo: MongoUserRepository,
    document_repo: MongoDocumentRepository,
    conversation_repo: MongoConversationRepository,
    message_repo: MongoMessageRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB, create repositories and make sure indexes exist
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let persist = Self {
            user_repo: MongoUserRepository::new(&client, database),
            document_repo: MongoDocumentRepository::new(&client, database),
            conversation_repo: MongoConversationRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
            database: database.to_string(),
            client,
        };

        persist.user_repo.ensure_indexes().await?;
        persist.message_repo.ensure_indexes().await?;
        tracing::info!(database = %database, "connected to MongoDB");

        Ok(persist)
    }
}

#[async_trait]
impl UserStore for MongoPersistenceClient {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        Ok(self.user_repo.create_user(user).await?.into())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.user_repo.get_user(user_id).await?.map(Into::into))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.user_repo.get_user_by_email(email).await?.map(Into::into))
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<User> {
        Ok(self.user_repo.update_user(user_id, update).await?.into())
    }
}

#[async_trait]
impl DocumentStore for MongoPersistenceClient {
    async fn create_document(&self, user_id: &str, document: NewDocument) -> Result<Document> {
        Ok(self.document_repo.create_document(user_id, document).await?.into())
    }

    async fn get_document(&self, user_id: &str, document_id: &str) -> Result<Option<Document>> {
        Ok(self
            .document_repo
            .get_document(user_id, document_id)
            .await?
            .map(Into::into))
    }

    async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let docs = self.document_repo.list_documents(user_id).await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn update_document(
        &self,
        user_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<Document> {
        Ok(self
            .document_repo
            .update_document(user_id, document_id, update)
            .await?
            .into())
    }

    async fn delete_document(&self, user_id: &str, document_id: &str) -> Result<()> {
        self.document_repo.delete_document(user_id, document_id).await
    }

    async fn search_documents(&self, user_id: &str, query: &str) -> Result<Vec<Document>> {
        let docs = self.document_repo.search_documents(user_id, query).await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ConversationStore for MongoPersistenceClient {
    async fn insert_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool> {
        self.conversation_repo
            .insert_conversation(user_id, conversation_id)
            .await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self
            .conversation_repo
            .get_conversation(conversation_id)
            .await?
            .map(Into::into))
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let convs = self.conversation_repo.list_conversations(user_id).await?;
        Ok(convs.into_iter().map(Into::into).collect())
    }

    async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        if !self
            .conversation_repo
            .delete_conversation(user_id, conversation_id)
            .await?
        {
            return Err(PersistError::ConversationNotFound(conversation_id.to_string()));
        }
        let removed = self.message_repo.delete_for_conversation(conversation_id).await?;
        tracing::debug!(conversation_id = %conversation_id, removed, "deleted conversation messages");
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        if self
            .conversation_repo
            .get_conversation(conversation_id)
            .await?
            .is_none()
        {
            return Err(PersistError::ConversationNotFound(conversation_id.to_string()));
        }

        let message = self
            .message_repo
            .save_message(conversation_id, role, content)
            .await?;
        self.conversation_repo
            .touch(conversation_id, message.timestamp)
            .await?;
        Ok(message.into())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let messages = self.message_repo.get_messages(conversation_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn count_messages(&self, conversation_id: &str) -> Result<u64> {
        self.message_repo.count_messages(conversation_id).await
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    fn document_store(self: Arc<Self>) -> Arc<dyn DocumentStore> {
        self
    }

    fn conversation_store(self: Arc<Self>) -> Arc<dyn ConversationStore> {
        self
    }
}
