use std::sync::Arc;

use quill_persist::{
    ChatMessage, ChatTurn, Conversation, ConversationStore, ConversationSummary, MessageRole,
    PersistError, Result,
};
use serde::Serialize;

use crate::policy::{ContextPolicy, TokenCounter};

/// A conversation together with its full, ordered message history
#[derive(Debug, Clone, Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<ChatMessage>,
}

/// User-scoped conversation operations on top of a [`ConversationStore`].
///
/// A conversation owned by somebody else is reported exactly like a missing one.
#[derive(Clone)]
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    policy: ContextPolicy,
    counter: Option<TokenCounter>,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            policy: ContextPolicy::AllMessages,
            counter: None,
        }
    }

    /// Switch the context policy, loading the tokenizer when the policy needs one
    pub fn with_policy(mut self, policy: ContextPolicy) -> Result<Self> {
        self.counter = if policy.needs_tokenizer() {
            Some(TokenCounter::cl100k()?)
        } else {
            None
        };
        self.policy = policy;
        Ok(self)
    }

    pub fn policy(&self) -> &ContextPolicy {
        &self.policy
    }

    /// Fresh opaque conversation identifier
    pub fn new_conversation_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Creates the conversation if it does not exist yet. Calling it again for the
    /// same owner is a no-op.
    pub async fn create_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation> {
        if self.store.insert_conversation(user_id, conversation_id).await? {
            tracing::info!(conversation_id = %conversation_id, user_id = %user_id, "created conversation");
        }
        self.owned(user_id, conversation_id).await
    }

    pub async fn add_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        self.owned(user_id, conversation_id).await?;
        self.store
            .append_message(conversation_id, role, content)
            .await
    }

    /// Ordered history for the agent, trimmed by the configured policy
    pub async fn get_context(&self, user_id: &str, conversation_id: &str) -> Result<Vec<ChatTurn>> {
        self.owned(user_id, conversation_id).await?;
        let messages = self.store.get_messages(conversation_id).await?;
        let total = messages.len();

        let kept = self.policy.apply(messages, self.counter.as_ref());
        if kept.len() < total {
            tracing::debug!(
                conversation_id = %conversation_id,
                total,
                kept = kept.len(),
                "context window trimmed"
            );
        }

        Ok(kept.into_iter().map(ChatTurn::from).collect())
    }

    /// Caller's conversations, most recently active first
    pub async fn get_user_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let conversations = self.store.list_conversations(user_id).await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conv in conversations {
            let message_count = self.store.count_messages(&conv.id).await?;
            summaries.push(ConversationSummary {
                id: conv.id,
                created_at: conv.created_at,
                last_updated: conv.last_updated,
                message_count,
            });
        }
        Ok(summaries)
    }

    pub async fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<ConversationWithMessages> {
        let conversation = self.owned(user_id, conversation_id).await?;
        let messages = self.store.get_messages(conversation_id).await?;
        Ok(ConversationWithMessages {
            conversation,
            messages,
        })
    }

    pub async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<()> {
        self.store
            .delete_conversation(user_id, conversation_id)
            .await?;
        tracing::info!(conversation_id = %conversation_id, "deleted conversation");
        Ok(())
    }

    async fn owned(&self, user_id: &str, conversation_id: &str) -> Result<Conversation> {
        self.store
            .get_conversation(conversation_id)
            .await?
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| PersistError::ConversationNotFound(conversation_id.to_string()))
    }
}
