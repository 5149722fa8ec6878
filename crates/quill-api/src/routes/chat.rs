use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use quill_context::{ConversationManager, ConversationWithMessages};
use quill_persist::{ChatMessage, ConversationSummary, MessageRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncomingMessage {
    /// `user` or `assistant`
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequestBody {
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub conversation_id: Option<String>,
    /// Model override for this turn
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponseBody {
    pub response: String,
    pub conversation_id: String,
    /// Search hits or knowledge-base text from the last qualifying tool call
    #[schema(value_type = Option<Object>)]
    pub tool_output: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversationSummaryResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub message_count: u64,
}

impl From<ConversationSummary> for ConversationSummaryResponse {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            created_at: summary.created_at,
            last_updated: summary.last_updated,
            message_count: summary.message_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(msg: ChatMessage) -> Self {
        Self {
            id: msg.id,
            role: msg.role.as_str().to_string(),
            content: msg.content,
            timestamp: msg.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub messages: Vec<MessageResponse>,
}

impl From<ConversationWithMessages> for ConversationResponse {
    fn from(detail: ConversationWithMessages) -> Self {
        Self {
            id: detail.conversation.id,
            user_id: detail.conversation.user_id,
            created_at: detail.conversation.created_at,
            last_updated: detail.conversation.last_updated,
            messages: detail.messages.into_iter().map(MessageResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

fn parse_messages(messages: Vec<IncomingMessage>) -> ApiResult<Vec<(MessageRole, String)>> {
    if messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    messages
        .into_iter()
        .map(|m| {
            let role = m.role.parse::<MessageRole>().map_err(ApiError::BadRequest)?;
            Ok((role, m.content))
        })
        .collect()
}

/// One assistant turn
///
/// Creates the conversation when no id is given, stores the incoming messages, runs the
/// agent over the stored history and stores its reply.
#[utoipa::path(
    post,
    path = "/chat",
    params(
        ("conversation_id" = Option<String>, Query, description = "Existing conversation, omitted to start a new one"),
        ("model" = Option<String>, Query, description = "Model override")
    ),
    request_body = ChatRequestBody,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponseBody),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Conversation not found"),
        (status = 503, description = "LLM not configured")
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ChatQuery>,
    Json(req): Json<ChatRequestBody>,
) -> ApiResult<Json<ChatResponseBody>> {
    let messages = parse_messages(req.messages)?;
    let model = query.model.as_deref().filter(|m| !m.trim().is_empty());
    let agent = state.agent_for(&user.id, model)?;

    let conversations = &state.conversations;
    let conversation_id = match query.conversation_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => {
            let id = ConversationManager::new_conversation_id();
            conversations.create_conversation(&user.id, &id).await?;
            id
        }
    };

    for (role, content) in &messages {
        conversations
            .add_message(&user.id, &conversation_id, *role, content)
            .await?;
    }

    let mut history = conversations.get_context(&user.id, &conversation_id).await?;
    let latest = history
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("empty context after append")))?;

    tracing::info!(
        conversation_id = %conversation_id,
        user_id = %user.id,
        history_len = history.len(),
        model = %agent.llm_config().model,
        "chat turn"
    );

    let reply = agent.chat(history, latest).await;

    conversations
        .add_message(&user.id, &conversation_id, MessageRole::Assistant, &reply.reply)
        .await?;

    Ok(Json(ChatResponseBody {
        response: reply.reply,
        conversation_id,
        tool_output: reply.tool_output,
    }))
}

/// The caller's conversations, most recently active first
#[utoipa::path(
    get,
    path = "/chat/conversations",
    responses(
        (status = 200, description = "Conversation summaries", body = [ConversationSummaryResponse])
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<ConversationSummaryResponse>>> {
    let summaries = state.conversations.get_user_conversations(&user.id).await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(ConversationSummaryResponse::from)
            .collect(),
    ))
}

/// A conversation with its messages in order
#[utoipa::path(
    get,
    path = "/chat/conversation/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<ConversationResponse>> {
    let detail = state
        .conversations
        .get_conversation(&user.id, &conversation_id)
        .await?;
    Ok(Json(detail.into()))
}

/// Delete a conversation and all of its messages
#[utoipa::path(
    delete,
    path = "/chat/conversation/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation ID")
    ),
    responses(
        (status = 204, description = "Conversation deleted"),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .conversations
        .delete_conversation(&user.id, &conversation_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Models offered by the configured provider
///
/// Empty when no key is configured or the provider cannot be reached.
#[utoipa::path(
    get,
    path = "/chat/models",
    responses(
        (status = 200, description = "Available models", body = ModelsResponse)
    ),
    security(("bearer" = [])),
    tag = "chat"
)]
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
) -> Json<ModelsResponse> {
    let models = match &state.llm_client {
        Some(client) => client.list_models().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to list models");
            Vec::new()
        }),
        None => Vec::new(),
    };
    Json(ModelsResponse { models })
}
