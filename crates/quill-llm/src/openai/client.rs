// OpenAI-compatible chat completions client (Groq, OpenAI, local gateways)

use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::{Content, ContentPart, Message, ToolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for any OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create a client against the default provider
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_API_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_chat_request(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: &ChatOptions,
    ) -> Result<Value> {
        let messages: Vec<Value> = messages.into_iter().map(convert_message).collect();

        let mut request = Map::new();
        request.insert("model".to_string(), json!(model));
        request.insert("messages".to_string(), Value::Array(messages));

        if let Some(temp) = options.temperature {
            request.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tokens) = options.max_tokens {
            request.insert("max_tokens".to_string(), json!(max_tokens));
        }
        if let Some(tools) = &options.tools {
            if !tools.is_empty() {
                request.insert("tools".to_string(), serde_json::to_value(tools)?);
            }
        }
        if let Some(tool_choice) = &options.tool_choice {
            request.insert("tool_choice".to_string(), serde_json::to_value(tool_choice)?);
        }

        Ok(Value::Object(request))
    }
}

fn convert_message(message: Message) -> Value {
    match message {
        Message::System { content } => json!({
            "role": "system",
            "content": convert_content(content),
        }),
        Message::Human { content } => json!({
            "role": "user",
            "content": convert_content(content),
        }),
        Message::AI { content, tool_calls } => {
            let mut obj = Map::new();
            obj.insert("role".to_string(), json!("assistant"));
            // Some providers reject an assistant turn without a content key
            obj.insert(
                "content".to_string(),
                content.map(convert_content).unwrap_or(Value::Null),
            );
            if let Some(tool_calls) = tool_calls {
                obj.insert("tool_calls".to_string(), json!(tool_calls));
            }
            Value::Object(obj)
        }
        Message::Tool { tool_call_id, content } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": convert_content(content),
        }),
    }
}

fn convert_content(content: Content) -> Value {
    match content {
        Content::Text(s) => json!(s),
        Content::Parts(parts) => Value::Array(
            parts
                .into_iter()
                .map(|ContentPart::Text { text }| json!({ "type": "text", "text": text }))
                .collect(),
        ),
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request.model, request.messages, &request.options)?;

        tracing::debug!(model = %request.model, "sending chat completion request");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error ({}): {}", status, error_text);
        }

        let raw: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        let choice = raw.choices.into_iter().next();
        let (message, finish_reason) = match choice {
            Some(c) => (Some(c.message), c.finish_reason),
            None => (None, None),
        };

        Ok(ChatResponse {
            content: message.as_ref().and_then(|m| m.content.clone()),
            tool_calls: message.and_then(|m| m.tool_calls),
            usage: raw.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error ({}): {}", status, error_text);
        }

        let raw: ModelList = response
            .json()
            .await
            .context("Failed to parse model list")?;

        Ok(raw.data.into_iter().map(|m| m.id).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Tool, ToolChoice};

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAIClient::with_base_url("key", "http://localhost:1234/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }

    #[test]
    fn test_build_chat_request_includes_tools() {
        let client = OpenAIClient::new("key").unwrap();
        let options = ChatOptions::new()
            .temperature(0.7)
            .tools(vec![Tool::new("t", "d", json!({"type": "object"}))])
            .tool_choice(ToolChoice::auto());

        let payload = client
            .build_chat_request("m", vec![Message::human("hi")], &options)
            .unwrap();

        assert_eq!(payload["model"], "m");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["tools"][0]["function"]["name"], "t");
        assert_eq!(payload["tool_choice"], "auto");
        assert!(payload.get("max_tokens").is_none());
    }

    #[test]
    fn test_assistant_tool_call_message_has_null_content() {
        let msg = Message::ai_with_tools(vec![ToolCall::new("c1", "t", "{}")]);
        let value = convert_message(msg);
        assert_eq!(value["role"], "assistant");
        assert!(value["content"].is_null());
        assert_eq!(value["tool_calls"][0]["id"], "c1");
    }
}
