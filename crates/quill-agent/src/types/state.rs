use crate::types::config::LLMConfig;
use quill_llm::{Content, Message, ToolCall};
use serde_json::Value;

/// Mutable state threaded through one agent turn
#[derive(Debug, Clone)]
pub struct AgentState {
    pub run_id: String,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
    /// Latest observation worth surfacing to the caller
    pub tool_output: Option<Value>,
    /// Set once the model answers without requesting a tool
    pub final_reply: Option<String>,
    /// Model calls made so far
    pub iterations: usize,
}

impl AgentState {
    pub fn new(messages: Vec<Message>, llm_config: LLMConfig) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            messages,
            llm_config,
            tool_output: None,
            final_reply: None,
            iterations: 0,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        matches!(
            self.last_message(),
            Some(Message::AI { tool_calls: Some(calls), .. }) if !calls.is_empty()
        )
    }

    pub fn get_pending_tool_calls(&self) -> Vec<ToolCall> {
        match self.last_message() {
            Some(Message::AI {
                tool_calls: Some(calls),
                ..
            }) => calls.clone(),
            _ => Vec::new(),
        }
    }

    pub fn add_tool_result(&mut self, tool_call_id: String, result: String) {
        self.messages.push(Message::Tool {
            tool_call_id,
            content: Content::text(result),
        });
    }
}
