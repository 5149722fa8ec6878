use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FALLBACK_REPLY: &str = "I'm not sure how to respond to that.";

/// Outcome of one agent turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub reply: String,
    pub tool_output: Option<Value>,
}

impl AgentReply {
    pub fn fallback() -> Self {
        Self {
            reply: FALLBACK_REPLY.to_string(),
            tool_output: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.reply == FALLBACK_REPLY
    }
}
