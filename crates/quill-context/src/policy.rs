use std::sync::Arc;

use quill_persist::{ChatMessage, PersistError, Result};
use serde::{Deserialize, Serialize};
use tiktoken_rs::{cl100k_base, CoreBPE};

/// How much stored history is handed to the agent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ContextPolicy {
    /// Entire conversation, no truncation
    #[default]
    AllMessages,
    /// Only the newest `k` messages
    LastK { k: usize },
    /// Newest messages that fit into a token budget
    MaxTokens { max_tokens: usize },
}

/// cl100k_base token counter
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    pub fn cl100k() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| PersistError::Internal(format!("Tokenizer error: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCounter(cl100k_base)")
    }
}

impl ContextPolicy {
    /// Trims `messages` (oldest first) according to the policy.
    /// The newest message always survives and relative order is preserved.
    pub fn apply(
        &self,
        messages: Vec<ChatMessage>,
        counter: Option<&TokenCounter>,
    ) -> Vec<ChatMessage> {
        match self {
            Self::AllMessages => messages,
            Self::LastK { k } => {
                let keep = (*k).max(1);
                let skip = messages.len().saturating_sub(keep);
                messages.into_iter().skip(skip).collect()
            }
            Self::MaxTokens { max_tokens } => match counter {
                Some(counter) => keep_within_budget(messages, *max_tokens, counter),
                None => messages,
            },
        }
    }

    pub fn needs_tokenizer(&self) -> bool {
        matches!(self, Self::MaxTokens { .. })
    }
}

fn keep_within_budget(
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    counter: &TokenCounter,
) -> Vec<ChatMessage> {
    let mut used = 0usize;
    let mut keep = 0usize;
    for msg in messages.iter().rev() {
        let tokens = counter.count(&msg.content);
        if keep > 0 && used + tokens > max_tokens {
            break;
        }
        used += tokens;
        keep += 1;
    }
    let skip = messages.len() - keep;
    messages.into_iter().skip(skip).collect()
}
