// Provider configuration and client factory

use crate::openai::{OpenAIClient, DEFAULT_API_BASE};
use crate::traits::ChatClient;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Connection details for an OpenAI-compatible provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Base URL, defaults to the Groq endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_API_BASE)
    }
}

/// Builds chat clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_chat_client(config: ProviderConfig) -> Result<Arc<dyn ChatClient>> {
        let base_url = config.base_url().to_string();
        let client = OpenAIClient::with_base_url(config.api_key, base_url)?;
        Ok(Arc::new(client))
    }
}
