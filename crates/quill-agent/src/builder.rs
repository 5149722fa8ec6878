use crate::agent::Agent;
use crate::prompt::SYSTEM_PROMPT;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::types::{AgentConfig, LLMConfig};
use anyhow::{anyhow, Result};
use quill_llm::ChatClient;
use std::sync::Arc;

/// Builder for an [`Agent`]. Cheap enough to run per request.
pub struct AgentBuilder {
    llm_client: Option<Arc<dyn ChatClient>>,
    tools: Option<Arc<dyn ToolExecutor>>,
    config: AgentConfig,
    llm_config: LLMConfig,
    system_prompt: String,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            llm_client: None,
            tools: None,
            config: AgentConfig::default(),
            llm_config: LLMConfig::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    pub fn tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn llm_config(mut self, llm_config: LLMConfig) -> Self {
        self.llm_config = llm_config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn build(self) -> Result<Agent> {
        let llm_client = self
            .llm_client
            .ok_or_else(|| anyhow!("LLM client is required"))?;
        let tools = self
            .tools
            .unwrap_or_else(|| Arc::new(ToolRegistry::new()) as Arc<dyn ToolExecutor>);

        Ok(Agent::new_with_config(
            llm_client,
            tools,
            self.config,
            self.llm_config,
            self.system_prompt,
        ))
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
