use crate::node::{Node, NodeType};
use crate::types::AgentState;
use anyhow::Result;
use async_trait::async_trait;
use quill_llm::{ChatClient, ChatOptions, ChatRequest, Content, Message, Tool, ToolChoice};
use std::sync::Arc;

/// Calls the model once and records its answer in the state
pub struct LLMNode {
    client: Arc<dyn ChatClient>,
    tools: Vec<Tool>,
    max_iterations: usize,
}

impl LLMNode {
    pub fn new(client: Arc<dyn ChatClient>, tools: Vec<Tool>, max_iterations: usize) -> Self {
        Self {
            client,
            tools,
            max_iterations,
        }
    }

    fn build_request(&self, state: &AgentState) -> ChatRequest {
        let mut options = ChatOptions::new();

        if !self.tools.is_empty() {
            // Last allowed call must produce an answer
            let choice = if state.iterations + 1 >= self.max_iterations {
                ToolChoice::none()
            } else {
                ToolChoice::auto()
            };
            options = options.tools(self.tools.clone()).tool_choice(choice);
        }
        if let Some(temp) = state.llm_config.temperature {
            options = options.temperature(temp);
        }
        if let Some(max_tokens) = state.llm_config.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        ChatRequest::new(state.llm_config.model.clone(), state.messages.clone()).with_options(options)
    }
}

#[async_trait]
impl Node for LLMNode {
    async fn execute(&self, state: &mut AgentState) -> Result<()> {
        let request = self.build_request(state);
        state.iterations += 1;

        tracing::debug!(
            run_id = %state.run_id,
            iteration = state.iterations,
            model = %state.llm_config.model,
            "calling model"
        );
        let response = self.client.chat(request).await?;

        let content = response
            .content
            .clone()
            .filter(|c| !c.trim().is_empty());

        // At most one tool per iteration; every call kept in history must get a result
        let tool_calls = response
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
            .map(|call| vec![call]);

        if tool_calls.is_none() {
            state.final_reply = content.clone();
        }

        state.add_message(Message::AI {
            content: content.map(Content::text),
            tool_calls,
        });

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::LLM
    }
}
