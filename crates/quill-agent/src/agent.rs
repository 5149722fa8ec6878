use crate::node::{Node, NodeType};
use crate::nodes::{LLMNode, ToolNode};
use crate::router::{NextNode, Router, SimpleRouter};
use crate::tools::ToolExecutor;
use crate::types::{AgentConfig, AgentReply, AgentState, LLMConfig};
use anyhow::Result;
use quill_llm::{ChatClient, Message};
use quill_persist::ChatTurn;
use std::sync::Arc;
use std::time::Instant;

/// LLM wrapped in a bounded tool-calling loop
pub struct Agent {
    llm_client: Arc<dyn ChatClient>,
    tools: Arc<dyn ToolExecutor>,
    config: AgentConfig,
    llm_config: LLMConfig,
    system_prompt: String,
}

enum LoopOutcome {
    Answered,
    Exhausted,
}

impl Agent {
    pub(crate) fn new_with_config(
        llm_client: Arc<dyn ChatClient>,
        tools: Arc<dyn ToolExecutor>,
        config: AgentConfig,
        llm_config: LLMConfig,
        system_prompt: String,
    ) -> Self {
        Self {
            llm_client,
            tools,
            config,
            llm_config,
            system_prompt,
        }
    }

    pub fn builder() -> crate::builder::AgentBuilder {
        crate::builder::AgentBuilder::new()
    }

    pub fn llm_config(&self) -> &LLMConfig {
        &self.llm_config
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Produce one reply for `latest` given the prior `history`.
    ///
    /// Never fails: model errors, timeouts, empty output and an exhausted
    /// iteration budget all yield [`AgentReply::fallback`].
    pub async fn chat(&self, history: Vec<ChatTurn>, latest: ChatTurn) -> AgentReply {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(history.into_iter().map(Message::from));
        messages.push(Message::human(latest.content));

        let mut state = AgentState::new(messages, self.llm_config.clone());
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.config.turn_timeout, self.execute_loop(&mut state)).await;

        let reply = match outcome {
            Ok(Ok(LoopOutcome::Answered)) => match state.final_reply.take() {
                Some(reply) => AgentReply {
                    reply,
                    tool_output: state.tool_output.take(),
                },
                None => {
                    tracing::warn!(run_id = %state.run_id, "model returned no usable output");
                    AgentReply::fallback()
                }
            },
            Ok(Ok(LoopOutcome::Exhausted)) => {
                tracing::warn!(
                    run_id = %state.run_id,
                    max_iterations = self.config.max_iterations,
                    "iteration budget exhausted"
                );
                AgentReply::fallback()
            }
            Ok(Err(e)) => {
                tracing::error!(run_id = %state.run_id, error = %e, "agent turn failed");
                AgentReply::fallback()
            }
            Err(_) => {
                tracing::error!(
                    run_id = %state.run_id,
                    timeout_secs = self.config.turn_timeout.as_secs(),
                    "agent turn timed out"
                );
                AgentReply::fallback()
            }
        };

        tracing::info!(
            run_id = %state.run_id,
            iterations = state.iterations,
            duration_ms = start.elapsed().as_millis() as u64,
            fallback = reply.is_fallback(),
            "agent turn finished"
        );
        reply
    }

    async fn execute_loop(&self, state: &mut AgentState) -> Result<LoopOutcome> {
        let llm_node = LLMNode::new(
            Arc::clone(&self.llm_client),
            self.tools.definitions(),
            self.config.max_iterations,
        );
        let tool_node = ToolNode::new(Arc::clone(&self.tools));
        let router = SimpleRouter;

        let mut current_node = NodeType::LLM;

        loop {
            // Guardrail: max iterations
            if current_node == NodeType::LLM && state.iterations >= self.config.max_iterations {
                return Ok(LoopOutcome::Exhausted);
            }

            match current_node {
                NodeType::LLM => llm_node.execute(state).await?,
                NodeType::Tool => tool_node.execute(state).await?,
            }

            match router.next(state, current_node) {
                NextNode::End => return Ok(LoopOutcome::Answered),
                NextNode::LLM => current_node = NodeType::LLM,
                NextNode::Tool => current_node = NodeType::Tool,
            }
        }
    }
}
