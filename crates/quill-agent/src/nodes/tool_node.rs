use crate::node::{Node, NodeType};
use crate::tools::ToolExecutor;
use crate::types::AgentState;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Runs the pending tool call and feeds its observation back
pub struct ToolNode {
    executor: Arc<dyn ToolExecutor>,
}

impl ToolNode {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn execute(&self, state: &mut AgentState) -> Result<()> {
        let Some(tool_call) = state.get_pending_tool_calls().into_iter().next() else {
            return Ok(());
        };

        let start = Instant::now();
        let name = tool_call.function.name.as_str();

        let result = match self
            .executor
            .execute(name, &tool_call.function.arguments)
            .await
        {
            Ok(observation) => {
                if let Some(output) = observation.as_tool_output() {
                    state.tool_output = Some(output);
                }
                tracing::info!(
                    run_id = %state.run_id,
                    tool = %name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "tool finished"
                );
                observation.to_model_content()
            }
            Err(e) => {
                // Resilient: the model sees the failure and may recover
                tracing::warn!(run_id = %state.run_id, tool = %name, error = %e, "tool failed");
                format!("Tool execution failed: {}", e)
            }
        };

        state.add_tool_result(tool_call.id, result);
        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tool
    }
}
