use crate::types::AgentState;
use anyhow::Result;
use async_trait::async_trait;

/// One step of the agent loop
#[async_trait]
pub trait Node: Send + Sync {
    async fn execute(&self, state: &mut AgentState) -> Result<()>;

    fn node_type(&self) -> NodeType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    LLM,
    Tool,
}
