mod knowledge_base;
mod web_search;

pub use knowledge_base::KnowledgeBaseTool;
pub use web_search::{WebSearchTool, SERPER_ENDPOINT};

use anyhow::Result;
use async_trait::async_trait;
use quill_llm::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a tool hands back to the loop
#[derive(Debug, Clone, PartialEq)]
pub enum ToolObservation {
    /// Structured list of records, e.g. search hits
    Records(Vec<Value>),
    /// Free text, e.g. a document body
    Text(String),
}

impl ToolObservation {
    /// Rendering fed back to the model as the tool message
    pub fn to_model_content(&self) -> String {
        match self {
            Self::Records(records) => Value::Array(records.clone()).to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Value surfaced to the caller, if this observation qualifies
    pub fn as_tool_output(&self) -> Option<Value> {
        match self {
            Self::Records(records) if records.first().is_some_and(Value::is_object) => {
                Some(Value::Array(records.clone()))
            }
            Self::Records(_) => None,
            Self::Text(text) => Some(Value::String(text.clone())),
        }
    }
}

/// A single callable capability
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;

    /// Schema advertised to the model
    fn definition(&self) -> Tool;

    /// Errors are reported back to the model, they never abort the turn
    async fn call(&self, arguments: Value) -> Result<ToolObservation>;
}

/// Executes tools on behalf of the loop
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, arguments: &str) -> Result<ToolObservation>;

    fn definitions(&self) -> Vec<Tool>;
}

/// Name-indexed set of tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn AgentTool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: Arc<dyn AgentTool>) -> Self {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, tool_name: &str, arguments: &str) -> Result<ToolObservation> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", tool_name))?;

        let args: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| anyhow::anyhow!("Invalid arguments for {}: {}", tool_name, e))?
        };

        tool.call(args).await
    }

    fn definitions(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }
}
