pub mod agent;
pub mod builder;
pub mod node;
pub mod nodes;
pub mod prompt;
pub mod router;
pub mod tools;
pub mod types;

pub use agent::Agent;
pub use builder::AgentBuilder;
pub use node::{Node, NodeType};
pub use router::{NextNode, Router, SimpleRouter};
pub use tools::{
    AgentTool, KnowledgeBaseTool, ToolExecutor, ToolObservation, ToolRegistry, WebSearchTool,
};
pub use types::{AgentConfig, AgentReply, AgentState, LLMConfig, FALLBACK_REPLY};
