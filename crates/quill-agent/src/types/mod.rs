pub mod config;
pub mod reply;
pub mod state;

pub use config::{AgentConfig, LLMConfig, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
pub use reply::{AgentReply, FALLBACK_REPLY};
pub use state::AgentState;
