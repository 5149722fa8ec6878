mod manager;
mod policy;

pub use manager::{ConversationManager, ConversationWithMessages};
pub use policy::{ContextPolicy, TokenCounter};
