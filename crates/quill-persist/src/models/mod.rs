pub mod conversation;
pub mod document;
pub mod user;

pub use conversation::{ChatMessage, ChatTurn, Conversation, ConversationSummary, MessageRole};
pub use document::{Document, DocumentUpdate, NewDocument};
pub use user::{NewUser, User, UserUpdate, DEFAULT_ROLE};
