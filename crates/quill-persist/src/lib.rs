pub mod builder;
pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

pub use builder::{PersistClientBuilder, StorageBackend};
pub use dbs::InMemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use dbs::MongoPersistenceClient;
pub use error::{PersistError, Result};
pub use models::{
    ChatMessage, ChatTurn, Conversation, ConversationSummary, Document, DocumentUpdate,
    MessageRole, NewDocument, NewUser, User, UserUpdate, DEFAULT_ROLE,
};
pub use trait_client::{ConversationStore, DocumentStore, PersistenceClient, UserStore};
