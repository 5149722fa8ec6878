pub mod conversation;
pub mod document;
pub mod message;
pub mod user;

pub use conversation::MongoConversationRepository;
pub use document::MongoDocumentRepository;
pub use message::MongoMessageRepository;
pub use user::MongoUserRepository;

use mongodb::error::{ErrorKind, WriteFailure};

const DUPLICATE_KEY: i32 = 11000;

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}
