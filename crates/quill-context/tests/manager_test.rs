use std::sync::Arc;

use quill_context::{ContextPolicy, ConversationManager};
use quill_persist::{ConversationStore, InMemoryPersistenceClient, MessageRole, PersistError};

fn setup() -> (Arc<InMemoryPersistenceClient>, ConversationManager) {
    let store = Arc::new(InMemoryPersistenceClient::new());
    let manager = ConversationManager::new(store.clone());
    (store, manager)
}

#[tokio::test]
async fn test_create_conversation_is_idempotent() {
    let (store, manager) = setup();

    let first = manager.create_conversation("alice", "conv-1").await.unwrap();
    manager
        .add_message("alice", "conv-1", MessageRole::User, "hello")
        .await
        .unwrap();
    let second = manager.create_conversation("alice", "conv-1").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(store.list_conversations("alice").await.unwrap().len(), 1);
    assert_eq!(store.count_messages("conv-1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_conversation_with_foreign_id_is_not_found() {
    let (_, manager) = setup();
    manager.create_conversation("alice", "conv-1").await.unwrap();

    let err = manager.create_conversation("bob", "conv-1").await.unwrap_err();
    assert!(matches!(err, PersistError::ConversationNotFound(_)));
}

#[tokio::test]
async fn test_add_message_to_missing_conversation() {
    let (store, manager) = setup();

    let err = manager
        .add_message("alice", "nope", MessageRole::User, "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, PersistError::ConversationNotFound(_)));
    assert_eq!(store.count_messages("nope").await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_message_to_foreign_conversation_creates_nothing() {
    let (store, manager) = setup();
    manager.create_conversation("alice", "conv-1").await.unwrap();

    let err = manager
        .add_message("bob", "conv-1", MessageRole::User, "sneaky")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.count_messages("conv-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_context_returns_ordered_turns() {
    let (store, manager) = setup();
    manager.create_conversation("alice", "conv-1").await.unwrap();
    manager.create_conversation("alice", "conv-2").await.unwrap();

    manager
        .add_message("alice", "conv-1", MessageRole::User, "first")
        .await
        .unwrap();
    manager
        .add_message("alice", "conv-2", MessageRole::User, "elsewhere")
        .await
        .unwrap();
    manager
        .add_message("alice", "conv-1", MessageRole::Assistant, "second")
        .await
        .unwrap();
    manager
        .add_message("alice", "conv-1", MessageRole::User, "third")
        .await
        .unwrap();

    let context = manager.get_context("alice", "conv-1").await.unwrap();
    let contents: Vec<_> = context.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert_eq!(context[1].role, MessageRole::Assistant);

    let stored = store.get_messages("conv-1").await.unwrap();
    assert!(stored.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_get_context_of_foreign_conversation() {
    let (_, manager) = setup();
    manager.create_conversation("alice", "conv-1").await.unwrap();

    let err = manager.get_context("bob", "conv-1").await.unwrap_err();
    assert!(matches!(err, PersistError::ConversationNotFound(_)));
}

#[tokio::test]
async fn test_last_k_policy_limits_context() {
    let (store, _) = setup();
    let manager = ConversationManager::new(store.clone())
        .with_policy(ContextPolicy::LastK { k: 2 })
        .unwrap();
    manager.create_conversation("alice", "conv-1").await.unwrap();
    for text in ["a", "b", "c"] {
        manager
            .add_message("alice", "conv-1", MessageRole::User, text)
            .await
            .unwrap();
    }

    let context = manager.get_context("alice", "conv-1").await.unwrap();
    let contents: Vec<_> = context.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["b", "c"]);
}

#[tokio::test]
async fn test_user_conversations_are_scoped_and_counted() {
    let (_, manager) = setup();
    manager.create_conversation("alice", "a-1").await.unwrap();
    manager.create_conversation("alice", "a-2").await.unwrap();
    manager.create_conversation("bob", "b-1").await.unwrap();

    manager
        .add_message("alice", "a-1", MessageRole::User, "one")
        .await
        .unwrap();
    manager
        .add_message("alice", "a-1", MessageRole::Assistant, "two")
        .await
        .unwrap();

    let summaries = manager.get_user_conversations("alice").await.unwrap();
    assert_eq!(summaries.len(), 2);
    // a-1 was touched last
    assert_eq!(summaries[0].id, "a-1");
    assert_eq!(summaries[0].message_count, 2);
    assert_eq!(summaries[1].message_count, 0);
}

#[tokio::test]
async fn test_get_and_delete_conversation() {
    let (store, manager) = setup();
    manager.create_conversation("alice", "conv-1").await.unwrap();
    manager
        .add_message("alice", "conv-1", MessageRole::User, "hi")
        .await
        .unwrap();

    let detail = manager.get_conversation("alice", "conv-1").await.unwrap();
    assert_eq!(detail.conversation.id, "conv-1");
    assert_eq!(detail.messages.len(), 1);

    assert!(manager.get_conversation("bob", "conv-1").await.is_err());
    assert!(manager.delete_conversation("bob", "conv-1").await.is_err());

    manager.delete_conversation("alice", "conv-1").await.unwrap();
    assert!(store.get_conversation("conv-1").await.unwrap().is_none());
    assert!(manager.get_conversation("alice", "conv-1").await.is_err());
}

#[test]
fn test_new_conversation_ids_are_unique() {
    let a = ConversationManager::new_conversation_id();
    let b = ConversationManager::new_conversation_id();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}
