use bson::doc;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use super::is_duplicate_key;
use crate::dbs::mongo::models::MongoConversation;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoConversationRepository {
    collection: Collection<MongoConversation>,
}

impl MongoConversationRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("conversations");
        Self { collection }
    }

    /// Inserts keyed on the caller's id; a duplicate key means it already exists
    pub async fn insert_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool> {
        let now = Utc::now();
        let record = MongoConversation {
            id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            last_updated: now,
        };

        match self.collection.insert_one(&record).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Option<MongoConversation>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": conversation_id })
            .await?)
    }

    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<MongoConversation>> {
        let convs = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "last_updated": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(convs)
    }

    /// Returns whether a conversation owned by `user_id` was removed
    pub async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": conversation_id, "user_id": user_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    /// Returns whether the conversation exists
    pub async fn touch(&self, conversation_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": conversation_id },
                doc! { "$set": { "last_updated": bson::DateTime::from_chrono(at) } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}
