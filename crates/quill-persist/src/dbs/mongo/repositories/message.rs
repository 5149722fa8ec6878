use bson::{doc, oid::ObjectId};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;
use crate::models::MessageRole;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = mongodb::IndexModel::builder()
            .keys(doc! { "conversation_id": 1, "timestamp": 1 })
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    pub async fn save_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<MongoMessage> {
        let record = MongoMessage {
            id: ObjectId::new(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        self.collection.insert_one(&record).await?;
        Ok(record)
    }

    /// Ordered by timestamp, ties broken by the monotonic ObjectId
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "conversation_id": conversation_id })
            .sort(doc! { "timestamp": 1, "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn count_messages(&self, conversation_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "conversation_id": conversation_id })
            .await?)
    }

    pub async fn delete_for_conversation(&self, conversation_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "conversation_id": conversation_id })
            .await?;
        Ok(result.deleted_count)
    }
}
