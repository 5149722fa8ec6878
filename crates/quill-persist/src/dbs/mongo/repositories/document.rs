use bson::{doc, oid::ObjectId, Document as BsonDocument};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::{parse_object_id, MongoDocument};
use crate::error::{PersistError, Result};
use crate::models::{DocumentUpdate, NewDocument};

#[derive(Clone)]
pub struct MongoDocumentRepository {
    collection: Collection<MongoDocument>,
}

impl MongoDocumentRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("documents");
        Self { collection }
    }

    pub async fn create_document(&self, user_id: &str, document: NewDocument) -> Result<MongoDocument> {
        let now = Utc::now();
        let record = MongoDocument {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            title: document.title,
            content: document.content,
            created_at: now,
            updated_at: now,
        };
        self.collection.insert_one(&record).await?;
        Ok(record)
    }

    pub async fn get_document(&self, user_id: &str, document_id: &str) -> Result<Option<MongoDocument>> {
        let Some(id) = parse_object_id(document_id) else {
            return Ok(None);
        };
        Ok(self
            .collection
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?)
    }

    pub async fn list_documents(&self, user_id: &str) -> Result<Vec<MongoDocument>> {
        let docs = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs)
    }

    pub async fn update_document(
        &self,
        user_id: &str,
        document_id: &str,
        update: DocumentUpdate,
    ) -> Result<MongoDocument> {
        let not_found = || PersistError::DocumentNotFound(document_id.to_string());
        let id = parse_object_id(document_id).ok_or_else(not_found)?;

        let mut set = BsonDocument::new();
        if let Some(title) = update.title {
            set.insert("title", title);
        }
        if let Some(content) = update.content {
            set.insert("content", content);
        }
        set.insert("updated_at", bson::DateTime::from_chrono(Utc::now()));

        self.collection
            .find_one_and_update(doc! { "_id": id, "user_id": user_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn delete_document(&self, user_id: &str, document_id: &str) -> Result<()> {
        let not_found = || PersistError::DocumentNotFound(document_id.to_string());
        let id = parse_object_id(document_id).ok_or_else(not_found)?;

        let result = self
            .collection
            .delete_one(doc! { "_id": id, "user_id": user_id })
            .await?;
        if result.deleted_count == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    pub async fn search_documents(&self, user_id: &str, query: &str) -> Result<Vec<MongoDocument>> {
        let pattern = regex::escape(query);
        let filter = doc! {
            "user_id": user_id,
            "$or": [
                { "title": { "$regex": pattern.as_str(), "$options": "i" } },
                { "content": { "$regex": pattern.as_str(), "$options": "i" } }
            ]
        };
        let docs = self
            .collection
            .find(filter)
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs)
    }
}
