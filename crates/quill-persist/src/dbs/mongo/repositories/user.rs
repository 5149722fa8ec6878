use bson::{doc, oid::ObjectId, Document as BsonDocument};
use chrono::Utc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use super::is_duplicate_key;
use crate::dbs::mongo::models::{parse_object_id, MongoUser};
use crate::error::{PersistError, Result};
use crate::models::{NewUser, UserUpdate};

#[derive(Clone)]
pub struct MongoUserRepository {
    collection: Collection<MongoUser>,
}

impl MongoUserRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("users");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    pub async fn create_user(&self, user: NewUser) -> Result<MongoUser> {
        let record = MongoUser {
            id: ObjectId::new(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };

        match self.collection.insert_one(&record).await {
            Ok(_) => Ok(record),
            Err(e) if is_duplicate_key(&e) => Err(PersistError::EmailTaken(record.email)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<MongoUser>> {
        let Some(id) = parse_object_id(user_id) else {
            return Ok(None);
        };
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<MongoUser>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    pub async fn update_user(&self, user_id: &str, update: UserUpdate) -> Result<MongoUser> {
        let not_found = || PersistError::UserNotFound(user_id.to_string());
        let id = parse_object_id(user_id).ok_or_else(not_found)?;

        let mut set = BsonDocument::new();
        if let Some(name) = update.name {
            set.insert("name", name);
        }
        if let Some(password_hash) = update.password_hash {
            set.insert("password_hash", password_hash);
        }

        if set.is_empty() {
            return self
                .collection
                .find_one(doc! { "_id": id })
                .await?
                .ok_or_else(not_found);
        }

        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(mongodb::options::ReturnDocument::After)
            .await?
            .ok_or_else(not_found)
    }
}
