use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dbs::InMemoryPersistenceClient;
use crate::error::{PersistError, Result};
use crate::trait_client::PersistenceClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongodb,
    Memory,
}

pub struct PersistClientBuilder {
    backend: StorageBackend,
    mongodb_uri: Option<String>,
    database: Option<String>,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            backend: StorageBackend::default(),
            mongodb_uri: None,
            database: None,
        }
    }

    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = Some(db.into());
        self
    }

    pub async fn build(self) -> Result<Arc<dyn PersistenceClient>> {
        match self.backend {
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage, data is lost on restart");
                Ok(Arc::new(InMemoryPersistenceClient::new()))
            }
            StorageBackend::Mongodb => self.build_mongo().await,
        }
    }

    #[cfg(feature = "mongodb")]
    async fn build_mongo(self) -> Result<Arc<dyn PersistenceClient>> {
        let mongodb_uri = self
            .mongodb_uri
            .ok_or_else(|| PersistError::Internal("mongodb_uri is required".to_string()))?;
        let database = self
            .database
            .ok_or_else(|| PersistError::Internal("database is required".to_string()))?;

        let client = crate::dbs::MongoPersistenceClient::connect(&mongodb_uri, &database).await?;
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "mongodb"))]
    async fn build_mongo(self) -> Result<Arc<dyn PersistenceClient>> {
        Err(PersistError::Connection(
            "built without the `mongodb` feature".to_string(),
        ))
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
