//! MongoDB database wrapper.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, ReplaceOptions};
use mongodb::{Client, Collection};
use tracing::{debug, info};

use super::store::DocumentStore;
use crate::error::StoreError;

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(filter).await?;
        Ok(cursor.try_collect::<Vec<_>>().await?)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        document: Document,
    ) -> Result<(), StoreError> {
        let options = ReplaceOptions::builder().upsert(true).build();

        let result = self
            .collection(collection)
            .replace_one(filter, document)
            .with_options(options)
            .await?;

        debug!(
            "Upserted into {}: matched={} upserted={}",
            collection,
            result.matched_count,
            result.upserted_id.is_some()
        );
        Ok(())
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }
}
