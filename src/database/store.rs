//! Document store contract consumed by the accessor layer.

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::error::StoreError;

/// A collection-oriented document store keyed by `_id`.
///
/// `update_one` replaces the whole document matching `filter` and inserts it
/// when nothing matches.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError>;

    async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        document: Document,
    ) -> Result<(), StoreError>;

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;
}
