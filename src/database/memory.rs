//! In-process document store.
//!
//! Supports equality and `$ne` filters, which is all the repositories use.
//! Counts every call so callers can assert on round-trips, and can be told
//! to fail reads or writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use parking_lot::Mutex;

use super::store::DocumentStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    finds: AtomicU64,
    writes: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `document` as-is, bypassing any encoding.
    pub fn insert_raw(&self, collection: &str, document: Document) {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Snapshot of the document matching `filter`.
    pub fn peek(&self, collection: &str, filter: &Document) -> Option<Document> {
        self.collections
            .lock()
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)).cloned())
    }

    /// Number of `find_one`/`find_many` calls served.
    pub fn find_count(&self) -> u64 {
        self.finds.load(Ordering::SeqCst)
    }

    /// Number of `update_one` calls that reached the store.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{op} rejected")));
        }
        Ok(())
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, expected)| match expected {
        Bson::Document(op) if op.contains_key("$ne") => document.get(field) != op.get("$ne"),
        _ => document.get(field) == Some(expected),
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads, "find_one")?;
        Ok(self.peek(collection, &filter))
    }

    async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads, "find_many")?;
        Ok(self
            .collections
            .lock()
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        document: Document,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_writes, "update_one")?;

        let mut collections = self.collections.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| matches(d, &filter)) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
        Ok(())
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.check(&self.fail_reads, "count_documents")?;
        Ok(self
            .collections
            .lock()
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).count() as u64)
            .unwrap_or(0))
    }
}
