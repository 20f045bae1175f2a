//! Read-through / write-through access to per-entity records.
//!
//! Every record kind goes through the same two paths:
//!
//! - `load`: object cache, then the document store, then a default record.
//!   The result is always written back to the cache with [`RECORD_TTL`], so
//!   the next call inside the window is a cache hit even after a store error.
//! - `mutate`: `load`, change one field, upsert the whole document, then
//!   overwrite the cache entry whether or not the store write succeeded.
//!
//! Neither path returns an error. Store failures are logged with the
//! operation and key, and callers get a usable (possibly default) record.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use mongodb::bson::{Document, doc, from_document, to_document};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use super::models::Record;
use super::store::DocumentStore;
use crate::cache::{ObjectCache, RECORD_TTL};
use crate::error::StoreError;

/// Shared handles for the accessor layer. Built once at startup.
#[derive(Clone)]
pub struct StoreContext {
    objects: ObjectCache,
    store: Arc<dyn DocumentStore>,
    store_timeout: Duration,
    locks: Arc<KeyLocks>,
}

impl StoreContext {
    pub fn new(objects: ObjectCache, store: Arc<dyn DocumentStore>, store_timeout: Duration) -> Self {
        Self {
            objects,
            store,
            store_timeout,
            locks: Arc::new(KeyLocks::default()),
        }
    }

    pub fn objects(&self) -> &ObjectCache {
        &self.objects
    }

    /// Resolve the record for `key`, creating a default one when absent.
    ///
    /// A cache miss is filled under the record's lock, so it cannot race a
    /// mutation and concurrent cold readers share one store query.
    pub async fn load<R: Record>(&self, key: i64) -> R {
        if let Some(record) = self.cached::<R>(key).await {
            return record;
        }

        let _lock = self.locks.acquire(R::KIND, key).await;
        self.load_locked(key).await
    }

    /// Apply `change` to the record for `key` and write it through.
    ///
    /// Mutations of the same record are serialised; different records
    /// proceed in parallel.
    pub async fn mutate<R, F>(&self, key: i64, op: &'static str, change: F) -> R
    where
        R: Record,
        F: FnOnce(&mut R),
    {
        let _lock = self.locks.acquire(R::KIND, key).await;

        let mut record = self.load_locked::<R>(key).await;
        change(&mut record);

        if let Err(e) = self.persist(&record).await {
            error!(op, kind = R::KIND, key, error = %e, "durable write failed, cache updated anyway");
        }
        self.cache(&record).await;

        debug!(op, kind = R::KIND, key, "record updated");
        record
    }

    async fn cached<R: Record>(&self, key: i64) -> Option<R> {
        match self.objects.get::<R>(key).await {
            Ok(Some(record)) => {
                debug!(kind = R::KIND, key, "cache hit");
                Some(record)
            }
            Ok(None) => {
                debug!(kind = R::KIND, key, "cache miss");
                None
            }
            Err(e) => {
                warn!(kind = R::KIND, key, error = %e, "unreadable cache entry, reloading");
                None
            }
        }
    }

    /// Read-through body. The caller holds the lock for `(R::KIND, key)`.
    async fn load_locked<R: Record>(&self, key: i64) -> R {
        // Filled by whoever held the lock before us.
        if let Some(record) = self.cached::<R>(key).await {
            return record;
        }

        let record = match self.find_one::<R>(key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                let record = R::with_key(key);
                if let Err(e) = self.persist(&record).await {
                    error!(kind = R::KIND, key, error = %e, "failed to persist default record");
                }
                record
            }
            Err(e) => {
                error!(kind = R::KIND, key, error = %e, "store lookup failed, using defaults");
                R::with_key(key)
            }
        };

        self.cache(&record).await;
        record
    }

    /// All records of kind `R` matching `filter`.
    ///
    /// Bypasses the cache. Failures are logged and yield an empty list.
    pub async fn find_many<R: Record>(&self, filter: Document) -> Vec<R> {
        let docs = match self
            .with_deadline("find_many", self.store.find_many(R::COLLECTION, filter))
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                error!(kind = R::KIND, error = %e, "find_many failed");
                return Vec::new();
            }
        };

        docs.into_iter()
            .filter_map(|doc| match from_document::<R>(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(kind = R::KIND, error = %e, "skipping malformed document");
                    None
                }
            })
            .collect()
    }

    /// Number of `R` documents matching `filter`; 0 on failure.
    pub async fn count<R: Record>(&self, filter: Document) -> u64 {
        self.with_deadline("count_documents", self.store.count_documents(R::COLLECTION, filter))
            .await
            .unwrap_or_else(|e| {
                error!(kind = R::KIND, error = %e, "count_documents failed");
                0
            })
    }

    async fn find_one<R: Record>(&self, key: i64) -> Result<Option<R>, StoreError> {
        let found = self
            .with_deadline("find_one", self.store.find_one(R::COLLECTION, doc! { "_id": key }))
            .await?;
        Ok(found.map(from_document::<R>).transpose()?)
    }

    async fn persist<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let document = to_document(record)?;
        self.with_deadline(
            "update_one",
            self.store.update_one(R::COLLECTION, doc! { "_id": record.key() }, document),
        )
        .await
    }

    async fn cache<R: Record>(&self, record: &R) {
        if let Err(e) = self.objects.set(record.key(), record, RECORD_TTL).await {
            warn!(kind = R::KIND, key = record.key(), error = %e, "failed to cache record");
        }
    }

    async fn with_deadline<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout {
                op,
                after: self.store_timeout,
            })?
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("objects", &self.objects)
            .field("store_timeout", &self.store_timeout)
            .field("locked_keys", &self.locks.len())
            .finish()
    }
}

/// Per-record async mutexes, created on demand and dropped when idle.
#[derive(Default)]
struct KeyLocks {
    locks: DashMap<(&'static str, i64), Arc<Mutex<()>>>,
}

impl KeyLocks {
    async fn acquire(&self, kind: &'static str, key: i64) -> KeyLock<'_> {
        let lock = self.locks.entry((kind, key)).or_default().clone();
        // Built before waiting so a cancelled wait also cleans up.
        let mut held = KeyLock {
            locks: self,
            id: (kind, key),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Held lock on one record. Forgets the mutex on drop once nobody else holds
/// or waits on it, including when the owning future is cancelled.
struct KeyLock<'a> {
    locks: &'a KeyLocks,
    id: (&'static str, i64),
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::{LocalTierConfig, MemoryTier, TieredCacheStore};
    use crate::database::memory::MemoryStore;
    use crate::database::models::{RulesSettings, TeamMember};

    struct Harness {
        ctx: StoreContext,
        store: Arc<MemoryStore>,
        remote: Arc<MemoryTier>,
        clock: Arc<ManualClock>,
    }

    /// Delays reads and writes so a second task can interleave.
    struct SlowStore {
        inner: Arc<MemoryStore>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl DocumentStore for SlowStore {
        async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
            let found = self.inner.find_one(collection, filter).await;
            tokio::time::sleep(self.delay).await;
            found
        }

        async fn find_many(&self, collection: &str, filter: Document) -> Result<Vec<Document>, StoreError> {
            self.inner.find_many(collection, filter).await
        }

        async fn update_one(
            &self,
            collection: &str,
            filter: Document,
            document: Document,
        ) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            self.inner.update_one(collection, filter, document).await
        }

        async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
            self.inner.count_documents(collection, filter).await
        }
    }

    fn slow_context(delay: Duration) -> (StoreContext, Arc<MemoryStore>) {
        let inner = Arc::new(MemoryStore::new());
        let store = Arc::new(SlowStore { inner: inner.clone(), delay });
        let tiered = TieredCacheStore::new(
            LocalTierConfig::default(),
            Arc::new(MemoryTier::new()),
            Duration::from_secs(1),
        );
        let ctx = StoreContext::new(ObjectCache::new(tiered), store, Duration::from_secs(1));
        (ctx, inner)
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::default());
        let remote = Arc::new(MemoryTier::with_clock(clock.clone()));
        let store = Arc::new(MemoryStore::new());
        let tiered = TieredCacheStore::new(LocalTierConfig::default(), remote.clone(), Duration::from_secs(1));
        let ctx = StoreContext::new(ObjectCache::new(tiered), store.clone(), Duration::from_secs(1));
        Harness { ctx, store, remote, clock }
    }

    #[tokio::test]
    async fn test_default_on_absence_is_persisted() {
        let h = harness();

        let rules: RulesSettings = h.ctx.load(-42).await;
        assert_eq!(rules, RulesSettings::with_key(-42));

        let stored = h.store.peek("rules", &doc! { "_id": -42_i64 }).unwrap();
        assert_eq!(from_document::<RulesSettings>(stored).unwrap(), rules);
    }

    #[tokio::test]
    async fn test_repeated_loads_hit_store_once() {
        let h = harness();

        let first: RulesSettings = h.ctx.load(7).await;
        for _ in 0..10 {
            let again: RulesSettings = h.ctx.load(7).await;
            assert_eq!(again, first);
        }

        assert_eq!(h.store.find_count(), 1);
    }

    #[tokio::test]
    async fn test_store_error_falls_back_without_persisting() {
        let h = harness();
        h.store.fail_reads(true);

        let rules: RulesSettings = h.ctx.load(3).await;
        assert_eq!(rules, RulesSettings::with_key(3));
        assert_eq!(h.store.write_count(), 0);

        // The fallback is cached, so the store is not asked again.
        let _: RulesSettings = h.ctx.load(3).await;
        assert_eq!(h.store.find_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_document_falls_back() {
        let h = harness();
        h.store.insert_raw("rules", doc! { "_id": 11_i64, "privrules": "yes" });

        let rules: RulesSettings = h.ctx.load(11).await;
        assert_eq!(rules, RulesSettings::with_key(11));
        assert_eq!(h.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_document_is_decoded() {
        let h = harness();
        h.store.insert_raw("rules", doc! { "_id": 12_i64, "rules": "no spam", "privrules": true });

        let rules: RulesSettings = h.ctx.load(12).await;
        assert_eq!(rules.rules, "no spam");
        assert!(rules.private);
    }

    #[tokio::test]
    async fn test_ttl_expiry_forces_refetch() {
        let h = harness();

        let _: RulesSettings = h.ctx.load(8).await;
        assert_eq!(h.store.find_count(), 1);

        h.ctx.objects().store().evict_local(&ObjectCache::key::<RulesSettings>(8));
        h.clock.advance(RECORD_TTL + Duration::from_secs(1));

        let _: RulesSettings = h.ctx.load(8).await;
        assert_eq!(h.store.find_count(), 2);
    }

    #[tokio::test]
    async fn test_mutation_visible_without_store_round_trip() {
        let h = harness();

        let _: RulesSettings = h.ctx.mutate(5, "set_rules", |r: &mut RulesSettings| r.rules = "be nice".into()).await;
        let finds = h.store.find_count();

        let rules: RulesSettings = h.ctx.load(5).await;
        assert_eq!(rules.rules, "be nice");
        assert_eq!(h.store.find_count(), finds);
    }

    #[tokio::test]
    async fn test_mutation_cached_even_when_write_fails() {
        let h = harness();
        h.store.fail_writes(true);

        let _: RulesSettings = h.ctx.mutate(6, "set_private", |r: &mut RulesSettings| r.private = true).await;

        let rules: RulesSettings = h.ctx.load(6).await;
        assert!(rules.private);
        assert!(h.store.peek("rules", &doc! { "_id": 6_i64 }).is_none());
    }

    #[tokio::test]
    async fn test_local_eviction_keeps_correct_value() {
        let h = harness();
        let _: RulesSettings = h.ctx.mutate(9, "set_rules", |r: &mut RulesSettings| r.rules = "x".into()).await;

        h.ctx.objects().store().evict_local(&ObjectCache::key::<RulesSettings>(9));
        let gets = h.remote.get_count();

        let rules: RulesSettings = h.ctx.load(9).await;
        assert_eq!(rules.rules, "x");
        assert_eq!(h.remote.get_count(), gets + 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_do_not_lose_fields() {
        let h = harness();
        let ctx = h.ctx.clone();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let ctx = ctx.clone();
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let _: TeamMember = ctx.mutate(1, "add_sudo", |m: &mut TeamMember| m.sudo = true).await;
                } else {
                    let _: TeamMember = ctx.mutate(1, "add_dev", |m: &mut TeamMember| m.dev = true).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let member: TeamMember = ctx.load(1).await;
        assert!(member.sudo && member.dev);
        let stored: TeamMember = from_document(h.store.peek("team", &doc! { "_id": 1_i64 }).unwrap()).unwrap();
        assert!(stored.sudo && stored.dev);
        assert_eq!(ctx.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_count_and_find_many() {
        let h = harness();
        let _: RulesSettings = h.ctx.mutate(1, "set_rules", |r: &mut RulesSettings| r.rules = "a".into()).await;
        let _: RulesSettings = h.ctx.mutate(2, "set_private", |r: &mut RulesSettings| r.private = true).await;

        assert_eq!(h.ctx.count::<RulesSettings>(doc! { "rules": { "$ne": "" } }).await, 1);
        assert_eq!(h.ctx.count::<RulesSettings>(doc! { "privrules": true }).await, 1);

        let private: Vec<RulesSettings> = h.ctx.find_many(doc! { "privrules": true }).await;
        assert_eq!(private.len(), 1);
        assert_eq!(private[0].chat_id, 2);
    }

    #[tokio::test]
    async fn test_cold_load_does_not_clobber_concurrent_mutation() {
        let (ctx, store) = slow_context(Duration::from_millis(100));

        let reader = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.load::<RulesSettings>(1).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _: RulesSettings = ctx.mutate(1, "set_rules", |r: &mut RulesSettings| r.rules = "be nice".into()).await;
        reader.await.unwrap();

        let cached: RulesSettings = ctx.load(1).await;
        assert_eq!(cached.rules, "be nice");
        let stored: RulesSettings = from_document(store.peek("rules", &doc! { "_id": 1_i64 }).unwrap()).unwrap();
        assert_eq!(stored.rules, "be nice");
    }

    #[tokio::test]
    async fn test_concurrent_cold_loads_share_one_query() {
        let (ctx, store) = slow_context(Duration::from_millis(20));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move { ctx.load::<TeamMember>(3).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), TeamMember::with_key(3));
        }

        assert_eq!(store.find_count(), 1);
        assert_eq!(ctx.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_mutation_releases_its_lock() {
        let (ctx, _) = slow_context(Duration::from_millis(200));

        let task = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let _: TeamMember = ctx.mutate(4, "add_dev", |m: &mut TeamMember| m.dev = true).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ctx.locks.len(), 1);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(ctx.locks.len(), 0);
    }
}
