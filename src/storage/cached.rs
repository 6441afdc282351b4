use crate::models::{ScanBucket, ScanEvent, ShortLink};
use crate::storage::{LookupMetadata, LookupResult, Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cached storage wrapper that serves link lookups from memory
///
/// Only link records are cached. Scan appends and aggregation queries always
/// go to the underlying storage so analytics never read stale counts.
///
/// Misses are not cached, so a link created through another instance is
/// visible at once. A delete made through another instance is only seen here
/// once the entry's TTL expires.
pub struct CachedStorage {
    /// Underlying storage implementation
    inner: Arc<dyn Storage>,
    /// Read cache for link lookups
    read_cache: Cache<String, ShortLink>,
    /// Bumped by every delete; a read that overlaps a delete drops its entry
    delete_epoch: AtomicU64,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, max_cache_entries: u64, ttl_secs: u64) -> Self {
        let read_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            read_cache,
            delete_epoch: AtomicU64::new(0),
        }
    }

    /// Invalidate cache entry for a specific link id
    async fn invalidate_cache(&self, id: &str) {
        self.read_cache.invalidate(id).await;
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn create_link(&self, link: &ShortLink) -> StorageResult<()> {
        self.inner.create_link(link).await?;

        // Cache the newly created link
        self.read_cache
            .insert(link.id.clone(), link.clone())
            .await;

        Ok(())
    }

    async fn get_link(&self, id: &str) -> Result<Option<ShortLink>> {
        Ok(self.get_link_with_metadata(id).await?.link)
    }

    async fn get_link_with_metadata(&self, id: &str) -> Result<LookupResult> {
        if let Some(cached) = self.read_cache.get(id).await {
            return Ok(LookupResult {
                link: Some(cached),
                metadata: LookupMetadata { cache_hit: true },
            });
        }

        // Cache miss - fetch from underlying storage
        let epoch = self.delete_epoch.load(Ordering::SeqCst);
        let result = self.inner.get_link(id).await?;

        if let Some(link) = &result {
            self.read_cache.insert(id.to_string(), link.clone()).await;
            // A delete that started after our read may have invalidated
            // before the insert above landed
            if self.delete_epoch.load(Ordering::SeqCst) != epoch {
                self.invalidate_cache(id).await;
            }
        }

        Ok(LookupResult {
            link: result,
            metadata: LookupMetadata { cache_hit: false },
        })
    }

    async fn list_links(&self) -> Result<Vec<ShortLink>> {
        self.inner.list_links().await
    }

    async fn delete_link(&self, id: &str) -> Result<bool> {
        let result = self.inner.delete_link(id).await;

        // Invalidate even on error: the delete may have committed
        self.delete_epoch.fetch_add(1, Ordering::SeqCst);
        self.invalidate_cache(id).await;

        result
    }

    async fn append_scan(&self, event: &ScanEvent) -> Result<bool> {
        self.inner.append_scan(event).await
    }

    async fn scan_buckets(&self, link_id: &str) -> Result<Vec<ScanBucket>> {
        self.inner.scan_buckets(link_id).await
    }
}
