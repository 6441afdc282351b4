use crate::models::{ScanBucket, ScanEvent, ShortLink};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// How a link lookup was served
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupMetadata {
    pub cache_hit: bool,
}

#[derive(Debug, Clone)]
pub struct LookupResult {
    pub link: Option<ShortLink>,
    pub metadata: LookupMetadata,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Persist a new link. Fails with `Conflict` if its id was ever claimed,
    /// including ids of deleted links.
    async fn create_link(&self, link: &ShortLink) -> StorageResult<()>;

    /// Get a link by id
    async fn get_link(&self, id: &str) -> Result<Option<ShortLink>>;

    /// Get a link by id, reporting whether a cache served it
    async fn get_link_with_metadata(&self, id: &str) -> Result<LookupResult> {
        Ok(LookupResult {
            link: self.get_link(id).await?,
            metadata: LookupMetadata::default(),
        })
    }

    /// All links, newest first
    async fn list_links(&self) -> Result<Vec<ShortLink>>;

    /// Delete a link together with its scan events. The id stays retired.
    async fn delete_link(&self, id: &str) -> Result<bool>;

    /// Append a scan event. Returns false when the link does not exist;
    /// the existence check and the insert are a single atomic step.
    async fn append_scan(&self, event: &ScanEvent) -> Result<bool>;

    /// Scan counts for a link grouped by (UTC day, device class, country)
    async fn scan_buckets(&self, link_id: &str) -> Result<Vec<ScanBucket>>;
}
