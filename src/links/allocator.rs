//! Short code allocation
//!
//! Uniqueness is enforced by the storage layer (`create_link` fails with
//! `Conflict` for any id ever claimed); the allocator only draws random
//! candidates and retries a bounded number of times.

use rand::RngExt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::AllocationConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::models::ShortLink;
use crate::storage::{Storage, StorageError};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random alphanumeric short code
pub fn generate_short_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub struct CodeAllocator {
    storage: Arc<dyn Storage>,
    config: AllocationConfig,
}

impl CodeAllocator {
    pub fn new(storage: Arc<dyn Storage>, config: AllocationConfig) -> Self {
        Self { storage, config }
    }

    pub fn code_length(&self) -> usize {
        self.config.short_code_length
    }

    /// Persist a link under a freshly drawn id.
    ///
    /// `build` turns a candidate id into the full record; it is called again
    /// for every retry.
    pub async fn allocate<F>(&self, build: F) -> ServiceResult<ShortLink>
    where
        F: Fn(String) -> ShortLink + Send + Sync,
    {
        self.allocate_with(|| generate_short_code(self.config.short_code_length), build)
            .await
    }

    async fn allocate_with<G, F>(&self, mut candidate: G, build: F) -> ServiceResult<ShortLink>
    where
        G: FnMut() -> String + Send,
        F: Fn(String) -> ShortLink + Send + Sync,
    {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let link = build(candidate());
            match self.storage.create_link(&link).await {
                Ok(()) => return Ok(link),
                Err(StorageError::Conflict) => {
                    debug!(short_code = %link.id, attempt, "short code collision, retrying");
                }
                Err(StorageError::Other(e)) => return Err(ServiceError::Storage(e)),
            }
        }

        error!(attempts, "short code allocation exhausted");
        Err(ServiceError::AllocationExhausted { attempts })
    }
}
