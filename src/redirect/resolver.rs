//! Read-only lookup from a short id to redirect-worthy content
//!
//! Resolution never classifies or records anything; scan recording is a
//! separate call so redirect latency does not depend on analytics.

use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::models::ResolveResponse;
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct Resolution {
    pub target: ResolveResponse,
    pub cache_hit: bool,
}

pub struct Resolver {
    storage: Arc<dyn Storage>,
}

impl Resolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn resolve(&self, id: &str) -> ServiceResult<Resolution> {
        let lookup = self.storage.get_link_with_metadata(id).await?;
        let link = lookup.link.ok_or(ServiceError::NotFound)?;

        Ok(Resolution {
            target: ResolveResponse {
                kind: link.content_kind,
                content: link.original_content,
            },
            cache_hit: lookup.metadata.cache_hit,
        })
    }
}
