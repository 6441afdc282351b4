//! Link creation and the link directory (list, get, image, delete)

pub mod allocator;

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AllocationConfig, DomainConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{ContentKind, CreateLinkRequest, QrStyle, ShortLink};
use crate::render::{image_side, parse_color, QrRenderer};
use crate::storage::Storage;

pub use allocator::{generate_short_code, CodeAllocator};

pub const MAX_MODULE_SIZE: u32 = 50;
pub const MAX_BORDER_WIDTH: u32 = 20;

/// A persisted link together with its rendered redirect image
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub link: ShortLink,
    pub short_url: String,
    pub qr_image_base64: String,
}

pub struct LinkService {
    storage: Arc<dyn Storage>,
    renderer: Arc<dyn QrRenderer>,
    allocator: CodeAllocator,
    domains: DomainConfig,
}

impl LinkService {
    pub fn new(
        storage: Arc<dyn Storage>,
        renderer: Arc<dyn QrRenderer>,
        allocation: AllocationConfig,
        domains: DomainConfig,
    ) -> Self {
        Self {
            allocator: CodeAllocator::new(Arc::clone(&storage), allocation),
            storage,
            renderer,
            domains,
        }
    }

    pub fn domains(&self) -> &DomainConfig {
        &self.domains
    }

    /// Validate, allocate an id, persist, and render the redirect image
    pub async fn create(&self, request: &CreateLinkRequest) -> ServiceResult<CreatedLink> {
        let content = request.url.trim().to_string();
        let style = request.style();
        validate_create(&content, &style)?;

        // Every short URL has the same length, so a placeholder id tells us
        // whether the redirect image will render before anything is stored
        let placeholder = self.domains.short_url(&"0".repeat(self.allocator.code_length()));
        image_side(&placeholder, &style)?;

        let content_kind = ContentKind::detect(&content);
        let link = self
            .allocator
            .allocate(|id| ShortLink {
                id,
                original_content: content.clone(),
                content_kind,
                style: style.clone(),
                created_at: Utc::now(),
            })
            .await?;

        let short_url = self.domains.short_url(&link.id);
        let qr_image_base64 = match self.renderer.render_base64(&short_url, &link.style) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(link_id = %link.id, error = %e, "render failed after persist, removing link");
                if let Err(cleanup) = self.storage.delete_link(&link.id).await {
                    warn!(link_id = %link.id, error = %cleanup, "failed to remove unrenderable link");
                }
                return Err(e.into());
            }
        };

        info!(link_id = %link.id, kind = link.content_kind.as_str(), "QR link created");

        Ok(CreatedLink {
            link,
            short_url,
            qr_image_base64,
        })
    }

    pub async fn list(&self) -> ServiceResult<Vec<ShortLink>> {
        Ok(self.storage.list_links().await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<ShortLink> {
        self.storage
            .get_link(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Regenerate the image of a link, encoding either the short redirect
    /// URL or the original content.
    pub async fn image(&self, id: &str, redirect_variant: bool) -> ServiceResult<String> {
        let link = self.get(id).await?;
        let payload = if redirect_variant {
            self.domains.short_url(&link.id)
        } else {
            link.original_content.clone()
        };

        Ok(self.renderer.render_base64(&payload, &link.style)?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        if self.storage.delete_link(id).await? {
            info!(link_id = %id, "QR link deleted");
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }
}

/// Reject malformed create payloads before any id is allocated
pub fn validate_create(content: &str, style: &QrStyle) -> ServiceResult<()> {
    if content.is_empty() {
        return Err(ServiceError::Validation("Missing 'url' parameter".to_string()));
    }
    if parse_color(&style.foreground_color).is_none() {
        return Err(ServiceError::Validation(format!(
            "Invalid color '{}'",
            style.foreground_color
        )));
    }
    if parse_color(&style.background_color).is_none() {
        return Err(ServiceError::Validation(format!(
            "Invalid bg_color '{}'",
            style.background_color
        )));
    }
    if !(1..=MAX_MODULE_SIZE).contains(&style.module_size) {
        return Err(ServiceError::Validation(format!(
            "box_size must be between 1 and {MAX_MODULE_SIZE}"
        )));
    }
    if style.border_width > MAX_BORDER_WIDTH {
        return Err(ServiceError::Validation(format!(
            "border must be between 0 and {MAX_BORDER_WIDTH}"
        )));
    }
    // The direct image must stay renderable for the life of the link
    image_side(content, style).map_err(|e| ServiceError::Validation(e.to_string()))?;
    Ok(())
}
