use thiserror::Error;

use crate::render::RenderError;

/// Errors reported by the link, redirect and analytics services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed request, rejected before any allocation attempt
    #[error("{0}")]
    Validation(String),
    #[error("QR code not found")]
    NotFound,
    /// Every candidate id collided; a server fault, not a client error
    #[error("failed to allocate a unique short code after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
