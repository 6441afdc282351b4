//! IP to country lookup using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! Country and City databases are both accepted; only the country is used.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::models::Country;

/// Geolocation could not produce an answer. Callers downgrade this to
/// `Country::Unknown`; it is never surfaced to clients.
#[derive(Debug, Error)]
pub enum GeoLookupError {
    #[error("no GeoIP database configured")]
    NotConfigured,
    #[error("address {0} is not in the GeoIP database")]
    NotFound(IpAddr),
    #[error("GeoIP lookup failed: {0}")]
    Lookup(String),
}

/// Swappable IP geolocation backend
pub trait GeoLookup: Send + Sync {
    fn country(&self, ip: IpAddr) -> Result<Country, GeoLookupError>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Memory-mapped MaxMind database reader
pub struct MaxMindGeoLookup {
    reader: Arc<Reader<Mmap>>,
}

impl MaxMindGeoLookup {
    pub fn open(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP database at {}", path))?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

impl GeoLookup for MaxMindGeoLookup {
    fn country(&self, ip: IpAddr) -> Result<Country, GeoLookupError> {
        let result = self
            .reader
            .lookup(ip)
            .map_err(|e| GeoLookupError::Lookup(e.to_string()))?;

        // City data is a superset of Country data; try the richer record first
        if let Ok(Some(city)) = result.decode::<geoip2::City>() {
            if let Some(code) = city.country.iso_code {
                return Ok(Country::from_iso(code));
            }
        }

        match result.decode::<geoip2::Country>() {
            Ok(Some(country)) => Ok(country
                .country
                .iso_code
                .map(Country::from_iso)
                .unwrap_or(Country::Unknown)),
            Ok(None) => Err(GeoLookupError::NotFound(ip)),
            Err(e) => Err(GeoLookupError::Lookup(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "maxmind"
    }
}

impl Clone for MaxMindGeoLookup {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
        }
    }
}

/// Used when no database is configured; every lookup is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeoLookup;

impl GeoLookup for DisabledGeoLookup {
    fn country(&self, _ip: IpAddr) -> Result<Country, GeoLookupError> {
        Err(GeoLookupError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Pick the MaxMind backend when a readable database is configured
pub fn from_path(path: Option<&str>) -> Arc<dyn GeoLookup> {
    match path {
        Some(path) => match MaxMindGeoLookup::open(path) {
            Ok(lookup) => {
                tracing::info!("GeoIP: Using MaxMind database at {}", path);
                Arc::new(lookup)
            }
            Err(e) => {
                tracing::warn!("GeoIP: {:#}; scan countries will be recorded as unknown", e);
                Arc::new(DisabledGeoLookup)
            }
        },
        None => {
            tracing::info!("GeoIP: No database configured; scan countries will be recorded as unknown");
            Arc::new(DisabledGeoLookup)
        }
    }
}
