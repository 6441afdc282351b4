//! Scan event recording
//!
//! Called independently of redirect resolution; a failure here never affects
//! a redirect that has already been served.

use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::device::DeviceClassifier;
use crate::analytics::geoip::GeoLookup;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Country, ScanEvent};
use crate::storage::Storage;

pub struct ScanRecorder {
    storage: Arc<dyn Storage>,
    devices: Arc<dyn DeviceClassifier>,
    geo: Arc<dyn GeoLookup>,
}

impl ScanRecorder {
    pub fn new(
        storage: Arc<dyn Storage>,
        devices: Arc<dyn DeviceClassifier>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        Self {
            storage,
            devices,
            geo,
        }
    }

    /// Classify and append one scan event with a server-assigned timestamp.
    ///
    /// Calls are not de-duplicated: two calls for one physical scan produce
    /// two events.
    pub async fn record(
        &self,
        link_id: &str,
        user_agent: Option<&str>,
        source_ip: IpAddr,
    ) -> ServiceResult<ScanEvent> {
        let event = ScanEvent {
            link_id: link_id.to_string(),
            occurred_at: Utc::now(),
            device_class: self.devices.classify(user_agent.unwrap_or_default()),
            country: self.country_of(source_ip),
        };

        if !self.storage.append_scan(&event).await? {
            return Err(ServiceError::NotFound);
        }

        info!(
            link_id = %event.link_id,
            device = event.device_class.as_str(),
            country = event.country.label(),
            "Scan recorded"
        );
        Ok(event)
    }

    fn country_of(&self, ip: IpAddr) -> Country {
        match self.geo.country(ip) {
            Ok(country) => country,
            Err(e) => {
                debug!(provider = self.geo.name(), error = %e, "country lookup unavailable");
                Country::Unknown
            }
        }
    }
}
