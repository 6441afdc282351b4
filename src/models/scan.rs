use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::de;

/// Coarse device category derived from a user-agent string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Desktop,
    Unknown,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
            DeviceClass::Unknown => "unknown",
        }
    }

    /// Unrecognized stored values read back as `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "mobile" => DeviceClass::Mobile,
            "desktop" => DeviceClass::Desktop,
            _ => DeviceClass::Unknown,
        }
    }
}

/// ISO 3166-1 alpha-2 country of a scan, or unknown
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    Known(String),
    Unknown,
}

impl Country {
    pub const UNKNOWN_LABEL: &'static str = "Unknown";

    /// Anything that is not a two-letter code becomes `Unknown`.
    pub fn from_iso(code: &str) -> Self {
        let code = code.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Country::Known(code.to_ascii_uppercase())
        } else {
            Country::Unknown
        }
    }

    pub fn from_column(value: Option<String>) -> Self {
        value.as_deref().map(Country::from_iso).unwrap_or(Country::Unknown)
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Country::Known(code) => Some(code),
            Country::Unknown => None,
        }
    }

    pub fn label(&self) -> &str {
        self.code().unwrap_or(Self::UNKNOWN_LABEL)
    }
}

/// One recorded dereference of a short link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub link_id: String,
    pub occurred_at: DateTime<Utc>,
    pub device_class: DeviceClass,
    pub country: Country,
}

/// Grouped scan count for one (UTC day, device, country) combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanBucket {
    pub day: NaiveDate,
    pub device_class: DeviceClass,
    pub country: Country,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCounts {
    pub mobile: u64,
    pub desktop: u64,
    pub unknown: u64,
}

impl DeviceCounts {
    pub fn add(&mut self, class: DeviceClass, count: u64) {
        match class {
            DeviceClass::Mobile => self.mobile += count,
            DeviceClass::Desktop => self.desktop += count,
            DeviceClass::Unknown => self.unknown += count,
        }
    }
}

/// Aggregated analytics for a single link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    /// `YYYY-MM-DD` (UTC) -> count, ascending
    pub by_date: BTreeMap<String, u64>,
    pub devices: DeviceCounts,
    /// Country code -> count; unknown countries appear under `"Unknown"`
    pub locations: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize)]
pub struct RecordScanRequest {
    #[serde(deserialize_with = "de::id_string")]
    pub qr_id: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}
