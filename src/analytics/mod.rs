//! Scan analytics
//!
//! Device and country classification happen once, when a scan is recorded;
//! the stored event is never re-classified. Both classifiers are traits so the
//! rule set and the geolocation backend can be swapped independently of the
//! recorder.

pub mod aggregator;
pub mod device;
pub mod geoip;
pub mod ip_extractor;
pub mod recorder;

pub use aggregator::StatsAggregator;
pub use device::{DeviceClassifier, UserAgentClassifier};
pub use geoip::{DisabledGeoLookup, GeoLookup, GeoLookupError, MaxMindGeoLookup};
pub use ip_extractor::extract_client_ip;
pub use recorder::ScanRecorder;
