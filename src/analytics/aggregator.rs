//! Summary statistics over the scan events of a link
//!
//! Storage hands back pre-grouped (day, device, country) buckets; this module
//! folds them into the per-dimension counts the dashboard shows.

use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{ScanBucket, StatsSnapshot};
use crate::storage::Storage;

pub struct StatsAggregator {
    storage: Arc<dyn Storage>,
}

impl StatsAggregator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Aggregate every scan durably recorded for the link.
    ///
    /// A link without scans yields an all-zero snapshot; an unknown or
    /// deleted link is `NotFound`.
    pub async fn stats(&self, link_id: &str) -> ServiceResult<StatsSnapshot> {
        if self.storage.get_link(link_id).await?.is_none() {
            return Err(ServiceError::NotFound);
        }

        let buckets = self.storage.scan_buckets(link_id).await?;
        Ok(fold_buckets(&buckets))
    }
}

/// Fold grouped buckets into a snapshot. Dates are UTC `YYYY-MM-DD`.
pub fn fold_buckets(buckets: &[ScanBucket]) -> StatsSnapshot {
    let mut snapshot = StatsSnapshot::default();

    for bucket in buckets.iter().filter(|b| b.count > 0) {
        snapshot.total += bucket.count;
        *snapshot
            .by_date
            .entry(bucket.day.format("%Y-%m-%d").to_string())
            .or_insert(0) += bucket.count;
        snapshot.devices.add(bucket.device_class, bucket.count);
        *snapshot
            .locations
            .entry(bucket.country.label().to_string())
            .or_insert(0) += bucket.count;
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Country, DeviceClass};
    use chrono::NaiveDate;

    fn bucket(day: u32, device_class: DeviceClass, country: Country, count: u64) -> ScanBucket {
        ScanBucket {
            day: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            device_class,
            country,
            count,
        }
    }

    #[test]
    fn test_fold_counts_every_dimension() {
        let us = Country::Known("US".to_string());
        let buckets = vec![
            bucket(10, DeviceClass::Mobile, us.clone(), 3),
            bucket(9, DeviceClass::Desktop, us, 2),
            bucket(10, DeviceClass::Unknown, Country::Unknown, 1),
        ];

        let snapshot = fold_buckets(&buckets);
        assert_eq!(snapshot.total, 6);
        assert_eq!(
            snapshot.by_date.iter().collect::<Vec<_>>(),
            vec![(&"2024-02-09".to_string(), &2), (&"2024-02-10".to_string(), &4)]
        );
        assert_eq!(snapshot.devices.mobile, 3);
        assert_eq!(snapshot.devices.desktop, 2);
        assert_eq!(snapshot.devices.unknown, 1);
        assert_eq!(snapshot.locations.get("US"), Some(&5));
        assert_eq!(snapshot.locations.get("Unknown"), Some(&1));
    }

    #[test]
    fn test_fold_empty_is_zero() {
        let snapshot = fold_buckets(&[]);
        assert_eq!(snapshot, StatsSnapshot::default());
        assert!(!snapshot.locations.contains_key("Unknown"));
    }
}
