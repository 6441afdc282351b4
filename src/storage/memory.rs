//! In-process storage backend
//!
//! Links live in a sharded `DashMap`; each link owns its own scan log behind a
//! per-link mutex, so appends to different links never contend. Deleted ids
//! are kept as tombstones so they are never handed out again.

use crate::models::{Country, DeviceClass, ScanBucket, ScanEvent, ShortLink};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct ScanLog {
    events: Vec<ScanEvent>,
    deleted: bool,
}

struct LinkEntry {
    link: ShortLink,
    scans: Mutex<ScanLog>,
}

enum Slot {
    Live(Arc<LinkEntry>),
    Retired,
}

#[derive(Default)]
pub struct MemoryStorage {
    slots: DashMap<String, Slot>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_entry(&self, id: &str) -> Option<Arc<LinkEntry>> {
        // Clone the Arc out so no shard guard is held across an await
        self.slots.get(id).and_then(|slot| match slot.value() {
            Slot::Live(entry) => Some(Arc::clone(entry)),
            Slot::Retired => None,
        })
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn create_link(&self, link: &ShortLink) -> StorageResult<()> {
        match self.slots.entry(link.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Live(Arc::new(LinkEntry {
                    link: link.clone(),
                    scans: Mutex::new(ScanLog::default()),
                })));
                Ok(())
            }
        }
    }

    async fn get_link(&self, id: &str) -> Result<Option<ShortLink>> {
        Ok(self.live_entry(id).map(|entry| entry.link.clone()))
    }

    async fn list_links(&self) -> Result<Vec<ShortLink>> {
        let mut links: Vec<ShortLink> = self
            .slots
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Live(entry) => Some(entry.link.clone()),
                Slot::Retired => None,
            })
            .collect();

        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(links)
    }

    async fn delete_link(&self, id: &str) -> Result<bool> {
        let entry = match self.slots.get_mut(id) {
            Some(mut slot) => match std::mem::replace(slot.value_mut(), Slot::Retired) {
                Slot::Live(entry) => entry,
                Slot::Retired => return Ok(false),
            },
            None => return Ok(false),
        };

        let mut log = entry.scans.lock().await;
        log.deleted = true;
        log.events.clear();
        Ok(true)
    }

    async fn append_scan(&self, event: &ScanEvent) -> Result<bool> {
        let Some(entry) = self.live_entry(&event.link_id) else {
            return Ok(false);
        };

        let mut log = entry.scans.lock().await;
        if log.deleted {
            return Ok(false);
        }
        log.events.push(event.clone());
        Ok(true)
    }

    async fn scan_buckets(&self, link_id: &str) -> Result<Vec<ScanBucket>> {
        let Some(entry) = self.live_entry(link_id) else {
            return Ok(Vec::new());
        };

        let mut grouped: HashMap<(NaiveDate, DeviceClass, Country), u64> = HashMap::new();
        {
            let log = entry.scans.lock().await;
            for event in &log.events {
                let key = (
                    event.occurred_at.date_naive(),
                    event.device_class,
                    event.country.clone(),
                );
                *grouped.entry(key).or_insert(0) += 1;
            }
        }

        let mut buckets: Vec<ScanBucket> = grouped
            .into_iter()
            .map(|((day, device_class, country), count)| ScanBucket {
                day,
                device_class,
                country,
                count,
            })
            .collect();
        buckets.sort_by_key(|b| b.day);
        Ok(buckets)
    }
}
