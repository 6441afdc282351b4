//! Row shapes shared by the SQL backends.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{ContentKind, Country, DeviceClass, QrStyle, ScanBucket, ShortLink};

pub(crate) const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LinkRow {
    pub id: String,
    pub original_content: String,
    pub content_kind: String,
    pub fg_color: String,
    pub bg_color: String,
    pub module_size: i64,
    pub border_width: i64,
    pub created_at: i64,
}

impl TryFrom<LinkRow> for ShortLink {
    type Error = anyhow::Error;

    fn try_from(row: LinkRow) -> Result<Self> {
        let content_kind = ContentKind::parse(&row.content_kind)
            .ok_or_else(|| anyhow!("invalid content_kind '{}' for link {}", row.content_kind, row.id))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(row.created_at)
            .ok_or_else(|| anyhow!("invalid created_at {} for link {}", row.created_at, row.id))?;

        Ok(ShortLink {
            style: QrStyle {
                foreground_color: row.fg_color,
                background_color: row.bg_color,
                module_size: u32::try_from(row.module_size).context("module_size out of range")?,
                border_width: u32::try_from(row.border_width).context("border_width out of range")?,
            },
            id: row.id,
            original_content: row.original_content,
            content_kind,
            created_at,
        })
    }
}

/// `(day_number, device_class, country, count)` as returned by the grouping query
pub(crate) type BucketRow = (i64, String, Option<String>, i64);

pub(crate) fn bucket_from_row((day, device_class, country, count): BucketRow) -> Result<ScanBucket> {
    Ok(ScanBucket {
        day: day_from_number(day)?,
        device_class: DeviceClass::parse(&device_class),
        country: Country::from_column(country),
        count: u64::try_from(count).context("negative scan count")?,
    })
}

/// Convert a UTC day number (days since the Unix epoch) to a calendar date
pub(crate) fn day_from_number(day: i64) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(day * MILLIS_PER_DAY)
        .map(|ts| ts.date_naive())
        .ok_or_else(|| anyhow!("day number {day} out of range"))
}

pub(crate) fn rows_into_links(rows: Vec<LinkRow>) -> Result<Vec<ShortLink>> {
    rows.into_iter().map(ShortLink::try_from).collect()
}
