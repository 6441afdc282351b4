use crate::models::{ScanBucket, ScanEvent, ShortLink};
use crate::storage::rows::{bucket_from_row, rows_into_links, BucketRow, LinkRow, MILLIS_PER_DAY};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS claimed_codes (
                code TEXT PRIMARY KEY,
                claimed_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY REFERENCES claimed_codes(code),
                original_content TEXT NOT NULL,
                content_kind TEXT NOT NULL,
                fg_color TEXT NOT NULL,
                bg_color TEXT NOT NULL,
                module_size BIGINT NOT NULL,
                border_width BIGINT NOT NULL,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_created_at ON links(created_at)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scans (
                id BIGSERIAL PRIMARY KEY,
                link_id TEXT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
                occurred_at BIGINT NOT NULL,
                device_class TEXT NOT NULL,
                country TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scans_link_id ON scans(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_link(&self, link: &ShortLink) -> StorageResult<()> {
        let created_at = link.created_at.timestamp_millis();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        let claimed = sqlx::query(
            r#"
            INSERT INTO claimed_codes (code, claimed_at)
            VALUES ($1, $2)
            ON CONFLICT(code) DO NOTHING
            "#,
        )
        .bind(&link.id)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if claimed.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r#"
            INSERT INTO links (id, original_content, content_kind, fg_color, bg_color,
                               module_size, border_width, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&link.id)
        .bind(&link.original_content)
        .bind(link.content_kind.as_str())
        .bind(&link.style.foreground_color)
        .bind(&link.style.background_color)
        .bind(i64::from(link.style.module_size))
        .bind(i64::from(link.style.border_width))
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        Ok(())
    }

    async fn get_link(&self, id: &str) -> Result<Option<ShortLink>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, original_content, content_kind, fg_color, bg_color,
                   module_size, border_width, created_at
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(ShortLink::try_from).transpose()
    }

    async fn list_links(&self) -> Result<Vec<ShortLink>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, original_content, content_kind, fg_color, bg_color,
                   module_size, border_width, created_at
            FROM links
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        rows_into_links(rows)
    }

    async fn delete_link(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM scans WHERE link_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_scan(&self, event: &ScanEvent) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO scans (link_id, occurred_at, device_class, country)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM links WHERE id = $1)
            "#,
        )
        .bind(&event.link_id)
        .bind(event.occurred_at.timestamp_millis())
        .bind(event.device_class.as_str())
        .bind(event.country.code())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn scan_buckets(&self, link_id: &str) -> Result<Vec<ScanBucket>> {
        let rows = sqlx::query_as::<_, BucketRow>(
            r#"
            SELECT occurred_at / $1 AS day, device_class, country, COUNT(*) AS count
            FROM scans
            WHERE link_id = $2
            GROUP BY day, device_class, country
            ORDER BY day ASC
            "#,
        )
        .bind(MILLIS_PER_DAY)
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(bucket_from_row).collect()
    }
}
