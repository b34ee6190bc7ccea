//! Scan bookkeeping repository

use crate::error::Result;
use crate::models::{ScanBookkeeping, ScanKind};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait ScanBookkeepingRepository: Send + Sync {
    /// Current bookkeeping record
    async fn get(&self) -> Result<ScanBookkeeping>;

    /// Advance the last-scan timestamps to `started_at` for a finished scan
    async fn record_scan(&self, kind: ScanKind, started_at: i64) -> Result<()>;

    /// Set or clear the marker that album/artist statistics may be stale
    async fn set_stats_dirty(&self, dirty: bool) -> Result<()>;
}

/// SQLite implementation of ScanBookkeepingRepository
pub struct SqliteScanBookkeepingRepository {
    pool: SqlitePool,
}

impl SqliteScanBookkeepingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanBookkeepingRepository for SqliteScanBookkeepingRepository {
    async fn get(&self) -> Result<ScanBookkeeping> {
        let bookkeeping = query_as::<_, ScanBookkeeping>(
            r#"
            SELECT last_scan_at, last_full_scan_at, last_incremental_scan_at, scan_count,
                   stats_dirty
            FROM scan_bookkeeping
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(bookkeeping.unwrap_or_default())
    }

    async fn record_scan(&self, kind: ScanKind, started_at: i64) -> Result<()> {
        let sql = match kind {
            ScanKind::Full => {
                r#"
                INSERT INTO scan_bookkeeping (id, last_scan_at, last_full_scan_at, scan_count)
                VALUES (1, ?1, ?1, 1)
                ON CONFLICT(id) DO UPDATE SET
                    last_scan_at = ?1,
                    last_full_scan_at = ?1,
                    scan_count = scan_count + 1
                "#
            }
            ScanKind::Incremental => {
                r#"
                INSERT INTO scan_bookkeeping (id, last_scan_at, last_incremental_scan_at, scan_count)
                VALUES (1, ?1, ?1, 1)
                ON CONFLICT(id) DO UPDATE SET
                    last_scan_at = ?1,
                    last_incremental_scan_at = ?1,
                    scan_count = scan_count + 1
                "#
            }
        };

        query(sql).bind(started_at).execute(&self.pool).await?;

        Ok(())
    }

    async fn set_stats_dirty(&self, dirty: bool) -> Result<()> {
        query(
            r#"
            INSERT INTO scan_bookkeeping (id, scan_count, stats_dirty)
            VALUES (1, 0, ?1)
            ON CONFLICT(id) DO UPDATE SET stats_dirty = ?1
            "#,
        )
        .bind(dirty)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_fresh_store_has_no_scan() {
        let repo = SqliteScanBookkeepingRepository::new(create_test_pool().await.unwrap());
        let bookkeeping = repo.get().await.unwrap();

        assert_eq!(bookkeeping.last_scan_at, None);
        assert_eq!(bookkeeping.scan_count, 0);
        assert!(!bookkeeping.stats_dirty);
    }

    #[tokio::test]
    async fn test_record_scans() {
        let repo = SqliteScanBookkeepingRepository::new(create_test_pool().await.unwrap());

        repo.record_scan(ScanKind::Full, 1_000).await.unwrap();
        repo.record_scan(ScanKind::Incremental, 2_000).await.unwrap();

        let bookkeeping = repo.get().await.unwrap();
        assert_eq!(bookkeeping.last_scan_at, Some(2_000));
        assert_eq!(bookkeeping.last_full_scan_at, Some(1_000));
        assert_eq!(bookkeeping.last_incremental_scan_at, Some(2_000));
        assert_eq!(bookkeeping.scan_count, 2);
    }

    #[tokio::test]
    async fn test_stats_dirty_marker() {
        let repo = SqliteScanBookkeepingRepository::new(create_test_pool().await.unwrap());
        repo.record_scan(ScanKind::Full, 1_000).await.unwrap();

        repo.set_stats_dirty(true).await.unwrap();
        let bookkeeping = repo.get().await.unwrap();
        assert!(bookkeeping.stats_dirty);
        assert_eq!(bookkeeping.last_full_scan_at, Some(1_000));

        repo.set_stats_dirty(false).await.unwrap();
        assert!(!repo.get().await.unwrap().stats_dirty);
    }
}
