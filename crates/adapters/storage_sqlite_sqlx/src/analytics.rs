//! `SQLite` implementation of [`AnalyticsSink`].

use sqlx::SqlitePool;

use cropcloud_app::ports::AnalyticsSink;
use cropcloud_domain::analytics::AnalyticsRow;
use cropcloud_domain::error::CropCloudError;

use crate::error::StorageError;

const INSERT: &str = r"
    INSERT INTO analytics_rows (table_name, row_key, timestamp, payload)
    VALUES (?, ?, ?, ?)
";

/// Appends analytics rows to a single `analytics_rows` table, the target
/// table name kept as a column.
#[derive(Clone)]
pub struct SqliteAnalyticsSink {
    pool: SqlitePool,
}

impl SqliteAnalyticsSink {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AnalyticsSink for SqliteAnalyticsSink {
    async fn insert(&self, row: AnalyticsRow) -> Result<(), CropCloudError> {
        let payload = serde_json::to_string(&row.payload).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(&row.table)
            .bind(&row.key)
            .bind(&row.timestamp)
            .bind(&payload)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
