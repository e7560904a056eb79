//! Storage-specific error type wrapping sqlx errors.

use cropcloud_domain::error::CropCloudError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to encode or decode stored properties.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for CropCloudError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
