//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StorageError;

/// Pool size for file-backed databases.
const FILE_POOL_SIZE: u32 = 8;

/// Where the entity and analytics tables live.
///
/// The daemon fills this from `[database] url`; there is no separate
/// environment lookup here.
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:cropcloud.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Every connection to an in-memory database opens a fresh, empty one,
    /// so those pools are pinned to a single connection.
    fn max_connections(&self) -> u32 {
        if self.database_url.contains(":memory:") {
            1
        } else {
            FILE_POOL_SIZE
        }
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// and runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the connection or migrations fail.
    pub async fn build(self) -> Result<Database, StorageError> {
        let max_connections = self.max_connections();
        Database::initialize(&self.database_url, max_connections).await
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn initialize(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
