//! # cropcloud-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `EntityStore` and `AnalyticsSink` from `cropcloud-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between entities and database rows, property filters and ordering
//!   going through `json_extract`
//!
//! ## Dependency rule
//! Depends on `cropcloud-app` (for port traits) and `cropcloud-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod analytics;
mod entity_store;
mod error;
pub mod pool;

pub use analytics::SqliteAnalyticsSink;
pub use entity_store::SqliteEntityStore;
pub use error::StorageError;
