//! `SQLite` implementation of [`EntityStore`].
//!
//! Properties are stored as one JSON document per row. Filters and sort
//! orders are evaluated with `json_extract`, so any property can be queried
//! without a schema change.

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};

use cropcloud_app::ports::{Entity, EntityStore, Key, KeyPath, Order, Query};
use cropcloud_domain::error::CropCloudError;

use crate::error::StorageError;

/// Wrapper for converting database rows into entities without polluting the
/// port types with database concerns.
struct Wrapper(Entity);

fn row_key(row: &SqliteRow) -> Result<Key, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let key_id: Option<i64> = row.try_get("key_id")?;
    let key_name: Option<String> = row.try_get("key_name")?;
    Ok(match (key_name, key_id) {
        (Some(name), _) => Key::name(kind, name),
        (None, Some(id)) => Key::id(kind, id),
        (None, None) => Key::incomplete(kind),
    })
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let key = row_key(row)?;
        let properties: String = row.try_get("properties")?;
        let properties: Map<String, Value> =
            serde_json::from_str(&properties).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        Ok(Self(Entity::new(key, properties)))
    }
}

struct KeyRow(Key);

impl<'r> FromRow<'r, SqliteRow> for KeyRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        row_key(row).map(Self)
    }
}

const INSERT_ALLOCATED: &str = r"
    INSERT INTO entities (kind, key_id, properties)
    VALUES (?, (SELECT COALESCE(MAX(key_id), 0) + 1 FROM entities WHERE kind = ?), ?)
    RETURNING key_id
";
const INSERT_ID: &str = "INSERT INTO entities (kind, key_id, properties) VALUES (?, ?, ?)";
const INSERT_NAME: &str = "INSERT INTO entities (kind, key_name, properties) VALUES (?, ?, ?)";

const SELECT_BY_ID: &str = "SELECT * FROM entities WHERE kind = ? AND key_id = ?";
const SELECT_BY_NAME: &str = "SELECT * FROM entities WHERE kind = ? AND key_name = ?";

const DELETE_BY_ID: &str = "DELETE FROM entities WHERE kind = ? AND key_id = ?";
const DELETE_BY_NAME: &str = "DELETE FROM entities WHERE kind = ? AND key_name = ?";

/// JSON path of a top-level property, quoted so any property name works.
fn json_path(property: &str) -> String {
    format!("$.\"{}\"", property.replace('"', "\\\""))
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => {
            builder.push(" IS NULL");
        }
        Value::Bool(flag) => {
            builder.push(" = ").push_bind(i64::from(*flag));
        }
        Value::Number(number) => {
            builder.push(" = ");
            match number.as_i64() {
                Some(int) => builder.push_bind(int),
                None => builder.push_bind(number.as_f64().unwrap_or_default()),
            };
        }
        Value::String(text) => {
            builder.push(" = ").push_bind(text.clone());
        }
        Value::Array(_) | Value::Object(_) => {
            builder.push(" = json(").push_bind(value.to_string()).push(")");
        }
    }
}

fn build_query<'a>(columns: &str, query: &'a Query) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(format!("SELECT {columns} FROM entities WHERE kind = "));
    builder.push_bind(query.kind.as_str());
    for (property, value) in &query.filters {
        builder
            .push(" AND json_extract(properties, ")
            .push_bind(json_path(property))
            .push(")");
        push_value(&mut builder, value);
    }
    match &query.order {
        Some(Order::Ascending(property)) => {
            builder
                .push(" ORDER BY json_extract(properties, ")
                .push_bind(json_path(property))
                .push(") ASC, seq DESC");
        }
        Some(Order::Descending(property)) => {
            builder
                .push(" ORDER BY json_extract(properties, ")
                .push_bind(json_path(property))
                .push(") DESC, seq DESC");
        }
        None => {
            builder.push(" ORDER BY seq ASC");
        }
    }
    if let Some(limit) = query.limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    builder
}

/// `SQLite`-backed entity store.
#[derive(Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
}

impl SqliteEntityStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EntityStore for SqliteEntityStore {
    async fn get(&self, key: &Key) -> Result<Option<Entity>, CropCloudError> {
        let row: Option<Wrapper> = match &key.path {
            KeyPath::Incomplete => return Ok(None),
            KeyPath::Id(id) => sqlx::query_as(SELECT_BY_ID)
                .bind(&key.kind)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?,
            KeyPath::Name(name) => sqlx::query_as(SELECT_BY_NAME)
                .bind(&key.kind)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?,
        };

        Ok(row.map(|w| w.0))
    }

    async fn put(&self, entity: Entity) -> Result<Key, CropCloudError> {
        let properties = serde_json::to_string(&entity.properties).map_err(StorageError::from)?;
        let Entity { key, .. } = entity;
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let stored = match key.path {
            KeyPath::Incomplete => {
                let id: i64 = sqlx::query_scalar(INSERT_ALLOCATED)
                    .bind(&key.kind)
                    .bind(&key.kind)
                    .bind(&properties)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                Key::id(key.kind, id)
            }
            KeyPath::Id(id) => {
                sqlx::query(DELETE_BY_ID)
                    .bind(&key.kind)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                sqlx::query(INSERT_ID)
                    .bind(&key.kind)
                    .bind(id)
                    .bind(&properties)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                Key::id(key.kind, id)
            }
            KeyPath::Name(name) => {
                sqlx::query(DELETE_BY_NAME)
                    .bind(&key.kind)
                    .bind(&name)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                sqlx::query(INSERT_NAME)
                    .bind(&key.kind)
                    .bind(&name)
                    .bind(&properties)
                    .execute(&mut *tx)
                    .await
                    .map_err(StorageError::from)?;
                Key::name(key.kind, name)
            }
        };

        tx.commit().await.map_err(StorageError::from)?;
        Ok(stored)
    }

    async fn delete(&self, key: &Key) -> Result<(), CropCloudError> {
        let statement = match &key.path {
            KeyPath::Incomplete => return Ok(()),
            KeyPath::Id(id) => sqlx::query(DELETE_BY_ID).bind(&key.kind).bind(*id),
            KeyPath::Name(name) => sqlx::query(DELETE_BY_NAME).bind(&key.kind).bind(name.as_str()),
        };
        statement
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Entity>, CropCloudError> {
        let rows: Vec<Wrapper> = build_query("kind, key_id, key_name, properties", query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn keys(&self, query: &Query) -> Result<Vec<Key>, CropCloudError> {
        let rows: Vec<KeyRow> = build_query("kind, key_id, key_name", query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|k| k.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use serde_json::json;

    async fn setup() -> SqliteEntityStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteEntityStore::new(db.pool().clone())
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn should_store_and_fetch_named_entity() {
        let store = setup().await;
        let key = Key::name("Devices", "EDU-1");
        store
            .put(Entity::new(key.clone(), props(json!({"device_name": "Kitchen"}))))
            .await
            .unwrap();

        let fetched = store.get(&key).await.unwrap().unwrap();
        assert_eq!(fetched.key, key);
        assert_eq!(fetched.get_str("device_name"), Some("Kitchen"));
    }

    #[tokio::test]
    async fn should_return_none_when_key_is_missing() {
        let store = setup().await;
        assert!(store.get(&Key::name("Devices", "nope")).await.unwrap().is_none());
        assert!(store.get(&Key::id("Devices", 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_allocate_increasing_ids_per_kind() {
        let store = setup().await;
        let first = store
            .put(Entity::new(Key::incomplete("A"), Map::new()))
            .await
            .unwrap();
        let second = store
            .put(Entity::new(Key::incomplete("A"), Map::new()))
            .await
            .unwrap();
        let other = store
            .put(Entity::new(Key::incomplete("B"), Map::new()))
            .await
            .unwrap();

        assert_eq!(first, Key::id("A", 1));
        assert_eq!(second, Key::id("A", 2));
        assert_eq!(other, Key::id("B", 1));
    }

    #[tokio::test]
    async fn should_replace_entity_with_same_key() {
        let store = setup().await;
        let key = Key::name("Schedule", "check_fluid");
        store
            .put(Entity::new(key.clone(), props(json!({"count": 0}))))
            .await
            .unwrap();
        store
            .put(Entity::new(key.clone(), props(json!({"count": 1}))))
            .await
            .unwrap();

        let all = store.query(&Query::new("Schedule")).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("count"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn should_filter_order_and_limit() {
        let store = setup().await;
        for (ts, device) in [
            ("2024-01-01T00:00:00Z", "EDU-1"),
            ("2024-01-03T00:00:00Z", "EDU-1"),
            ("2024-01-02T00:00:00Z", "EDU-1"),
            ("2024-01-04T00:00:00Z", "EDU-2"),
        ] {
            store
                .put(Entity::new(
                    Key::incomplete("Images"),
                    props(json!({"timestamp": ts, "device_uuid": device})),
                ))
                .await
                .unwrap();
        }

        let query = Query::new("Images")
            .filter("device_uuid", "EDU-1")
            .order_desc("timestamp")
            .limit(Some(2));
        let found = store.query(&query).await.unwrap();
        let stamps: Vec<&str> = found.iter().filter_map(|e| e.get_str("timestamp")).collect();
        assert_eq!(stamps, vec!["2024-01-03T00:00:00Z", "2024-01-02T00:00:00Z"]);

        let ascending = store
            .query(&Query::new("Images").order_asc("timestamp"))
            .await
            .unwrap();
        assert_eq!(ascending[0].get_str("timestamp"), Some("2024-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn should_return_newest_write_first_on_equal_sort_values() {
        let store = setup().await;
        for seq in 0..3 {
            store
                .put(Entity::new(
                    Key::incomplete("Runs"),
                    props(json!({"timestamp": "2024-01-01T00:00:00Z", "seq": seq})),
                ))
                .await
                .unwrap();
        }
        let found = store
            .query(&Query::new("Runs").order_desc("timestamp").limit(Some(1)))
            .await
            .unwrap();
        assert_eq!(found[0].get("seq"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn should_filter_on_numbers_and_booleans() {
        let store = setup().await;
        store
            .put(Entity::new(
                Key::name("Users", "a"),
                props(json!({"is_verified": true, "age": 3})),
            ))
            .await
            .unwrap();
        store
            .put(Entity::new(Key::name("Users", "b"), props(json!({"is_verified": false}))))
            .await
            .unwrap();

        let verified = store
            .keys(&Query::new("Users").filter("is_verified", true))
            .await
            .unwrap();
        assert_eq!(verified, vec![Key::name("Users", "a")]);
        let aged = store.keys(&Query::new("Users").filter("age", 3)).await.unwrap();
        assert_eq!(aged.len(), 1);
    }

    #[tokio::test]
    async fn should_ignore_delete_of_missing_key() {
        let store = setup().await;
        let key = Key::id("Notifications", 7);
        store.delete(&key).await.unwrap();
        store.put(Entity::new(key.clone(), Map::new())).await.unwrap();
        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
