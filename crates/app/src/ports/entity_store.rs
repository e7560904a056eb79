//! Entity store port: the key-value document store every record lives in.
//!
//! Entities are schemaless property maps grouped by *kind*. A key is either
//! incomplete (the store allocates a numeric id on `put`), a numeric id or a
//! caller-chosen name.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use cropcloud_domain::error::CropCloudError;

/// Identity of an entity within its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPath {
    /// Not yet stored; the store allocates an id.
    Incomplete,
    Id(i64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub kind: String,
    pub path: KeyPath,
}

impl Key {
    #[must_use]
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: KeyPath::Incomplete,
        }
    }

    #[must_use]
    pub fn id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            path: KeyPath::Id(id),
        }
    }

    #[must_use]
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: KeyPath::Name(name.into()),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self.path, KeyPath::Incomplete)
    }

    /// The key name, if this is a named key.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match &self.path {
            KeyPath::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: Key,
    pub properties: Map<String, Value>,
}

impl Entity {
    #[must_use]
    pub fn new(key: Key, properties: Map<String, Value>) -> Self {
        Self { key, properties }
    }

    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }

    /// String property, if present and a string.
    #[must_use]
    pub fn get_str(&self, property: &str) -> Option<&str> {
        self.properties.get(property).and_then(Value::as_str)
    }
}

/// Sort order on a single property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Ascending(String),
    Descending(String),
}

/// Query over one kind: equality filters, an optional order and limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: String,
    pub filters: Vec<(String, Value)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Keep entities whose `property` equals `value`.
    #[must_use]
    pub fn filter(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((property.into(), value.into()));
        self
    }

    #[must_use]
    pub fn order_desc(mut self, property: impl Into<String>) -> Self {
        self.order = Some(Order::Descending(property.into()));
        self
    }

    #[must_use]
    pub fn order_asc(mut self, property: impl Into<String>) -> Self {
        self.order = Some(Order::Ascending(property.into()));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Kind/key document store.
///
/// Entities with equal sort values are returned newest-written first.
pub trait EntityStore {
    /// Fetch one entity by complete key.
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Entity>, CropCloudError>> + Send;

    /// Insert or replace an entity. Incomplete keys are allocated an id;
    /// the stored key is returned.
    fn put(&self, entity: Entity) -> impl Future<Output = Result<Key, CropCloudError>> + Send;

    /// Delete an entity. Deleting a missing key is not an error.
    fn delete(&self, key: &Key) -> impl Future<Output = Result<(), CropCloudError>> + Send;

    /// Run a query and return matching entities.
    fn query(
        &self,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Entity>, CropCloudError>> + Send;

    /// Run a query and return only the keys of matching entities.
    fn keys(&self, query: &Query) -> impl Future<Output = Result<Vec<Key>, CropCloudError>> + Send;
}

impl<T: EntityStore + Send + Sync> EntityStore for Arc<T> {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Entity>, CropCloudError>> + Send {
        (**self).get(key)
    }

    fn put(&self, entity: Entity) -> impl Future<Output = Result<Key, CropCloudError>> + Send {
        (**self).put(entity)
    }

    fn delete(&self, key: &Key) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).delete(key)
    }

    fn query(
        &self,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Entity>, CropCloudError>> + Send {
        (**self).query(query)
    }

    fn keys(&self, query: &Query) -> impl Future<Output = Result<Vec<Key>, CropCloudError>> + Send {
        (**self).keys(query)
    }
}
