use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{Filter, FilterError, FilterOrderInfo};

/// A stored record: a JSON object carrying `_id`, `createdAt` and `updatedAt`
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Shaping applied to a `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Filter,
    pub sort: Vec<FilterOrderInfo>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn filtered(filter: Filter) -> Self {
        Self { filter, ..Default::default() }
    }
}

/// Field-level changes applied by `update_one`
#[derive(Debug, Clone, Default)]
pub struct Patch {
    /// Top-level fields to overwrite (`$set`); refreshes `updatedAt`
    pub set: Document,
    /// Numeric increments (`$inc`)
    pub inc: Vec<(String, i64)>,
    /// Array members added when absent (`$addToSet`)
    pub add_to_set: Vec<(String, Value)>,
}

impl Patch {
    pub fn set(fields: Document) -> Self {
        Self { set: fields, ..Default::default() }
    }

    pub fn inc(field: impl Into<String>, by: i64) -> Self {
        Self { inc: vec![(field.into(), by)], ..Default::default() }
    }

    pub fn add_to_set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { add_to_set: vec![(field.into(), value.into())], ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.add_to_set.is_empty()
    }

    /// `set` with `updatedAt` stamped, as written to the store
    pub fn stamped_set(&self) -> Document {
        let mut set = self.set.clone();
        set.remove("_id");
        set.remove("createdAt");
        if !set.is_empty() {
            set.insert("updatedAt".to_string(), Value::String(timestamp()));
        }
        set
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Persistence collaborator. Collections are created on first write.
/// Single-record operations act on the first match in insertion order.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find(&self, collection: &str, options: &FindOptions) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let options = FindOptions { filter: filter.clone(), limit: Some(1), ..Default::default() };
        Ok(self.find(collection, &options).await?.into_iter().next())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn create(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

    async fn update_one(&self, collection: &str, filter: &Filter, patch: &Patch) -> Result<UpdateResult, StoreError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteResult, StoreError>;

    /// Atomically add `value` to the array `field` when absent, remove it when
    /// present. Returns the resulting membership, or `None` when nothing matched.
    async fn toggle_member(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: &Value,
    ) -> Result<Option<bool>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Assign identity and timestamps to a new document
pub fn prepare_new(mut document: Document) -> Document {
    let now = timestamp();
    document.insert("_id".to_string(), Value::String(Uuid::new_v4().to_string()));
    document.insert("createdAt".to_string(), Value::String(now.clone()));
    document.insert("updatedAt".to_string(), Value::String(now));
    document
}

/// Serialize a typed model into a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value).map_err(|e| StoreError::InvalidDocument(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!("expected object, got {}", other))),
    }
}
