use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Number, Value};
use tokio::sync::RwLock;

use crate::filter::filter_order::FilterOrder;
use crate::filter::Filter;

use super::store::{
    prepare_new, DeleteResult, Document, FindOptions, Patch, Store, StoreError, UpdateResult,
};

/// Process-local store used by tests and `--memory` runs.
/// Each collection keeps documents in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(&self, collection: &str, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched: Vec<&Document> = documents
            .iter()
            .filter(|doc| options.filter.matches(doc))
            .collect();
        // stable sort keeps insertion order as the final tie-break
        if !options.sort.is_empty() {
            matched.sort_by(|a, b| FilterOrder::compare(a, b, &options.sort));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn create(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let document = prepare_new(document);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, patch: &Patch) -> Result<UpdateResult, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter.matches(doc)))
        else {
            return Ok(UpdateResult::default());
        };

        // a failed operator leaves the stored document untouched
        let mut next = doc.clone();
        apply_patch(&mut next, patch)?;
        let modified = u64::from(next != *doc);
        *doc = next;

        Ok(UpdateResult { matched_count: 1, modified_count: modified })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteResult, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };
        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteResult { deleted_count: 1 })
            }
            None => Ok(DeleteResult::default()),
        }
    }

    async fn toggle_member(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: &Value,
    ) -> Result<Option<bool>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter.matches(doc)))
        else {
            return Ok(None);
        };

        let members = array_field(doc, field)?;
        match members.iter().position(|m| m == value) {
            Some(index) => {
                members.remove(index);
                Ok(Some(false))
            }
            None => {
                members.push(value.clone());
                Ok(Some(true))
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn apply_patch(doc: &mut Document, patch: &Patch) -> Result<(), StoreError> {
    for (key, value) in patch.stamped_set() {
        doc.insert(key, value);
    }

    for (field, by) in &patch.inc {
        let current = match doc.get(field) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                StoreError::QueryError(format!("Cannot increment non-integer field '{}'", field))
            })?,
            Some(_) => {
                return Err(StoreError::QueryError(format!(
                    "Cannot increment non-numeric field '{}'",
                    field
                )))
            }
        };
        doc.insert(field.clone(), Value::Number(Number::from(current + by)));
    }

    for (field, value) in &patch.add_to_set {
        let members = array_field(doc, field)?;
        if !members.contains(value) {
            members.push(value.clone());
        }
    }

    Ok(())
}

fn array_field<'a>(doc: &'a mut Document, field: &str) -> Result<&'a mut Vec<Value>, StoreError> {
    let slot = doc
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(vec![]));
    if slot.is_null() {
        *slot = Value::Array(vec![]);
    }
    slot.as_array_mut()
        .ok_or_else(|| StoreError::QueryError(format!("Field '{}' is not an array", field)))
}
