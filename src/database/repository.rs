use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::database::models::{Relation, Resource};
use crate::database::store::{Document, FindOptions, Patch, Store, StoreError, UpdateResult};
use crate::filter::{Filter, QuerySpec};

/// Typed access to one collection: list fetching with relation expansion,
/// single-record reads and writes. Hidden fields never leave this type.
pub struct Repository<R> {
    store: Arc<dyn Store>,
    _phantom: PhantomData<R>,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, _phantom: PhantomData }
    }

    /// Page of matching records plus the total match count before skip/limit
    pub async fn list(&self, spec: &QuerySpec) -> Result<(Vec<Document>, u64), StoreError> {
        let options = FindOptions {
            filter: spec.filter.clone(),
            sort: spec.sort.clone(),
            skip: spec.skip,
            limit: Some(spec.limit),
        };

        let mut records = self.store.find(R::COLLECTION, &options).await?;
        let total = self.store.count(R::COLLECTION, &spec.filter).await?;

        for name in &spec.populate {
            match R::relation(name) {
                Some(relation) => self.populate(&mut records, relation).await?,
                None => tracing::debug!("{} has no relation '{}', skipping", R::NAME, name),
            }
        }
        for record in records.iter_mut() {
            R::redact(record);
        }

        Ok((records, total))
    }

    /// Pagination summary for a list response
    pub async fn details(&self, spec: &QuerySpec) -> Result<Value, StoreError> {
        let total = self.store.count(R::COLLECTION, &spec.filter).await?;
        Ok(list_details(spec, total))
    }

    pub async fn select_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let Some(mut record) = self.store.find_one(R::COLLECTION, filter).await? else {
            return Ok(None);
        };
        R::redact(&mut record);
        Ok(Some(record))
    }

    /// Single record by id with the given relations expanded, or NotFound
    pub async fn select_404(&self, id: &str, populate: &[&str]) -> Result<Document, RepositoryError> {
        let mut records = self
            .store
            .find(R::COLLECTION, &FindOptions { limit: Some(1), ..FindOptions::filtered(Filter::by_id(id)) })
            .await?;
        if records.is_empty() {
            return Err(RepositoryError::NotFound(R::NAME));
        }
        for name in populate {
            if let Some(relation) = R::relation(name) {
                self.populate(&mut records, relation).await?;
            }
        }
        let mut record = records.remove(0);
        R::redact(&mut record);
        Ok(record)
    }

    /// Unredacted lookup, for credential checks
    pub async fn find_raw(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.store.find_one(R::COLLECTION, filter).await
    }

    pub async fn exists(&self, filter: &Filter) -> Result<bool, StoreError> {
        Ok(self.store.count(R::COLLECTION, filter).await? > 0)
    }

    pub async fn create(&self, document: Document) -> Result<Document, StoreError> {
        let mut created = self.store.create(R::COLLECTION, document).await?;
        R::redact(&mut created);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &Patch) -> Result<UpdateResult, StoreError> {
        self.store.update_one(R::COLLECTION, &Filter::by_id(id), patch).await
    }

    /// Removes the record, NotFound when nothing was deleted
    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = self.store.delete_one(R::COLLECTION, &Filter::by_id(id)).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::NotFound(R::NAME));
        }
        Ok(())
    }

    pub async fn toggle_member(&self, id: &str, field: &str, value: &Value) -> Result<Option<bool>, StoreError> {
        self.store.toggle_member(R::COLLECTION, &Filter::by_id(id), field, value).await
    }

    /// Replace `relation.field` (an id or an array of ids) with the referenced
    /// documents, fetched in one query. Dangling ids become null.
    async fn populate(&self, records: &mut [Document], relation: &Relation) -> Result<(), StoreError> {
        let mut ids: Vec<Value> = Vec::new();
        for record in records.iter() {
            match record.get(relation.field) {
                Some(Value::String(id)) => ids.push(Value::String(id.clone())),
                Some(Value::Array(items)) => ids.extend(items.iter().filter(|v| v.is_string()).cloned()),
                _ => {}
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }

        let related = self
            .store
            .find(relation.collection, &FindOptions::filtered(Filter::new().one_of("_id", ids)))
            .await?;
        let by_id: HashMap<String, Value> = related
            .into_iter()
            .filter_map(|mut doc| {
                for field in relation.hidden {
                    doc.remove(*field);
                }
                let id = doc.get("_id")?.as_str()?.to_string();
                Some((id, Value::Object(doc)))
            })
            .collect();

        let resolve = |id: &Value| -> Value {
            id.as_str()
                .and_then(|id| by_id.get(id))
                .cloned()
                .unwrap_or(Value::Null)
        };

        for record in records.iter_mut() {
            let Some(value) = record.get_mut(relation.field) else {
                continue;
            };
            match value {
                Value::String(_) => *value = resolve(&*value),
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        *item = resolve(&*item);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// `{filter, sort, skip, limit, page, pages, totalRecords}`; `pages` is false
/// when every record fits on one page
pub fn list_details(spec: &QuerySpec, total: u64) -> Value {
    let mut details = json!({
        "filter": spec.filter.to_json(),
        "sort": spec.sort_json(),
        "skip": spec.skip,
        "limit": spec.limit,
        "page": spec.page,
        "pages": false,
        "totalRecords": total,
    });

    if total > spec.limit && spec.limit > 0 {
        let total_pages = total.div_ceil(spec.limit);
        let current = spec.page + 1;
        details["pages"] = json!({
            "previous": if current > 1 { json!(current - 1) } else { json!(false) },
            "current": current,
            "next": if current < total_pages { json!(current + 1) } else { json!(false) },
            "total": total_pages,
        });
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{Blog, User};

    fn config() -> QueryConfig {
        QueryConfig { default_page_size: 20, max_limit: Some(1000), debug_logging: false }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> (Arc<dyn Store>, String) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = store
            .create("users", doc(json!({"username": "ada", "password": "hash"})))
            .await
            .unwrap();
        let user_id = user["_id"].as_str().unwrap().to_string();
        for i in 0..45 {
            let title = if i % 3 == 0 { format!("Cat {}", i) } else { format!("dog {}", i) };
            store
                .create("blogs", doc(json!({"title": title, "userId": user_id, "views": i})))
                .await
                .unwrap();
        }
        (store, user_id)
    }

    #[tokio::test]
    async fn count_is_stable_across_pages() {
        let (store, _) = seeded().await;
        let repo = Repository::<Blog>::new(store);

        let mut seen = 0;
        for page in 1..=3 {
            let spec = QuerySpec::from_query_string(Some(&format!("page={}", page)), &config());
            let (records, total) = repo.list(&spec).await.unwrap();
            assert_eq!(total, 45);
            seen += records.len();
        }
        assert_eq!(seen, 45);
    }

    #[tokio::test]
    async fn search_and_sort_apply_before_paging() {
        let (store, _) = seeded().await;
        let repo = Repository::<Blog>::new(store);

        let spec = QuerySpec::from_query_string(Some("search[title]=cAt&sort[views]=desc&limit=5"), &config());
        let (records, total) = repo.list(&spec).await.unwrap();
        assert_eq!(total, 15);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0]["views"], json!(42));
        assert_eq!(records[4]["views"], json!(30));
    }

    #[tokio::test]
    async fn populate_embeds_redacted_relations() {
        let (store, user_id) = seeded().await;
        store
            .create("blogs", doc(json!({"title": "orphan", "userId": "missing"})))
            .await
            .unwrap();
        let repo = Repository::<Blog>::new(store);

        let spec = QuerySpec::from_query_string(Some("limit=100"), &config()).with_populate(&["userId", "bogus"]);
        let (records, _) = repo.list(&spec).await.unwrap();
        assert_eq!(records[0]["userId"]["_id"], json!(user_id));
        assert!(records[0]["userId"].get("password").is_none());
        assert_eq!(records[45]["userId"], Value::Null);
    }

    #[tokio::test]
    async fn users_never_expose_password() {
        let (store, user_id) = seeded().await;
        let repo = Repository::<User>::new(store);

        let (records, _) = repo.list(&QuerySpec::from_query_string(None, &config())).await.unwrap();
        assert!(records[0].get("password").is_none());
        let one = repo.select_404(&user_id, &[]).await.unwrap();
        assert!(one.get("password").is_none());
        let raw = repo.find_raw(&Filter::by_id(&user_id)).await.unwrap().unwrap();
        assert_eq!(raw["password"], json!("hash"));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let (store, _) = seeded().await;
        let repo = Repository::<Blog>::new(store);
        assert!(matches!(repo.select_404("nope", &[]).await, Err(RepositoryError::NotFound("Blog"))));
        assert!(matches!(repo.delete("nope").await, Err(RepositoryError::NotFound("Blog"))));
    }

    #[test]
    fn details_report_page_edges() {
        let spec = QuerySpec::from_query_string(Some("page=1&limit=20"), &config());
        let details = list_details(&spec, 45);
        assert_eq!(details["pages"], json!({"previous": false, "current": 1, "next": 2, "total": 3}));
        assert_eq!(details["totalRecords"], json!(45));

        let spec = QuerySpec::from_query_string(Some("page=3&limit=20"), &config());
        assert_eq!(list_details(&spec, 45)["pages"]["next"], json!(false));

        let spec = QuerySpec::from_query_string(None, &config());
        assert_eq!(list_details(&spec, 20)["pages"], json!(false));
    }
}
