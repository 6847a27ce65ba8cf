use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgArguments, PgPoolOptions},
    PgPool, Postgres, Row,
};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::filter_order::FilterOrder;
use crate::filter::{push_param, Filter, FilterError, SqlParam, SqlResult};

use super::store::{
    prepare_new, DeleteResult, Document, FindOptions, Patch, Store, StoreError, UpdateResult,
};

/// Postgres-backed document store: one table per collection with the
/// document held in a JSONB column.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::ConnectionError("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        info!("Connected database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing tables for the given collections
    pub async fn ensure_collections(&self, collections: &[&str]) -> Result<(), StoreError> {
        for collection in collections {
            let table = table_name(collection)?;
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 seq BIGSERIAL NOT NULL, \
                 id TEXT PRIMARY KEY, \
                 data JSONB NOT NULL)"
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
            info!("Ensured collection table: {}", collection);
        }
        Ok(())
    }

    fn select_sql(collection: &str, options: &FindOptions) -> Result<SqlResult, StoreError> {
        let table = table_name(collection)?;
        let mut params = vec![];
        let where_clause = options.filter.to_where_sql(&mut params);
        let order_clause = FilterOrder::generate(&options.sort, &mut params);

        let mut query = format!("SELECT data FROM {table} WHERE {where_clause} {order_clause}");
        if options.skip > 0 {
            let skip = push_param(&mut params, SqlParam::Int(clamp(options.skip)));
            query.push_str(&format!(" OFFSET {skip}"));
        }
        if let Some(limit) = options.limit {
            let limit = push_param(&mut params, SqlParam::Int(clamp(limit)));
            query.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(SqlResult { query, params })
    }

    fn count_sql(collection: &str, filter: &Filter) -> Result<SqlResult, StoreError> {
        let table = table_name(collection)?;
        let mut params = vec![];
        let where_clause = filter.to_where_sql(&mut params);
        Ok(SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM {table} WHERE {where_clause}"),
            params,
        })
    }

    /// Matched/modified counts come from one statement so the update is atomic
    fn update_sql(collection: &str, filter: &Filter, patch: &Patch) -> Result<SqlResult, StoreError> {
        let table = table_name(collection)?;
        let mut params = vec![];
        let where_clause = filter.to_where_sql(&mut params);

        let mut expr = "t.data".to_string();
        let set = patch.stamped_set();
        if !set.is_empty() {
            let fields = push_param(&mut params, SqlParam::Json(Value::Object(set)));
            expr = format!("({expr} || {fields}::jsonb)");
        }
        for (field, by) in &patch.inc {
            let path = push_param(&mut params, SqlParam::Path(vec![field.clone()]));
            let by = push_param(&mut params, SqlParam::Int(*by));
            expr = format!(
                "jsonb_set({expr}, {path}::text[], to_jsonb(COALESCE((t.data #>> {path}::text[])::bigint, 0) + {by}::bigint))"
            );
        }
        for (field, value) in &patch.add_to_set {
            let path = push_param(&mut params, SqlParam::Path(vec![field.clone()]));
            let value = push_param(&mut params, SqlParam::Json(value.clone()));
            let current = format!("COALESCE(NULLIF(t.data #> {path}::text[], 'null'::jsonb), '[]'::jsonb)");
            expr = format!(
                "jsonb_set({expr}, {path}::text[], CASE WHEN {current} @> jsonb_build_array({value}::jsonb) \
                 THEN {current} ELSE {current} || jsonb_build_array({value}::jsonb) END)"
            );
        }

        let query = format!(
            "WITH target AS (SELECT id FROM {table} WHERE {where_clause} ORDER BY seq LIMIT 1 FOR UPDATE), \
             updated AS (UPDATE {table} AS t SET data = {expr} FROM target \
             WHERE t.id = target.id AND t.data IS DISTINCT FROM {expr} RETURNING t.id) \
             SELECT (SELECT COUNT(*) FROM target) AS matched, (SELECT COUNT(*) FROM updated) AS modified"
        );
        Ok(SqlResult { query, params })
    }

    fn delete_sql(collection: &str, filter: &Filter) -> Result<SqlResult, StoreError> {
        let table = table_name(collection)?;
        let mut params = vec![];
        let where_clause = filter.to_where_sql(&mut params);
        Ok(SqlResult {
            query: format!(
                "DELETE FROM {table} WHERE id = (SELECT id FROM {table} WHERE {where_clause} ORDER BY seq LIMIT 1)"
            ),
            params,
        })
    }

    fn toggle_sql(collection: &str, filter: &Filter, field: &str, value: &Value) -> Result<SqlResult, StoreError> {
        let table = table_name(collection)?;
        let mut params = vec![];
        let where_clause = filter.to_where_sql(&mut params);
        let path = push_param(&mut params, SqlParam::Path(vec![field.to_string()]));
        let value = push_param(&mut params, SqlParam::Json(value.clone()));
        let current = format!("COALESCE(NULLIF(t.data #> {path}::text[], 'null'::jsonb), '[]'::jsonb)");

        let query = format!(
            "UPDATE {table} AS t SET data = jsonb_set(t.data, {path}::text[], \
             CASE WHEN {current} @> jsonb_build_array({value}::jsonb) \
             THEN COALESCE((SELECT jsonb_agg(e) FROM jsonb_array_elements({current}) AS e WHERE e <> {value}::jsonb), '[]'::jsonb) \
             ELSE {current} || jsonb_build_array({value}::jsonb) END) \
             WHERE t.id = (SELECT id FROM {table} WHERE {where_clause} ORDER BY seq LIMIT 1) \
             RETURNING (t.data #> {path}::text[]) @> jsonb_build_array({value}::jsonb) AS member"
        );
        Ok(SqlResult { query, params })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find(&self, collection: &str, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        let sql = Self::select_sql(collection, options)?;
        let rows = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| match row.try_get::<Value, _>("data")? {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::InvalidDocument(format!("expected object, got {}", other))),
            })
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let sql = Self::count_sql(collection, filter)?;
        let row = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn create(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let table = table_name(collection)?;
        let document = prepare_new(document);
        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        sqlx::query(&format!("INSERT INTO {table} (id, data) VALUES ($1, $2::jsonb)"))
            .bind(id)
            .bind(Value::Object(document.clone()))
            .execute(&self.pool)
            .await?;
        Ok(document)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, patch: &Patch) -> Result<UpdateResult, StoreError> {
        if patch.is_empty() {
            let matched = self.count(collection, filter).await?.min(1);
            return Ok(UpdateResult { matched_count: matched, modified_count: 0 });
        }
        let sql = Self::update_sql(collection, filter, patch)?;
        let row = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        let matched: i64 = row.try_get("matched")?;
        let modified: i64 = row.try_get("modified")?;
        Ok(UpdateResult {
            matched_count: matched.max(0) as u64,
            modified_count: modified.max(0) as u64,
        })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteResult, StoreError> {
        let sql = Self::delete_sql(collection, filter)?;
        let result = bind_all(sqlx::query(&sql.query), &sql.params)
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult { deleted_count: result.rows_affected() })
    }

    async fn toggle_member(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: &Value,
    ) -> Result<Option<bool>, StoreError> {
        let sql = Self::toggle_sql(collection, filter, field, value)?;
        let row = bind_all(sqlx::query(&sql.query), &sql.params)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<bool, _>("member")?)),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Collections map to quoted table names; only `[A-Za-z_][A-Za-z0-9_]*` is accepted
fn table_name(collection: &str) -> Result<String, FilterError> {
    let mut chars = collection.chars();
    let valid_start = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidCollectionName(collection.to_string()));
    }
    Ok(format!("\"{}\"", collection))
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn bind_all<'q>(
    mut q: sqlx::query::Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for param in params {
        q = match param {
            SqlParam::Text(s) => q.bind(s.as_str()),
            SqlParam::Path(segments) => q.bind(segments.clone()),
            SqlParam::Json(v) => q.bind(v.clone()),
            SqlParam::Int(i) => q.bind(*i),
        };
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_collection_names() {
        assert_eq!(table_name("blogs").unwrap(), "\"blogs\"");
        assert!(table_name("blog_posts2").is_ok());
        assert!(table_name("").is_err());
        assert!(table_name("2blogs").is_err());
        assert!(table_name("blogs\"; DROP TABLE users").is_err());
    }

    #[test]
    fn select_binds_pagination_after_filters() {
        let options = FindOptions {
            filter: Filter::new().contains_ignore_case("title", "cat"),
            sort: FilterOrder::parse([("views", "desc")]),
            skip: 20,
            limit: Some(10),
        };
        let sql = PgStore::select_sql("blogs", &options).unwrap();
        assert!(sql.query.starts_with("SELECT data FROM \"blogs\" WHERE"));
        assert!(sql.query.contains("ORDER BY (data #> $3::text[]) DESC NULLS LAST, seq ASC"));
        assert!(sql.query.ends_with("OFFSET $4 LIMIT $5"));
        assert_eq!(sql.params[3], SqlParam::Int(20));
        assert_eq!(sql.params[4], SqlParam::Int(10));
    }

    #[test]
    fn update_statement_is_single_round_trip() {
        let patch = Patch {
            set: json!({"title": "t"}).as_object().cloned().unwrap(),
            inc: vec![("views".to_string(), 1)],
            add_to_set: vec![("viewers".to_string(), json!("ip"))],
        };
        let sql = PgStore::update_sql("blogs", &Filter::by_id("abc"), &patch).unwrap();
        assert!(sql.query.starts_with("WITH target AS"));
        assert!(sql.query.contains("FOR UPDATE"));
        assert!(sql.query.contains("AS matched"));
        assert_eq!(sql.params[0], SqlParam::Path(vec!["_id".to_string()]));
    }

    #[test]
    fn toggle_returns_membership() {
        let sql = PgStore::toggle_sql("blogs", &Filter::by_id("abc"), "likes", &json!("u1")).unwrap();
        assert!(sql.query.contains("RETURNING"));
        assert!(sql.query.contains("AS member"));
    }
}
