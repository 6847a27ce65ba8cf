// handlers/category.rs - /categories
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, RawQuery, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Category, CategoryPatch, NewCategory};
use crate::database::store::Patch;
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

use super::list_spec;

/// GET /categories
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Value> {
    let spec = list_spec(&state, query.as_deref());
    let repo = Repository::<Category>::new(state.store.clone());
    let (result, count) = repo.list(&spec).await?;
    Ok(ApiResponse::success(json!({ "count": count, "result": result })))
}

/// POST /categories (admin)
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let body = json!(input);
    let repo = Repository::<Category>::new(state.store.clone());
    let created = repo.create(input.into_document()?).await?;
    Ok(ApiResponse::created(json!({ "body": body, "result": created })))
}

/// GET /categories/:id
pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let repo = Repository::<Category>::new(state.store.clone());
    let result = repo.select_404(&id, &[]).await?;
    Ok(ApiResponse::success(json!({ "result": result })))
}

/// PUT|PATCH /categories/:id (admin)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let body = json!(input);
    let repo = Repository::<Category>::new(state.store.clone());

    let result = repo.update(&id, &Patch::set(input.into_document()?)).await?;
    if result.matched_count == 0 {
        return Err(ApiError::not_found("Category not found"));
    }
    let new_data = repo.select_404(&id, &[]).await?;
    Ok(ApiResponse::accepted(json!({ "body": body, "result": result, "newData": new_data })))
}

/// DELETE /categories/:id (admin)
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    Repository::<Category>::new(state.store.clone()).delete(&id).await?;
    Ok(ApiResponse::no_content())
}
