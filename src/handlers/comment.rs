// handlers/comment.rs - /comments
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, RawQuery, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Blog, Comment, CommentPatch, NewComment};
use crate::database::store::Patch;
use crate::database::{Repository, RepositoryError};
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

use super::{ensure_can_modify, list_spec, principal};

/// GET /comments - author expanded
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Value> {
    let spec = list_spec(&state, query.as_deref()).with_populate(&["userId"]);
    let repo = Repository::<Comment>::new(state.store.clone());
    let (result, count) = repo.list(&spec).await?;
    let details = repo.details(&spec).await?;
    Ok(ApiResponse::success(json!({ "count": count, "details": details, "result": result })))
}

/// POST /comments - the caller becomes the author; the blog must exist
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<Value> {
    let principal = principal(&current)?;
    let Json(input) = payload?;
    let document = input.into_document(&principal.id)?;

    let blog_id = document.get("blogId").and_then(Value::as_str).unwrap_or_default();
    let blogs = Repository::<Blog>::new(state.store.clone());
    if !blogs.exists(&Filter::by_id(blog_id)).await? {
        return Err(RepositoryError::NotFound("Blog").into());
    }

    let body = Value::Object(document.clone());
    let created = Repository::<Comment>::new(state.store.clone()).create(document).await?;
    Ok(ApiResponse::created(json!({ "body": body, "result": created })))
}

/// GET /comments/:id - blog expanded
pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let repo = Repository::<Comment>::new(state.store.clone());
    let result = repo.select_404(&id, &["blogId"]).await?;
    Ok(ApiResponse::success(json!({ "result": result })))
}

/// PUT|PATCH /comments/:id (owner or admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<CommentPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let principal = principal(&current)?;
    let Json(input) = payload?;
    let repo = Repository::<Comment>::new(state.store.clone());

    let existing = repo.select_404(&id, &[]).await?;
    ensure_can_modify(principal, &existing)?;

    let body = json!(input);
    let result = repo.update(&id, &Patch::set(input.into_document()?)).await?;
    let new_data = repo.select_404(&id, &[]).await?;
    Ok(ApiResponse::accepted(json!({ "body": body, "result": result, "newData": new_data })))
}

/// DELETE /comments/:id (owner or admin)
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let principal = principal(&current)?;
    let repo = Repository::<Comment>::new(state.store.clone());
    let existing = repo.select_404(&id, &[]).await?;
    ensure_can_modify(principal, &existing)?;
    repo.delete(&id).await?;
    Ok(ApiResponse::no_content())
}
