// handlers/blog.rs - /blogs
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Extension, Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Blog, BlogPatch, NewBlog};
use crate::database::store::Patch;
use crate::database::{Repository, RepositoryError};
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

use super::{client_address, ensure_can_modify, list_spec, principal};

const RELATIONS: &[&str] = &["blogCategoryId", "userId"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeSummary {
    pub did_user_like: bool,
    pub count_of_likes: usize,
    pub likes: Vec<Value>,
}

impl LikeSummary {
    fn of(blog: &crate::database::store::Document, user_id: &str) -> Self {
        let likes = blog
            .get("likes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self {
            did_user_like: likes.iter().any(|l| l.as_str() == Some(user_id)),
            count_of_likes: likes.len(),
            likes,
        }
    }
}

/// GET /blogs - category and author expanded
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Value> {
    let spec = list_spec(&state, query.as_deref()).with_populate(RELATIONS);
    let repo = Repository::<Blog>::new(state.store.clone());
    let (result, count) = repo.list(&spec).await?;
    let details = repo.details(&spec).await?;
    Ok(ApiResponse::success(json!({ "count": count, "details": details, "result": result })))
}

/// GET /blogs/category/:categoryId
pub async fn list_category_posts(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Value> {
    let spec = list_spec(&state, query.as_deref())
        .with_filter(&Filter::new().eq("blogCategoryId", category_id))
        .with_populate(&["blogCategoryId"]);
    let repo = Repository::<Blog>::new(state.store.clone());
    let (result, count) = repo.list(&spec).await?;
    Ok(ApiResponse::success(json!({ "count": count, "result": result })))
}

/// POST /blogs - the caller becomes the author
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<NewBlog>, JsonRejection>,
) -> ApiResult<Value> {
    let principal = principal(&current)?;
    let Json(input) = payload?;
    let document = input.into_document(&principal.id)?;

    let body = Value::Object(document.clone());
    let created = Repository::<Blog>::new(state.store.clone()).create(document).await?;
    Ok(ApiResponse::created(json!({ "body": body, "result": created })))
}

/// GET /blogs/:id - the first visit from a client address counts as a view
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> ApiResult<Value> {
    let repo = Repository::<Blog>::new(state.store.clone());
    let address = client_address(&headers, peer.as_ref());

    let seen = repo.update(&id, &Patch::add_to_set("viewers", address)).await?;
    if seen.matched_count == 0 {
        return Err(RepositoryError::NotFound("Blog").into());
    }
    if seen.modified_count > 0 {
        repo.update(&id, &Patch::inc("views", 1)).await?;
    }

    let result = repo.select_404(&id, RELATIONS).await?;
    let views = result.get("views").cloned().unwrap_or(json!(0));
    Ok(ApiResponse::success(json!({ "result": result, "views": views })))
}

/// PUT|PATCH /blogs/:id (owner or admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<BlogPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let principal = principal(&current)?;
    let Json(input) = payload?;
    let repo = Repository::<Blog>::new(state.store.clone());

    let existing = repo.select_404(&id, &[]).await?;
    ensure_can_modify(principal, &existing)?;

    let body = json!(input);
    let result = repo.update(&id, &Patch::set(input.into_document()?)).await?;
    let new_data = repo.select_404(&id, &[]).await?;
    Ok(ApiResponse::accepted(json!({ "body": body, "result": result, "newData": new_data })))
}

/// DELETE /blogs/:id (owner or admin)
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let principal = principal(&current)?;
    let repo = Repository::<Blog>::new(state.store.clone());
    let existing = repo.select_404(&id, &[]).await?;
    ensure_can_modify(principal, &existing)?;
    repo.delete(&id).await?;
    Ok(ApiResponse::no_content())
}

/// GET /blogs/:id/getLike
pub async fn get_like(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<LikeSummary> {
    let principal = principal(&current)?;
    let blog = Repository::<Blog>::new(state.store.clone()).select_404(&id, &[]).await?;
    Ok(ApiResponse::success(LikeSummary::of(&blog, &principal.id)))
}

/// POST /blogs/:id/postLike - flips the caller's like in a single store operation
pub async fn post_like(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<LikeSummary> {
    let principal = principal(&current)?;
    let repo = Repository::<Blog>::new(state.store.clone());

    let liked = repo
        .toggle_member(&id, "likes", &json!(principal.id))
        .await?
        .ok_or(RepositoryError::NotFound("Blog"))?;
    tracing::debug!("User {} {} blog {}", principal.id, if liked { "liked" } else { "unliked" }, id);

    let blog = repo.select_404(&id, &[]).await?;
    Ok(ApiResponse::success(LikeSummary::of(&blog, &principal.id)))
}
