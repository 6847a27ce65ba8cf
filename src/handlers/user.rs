// handlers/user.rs - /users
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, RawQuery, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{NewUser, User, UserPatch};
use crate::database::store::{Document, Patch};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

use super::{list_spec, principal};

/// GET /users (admin)
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Value> {
    let spec = list_spec(&state, query.as_deref());
    let repo = Repository::<User>::new(state.store.clone());
    let (result, count) = repo.list(&spec).await?;
    let details = repo.details(&spec).await?;
    Ok(ApiResponse::success(json!({ "count": count, "details": details, "result": result })))
}

/// POST /users - registration; role flags are honoured only for admins
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let privileged = current.principal().is_some_and(|p| p.is_active && p.is_admin);
    let document = input.into_document(&state.config.security.secret_key, privileged)?;

    let repo = Repository::<User>::new(state.store.clone());
    ensure_unique(&repo, &document, None).await?;

    let created = repo.create(document).await?;
    let username = created.get("username").and_then(Value::as_str).unwrap_or_default();
    tracing::info!("Registered user {}", username);
    Ok(ApiResponse::created(json!({ "result": created })))
}

/// GET /users/:id (self or admin)
pub async fn read(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    ensure_self_or_admin(principal(&current)?, &id)?;
    let result = Repository::<User>::new(state.store.clone()).select_404(&id, &[]).await?;
    Ok(ApiResponse::success(json!({ "result": result })))
}

/// PUT|PATCH /users/:id (self or admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let principal = principal(&current)?;
    ensure_self_or_admin(principal, &id)?;
    let Json(input) = payload?;

    let repo = Repository::<User>::new(state.store.clone());
    repo.select_404(&id, &[]).await?;

    let document = input.into_document(&state.config.security.secret_key, principal.is_admin)?;
    ensure_unique(&repo, &document, Some(&id)).await?;

    let result = repo.update(&id, &Patch::set(document)).await?;
    let new_data = repo.select_404(&id, &[]).await?;
    Ok(ApiResponse::accepted(json!({ "result": result, "newData": new_data })))
}

/// DELETE /users/:id (self or admin)
pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    ensure_self_or_admin(principal(&current)?, &id)?;
    Repository::<User>::new(state.store.clone()).delete(&id).await?;
    Ok(ApiResponse::no_content())
}

fn ensure_self_or_admin(principal: &Principal, id: &str) -> Result<(), ApiError> {
    if principal.is_admin || principal.id == id {
        Ok(())
    } else {
        Err(ApiError::forbidden("No permission: You can only access your own account"))
    }
}

/// 409 when another user already holds the username or email
async fn ensure_unique(repo: &Repository<User>, document: &Document, own_id: Option<&str>) -> Result<(), ApiError> {
    for field in ["username", "email"] {
        let Some(value) = document.get(field).and_then(Value::as_str) else {
            continue;
        };
        let holder = repo.select_one(&Filter::new().eq(field, value)).await?;
        let held_by_other = holder
            .as_ref()
            .and_then(|h| h.get("_id"))
            .and_then(Value::as_str)
            .is_some_and(|holder_id| Some(holder_id) != own_id);
        if held_by_other {
            return Err(ApiError::conflict(format!("This {} is already in use", field)));
        }
    }
    Ok(())
}
