// handlers/home.rs - GET / and GET /health
use axum::extract::{Extension, State};
use chrono::Utc;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

/// GET / - welcome message, document links and the current user
pub async fn root(Extension(current): Extension<CurrentUser>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "message": "Welcome to Blog API",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": {
            "auth": "/auth/login, /auth/refresh, /auth/logout",
            "users": "/users[/:id]",
            "categories": "/categories[/:id]",
            "blogs": "/blogs[/:id], /blogs/category/:categoryId, /blogs/:id/getLike, /blogs/:id/postLike",
            "comments": "/comments[/:id]",
        },
        "user": current.0,
    }))
}

/// GET /health - store reachability
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    match state.store.ping().await {
        Ok(()) => Ok(ApiResponse::success(json!({
            "status": "ok",
            "timestamp": Utc::now(),
            "database": "ok",
        }))),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("database unavailable"))
        }
    }
}
