// handlers/mod.rs - one module per resource, mounted by app::build_app
pub mod auth;
pub mod blog;
pub mod category;
pub mod comment;
pub mod home;
pub mod user;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::store::Document;
use crate::error::ApiError;
use crate::filter::QuerySpec;
use crate::middleware::CurrentUser;

/// Parse list parameters from the raw query string
pub(crate) fn list_spec(state: &AppState, raw_query: Option<&str>) -> QuerySpec {
    QuerySpec::from_query_string(raw_query, &state.config.query)
}

/// Principal for a gated route. The gate has already run, so `None` only
/// happens when a route is mounted without one.
pub(crate) fn principal(current: &CurrentUser) -> Result<&Principal, ApiError> {
    current
        .principal()
        .ok_or_else(|| ApiError::forbidden("No permission: You must login"))
}

/// Owner or admin, else 403
pub(crate) fn ensure_can_modify(principal: &Principal, record: &Document) -> Result<(), ApiError> {
    let owner = record.get("userId").and_then(Value::as_str);
    if principal.can_modify(owner) {
        Ok(())
    } else {
        Err(ApiError::forbidden("No permission: You must be the owner or an admin"))
    }
}

/// First `X-Forwarded-For` hop, else the peer address
pub(crate) fn client_address(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
