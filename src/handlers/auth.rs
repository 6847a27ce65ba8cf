// handlers/auth.rs - /auth/login, /auth/refresh, /auth/logout
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{generate_access_token, generate_refresh_token, verify, Principal, RefreshClaims};
use crate::database::models::{Resource, Token, User};
use crate::database::store::Document;
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub bearer: Option<RefreshBearer>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshBearer {
    pub refresh: Option<String>,
}

/// POST /auth/login - check credentials, issue a session token and a JWT pair
///
/// Accepts `{username, password}` or `{email, password}`. An existing session
/// token for the user is reused rather than replaced.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let password = input.password.as_deref().unwrap_or_default();

    let filter = match (input.username.as_deref(), input.email.as_deref()) {
        (Some(username), _) if !username.trim().is_empty() => Filter::new().eq("username", username.trim()),
        (_, Some(email)) if !email.trim().is_empty() => Filter::new().eq("email", email.trim()),
        _ => return Err(ApiError::unauthorized("Please enter username/email and password.")),
    };
    if password.is_empty() {
        return Err(ApiError::unauthorized("Please enter username/email and password."));
    }

    let users = Repository::<User>::new(state.store.clone());
    let user = users
        .find_raw(&filter)
        .await?
        .filter(|u| {
            let stored = u.get("password").and_then(Value::as_str).unwrap_or_default();
            verify_password(password, &state.config.security.secret_key, stored)
        })
        .ok_or_else(|| ApiError::unauthorized("Wrong username/email or password."))?;

    let principal = Principal::from_document(&user)
        .ok_or_else(|| ApiError::internal_server_error("Stored user has no id"))?;
    if !principal.is_active {
        return Err(ApiError::unauthorized("This account is not active."));
    }

    let token = session_token(&state, &principal.id).await?;
    let access = generate_access_token(&principal, &state.config.security)?;
    let refresh = generate_refresh_token(&principal.id, &state.config.security)?;
    tracing::info!("User {} logged in", principal.username);

    Ok(ApiResponse::success(json!({
        "token": token,
        "bearer": { "access": access, "refresh": refresh },
        "user": redacted(user),
    })))
}

/// POST /auth/refresh - trade a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let refresh = input
        .bearer
        .and_then(|b| b.refresh)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Please enter bearer.refresh"))?;

    let claims: RefreshClaims = verify(&refresh, &state.config.security.refresh_key).map_err(|e| {
        tracing::debug!("Refresh token rejected: {}", e);
        ApiError::unauthorized("JWT refresh data is wrong.")
    })?;

    let users = Repository::<User>::new(state.store.clone());
    let principal = users
        .find_raw(&Filter::by_id(&claims.id))
        .await?
        .as_ref()
        .and_then(Principal::from_document)
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::unauthorized("JWT refresh data is wrong."))?;

    let access = generate_access_token(&principal, &state.config.security)?;
    Ok(ApiResponse::success(json!({ "bearer": { "access": access } })))
}

/// GET|POST /auth/logout - session tokens are deleted; JWTs need no server work
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mut parts = header.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some("Token"), Some(value)) => {
            let result = state
                .store
                .delete_one(Token::COLLECTION, &Filter::new().eq("token", value))
                .await?;
            Ok(ApiResponse::success(json!({
                "message": "Token deleted. Logout was OK.",
                "result": result,
            })))
        }
        (Some("Bearer"), Some(_)) => Ok(ApiResponse::success(json!({
            "message": "No need any process for logout. You must delete JWT tokens.",
        }))),
        _ => Ok(ApiResponse::success(json!({ "message": "Logout was OK." }))),
    }
}

/// Existing session token for the user, or a fresh one
async fn session_token(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    let existing = state
        .store
        .find_one(Token::COLLECTION, &Filter::new().eq("userId", user_id))
        .await?;
    if let Some(token) = existing.as_ref().and_then(|t| t.get("token")).and_then(Value::as_str) {
        return Ok(token.to_string());
    }

    let token = hash_password(&format!("{}{}", user_id, Uuid::new_v4()), &state.config.security.secret_key);
    let mut document = Document::new();
    document.insert("userId".to_string(), json!(user_id));
    document.insert("token".to_string(), json!(token));
    state.store.create(Token::COLLECTION, document).await?;
    Ok(token)
}

fn redacted(mut user: Document) -> Document {
    User::redact(&mut user);
    user
}
