pub mod password;
pub mod permissions;
pub mod principal;
pub mod resolver;

pub use permissions::{check_chain, Gate};
pub use principal::Principal;
pub use resolver::PrincipalResolver;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Access token payload: a snapshot of the user's identity and role flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_staff: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Refresh token payload; only identifies the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "_id")]
    pub id: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

pub fn generate_access_token(principal: &Principal, security: &SecurityConfig) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = Claims {
        id: principal.id.clone(),
        username: principal.username.clone(),
        email: principal.email.clone(),
        is_active: principal.is_active,
        is_admin: principal.is_admin,
        is_staff: principal.is_staff,
        exp: (now + Duration::minutes(security.access_token_minutes as i64)).timestamp(),
        iat: now.timestamp(),
    };
    sign(&claims, &security.access_key)
}

pub fn generate_refresh_token(user_id: &str, security: &SecurityConfig) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = RefreshClaims {
        id: user_id.to_string(),
        exp: (now + Duration::hours(security.refresh_token_hours as i64)).timestamp(),
        iat: now.timestamp(),
    };
    sign(&claims, &security.refresh_key)
}

/// Verify signature and expiry (HS256)
pub fn verify<T: for<'de> Deserialize<'de>>(token: &str, secret: &str) -> Result<T, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    let data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}
