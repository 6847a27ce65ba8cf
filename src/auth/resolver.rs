use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{verify, Claims, JwtError, Principal};
use crate::database::models::{Resource, Token, User};
use crate::database::store::{Store, StoreError};
use crate::filter::Filter;

/// Maps an opaque session token to the user it was issued to
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn principal_for_token(&self, token: &str) -> Result<Option<Principal>, StoreError>;
}

/// Checks a signed token and returns its payload
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, JwtError>;
}

/// Session tokens kept in the `tokens` collection
pub struct StoreCredentials {
    store: Arc<dyn Store>,
}

impl StoreCredentials {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialStore for StoreCredentials {
    async fn principal_for_token(&self, token: &str) -> Result<Option<Principal>, StoreError> {
        let Some(session) = self
            .store
            .find_one(Token::COLLECTION, &Filter::new().eq("token", token))
            .await?
        else {
            return Ok(None);
        };
        let Some(user_id) = session.get("userId").and_then(Value::as_str) else {
            return Ok(None);
        };
        let user = self.store.find_one(User::COLLECTION, &Filter::by_id(user_id)).await?;
        Ok(user.as_ref().and_then(Principal::from_document))
    }
}

/// HS256 verification with the access key
pub struct JwtVerifier {
    access_key: String,
}

impl JwtVerifier {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self { access_key: access_key.into() }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        verify(token, &self.access_key)
    }
}

/// Turns an `Authorization` header into the acting principal.
///
/// `Token <value>` is looked up in the credential store, `Bearer <value>` is
/// verified as a JWT. Anything unrecognised resolves to an anonymous request;
/// only credential-store failures surface as errors.
pub struct PrincipalResolver {
    credentials: Arc<dyn CredentialStore>,
    verifier: Arc<dyn TokenVerifier>,
}

impl PrincipalResolver {
    pub fn new(credentials: Arc<dyn CredentialStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { credentials, verifier }
    }

    pub async fn resolve(&self, header: Option<&str>) -> Result<Option<Principal>, StoreError> {
        let Some(header) = header else {
            return Ok(None);
        };
        let mut parts = header.split_whitespace();
        let (Some(scheme), Some(value)) = (parts.next(), parts.next()) else {
            return Ok(None);
        };

        match scheme {
            "Token" => self.credentials.principal_for_token(value).await,
            "Bearer" => match self.verifier.verify(value) {
                Ok(claims) => Ok(Some(Principal::from(claims))),
                Err(e) => {
                    tracing::debug!("Bearer token rejected: {}", e);
                    Ok(None)
                }
            },
            other => {
                tracing::debug!("Unknown authorization scheme '{}'", other);
                Ok(None)
            }
        }
    }
}
