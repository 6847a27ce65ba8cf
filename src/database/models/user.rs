use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::password::hash_password;
use crate::database::store::{to_document, Document};

use super::{required, ModelError, Resource};

pub struct User;

impl Resource for User {
    const COLLECTION: &'static str = "users";
    const NAME: &'static str = "User";
    const HIDDEN: &'static [&'static str] = &["password"];
}

/// POST /users body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_staff: Option<bool>,
}

/// PUT/PATCH /users/:id body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_staff: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    username: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    is_active: bool,
    is_admin: bool,
    is_staff: bool,
}

impl NewUser {
    /// Normalize and hash. Role flags are only honoured when `privileged`.
    pub fn into_document(self, salt: &str, privileged: bool) -> Result<Document, ModelError> {
        let password = required("password", &self.password)?;
        let stored = StoredUser {
            username: required("username", &self.username)?,
            email: required("email", &self.email)?,
            password: hash_password(&password, salt),
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: if privileged { self.is_active.unwrap_or(true) } else { true },
            is_admin: privileged && self.is_admin.unwrap_or(false),
            is_staff: privileged && self.is_staff.unwrap_or(false),
        };
        to_document(&stored).map_err(|e| ModelError::InvalidField {
            field: "user",
            reason: e.to_string(),
        })
    }
}

impl UserPatch {
    /// Given credential fields must be non-blank, same as on registration
    pub fn into_document(mut self, salt: &str, privileged: bool) -> Result<Document, ModelError> {
        if !privileged {
            self.is_active = None;
            self.is_admin = None;
            self.is_staff = None;
        }
        self.username = self.username.map(|s| required("username", &s)).transpose()?;
        self.email = self.email.map(|s| required("email", &s)).transpose()?;
        let password = self.password.take().map(|s| required("password", &s)).transpose()?;

        let mut document = to_document(&self).map_err(|e| ModelError::InvalidField {
            field: "user",
            reason: e.to_string(),
        })?;
        if let Some(password) = password {
            document.insert("password".to_string(), Value::String(hash_password(&password, salt)));
        }
        Ok(document)
    }
}
