use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Claims;
use crate::database::store::Document;

/// The authenticated user a request acts on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_staff: bool,
}

impl Principal {
    /// Build from a stored user record; `None` when it has no id
    pub fn from_document(user: &Document) -> Option<Self> {
        let text = |key: &str| user.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let flag = |key: &str| user.get(key).and_then(Value::as_bool).unwrap_or(false);

        let id = user.get("_id")?.as_str()?.to_string();
        Some(Self {
            id,
            username: text("username"),
            email: text("email"),
            is_active: flag("isActive"),
            is_admin: flag("isAdmin"),
            is_staff: flag("isStaff"),
        })
    }

    /// Owner of a record, or an admin
    pub fn can_modify(&self, owner_id: Option<&str>) -> bool {
        self.is_admin || owner_id == Some(self.id.as_str())
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
            email: claims.email,
            is_active: claims.is_active,
            is_admin: claims.is_admin,
            is_staff: claims.is_staff,
        }
    }
}
