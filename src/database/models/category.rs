use serde::{Deserialize, Serialize};

use crate::database::store::{to_document, Document, StoreError};

use super::{required, ModelError, Resource};

pub struct Category;

impl Resource for Category {
    const COLLECTION: &'static str = "categories";
    const NAME: &'static str = "Category";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NewCategory {
    pub fn into_document(self) -> Result<Document, ModelError> {
        let category = NewCategory { name: required("name", &self.name)? };
        to_document(&category).map_err(|e| ModelError::InvalidField {
            field: "category",
            reason: e.to_string(),
        })
    }
}

impl CategoryPatch {
    pub fn into_document(self) -> Result<Document, StoreError> {
        to_document(&CategoryPatch { name: self.name.map(|n| n.trim().to_string()) })
    }
}
