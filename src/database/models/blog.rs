use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::store::{to_document, Document, StoreError};

use super::{category::Category, required, user::User, ModelError, Relation, Resource};

pub struct Blog;

impl Resource for Blog {
    const COLLECTION: &'static str = "blogs";
    const NAME: &'static str = "Blog";
    const RELATIONS: &'static [Relation] = &[
        Relation { field: "blogCategoryId", collection: Category::COLLECTION, hidden: &[] },
        Relation { field: "userId", collection: User::COLLECTION, hidden: User::HIDDEN },
    ];
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlog {
    pub blog_category_id: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredBlog {
    user_id: String,
    blog_category_id: String,
    title: String,
    content: String,
    image: Option<String>,
    is_published: bool,
    likes: Vec<Value>,
    views: u64,
    viewers: Vec<Value>,
}

impl NewBlog {
    /// The author always comes from the authenticated principal
    pub fn into_document(self, user_id: &str) -> Result<Document, ModelError> {
        let stored = StoredBlog {
            user_id: user_id.to_string(),
            blog_category_id: required("blogCategoryId", &self.blog_category_id)?,
            title: required("title", &self.title)?,
            content: required("content", &self.content)?,
            image: self.image.map(|s| s.trim().to_string()),
            is_published: self.is_published.unwrap_or(true),
            likes: vec![],
            views: 0,
            viewers: vec![],
        };
        to_document(&stored).map_err(|e| ModelError::InvalidField {
            field: "blog",
            reason: e.to_string(),
        })
    }
}

impl BlogPatch {
    pub fn into_document(self) -> Result<Document, StoreError> {
        to_document(&self)
    }
}
