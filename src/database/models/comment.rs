use serde::{Deserialize, Serialize};

use crate::database::store::{to_document, Document, StoreError};

use super::{blog::Blog, required, user::User, ModelError, Relation, Resource};

pub struct Comment;

impl Resource for Comment {
    const COLLECTION: &'static str = "comments";
    const NAME: &'static str = "Comment";
    const RELATIONS: &'static [Relation] = &[
        Relation { field: "blogId", collection: Blog::COLLECTION, hidden: &[] },
        Relation { field: "userId", collection: User::COLLECTION, hidden: User::HIDDEN },
    ];
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub blog_id: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredComment {
    blog_id: String,
    user_id: String,
    comment: String,
}

impl NewComment {
    /// The author always comes from the authenticated principal
    pub fn into_document(self, user_id: &str) -> Result<Document, ModelError> {
        let stored = StoredComment {
            blog_id: required("blogId", &self.blog_id)?,
            user_id: user_id.to_string(),
            comment: required("comment", &self.comment)?,
        };
        to_document(&stored).map_err(|e| ModelError::InvalidField {
            field: "comment",
            reason: e.to_string(),
        })
    }
}

impl CommentPatch {
    pub fn into_document(self) -> Result<Document, StoreError> {
        to_document(&self)
    }
}
