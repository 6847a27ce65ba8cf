pub mod blog;
pub mod category;
pub mod comment;
pub mod token;
pub mod user;

pub use blog::{Blog, BlogPatch, NewBlog};
pub use category::{Category, CategoryPatch, NewCategory};
pub use comment::{Comment, CommentPatch, NewComment};
pub use token::Token;
pub use user::{NewUser, User, UserPatch};

use thiserror::Error;

use super::store::Document;

/// Foreign key that list and read endpoints may expand inline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub collection: &'static str,
    /// Fields stripped from the embedded document
    pub hidden: &'static [&'static str],
}

/// Static description of a collection. Records stay untyped documents; the
/// input structs in each model module describe what clients may write.
pub trait Resource: Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Human label used in not-found messages
    const NAME: &'static str;
    const HIDDEN: &'static [&'static str] = &[];
    const RELATIONS: &'static [Relation] = &[];

    fn relation(field: &str) -> Option<&'static Relation> {
        Self::RELATIONS.iter().find(|r| r.field == field)
    }

    fn redact(document: &mut Document) {
        for field in Self::HIDDEN {
            document.remove(*field);
        }
    }
}

/// Every collection the application writes to
pub const COLLECTIONS: &[&str] = &[
    User::COLLECTION,
    Token::COLLECTION,
    Category::COLLECTION,
    Blog::COLLECTION,
    Comment::COLLECTION,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Required string fields must be non-blank after trimming
pub(crate) fn required(field: &'static str, value: &str) -> Result<String, ModelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::MissingRequiredField(field));
    }
    Ok(trimmed.to_string())
}
