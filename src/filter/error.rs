use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),
}
