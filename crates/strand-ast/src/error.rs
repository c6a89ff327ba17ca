/// Error types for syntax tree decoding

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AstError>;

#[derive(Error, Debug)]
pub enum AstError {
    /// A node with an unknown or missing `kind`, or with fields that do
    /// not fit its kind
    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("Invalid JSON: {0}")]
    Json(serde_json::Error),
}

impl From<serde_json::Error> for AstError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            AstError::MalformedTree(err.to_string())
        } else {
            AstError::Json(err)
        }
    }
}
