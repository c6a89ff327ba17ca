/// Error types for the rewriter

use std::path::PathBuf;
use strand_ast::AstError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RewriteError>;

#[derive(Error, Debug)]
pub enum RewriteError {
    /// The sentinel used anywhere other than a parameter or argument slot.
    #[error("'{name}' may only appear as a whole parameter or argument, found in {context}")]
    SentinelMisuse { name: String, context: String },

    /// The sentinel appears twice in one parameter or argument list.
    #[error("'{name}' appears more than once in {context}")]
    DuplicateSlot { name: String, context: String },

    #[error("Invalid syntax tree: {0}")]
    Ast(#[from] AstError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RewriteError {
    pub fn misuse(name: impl Into<String>, context: impl Into<String>) -> Self {
        RewriteError::SentinelMisuse {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn duplicate(name: impl Into<String>, context: impl Into<String>) -> Self {
        RewriteError::DuplicateSlot {
            name: name.into(),
            context: context.into(),
        }
    }
}
