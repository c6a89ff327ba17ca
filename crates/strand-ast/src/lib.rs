//! Syntax tree for strand programs.
//!
//! The tree is a closed set of statement and expression kinds. [`fold`]
//! supplies the traversal the rewriter is built on, [`printer`] turns a tree
//! back into source text and [`json`] moves trees across process boundaries.

pub mod ast;
pub mod build;
pub mod error;
pub mod fold;
pub mod json;
pub mod printer;

pub use ast::*;
pub use error::{AstError, Result};
pub use fold::Fold;
pub use json::{from_json, to_json};
pub use printer::{print_expr, print_program, print_stmt};
