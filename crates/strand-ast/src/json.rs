//! JSON encoding of syntax trees.
//!
//! Nodes are objects tagged with a `kind` field, for example
//! `{"kind": "call", "callee": {"kind": "identifier", "name": "f"}, "args": []}`.
//! This is the form trees take when they cross a process boundary.

use crate::ast::Program;
use crate::error::Result;

/// Decode a program. Unknown or missing `kind` tags are `MalformedTree`.
pub fn from_json(text: &str) -> Result<Program> {
    Ok(serde_json::from_str(text)?)
}

pub fn to_json(program: &Program) -> Result<String> {
    Ok(serde_json::to_string_pretty(program)?)
}
