/// Rewriter driver that runs decode, transform, wrap and print in order

use std::path::{Path, PathBuf};
use strand_ast::{Program, from_json, print_program, to_json};
use tracing::{debug, info};
use crate::error::{Result, RewriteError};
use crate::rewrite::{TransformOptions, transform, wrap_program};

/// Rewriter output structure
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    /// File the tree was read from, if it came from a file
    pub source_file: Option<PathBuf>,
    /// The final tree: wrapped when anything was rewritten, otherwise the input
    pub program: Program,
    /// Whether any function or call was rewritten
    pub rewritten: bool,
    /// `program` rendered as source text
    pub printed: String,
}

impl RewriteOutput {
    /// `program` encoded as a JSON tree
    pub fn to_json(&self) -> Result<String> {
        Ok(to_json(&self.program)?)
    }
}

/// The strand rewriter
pub struct Rewriter {
    options: TransformOptions,
}

impl Rewriter {
    /// Create a new rewriter with the given options
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Rewrite a JSON-encoded program
    pub fn rewrite_source(&self, source: &str) -> Result<RewriteOutput> {
        let program = from_json(source)?;
        debug!(statements = program.body.len(), "decoded program");
        self.rewrite_program(program, None)
    }

    /// Read and rewrite a JSON-encoded program from `path`
    pub fn rewrite_file(&self, path: impl AsRef<Path>) -> Result<RewriteOutput> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RewriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(file = %path.display(), "rewriting");
        let program = from_json(&source)?;
        self.rewrite_program(program, Some(path.to_path_buf()))
    }

    /// Rewrite an already decoded program
    pub fn rewrite_program(&self, program: Program, source_file: Option<PathBuf>) -> Result<RewriteOutput> {
        let result = transform(program.clone(), &self.options)?;

        let program = if result.rewritten {
            wrap_program(result.program, &self.options.sentinel_name)
        } else {
            debug!("nothing to rewrite; passing program through");
            program
        };

        let printed = print_program(&program);
        Ok(RewriteOutput {
            source_file,
            program,
            rewritten: result.rewritten,
            printed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrewritten_program_passes_through() {
        let source = r#"{"body": [{"kind": "expr", "expr": {"kind": "number", "value": 1.0}}]}"#;
        let output = Rewriter::new(TransformOptions::default())
            .rewrite_source(source)
            .unwrap();

        assert!(!output.rewritten);
        assert_eq!(output.printed, "1;\n");
        assert!(output.source_file.is_none());
    }

    #[test]
    fn test_malformed_tree_is_reported() {
        let source = r#"{"body": [{"kind": "goto"}]}"#;
        let err = Rewriter::new(TransformOptions::default())
            .rewrite_source(source)
            .unwrap_err();
        assert!(matches!(err, RewriteError::Ast(strand_ast::AstError::MalformedTree(_))));
    }
}
