/// strand rewriter
///
/// Turns functions and calls that carry a continuation slot into calls to
/// the `Spawn` and `Await` globals provided by `strand-runtime`.

pub mod driver;
pub mod error;
pub mod rewrite;

pub use driver::{RewriteOutput, Rewriter};
pub use error::{Result, RewriteError};
pub use rewrite::{AWAIT, RewriteResult, SPAWN, TransformOptions, transform, wrap_program};
