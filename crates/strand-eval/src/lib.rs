//! strand interpreter built on the coroutine runtime.
//!
//! This crate executes strand syntax trees, typically ones produced by
//! `strand-rewrite`. The globals `Spawn` and `Await` are bound to
//! `strand_runtime::spawn` and `strand_runtime::await_call`, so a rewritten
//! program's continuation-aware functions run as coroutines and suspend on
//! asynchronous operations. Exceptions are modeled as
//! `Error::Exception(Value)` and propagate using Rust's `?` operator.

mod builtins;
mod eval;
mod interpreter;
mod runtime;

pub use eval::{eval_block, eval_expr, eval_program, eval_statement, make_closure, Flow, Frame};
pub use interpreter::Interpreter;
pub use runtime::{PrintSink, Runtime, Scope};
pub use strand_runtime::{Error, Value};

/// Result type for interpreter operations.
pub type Result<T> = std::result::Result<T, Error>;
