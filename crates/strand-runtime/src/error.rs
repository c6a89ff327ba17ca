//! Runtime errors.
//!
//! Values raised by programs travel as `Error::Exception(Value)` and
//! propagate with `?`. The remaining variants are raised by the runtime
//! itself; `into_value` turns any of them into something a program can
//! catch or hand to a callback.

use thiserror::Error;

use crate::value::Value;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A thrown value, or the error an awaited operation reported.
    #[error("Uncaught exception: {0}")]
    Exception(Value),

    /// `Await` needs a coroutine to suspend.
    #[error("Await called outside of a coroutine")]
    OutsideCoroutine,

    #[error("{0} is not a function")]
    NotCallable(String),

    /// The coroutine being resumed has already finished.
    #[error("Coroutine is no longer running")]
    CoroutineGone,

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// The value a program sees when it catches this error.
    pub fn into_value(self) -> Value {
        match self {
            Error::Exception(value) => value,
            other => Value::String(other.to_string()),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }
}
