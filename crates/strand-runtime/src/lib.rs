//! Coroutine runtime for programs rewritten by `strand-rewrite`.
//!
//! Rewritten programs call two globals: `Spawn(fn, slot)` turns a
//! continuation-aware function into one that runs each call as a
//! coroutine, and `Await(receiver, member, args, slot)` suspends the
//! running coroutine until a callback-style operation completes. This
//! crate implements both ([`spawn`], [`await_call`]) on top of stackful
//! [`Fiber`]s, plus the [`EventLoop`] that asynchronous host operations
//! complete on.
//!
//! Thrown values are modeled as `Error::Exception(Value)` and propagate
//! with `?`, in and out of coroutines.

mod coroutine;
mod error;
mod fiber;
mod function;
mod future;
mod host;
mod value;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use coroutine::{await_call, spawn};
pub use error::Error;
pub use fiber::Fiber;
pub use function::{Cx, Function, NativeFn};
pub use future::Future;
pub use host::{EventLoop, Job, LoopHandle};
pub use value::Value;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Lock a mutex, ignoring poisoning: fiber bodies run under `catch_unwind`
/// and state is never left half-written across a panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
