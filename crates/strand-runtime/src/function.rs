//! Callables and the context they run in.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::fiber::Fiber;
use crate::value::Value;
use crate::Result;

/// Signature shared by every callable: context, `this`, arguments.
pub type NativeFn = dyn Fn(&Cx, Value, Vec<Value>) -> Result<Value> + Send + Sync;

/// Where a call is running.
///
/// Everything that may suspend takes a `Cx` explicitly, so "must run inside
/// a coroutine" is checked where it matters instead of assumed.
#[derive(Clone, Debug, Default)]
pub enum Cx {
    /// Plain host code: the event loop, or a caller outside any coroutine.
    #[default]
    Host,
    /// Inside a coroutine started by `spawn`.
    Fiber(Fiber),
}

impl Cx {
    /// The coroutine this call can suspend, or `OutsideCoroutine`.
    pub fn fiber(&self) -> Result<&Fiber> {
        match self {
            Cx::Fiber(fiber) => Ok(fiber),
            Cx::Host => Err(Error::OutsideCoroutine),
        }
    }
}

/// A shared, thread-safe callable.
#[derive(Clone)]
pub struct Function {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    call: Box<NativeFn>,
    /// Set by `spawn`: the body this wrapper starts coroutines for.
    unwrapped: Option<Function>,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&Cx, Value, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                call: Box::new(call),
                unwrapped: None,
            }),
        }
    }

    /// A function that remembers `unwrapped` as its body.
    pub(crate) fn wrapping<F>(name: impl Into<String>, unwrapped: Function, call: F) -> Self
    where
        F: Fn(&Cx, Value, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                call: Box::new(call),
                unwrapped: Some(unwrapped),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn call(&self, cx: &Cx, this: Value, args: Vec<Value>) -> Result<Value> {
        (self.inner.call)(cx, this, args)
    }

    /// The wrapped body if this function was produced by `spawn`.
    pub fn unwrapped(&self) -> Option<&Function> {
        self.inner.unwrapped.as_ref()
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.inner.name)
            .field("continuation_aware", &self.inner.unwrapped.is_some())
            .finish()
    }
}
