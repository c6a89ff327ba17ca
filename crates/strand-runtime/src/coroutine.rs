//! `Spawn` and `Await`: the two entry points rewritten programs call.
//!
//! A continuation-aware function `function f(x, _) {...}` becomes
//! `Spawn(function f(x, _) {...}, 1)`; a call `g(x, _)` becomes
//! `Await(null, g, [x], 1)`. [`spawn`] starts a coroutine per call, and
//! [`await_call`] suspends the current coroutine until the callee reports
//! back through the callback spliced in at the slot index.

use std::sync::{Arc, Mutex};

use tracing::{trace, warn};

use crate::error::Error;
use crate::fiber::Fiber;
use crate::function::{Cx, Function};
use crate::future::{complete, Future};
use crate::value::Value;
use crate::{lock, Result};

/// Wrap `body` so that every call runs it in a new coroutine.
///
/// The wrapper reads a callback from argument `slot`. With one, it starts
/// the coroutine, returns null, and the callback later receives
/// `(error, value)`. Without one, it returns a subscription function for the
/// coroutine's [`Future`]. The coroutine runs until it first suspends
/// before the wrapper returns.
pub fn spawn(body: Function, slot: usize) -> Function {
    let target = body.clone();
    Function::wrapping(body.name().to_string(), body, move |_cx, this, args| {
        start(&target, slot, this, args)
    })
}

/// Where a finished coroutine sends its result.
enum Completion {
    Callback(Function),
    Future(Future),
}

fn start(body: &Function, slot: usize, this: Value, args: Vec<Value>) -> Result<Value> {
    let completion = match args.get(slot) {
        Some(Value::Function(callback)) => Completion::Callback(callback.clone()),
        _ => Completion::Future(Future::new()),
    };
    let future = match &completion {
        Completion::Future(future) => Some(future.clone()),
        Completion::Callback(_) => None,
    };

    let body = body.clone();
    let name = body.name().to_string();
    Fiber::run(&name, move |fiber| {
        let cx = Cx::Fiber(fiber);
        let outcome = body.call(&cx, this, args);
        match completion {
            Completion::Callback(callback) => complete(&cx, &callback, outcome),
            Completion::Future(future) => future.resolve(&cx, outcome),
        }
    })?;

    Ok(future
        .map(|future| Value::Function(future.into_function()))
        .unwrap_or_default())
}

/// Call `receiver[member](...args)` with a completion callback at `slot` and
/// return what the callback reports, suspending the current coroutine if
/// the callback has not fired by the time the call returns.
///
/// `member` is either a property name (string, or array index) looked up on
/// `receiver`, or the function itself.
///
/// Calling a function produced by [`spawn`] skips the wrapper and runs its
/// body directly on the current coroutine. Either way the caller must be
/// running inside a coroutine.
pub fn await_call(
    cx: &Cx,
    receiver: Value,
    member: Value,
    mut args: Vec<Value>,
    slot: usize,
) -> Result<Value> {
    let fiber = cx.fiber()?;
    let callee = resolve_callee(&receiver, member)?;

    if let Some(body) = callee.unwrapped() {
        trace!(function = callee.name(), "running continuation-aware callee inline");
        splice(&mut args, slot, Value::Null);
        return body.call(cx, receiver, args);
    }

    let pending = Pending::new();
    splice(&mut args, slot, Value::Function(pending.callback()));
    callee.call(cx, receiver, args)?;
    pending.wait(fiber)
}

fn resolve_callee(receiver: &Value, member: Value) -> Result<Function> {
    match member {
        Value::Function(function) => Ok(function),
        key @ (Value::String(_) | Value::Number(_)) => match receiver.get(&key) {
            Value::Function(function) => Ok(function),
            _ => Err(Error::NotCallable(format!(
                "{}[{}]",
                receiver.type_name(),
                key.to_string_value()
            ))),
        },
        other => Err(Error::NotCallable(other.type_name().to_string())),
    }
}

/// Insert `value` at `slot`, padding with nulls if `args` is shorter.
fn splice(args: &mut Vec<Value>, slot: usize, value: Value) {
    if slot > args.len() {
        args.resize(slot, Value::Null);
    }
    args.insert(slot, value);
}

/// Completion state of one `await_call`, written once by whichever of the
/// callback and the awaiting coroutine gets there first.
enum Settle {
    /// Neither side has arrived.
    Pending,
    /// The callback fired before the call returned.
    Settled(Result<Value>),
    /// The coroutine is parked waiting for the callback.
    Suspended(Fiber),
    /// The outcome has been handed over.
    Delivered,
}

struct Pending {
    state: Arc<Mutex<Settle>>,
}

impl Pending {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(Settle::Pending)),
        }
    }

    /// The `(error, value)` callback handed to the awaited operation.
    fn callback(&self) -> Function {
        let state = self.state.clone();
        Function::new("resume", move |_cx, _this, args| {
            settle(&state, outcome_from_args(args))?;
            Ok(Value::Null)
        })
    }

    fn wait(self, fiber: &Fiber) -> Result<Value> {
        let mut state = lock(&self.state);
        match std::mem::replace(&mut *state, Settle::Delivered) {
            Settle::Settled(outcome) => {
                trace!(fiber = fiber.id(), "operation completed synchronously");
                outcome
            }
            Settle::Pending => {
                *state = Settle::Suspended(fiber.clone());
                drop(state);
                fiber.suspend()
            }
            Settle::Suspended(_) | Settle::Delivered => {
                Err(Error::runtime("operation awaited twice"))
            }
        }
    }
}

fn settle(state: &Mutex<Settle>, outcome: Result<Value>) -> Result<()> {
    let mut guard = lock(state);
    match std::mem::replace(&mut *guard, Settle::Delivered) {
        Settle::Pending => {
            *guard = Settle::Settled(outcome);
            Ok(())
        }
        Settle::Suspended(fiber) => {
            drop(guard);
            fiber.resume(outcome)
        }
        previous @ (Settle::Settled(_) | Settle::Delivered) => {
            *guard = previous;
            warn!("completion callback invoked more than once; ignoring");
            Ok(())
        }
    }
}

fn outcome_from_args(args: Vec<Value>) -> Result<Value> {
    let mut args = args.into_iter();
    let err = args.next().unwrap_or_default();
    let value = args.next().unwrap_or_default();
    if err.is_null() {
        Ok(value)
    } else {
        Err(Error::Exception(err))
    }
}
