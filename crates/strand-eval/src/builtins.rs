//! Global functions every program sees.
//!
//! `Spawn` and `Await` are the entry points rewritten programs call.
//! `setTimeout` and `setImmediate` are the asynchronous host operations:
//! they queue their callback on the event loop, so a callback-style function
//! built on them completes on a later turn of the loop.

use std::sync::Arc;
use std::time::Duration;

use strand_runtime::{await_call, spawn, Cx, Error, Function, Value};

use crate::runtime::{Runtime, Scope};
use crate::Result;

/// Define every builtin in `scope`.
pub fn install(scope: &Scope, runtime: &Arc<Runtime>) {
    scope.define("Spawn", Value::Function(Function::new("Spawn", builtin_spawn)));
    scope.define("Await", Value::Function(Function::new("Await", builtin_await)));

    let rt = runtime.clone();
    scope.define(
        "print",
        Value::Function(Function::new("print", move |_cx, _this, args| {
            let output: Vec<String> = args.iter().map(Value::to_string_value).collect();
            rt.print(output.join(" ")).map_err(Error::Runtime)?;
            Ok(Value::Null)
        })),
    );

    let rt = runtime.clone();
    scope.define(
        "setTimeout",
        Value::Function(Function::new("setTimeout", move |_cx, _this, args| {
            let mut args = args.into_iter();
            let callback = expect_function("setTimeout", args.next())?;
            let delay = match args.next() {
                Some(Value::Number(ms)) if ms > 0.0 => Duration::from_millis(ms as u64),
                _ => Duration::ZERO,
            };
            rt.loop_handle().defer_after(delay, move || {
                callback.call(&Cx::Host, Value::Null, Vec::new()).map(|_| ())
            });
            Ok(Value::Null)
        })),
    );

    let rt = runtime.clone();
    scope.define(
        "setImmediate",
        Value::Function(Function::new("setImmediate", move |_cx, _this, args| {
            let mut args = args.into_iter();
            let callback = expect_function("setImmediate", args.next())?;
            let rest: Vec<Value> = args.collect();
            rt.loop_handle()
                .defer(move || callback.call(&Cx::Host, Value::Null, rest).map(|_| ()));
            Ok(Value::Null)
        })),
    );

    scope.define("json", Value::Function(Function::new("json", builtin_json)));
    scope.define("cat", Value::Function(Function::new("cat", builtin_cat)));
    scope.define("len", Value::Function(Function::new("len", builtin_len)));
}

/// `Spawn(fn, slot)`
fn builtin_spawn(_cx: &Cx, _this: Value, args: Vec<Value>) -> Result<Value> {
    let mut args = args.into_iter();
    let body = expect_function("Spawn", args.next())?;
    let slot = expect_slot("Spawn", args.next())?;
    Ok(Value::Function(spawn(body, slot)))
}

/// `Await(receiver, member, [args], slot)`
fn builtin_await(cx: &Cx, _this: Value, args: Vec<Value>) -> Result<Value> {
    let mut args = args.into_iter();
    let receiver = args.next().unwrap_or_default();
    let member = args.next().unwrap_or_default();
    let call_args = match args.next() {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::runtime(format!(
                "Await expects an argument array, got {}",
                other.type_name()
            )));
        }
        None => Vec::new(),
    };
    let slot = expect_slot("Await", args.next())?;
    await_call(cx, receiver, member, call_args, slot)
}

/// `json(text)` - parse JSON string
fn builtin_json(_cx: &Cx, _this: Value, args: Vec<Value>) -> Result<Value> {
    let [text] = exactly_one("json", args)?;
    Value::from_json(&text.to_string_value()).map_err(Error::Runtime)
}

/// `cat(value)` - serialize to pretty JSON
fn builtin_cat(_cx: &Cx, _this: Value, args: Vec<Value>) -> Result<Value> {
    let [value] = exactly_one("cat", args)?;
    Ok(Value::String(value.to_json()))
}

fn builtin_len(_cx: &Cx, _this: Value, args: Vec<Value>) -> Result<Value> {
    let [value] = exactly_one("len", args)?;
    match &value {
        Value::Array(arr) => Ok(Value::Number(arr.len() as f64)),
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Object(obj) => Ok(Value::Number(obj.len() as f64)),
        other => Err(Error::runtime(format!("Cannot get length of {}", other.type_name()))),
    }
}

fn exactly_one(name: &str, args: Vec<Value>) -> Result<[Value; 1]> {
    <[Value; 1]>::try_from(args)
        .map_err(|_| Error::runtime(format!("{}() takes exactly 1 argument", name)))
}

fn expect_function(name: &str, value: Option<Value>) -> Result<Function> {
    match value {
        Some(Value::Function(function)) => Ok(function),
        Some(other) => Err(Error::NotCallable(format!(
            "{} argument of type {}",
            name,
            other.type_name()
        ))),
        None => Err(Error::runtime(format!("{}() needs a function argument", name))),
    }
}

fn expect_slot(name: &str, value: Option<Value>) -> Result<usize> {
    match value {
        Some(Value::Number(n)) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        other => Err(Error::runtime(format!(
            "{}() needs a non-negative integer slot index, got {}",
            name,
            other.map_or("nothing", |v| v.type_name())
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_runtime::EventLoop;

    fn call(name: &str, args: Vec<Value>) -> Result<Value> {
        let scope = Scope::global();
        install(&scope, &Arc::new(Runtime::new(EventLoop::new().handle())));
        match scope.get(name) {
            Some(Value::Function(f)) => f.call(&Cx::Host, Value::Null, args),
            other => panic!("Expected builtin {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_builtin_cat() {
        let input = Value::Object(
            [("name".to_string(), Value::String("test".to_string()))]
                .into_iter()
                .collect(),
        );
        match call("cat", vec![input]).unwrap() {
            Value::String(s) => {
                assert!(s.contains("\"name\""));
                assert!(s.contains("\"test\""));
            }
            other => panic!("Expected String, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_json() {
        match call("json", vec![Value::from(r#"{"x": 1}"#)]).unwrap() {
            Value::Object(obj) => assert_eq!(obj.get("x"), Some(&Value::Number(1.0))),
            other => panic!("Expected Object, got {:?}", other),
        }
        assert!(call("json", vec![]).is_err());
    }

    #[test]
    fn test_builtin_len() {
        assert_eq!(call("len", vec![Value::from("héllo")]).unwrap(), Value::Number(5.0));
        assert!(call("len", vec![Value::Number(1.0)]).is_err());
    }

    #[test]
    fn test_spawn_validates_arguments() {
        let body = Value::Function(Function::new("body", |_, _, _| Ok(Value::Null)));
        assert!(call("Spawn", vec![body.clone(), Value::Number(-1.0)]).is_err());
        assert!(call("Spawn", vec![Value::Null, Value::Number(0.0)]).is_err());
        match call("Spawn", vec![body, Value::Number(0.0)]).unwrap() {
            Value::Function(f) => assert!(f.unwrapped().is_some()),
            other => panic!("Expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_await_outside_coroutine() {
        let op = Value::Function(Function::new("op", |_, _, _| Ok(Value::Null)));
        let result = call(
            "Await",
            vec![Value::Null, op, Value::Array(vec![]), Value::Number(0.0)],
        );
        assert!(matches!(result, Err(Error::OutsideCoroutine)));
    }
}
