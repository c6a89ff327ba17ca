//! Runtime environment for the strand interpreter.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strand_runtime::{LoopHandle, Value};

/// A sink for print output, allowing redirection away from stdout.
pub type PrintSink = Sender<String>;

/// State shared by everything one program run evaluates, including code
/// running inside coroutines and deferred callbacks.
pub struct Runtime {
    /// Optional sink for print output. If None, prints go to stdout.
    print_sink: Option<PrintSink>,
    /// Where timers and immediates are queued.
    loop_handle: LoopHandle,
}

impl Runtime {
    pub fn new(loop_handle: LoopHandle) -> Self {
        Self {
            print_sink: None,
            loop_handle,
        }
    }

    /// Set the print sink for output redirection.
    pub fn set_print_sink(&mut self, sink: PrintSink) {
        self.print_sink = Some(sink);
    }

    /// Send a print message to the sink, or stdout if no sink is configured.
    ///
    /// Returns Ok(()) on success, or Err if the channel is disconnected.
    pub fn print(&self, message: String) -> Result<(), String> {
        if let Some(ref sink) = self.print_sink {
            sink.send(message).map_err(|e| format!("Print channel disconnected: {}", e))
        } else {
            println!("{}", message);
            Ok(())
        }
    }

    pub fn loop_handle(&self) -> &LoopHandle {
        &self.loop_handle
    }
}

/// One lexical scope. Closures keep their defining scope alive, and a
/// coroutine may read and write it from another thread, so bindings sit
/// behind a mutex that is only held for the duration of one lookup.
#[derive(Debug, Default)]
pub struct Scope {
    vars: Mutex<HashMap<String, Value>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// A scope with no parent.
    pub fn global() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A new innermost scope whose lookups fall back to `parent`.
    pub fn child(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Self {
            vars: Mutex::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// Bind `name` in this scope. Redeclaring a name replaces it.
    pub fn define(&self, name: &str, value: Value) {
        self.vars().insert(name.to_string(), value);
    }

    /// Look a variable up, searching from innermost to outermost scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Update the nearest existing binding of `name`.
    ///
    /// Returns an error if the variable doesn't exist.
    pub fn set(&self, name: &str, value: Value) -> Result<(), String> {
        {
            let mut vars = self.vars();
            if let Some(slot) = vars.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        match &self.parent {
            Some(parent) => parent.set(name, value),
            None => Err(format!("Variable '{}' not defined", name)),
        }
    }

    fn vars(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.vars.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_runtime::EventLoop;

    #[test]
    fn test_define_and_get_var() {
        let scope = Scope::global();
        scope.define("x", Value::Number(42.0));
        assert_eq!(scope.get("x"), Some(Value::Number(42.0)));
    }

    #[test]
    fn test_undefined_var() {
        assert_eq!(Scope::global().get("x"), None);
    }

    #[test]
    fn test_set_var_updates_nearest_binding() {
        let outer = Scope::global();
        outer.define("x", Value::Number(1.0));
        let inner = Scope::child(&outer);

        inner.set("x", Value::Number(2.0)).unwrap();
        assert_eq!(outer.get("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_set_undefined_var_fails() {
        let result = Scope::global().set("x", Value::Number(1.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_scope_shadowing() {
        let outer = Scope::global();
        outer.define("x", Value::Number(1.0));

        let inner = Scope::child(&outer);
        inner.define("x", Value::Number(2.0));
        assert_eq!(inner.get("x"), Some(Value::Number(2.0)));
        assert_eq!(outer.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_print_sink() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut runtime = Runtime::new(EventLoop::new().handle());
        runtime.set_print_sink(tx);

        runtime.print("hello".to_string()).unwrap();
        assert_eq!(rx.recv().unwrap(), "hello");
    }
}
