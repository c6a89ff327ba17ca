//! The strand interpreter.
//!
//! Runs a program's top level on the host, then drives the event loop until
//! every coroutine and deferred callback the program started has finished.

use std::sync::Arc;

use strand_ast::{Expr, Program};
use strand_runtime::{Cx, EventLoop, LoopHandle, Value};
use tracing::debug;

use crate::builtins;
use crate::eval::{self, Frame};
use crate::runtime::{PrintSink, Runtime, Scope};

/// The strand interpreter.
///
/// Holds the global scope and the event loop for one program run.
pub struct Interpreter {
    /// Shared runtime environment.
    runtime: Arc<Runtime>,
    /// Global bindings, builtins included.
    globals: Arc<Scope>,
    event_loop: EventLoop,
}

impl Interpreter {
    /// Create a new interpreter that prints to stdout.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a new interpreter with a print sink for output redirection.
    pub fn with_print_sink(sink: PrintSink) -> Self {
        Self::build(Some(sink))
    }

    fn build(sink: Option<PrintSink>) -> Self {
        let event_loop = EventLoop::new();
        let mut runtime = Runtime::new(event_loop.handle());
        if let Some(sink) = sink {
            runtime.set_print_sink(sink);
        }
        let runtime = Arc::new(runtime);
        let globals = Scope::global();
        builtins::install(&globals, &runtime);
        Self {
            runtime,
            globals,
            event_loop,
        }
    }

    /// Bind a global, e.g. a host object for the program to call into.
    pub fn define_global(&self, name: &str, value: Value) {
        self.globals.define(name, value);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    /// Handle for host code that wants to complete work on the event loop.
    pub fn loop_handle(&self) -> LoopHandle {
        self.event_loop.handle()
    }

    /// Run a program to completion.
    ///
    /// Returns the value of the program's last expression statement. The
    /// event loop is drained afterwards; an error nothing caught, whether
    /// thrown at top level or raised by a deferred callback, is returned.
    pub fn run(&mut self, program: &Program) -> crate::Result<Value> {
        let cx = Cx::Host;
        let frame = Frame::new(self.globals.clone(), &cx, &self.runtime);
        let value = eval::eval_program(program, &frame)?;
        debug!(pending = self.event_loop.handle().pending(), "top level finished; draining event loop");
        self.event_loop.run()?;
        Ok(value)
    }

    /// Evaluate a single expression on the host (for testing).
    pub fn eval_expr(&mut self, expr: &Expr) -> crate::Result<Value> {
        let cx = Cx::Host;
        let frame = Frame::new(self.globals.clone(), &cx, &self.runtime);
        eval::eval_expr(expr, &frame)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
