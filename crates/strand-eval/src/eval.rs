//! Expression and statement evaluation for the strand interpreter.
//!
//! Evaluation is synchronous: every function returns `Result`, and thrown
//! values are modeled as `Error::Exception(Value)` that propagate with `?`.
//! Code running inside a coroutine evaluates exactly like host code; the
//! only difference is the [`Cx`] in the [`Frame`], which is what lets
//! `Await` suspend.

use std::collections::HashMap;
use std::sync::Arc;

use strand_ast::{BinOp, Expr, Function as FunctionNode, Program, Stmt, UnOp, print_expr};
use strand_runtime::{Cx, Error, Function, Value};
use tracing::trace;

use crate::runtime::{Runtime, Scope};
use crate::Result;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Ran to the end. Carries the value of the last expression statement.
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// Everything evaluation needs: the current scope, the execution context
/// and the shared runtime.
#[derive(Clone)]
pub struct Frame<'a> {
    pub scope: Arc<Scope>,
    pub cx: &'a Cx,
    pub runtime: &'a Arc<Runtime>,
}

impl<'a> Frame<'a> {
    pub fn new(scope: Arc<Scope>, cx: &'a Cx, runtime: &'a Arc<Runtime>) -> Self {
        Self { scope, cx, runtime }
    }

    /// The same frame with a fresh innermost scope.
    fn nested(&self) -> Self {
        Self {
            scope: Scope::child(&self.scope),
            cx: self.cx,
            runtime: self.runtime,
        }
    }
}

/// Evaluate a complete program in `frame`'s scope.
///
/// Returns the value of the last expression statement. A top-level `return`
/// ends the program early with its value.
pub fn eval_program(program: &Program, frame: &Frame) -> Result<Value> {
    match eval_statements(&program.body, frame)? {
        Flow::Normal(value) | Flow::Return(value) => Ok(value),
        Flow::Break | Flow::Continue => Err(Error::runtime("break or continue outside of loop")),
    }
}

/// Evaluate a block of statements in a new scope.
pub fn eval_block(body: &[Stmt], frame: &Frame) -> Result<Flow> {
    eval_statements(body, &frame.nested())
}

fn eval_statements(body: &[Stmt], frame: &Frame) -> Result<Flow> {
    let mut last = Value::Null;
    for stmt in body {
        match eval_statement(stmt, frame)? {
            Flow::Normal(value) => last = value,
            other => return Ok(other),
        }
    }
    Ok(Flow::Normal(last))
}

/// Evaluate a single statement.
pub fn eval_statement(stmt: &Stmt, frame: &Frame) -> Result<Flow> {
    match stmt {
        Stmt::Function(function) => {
            let closure = make_closure(function, frame);
            if let Some(name) = &function.name {
                frame.scope.define(name, Value::Function(closure));
            }
            Ok(Flow::Normal(Value::Null))
        }

        Stmt::Var { name, init } => {
            let value = match init {
                Some(expr) => eval_expr(expr, frame)?,
                None => Value::Null,
            };
            frame.scope.define(name, value);
            Ok(Flow::Normal(Value::Null))
        }

        Stmt::Expr { expr } => eval_expr(expr, frame).map(Flow::Normal),

        Stmt::Block { body } => eval_block(body, frame),

        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            if eval_expr(condition, frame)?.to_bool() {
                eval_statement(then_branch, frame)
            } else if let Some(else_branch) = else_branch {
                eval_statement(else_branch, frame)
            } else {
                Ok(Flow::Normal(Value::Null))
            }
        }

        Stmt::While { condition, body } => {
            while eval_expr(condition, frame)?.to_bool() {
                match eval_statement(body, frame)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal(_) | Flow::Continue => {}
                }
            }
            Ok(Flow::Normal(Value::Null))
        }

        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            let frame = frame.nested();
            if let Some(init) = init {
                eval_statement(init, &frame)?;
            }
            loop {
                if let Some(test) = test {
                    if !eval_expr(test, &frame)?.to_bool() {
                        break;
                    }
                }
                match eval_statement(body, &frame)? {
                    Flow::Break => break,
                    Flow::Return(value) => return Ok(Flow::Return(value)),
                    Flow::Normal(_) | Flow::Continue => {}
                }
                if let Some(update) = update {
                    eval_expr(update, &frame)?;
                }
            }
            Ok(Flow::Normal(Value::Null))
        }

        Stmt::Return { value } => {
            let value = match value {
                Some(expr) => eval_expr(expr, frame)?,
                None => Value::Null,
            };
            Ok(Flow::Return(value))
        }

        Stmt::Throw { value } => Err(Error::Exception(eval_expr(value, frame)?)),

        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            let outcome = match (eval_block(block, frame), handler) {
                (Err(err), Some(handler)) => {
                    trace!(%err, "caught");
                    let catch_frame = frame.nested();
                    catch_frame.scope.define(&handler.param, err.into_value());
                    eval_block(&handler.body, &catch_frame)
                }
                (outcome, _) => outcome,
            };
            if let Some(finalizer) = finalizer {
                // An abrupt finally overrides whatever the try or catch did
                match eval_block(finalizer, frame)? {
                    Flow::Normal(_) => {}
                    abrupt => return Ok(abrupt),
                }
            }
            outcome
        }

        Stmt::Break => Ok(Flow::Break),
        Stmt::Continue => Ok(Flow::Continue),
    }
}

/// Evaluate an expression.
pub fn eval_expr(expr: &Expr, frame: &Frame) -> Result<Value> {
    match expr {
        Expr::Identifier { name } => frame
            .scope
            .get(name)
            .ok_or_else(|| Error::runtime(format!("Undefined variable: {}", name))),

        Expr::Null => Ok(Value::Null),
        Expr::Bool { value } => Ok(Value::Boolean(*value)),
        Expr::Number { value } => Ok(Value::Number(*value)),
        Expr::String { value } => Ok(Value::String(value.clone())),

        Expr::Array { items } => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, frame)?);
            }
            Ok(Value::Array(values))
        }

        Expr::Object { properties } => {
            let mut map = HashMap::new();
            for property in properties {
                map.insert(property.key.clone(), eval_expr(&property.value, frame)?);
            }
            Ok(Value::Object(map))
        }

        Expr::Function(function) => Ok(Value::Function(make_closure(function, frame))),

        Expr::Member { object, property } => {
            let object = eval_expr(object, frame)?;
            get_property(&object, &Value::String(property.clone()))
        }

        Expr::Index { object, index } => {
            let object = eval_expr(object, frame)?;
            let index = eval_expr(index, frame)?;
            get_property(&object, &index)
        }

        Expr::Call { callee, args } => eval_call(callee, args, frame),

        Expr::Binary { op, left, right } => eval_binary(*op, left, right, frame),

        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, frame)?;
            match op {
                UnOp::Not => Ok(Value::Boolean(!value.to_bool())),
                UnOp::Neg => match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(Error::runtime(format!("Cannot negate {}", other.type_name()))),
                },
            }
        }

        Expr::Assign { target, value } => {
            let value = eval_expr(value, frame)?;
            frame.scope.set(target, value.clone()).map_err(Error::Runtime)?;
            Ok(value)
        }
    }
}

fn get_property(object: &Value, key: &Value) -> Result<Value> {
    if object.is_null() {
        return Err(Error::runtime(format!(
            "Cannot read property '{}' of null",
            key.to_string_value()
        )));
    }
    Ok(object.get(key))
}

/// Evaluate a call. `a.f(...)` and `a[k](...)` pass `a` as `this`.
fn eval_call(callee: &Expr, args: &[Expr], frame: &Frame) -> Result<Value> {
    let (this, function) = match callee {
        Expr::Member { object, property } => {
            let this = eval_expr(object, frame)?;
            let function = get_property(&this, &Value::String(property.clone()))?;
            (this, function)
        }
        Expr::Index { object, index } => {
            let this = eval_expr(object, frame)?;
            let key = eval_expr(index, frame)?;
            let function = get_property(&this, &key)?;
            (this, function)
        }
        other => (Value::Null, eval_expr(other, frame)?),
    };

    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(eval_expr(arg, frame)?);
    }

    match function {
        Value::Function(function) => function.call(frame.cx, this, arg_values),
        _ => Err(Error::NotCallable(print_expr(callee))),
    }
}

/// Turn a function node into a callable closing over `frame`'s scope.
///
/// The closure evaluates in whatever context it is called from, so the same
/// function body runs on the host or inside a coroutine.
pub fn make_closure(function: &FunctionNode, frame: &Frame) -> Function {
    let node = Arc::new(function.clone());
    let scope = frame.scope.clone();
    let runtime = frame.runtime.clone();
    let name = function.name.clone().unwrap_or_else(|| "anonymous".to_string());

    Function::new(name, move |cx, _this, args| {
        let frame = Frame::new(Scope::child(&scope), cx, &runtime);
        let mut args = args.into_iter();
        for param in &node.params {
            frame.scope.define(param, args.next().unwrap_or_default());
        }
        match eval_statements(&node.body, &frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(Value::Null),
            Flow::Break | Flow::Continue => Err(Error::runtime("break or continue outside of loop")),
        }
    })
}

/// Evaluate a binary operation.
fn eval_binary(op: BinOp, left: &Expr, right: &Expr, frame: &Frame) -> Result<Value> {
    // Short-circuit operators yield an operand, not a boolean
    match op {
        BinOp::And => {
            let left = eval_expr(left, frame)?;
            return if left.to_bool() { eval_expr(right, frame) } else { Ok(left) };
        }
        BinOp::Or => {
            let left = eval_expr(left, frame)?;
            return if left.to_bool() { Ok(left) } else { eval_expr(right, frame) };
        }
        _ => {}
    }

    let left_val = eval_expr(left, frame)?;
    let right_val = eval_expr(right, frame)?;

    let result = match op {
        BinOp::Add => match (&left_val, &right_val) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), b) => Value::String(format!("{}{}", a, b.to_string_value())),
            (a, Value::String(b)) => Value::String(format!("{}{}", a.to_string_value(), b)),
            _ => {
                return Err(Error::runtime(format!(
                    "Cannot add {} and {}",
                    left_val.type_name(),
                    right_val.type_name()
                )));
            }
        },
        BinOp::Sub => num_op(&left_val, &right_val, |a, b| a - b)?,
        BinOp::Mul => num_op(&left_val, &right_val, |a, b| a * b)?,
        BinOp::Div => num_op(&left_val, &right_val, |a, b| a / b)?,
        BinOp::Rem => num_op(&left_val, &right_val, |a, b| a % b)?,
        BinOp::Eq => Value::Boolean(left_val == right_val),
        BinOp::NotEq => Value::Boolean(left_val != right_val),
        BinOp::Lt => compare_values(&left_val, &right_val, |ord| ord.is_lt())?,
        BinOp::Le => compare_values(&left_val, &right_val, |ord| ord.is_le())?,
        BinOp::Gt => compare_values(&left_val, &right_val, |ord| ord.is_gt())?,
        BinOp::Ge => compare_values(&left_val, &right_val, |ord| ord.is_ge())?,
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators handled above"),
    };

    Ok(result)
}

/// Numeric binary operation helper.
fn num_op(left: &Value, right: &Value, op: fn(f64, f64) -> f64) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
        _ => Err(Error::runtime(format!(
            "Cannot perform numeric operation on {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Compare two values.
fn compare_values(a: &Value, b: &Value, pred: fn(std::cmp::Ordering) -> bool) -> Result<Value> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match a.partial_cmp(b) {
            Some(ord) => Ok(Value::Boolean(pred(ord))),
            // NaN compares false with everything
            None => Ok(Value::Boolean(false)),
        },
        (Value::String(a), Value::String(b)) => Ok(Value::Boolean(pred(a.cmp(b)))),
        _ => Err(Error::runtime(format!(
            "Cannot compare {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}
