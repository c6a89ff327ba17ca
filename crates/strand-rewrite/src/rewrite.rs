/// Continuation-slot rewriting
///
/// A function whose parameter list contains the sentinel (`_` by default)
/// becomes a `Spawn` call, and a call whose argument list contains it
/// becomes an `Await` call:
///
/// ```text
/// function f(x, _) { ... }   ->  var f = Spawn(function f(x, _) { ... }, 1);
/// fs.readFile(file, _)       ->  Await(fs, "readFile", [file], 1)
/// cache[key](_)              ->  Await(cache, key, [], 0)
/// lookup(name, _)            ->  Await(null, lookup, [name], 1)
/// ```

use strand_ast::build::{array, call, expr_stmt, func_expr, ident, if_else, null, num, program, string, throw};
use strand_ast::fold::{walk_call, walk_exprs, walk_function};
use strand_ast::{Expr, Fold, Function, Program, Stmt, print_expr};
use tracing::{debug, trace};

use crate::error::{Result, RewriteError};

/// Global the rewritten program calls to wrap a continuation-aware function
pub const SPAWN: &str = "Spawn";
/// Global the rewritten program calls to suspend on an operation
pub const AWAIT: &str = "Await";

/// Options for `transform`
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Identifier that marks the continuation slot
    pub sentinel_name: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            sentinel_name: "_".to_string(),
        }
    }
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sentinel(mut self, name: impl Into<String>) -> Self {
        self.sentinel_name = name.into();
        self
    }
}

/// Output of `transform`
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteResult {
    pub program: Program,
    /// Whether any function or call was rewritten. When false, `program` is
    /// the input unchanged and should not be wrapped.
    pub rewritten: bool,
}

/// Rewrite every continuation-aware function and call in `program`.
///
/// Output of an earlier transform passes through unchanged: a function
/// already handed to `Spawn` at its slot index is not wrapped again.
pub fn transform(program: Program, options: &TransformOptions) -> Result<RewriteResult> {
    let mut rewriter = SlotRewriter {
        sentinel: &options.sentinel_name,
        rewritten: false,
    };
    let program = rewriter.fold_program(program)?;
    Ok(RewriteResult {
        program,
        rewritten: rewriter.rewritten,
    })
}

/// Wrap a rewritten program so its top level runs inside a coroutine:
///
/// ```text
/// Spawn(function(_) { <program> }, 0)(function(err) { if (err) { throw err; } });
/// ```
///
/// The terminal callback re-raises anything the program did not catch.
pub fn wrap_program(rewritten: Program, sentinel: &str) -> Program {
    let entry = call(
        ident(SPAWN),
        vec![func_expr(None, &[sentinel], rewritten.body), num(0.0)],
    );
    let on_done = func_expr(
        None,
        &["err"],
        vec![if_else(ident("err"), vec![throw(ident("err"))], None)],
    );
    program(vec![expr_stmt(call(entry, vec![on_done]))])
}

struct SlotRewriter<'a> {
    sentinel: &'a str,
    rewritten: bool,
}

impl SlotRewriter<'_> {
    /// Index of the sentinel among `items`, if present exactly once.
    fn find_slot(
        &self,
        items: impl Iterator<Item = bool>,
        context: impl FnOnce() -> String,
    ) -> Result<Option<usize>> {
        let mut found = None;
        for (i, is_sentinel) in items.enumerate() {
            if !is_sentinel {
                continue;
            }
            if found.is_some() {
                return Err(RewriteError::duplicate(self.sentinel, context()));
            }
            found = Some(i);
        }
        Ok(found)
    }

    fn param_slot(&self, name: &Option<String>, params: &[String]) -> Result<Option<usize>> {
        self.find_slot(params.iter().map(|p| p == self.sentinel), || {
            describe_function(name)
        })
    }

    /// Rewrite a function's body and report its continuation slot.
    fn rewrite_function(
        &mut self,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
    ) -> Result<(Function, Option<usize>)> {
        let slot = self.param_slot(&name, &params)?;
        let function = walk_function(self, name, params, body)?;
        if let Some(slot) = slot {
            debug!(function = %describe_function(&function.name), slot, "wrapping in Spawn");
            self.rewritten = true;
        }
        Ok((function, slot))
    }

    /// `Spawn(function ... (.., _, ..) {...}, i)` with `_` at index `i`,
    /// as emitted by an earlier transform.
    fn is_spawned(&self, callee: &Expr, function: &Function, slot: &Expr) -> bool {
        if callee.as_identifier() != Some(SPAWN) {
            return false;
        }
        let Expr::Number { value } = slot else {
            return false;
        };
        function
            .params
            .iter()
            .position(|p| p == self.sentinel)
            .is_some_and(|i| i as f64 == *value)
    }
}

fn spawn_call(function: Function, slot: usize) -> Expr {
    call(ident(SPAWN), vec![Expr::Function(function), num(slot as f64)])
}

fn describe_function(name: &Option<String>) -> String {
    match name {
        Some(name) => format!("parameters of function {}", name),
        None => "parameters of anonymous function".to_string(),
    }
}

impl Fold for SlotRewriter<'_> {
    type Error = RewriteError;

    fn fold_function_decl(
        &mut self,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
    ) -> Result<Stmt> {
        let (function, slot) = self.rewrite_function(name, params, body)?;
        let Some(slot) = slot else {
            return Ok(Stmt::Function(function));
        };
        Ok(match function.name.clone() {
            Some(name) => Stmt::Var {
                name,
                init: Some(spawn_call(function, slot)),
            },
            None => expr_stmt(spawn_call(function, slot)),
        })
    }

    fn fold_function_expr(
        &mut self,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
    ) -> Result<Expr> {
        let (function, slot) = self.rewrite_function(name, params, body)?;
        Ok(match slot {
            Some(slot) => spawn_call(function, slot),
            None => Expr::Function(function),
        })
    }

    fn fold_call(&mut self, callee: Expr, args: Vec<Expr>) -> Result<Expr> {
        let args = match <[Expr; 2]>::try_from(args) {
            Ok([Expr::Function(function), slot]) if self.is_spawned(&callee, &function, &slot) => {
                trace!("leaving existing Spawn call in place");
                let Function { name, params, body } = function;
                let function = walk_function(self, name, params, body)?;
                return Ok(call(callee, vec![Expr::Function(function), slot]));
            }
            Ok(pair) => Vec::from(pair),
            Err(args) => args,
        };

        let sentinel = self.sentinel;
        let slot = self.find_slot(
            args.iter().map(|arg| arg.as_identifier() == Some(sentinel)),
            || format!("arguments of call to {}", print_expr(&callee)),
        )?;
        let Some(slot) = slot else {
            return walk_call(self, callee, args);
        };

        debug!(callee = %print_expr(&callee), slot, "rewriting call to Await");
        self.rewritten = true;

        let (receiver, member) = match callee {
            Expr::Member { object, property } => (self.fold_expr(*object)?, string(&property)),
            Expr::Index { object, index } => (self.fold_expr(*object)?, self.fold_expr(*index)?),
            other => (null(), self.fold_expr(other)?),
        };
        let mut args = args;
        args.remove(slot);
        let args = walk_exprs(self, args)?;

        Ok(call(
            ident(AWAIT),
            vec![receiver, member, array(args), num(slot as f64)],
        ))
    }

    fn fold_identifier(&mut self, name: String) -> Result<Expr> {
        if name == self.sentinel {
            return Err(RewriteError::misuse(name, "an expression"));
        }
        Ok(Expr::Identifier { name })
    }

    fn fold_binding(&mut self, name: String) -> Result<String> {
        if name == self.sentinel {
            return Err(RewriteError::misuse(name, "a binding"));
        }
        Ok(name)
    }
}
