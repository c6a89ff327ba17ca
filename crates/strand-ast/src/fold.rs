/// Generic tree traversal
///
/// `Fold` consumes a tree and rebuilds it. Every method has a default that
/// recurses structurally into all children via the matching `walk_*`
/// function, so an implementation only overrides the node kinds it cares
/// about. An overriding handler receives the node's children already taken
/// apart and is responsible for recursing into them itself, typically by
/// calling back into `fold_expr`/`fold_block` or the `walk_*` helpers.
///
/// Optional children (a missing `else`, a bare `return`) are skipped.

use crate::ast::*;

pub trait Fold {
    type Error;

    fn fold_program(&mut self, program: Program) -> Result<Program, Self::Error> {
        walk_program(self, program)
    }

    fn fold_block(&mut self, body: Vec<Stmt>) -> Result<Vec<Stmt>, Self::Error> {
        walk_block(self, body)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Stmt, Self::Error> {
        walk_stmt(self, stmt)
    }

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, Self::Error> {
        walk_expr(self, expr)
    }

    /// Function declaration. May return any statement in its place.
    fn fold_function_decl(
        &mut self,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
    ) -> Result<Stmt, Self::Error> {
        walk_function(self, name, params, body).map(Stmt::Function)
    }

    /// Function expression. May return any expression in its place.
    fn fold_function_expr(
        &mut self,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
    ) -> Result<Expr, Self::Error> {
        walk_function(self, name, params, body).map(Expr::Function)
    }

    fn fold_call(&mut self, callee: Expr, args: Vec<Expr>) -> Result<Expr, Self::Error> {
        walk_call(self, callee, args)
    }

    fn fold_identifier(&mut self, name: String) -> Result<Expr, Self::Error> {
        Ok(Expr::Identifier { name })
    }

    /// A name introduced or written rather than read by an expression:
    /// `var` names, function names, assignment targets and catch parameters.
    fn fold_binding(&mut self, name: String) -> Result<String, Self::Error> {
        Ok(name)
    }
}

pub fn walk_program<F: Fold + ?Sized>(folder: &mut F, program: Program) -> Result<Program, F::Error> {
    Ok(Program {
        body: folder.fold_block(program.body)?,
    })
}

pub fn walk_block<F: Fold + ?Sized>(folder: &mut F, body: Vec<Stmt>) -> Result<Vec<Stmt>, F::Error> {
    body.into_iter().map(|stmt| folder.fold_stmt(stmt)).collect()
}

pub fn walk_function<F: Fold + ?Sized>(
    folder: &mut F,
    name: Option<String>,
    params: Vec<String>,
    body: Vec<Stmt>,
) -> Result<Function, F::Error> {
    Ok(Function {
        name: name.map(|name| folder.fold_binding(name)).transpose()?,
        params,
        body: folder.fold_block(body)?,
    })
}

pub fn walk_call<F: Fold + ?Sized>(
    folder: &mut F,
    callee: Expr,
    args: Vec<Expr>,
) -> Result<Expr, F::Error> {
    let callee = folder.fold_expr(callee)?;
    let args = walk_exprs(folder, args)?;
    Ok(Expr::Call {
        callee: Box::new(callee),
        args,
    })
}

pub fn walk_exprs<F: Fold + ?Sized>(folder: &mut F, exprs: Vec<Expr>) -> Result<Vec<Expr>, F::Error> {
    exprs.into_iter().map(|expr| folder.fold_expr(expr)).collect()
}

pub fn walk_opt_expr<F: Fold + ?Sized>(
    folder: &mut F,
    expr: Option<Expr>,
) -> Result<Option<Expr>, F::Error> {
    expr.map(|e| folder.fold_expr(e)).transpose()
}

pub fn walk_opt_stmt<F: Fold + ?Sized>(
    folder: &mut F,
    stmt: Option<Box<Stmt>>,
) -> Result<Option<Box<Stmt>>, F::Error> {
    stmt.map(|s| walk_boxed_stmt(folder, s)).transpose()
}

fn walk_boxed_stmt<F: Fold + ?Sized>(folder: &mut F, stmt: Box<Stmt>) -> Result<Box<Stmt>, F::Error> {
    folder.fold_stmt(*stmt).map(Box::new)
}

fn walk_boxed_expr<F: Fold + ?Sized>(folder: &mut F, expr: Box<Expr>) -> Result<Box<Expr>, F::Error> {
    folder.fold_expr(*expr).map(Box::new)
}

pub fn walk_stmt<F: Fold + ?Sized>(folder: &mut F, stmt: Stmt) -> Result<Stmt, F::Error> {
    let stmt = match stmt {
        Stmt::Function(Function { name, params, body }) => {
            return folder.fold_function_decl(name, params, body);
        }
        Stmt::Var { name, init } => Stmt::Var {
            name: folder.fold_binding(name)?,
            init: walk_opt_expr(folder, init)?,
        },
        Stmt::Expr { expr } => Stmt::Expr {
            expr: folder.fold_expr(expr)?,
        },
        Stmt::Block { body } => Stmt::Block {
            body: folder.fold_block(body)?,
        },
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => Stmt::If {
            condition: folder.fold_expr(condition)?,
            then_branch: walk_boxed_stmt(folder, then_branch)?,
            else_branch: walk_opt_stmt(folder, else_branch)?,
        },
        Stmt::While { condition, body } => Stmt::While {
            condition: folder.fold_expr(condition)?,
            body: walk_boxed_stmt(folder, body)?,
        },
        Stmt::For {
            init,
            test,
            update,
            body,
        } => Stmt::For {
            init: walk_opt_stmt(folder, init)?,
            test: walk_opt_expr(folder, test)?,
            update: walk_opt_expr(folder, update)?,
            body: walk_boxed_stmt(folder, body)?,
        },
        Stmt::Return { value } => Stmt::Return {
            value: walk_opt_expr(folder, value)?,
        },
        Stmt::Throw { value } => Stmt::Throw {
            value: folder.fold_expr(value)?,
        },
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            let block = folder.fold_block(block)?;
            let handler = match handler {
                Some(CatchClause { param, body }) => Some(CatchClause {
                    param: folder.fold_binding(param)?,
                    body: folder.fold_block(body)?,
                }),
                None => None,
            };
            let finalizer = finalizer.map(|body| folder.fold_block(body)).transpose()?;
            Stmt::Try {
                block,
                handler,
                finalizer,
            }
        }
        Stmt::Break => Stmt::Break,
        Stmt::Continue => Stmt::Continue,
    };
    Ok(stmt)
}

pub fn walk_expr<F: Fold + ?Sized>(folder: &mut F, expr: Expr) -> Result<Expr, F::Error> {
    let expr = match expr {
        Expr::Identifier { name } => return folder.fold_identifier(name),
        Expr::Function(Function { name, params, body }) => {
            return folder.fold_function_expr(name, params, body);
        }
        Expr::Call { callee, args } => return folder.fold_call(*callee, args),
        Expr::Null | Expr::Bool { .. } | Expr::Number { .. } | Expr::String { .. } => expr,
        Expr::Array { items } => Expr::Array {
            items: walk_exprs(folder, items)?,
        },
        Expr::Object { properties } => Expr::Object {
            properties: properties
                .into_iter()
                .map(|Property { key, value }| {
                    folder.fold_expr(value).map(|value| Property { key, value })
                })
                .collect::<Result<_, _>>()?,
        },
        Expr::Member { object, property } => Expr::Member {
            object: walk_boxed_expr(folder, object)?,
            property,
        },
        Expr::Index { object, index } => Expr::Index {
            object: walk_boxed_expr(folder, object)?,
            index: walk_boxed_expr(folder, index)?,
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: walk_boxed_expr(folder, left)?,
            right: walk_boxed_expr(folder, right)?,
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op,
            operand: walk_boxed_expr(folder, operand)?,
        },
        Expr::Assign { target, value } => Expr::Assign {
            target: folder.fold_binding(target)?,
            value: walk_boxed_expr(folder, value)?,
        },
    };
    Ok(expr)
}
