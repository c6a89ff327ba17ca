//! Shorthand constructors for tree nodes.
//!
//! Used by the rewriter to emit new nodes and by tests to write trees by hand.

use crate::ast::*;

pub fn program(body: Vec<Stmt>) -> Program {
    Program { body }
}

pub fn ident(name: &str) -> Expr {
    Expr::Identifier {
        name: name.to_string(),
    }
}

pub fn null() -> Expr {
    Expr::Null
}

pub fn boolean(value: bool) -> Expr {
    Expr::Bool { value }
}

pub fn num(value: f64) -> Expr {
    Expr::Number { value }
}

pub fn string(value: &str) -> Expr {
    Expr::String {
        value: value.to_string(),
    }
}

pub fn array(items: Vec<Expr>) -> Expr {
    Expr::Array { items }
}

pub fn object(properties: Vec<(&str, Expr)>) -> Expr {
    Expr::Object {
        properties: properties
            .into_iter()
            .map(|(key, value)| Property {
                key: key.to_string(),
                value,
            })
            .collect(),
    }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

pub fn member(object: Expr, property: &str) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: property.to_string(),
    }
}

pub fn index(object: Expr, index: Expr) -> Expr {
    Expr::Index {
        object: Box::new(object),
        index: Box::new(index),
    }
}

pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unary(op: UnOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

pub fn assign(target: &str, value: Expr) -> Expr {
    Expr::Assign {
        target: target.to_string(),
        value: Box::new(value),
    }
}

fn function(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Function {
    Function {
        name: name.map(str::to_string),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
    }
}

pub fn func_expr(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Function(function(name, params, body))
}

pub fn func_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::Function(function(Some(name), params, body))
}

pub fn var(name: &str, init: Expr) -> Stmt {
    Stmt::Var {
        name: name.to_string(),
        init: Some(init),
    }
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr { expr }
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    Stmt::Block { body }
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return { value }
}

pub fn throw(value: Expr) -> Stmt {
    Stmt::Throw { value }
}

pub fn if_else(condition: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Stmt {
    Stmt::If {
        condition,
        then_branch: Box::new(block(then_body)),
        else_branch: else_body.map(|body| Box::new(block(body))),
    }
}

pub fn while_loop(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While {
        condition,
        body: Box::new(block(body)),
    }
}

pub fn try_catch(
    body: Vec<Stmt>,
    handler: Option<(&str, Vec<Stmt>)>,
    finalizer: Option<Vec<Stmt>>,
) -> Stmt {
    Stmt::Try {
        block: body,
        handler: handler.map(|(param, body)| CatchClause {
            param: param.to_string(),
            body,
        }),
        finalizer,
    }
}
