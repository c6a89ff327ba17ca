/// Abstract Syntax Tree types for strand
///
/// These types represent the structure of the JavaScript-like programs the
/// rewriter consumes and produces. Nodes are owned so a rewrite can move
/// subtrees into new nodes without copying.
///
/// Every enum is internally tagged with a `kind` field when encoded as JSON.

use serde::{Deserialize, Serialize};

/// A complete program: a sequence of top-level statements
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Function declaration or expression: `function name(a, b) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Name, absent for anonymous function expressions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// `catch (param) { body }` clause of a try statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: String,
    pub body: Vec<Stmt>,
}

/// Object literal property: `key: value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Expr,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    /// Function declaration: `function f(x, _) { ... }`
    Function(Function),
    /// Variable declaration: `var x` or `var x = expr`
    Var {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Expr>,
    },
    /// Expression used as a statement: `expr;`
    Expr { expr: Expr },
    /// Nested block: `{ ... }`
    Block { body: Vec<Stmt> },
    /// If statement: `if (cond) stmt else stmt`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_branch: Option<Box<Stmt>>,
    },
    /// While loop: `while (cond) stmt`
    While { condition: Expr, body: Box<Stmt> },
    /// C-style for loop: `for (init; test; update) stmt`
    For {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Box<Stmt>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test: Option<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// Return statement: `return` or `return expr`
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expr>,
    },
    /// Throw statement: `throw expr`
    Throw { value: Expr },
    /// Try statement with optional catch and finally parts
    Try {
        block: Vec<Stmt>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        handler: Option<CatchClause>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finalizer: Option<Vec<Stmt>>,
    },
    /// `break`
    Break,
    /// `continue`
    Continue,
}

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Identifier reference: `foo`
    Identifier { name: String },
    /// `null`
    Null,
    /// `true` / `false`
    Bool { value: bool },
    /// Number literal: `42`, `3.14`
    Number { value: f64 },
    /// String literal: `"hello"`
    String { value: String },
    /// Array literal: `[a, b, c]`
    Array { items: Vec<Expr> },
    /// Object literal: `{ a: 1, b: 2 }`
    Object { properties: Vec<Property> },
    /// Function expression: `function (x, _) { ... }`
    Function(Function),
    /// Member access: `object.property`
    Member { object: Box<Expr>, property: String },
    /// Dynamic index access: `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// Call: `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Binary operation: `left op right`
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation: `op operand`
    Unary { op: UnOp, operand: Box<Expr> },
    /// Assignment to a variable: `target = value`
    Assign { target: String, value: Box<Expr> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Source spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "===",
            BinOp::NotEq => "!==",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::NotEq => 3,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 6,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    Not,
    Neg,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
        }
    }
}

impl Expr {
    /// The identifier name if this is a bare identifier
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier { name } => Some(name),
            _ => None,
        }
    }
}
