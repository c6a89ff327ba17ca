/// Source printer
///
/// Renders a tree as JavaScript-like source text. Output is normalized:
/// four-space indentation, braces on every branch, and parentheses only
/// where operator precedence requires them.

use crate::ast::*;
use std::fmt::Write as FmtWrite;

const INDENT: &str = "    ";

/// Operator strength of postfix forms (calls, member and index access)
const POSTFIX: u8 = 8;
const PREFIX: u8 = 7;

/// Print a whole program, one top-level statement per line
pub fn print_program(program: &Program) -> String {
    render(|out| {
        for stmt in &program.body {
            write_stmt(out, stmt, 0)?;
        }
        Ok(())
    })
}

pub fn print_stmt(stmt: &Stmt) -> String {
    render(|out| write_stmt(out, stmt, 0))
}

pub fn print_expr(expr: &Expr) -> String {
    render(|out| write_expr(out, expr, 0, 0))
}

fn render(write: impl FnOnce(&mut String) -> std::fmt::Result) -> String {
    let mut out = String::new();
    // Formatting into a String never fails
    let _ = write(&mut out);
    out
}

fn write_stmt(out: &mut String, stmt: &Stmt, indent: usize) -> std::fmt::Result {
    let prefix = INDENT.repeat(indent);
    match stmt {
        Stmt::Function(func) => {
            out.push_str(&prefix);
            write_function(out, func, indent)?;
            out.push('\n');
        }
        Stmt::Var { name, init } => {
            write!(out, "{}var {}", prefix, name)?;
            if let Some(init) = init {
                out.push_str(" = ");
                write_expr(out, init, indent, 0)?;
            }
            out.push_str(";\n");
        }
        Stmt::Expr { expr } => {
            out.push_str(&prefix);
            // A leading `function` or `{` would read as a declaration or block
            if matches!(expr, Expr::Function(_) | Expr::Object { .. }) {
                out.push('(');
                write_expr(out, expr, indent, 0)?;
                out.push(')');
            } else {
                write_expr(out, expr, indent, 0)?;
            }
            out.push_str(";\n");
        }
        Stmt::Block { body } => {
            out.push_str(&prefix);
            write_body(out, body, indent)?;
            out.push('\n');
        }
        Stmt::If { .. } => {
            out.push_str(&prefix);
            write_if(out, stmt, indent)?;
            out.push('\n');
        }
        Stmt::While { condition, body } => {
            write!(out, "{}while (", prefix)?;
            write_expr(out, condition, indent, 0)?;
            out.push_str(") ");
            write_branch(out, body, indent)?;
            out.push('\n');
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            write!(out, "{}for (", prefix)?;
            match init.as_deref() {
                Some(Stmt::Var { name, init }) => {
                    write!(out, "var {}", name)?;
                    if let Some(init) = init {
                        out.push_str(" = ");
                        write_expr(out, init, indent, 0)?;
                    }
                }
                Some(Stmt::Expr { expr }) => write_expr(out, expr, indent, 0)?,
                _ => {}
            }
            out.push_str("; ");
            if let Some(test) = test {
                write_expr(out, test, indent, 0)?;
            }
            out.push_str("; ");
            if let Some(update) = update {
                write_expr(out, update, indent, 0)?;
            }
            out.push_str(") ");
            write_branch(out, body, indent)?;
            out.push('\n');
        }
        Stmt::Return { value } => {
            write!(out, "{}return", prefix)?;
            if let Some(value) = value {
                out.push(' ');
                write_expr(out, value, indent, 0)?;
            }
            out.push_str(";\n");
        }
        Stmt::Throw { value } => {
            write!(out, "{}throw ", prefix)?;
            write_expr(out, value, indent, 0)?;
            out.push_str(";\n");
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            write!(out, "{}try ", prefix)?;
            write_body(out, block, indent)?;
            if let Some(handler) = handler {
                write!(out, " catch ({}) ", handler.param)?;
                write_body(out, &handler.body, indent)?;
            }
            if let Some(finalizer) = finalizer {
                out.push_str(" finally ");
                write_body(out, finalizer, indent)?;
            }
            out.push('\n');
        }
        Stmt::Break => writeln!(out, "{}break;", prefix)?,
        Stmt::Continue => writeln!(out, "{}continue;", prefix)?,
    }
    Ok(())
}

/// `if` chains print `else if` without nesting braces
fn write_if(out: &mut String, stmt: &Stmt, indent: usize) -> std::fmt::Result {
    if let Stmt::If {
        condition,
        then_branch,
        else_branch,
    } = stmt
    {
        out.push_str("if (");
        write_expr(out, condition, indent, 0)?;
        out.push_str(") ");
        write_branch(out, then_branch, indent)?;
        match else_branch.as_deref() {
            Some(nested @ Stmt::If { .. }) => {
                out.push_str(" else ");
                write_if(out, nested, indent)?;
            }
            Some(other) => {
                out.push_str(" else ");
                write_branch(out, other, indent)?;
            }
            None => {}
        }
    }
    Ok(())
}

/// A loop or branch body, always braced
fn write_branch(out: &mut String, stmt: &Stmt, indent: usize) -> std::fmt::Result {
    match stmt {
        Stmt::Block { body } => write_body(out, body, indent),
        other => write_body(out, std::slice::from_ref(other), indent),
    }
}

fn write_body(out: &mut String, body: &[Stmt], indent: usize) -> std::fmt::Result {
    if body.is_empty() {
        out.push_str("{}");
        return Ok(());
    }
    out.push_str("{\n");
    for stmt in body {
        write_stmt(out, stmt, indent + 1)?;
    }
    write!(out, "{}}}", INDENT.repeat(indent))
}

fn write_function(out: &mut String, func: &Function, indent: usize) -> std::fmt::Result {
    out.push_str("function");
    if let Some(name) = &func.name {
        write!(out, " {}", name)?;
    }
    write!(out, "({}) ", func.params.join(", "))?;
    write_body(out, &func.body, indent)
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Assign { .. } | Expr::Function(_) => 0,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } => PREFIX,
        Expr::Call { .. } | Expr::Member { .. } | Expr::Index { .. } => POSTFIX,
        _ => POSTFIX + 1,
    }
}

fn write_expr(out: &mut String, expr: &Expr, indent: usize, min_prec: u8) -> std::fmt::Result {
    let parens = precedence(expr) < min_prec;
    if parens {
        out.push('(');
    }
    match expr {
        Expr::Identifier { name } => out.push_str(name),
        Expr::Null => out.push_str("null"),
        Expr::Bool { value } => write!(out, "{}", value)?,
        Expr::Number { value } => out.push_str(&format_number(*value)),
        Expr::String { value } => out.push_str(&quote(value)),
        Expr::Array { items } => {
            out.push('[');
            write_list(out, items, indent)?;
            out.push(']');
        }
        Expr::Object { properties } => {
            if properties.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if is_identifier(&prop.key) {
                        out.push_str(&prop.key);
                    } else {
                        out.push_str(&quote(&prop.key));
                    }
                    out.push_str(": ");
                    write_expr(out, &prop.value, indent, 0)?;
                }
                out.push_str(" }");
            }
        }
        Expr::Function(func) => write_function(out, func, indent)?,
        Expr::Member { object, property } => {
            write_expr(out, object, indent, POSTFIX)?;
            write!(out, ".{}", property)?;
        }
        Expr::Index { object, index } => {
            write_expr(out, object, indent, POSTFIX)?;
            out.push('[');
            write_expr(out, index, indent, 0)?;
            out.push(']');
        }
        Expr::Call { callee, args } => {
            write_expr(out, callee, indent, POSTFIX)?;
            out.push('(');
            write_list(out, args, indent)?;
            out.push(')');
        }
        Expr::Binary { op, left, right } => {
            let prec = op.precedence();
            write_expr(out, left, indent, prec)?;
            write!(out, " {} ", op.symbol())?;
            write_expr(out, right, indent, prec + 1)?;
        }
        Expr::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_expr(out, operand, indent, PREFIX)?;
        }
        Expr::Assign { target, value } => {
            write!(out, "{} = ", target)?;
            write_expr(out, value, indent, 0)?;
        }
    }
    if parens {
        out.push(')');
    }
    Ok(())
}

fn write_list(out: &mut String, items: &[Expr], indent: usize) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, item, indent, 0)?;
    }
    Ok(())
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    #[test]
    fn test_print_function_and_call() {
        let prog = program(vec![
            func_decl(
                "f",
                &["x", "_"],
                vec![ret(Some(binary(
                    BinOp::Add,
                    call(ident("g"), vec![ident("x"), ident("_")]),
                    num(1.0),
                )))],
            ),
        ]);

        assert_eq!(
            print_program(&prog),
            "function f(x, _) {\n    return g(x, _) + 1;\n}\n"
        );
    }

    #[test]
    fn test_print_literals() {
        assert_eq!(print_expr(&string("bar")), "\"bar\"");
        assert_eq!(print_expr(&num(1.5)), "1.5");
        assert_eq!(print_expr(&num(42.0)), "42");
        assert_eq!(print_expr(&array(vec![null(), boolean(true)])), "[null, true]");
        assert_eq!(
            print_expr(&object(vec![("a", num(1.0)), ("two words", num(2.0))])),
            "{ a: 1, \"two words\": 2 }"
        );
    }

    #[test]
    fn test_print_respects_precedence() {
        let expr = binary(
            BinOp::Mul,
            binary(BinOp::Add, ident("a"), ident("b")),
            ident("c"),
        );
        assert_eq!(print_expr(&expr), "(a + b) * c");

        let expr = binary(
            BinOp::Sub,
            ident("a"),
            binary(BinOp::Sub, ident("b"), ident("c")),
        );
        assert_eq!(print_expr(&expr), "a - (b - c)");

        let expr = unary(UnOp::Not, binary(BinOp::And, ident("a"), ident("b")));
        assert_eq!(print_expr(&expr), "!(a && b)");
    }

    #[test]
    fn test_print_immediately_invoked_function() {
        let expr = call(func_expr(None, &[], vec![]), vec![]);
        assert_eq!(print_expr(&expr), "(function() {})()");

        let expr = call(
            call(ident("Spawn"), vec![func_expr(None, &["_"], vec![]), num(0.0)]),
            vec![],
        );
        assert_eq!(print_expr(&expr), "Spawn(function(_) {}, 0)()");
    }

    #[test]
    fn test_print_control_flow() {
        let prog = program(vec![
            if_else(
                ident("a"),
                vec![expr_stmt(call(ident("f"), vec![]))],
                Some(vec![if_else(ident("b"), vec![Stmt::Break], None)]),
            ),
            try_catch(
                vec![throw(string("x"))],
                Some(("e", vec![])),
                Some(vec![Stmt::Continue]),
            ),
        ]);

        assert_eq!(
            print_program(&prog),
            "if (a) {\n    f();\n} else {\n    if (b) {\n        break;\n    }\n}\n\
             try {\n    throw \"x\";\n} catch (e) {} finally {\n    continue;\n}\n"
        );
    }

    #[test]
    fn test_print_else_if_chain() {
        let stmt = Stmt::If {
            condition: ident("a"),
            then_branch: Box::new(block(vec![])),
            else_branch: Some(Box::new(Stmt::If {
                condition: ident("b"),
                then_branch: Box::new(block(vec![])),
                else_branch: None,
            })),
        };
        assert_eq!(print_stmt(&stmt), "if (a) {} else if (b) {}\n");
    }
}
