/// Integration tests for continuation-slot rewriting

use std::io::Write;

use strand_ast::build::*;
use strand_ast::{BinOp, Program, Stmt, print_program, to_json};
use strand_rewrite::{RewriteError, Rewriter, TransformOptions, transform, wrap_program};

fn rewrite(body: Vec<Stmt>) -> Result<(Program, bool), RewriteError> {
    let result = transform(program(body), &TransformOptions::default())?;
    Ok((result.program, result.rewritten))
}

fn rewrite_text(body: Vec<Stmt>) -> String {
    let (program, rewritten) = rewrite(body).expect("rewrite failed");
    assert!(rewritten);
    print_program(&program)
}

#[test]
fn test_declaration_becomes_spawn_binding() {
    // function f(x, _) { return g(x, _) + 1; }
    let input = func_decl(
        "f",
        &["x", "_"],
        vec![ret(Some(binary(
            BinOp::Add,
            call(ident("g"), vec![ident("x"), ident("_")]),
            num(1.0),
        )))],
    );
    let (output, rewritten) = rewrite(vec![input]).unwrap();
    assert!(rewritten);

    let expected = var(
        "f",
        call(
            ident("Spawn"),
            vec![
                func_expr(
                    Some("f"),
                    &["x", "_"],
                    vec![ret(Some(binary(
                        BinOp::Add,
                        call(
                            ident("Await"),
                            vec![null(), ident("g"), array(vec![ident("x")]), num(1.0)],
                        ),
                        num(1.0),
                    )))],
                ),
                num(1.0),
            ],
        ),
    );
    assert_eq!(output.body, vec![expected]);
}

#[test]
fn test_function_expression_is_replaced_in_place() {
    let input = var("h", func_expr(None, &["_", "y"], vec![]));
    let text = rewrite_text(vec![input]);
    assert_eq!(text, "var h = Spawn(function(_, y) {}, 0);\n");
}

#[test]
fn test_three_await_forms() {
    let text = rewrite_text(vec![
        expr_stmt(call(member(ident("foo"), "bar"), vec![ident("_")])),
        expr_stmt(call(index(ident("foo"), ident("key")), vec![ident("_")])),
        expr_stmt(call(ident("baz"), vec![ident("_")])),
    ]);
    assert!(text.contains(r#"Await(foo, "bar", [], 0);"#));
    assert!(text.contains("Await(foo, key, [], 0);"));
    assert!(text.contains("Await(null, baz, [], 0);"));
}

#[test]
fn test_await_keeps_remaining_arguments_in_order() {
    let text = rewrite_text(vec![expr_stmt(call(
        member(ident("fs"), "readFile"),
        vec![ident("file"), ident("_"), string("utf8")],
    ))]);
    assert_eq!(text, "Await(fs, \"readFile\", [file, \"utf8\"], 1);\n");
}

#[test]
fn test_nested_calls_are_rewritten_independently() {
    // print(read(open(path, _), _))
    let text = rewrite_text(vec![expr_stmt(call(
        ident("print"),
        vec![call(
            ident("read"),
            vec![call(ident("open"), vec![ident("path"), ident("_")]), ident("_")],
        )],
    ))]);
    assert_eq!(
        text,
        "print(Await(null, read, [Await(null, open, [path], 1)], 1));\n"
    );
}

#[test]
fn test_nested_functions_are_wrapped_independently() {
    // function outer(_) { function inner(a, _) {} return 1; }
    let input = func_decl(
        "outer",
        &["_"],
        vec![func_decl("inner", &["a", "_"], vec![]), ret(Some(num(1.0)))],
    );
    let text = rewrite_text(vec![input]);
    assert!(text.starts_with("var outer = Spawn(function outer(_) {\n"));
    assert!(text.contains("    var inner = Spawn(function inner(a, _) {}, 1);\n"));
    assert!(text.ends_with("}, 0);\n"));
}

#[test]
fn test_plain_program_is_untouched() {
    let body = vec![
        func_decl("add", &["a", "b"], vec![ret(Some(binary(BinOp::Add, ident("a"), ident("b"))))]),
        expr_stmt(call(ident("add"), vec![num(1.0), num(2.0)])),
    ];
    let (output, rewritten) = rewrite(body.clone()).unwrap();
    assert!(!rewritten);
    assert_eq!(output.body, body);
}

#[test]
fn test_transform_is_idempotent() {
    let input = vec![
        func_decl("f", &["x", "_"], vec![ret(Some(call(ident("g"), vec![ident("x"), ident("_")])))]),
        expr_stmt(call(ident("f"), vec![num(1.0), ident("_")])),
    ];
    let (once, rewritten) = rewrite(input).unwrap();
    assert!(rewritten);

    let again = transform(once.clone(), &TransformOptions::default()).unwrap();
    assert!(!again.rewritten);
    assert_eq!(again.program, once);

    let wrapped = wrap_program(once, "_");
    let again = transform(wrapped.clone(), &TransformOptions::default()).unwrap();
    assert!(!again.rewritten);
    assert_eq!(again.program, wrapped);
}

#[test]
fn test_duplicate_parameter_slot() {
    let err = rewrite(vec![func_decl("f", &["_", "_"], vec![])]).unwrap_err();
    match err {
        RewriteError::DuplicateSlot { name, context } => {
            assert_eq!(name, "_");
            assert!(context.contains("function f"));
        }
        other => panic!("Expected DuplicateSlot, got {:?}", other),
    }
}

#[test]
fn test_duplicate_argument_slot() {
    let err = rewrite(vec![expr_stmt(call(ident("g"), vec![ident("_"), ident("_")]))]).unwrap_err();
    assert!(matches!(err, RewriteError::DuplicateSlot { .. }));
}

#[test]
fn test_sentinel_misuse() {
    let misuses = vec![
        // return _;
        func_decl("f", &["_"], vec![ret(Some(ident("_")))]),
        // g(_ + 1)
        expr_stmt(call(ident("g"), vec![binary(BinOp::Add, ident("_"), num(1.0))])),
        // _.x
        expr_stmt(member(ident("_"), "x")),
        // var _ = 1;
        var("_", num(1.0)),
        // _ = 1;
        expr_stmt(assign("_", num(1.0))),
        // try {} catch (_) {}
        try_catch(vec![], Some(("_", vec![])), None),
        // function _(x) {}
        func_decl("_", &["x"], vec![]),
        // var h = function _() {};
        var("h", func_expr(Some("_"), &[], vec![])),
    ];
    for stmt in misuses {
        let printed = strand_ast::print_stmt(&stmt);
        match rewrite(vec![stmt]) {
            Err(RewriteError::SentinelMisuse { name, .. }) => assert_eq!(name, "_"),
            other => panic!("Expected SentinelMisuse for {}, got {:?}", printed, other),
        }
    }
}

#[test]
fn test_wrap_program_text() {
    let (rewritten, _) = rewrite(vec![expr_stmt(call(ident("sleep"), vec![num(10.0), ident("_")]))]).unwrap();
    let text = print_program(&wrap_program(rewritten, "_"));
    assert_eq!(
        text,
        "Spawn(function(_) {\n    Await(null, sleep, [10], 1);\n}, 0)(function(err) {\n    if (err) {\n        throw err;\n    }\n});\n"
    );
}

#[test]
fn test_driver_wraps_only_rewritten_programs() {
    let rewriter = Rewriter::new(TransformOptions::default());

    let async_program = program(vec![expr_stmt(call(ident("f"), vec![ident("_")]))]);
    let output = rewriter
        .rewrite_source(&to_json(&async_program).unwrap())
        .unwrap();
    assert!(output.rewritten);
    assert!(output.printed.starts_with("Spawn(function(_) {"));

    let plain = program(vec![expr_stmt(call(ident("f"), vec![ident("x")]))]);
    let output = rewriter.rewrite_source(&to_json(&plain).unwrap()).unwrap();
    assert!(!output.rewritten);
    assert_eq!(output.program, plain);
    assert_eq!(output.printed, "f(x);\n");
}

#[test]
fn test_driver_reads_files() {
    let tree = program(vec![expr_stmt(call(member(ident("db"), "get"), vec![string("k"), ident("cb")]))]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(to_json(&tree).unwrap().as_bytes()).unwrap();

    let output = Rewriter::new(TransformOptions::new().sentinel("cb"))
        .rewrite_file(file.path())
        .unwrap();
    assert_eq!(output.source_file.as_deref(), Some(file.path()));
    assert!(output.printed.contains(r#"Await(db, "get", ["k"], 1);"#));
    assert!(output.printed.starts_with("Spawn(function(cb) {"));
}

#[test]
fn test_driver_missing_file() {
    let err = Rewriter::new(TransformOptions::default())
        .rewrite_file("/nonexistent/program.json")
        .unwrap_err();
    assert!(matches!(err, RewriteError::Io { .. }));
}
