/// strand rewriter CLI

use std::io::Read;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use strand_rewrite::{RewriteOutput, Rewriter, TransformOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strandc")]
#[command(about = "strand rewriter - turns continuation-slot code into Spawn/Await calls")]
#[command(version)]
struct Args {
    /// Input program as a JSON syntax tree, or `-` for stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Identifier that marks the continuation slot
    #[arg(long, value_name = "NAME", default_value = "_")]
    sentinel: String,

    /// Output form
    #[arg(long, value_enum, default_value_t = Emit::Source)]
    emit: Emit,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Emit {
    /// JavaScript-like source text
    Source,
    /// JSON syntax tree
    Json,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Rewrite failed: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let rewriter = Rewriter::new(TransformOptions::new().sentinel(args.sentinel.as_str()));

    let output = if args.input.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading program from stdin")?;
        rewriter.rewrite_source(&source)?
    } else {
        rewriter
            .rewrite_file(&args.input)
            .with_context(|| format!("rewriting {}", args.input.display()))?
    };

    if args.verbose {
        eprintln!(
            "{}",
            if output.rewritten {
                "Rewrite successful"
            } else {
                "Nothing to rewrite; program passed through unchanged"
            }
        );
    }

    let text = render(&output, args.emit)?;
    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}

fn render(output: &RewriteOutput, emit: Emit) -> Result<String> {
    Ok(match emit {
        Emit::Source => output.printed.clone(),
        Emit::Json => output.to_json()? + "\n",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_ast::build::*;
    use strand_ast::{Program, from_json, print_program, to_json};

    fn write_input(dir: &tempfile::TempDir, tree: &Program) -> PathBuf {
        let path = dir.path().join("input.json");
        std::fs::write(&path, to_json(tree).unwrap()).unwrap();
        path
    }

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("strandc").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_sentinel_and_json_emit() {
        let dir = tempfile::tempdir().unwrap();
        let tree = program(vec![expr_stmt(call(ident("read"), vec![string("a"), ident("cb")]))]);
        let input = write_input(&dir, &tree);
        let out = dir.path().join("out.json");

        let args = parse(&[
            input.to_str().unwrap(),
            "--sentinel",
            "cb",
            "--emit",
            "json",
            "-o",
            out.to_str().unwrap(),
        ]);
        run(&args).unwrap();

        let written = from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let text = print_program(&written);
        assert!(text.starts_with("Spawn(function(cb) {"));
        assert!(text.contains(r#"Await(null, read, ["a"], 1);"#));
    }

    #[test]
    fn test_source_emit_passes_plain_programs_through() {
        let dir = tempfile::tempdir().unwrap();
        let tree = program(vec![expr_stmt(call(ident("f"), vec![ident("x")]))]);
        let input = write_input(&dir, &tree);
        let out = dir.path().join("out.js");

        run(&parse(&[input.to_str().unwrap(), "-o", out.to_str().unwrap()])).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "f(x);\n");
    }

    #[test]
    fn test_rewrite_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        // function f(_, _) {}
        let tree = program(vec![func_decl("f", &["_", "_"], vec![])]);
        let input = write_input(&dir, &tree);

        let err = run(&parse(&[input.to_str().unwrap()])).unwrap_err();
        assert!(format!("{:#}", err).contains("appears more than once"));

        let missing = dir.path().join("missing.json");
        assert!(run(&parse(&[missing.to_str().unwrap()])).is_err());
    }

    #[test]
    fn test_unknown_emit_is_rejected() {
        assert!(Args::try_parse_from(["strandc", "in.json", "--emit", "wasm"]).is_err());
    }
}
