//! The compiler driver. Reads a source file, parses and checks it, and
//! writes RISC-V assembly text. `-t`/`-a`/`-i` optionally dump the
//! tokens, AST, or pre-allocation IR alongside the final output.
//!
//! Run with `--help` for usage.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use rvcc::back::codegen::{compile_ir, dump_ir, front_end, lower_ir};
use rvcc::front::lex::Lexer;
use rvcc::front::parse;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input source file
    file: String,

    /// dump tokens to this file
    #[arg(short = 't', long = "token-file")]
    token_file: Option<PathBuf>,

    /// dump the AST (indented tree form) to this file
    #[arg(short = 'a', long = "ast-file")]
    ast_file: Option<PathBuf>,

    /// dump IR, before register allocation, to this file
    #[arg(short = 'i', long = "ir-file")]
    ir_file: Option<PathBuf>,

    /// assembly output destination (default: input basename with .asm)
    #[arg(short = 'o', long = "output-file")]
    output_file: Option<PathBuf>,

    /// optimization level (reserved; has no effect in the core)
    #[arg(short = 'O', long = "optimize", default_value_t = 0)]
    optimize: u32,
}

fn default_output_path(input: &str) -> PathBuf {
    let stem = Path::new(input).file_stem().map(|s| s.to_owned()).unwrap_or_default();
    Path::new(input).with_file_name(stem).with_extension("asm")
}

fn run(args: Args) -> Result<(), String> {
    let _ = args.optimize;

    let input = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("couldn't read {}: {e}", args.file))?;

    if let Some(path) = &args.token_file {
        let tokens = Lexer::new(&input).tokenize().map_err(|e| e.to_string())?;
        let mut out = String::new();
        for token in &tokens {
            out.push_str(&format!("{token}\n"));
        }
        std::fs::write(path, out).map_err(|e| format!("couldn't write {}: {e}", path.display()))?;
    }

    if let Some(path) = &args.ast_file {
        let program = parse(&input).map_err(|e| e.to_string())?;
        std::fs::write(path, format!("{program:#?}\n"))
            .map_err(|e| format!("couldn't write {}: {e}", path.display()))?;
    }

    let checked = front_end(&input).map_err(|e| e.to_string())?;
    let raw = lower_ir(checked);

    if let Some(path) = &args.ir_file {
        std::fs::write(path, dump_ir(&raw))
            .map_err(|e| format!("couldn't write {}: {e}", path.display()))?;
    }

    let asm = compile_ir(raw);
    let output_path = args.output_file.clone().unwrap_or_else(|| default_output_path(&args.file));
    std::fs::write(&output_path, asm)
        .map_err(|e| format!("couldn't write {}: {e}", output_path.display()))?;

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
