//! Driver glue (spec.md §2, "Driver glue"): strings the passes together in
//! the order spec.md §5 mandates — parse → check → lower → CFG + liveness
//! → register allocation → emission — and exposes the seams the `rvcc`
//! binary needs to implement the `-t/-a/-i` dump flags without re-running
//! an earlier pass.

use std::fmt;

use crate::front::{check, parse, CheckError, CheckedProgram, ParseError};
use crate::middle::ir::RawModule;
use crate::middle::lower::lower;
use crate::middle::{cfg, regalloc};

use super::asm;

/// Every error the front end can raise, unified so the driver has one
/// type to match on for its exit code (spec.md §7).
#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    Check(CheckError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Check(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<CheckError> for CompileError {
    fn from(e: CheckError) -> Self {
        CompileError::Check(e)
    }
}

/// Parses and checks `src`, stopping at the first error either stage
/// raises. Lowering never sees anything but a [`CheckedProgram`].
pub fn front_end(src: &str) -> Result<CheckedProgram, CompileError> {
    let program = parse(src)?;
    Ok(check(program)?)
}

/// AST → IR, the seam the `-i/--ir-file` flag dumps before allocation.
pub fn lower_ir(checked: CheckedProgram) -> RawModule {
    lower(checked)
}

/// IR → assembly text: CFG + liveness, then register allocation, then
/// emission. No pass after this one touches the instruction stream
/// (spec.md §5).
pub fn compile_ir(raw: RawModule) -> String {
    let module = cfg::build(raw);
    let allocated = regalloc::allocate(module);
    asm::emit(allocated)
}

/// The full core pipeline from a checked AST to assembly text.
pub fn compile(checked: CheckedProgram) -> String {
    compile_ir(lower_ir(checked))
}

/// Parses, checks, and compiles `src` end to end — the one-shot entry
/// point used by tests and any caller that doesn't need the intermediate
/// dumps.
pub fn compile_source(src: &str) -> Result<String, CompileError> {
    Ok(compile(front_end(src)?))
}

/// Renders an unallocated IR module as text, one instruction per line, in
/// the same textual shape the assembly emitter itself uses for labels vs.
/// instructions — handy for the `-i/--ir-file` dump and for debugging.
pub fn dump_ir(raw: &RawModule) -> String {
    let mut out = String::new();
    for g in &raw.globals {
        out.push_str(&format!("{g}\n"));
    }
    for f in &raw.functions {
        for i in f {
            out.push_str(&format!("{i}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_return_constant_end_to_end() {
        let asm = compile_source("int main(){return 42;}").unwrap();
        assert!(asm.contains("main:"));
        assert!(asm.contains("li") || asm.contains("mv"));
    }

    #[test]
    fn surfaces_parse_errors_through_compile_error() {
        let err = compile_source("int main( { return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn surfaces_check_errors_through_compile_error() {
        let err = compile_source("int main(){return y;}").unwrap_err();
        assert!(matches!(err, CompileError::Check(_)));
    }

    #[test]
    fn dump_ir_includes_funbeg_and_funend() {
        let checked = front_end("int main(){return 1;}").unwrap();
        let raw = lower_ir(checked);
        let dump = dump_ir(&raw);
        assert!(dump.contains("FUNBEG"));
        assert!(dump.contains("FUNEND"));
    }

    // The six end-to-end scenarios from spec.md §8 — checked at the
    // IR/assembly-shape level, since this crate never assembles or links
    // its output onto a real RISC-V simulator (spec.md §1's explicit
    // non-goal).
    #[test]
    fn scenario_return_constant() {
        assert!(compile_source("int main(){return 42;}").is_ok());
    }

    #[test]
    fn scenario_sum_of_squares() {
        assert!(compile_source("int main(){int x=3; int y=4; return x*x+y*y;}").is_ok());
    }

    #[test]
    fn scenario_recursive_fibonacci() {
        let asm = compile_source(
            "int fib(int n){if(n<2)return n; return fib(n-1)+fib(n-2);} int main(){return fib(10);}",
        )
        .unwrap();
        assert!(asm.contains("call fib"));
    }

    #[test]
    fn scenario_array_sum_in_a_while_loop() {
        let asm = compile_source(
            "int main(){int a[3]; a[0]=1; a[1]=2; a[2]=3; int s=0; int i=0; \
             while(i<3){s=s+a[i]; i=i+1;} return s;}",
        )
        .unwrap();
        assert!(asm.contains(".L"));
    }

    #[test]
    fn scenario_global_and_for_loop() {
        let asm = compile_source("int g; int main(){g=7; int s=0; for(int i=0;i<g;i=i+1) s=s+i; return s;}")
            .unwrap();
        assert!(asm.contains(".bss"));
    }

    #[test]
    fn scenario_do_while_with_break_and_continue() {
        let asm = compile_source(
            "int main(){int i=0; int s=0; do{if(i==3){i=i+1;continue;} if(i>=6)break; \
             s=s+i; i=i+1;}while(1); return s;}",
        )
        .unwrap();
        assert!(asm.contains("beqz"));
    }
}
