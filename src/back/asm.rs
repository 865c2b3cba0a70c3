//! The RISC-V (RV32) assembly emitter (spec.md §4.5).
//!
//! Consumes the register-allocated IR (every `Var` operand already a
//! concrete hardware register number) and produces a flat list of text
//! lines: directives, labels at column 0, and tab-indented instructions.
//! We never assemble or link this output (spec.md §1) — it's handed back
//! as a `String` for the driver to write to a file.

use crate::common::Id;
use crate::middle::ir::{Addr, Op, Var};
use crate::middle::regalloc::{AllocatedFunction, AllocatedModule};

/// Word size for this target: a 32-bit RISC-V `int`.
const WORD_SIZE: i32 = 4;

/// RISC-V integer register ABI names, indexed by register number (x0-x31).
const REG_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "fp", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

fn reg_name(n: i32) -> &'static str {
    REG_NAMES[n as usize]
}

fn var_reg(a: Option<Addr>) -> i32 {
    match a.and_then(Addr::as_var) {
        Some(Var::Local(n)) => n,
        other => panic!("expected a register-bound variable operand, found {other:?}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Text,
    Data,
    Bss,
}

impl Section {
    fn directive(self) -> &'static str {
        match self {
            Section::Text => ".text",
            Section::Data => ".data",
            Section::Bss => ".bss",
        }
    }
}

/// Emits a whole module (globals, then functions in order) to assembly
/// text. Stateful only in the ways spec.md §4.5 calls out: the current
/// section, the function currently being emitted (for its epilogue label
/// and frame size), and the outstanding-argument counter since the last
/// `CALL`.
struct Emitter {
    section: Option<Section>,
    cur_fn: Id,
    frame_size: i32,
    array_base: i32,
    outgoing_args: i32,
    lines: Vec<String>,
}

pub fn emit(module: AllocatedModule) -> String {
    let mut e = Emitter {
        section: None,
        cur_fn: Id::new(String::new()),
        frame_size: 0,
        array_base: 0,
        outgoing_args: 0,
        lines: Vec::new(),
    };
    for g in &module.globals {
        e.emit_global(g);
    }
    for f in &module.functions {
        e.emit_function(f);
    }
    let mut text = e.lines.join("\n");
    text.push('\n');
    text
}

impl Emitter {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn switch_section(&mut self, s: Section) {
        if self.section != Some(s) {
            self.push(s.directive());
            self.section = Some(s);
        }
    }

    fn emit_global(&mut self, instr: &crate::middle::ir::Instr) {
        let name = instr.a0.and_then(Addr::as_name).expect("global directive carries a symbol name");
        match instr.op {
            Op::Gbss => {
                self.switch_section(Section::Bss);
                let bytes = instr.a1.and_then(Addr::as_imm).expect("GBSS carries a byte-count immediate");
                self.push(format!(".global {name}"));
                self.push(format!("{name}:"));
                self.push(format!("\t.space {bytes}"));
            }
            Op::Gini => {
                self.switch_section(Section::Data);
                let val = instr.a1.and_then(Addr::as_imm).expect("GINI carries a value immediate");
                self.push(format!(".global {name}"));
                self.push(format!("{name}:"));
                self.push(format!("\t.word {val}"));
            }
            other => unreachable!("module-level instruction list only holds GBSS/GINI, found {other:?}"),
        }
    }

    fn emit_function(&mut self, f: &AllocatedFunction) {
        self.cur_fn = f.name;
        for instr in &f.instrs {
            match instr.op {
                Op::Funbeg => self.emit_prologue(instr),
                Op::Funend => self.emit_epilogue(),
                _ => self.emit_instr(instr),
            }
        }
    }

    fn emit_prologue(&mut self, instr: &crate::middle::ir::Instr) {
        self.frame_size = instr.a1.and_then(Addr::as_imm).expect("FUNBEG carries its frame size");
        self.array_base = instr.a2.and_then(Addr::as_imm).expect("FUNBEG carries its array-area base");
        self.switch_section(Section::Text);
        self.push(format!(".global {}", self.cur_fn));
        self.push(format!("{}:", self.cur_fn));
        let f = self.frame_size;
        self.push(format!("\taddi sp, sp, -{f}"));
        self.push(format!("\tsw ra, {}(sp)", f - WORD_SIZE));
        self.push(format!("\tsw fp, {}(sp)", f - 2 * WORD_SIZE));
        self.push(format!("\taddi fp, sp, {f}"));
    }

    fn emit_epilogue(&mut self) {
        let f = self.frame_size;
        self.push(format!("{}_epilogue:", self.cur_fn));
        self.push(format!("\tlw ra, {}(sp)", f - WORD_SIZE));
        self.push(format!("\tlw fp, {}(sp)", f - 2 * WORD_SIZE));
        self.push(format!("\taddi sp, sp, {f}"));
        self.push("\tret".to_string());
    }

    /// Materializes a source operand into a register name: a bound
    /// variable is already one, but an immediate has to be loaded into
    /// scratch first (`t0` for the first such operand in the instruction,
    /// `t1` for the second — spec.md §4.5, "Immediate materialization").
    fn operand_reg(&mut self, addr: Addr, scratch_idx: &mut u8) -> String {
        match addr {
            Addr::Var(Var::Local(n)) => reg_name(n).to_string(),
            Addr::Imm(v) => {
                let scratch = match *scratch_idx {
                    0 => "t0",
                    1 => "t1",
                    _ => unreachable!("at most two immediate source operands per instruction"),
                };
                *scratch_idx += 1;
                self.push(format!("\tli {scratch}, {v}"));
                scratch.to_string()
            }
            other => unreachable!("operand expects a register or immediate, found {other:?}"),
        }
    }

    fn emit_instr(&mut self, instr: &crate::middle::ir::Instr) {
        match instr.op {
            Op::Label => {
                let n = instr.a0.and_then(Addr::as_imm).expect("LABEL carries its id");
                self.push(format!(".L{n}:"));
            }
            Op::Ret => {
                let mut scratch = 0u8;
                let src = self.operand_reg(instr.a0.expect("RET carries a value"), &mut scratch);
                if src != "a0" {
                    self.push(format!("\tmv a0, {src}"));
                }
                self.push(format!("\tj {}_epilogue", self.cur_fn));
            }
            Op::Mov => {
                let dst = reg_name(var_reg(instr.a0));
                match instr.a1.expect("MOV carries a source operand") {
                    Addr::Imm(v) => self.push(format!("\tli {dst}, {v}")),
                    Addr::Var(Var::Local(n)) => self.push(format!("\tmv {dst}, {}", reg_name(n))),
                    other => unreachable!("MOV source must be a register or immediate, found {other:?}"),
                }
            }
            Op::Neg => self.emit_unary("neg", instr),
            Op::Not => self.emit_unary("not", instr),
            Op::Lnot => self.emit_unary("seqz", instr),
            Op::Jmp => {
                let l = instr.a0.and_then(Addr::as_imm).expect("JMP carries its target label");
                self.push(format!("\tj .L{l}"));
            }
            Op::Beqz => {
                let mut scratch = 0u8;
                let cond = self.operand_reg(instr.a0.expect("BEQZ carries a condition"), &mut scratch);
                let l = instr.a1.and_then(Addr::as_imm).expect("BEQZ carries its target label");
                self.push(format!("\tbeqz {cond}, .L{l}"));
            }
            Op::Param => {
                // Stores at the current `sp` before decrementing it, so
                // that (combined with the reverse-order push in
                // `middle::lower`) the callee can address parameter `k`
                // at the fixed offset `4*k` from `fp` regardless of its
                // own arity.
                let r = reg_name(var_reg(instr.a0));
                self.push(format!("\tsw {r}, 0(sp)"));
                self.push(format!("\taddi sp, sp, -{WORD_SIZE}"));
                self.outgoing_args += 1;
            }
            Op::Call => {
                let name = instr.a1.and_then(Addr::as_name).expect("CALL carries a callee name");
                self.push(format!("\tcall {name}"));
                let dst = reg_name(var_reg(instr.a0));
                if dst != "a0" {
                    self.push(format!("\tmv {dst}, a0"));
                }
                self.push(format!("\taddi sp, sp, {}", WORD_SIZE * self.outgoing_args));
                self.outgoing_args = 0;
            }
            Op::La => {
                let dst = reg_name(var_reg(instr.a0));
                let name = instr.a1.and_then(Addr::as_name).expect("LA carries a symbol name");
                self.push(format!("\tla {dst}, {name}"));
            }
            Op::Load => {
                let dst = reg_name(var_reg(instr.a0));
                let base = reg_name(var_reg(instr.a1));
                let off = instr.a2.and_then(Addr::as_imm).expect("LOAD carries an immediate offset");
                self.push(format!("\tlw {dst}, {off}({base})"));
            }
            Op::Store => {
                let val = reg_name(var_reg(instr.a0));
                let base = reg_name(var_reg(instr.a1));
                let off = instr.a2.and_then(Addr::as_imm).expect("STORE carries an immediate offset");
                self.push(format!("\tsw {val}, {off}({base})"));
            }
            Op::Loadfp => {
                let dst = reg_name(var_reg(instr.a0));
                let off = instr.a1.and_then(Addr::as_imm).expect("LOADFP carries an immediate offset");
                self.push(format!("\tlw {dst}, {off}(fp)"));
            }
            Op::Storefp => {
                let src = reg_name(var_reg(instr.a0));
                let off = instr.a1.and_then(Addr::as_imm).expect("STOREFP carries an immediate offset");
                self.push(format!("\tsw {src}, {off}(fp)"));
            }
            Op::Larray => {
                let dst = reg_name(var_reg(instr.a0));
                let off = instr.a1.and_then(Addr::as_imm).expect("LARRAY carries its array-local offset");
                // Materializes an address, not a load — spec.md §9 corrects
                // the original `lw`-based bug here.
                self.push(format!("\taddi {dst}, fp, -{}", off + self.array_base));
            }
            _ if instr.op.is_binary() => self.emit_binary(instr),
            other => unreachable!("{other:?} does not appear inside a function's allocated body"),
        }
    }

    fn emit_unary(&mut self, mnemonic: &str, instr: &crate::middle::ir::Instr) {
        let dst = reg_name(var_reg(instr.a0));
        let mut scratch = 0u8;
        let src = self.operand_reg(instr.a1.expect("unary op carries an operand"), &mut scratch);
        self.push(format!("\t{mnemonic} {dst}, {src}"));
    }

    fn emit_binary(&mut self, instr: &crate::middle::ir::Instr) {
        let dst = reg_name(var_reg(instr.a0));
        let mut scratch = 0u8;
        let lhs = self.operand_reg(instr.a1.expect("binary op carries a left operand"), &mut scratch);
        let rhs = self.operand_reg(instr.a2.expect("binary op carries a right operand"), &mut scratch);
        match instr.op {
            Op::Mul => self.push(format!("\tmul {dst}, {lhs}, {rhs}")),
            Op::Div => self.push(format!("\tdiv {dst}, {lhs}, {rhs}")),
            Op::Rem => self.push(format!("\trem {dst}, {lhs}, {rhs}")),
            Op::Add => self.push(format!("\tadd {dst}, {lhs}, {rhs}")),
            Op::Sub => self.push(format!("\tsub {dst}, {lhs}, {rhs}")),
            Op::Lt => self.push(format!("\tslt {dst}, {lhs}, {rhs}")),
            Op::Gt => self.push(format!("\tsgt {dst}, {lhs}, {rhs}")),
            Op::Le => {
                self.push(format!("\tsgt {dst}, {lhs}, {rhs}"));
                self.push(format!("\txori {dst}, {dst}, 1"));
            }
            Op::Ge => {
                self.push(format!("\tslt {dst}, {lhs}, {rhs}"));
                self.push(format!("\txori {dst}, {dst}, 1"));
            }
            Op::Eq => {
                self.push(format!("\tsub {dst}, {lhs}, {rhs}"));
                self.push(format!("\tseqz {dst}, {dst}"));
            }
            Op::Ne => {
                self.push(format!("\tsub {dst}, {lhs}, {rhs}"));
                self.push(format!("\tsnez {dst}, {dst}"));
            }
            Op::Land => {
                self.push(format!("\tsnez {dst}, {lhs}"));
                self.push(format!("\tsub {dst}, zero, {dst}"));
                self.push(format!("\tand {dst}, {dst}, {rhs}"));
                self.push(format!("\tsnez {dst}, {dst}"));
            }
            Op::Lor => {
                self.push(format!("\tor {dst}, {lhs}, {rhs}"));
                self.push(format!("\tsnez {dst}, {dst}"));
            }
            other => unreachable!("{other:?} is not a binary opcode"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::{check, parse};
    use crate::middle::{cfg, lower::lower, regalloc};

    fn emit_src(src: &str) -> String {
        let m = regalloc::allocate(cfg::build(lower(check(parse(src).unwrap()).unwrap())));
        emit(m)
    }

    #[test]
    fn emits_global_label_and_prologue_for_main() {
        let asm = emit_src("int main(){return 42;}");
        assert!(asm.contains(".global main"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("main_epilogue:"));
        assert!(asm.contains("\tret"));
    }

    #[test]
    fn every_line_is_either_a_label_or_tab_indented() {
        let asm = emit_src("int main(){int x=1; return x+2;}");
        for line in asm.lines() {
            assert!(
                line.starts_with('\t') || line.starts_with('.') || line.ends_with(':'),
                "unexpected line shape: {line:?}"
            );
        }
    }

    #[test]
    fn global_array_gets_bss_directive() {
        let asm = emit_src("int a[4]; int main(){a[0]=1; return a[0];}");
        assert!(asm.contains(".bss"));
        assert!(asm.contains(".space 16"));
    }

    #[test]
    fn global_initialized_scalar_gets_data_directive() {
        let asm = emit_src("int g = 7; int main(){return g;}");
        assert!(asm.contains(".data"));
        assert!(asm.contains(".word 7"));
    }

    #[test]
    fn le_lowers_to_sgt_then_xori() {
        let asm = emit_src("int main(){int x=1; int y=2; return x<=y;}");
        let lines: Vec<&str> = asm.lines().collect();
        let sgt_idx = lines.iter().position(|l| l.contains("sgt")).expect("emits sgt for <=");
        assert!(lines[sgt_idx + 1].contains("xori"));
    }

    #[test]
    fn call_emits_outgoing_arg_adjustment_matching_param_count() {
        let asm = emit_src("int f(int a,int b){return a+b;} int main(){return f(1,2);}");
        assert!(asm.contains("\tcall f"));
        assert!(asm.contains("\taddi sp, sp, 8"));
    }

    #[test]
    fn param_stores_before_decrementing_sp() {
        let asm = emit_src("int f(int a){return a;} int main(){return f(1);}");
        let lines: Vec<&str> = asm.lines().collect();
        let sw_idx = lines
            .iter()
            .position(|l| l.trim_start().starts_with("sw") && l.contains("0(sp)"))
            .expect("PARAM stores to 0(sp)");
        assert!(
            lines[sw_idx + 1].contains("addi sp, sp, -4"),
            "the stack slot must be written before sp is decremented, so the \
             callee's fixed fp+4*ordinal addressing holds regardless of arity"
        );
    }

    #[test]
    fn larray_materializes_an_address_not_a_load() {
        let asm = emit_src("int main(){int a[2]; a[0]=5; return a[0];}");
        assert!(asm.lines().any(|l| l.trim_start().starts_with("addi") && l.contains("fp")));
    }
}
