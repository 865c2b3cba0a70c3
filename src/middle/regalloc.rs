//! Linear-scan-style register allocator with spill (spec.md §4.4).
//!
//! Operates one function at a time over the [`FunctionBlock`]s
//! `middle::cfg::build` produced, in block-index order, consulting each
//! block's per-instruction live-entering sets. Rewrites every `Var::Local`
//! operand from a virtual-register number to a concrete hardware register
//! number (0-31), inserting `LOADFP`/`STOREFP` around the instruction stream
//! to spill and reload values that don't fit in the 27-register pool. Also
//! rewrites `ALLOC` into `LARRAY` and patches each function's `FUNBEG` with
//! the final frame size and array-area base offset.

use std::collections::BTreeSet;

use crate::common::{Id, Map, Set};

use super::cfg::{FunctionBlock, Module};
use super::ir::{Addr, Instr, Op, Var};

/// `t0`, reserved scratch for the first operand read that misses the pool
/// within a single instruction.
const SCRATCH0: i32 = 5;
/// `t1`, reserved scratch for the second.
const SCRATCH1: i32 = 6;

/// Registers excluded from the allocation pool: `zero`, `sp`, `t0`, `t1`,
/// `fp` (spec.md §4.4). The remaining 27 registers (`x1,x3,x4,x7,x9..=x31`)
/// are available for variable binding.
fn allocatable_pool() -> Vec<u8> {
    (0u8..32).filter(|r| !matches!(r, 0 | 2 | 5 | 6 | 8)).collect()
}

pub struct AllocatedFunction {
    pub name: Id,
    pub instrs: Vec<Instr>,
}

pub struct AllocatedModule {
    pub globals: Vec<Instr>,
    pub functions: Vec<AllocatedFunction>,
}

pub fn allocate(module: Module) -> AllocatedModule {
    let functions = module.functions.into_iter().map(allocate_function).collect();
    AllocatedModule { globals: module.globals, functions }
}

/// Operand slots (by position) a given opcode reads, restricted to the
/// slots that can hold a variable — mirrors `Instr::reads`'s opcode
/// dispatch but keeps the slot index so the allocator can rewrite in place.
fn read_slots(op: Op) -> &'static [usize] {
    use Op::*;
    match op {
        Ret | Beqz | Param => &[0],
        Mov => &[1],
        _ if op.is_unary() => &[1],
        _ if op.is_binary() => &[1, 2],
        Load => &[1, 2],
        Store => &[0, 1, 2],
        _ => &[],
    }
}

/// The slot a given opcode writes, if any. Every opcode in this IR that
/// writes a variable writes it into `a0`.
fn write_slot(op: Op) -> Option<usize> {
    use Op::*;
    match op {
        Mov | Call | La | Load | Alloc | Larray => Some(0),
        _ if op.is_unary() || op.is_binary() => Some(0),
        _ => None,
    }
}

struct Alloc {
    pool: Vec<u8>,
    free: BTreeSet<u8>,
    bound: Map<Var, u8>,
    reg_owner: [Option<Var>; 32],
    spill_offsets: Map<Var, i32>,
    array_offset: i32,
    victim_cursor: usize,
}

impl Alloc {
    fn new() -> Self {
        let pool = allocatable_pool();
        let free = pool.iter().copied().collect();
        Alloc {
            pool,
            free,
            bound: Map::new(),
            reg_owner: [None; 32],
            spill_offsets: Map::new(),
            array_offset: 0,
            victim_cursor: 0,
        }
    }

    fn bind(&mut self, var: Var, reg: u8) {
        self.free.remove(&reg);
        self.reg_owner[reg as usize] = Some(var);
        self.bound.insert(var, reg);
    }

    /// Releases every pool register whose bound variable is not live
    /// entering the instruction about to run — spec.md §4.4 step 3's
    /// "prune dead" step, run just before a write needs a register.
    fn prune_dead(&mut self, live: &Set<Var>) {
        for &r in &self.pool.clone() {
            if let Some(v) = self.reg_owner[r as usize] {
                if !live.contains(&v) {
                    self.reg_owner[r as usize] = None;
                    self.bound.remove(&v);
                    self.free.insert(r);
                }
            }
        }
    }

    fn pop_free(&mut self) -> Option<u8> {
        let r = *self.free.iter().next()?;
        self.free.remove(&r);
        Some(r)
    }

    /// Deterministic round-robin victim selection restricted to the
    /// allocatable pool (spec.md §9's corrected version of the original's
    /// reserved-register-including cycle).
    fn choose_victim(&mut self) -> u8 {
        loop {
            let candidate = self.pool[self.victim_cursor % self.pool.len()];
            self.victim_cursor += 1;
            if self.reg_owner[candidate as usize].is_some() {
                return candidate;
            }
        }
    }

    /// The permanent spill slot for `var`, assigning a fresh one (growing
    /// downward by 4 past the 8-byte callee-saved area) on first spill.
    fn spill_slot(&mut self, var: Var) -> i32 {
        if let Some(&off) = self.spill_offsets.get(&var) {
            return off;
        }
        let off = 8 + 4 * (self.spill_offsets.len() as i32 + 1);
        self.spill_offsets.insert(var, off);
        off
    }

    /// Materializes a read of `var`: if it's already bound to a pool
    /// register, use that directly; otherwise borrow the next scratch
    /// register and emit a `LOADFP` from its parameter slot or spill slot.
    fn materialize_read(&mut self, var: Var, scratch_idx: &mut u8, out: &mut Vec<Instr>) -> i32 {
        if let Some(&r) = self.bound.get(&var) {
            return r as i32;
        }
        let scratch = match *scratch_idx {
            0 => SCRATCH0,
            1 => SCRATCH1,
            _ => unreachable!("at most two operand reads may miss the pool in one instruction"),
        };
        *scratch_idx += 1;
        let fp_offset = match var.param_ordinal() {
            Some(ordinal) => 4 * ordinal,
            None => {
                let off = self
                    .spill_offsets
                    .get(&var)
                    .copied()
                    .unwrap_or_else(|| panic!("{var} read before being defined or spilled"));
                -off
            }
        };
        out.push(Instr::new(
            Op::Loadfp,
            Some(Addr::Var(Var::Local(scratch))),
            Some(Addr::Imm(fp_offset)),
            None,
        ));
        scratch
    }

    /// Materializes a write target for `var`: reuse its register if
    /// already bound, else prune dead bindings and allocate a free
    /// register, spilling a victim if the pool is exhausted.
    fn materialize_write(&mut self, var: Var, live: &Set<Var>, out: &mut Vec<Instr>) -> i32 {
        if let Some(&r) = self.bound.get(&var) {
            return r as i32;
        }
        self.prune_dead(live);
        if let Some(r) = self.pop_free() {
            self.bind(var, r);
            return r as i32;
        }
        let victim_reg = self.choose_victim();
        let victim_var = self.reg_owner[victim_reg as usize]
            .take()
            .expect("victim register chosen from currently-bound registers");
        self.bound.remove(&victim_var);
        if !victim_var.is_param() {
            let off = self.spill_slot(victim_var);
            out.push(Instr::new(
                Op::Storefp,
                Some(Addr::Var(Var::Local(victim_reg as i32))),
                Some(Addr::Imm(-off)),
                None,
            ));
        }
        self.bind(var, victim_reg);
        victim_reg as i32
    }
}

fn allocate_function(f: FunctionBlock) -> AllocatedFunction {
    let mut a = Alloc::new();
    let mut instrs = Vec::new();

    for block in &f.blocks {
        for (i, raw) in block.instrs.iter().enumerate() {
            let live = &block.live_entering[i];
            let mut instr = *raw;

            if instr.op == Op::Alloc {
                let bytes =
                    instr.a1.and_then(Addr::as_imm).expect("ALLOC carries a byte-count immediate");
                let offset = a.array_offset;
                a.array_offset += bytes;
                instr.op = Op::Larray;
                instr.a1 = Some(Addr::Imm(offset));
            }

            let mut scratch_idx = 0u8;
            for &slot in read_slots(instr.op) {
                if let Some(var) = instr.slot(slot).and_then(Addr::as_var) {
                    let reg = a.materialize_read(var, &mut scratch_idx, &mut instrs);
                    instr.set_slot(slot, Addr::Var(Var::Local(reg)));
                }
            }
            if let Some(slot) = write_slot(instr.op) {
                if let Some(var) = instr.slot(slot).and_then(Addr::as_var) {
                    let reg = a.materialize_write(var, live, &mut instrs);
                    instr.set_slot(slot, Addr::Var(Var::Local(reg)));
                }
            }

            instrs.push(instr);
        }
    }

    // Frame-size accounting (spec.md §4.4, §8): 8 bytes for saved ra/fp,
    // plus 4 bytes per distinct spilled variable, plus the local-array area.
    // Spill slots themselves start at offset 12 (`spill_slot`'s `8 + 4*1`),
    // so the last one used sits at `8 + spill_bytes` — the array area must
    // start one word past that, or element 0 aliases it (or, with no
    // spills, aliases the saved-fp slot at offset 8).
    let spill_bytes = 4 * a.spill_offsets.len() as i32;
    let array_base = 8 + spill_bytes + 4;
    let frame_size = array_base + a.array_offset;

    let funbeg = instrs.first_mut().expect("a function's instruction list is never empty");
    debug_assert_eq!(funbeg.op, Op::Funbeg, "a function's instruction list starts with FUNBEG");
    funbeg.a1 = Some(Addr::Imm(frame_size));
    funbeg.a2 = Some(Addr::Imm(array_base));

    AllocatedFunction { name: f.name, instrs }
}
