//! Control-flow graph construction and live-variable analysis (spec.md §4.3).
//!
//! `middle::lower` hands back a flat, `LABEL`/`JMP`/`BEQZ`-addressed
//! instruction list per function; [`build`] partitions that into basic
//! blocks, links predecessor/successor edges, and runs a backward
//! fixed-point liveness pass that `middle::regalloc` drives off of.

use crate::common::{Id, Map, Set};

use super::ir::{Addr, Instr, Op, RawModule, Var};

#[derive(Debug, Default)]
pub struct BasicBlock {
    pub instrs: Vec<Instr>,
    pub preds: Vec<usize>,
    pub succs: Vec<usize>,
    pub use_: Set<Var>,
    pub def: Set<Var>,
    pub live_in: Set<Var>,
    pub live_out: Set<Var>,
    /// One entry per instruction: the set of variables live immediately
    /// before that instruction executes.
    pub live_entering: Vec<Set<Var>>,
}

impl BasicBlock {
    fn new(instrs: Vec<Instr>) -> Self {
        BasicBlock { instrs, ..Default::default() }
    }
}

#[derive(Debug)]
pub struct FunctionBlock {
    pub name: Id,
    pub blocks: Vec<BasicBlock>,
}

#[derive(Debug, Default)]
pub struct Module {
    pub globals: Vec<Instr>,
    pub functions: Vec<FunctionBlock>,
}

pub fn build(raw: RawModule) -> Module {
    let functions = raw.functions.into_iter().map(build_function).collect();
    Module { globals: raw.globals, functions }
}

fn build_function(instrs: Vec<Instr>) -> FunctionBlock {
    let name = instrs[0]
        .a0
        .and_then(Addr::as_name)
        .expect("a function's instruction list starts with FUNBEG");

    let ranges = partition(&instrs);
    let mut blocks: Vec<BasicBlock> =
        ranges.iter().map(|&(s, e)| BasicBlock::new(instrs[s..=e].to_vec())).collect();

    link_edges(&mut blocks, &ranges, &instrs);
    compute_use_def(&mut blocks);
    liveness_fixpoint(&mut blocks);
    compute_live_entering(&mut blocks);

    FunctionBlock { name, blocks }
}

/// Splits one function's instruction list into `(start, end)` inclusive
/// ranges per the block-boundary rules in spec.md §4.3.
fn partition(instrs: &[Instr]) -> Vec<(usize, usize)> {
    let mut starts: Set<usize> = Set::new();
    starts.insert(0);
    for (i, instr) in instrs.iter().enumerate() {
        if instr.op == Op::Label {
            starts.insert(i);
        }
        if matches!(instr.op, Op::Jmp | Op::Beqz | Op::Ret) && i + 1 < instrs.len() {
            starts.insert(i + 1);
        }
    }
    let starts: Vec<usize> = starts.into_iter().collect();
    starts
        .iter()
        .enumerate()
        .map(|(idx, &s)| {
            let e = starts.get(idx + 1).map(|&n| n - 1).unwrap_or(instrs.len() - 1);
            (s, e)
        })
        .collect()
}

fn label_at(instr: &Instr) -> Option<i32> {
    (instr.op == Op::Label).then(|| instr.a0.and_then(Addr::as_imm)).flatten()
}

fn link_edges(blocks: &mut [BasicBlock], ranges: &[(usize, usize)], instrs: &[Instr]) {
    let mut label_block: Map<i32, usize> = Map::new();
    for (bi, &(s, _)) in ranges.iter().enumerate() {
        if let Some(l) = label_at(&instrs[s]) {
            label_block.insert(l, bi);
        }
    }

    for (bi, &(_, e)) in ranges.iter().enumerate() {
        let last = &instrs[e];
        let mut succs = Vec::new();
        match last.op {
            Op::Jmp => {
                let l = last.a0.and_then(Addr::as_imm).expect("JMP target is a label");
                succs.push(label_block[&l]);
            }
            Op::Beqz => {
                let l = last.a1.and_then(Addr::as_imm).expect("BEQZ target is a label");
                succs.push(label_block[&l]);
                if bi + 1 < blocks.len() && !succs.contains(&(bi + 1)) {
                    succs.push(bi + 1);
                }
            }
            Op::Ret => {}
            _ => {
                if bi + 1 < blocks.len() {
                    succs.push(bi + 1);
                }
            }
        }
        blocks[bi].succs = succs;
    }

    for bi in 0..blocks.len() {
        for s in blocks[bi].succs.clone() {
            blocks[s].preds.push(bi);
        }
    }
}

/// Per-block `use`/`def`: walk the block in reverse, applying each
/// instruction's write (add to `def`, drop from `use`) then its reads (add
/// to `use`, drop from `def`) — spec.md §4.3.
fn compute_use_def(blocks: &mut [BasicBlock]) {
    for b in blocks.iter_mut() {
        let mut use_ = Set::new();
        let mut def = Set::new();
        for instr in b.instrs.iter().rev() {
            if let Some(w) = instr.write() {
                def.insert(w);
                use_.remove(&w);
            }
            for r in instr.reads() {
                use_.insert(r);
                def.remove(&r);
            }
        }
        b.use_ = use_;
        b.def = def;
    }
}

fn liveness_fixpoint(blocks: &mut [BasicBlock]) {
    loop {
        let mut changed = false;
        for i in 0..blocks.len() {
            let live_out: Set<Var> =
                blocks[i].succs.iter().flat_map(|&s| blocks[s].live_in.clone()).collect();
            let live_in: Set<Var> = blocks[i]
                .use_
                .iter()
                .cloned()
                .chain(live_out.difference(&blocks[i].def).cloned())
                .collect();
            if live_in != blocks[i].live_in || live_out != blocks[i].live_out {
                changed = true;
            }
            blocks[i].live_out = live_out;
            blocks[i].live_in = live_in;
        }
        if !changed {
            break;
        }
    }
}

fn compute_live_entering(blocks: &mut [BasicBlock]) {
    for b in blocks.iter_mut() {
        let mut live = b.live_out.clone();
        let mut seq = Vec::with_capacity(b.instrs.len());
        for instr in b.instrs.iter().rev() {
            let w = instr.write();
            let mut next: Set<Var> = instr.reads().into_iter().collect();
            for v in &live {
                if Some(*v) != w {
                    next.insert(*v);
                }
            }
            live = next;
            seq.push(live.clone());
        }
        seq.reverse();
        b.live_entering = seq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::{check, parse};
    use crate::middle::lower::lower;

    fn build_src(src: &str) -> Module {
        build(lower(check(parse(src).unwrap()).unwrap()))
    }

    #[test]
    fn straight_line_function_is_one_block() {
        let m = build_src("int main(){return 1;}");
        assert_eq!(m.functions[0].blocks.len(), 1);
        assert!(m.functions[0].blocks[0].succs.is_empty());
    }

    #[test]
    fn if_without_else_has_two_successors_on_the_branch_block() {
        let m = build_src("int main(){ int x=0; if(x) x=1; return x; }");
        let f = &m.functions[0];
        let branch = f.blocks.iter().find(|b| b.instrs.last().unwrap().op == Op::Beqz).unwrap();
        assert_eq!(branch.succs.len(), 2);
    }

    #[test]
    fn ret_block_has_no_successors() {
        let m = build_src("int main(){ if(1) return 1; return 0; }");
        let f = &m.functions[0];
        for b in &f.blocks {
            if b.instrs.iter().any(|i| i.op == Op::Ret) {
                assert!(b.succs.is_empty());
            }
        }
    }

    #[test]
    fn loop_variable_is_live_across_the_backward_edge() {
        let m = build_src("int main(){ int i=0; while(i<10){ i=i+1; } return i; }");
        let f = &m.functions[0];
        // Every block has a predecessor/successor edge consistent with the
        // other side's bookkeeping.
        for (bi, b) in f.blocks.iter().enumerate() {
            for &s in &b.succs {
                assert!(f.blocks[s].preds.contains(&bi));
            }
        }
    }

    #[test]
    fn live_entering_has_one_entry_per_instruction() {
        let m = build_src("int main(){ int x=1; int y=2; return x+y; }");
        for b in &m.functions[0].blocks {
            assert_eq!(b.live_entering.len(), b.instrs.len());
        }
    }

    #[test]
    fn dead_temporary_after_its_last_use_is_not_live_out() {
        let m = build_src("int main(){ int x = 1+2; return 0; }");
        let f = &m.functions[0];
        let last = f.blocks.last().unwrap();
        assert!(last.live_out.is_empty());
    }
}
