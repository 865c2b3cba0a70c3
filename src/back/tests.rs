//! Integration tests spanning the whole pipeline: source text in,
//! assembly text out. Complements the per-module unit tests in `cfg`,
//! `lower`, `regalloc`, and `asm` by checking the pieces work together,
//! and the per-function unit tests in `codegen` by checking structural
//! properties of the emitted text rather than just success/failure.
//!
//! We never assemble or run this output on a real RISC-V target (spec.md
//! §1's non-goal), so these assertions stay at the level of "the right
//! directives, labels, and instruction mnemonics appear" rather than
//! "the program computes the right answer".

use super::codegen::compile_source;

fn asm_for(src: &str) -> String {
    compile_source(src).unwrap_or_else(|e| panic!("expected {src:?} to compile, got {e}"))
}

#[test]
fn every_function_gets_a_label_and_an_epilogue_label() {
    let asm = asm_for("int add(int a, int b){return a+b;} int main(){return add(1,2);}");
    assert!(asm.contains("add:"));
    assert!(asm.contains("add_epilogue:"));
    assert!(asm.contains("main:"));
    assert!(asm.contains("main_epilogue:"));
}

#[test]
fn text_section_directive_precedes_function_bodies() {
    let asm = asm_for("int main(){return 0;}");
    let text_pos = asm.find(".text").unwrap();
    let label_pos = asm.find("main:").unwrap();
    assert!(text_pos < label_pos);
}

#[test]
fn global_variable_without_initializer_goes_in_bss() {
    let asm = asm_for("int counter; int main(){return counter;}");
    assert!(asm.contains(".bss"));
    assert!(asm.contains("counter"));
}

#[test]
fn initialized_global_goes_in_data() {
    let asm = asm_for("int counter = 5; int main(){return counter;}");
    assert!(asm.contains(".data"));
}

#[test]
fn recursive_call_saves_and_restores_across_the_call() {
    let asm = asm_for(
        "int fact(int n){ if(n<=1) return 1; return n*fact(n-1); } int main(){return fact(5);}",
    );
    assert!(asm.contains("call fact"));
    // A frame that calls out must save ra somewhere in its prologue.
    assert!(asm.contains("ra"));
}

#[test]
fn while_loop_lowers_to_a_backward_branch() {
    let asm = asm_for("int main(){int i=0; while(i<5){i=i+1;} return i;}");
    assert!(asm.contains("j ") || asm.contains("jal"));
    assert!(asm.contains("beqz"));
}

#[test]
fn array_indexing_uses_word_scaled_addressing() {
    let asm = asm_for("int main(){int a[4]; a[2]=9; return a[2];}");
    // Array elements are word-sized; some shift/multiply by 4 must appear
    // in the address computation.
    assert!(asm.contains("slli") || asm.contains("<<") || asm.contains("4"));
}

#[test]
fn deeply_nested_expression_still_compiles_without_panicking() {
    let asm = asm_for("int main(){ return ((1+2)*(3-4))/((5%6)+((7<8)+(9>=10))); }");
    assert!(asm.contains("main:"));
}

#[test]
fn function_with_many_locals_spills_and_still_produces_valid_frame_math() {
    let src = "int main(){
        int a=1; int b=2; int c=3; int d=4; int e=5; int f=6; int g=7; int h=8;
        int i=9; int j=10; int k=11; int l=12; int m=13; int n=14; int o=15; int p=16;
        int q=17; int r=18; int s=19; int t=20; int u=21; int v=22; int w=23; int x=24;
        int y=25; int z=26; int aa=27; int bb=28; int cc=29; int dd=30;
        return a+b+c+d+e+f+g+h+i+j+k+l+m+n+o+p+q+r+s+t+u+v+w+x+y+z+aa+bb+cc+dd;
    }";
    let asm = asm_for(src);
    assert!(asm.contains("main:"));
    assert!(asm.contains("sw") && asm.contains("lw"));
}
