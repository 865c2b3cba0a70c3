//! The middle-end: the three-address IR, AST-to-IR lowering, control-flow
//! graph construction with live-variable analysis, and the register
//! allocator. See `back` for the code that turns the allocated IR into text.

pub mod cfg;
pub mod ir;
pub mod lower;
pub mod regalloc;

pub use cfg::{build, FunctionBlock, Module};
pub use ir::*;
pub use lower::lower;
