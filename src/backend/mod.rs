//! Imperivm Compiler Backend
//!
//! This module implements the back end of the Imperivm compiler, which
//! translates the typed AST from the front end into x86-64 assembly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Typed AST     │────▶│   IR Lowering   │────▶│    Peephole     │
//! │   (TProgram)    │     │ (three-address) │     │                 │
//! └─────────────────┘     └─────────────────┘     └────────┬────────┘
//!                                                          │
//! ┌─────────────────┐     ┌─────────────────┐     ┌────────▼────────┐
//! │  AT&T assembly  │◀────│  x86-64 Codegen │◀────│ Block Regalloc  │
//! │    (String)     │     │                 │     │ (graph coloring)│
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - `ir`: three-address IR and its instruction store
//! - `lower`: TAST to IR lowering
//! - `optimise`: redundant-assignment elision
//! - `regalloc`: basic blocks, liveness and graph coloring
//! - `x86_64`: frames, residency and instruction templates

pub mod ir;
pub mod lower;
pub mod optimise;
pub mod regalloc;
pub mod x86_64;

// Re-export commonly used IR types
pub use ir::{FunctionInfo, Instr, InstrKind, IrProgram, Label, Value, Variable};

// Re-export lowering function
pub use lower::lower_program;

// Re-export codegen
pub use x86_64::{CodeGenerator, generate};
