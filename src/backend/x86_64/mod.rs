//! x86-64 Backend
//!
//! This module provides the x86-64 code generation backend including:
//! - Register definitions
//! - Instruction types (AT&T syntax)
//! - Stack frame layout
//! - Register residency tracking
//! - IR to x86-64 lowering
//!
//! # Pipeline
//!
//! ```text
//! Compacted IR
//!     │
//!     ▼ Block discovery + liveness
//! Interference graph per block
//!     │
//!     ▼ Graph coloring
//! Register assignment
//!     │
//!     ▼ Lowering
//! GNU assembler text
//! ```

pub mod frame;
pub mod instr;
pub mod lower;
pub mod regs;
pub mod residency;

pub use frame::{Frame, Slot};
pub use instr::{AluOp, Condition, MemOperand, Operand, X86Instr};
pub use lower::{CodeGenerator, generate};
pub use regs::X86Reg;
pub use residency::Residency;
