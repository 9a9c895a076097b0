//! Three-address intermediate representation
//!
//! A single flat, mutable instruction list. Globals come first as plain
//! copies, then each function as a labeled entry followed by its body.
//!
//! ```text
//! result = -a + b * c;
//!
//! .t0.l = -a.l
//! .t1.l = b.l * c.l
//! result.l = .t0.l + .t1.l      (after redundant-assignment elision)
//! ```

pub mod instr;
pub mod program;
pub mod types;

pub use instr::{Instr, InstrKind};
pub use program::{FunctionInfo, InstrId, IrProgram};
pub use types::{BinaryOp, Label, UnaryOp, Value, Variable};
