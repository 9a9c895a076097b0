//! Typed AST to IR lowering
//!
//! This module implements the lowering pass that converts the typed AST
//! from the front end into the flat three-address IR.
//!
//! # Modules
//!
//! - `context`: Lowering context for tracking state
//! - `expr`: Expression lowering
//! - `stmt`: Statement lowering
//! - `function`: Function and global lowering
//!
//! # Usage
//!
//! ```no_run
//! use imperivm::backend::lower_program;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let program: imperivm::common::tast::TProgram = todo!();
//! let ir = lower_program(&program)?;
//! println!("{}", ir.dump());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod expr;
pub mod function;
pub mod stmt;

#[cfg(test)]
mod tests;

// Re-exports
pub use context::LoweringContext;
pub use function::{lower_function, lower_global};

use crate::backend::ir::IrProgram;
use crate::backend::optimise::remove_redundant_assignments;
use crate::common::tast::TProgram;
use crate::error::Result;

/// Lower a typed program to IR
///
/// Globals are lowered first so they form the prefix the block finder skips.
/// The redundant-assignment pass runs once over the result.
pub fn lower_program(program: &TProgram) -> Result<IrProgram> {
    let mut ctx = LoweringContext::new();

    for global in &program.globals {
        lower_global(&mut ctx, global)?;
    }
    for func in &program.functions {
        lower_function(&mut ctx, func)?;
    }

    let mut ir = ctx.into_program();
    remove_redundant_assignments(&mut ir);
    Ok(ir)
}
