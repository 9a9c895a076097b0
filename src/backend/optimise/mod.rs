//! Optimization passes over the IR
//!
//! One pass runs, once, between lowering and block analysis.
//!
//! # Available Passes
//!
//! - **Redundant Assignment Elision**: Folds `t = a op b; x = t` into `x = a op b`

pub mod redundant;

use crate::backend::ir::IrProgram;
use tracing::debug;

/// Run the peephole pass over the whole program
///
/// Returns the number of instructions removed.
pub fn remove_redundant_assignments(program: &mut IrProgram) -> usize {
    let removed = redundant::elide_redundant_assignments(program);
    debug!(removed, "redundant-assignment elision");
    removed
}
