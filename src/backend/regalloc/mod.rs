//! Register Allocation
//!
//! This module maps the variables of each basic block to x86-64 registers.
//! Allocation is block-local: every block starts with all values in memory.
//!
//! # Pipeline
//!
//! ```text
//! IR (compacted) → Block Discovery → Variables → Liveness → Interference → Coloring
//! ```

pub mod allocator;
pub mod blocks;
pub mod liveness;

pub use allocator::{Coloring, GraphColoringAllocator, Strategy};
pub use blocks::{BlockFinder, global_prefix_len};
pub use liveness::{InterferenceGraph, LiveInterval, collect_variables, compute_liveness};
