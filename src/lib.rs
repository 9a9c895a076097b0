//! Imperivm: middle and back end of a compiler for a small C-like language.
//!
//! The crate takes a typed AST produced by an external front end, lowers it to
//! a three-address IR, allocates registers per basic block by graph coloring
//! and emits x86-64 assembly (System V ABI, AT&T syntax).
//!
//! Start at [`pipeline::compile`].

pub mod backend;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::Config;
pub use error::{CompileError, Result};
pub use pipeline::{CompileOutput, compile};
