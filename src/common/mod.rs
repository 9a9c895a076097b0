//! Shared front-end contract: the typed AST the back end consumes.

pub mod ast;
pub mod span;
pub mod tast;
pub mod types;
