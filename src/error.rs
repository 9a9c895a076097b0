//! Compilation error types
//!
//! Every failure in the back end is fatal: nothing is recovered mid-pipeline
//! and no partial output is produced. Errors carry enough context (source
//! line, IR dump) for the reporting hooks in [`crate::report`].

use thiserror::Error;

/// Back end compilation errors
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    /// A shape the front end should never produce reached lowering
    ///
    /// **Triggered by:** `TExpr::Error` nodes, a void call used as a value,
    /// `&` applied to a non-variable, an assignment to a non-lvalue
    #[error("line {line}: malformed AST: {message}")]
    MalformedAst {
        /// Source line of the offending node (0 when unknown)
        line: usize,
        /// Error description
        message: String,
        /// IR emitted up to the point of failure
        ir_dump: String,
    },

    /// A global initializer that cannot be computed at load time
    #[error("line {line}: initializer of global `{name}` is not a constant")]
    NonConstantGlobal {
        /// Global variable name
        name: String,
        /// Source line of the declaration
        line: usize,
    },

    /// Internal invariant violation in allocation or code generation
    ///
    /// **Triggered by:** a variable with no frame slot, a colored lookup for a
    /// variable the allocator never saw, a memory operand outside a function
    #[error("internal error: unresolved operand `{variable}` ({context})")]
    UnresolvedOperand {
        /// Rendered variable name
        variable: String,
        /// Where the lookup failed
        context: String,
    },

    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CompileError {
    /// Source line the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::MalformedAst { line, .. } | CompileError::NonConstantGlobal { line, .. }
                if *line != 0 =>
            {
                Some(*line)
            }
            _ => None,
        }
    }

    /// IR state captured when the error was raised
    pub fn ir_dump(&self) -> Option<&str> {
        match self {
            CompileError::MalformedAst { ir_dump, .. } => Some(ir_dump),
            _ => None,
        }
    }

    pub(crate) fn unresolved(variable: impl ToString, context: impl Into<String>) -> Self {
        CompileError::UnresolvedOperand {
            variable: variable.to_string(),
            context: context.into(),
        }
    }
}

/// Result alias used throughout the back end
pub type Result<T> = std::result::Result<T, CompileError>;
