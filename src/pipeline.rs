//! Imperivm Compiler Pipeline
//!
//! This module provides the end-to-end back end pipeline from the typed AST
//! to x86-64 assembly.
//!
//! # Pipeline Stages
//!
//! ```text
//! Typed AST (TProgram)
//!     │
//!     ▼ lower
//! IR (IrProgram) - three-address, globals first
//!     │
//!     ▼ optimise
//! IR without redundant copies
//!     │
//!     ▼ compact
//! Instruction list (Vec<Instr>)
//!     │
//!     ▼ x86_64 (per block: liveness, coloring, templates)
//! Output (String)
//! ```

use crate::backend::lower_program;
use crate::backend::x86_64::CodeGenerator;
use crate::common::tast::TProgram;
use crate::config::Config;
use crate::error::Result;
use crate::report::report_error;
use tracing::debug;

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The generated assembly as text
    pub asm: String,
    /// The IR after the peephole pass
    pub ir: String,
}

/// Compile a typed program to x86-64 assembly
///
/// This is the main entry point for the back end.
///
/// # Returns
///
/// * `Ok(CompileOutput)` - Successful compilation with assembly and IR text
/// * `Err(CompileError)` - Compilation failed at some stage
///
/// # Example
///
/// ```
/// use imperivm::common::tast::TProgram;
/// use imperivm::config::Config;
/// use imperivm::pipeline::compile;
///
/// let output = compile(&TProgram::default(), &Config::default()).unwrap();
/// assert!(output.asm.contains(".globl main"));
/// ```
pub fn compile(program: &TProgram, config: &Config) -> Result<CompileOutput> {
    config.validate()?;

    // Stage 1: Lower to IR (peephole included)
    let ir = lower_program(program)?;
    let dump = ir.dump();

    // Stage 2: Drop tombstones
    let instrs = ir.compact();
    debug!(instructions = instrs.len(), functions = ir.functions.len(), "IR ready");

    // Stage 3: Allocate and emit, block by block
    let asm = CodeGenerator::new(&instrs, &ir.functions, config).generate()?;

    Ok(CompileOutput { asm, ir: dump })
}

/// Compile and report errors with source context
///
/// This is a convenience function that prints pretty error messages
/// when compilation fails.
///
/// # Arguments
///
/// * `filename` - The filename (for error reporting)
/// * `source` - The source text the program was built from
/// * `program` - The typed program
/// * `config` - Back end configuration
///
/// # Returns
///
/// * `Ok(String)` - The generated assembly
/// * `Err(())` - Compilation failed (errors printed to stderr)
#[allow(clippy::result_unit_err)]
pub fn compile_and_report(
    filename: &str,
    source: &str,
    program: &TProgram,
    config: &Config,
) -> std::result::Result<String, ()> {
    match compile(program, config) {
        Ok(output) => Ok(output.asm),
        Err(e) => {
            report_error(filename, source, &e);
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::span::Span;
    use crate::common::tast::{TExpr, TFunction, TStmt};
    use crate::common::types::Type;
    use crate::error::CompileError;

    fn main_returning(value: i64) -> TProgram {
        TProgram {
            globals: vec![],
            functions: vec![TFunction {
                name: "main".to_string(),
                parameters: vec![],
                return_type: Type::INT,
                body: Some(vec![(
                    TStmt::Return {
                        expr: Some((
                            TExpr::Literal {
                                value,
                                ty: Type::INT,
                            },
                            Span::new(1),
                        )),
                    },
                    Span::new(1),
                )]),
                span: Span::new(1),
            }],
        }
    }

    #[test]
    fn test_compile_main() {
        let output = compile(&main_returning(42), &Config::default()).unwrap();
        assert!(output.asm.contains("main:"));
        assert!(output.asm.contains("movq $42, %rax"));
        assert!(output.asm.trim_end().ends_with("ret"));
        assert_eq!(output.ir, "fn.main:\nreturn 42\n");
    }

    #[test]
    fn test_invalid_config_is_rejected_before_lowering() {
        let config = Config {
            print_blocks: true,
            ..Config::default()
        };
        let result = compile(&main_returning(0), &config);
        assert!(matches!(result, Err(CompileError::InvalidConfig(_))));
    }

    #[test]
    fn test_compilations_share_nothing() {
        let first = compile(&main_returning(1), &Config::default()).unwrap();
        let second = compile(&main_returning(1), &Config::default()).unwrap();
        assert_eq!(first.asm, second.asm);
    }
}
