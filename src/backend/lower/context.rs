//! Lowering context for typed AST to IR translation
//!
//! This module provides the context that tracks state during lowering:
//! the instruction store being filled, the counters that keep temporaries and
//! labels unique, and the bookkeeping that decides which return of a function
//! is its last one.

use crate::backend::ir::{FunctionInfo, Instr, InstrId, InstrKind, IrProgram, Label, Value, Variable};
use crate::common::span::Span;
use crate::common::types::Type;
use crate::error::CompileError;

/// The function whose body is currently being lowered
#[derive(Clone, Debug)]
pub struct CurrentFunction {
    pub name: String,
    pub return_type: Type,
}

/// Context for lowering a typed program to IR
///
/// Tracks the current state during lowering, including:
/// - The instruction store being appended to
/// - Counters for fresh temporaries and labels
/// - The most recent return of the current function
pub struct LoweringContext {
    /// The program being built
    pub program: IrProgram,

    temp_counter: u32,
    label_counter: u32,

    current: Option<CurrentFunction>,

    /// Only this return may carry `is_last`; the next one demotes it
    last_return: Option<InstrId>,

    /// First instruction of the current function (its labeled entry)
    function_start: Option<InstrId>,
}

impl LoweringContext {
    /// Create a new lowering context
    pub fn new() -> Self {
        Self {
            program: IrProgram::new(),
            temp_counter: 0,
            label_counter: 0,
            current: None,
            last_return: None,
            function_start: None,
        }
    }

    // ========================================================================
    // Fresh names
    // ========================================================================

    /// Allocate a fresh temporary of the given type
    pub fn temp(&mut self, ty: Type) -> Variable {
        let name = format!(".t{}", self.temp_counter);
        self.temp_counter += 1;
        Variable::local(name, ty)
    }

    /// Allocate a fresh local label
    pub fn autolabel(&mut self) -> Label {
        let label = Label::Local(self.label_counter);
        self.label_counter += 1;
        label
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Append an instruction to the store
    pub fn emit(&mut self, kind: InstrKind) -> InstrId {
        self.program.push(Instr::new(kind))
    }

    /// Place a label at the current position
    pub fn place_label(&mut self, label: Label) -> InstrId {
        self.program.push(Instr::label(label))
    }

    /// Emit a return and make it the last one of the current function
    pub fn emit_return(&mut self, value: Option<Value>) -> InstrId {
        let id = self.emit(InstrKind::Return {
            value,
            is_last: true,
        });

        if let Some(previous) = self.last_return.replace(id)
            && let Some(Instr {
                kind: InstrKind::Return { is_last, .. },
                ..
            }) = self.program.get_mut(previous)
        {
            *is_last = false;
        }

        id
    }

    // ========================================================================
    // Function bookkeeping
    // ========================================================================

    /// Start a function body: place its entry label and record its parameters
    pub fn begin_function(&mut self, name: &str, return_type: Type, params: Vec<Variable>) {
        let entry = self.place_label(Label::Function(name.to_string()));
        self.program.functions.push(FunctionInfo {
            name: name.to_string(),
            params,
        });
        self.current = Some(CurrentFunction {
            name: name.to_string(),
            return_type,
        });
        self.last_return = None;
        self.function_start = Some(entry);
    }

    /// Close the current function, appending a bare return if its body
    /// does not already end with one
    pub fn finish_function(&mut self) {
        let ends_with_return = self
            .program
            .iter()
            .last()
            .is_some_and(|instr| matches!(instr.kind, InstrKind::Return { .. }));

        if !ends_with_return {
            self.emit_return(None);
        }

        self.current = None;
        self.last_return = None;
    }

    pub fn current_function(&self) -> Option<&CurrentFunction> {
        self.current.as_ref()
    }

    /// Number of instructions emitted since the current function began
    pub fn function_len(&self) -> usize {
        match self.function_start {
            Some(start) => self.program.live_ids().iter().filter(|id| **id >= start).count(),
            None => 0,
        }
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// A malformed-AST error carrying the IR emitted so far
    pub fn malformed(&self, span: Span, message: impl Into<String>) -> CompileError {
        CompileError::MalformedAst {
            line: span.line,
            message: message.into(),
            ir_dump: self.program.dump(),
        }
    }

    /// Finish lowering and hand over the program
    pub fn into_program(self) -> IrProgram {
        self.program
    }
}

impl Default for LoweringContext {
    fn default() -> Self {
        Self::new()
    }
}
