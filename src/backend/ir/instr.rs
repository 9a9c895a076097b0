//! IR instructions
//!
//! Three-address code over a single flat instruction list. Control flow is
//! expressed only through labels and jumps; an instruction carries at most
//! one label.

use crate::backend::ir::types::{BinaryOp, Label, UnaryOp, Value, Variable};
use std::fmt;

/// IR instruction bodies
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstrKind {
    /// Does nothing; carries a label
    Nop,

    /// result = op operand
    Unary {
        result: Variable,
        op: UnaryOp,
        operand: Value,
    },

    /// result = left op right
    Binary {
        result: Variable,
        op: BinaryOp,
        left: Value,
        right: Value,
    },

    /// dst = src
    Copy { dst: Variable, src: Value },

    /// goto target
    Goto { target: Label },

    /// if cond goto target
    CondJump { cond: Value, target: Label },

    /// result = call callee(args...)
    Call {
        result: Variable,
        callee: String,
        args: Vec<Value>,
    },

    /// call callee(args...), no result
    ProcCall { callee: String, args: Vec<Value> },

    /// return value
    ///
    /// `is_last` marks the final return of its function in program order.
    Return { value: Option<Value>, is_last: bool },

    /// dst = &src
    AssignRef { dst: Variable, src: Variable },

    /// dst = *src
    AssignDeref { dst: Variable, src: Value },

    /// *dst = src
    DerefAssign { dst: Variable, src: Value },
}

/// An instruction with its optional label
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instr {
    pub label: Option<Label>,
    pub kind: InstrKind,
}

impl Instr {
    pub fn new(kind: InstrKind) -> Self {
        Self { label: None, kind }
    }

    /// A labeled no-op: the usual way a jump target enters the list
    pub fn label(label: Label) -> Self {
        Self {
            label: Some(label),
            kind: InstrKind::Nop,
        }
    }

    /// Jumps, calls and returns end a basic block
    pub fn is_control_transfer(&self) -> bool {
        matches!(
            self.kind,
            InstrKind::Goto { .. }
                | InstrKind::CondJump { .. }
                | InstrKind::Call { .. }
                | InstrKind::ProcCall { .. }
                | InstrKind::Return { .. }
        )
    }

    /// Variables this instruction reads or writes, in operand order
    ///
    /// Unary: operand, result. Binary: left, right, result. Copy: src, dst.
    /// Conditional jump: condition. Call: result. Return: value.
    /// Pointer forms: src, dst. Call arguments are read from memory after the
    /// call-site spill and are not listed.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = Vec::new();

        match &self.kind {
            InstrKind::Nop | InstrKind::Goto { .. } | InstrKind::ProcCall { .. } => {}
            InstrKind::Unary {
                result, operand, ..
            } => {
                value(operand, &mut vars);
                vars.push(result);
            }
            InstrKind::Binary {
                result,
                left,
                right,
                ..
            } => {
                value(left, &mut vars);
                value(right, &mut vars);
                vars.push(result);
            }
            InstrKind::Copy { dst, src } => {
                value(src, &mut vars);
                vars.push(dst);
            }
            InstrKind::CondJump { cond, .. } => value(cond, &mut vars),
            InstrKind::Call { result, .. } => vars.push(result),
            InstrKind::Return { value: ret, .. } => {
                if let Some(v) = ret {
                    value(v, &mut vars);
                }
            }
            InstrKind::AssignRef { dst, src } => {
                vars.push(src);
                vars.push(dst);
            }
            InstrKind::AssignDeref { dst, src } | InstrKind::DerefAssign { dst, src } => {
                value(src, &mut vars);
                vars.push(dst);
            }
        }

        vars
    }

    /// Every variable the instruction mentions, call arguments included
    pub fn mentioned_variables(&self) -> Vec<&Variable> {
        let mut vars = self.variables();
        if let InstrKind::Call { args, .. } | InstrKind::ProcCall { args, .. } = &self.kind {
            for arg in args {
                value(arg, &mut vars);
            }
        }
        vars
    }

    /// Does any operand position name `var`?
    pub fn references(&self, var: &Variable) -> bool {
        self.variables().into_iter().any(|v| v == var)
    }

    /// The variable written by a unary or binary instruction
    pub fn arithmetic_result(&self) -> Option<&Variable> {
        match &self.kind {
            InstrKind::Unary { result, .. } | InstrKind::Binary { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn arithmetic_result_mut(&mut self) -> Option<&mut Variable> {
        match &mut self.kind {
            InstrKind::Unary { result, .. } | InstrKind::Binary { result, .. } => Some(result),
            _ => None,
        }
    }
}

fn value<'a>(v: &'a Value, vars: &mut Vec<&'a Variable>) {
    if let Value::Var(var) = v {
        vars.push(var);
    }
}

fn fmt_call(f: &mut fmt::Formatter, callee: &str, args: &[Value]) -> fmt::Result {
    write!(f, "call fn.{}", callee)?;
    if !args.is_empty() {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        write!(f, " ({})", args.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InstrKind::Nop => write!(f, "nop"),
            InstrKind::Unary {
                result,
                op,
                operand,
            } => write!(f, "{} = {}{}", result, op, operand),
            InstrKind::Binary {
                result,
                op,
                left,
                right,
            } => write!(f, "{} = {} {} {}", result, left, op, right),
            InstrKind::Copy { dst, src } => write!(f, "{} = {}", dst, src),
            InstrKind::Goto { target } => write!(f, "goto {}", target),
            InstrKind::CondJump { cond, target } => write!(f, "if {} goto {}", cond, target),
            InstrKind::Call {
                result,
                callee,
                args,
            } => {
                write!(f, "{} = ", result)?;
                fmt_call(f, callee, args)
            }
            InstrKind::ProcCall { callee, args } => fmt_call(f, callee, args),
            InstrKind::Return { value: Some(v), .. } => write!(f, "return {}", v),
            InstrKind::Return { value: None, .. } => write!(f, "return"),
            InstrKind::AssignRef { dst, src } => write!(f, "{} = &{}", dst, src),
            InstrKind::AssignDeref { dst, src } => write!(f, "{} = *{}", dst, src),
            InstrKind::DerefAssign { dst, src } => write!(f, "*{} = {}", dst, src),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.label, &self.kind) {
            (Some(label), InstrKind::Nop) => write!(f, "{}:", label),
            (Some(label), kind) => write!(f, "{}:\n{}", label, kind),
            (None, kind) => write!(f, "{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Type;

    fn var(name: &str) -> Variable {
        Variable::local(name, Type::LONG)
    }

    #[test]
    fn test_instruction_display() {
        let instr = Instr::new(InstrKind::Binary {
            result: var(".t1"),
            op: BinaryOp::Add,
            left: Value::Var(Variable::param("a", Type::INT)),
            right: Value::Lit(3),
        });
        assert_eq!(instr.to_string(), ".t1.l = a.p + 3");

        let instr = Instr::new(InstrKind::CondJump {
            cond: Value::Var(var(".t2")),
            target: Label::Local(7),
        });
        assert_eq!(instr.to_string(), "if .t2.l goto L.7");

        let instr = Instr::new(InstrKind::DerefAssign {
            dst: var("p"),
            src: Value::Lit(3),
        });
        assert_eq!(instr.to_string(), "*p.l = 3");
    }

    #[test]
    fn test_labeled_nop_prints_label_only() {
        let instr = Instr::label(Label::Function("main".to_string()));
        assert_eq!(instr.to_string(), "fn.main:");
    }

    #[test]
    fn test_variables_follow_operand_table() {
        let instr = Instr::new(InstrKind::Binary {
            result: var("r"),
            op: BinaryOp::Mul,
            left: Value::Var(var("a")),
            right: Value::Lit(2),
        });
        let names: Vec<String> = instr.variables().iter().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["a.l", "r.l"]);

        // Arguments are not part of the table
        let call = Instr::new(InstrKind::ProcCall {
            callee: "f".to_string(),
            args: vec![Value::Var(var("a"))],
        });
        assert!(call.variables().is_empty());
    }

    #[test]
    fn test_control_transfers() {
        assert!(Instr::new(InstrKind::Goto {
            target: Label::Local(0)
        })
        .is_control_transfer());
        assert!(Instr::new(InstrKind::Return {
            value: None,
            is_last: true
        })
        .is_control_transfer());
        assert!(!Instr::label(Label::Local(0)).is_control_transfer());
    }
}
