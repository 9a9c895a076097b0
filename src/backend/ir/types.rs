//! Operands of IR instructions: variables, values, labels and operators.

use crate::common::tast::VarRef;
use crate::common::types::{StorageClass, Type};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named storage location
///
/// Identity is `(name, storage)`: the type is carried along but never takes
/// part in comparisons, so two references to the same storage always compare
/// equal regardless of how the front end typed each use.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub storage: StorageClass,
    pub ty: Type,
}

impl Variable {
    pub fn new(name: impl Into<String>, storage: StorageClass, ty: Type) -> Self {
        Self {
            name: name.into(),
            storage,
            ty,
        }
    }

    pub fn global(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, StorageClass::Global, ty)
    }

    pub fn param(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, StorageClass::Param, ty)
    }

    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, StorageClass::Local, ty)
    }

    pub fn is_global(&self) -> bool {
        self.storage.is_global()
    }

    /// Compiler temporaries use names no source identifier can spell
    pub fn is_temp(&self) -> bool {
        self.name.starts_with('.')
    }
}

impl From<&VarRef> for Variable {
    fn from(var: &VarRef) -> Self {
        Self::new(var.name.clone(), var.storage, var.ty)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.storage == other.storage
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.storage.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.storage.tag())
    }
}

/// Instruction operand: a literal or a variable reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Lit(i64),
    Var(Variable),
}

impl Value {
    pub fn as_var(&self) -> Option<&Variable> {
        match self {
            Value::Var(var) => Some(var),
            Value::Lit(_) => None,
        }
    }
}

impl From<Variable> for Value {
    fn from(var: Variable) -> Self {
        Value::Var(var)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Lit(n) => write!(f, "{}", n),
            Value::Var(var) => write!(f, "{}", var),
        }
    }
}

/// Jump target
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// Entry point of a function with a body
    Function(String),
    /// Compiler-generated label
    Local(u32),
}

impl Label {
    /// Spelling in the emitted assembly
    pub fn asm_name(&self) -> String {
        match self {
            Label::Function(name) => name.clone(),
            Label::Local(n) => format!(".L{}", n),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Label::Function(name) => write!(f, "fn.{}", name),
            Label::Local(n) => write!(f, "L.{}", n),
        }
    }
}

/// Unary IR operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitNot,
    Cast,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self {
            UnaryOp::Negate => "-",
            UnaryOp::LogicalNot => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Cast => "(cast) ",
        };
        write!(f, "{}", op)
    }
}

/// Binary IR operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    /// Evaluate on constants; `None` on division by zero
    pub fn fold(self, lhs: i64, rhs: i64) -> Option<i64> {
        let value = match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => lhs.checked_div(rhs)?,
            BinaryOp::Mod => lhs.checked_rem(rhs)?,
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
            BinaryOp::Xor => lhs ^ rhs,
            BinaryOp::Lt => (lhs < rhs) as i64,
            BinaryOp::Gt => (lhs > rhs) as i64,
            BinaryOp::Le => (lhs <= rhs) as i64,
            BinaryOp::Ge => (lhs >= rhs) as i64,
            BinaryOp::Eq => (lhs == rhs) as i64,
            BinaryOp::Ne => (lhs != rhs) as i64,
        };
        Some(value)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        };
        write!(f, "{}", op)
    }
}
