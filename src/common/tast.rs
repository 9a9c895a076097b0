use crate::common::ast::{BinOp, UnaryOp};
use crate::common::span::{Span, Spanned};
use crate::common::types::{StorageClass, Type};

/// A resolved reference to a declared variable
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarRef {
    pub name: String,
    pub storage: StorageClass,
    pub ty: Type,
}

impl VarRef {
    pub fn new(name: impl Into<String>, storage: StorageClass, ty: Type) -> Self {
        Self {
            name: name.into(),
            storage,
            ty,
        }
    }

    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, StorageClass::Local, ty)
    }

    pub fn param(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, StorageClass::Param, ty)
    }

    pub fn global(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, StorageClass::Global, ty)
    }
}

#[derive(Clone, Debug)]
pub enum TExpr {
    /// Placeholder left behind by a front end that failed to build a node
    Error { ty: Type },

    Literal { value: i64, ty: Type },

    Variable(VarRef),

    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Self>>,
        rhs: Box<Spanned<Self>>,
        ty: Type,
    },

    UnaryOp {
        op: UnaryOp,
        operand: Box<Spanned<Self>>,
        ty: Type,
    },

    /// `ty` is the callee's declared return type
    Call {
        func_name: String,
        args: Vec<Spanned<Self>>,
        ty: Type,
    },
}

impl TExpr {
    pub fn get_type(&self) -> &Type {
        match self {
            TExpr::Error { ty } => ty,
            TExpr::Literal { ty, .. } => ty,
            TExpr::Variable(var) => &var.ty,
            TExpr::BinOp { ty, .. } => ty,
            TExpr::UnaryOp { ty, .. } => ty,
            TExpr::Call { ty, .. } => ty,
        }
    }
}

#[derive(Clone, Debug)]
pub enum TStmt {
    /// `type name = value;`
    Decl {
        var: VarRef,
        value: Option<Spanned<TExpr>>,
    },

    /// `lhs = rhs;` where `lhs` is a variable or a dereference
    Assignment {
        lhs: Spanned<TExpr>,
        rhs: Spanned<TExpr>,
    },

    /// `lhs op= rhs;`
    CompoundAssignment {
        op: BinOp,
        lhs: Spanned<TExpr>,
        rhs: Spanned<TExpr>,
    },

    Expr(Spanned<TExpr>),

    Block(Vec<Spanned<TStmt>>),

    If {
        cond: Spanned<TExpr>,
        then_branch: Box<Spanned<TStmt>>,
        else_branch: Option<Box<Spanned<TStmt>>>,
    },

    While {
        cond: Spanned<TExpr>,
        body: Box<Spanned<TStmt>>,
    },

    /// Runs the body while the condition is false
    Until {
        cond: Spanned<TExpr>,
        body: Box<Spanned<TStmt>>,
    },

    For {
        init: Option<Box<Spanned<TStmt>>>,
        cond: Option<Spanned<TExpr>>,
        step: Option<Box<Spanned<TStmt>>>,
        body: Box<Spanned<TStmt>>,
    },

    Return {
        expr: Option<Spanned<TExpr>>,
    },

    Empty,
}

#[derive(Clone, Debug)]
pub struct TParameter {
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct TFunction {
    pub name: String,
    pub parameters: Vec<TParameter>,
    pub return_type: Type,
    /// `None` for forward declarations
    pub body: Option<Vec<Spanned<TStmt>>>,
    pub span: Span,
}

/// A global variable declaration from the top-level scope
#[derive(Clone, Debug)]
pub struct TGlobal {
    pub name: String,
    pub ty: Type,
    pub init: Option<Spanned<TExpr>>,
}

#[derive(Clone, Debug, Default)]
pub struct TProgram {
    pub globals: Vec<Spanned<TGlobal>>,
    pub functions: Vec<TFunction>,
}
