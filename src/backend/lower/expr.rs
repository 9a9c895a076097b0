//! Expression lowering from typed AST to IR
//!
//! This module converts typed expressions (`TExpr`) into sequences of
//! three-address instructions, returning the value holding the result.
//! Literals and variable references emit nothing; every operator result
//! lands in a fresh temporary.

use crate::backend::ir::{BinaryOp, InstrKind, UnaryOp, Value, Variable};
use crate::backend::lower::context::LoweringContext;
use crate::common::ast::{BinOp as AstBinOp, UnaryOp as AstUnaryOp};
use crate::common::span::{Span, Spanned};
use crate::common::tast::TExpr;
use crate::common::types::Type;
use crate::error::Result;

/// An assignable location
#[derive(Clone, Debug)]
pub enum Place {
    /// A named variable
    Var(Variable),
    /// The word a pointer variable points at
    Deref(Variable),
}

/// Lower a typed expression to IR instructions
///
/// Returns the value holding the result.
pub fn lower_expr(ctx: &mut LoweringContext, expr: &Spanned<TExpr>) -> Result<Value> {
    let span = expr.1;
    match &expr.0 {
        TExpr::Error { .. } => Err(ctx.malformed(span, "error node reached lowering")),

        TExpr::Literal { value, .. } => Ok(Value::Lit(*value)),

        TExpr::Variable(var) => Ok(Value::Var(Variable::from(var))),

        TExpr::BinOp { op, lhs, rhs, ty } => lower_binop(ctx, *op, lhs, rhs, *ty),

        TExpr::UnaryOp { op, operand, ty } => lower_unaryop(ctx, *op, operand, *ty, span),

        TExpr::Call {
            func_name,
            args,
            ty,
        } => lower_call(ctx, func_name, args, *ty)?
            .ok_or_else(|| ctx.malformed(span, format!("void call to `{}` used as a value", func_name))),
    }
}

/// Lower a call; `None` when the callee returns void
pub fn lower_call(
    ctx: &mut LoweringContext,
    func_name: &str,
    args: &[Spanned<TExpr>],
    ty: Type,
) -> Result<Option<Value>> {
    let args = args
        .iter()
        .map(|arg| lower_expr(ctx, arg))
        .collect::<Result<Vec<_>>>()?;

    if ty.is_void() {
        ctx.emit(InstrKind::ProcCall {
            callee: func_name.to_string(),
            args,
        });
        return Ok(None);
    }

    let result = ctx.temp(ty);
    ctx.emit(InstrKind::Call {
        result: result.clone(),
        callee: func_name.to_string(),
        args,
    });
    Ok(Some(Value::Var(result)))
}

/// Literals that do not fit a sign-extended 32-bit immediate go through a
/// temporary first
pub fn immediate(ctx: &mut LoweringContext, value: Value) -> Value {
    match value {
        Value::Lit(n) if i32::try_from(n).is_err() => {
            let tmp = ctx.temp(Type::LONG);
            ctx.emit(InstrKind::Copy {
                dst: tmp.clone(),
                src: Value::Lit(n),
            });
            Value::Var(tmp)
        }
        other => other,
    }
}

/// Make a value addressable as a pointer variable
fn pointer_var(ctx: &mut LoweringContext, value: Value, ty: Type) -> Variable {
    match value {
        Value::Var(var) => var,
        lit => {
            let tmp = ctx.temp(ty);
            ctx.emit(InstrKind::Copy {
                dst: tmp.clone(),
                src: lit,
            });
            tmp
        }
    }
}

/// Map an arithmetic AST operator onto its IR form; `None` for `&&`/`||`
pub fn binary_op(op: AstBinOp) -> Option<BinaryOp> {
    let op = match op {
        AstBinOp::Add => BinaryOp::Add,
        AstBinOp::Sub => BinaryOp::Sub,
        AstBinOp::Mul => BinaryOp::Mul,
        AstBinOp::Div => BinaryOp::Div,
        AstBinOp::Mod => BinaryOp::Mod,
        AstBinOp::BitAnd => BinaryOp::And,
        AstBinOp::BitOr => BinaryOp::Or,
        AstBinOp::Xor => BinaryOp::Xor,
        AstBinOp::Lt => BinaryOp::Lt,
        AstBinOp::Gt => BinaryOp::Gt,
        AstBinOp::Lte => BinaryOp::Le,
        AstBinOp::Gte => BinaryOp::Ge,
        AstBinOp::Eq => BinaryOp::Eq,
        AstBinOp::NotEq => BinaryOp::Ne,
        AstBinOp::And | AstBinOp::Or => return None,
    };
    Some(op)
}

/// Emit `result = left op right` into a fresh temporary
pub fn emit_binary(
    ctx: &mut LoweringContext,
    op: BinaryOp,
    left: Value,
    right: Value,
    ty: Type,
) -> Variable {
    let left = immediate(ctx, left);
    let right = immediate(ctx, right);
    let result = ctx.temp(ty);
    ctx.emit(InstrKind::Binary {
        result: result.clone(),
        op,
        left,
        right,
    });
    result
}

/// Lower a binary operation
fn lower_binop(
    ctx: &mut LoweringContext,
    op: AstBinOp,
    lhs: &Spanned<TExpr>,
    rhs: &Spanned<TExpr>,
    ty: Type,
) -> Result<Value> {
    match binary_op(op) {
        Some(ir_op) => {
            let left = lower_expr(ctx, lhs)?;
            let right = lower_expr(ctx, rhs)?;
            Ok(Value::Var(emit_binary(ctx, ir_op, left, right, ty)))
        }
        None if op == AstBinOp::And => lower_and(ctx, lhs, rhs, ty),
        None => lower_or(ctx, lhs, rhs, ty),
    }
}

/// `a && b`
///
/// ```text
/// res = 0
/// if a goto Leval
/// goto Lafter
/// Leval:
/// if b goto Ltrue
/// goto Lafter
/// Ltrue:
/// res = 1
/// Lafter:
/// ```
fn lower_and(
    ctx: &mut LoweringContext,
    lhs: &Spanned<TExpr>,
    rhs: &Spanned<TExpr>,
    ty: Type,
) -> Result<Value> {
    let result = ctx.temp(ty);
    let eval_rhs = ctx.autolabel();
    let is_true = ctx.autolabel();
    let after = ctx.autolabel();

    ctx.emit(InstrKind::Copy {
        dst: result.clone(),
        src: Value::Lit(0),
    });

    let left = lower_expr(ctx, lhs)?;
    ctx.emit(InstrKind::CondJump {
        cond: left,
        target: eval_rhs.clone(),
    });
    ctx.emit(InstrKind::Goto {
        target: after.clone(),
    });

    ctx.place_label(eval_rhs);
    let right = lower_expr(ctx, rhs)?;
    ctx.emit(InstrKind::CondJump {
        cond: right,
        target: is_true.clone(),
    });
    ctx.emit(InstrKind::Goto {
        target: after.clone(),
    });

    ctx.place_label(is_true);
    ctx.emit(InstrKind::Copy {
        dst: result.clone(),
        src: Value::Lit(1),
    });
    ctx.place_label(after);

    Ok(Value::Var(result))
}

/// `a || b`
///
/// ```text
/// res = 1
/// if a goto Lafter
/// if b goto Lafter
/// res = 0
/// Lafter:
/// ```
fn lower_or(
    ctx: &mut LoweringContext,
    lhs: &Spanned<TExpr>,
    rhs: &Spanned<TExpr>,
    ty: Type,
) -> Result<Value> {
    let result = ctx.temp(ty);
    let after = ctx.autolabel();

    ctx.emit(InstrKind::Copy {
        dst: result.clone(),
        src: Value::Lit(1),
    });

    let left = lower_expr(ctx, lhs)?;
    ctx.emit(InstrKind::CondJump {
        cond: left,
        target: after.clone(),
    });

    let right = lower_expr(ctx, rhs)?;
    ctx.emit(InstrKind::CondJump {
        cond: right,
        target: after.clone(),
    });

    ctx.emit(InstrKind::Copy {
        dst: result.clone(),
        src: Value::Lit(0),
    });
    ctx.place_label(after);

    Ok(Value::Var(result))
}

/// Lower a unary operation
fn lower_unaryop(
    ctx: &mut LoweringContext,
    op: AstUnaryOp,
    operand: &Spanned<TExpr>,
    ty: Type,
    span: Span,
) -> Result<Value> {
    let ir_op = match op {
        AstUnaryOp::Neg => UnaryOp::Negate,
        AstUnaryOp::Not => UnaryOp::LogicalNot,
        AstUnaryOp::BitNot => UnaryOp::BitNot,
        AstUnaryOp::Cast => UnaryOp::Cast,

        AstUnaryOp::AddrOf => {
            let TExpr::Variable(var) = &operand.0 else {
                return Err(ctx.malformed(span, "`&` applied to something other than a variable"));
            };
            let result = ctx.temp(ty);
            ctx.emit(InstrKind::AssignRef {
                dst: result.clone(),
                src: Variable::from(var),
            });
            return Ok(Value::Var(result));
        }

        AstUnaryOp::Deref => {
            let pointer = lower_expr(ctx, operand)?;
            let result = ctx.temp(ty);
            ctx.emit(InstrKind::AssignDeref {
                dst: result.clone(),
                src: pointer,
            });
            return Ok(Value::Var(result));
        }

        AstUnaryOp::PreIncrement | AstUnaryOp::PreDecrement => {
            let step = if op == AstUnaryOp::PreIncrement {
                BinaryOp::Add
            } else {
                BinaryOp::Sub
            };
            let place = lower_place(ctx, operand)?;
            let current = read_place(ctx, &place, ty);
            let updated = emit_binary(ctx, step, current, Value::Lit(1), ty);
            write_place(ctx, &place, Value::Var(updated.clone()));
            return Ok(match place {
                Place::Var(var) => Value::Var(var),
                Place::Deref(_) => Value::Var(updated),
            });
        }
    };

    let operand = lower_expr(ctx, operand)?;
    let result = ctx.temp(ty);
    ctx.emit(InstrKind::Unary {
        result: result.clone(),
        op: ir_op,
        operand,
    });
    Ok(Value::Var(result))
}

// ============================================================================
// Places
// ============================================================================

/// Resolve an assignment target
pub fn lower_place(ctx: &mut LoweringContext, expr: &Spanned<TExpr>) -> Result<Place> {
    match &expr.0 {
        TExpr::Variable(var) => Ok(Place::Var(Variable::from(var))),
        TExpr::UnaryOp {
            op: AstUnaryOp::Deref,
            operand,
            ..
        } => {
            let pointer = lower_expr(ctx, operand)?;
            let ty = *operand.0.get_type();
            Ok(Place::Deref(pointer_var(ctx, pointer, ty)))
        }
        _ => Err(ctx.malformed(expr.1, "assignment to something that is not an lvalue")),
    }
}

/// Current contents of a place
pub fn read_place(ctx: &mut LoweringContext, place: &Place, ty: Type) -> Value {
    match place {
        Place::Var(var) => Value::Var(var.clone()),
        Place::Deref(pointer) => {
            let result = ctx.temp(ty);
            ctx.emit(InstrKind::AssignDeref {
                dst: result.clone(),
                src: Value::Var(pointer.clone()),
            });
            Value::Var(result)
        }
    }
}

/// Store a value into a place
pub fn write_place(ctx: &mut LoweringContext, place: &Place, value: Value) {
    match place {
        Place::Var(var) => {
            ctx.emit(InstrKind::Copy {
                dst: var.clone(),
                src: value,
            });
        }
        Place::Deref(pointer) => {
            let src = immediate(ctx, value);
            ctx.emit(InstrKind::DerefAssign {
                dst: pointer.clone(),
                src,
            });
        }
    }
}

// ============================================================================
// Constant folding
// ============================================================================

/// Evaluate an expression built only from constants
///
/// Used for global initializers, which must be known at load time.
pub fn fold_constant(expr: &TExpr) -> Option<i64> {
    match expr {
        TExpr::Literal { value, .. } => Some(*value),

        TExpr::UnaryOp { op, operand, .. } => {
            let value = fold_constant(&operand.0)?;
            match op {
                AstUnaryOp::Neg => Some(value.wrapping_neg()),
                AstUnaryOp::BitNot => Some(!value),
                AstUnaryOp::Not => Some((value == 0) as i64),
                AstUnaryOp::Cast => Some(value),
                _ => None,
            }
        }

        TExpr::BinOp { op, lhs, rhs, .. } => {
            let left = fold_constant(&lhs.0)?;
            let right = fold_constant(&rhs.0)?;
            match (op, binary_op(*op)) {
                (_, Some(ir_op)) => ir_op.fold(left, right),
                (AstBinOp::And, None) => Some((left != 0 && right != 0) as i64),
                (_, None) => Some((left != 0 || right != 0) as i64),
            }
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::span::Span;

    fn lit(value: i64) -> Box<Spanned<TExpr>> {
        Box::new((
            TExpr::Literal {
                value,
                ty: Type::LONG,
            },
            Span::new(1),
        ))
    }

    #[test]
    fn test_fold_nested_arithmetic() {
        // -(2 + 3) * 4
        let sum = TExpr::BinOp {
            op: AstBinOp::Add,
            lhs: lit(2),
            rhs: lit(3),
            ty: Type::LONG,
        };
        let neg = TExpr::UnaryOp {
            op: AstUnaryOp::Neg,
            operand: Box::new((sum, Span::new(1))),
            ty: Type::LONG,
        };
        let expr = TExpr::BinOp {
            op: AstBinOp::Mul,
            lhs: Box::new((neg, Span::new(1))),
            rhs: lit(4),
            ty: Type::LONG,
        };
        assert_eq!(fold_constant(&expr), Some(-20));
    }

    #[test]
    fn test_fold_rejects_division_by_zero() {
        let expr = TExpr::BinOp {
            op: AstBinOp::Div,
            lhs: lit(1),
            rhs: lit(0),
            ty: Type::LONG,
        };
        assert_eq!(fold_constant(&expr), None);
    }

    #[test]
    fn test_wide_literal_goes_through_temporary() {
        let mut ctx = LoweringContext::new();
        let narrow = immediate(&mut ctx, Value::Lit(7));
        assert_eq!(narrow, Value::Lit(7));
        assert!(ctx.program.is_empty());

        let wide = immediate(&mut ctx, Value::Lit(1 << 40));
        assert!(matches!(wide, Value::Var(ref v) if v.is_temp()));
        assert_eq!(ctx.program.dump(), ".t0.l = 1099511627776\n");
    }
}
