//! Statement lowering from typed AST to IR
//!
//! This module converts typed statements (`TStmt`) into IR instructions.
//! Structured control flow becomes labels and jumps here; nothing after this
//! point knows about loops or branches.

use crate::backend::ir::{InstrKind, Label, UnaryOp, Value, Variable};
use crate::backend::lower::context::LoweringContext;
use crate::backend::lower::expr::{
    binary_op, emit_binary, lower_call, lower_expr, lower_place, read_place, write_place,
};
use crate::common::ast::BinOp;
use crate::common::span::{Span, Spanned};
use crate::common::tast::{TExpr, TStmt};
use crate::common::types::Type;
use crate::error::Result;

/// Lower a statement to IR
pub fn lower_stmt(ctx: &mut LoweringContext, stmt: &Spanned<TStmt>) -> Result<()> {
    let span = stmt.1;
    match &stmt.0 {
        TStmt::Decl { var, value } => {
            if let Some(value) = value {
                let src = lower_expr(ctx, value)?;
                ctx.emit(InstrKind::Copy {
                    dst: Variable::from(var),
                    src,
                });
            }
        }

        TStmt::Assignment { lhs, rhs } => {
            let place = lower_place(ctx, lhs)?;
            let value = lower_expr(ctx, rhs)?;
            write_place(ctx, &place, value);
        }

        TStmt::CompoundAssignment { op, lhs, rhs } => {
            lower_compound_assignment(ctx, *op, lhs, rhs, span)?;
        }

        TStmt::Expr(expr) => {
            // Evaluated for side effects; a void call is fine here
            match &expr.0 {
                TExpr::Call {
                    func_name,
                    args,
                    ty,
                } => {
                    lower_call(ctx, func_name, args, *ty)?;
                }
                _ => {
                    lower_expr(ctx, expr)?;
                }
            }
        }

        TStmt::Block(stmts) => lower_stmts(ctx, stmts)?,

        TStmt::If {
            cond,
            then_branch,
            else_branch,
        } => lower_if(ctx, cond, then_branch, else_branch.as_deref())?,

        TStmt::While { cond, body } => lower_while(ctx, cond, body)?,

        TStmt::Until { cond, body } => lower_until(ctx, cond, body)?,

        TStmt::For {
            init,
            cond,
            step,
            body,
        } => lower_for(ctx, init.as_deref(), cond.as_ref(), step.as_deref(), body)?,

        TStmt::Return { expr } => {
            match ctx.current_function() {
                None => return Err(ctx.malformed(span, "return outside a function")),
                Some(func) if expr.is_some() && func.return_type.is_void() => {
                    let message = format!("void function `{}` returns a value", func.name);
                    return Err(ctx.malformed(span, message));
                }
                Some(_) => {}
            }
            let value = expr.as_ref().map(|e| lower_expr(ctx, e)).transpose()?;
            ctx.emit_return(value);
        }

        TStmt::Empty => {}
    }

    Ok(())
}

/// Lower a sequence of statements
pub fn lower_stmts(ctx: &mut LoweringContext, stmts: &[Spanned<TStmt>]) -> Result<()> {
    for stmt in stmts {
        lower_stmt(ctx, stmt)?;
    }
    Ok(())
}

/// `lhs op= rhs` becomes the operation into a temporary followed by a plain
/// assignment
fn lower_compound_assignment(
    ctx: &mut LoweringContext,
    op: BinOp,
    lhs: &Spanned<TExpr>,
    rhs: &Spanned<TExpr>,
    span: Span,
) -> Result<()> {
    let Some(ir_op) = binary_op(op) else {
        return Err(ctx.malformed(span, format!("`{}=` is not an assignment operator", op)));
    };

    let ty = *lhs.0.get_type();
    let place = lower_place(ctx, lhs)?;
    let current = read_place(ctx, &place, ty);
    let value = lower_expr(ctx, rhs)?;
    let result = emit_binary(ctx, ir_op, current, value, ty);
    write_place(ctx, &place, Value::Var(result));
    Ok(())
}

/// Emit `t = !cond; if t goto target`
fn jump_unless(ctx: &mut LoweringContext, cond: &Spanned<TExpr>, target: &Label) -> Result<()> {
    let value = lower_expr(ctx, cond)?;
    let negated = ctx.temp(Type::LONG);
    ctx.emit(InstrKind::Unary {
        result: negated.clone(),
        op: UnaryOp::LogicalNot,
        operand: value,
    });
    ctx.emit(InstrKind::CondJump {
        cond: Value::Var(negated),
        target: target.clone(),
    });
    Ok(())
}

/// ```text
/// if cond goto Ltrue
/// <else>
/// goto Lafter
/// Ltrue:
/// <then>
/// Lafter:
/// ```
fn lower_if(
    ctx: &mut LoweringContext,
    cond: &Spanned<TExpr>,
    then_branch: &Spanned<TStmt>,
    else_branch: Option<&Spanned<TStmt>>,
) -> Result<()> {
    let on_true = ctx.autolabel();
    let after = ctx.autolabel();

    let cond = lower_expr(ctx, cond)?;
    ctx.emit(InstrKind::CondJump {
        cond,
        target: on_true.clone(),
    });

    if let Some(else_branch) = else_branch {
        lower_stmt(ctx, else_branch)?;
    }
    ctx.emit(InstrKind::Goto {
        target: after.clone(),
    });

    ctx.place_label(on_true);
    lower_stmt(ctx, then_branch)?;
    ctx.place_label(after);

    Ok(())
}

/// ```text
/// Ltop:
/// t = !cond
/// if t goto Lexit
/// <body>
/// goto Ltop
/// Lexit:
/// ```
fn lower_while(ctx: &mut LoweringContext, cond: &Spanned<TExpr>, body: &Spanned<TStmt>) -> Result<()> {
    let top = ctx.autolabel();
    let exit = ctx.autolabel();

    ctx.place_label(top.clone());
    jump_unless(ctx, cond, &exit)?;
    lower_stmt(ctx, body)?;
    ctx.emit(InstrKind::Goto { target: top });
    ctx.place_label(exit);

    Ok(())
}

/// Runs the body while the condition is false
///
/// ```text
/// Ltop:
/// if cond goto Lexit
/// <body>
/// goto Ltop
/// Lexit:
/// ```
fn lower_until(ctx: &mut LoweringContext, cond: &Spanned<TExpr>, body: &Spanned<TStmt>) -> Result<()> {
    let top = ctx.autolabel();
    let exit = ctx.autolabel();

    ctx.place_label(top.clone());
    let cond = lower_expr(ctx, cond)?;
    ctx.emit(InstrKind::CondJump {
        cond,
        target: exit.clone(),
    });
    lower_stmt(ctx, body)?;
    ctx.emit(InstrKind::Goto { target: top });
    ctx.place_label(exit);

    Ok(())
}

/// ```text
/// <init>
/// Ltop:
/// t = !cond        (only with a condition)
/// if t goto Lexit
/// <body>
/// <step>
/// goto Ltop
/// Lexit:
/// ```
fn lower_for(
    ctx: &mut LoweringContext,
    init: Option<&Spanned<TStmt>>,
    cond: Option<&Spanned<TExpr>>,
    step: Option<&Spanned<TStmt>>,
    body: &Spanned<TStmt>,
) -> Result<()> {
    if let Some(init) = init {
        lower_stmt(ctx, init)?;
    }

    let top = ctx.autolabel();
    let exit = ctx.autolabel();

    ctx.place_label(top.clone());
    if let Some(cond) = cond {
        jump_unless(ctx, cond, &exit)?;
    }
    lower_stmt(ctx, body)?;
    if let Some(step) = step {
        lower_stmt(ctx, step)?;
    }
    ctx.emit(InstrKind::Goto { target: top });
    ctx.place_label(exit);

    Ok(())
}
