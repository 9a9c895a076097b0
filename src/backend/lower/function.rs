//! Function and global lowering
//!
//! Globals become plain copies of folded constants at the front of the
//! store; each function with a body becomes its labeled entry followed by
//! the lowered statements.

use crate::backend::ir::{InstrKind, Value, Variable};
use crate::backend::lower::context::LoweringContext;
use crate::backend::lower::expr::fold_constant;
use crate::backend::lower::stmt::lower_stmts;
use crate::common::span::Spanned;
use crate::common::tast::{TFunction, TGlobal};
use crate::error::{CompileError, Result};
use tracing::debug;

/// Lower a global declaration to `name.g = <constant>`
pub fn lower_global(ctx: &mut LoweringContext, global: &Spanned<TGlobal>) -> Result<()> {
    let (global, span) = global;

    let value = match &global.init {
        None => 0,
        Some((init, _)) => fold_constant(init).ok_or_else(|| CompileError::NonConstantGlobal {
            name: global.name.clone(),
            line: span.line,
        })?,
    };

    ctx.emit(InstrKind::Copy {
        dst: Variable::global(global.name.clone(), global.ty),
        src: Value::Lit(value),
    });
    Ok(())
}

/// Lower a typed function; forward declarations produce nothing
pub fn lower_function(ctx: &mut LoweringContext, func: &TFunction) -> Result<()> {
    let Some(body) = &func.body else {
        return Ok(());
    };

    let params = func
        .parameters
        .iter()
        .map(|p| Variable::param(p.name.clone(), p.ty))
        .collect();

    ctx.begin_function(&func.name, func.return_type, params);
    lower_stmts(ctx, body)?;
    ctx.finish_function();

    debug!(
        function = %func.name,
        instructions = ctx.function_len(),
        "lowered function"
    );
    Ok(())
}
