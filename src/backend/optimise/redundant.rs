//! Redundant Assignment Elision
//!
//! Lowering puts every operator result in a fresh temporary, so a statement
//! like `r = a + b` comes out as
//!
//! ```text
//! .t0.l = a.l + b.l
//! r.l = .t0.l
//! ```
//!
//! This pass retargets the producer to write `r` directly and drops the copy.
//!
//! # Rule
//!
//! A copy `dst = t` is removed when:
//! - it carries no label (something may jump to it)
//! - `t` is a compiler temporary
//! - the previous live instruction is a unary or binary op producing `t`
//!
//! After a rewrite the producer becomes the previous instruction again, so
//! the next copy is checked against it.

use crate::backend::ir::{InstrId, InstrKind, IrProgram, Value};

/// Apply the elision to the whole program
///
/// Returns the number of copies removed
pub fn elide_redundant_assignments(program: &mut IrProgram) -> usize {
    let mut removed = 0;
    let mut previous: Option<InstrId> = None;

    for id in program.live_ids() {
        if let Some(producer) = previous
            && try_elide(program, producer, id)
        {
            removed += 1;
            continue;
        }
        previous = Some(id);
    }

    removed
}

/// Rewrite `producer; copy` if the pair matches; returns true on success
fn try_elide(program: &mut IrProgram, producer: InstrId, copy: InstrId) -> bool {
    let dst = match program.get(copy) {
        Some(instr) if instr.label.is_none() => match &instr.kind {
            InstrKind::Copy {
                dst,
                src: Value::Var(src),
            } if src.is_temp() => {
                let produced = program.get(producer).and_then(|p| p.arithmetic_result());
                if produced != Some(src) {
                    return false;
                }
                dst.clone()
            }
            _ => return false,
        },
        _ => return false,
    };

    if let Some(result) = program
        .get_mut(producer)
        .and_then(|p| p.arithmetic_result_mut())
    {
        *result = dst;
    }
    program.remove(copy);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ir::{BinaryOp, Instr, Label, Variable};
    use crate::common::types::Type;

    fn var(name: &str) -> Variable {
        Variable::local(name, Type::LONG)
    }

    fn binary(result: &str, op: BinaryOp, left: &str, right: &str) -> Instr {
        Instr::new(InstrKind::Binary {
            result: var(result),
            op,
            left: Value::Var(var(left)),
            right: Value::Var(var(right)),
        })
    }

    fn copy(dst: &str, src: &str) -> Instr {
        Instr::new(InstrKind::Copy {
            dst: var(dst),
            src: Value::Var(var(src)),
        })
    }

    #[test]
    fn test_intermediate_temporary_is_eliminated() {
        // .t1 = b * c; .t2 = a + .t1; result = .t2
        let mut program = IrProgram::new();
        program.push(binary(".t1", BinaryOp::Mul, "b", "c"));
        program.push(binary(".t2", BinaryOp::Add, "a", ".t1"));
        program.push(copy("result", ".t2"));

        assert_eq!(elide_redundant_assignments(&mut program), 1);
        assert_eq!(
            program.dump(),
            ".t1.l = b.l * c.l\nresult.l = a.l + .t1.l\n"
        );
    }

    #[test]
    fn test_labeled_copy_is_kept() {
        let mut program = IrProgram::new();
        program.push(binary(".t0", BinaryOp::Add, "a", "b"));
        let mut labeled = copy("x", ".t0");
        labeled.label = Some(Label::Local(3));
        program.push(labeled);

        assert_eq!(elide_redundant_assignments(&mut program), 0);
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_named_source_is_kept() {
        // y = a + b; z = y   must keep writing y
        let mut program = IrProgram::new();
        program.push(binary("y", BinaryOp::Add, "a", "b"));
        program.push(copy("z", "y"));

        assert_eq!(elide_redundant_assignments(&mut program), 0);
    }

    #[test]
    fn test_copy_of_other_temporary_is_kept() {
        let mut program = IrProgram::new();
        program.push(binary(".t0", BinaryOp::Add, "a", "b"));
        program.push(copy("x", ".t9"));

        assert_eq!(elide_redundant_assignments(&mut program), 0);
    }

    #[test]
    fn test_producer_stays_previous_after_rewrite() {
        // Two statements back to back: each copy pairs with its own producer
        let mut program = IrProgram::new();
        program.push(binary(".t0", BinaryOp::Add, "a", "b"));
        program.push(copy("x", ".t0"));
        program.push(binary(".t1", BinaryOp::Sub, "x", "c"));
        program.push(copy("y", ".t1"));

        assert_eq!(elide_redundant_assignments(&mut program), 2);
        assert_eq!(program.dump(), "x.l = a.l + b.l\ny.l = x.l - c.l\n");
    }
}
