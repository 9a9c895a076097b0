//! Tests for typed AST to IR lowering

use crate::backend::ir::InstrKind;
use crate::backend::lower::lower_program;
use crate::common::ast::{BinOp, UnaryOp};
use crate::common::span::{Span, Spanned};
use crate::common::tast::{TExpr, TFunction, TGlobal, TParameter, TProgram, TStmt, VarRef};
use crate::common::types::Type;
use crate::error::CompileError;

/// Helper to create a spanned value with a dummy span
fn spanned<T>(value: T) -> Spanned<T> {
    (value, Span::new(1))
}

fn lit(value: i64) -> Spanned<TExpr> {
    spanned(TExpr::Literal {
        value,
        ty: Type::INT,
    })
}

fn local(name: &str) -> Spanned<TExpr> {
    spanned(TExpr::Variable(VarRef::local(name, Type::INT)))
}

fn param(name: &str) -> Spanned<TExpr> {
    spanned(TExpr::Variable(VarRef::param(name, Type::INT)))
}

fn binop(op: BinOp, lhs: Spanned<TExpr>, rhs: Spanned<TExpr>) -> Spanned<TExpr> {
    spanned(TExpr::BinOp {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        ty: Type::INT,
    })
}

fn assign(lhs: Spanned<TExpr>, rhs: Spanned<TExpr>) -> Spanned<TStmt> {
    spanned(TStmt::Assignment { lhs, rhs })
}

fn make_test_function(
    name: &str,
    params: &[&str],
    return_type: Type,
    body: Vec<Spanned<TStmt>>,
) -> TFunction {
    TFunction {
        name: name.to_string(),
        parameters: params
            .iter()
            .map(|p| TParameter {
                name: p.to_string(),
                ty: Type::INT,
            })
            .collect(),
        return_type,
        body: Some(body),
        span: Span::new(1),
    }
}

fn program_of(functions: Vec<TFunction>) -> TProgram {
    TProgram {
        globals: vec![],
        functions,
    }
}

fn lower_dump(functions: Vec<TFunction>) -> String {
    lower_program(&program_of(functions))
        .expect("lowering should succeed")
        .dump()
}

/// int add(int a, int b) { return a + b; }
#[test]
fn test_lower_add_function() {
    let func = make_test_function(
        "add",
        &["a", "b"],
        Type::INT,
        vec![spanned(TStmt::Return {
            expr: Some(binop(BinOp::Add, param("a"), param("b"))),
        })],
    );

    let ir = lower_program(&program_of(vec![func])).unwrap();
    assert_eq!(ir.dump(), "fn.add:\n.t0.l = a.p + b.p\nreturn .t0.l\n");

    let binaries = ir
        .iter()
        .filter(|i| matches!(i.kind, InstrKind::Binary { .. }))
        .count();
    let returns = ir
        .iter()
        .filter(|i| matches!(i.kind, InstrKind::Return { .. }))
        .count();
    assert_eq!((binaries, returns), (1, 1));

    let info = ir.function("add").unwrap();
    let names: Vec<String> = info.params.iter().map(|p| p.to_string()).collect();
    assert_eq!(names, vec!["a.p", "b.p"]);
}

/// if (x) y = 1; else y = 2;
#[test]
fn test_if_else_shape() {
    let func = make_test_function(
        "f",
        &["x"],
        Type::VOID,
        vec![spanned(TStmt::If {
            cond: param("x"),
            then_branch: Box::new(assign(local("y"), lit(1))),
            else_branch: Some(Box::new(assign(local("y"), lit(2)))),
        })],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         if x.p goto L.0\n\
         y.l = 2\n\
         goto L.1\n\
         L.0:\n\
         y.l = 1\n\
         L.1:\n\
         return\n"
    );
}

/// while (i < 10) i = i + 1;
#[test]
fn test_while_shape() {
    let func = make_test_function(
        "f",
        &[],
        Type::VOID,
        vec![spanned(TStmt::While {
            cond: binop(BinOp::Lt, local("i"), lit(10)),
            body: Box::new(assign(local("i"), binop(BinOp::Add, local("i"), lit(1)))),
        })],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         L.0:\n\
         .t0.l = i.l < 10\n\
         .t1.l = !.t0.l\n\
         if .t1.l goto L.1\n\
         i.l = i.l + 1\n\
         goto L.0\n\
         L.1:\n\
         return\n"
    );
}

/// until (done) work();
#[test]
fn test_until_shape() {
    let func = make_test_function(
        "f",
        &[],
        Type::VOID,
        vec![spanned(TStmt::Until {
            cond: local("done"),
            body: Box::new(spanned(TStmt::Expr(spanned(TExpr::Call {
                func_name: "work".to_string(),
                args: vec![],
                ty: Type::VOID,
            })))),
        })],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         L.0:\n\
         if done.l goto L.1\n\
         call fn.work\n\
         goto L.0\n\
         L.1:\n\
         return\n"
    );
}

/// for (i = 0; i < n; i += 1) s = s + i;
#[test]
fn test_for_shape() {
    let func = make_test_function(
        "f",
        &["n"],
        Type::VOID,
        vec![spanned(TStmt::For {
            init: Some(Box::new(assign(local("i"), lit(0)))),
            cond: Some(binop(BinOp::Lt, local("i"), param("n"))),
            step: Some(Box::new(spanned(TStmt::CompoundAssignment {
                op: BinOp::Add,
                lhs: local("i"),
                rhs: lit(1),
            }))),
            body: Box::new(assign(local("s"), binop(BinOp::Add, local("s"), local("i")))),
        })],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         i.l = 0\n\
         L.0:\n\
         .t0.l = i.l < n.p\n\
         .t1.l = !.t0.l\n\
         if .t1.l goto L.1\n\
         s.l = s.l + i.l\n\
         i.l = i.l + 1\n\
         goto L.0\n\
         L.1:\n\
         return\n"
    );
}

/// r = a && b;
#[test]
fn test_short_circuit_and() {
    let func = make_test_function(
        "f",
        &["a", "b"],
        Type::VOID,
        vec![assign(local("r"), binop(BinOp::And, param("a"), param("b")))],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         .t0.l = 0\n\
         if a.p goto L.0\n\
         goto L.2\n\
         L.0:\n\
         if b.p goto L.1\n\
         goto L.2\n\
         L.1:\n\
         .t0.l = 1\n\
         L.2:\n\
         r.l = .t0.l\n\
         return\n"
    );
}

/// r = a || b;
#[test]
fn test_short_circuit_or() {
    let func = make_test_function(
        "f",
        &["a", "b"],
        Type::VOID,
        vec![assign(local("r"), binop(BinOp::Or, param("a"), param("b")))],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         .t0.l = 1\n\
         if a.p goto L.0\n\
         if b.p goto L.0\n\
         .t0.l = 0\n\
         L.0:\n\
         r.l = .t0.l\n\
         return\n"
    );
}

#[test]
fn test_rhs_of_and_is_lowered_after_the_jump() {
    // a && (b + 1): the add must come after the jump on `a`
    let func = make_test_function(
        "f",
        &["a", "b"],
        Type::VOID,
        vec![assign(
            local("r"),
            binop(BinOp::And, param("a"), binop(BinOp::Add, param("b"), lit(1))),
        )],
    );

    let ir = lower_program(&program_of(vec![func])).unwrap();
    let instrs = ir.compact();
    let first_jump = instrs
        .iter()
        .position(|i| matches!(i.kind, InstrKind::CondJump { .. }))
        .unwrap();
    let add = instrs
        .iter()
        .position(|i| matches!(i.kind, InstrKind::Binary { .. }))
        .unwrap();
    assert!(first_jump < add);
}

#[test]
fn test_earlier_returns_are_demoted() {
    let func = make_test_function(
        "f",
        &["x"],
        Type::INT,
        vec![spanned(TStmt::If {
            cond: param("x"),
            then_branch: Box::new(spanned(TStmt::Return { expr: Some(lit(1)) })),
            else_branch: Some(Box::new(spanned(TStmt::Return { expr: Some(lit(2)) }))),
        })],
    );

    let ir = lower_program(&program_of(vec![func])).unwrap();
    let flags: Vec<bool> = ir
        .iter()
        .filter_map(|i| match i.kind {
            InstrKind::Return { is_last, .. } => Some(is_last),
            _ => None,
        })
        .collect();
    // Two explicit returns plus the implicit one after the join label
    assert_eq!(flags, vec![false, false, true]);
}

#[test]
fn test_no_implicit_return_after_trailing_return() {
    let func = make_test_function(
        "main",
        &[],
        Type::INT,
        vec![spanned(TStmt::Return { expr: Some(lit(0)) })],
    );
    assert_eq!(lower_dump(vec![func]), "fn.main:\nreturn 0\n");
}

#[test]
fn test_forward_declaration_emits_nothing() {
    let mut decl = make_test_function("ext", &["a"], Type::INT, vec![]);
    decl.body = None;

    let ir = lower_program(&program_of(vec![decl])).unwrap();
    assert!(ir.is_empty());
    assert!(ir.function("ext").is_none());
}

#[test]
fn test_globals_are_folded_and_come_first() {
    let program = TProgram {
        globals: vec![
            spanned(TGlobal {
                name: "x".to_string(),
                ty: Type::INT,
                init: Some(binop(BinOp::Add, binop(BinOp::Mul, lit(2), lit(3)), lit(1))),
            }),
            spanned(TGlobal {
                name: "y".to_string(),
                ty: Type::INT,
                init: None,
            }),
        ],
        functions: vec![make_test_function(
            "main",
            &[],
            Type::INT,
            vec![spanned(TStmt::Return { expr: Some(lit(0)) })],
        )],
    };

    let ir = lower_program(&program).unwrap();
    assert_eq!(ir.dump(), "x.g = 7\ny.g = 0\nfn.main:\nreturn 0\n");
}

#[test]
fn test_non_constant_global_is_rejected() {
    let program = TProgram {
        globals: vec![(
            TGlobal {
                name: "x".to_string(),
                ty: Type::INT,
                init: Some(local("y")),
            },
            Span::new(4),
        )],
        functions: vec![],
    };

    let err = lower_program(&program).unwrap_err();
    assert!(matches!(
        err,
        CompileError::NonConstantGlobal { ref name, line: 4 } if name == "x"
    ));
}

#[test]
fn test_pre_increment_updates_in_place() {
    let func = make_test_function(
        "f",
        &[],
        Type::VOID,
        vec![spanned(TStmt::Expr(spanned(TExpr::UnaryOp {
            op: UnaryOp::PreIncrement,
            operand: Box::new(local("x")),
            ty: Type::INT,
        })))],
    );

    assert_eq!(lower_dump(vec![func]), "fn.f:\nx.l = x.l + 1\nreturn\n");
}

#[test]
fn test_compound_assignment_through_pointer() {
    let pointer = spanned(TExpr::Variable(VarRef::local("p", Type::INT.pointer_to())));
    let target = spanned(TExpr::UnaryOp {
        op: UnaryOp::Deref,
        operand: Box::new(pointer),
        ty: Type::INT,
    });
    let func = make_test_function(
        "f",
        &[],
        Type::VOID,
        vec![spanned(TStmt::CompoundAssignment {
            op: BinOp::Add,
            lhs: target,
            rhs: lit(2),
        })],
    );

    assert_eq!(
        lower_dump(vec![func]),
        "fn.f:\n\
         .t0.l = *p.l\n\
         .t1.l = .t0.l + 2\n\
         *p.l = .t1.l\n\
         return\n"
    );
}

#[test]
fn test_address_of_literal_is_malformed() {
    let func = make_test_function(
        "f",
        &[],
        Type::VOID,
        vec![(
            TStmt::Expr((
                TExpr::UnaryOp {
                    op: UnaryOp::AddrOf,
                    operand: Box::new(lit(5)),
                    ty: Type::INT.pointer_to(),
                },
                Span::new(9),
            )),
            Span::new(9),
        )],
    );

    let err = lower_program(&program_of(vec![func])).unwrap_err();
    assert_eq!(err.line(), Some(9));
    // The dump shows how far lowering got
    assert_eq!(err.ir_dump(), Some("fn.f:\n"));
}

#[test]
fn test_void_call_used_as_value_is_malformed() {
    let func = make_test_function(
        "f",
        &[],
        Type::VOID,
        vec![spanned(TStmt::Decl {
            var: VarRef::local("x", Type::INT),
            value: Some(spanned(TExpr::Call {
                func_name: "g".to_string(),
                args: vec![],
                ty: Type::VOID,
            })),
        })],
    );

    let err = lower_program(&program_of(vec![func])).unwrap_err();
    assert!(matches!(err, CompileError::MalformedAst { .. }));
}

#[test]
fn test_lowering_is_deterministic() {
    let build = || {
        make_test_function(
            "f",
            &["a", "b"],
            Type::INT,
            vec![spanned(TStmt::Return {
                expr: Some(binop(
                    BinOp::Or,
                    binop(BinOp::Lt, param("a"), param("b")),
                    binop(BinOp::Eq, param("a"), lit(0)),
                )),
            })],
        )
    };

    assert_eq!(lower_dump(vec![build()]), lower_dump(vec![build()]));
}
