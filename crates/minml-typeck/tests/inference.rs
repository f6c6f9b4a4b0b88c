//! Integration tests for the MinML type inference engine.
//!
//! These tests build small programs, run `minml_typeck::check()`, and assert
//! on the inferred types, the external-symbol table and the errors. They
//! exercise literals, let-bindings, recursive functions, tuples, arrays,
//! application, the occurs check and the top-level `Unit` requirement.

use minml_typeck::ast::{BinOp, Binder, Expr, UnaryOp};
use minml_typeck::error::{TypeError, TypeWarning};
use minml_typeck::tast::{ExprKind, TypedExpr};
use minml_typeck::ty::{Ty, TyVar};
use minml_typeck::{ExtEnv, TypeckResult};

// ── Helpers ────────────────────────────────────────────────────────────

/// Run the type checker with an empty external table.
fn check(expr: Expr) -> (Result<TypeckResult, TypeError>, ExtEnv) {
    let mut ext = ExtEnv::default();
    let result = minml_typeck::check(&expr, &mut ext);
    (result, ext)
}

/// Wrap `expr` so the program has type `Unit`: `let _r = expr in ()`.
fn discard(expr: Expr) -> Expr {
    Expr::let_("_r", expr, Expr::Unit)
}

/// Type of the value bound by the outermost `let` of a typed tree.
fn let_type(e: &TypedExpr) -> Ty {
    match &e.kind {
        ExprKind::Let(b, _, _) => b.ty.clone(),
        other => panic!("expected a let at the top, got {:?}", other),
    }
}

/// Assert that every type in the typed tree is free of type variables.
fn assert_ground(e: &TypedExpr) {
    e.clone().map_types(&mut |ty| {
        assert!(ty.is_ground(), "unresolved type `{}` in typed tree", ty);
        ty
    });
}

// ── Literals and operators ─────────────────────────────────────────────

#[test]
fn test_integer_arithmetic_is_int() {
    let (result, _) = check(discard(Expr::binary(BinOp::Add, Expr::Int(1), Expr::Int(2))));
    assert_eq!(let_type(&result.unwrap().expr), Ty::Int);
}

#[test]
fn test_float_arithmetic_is_float() {
    let (result, _) = check(discard(Expr::binary(
        BinOp::FMul,
        Expr::Float(1.5),
        Expr::unary(UnaryOp::FNeg, Expr::Float(2.0)),
    )));
    assert_eq!(let_type(&result.unwrap().expr), Ty::Float);
}

#[test]
fn test_comparison_is_bool() {
    let (result, _) = check(discard(Expr::binary(BinOp::Lt, Expr::Float(1.0), Expr::Float(2.0))));
    assert_eq!(let_type(&result.unwrap().expr), Ty::Bool);
}

#[test]
fn test_comparison_operands_must_agree() {
    let (result, _) = check(discard(Expr::binary(BinOp::Eq, Expr::Int(1), Expr::Float(2.0))));
    assert!(matches!(result, Err(TypeError::Mismatch { .. })));
}

#[test]
fn test_int_plus_float_is_an_error() {
    let (result, _) = check(discard(Expr::binary(BinOp::Add, Expr::Int(1), Expr::Float(2.0))));
    match result.unwrap_err() {
        TypeError::Mismatch { expected, found } => {
            assert_eq!(expected, Ty::Int);
            assert_eq!(found, Ty::Float);
        }
        other => panic!("expected Mismatch, got {:?}", other),
    }
}

// ── Conditionals ───────────────────────────────────────────────────────

#[test]
fn test_if_condition_must_be_bool() {
    let (result, _) = check(discard(Expr::if_(Expr::Int(1), Expr::Int(2), Expr::Int(3))));
    assert!(result.is_err());
}

#[test]
fn test_if_branches_must_agree() {
    let (result, _) = check(discard(Expr::if_(
        Expr::Bool(true),
        Expr::Int(2),
        Expr::Float(3.0),
    )));
    assert!(result.is_err());
}

// ── Let-bindings and functions ─────────────────────────────────────────

#[test]
fn test_let_binding_scopes_over_body_only() {
    // let x = 1 in (let y = x + 1 in ()); the outer let binds Int.
    let prog = Expr::let_(
        "x",
        Expr::Int(1),
        discard(Expr::binary(BinOp::Add, Expr::var("x"), Expr::Int(1))),
    );
    let (result, ext) = check(prog);
    assert_eq!(let_type(&result.unwrap().expr), Ty::Int);
    assert!(ext.is_empty());
}

#[test]
fn test_let_annotation_is_enforced() {
    let prog = Expr::Let(
        Binder::typed("x", Ty::Float),
        Box::new(Expr::Int(1)),
        Box::new(Expr::Unit),
    );
    let (result, _) = check(prog);
    assert!(matches!(result, Err(TypeError::Mismatch { .. })));
}

#[test]
fn test_recursive_function_type() {
    // let rec fact n = if n <= 0 then 1 else n + fact (n - 1) in print_int (fact 5)
    let body = Expr::if_(
        Expr::binary(BinOp::Le, Expr::var("n"), Expr::Int(0)),
        Expr::Int(1),
        Expr::binary(
            BinOp::Add,
            Expr::var("n"),
            Expr::call(
                "fact",
                vec![Expr::binary(BinOp::Sub, Expr::var("n"), Expr::Int(1))],
            ),
        ),
    );
    let prog = Expr::let_rec(
        "fact",
        &["n"],
        body,
        Expr::call("print_int", vec![Expr::call("fact", vec![Expr::Int(5)])]),
    );
    let (result, ext) = check(prog);
    let result = result.unwrap();

    match &result.expr.kind {
        ExprKind::LetRec(fundef, _) => {
            assert_eq!(fundef.name.ty, Ty::fun(vec![Ty::Int], Ty::Int));
            assert_eq!(fundef.args[0].ty, Ty::Int);
        }
        other => panic!("expected LetRec, got {:?}", other),
    }
    assert_eq!(ext["print_int"], Ty::fun(vec![Ty::Int], Ty::Unit));
    assert_ground(&result.expr);
}

#[test]
fn test_application_arity_mismatch() {
    let prog = Expr::let_rec(
        "f",
        &["x"],
        Expr::var("x"),
        discard(Expr::call("f", vec![Expr::Int(1), Expr::Int(2)])),
    );
    let (result, _) = check(prog);
    assert!(matches!(
        result,
        Err(TypeError::ArityMismatch {
            expected: 1,
            found: 2,
            ..
        })
    ));
}

#[test]
fn test_self_application_fails_occurs_check() {
    // let rec f x = x x in ()
    let prog = Expr::let_rec(
        "f",
        &["x"],
        Expr::app(Expr::var("x"), vec![Expr::var("x")]),
        Expr::Unit,
    );
    let (result, _) = check(prog);
    assert!(matches!(result, Err(TypeError::InfiniteType { .. })));
}

// ── Tuples and arrays ──────────────────────────────────────────────────

#[test]
fn test_let_tuple_destructures_components() {
    let prog = Expr::let_tuple(
        &["a", "b"],
        Expr::Tuple(vec![Expr::Int(1), Expr::Float(2.0)]),
        discard(Expr::var("b")),
    );
    let (result, _) = check(prog);
    match &result.unwrap().expr.kind {
        ExprKind::LetTuple(pat, _, body) => {
            assert_eq!(pat[0].ty, Ty::Int);
            assert_eq!(pat[1].ty, Ty::Float);
            assert_eq!(let_type(body), Ty::Float);
        }
        other => panic!("expected LetTuple, got {:?}", other),
    }
}

#[test]
fn test_let_tuple_arity_mismatch() {
    let prog = Expr::let_tuple(
        &["a", "b"],
        Expr::Tuple(vec![Expr::Int(1), Expr::Int(2), Expr::Int(3)]),
        Expr::Unit,
    );
    let (result, _) = check(prog);
    assert!(matches!(result, Err(TypeError::ArityMismatch { .. })));
}

#[test]
fn test_array_get_and_put() {
    // let a = Array.make 3 1.0 in a.(0) <- a.(1)
    let prog = Expr::let_(
        "a",
        Expr::array(Expr::Int(3), Expr::Float(1.0)),
        Expr::put(
            Expr::var("a"),
            Expr::Int(0),
            Expr::get(Expr::var("a"), Expr::Int(1)),
        ),
    );
    let (result, _) = check(prog);
    assert_eq!(let_type(&result.unwrap().expr), Ty::array(Ty::Float));
}

#[test]
fn test_array_put_value_must_match_elements() {
    let prog = Expr::let_(
        "a",
        Expr::array(Expr::Int(3), Expr::Float(1.0)),
        Expr::put(Expr::var("a"), Expr::Int(0), Expr::Int(1)),
    );
    let (result, _) = check(prog);
    assert!(result.is_err());
}

#[test]
fn test_array_index_must_be_int() {
    let prog = Expr::let_(
        "a",
        Expr::array(Expr::Int(3), Expr::Int(0)),
        discard(Expr::get(Expr::var("a"), Expr::Float(0.0))),
    );
    let (result, _) = check(prog);
    assert!(result.is_err());
}

// ── External symbols and defaulting ────────────────────────────────────

#[test]
fn test_external_array_is_inferred_from_use() {
    let prog = Expr::put(Expr::var("buf"), Expr::Int(0), Expr::Float(0.5));
    let (result, ext) = check(prog);
    let result = result.unwrap();
    assert_eq!(ext["buf"], Ty::array(Ty::Float));
    assert!(result.warnings.iter().any(|w| matches!(
        w,
        TypeWarning::AssumedExternal { name } if name == "buf"
    )));
}

#[test]
fn test_prepopulated_external_may_hold_any_type_variable() {
    let mut ext = ExtEnv::default();
    ext.insert("f".into(), Ty::Var(TyVar(7)));
    let prog = Expr::call("print_int", vec![Expr::call("f", vec![Expr::Int(1)])]);
    let result = minml_typeck::check(&prog, &mut ext).unwrap();

    assert_eq!(ext["f"], Ty::fun(vec![Ty::Int], Ty::Int));
    assert_eq!(ext["print_int"], Ty::fun(vec![Ty::Int], Ty::Unit));
    assert_ground(&result.expr);
}

#[test]
fn test_unconstrained_variable_defaults_to_int() {
    // let rec id x = x in ()   -- x is never constrained
    let prog = Expr::let_rec("id", &["x"], Expr::var("x"), Expr::Unit);
    let (result, _) = check(prog);
    let result = result.unwrap();

    match &result.expr.kind {
        ExprKind::LetRec(fundef, _) => {
            assert_eq!(fundef.name.ty, Ty::fun(vec![Ty::Int], Ty::Int));
        }
        other => panic!("expected LetRec, got {:?}", other),
    }
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, TypeWarning::DefaultedToInt { .. })));
    assert_ground(&result.expr);
}

#[test]
fn test_top_level_must_be_unit() {
    let (result, _) = check(Expr::Float(1.0));
    let err = result.unwrap_err();
    assert_eq!(err, TypeError::TopLevelNotUnit { found: Ty::Float });
    insta::assert_snapshot!(
        err.to_string(),
        @"top level does not have type `Unit` (found `Float`)"
    );
}

#[test]
fn test_sequence_requires_unit_first() {
    let (result, _) = check(Expr::seq(Expr::Int(1), Expr::Unit));
    assert!(result.is_err());

    let (result, _) = check(Expr::seq(Expr::Unit, Expr::Unit));
    assert!(result.is_ok());
}
