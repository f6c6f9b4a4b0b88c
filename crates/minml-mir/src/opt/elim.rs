//! Dead binding elimination.
//!
//! Removes `let`, `let rec` and tuple-let bindings whose names are unused
//! in the continuation, as long as evaluating the bound expression has no
//! side effect.

use log::debug;

use crate::knf::{Expr, FunDef};

/// Whether evaluating `e` may have a side effect. Calls and array stores
/// count as effects.
pub fn has_effect(e: &Expr) -> bool {
    match e {
        Expr::Let(_, e1, e2) | Expr::IfEq(_, _, e1, e2) | Expr::IfLE(_, _, e1, e2) => {
            has_effect(e1) || has_effect(e2)
        }
        Expr::LetRec(_, e) | Expr::LetTuple(_, _, e) => has_effect(e),
        Expr::App(..) | Expr::Put(..) | Expr::ExtFunApp(..) => true,
        Expr::Unit
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Neg(_)
        | Expr::Add(..)
        | Expr::Sub(..)
        | Expr::FNeg(_)
        | Expr::FAdd(..)
        | Expr::FSub(..)
        | Expr::FMul(..)
        | Expr::FDiv(..)
        | Expr::Var(_)
        | Expr::Tuple(_)
        | Expr::Get(..)
        | Expr::ExtArray(_) => false,
    }
}

/// Eliminate dead bindings in `e`.
pub fn eliminate(e: Expr) -> Expr {
    match e {
        Expr::IfEq(x, y, e1, e2) => {
            Expr::IfEq(x, y, Box::new(eliminate(*e1)), Box::new(eliminate(*e2)))
        }
        Expr::IfLE(x, y, e1, e2) => {
            Expr::IfLE(x, y, Box::new(eliminate(*e1)), Box::new(eliminate(*e2)))
        }
        Expr::Let((x, t), e1, e2) => {
            let e1 = eliminate(*e1);
            let e2 = eliminate(*e2);
            if has_effect(&e1) || e2.free_vars().contains(&x) {
                Expr::Let((x, t), Box::new(e1), Box::new(e2))
            } else {
                debug!("eliminating variable {}", x);
                e2
            }
        }
        Expr::LetRec(fundef, e) => {
            let e = eliminate(*e);
            if e.free_vars().contains(&fundef.name) {
                let FunDef { name, ty, args, body } = fundef;
                Expr::LetRec(
                    FunDef {
                        name,
                        ty,
                        args,
                        body: Box::new(eliminate(*body)),
                    },
                    Box::new(e),
                )
            } else {
                debug!("eliminating function {}", fundef.name);
                e
            }
        }
        Expr::LetTuple(xts, y, e) => {
            let e = eliminate(*e);
            let live = e.free_vars();
            if xts.iter().any(|(x, _)| live.contains(x)) {
                Expr::LetTuple(xts, y, Box::new(e))
            } else {
                debug!(
                    "eliminating variables {}",
                    xts.iter().map(|(x, _)| x.as_str()).collect::<Vec<_>>().join(", ")
                );
                e
            }
        }
        Expr::Unit
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Neg(_)
        | Expr::Add(..)
        | Expr::Sub(..)
        | Expr::FNeg(_)
        | Expr::FAdd(..)
        | Expr::FSub(..)
        | Expr::FMul(..)
        | Expr::FDiv(..)
        | Expr::Var(_)
        | Expr::App(..)
        | Expr::Tuple(_)
        | Expr::Get(..)
        | Expr::Put(..)
        | Expr::ExtArray(_)
        | Expr::ExtFunApp(..) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MirType;

    #[test]
    fn unused_pure_binding_is_removed() {
        let e = Expr::let_("x", MirType::Int, Expr::Add("a".into(), "b".into()), Expr::Int(0));
        assert_eq!(eliminate(e), Expr::Int(0));
    }

    #[test]
    fn unused_effectful_binding_is_kept() {
        let call = Expr::ExtFunApp("print_int".into(), vec!["a".into()]);
        let e = Expr::let_("u", MirType::Unit, call, Expr::Unit);
        assert_eq!(eliminate(e.clone()), e);

        let store = Expr::Put("arr".into(), "i".into(), "v".into());
        let e = Expr::let_("u", MirType::Unit, store, Expr::Unit);
        assert_eq!(eliminate(e.clone()), e);
    }

    #[test]
    fn used_binding_is_kept() {
        let e = Expr::let_("x", MirType::Int, Expr::Int(1), Expr::Var("x".into()));
        assert_eq!(eliminate(e.clone()), e);
    }

    #[test]
    fn unused_function_and_tuple_let_are_removed() {
        let e = Expr::LetRec(
            FunDef {
                name: "f".into(),
                ty: MirType::Fun(vec![MirType::Int], Box::new(MirType::Int)),
                args: vec![("x".into(), MirType::Int)],
                body: Box::new(Expr::Var("x".into())),
            },
            Box::new(Expr::LetTuple(
                vec![("p".into(), MirType::Int)],
                "t".into(),
                Box::new(Expr::Int(4)),
            )),
        );
        assert_eq!(eliminate(e), Expr::Int(4));
    }

    #[test]
    fn effects_inside_branches_count() {
        let branch = Expr::IfEq(
            "a".into(),
            "b".into(),
            Box::new(Expr::App("f".into(), vec![])),
            Box::new(Expr::Unit),
        );
        assert!(has_effect(&branch));
        assert!(!has_effect(&Expr::Get("arr".into(), "i".into())));
    }
}
