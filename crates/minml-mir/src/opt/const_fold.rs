//! Constant folding.
//!
//! Tracks names bound to integer, float and tuple literals, evaluates
//! operations whose operands are all known, picks the live branch of a
//! comparison between known values, and splits tuple lets on known tuples
//! into plain copies. Integer arithmetic wraps.

use minml_common::Env;

use crate::knf::{Expr, FunDef, Name};

/// Fold constants in `e`.
pub fn fold(e: Expr) -> Expr {
    fold_in(&Env::new(), e)
}

fn int(env: &Env<Expr>, x: &str) -> Option<i64> {
    match env.get(x) {
        Some(Expr::Int(n)) => Some(*n),
        _ => None,
    }
}

fn float(env: &Env<Expr>, x: &str) -> Option<f64> {
    match env.get(x) {
        Some(Expr::Float(d)) => Some(*d),
        _ => None,
    }
}

fn tuple<'e>(env: &'e Env<Expr>, x: &str) -> Option<&'e [Name]> {
    match env.get(x) {
        Some(Expr::Tuple(ys)) => Some(ys),
        _ => None,
    }
}

fn fold_in(env: &Env<Expr>, e: Expr) -> Expr {
    match e {
        Expr::Var(x) => match env.get(&x) {
            Some(known @ (Expr::Int(_) | Expr::Float(_) | Expr::Tuple(_))) => known.clone(),
            _ => Expr::Var(x),
        },
        Expr::Neg(x) => match int(env, &x) {
            Some(n) => Expr::Int(n.wrapping_neg()),
            None => Expr::Neg(x),
        },
        Expr::Add(x, y) => match (int(env, &x), int(env, &y)) {
            (Some(m), Some(n)) => Expr::Int(m.wrapping_add(n)),
            _ => Expr::Add(x, y),
        },
        Expr::Sub(x, y) => match (int(env, &x), int(env, &y)) {
            (Some(m), Some(n)) => Expr::Int(m.wrapping_sub(n)),
            _ => Expr::Sub(x, y),
        },
        Expr::FNeg(x) => match float(env, &x) {
            Some(d) => Expr::Float(-d),
            None => Expr::FNeg(x),
        },
        Expr::FAdd(x, y) => match (float(env, &x), float(env, &y)) {
            (Some(a), Some(b)) => Expr::Float(a + b),
            _ => Expr::FAdd(x, y),
        },
        Expr::FSub(x, y) => match (float(env, &x), float(env, &y)) {
            (Some(a), Some(b)) => Expr::Float(a - b),
            _ => Expr::FSub(x, y),
        },
        Expr::FMul(x, y) => match (float(env, &x), float(env, &y)) {
            (Some(a), Some(b)) => Expr::Float(a * b),
            _ => Expr::FMul(x, y),
        },
        Expr::FDiv(x, y) => match (float(env, &x), float(env, &y)) {
            (Some(a), Some(b)) => Expr::Float(a / b),
            _ => Expr::FDiv(x, y),
        },
        Expr::IfEq(x, y, e1, e2) => {
            let known = match (int(env, &x), int(env, &y)) {
                (Some(m), Some(n)) => Some(m == n),
                _ => match (float(env, &x), float(env, &y)) {
                    (Some(a), Some(b)) => Some(a == b),
                    _ => None,
                },
            };
            match known {
                Some(true) => fold_in(env, *e1),
                Some(false) => fold_in(env, *e2),
                None => Expr::IfEq(x, y, Box::new(fold_in(env, *e1)), Box::new(fold_in(env, *e2))),
            }
        }
        Expr::IfLE(x, y, e1, e2) => {
            let known = match (int(env, &x), int(env, &y)) {
                (Some(m), Some(n)) => Some(m <= n),
                _ => match (float(env, &x), float(env, &y)) {
                    (Some(a), Some(b)) => Some(a <= b),
                    _ => None,
                },
            };
            match known {
                Some(true) => fold_in(env, *e1),
                Some(false) => fold_in(env, *e2),
                None => Expr::IfLE(x, y, Box::new(fold_in(env, *e1)), Box::new(fold_in(env, *e2))),
            }
        }
        Expr::Let((x, t), e1, e2) => {
            let e1 = fold_in(env, *e1);
            let body_env = match &e1 {
                Expr::Int(_) | Expr::Float(_) | Expr::Tuple(_) => env.insert(x.clone(), e1.clone()),
                _ => env.clone(),
            };
            Expr::Let((x, t), Box::new(e1), Box::new(fold_in(&body_env, *e2)))
        }
        Expr::LetRec(fundef, e) => {
            let FunDef { name, ty, args, body } = fundef;
            Expr::LetRec(
                FunDef {
                    name,
                    ty,
                    args,
                    body: Box::new(fold_in(env, *body)),
                },
                Box::new(fold_in(env, *e)),
            )
        }
        Expr::LetTuple(xts, y, e) => match tuple(env, &y) {
            Some(ys) if ys.len() == xts.len() => {
                let ys = ys.to_vec();
                let body = fold_in(env, *e);
                xts.into_iter()
                    .zip(ys)
                    .rev()
                    .fold(body, |body, (xt, z)| {
                        Expr::Let(xt, Box::new(Expr::Var(z)), Box::new(body))
                    })
            }
            _ => Expr::LetTuple(xts, y, Box::new(fold_in(env, *e))),
        },
        Expr::Unit
        | Expr::Int(_)
        | Expr::Float(_)
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

    fn let_int(x: &str, n: i64, body: Expr) -> Expr {
        Expr::let_(x, MirType::Int, Expr::Int(n), body)
    }

    fn body_of(mut e: Expr) -> Expr {
        while let Expr::Let(_, _, body) = e {
            e = *body;
        }
        e
    }

    #[test]
    fn integer_arithmetic_folds() {
        let e = let_int("x", 1, let_int("y", 2, Expr::Add("x".into(), "y".into())));
        assert_eq!(body_of(fold(e)), Expr::Int(3));

        let e = let_int("x", 7, Expr::Neg("x".into()));
        assert_eq!(body_of(fold(e)), Expr::Int(-7));
    }

    #[test]
    fn integer_arithmetic_wraps() {
        let e = let_int("x", i64::MAX, let_int("y", 1, Expr::Add("x".into(), "y".into())));
        assert_eq!(body_of(fold(e)), Expr::Int(i64::MIN));
    }

    #[test]
    fn float_arithmetic_folds() {
        let e = Expr::let_(
            "a",
            MirType::Float,
            Expr::Float(1.5),
            Expr::let_("b", MirType::Float, Expr::Float(2.0), Expr::FMul("a".into(), "b".into())),
        );
        assert_eq!(body_of(fold(e)), Expr::Float(3.0));
    }

    #[test]
    fn unknown_operands_are_kept() {
        let e = let_int("x", 1, Expr::Add("x".into(), "z".into()));
        assert_eq!(fold(e.clone()), e);
    }

    #[test]
    fn known_comparison_picks_a_branch() {
        let (ten, twenty) = (Box::new(Expr::Int(10)), Box::new(Expr::Int(20)));
        let test = Expr::IfLE("x".into(), "y".into(), ten.clone(), twenty.clone());
        let e = let_int("x", 3, let_int("y", 2, test));
        assert_eq!(body_of(fold(e)), Expr::Int(20));

        let test = Expr::IfEq("x".into(), "y".into(), ten, twenty);
        let e = let_int("x", 2, let_int("y", 2, test));
        assert_eq!(body_of(fold(e)), Expr::Int(10));
    }

    #[test]
    fn known_tuple_splits_into_copies() {
        // let t = (a, b) in let (p, q) = t in p - q
        let e = Expr::let_(
            "t",
            MirType::Tuple(vec![MirType::Int, MirType::Int]),
            Expr::Tuple(vec!["a".into(), "b".into()]),
            Expr::LetTuple(
                vec![("p".into(), MirType::Int), ("q".into(), MirType::Int)],
                "t".into(),
                Box::new(Expr::Sub("p".into(), "q".into())),
            ),
        );
        let Expr::Let(_, _, body) = fold(e) else { panic!("expected a let") };
        let expected = Expr::let_(
            "p",
            MirType::Int,
            Expr::Var("a".into()),
            Expr::let_("q", MirType::Int, Expr::Var("b".into()), Expr::Sub("p".into(), "q".into())),
        );
        assert_eq!(*body, expected);
    }
}
