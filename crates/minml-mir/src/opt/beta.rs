//! Copy propagation.
//!
//! `let x = y in e` is dropped and `y` substituted for `x` in `e`.

use log::debug;
use minml_common::Env;

use crate::knf::{Expr, FunDef, Name};

/// Propagate copies through `e`.
pub fn propagate(e: Expr) -> Expr {
    propagate_in(&Env::new(), e)
}

fn propagate_in(env: &Env<Name>, e: Expr) -> Expr {
    let find = |x: Name| env.get(&x).cloned().unwrap_or(x);
    match e {
        Expr::Unit | Expr::Int(_) | Expr::Float(_) | Expr::ExtArray(_) => e,
        Expr::Neg(x) => Expr::Neg(find(x)),
        Expr::Add(x, y) => Expr::Add(find(x), find(y)),
        Expr::Sub(x, y) => Expr::Sub(find(x), find(y)),
        Expr::FNeg(x) => Expr::FNeg(find(x)),
        Expr::FAdd(x, y) => Expr::FAdd(find(x), find(y)),
        Expr::FSub(x, y) => Expr::FSub(find(x), find(y)),
        Expr::FMul(x, y) => Expr::FMul(find(x), find(y)),
        Expr::FDiv(x, y) => Expr::FDiv(find(x), find(y)),
        Expr::IfEq(x, y, e1, e2) => Expr::IfEq(
            find(x),
            find(y),
            Box::new(propagate_in(env, *e1)),
            Box::new(propagate_in(env, *e2)),
        ),
        Expr::IfLE(x, y, e1, e2) => Expr::IfLE(
            find(x),
            find(y),
            Box::new(propagate_in(env, *e1)),
            Box::new(propagate_in(env, *e2)),
        ),
        Expr::Let((x, t), e1, e2) => match propagate_in(env, *e1) {
            Expr::Var(y) => {
                debug!("beta-reducing {} = {}", x, y);
                propagate_in(&env.insert(x, y), *e2)
            }
            e1 => Expr::Let((x, t), Box::new(e1), Box::new(propagate_in(env, *e2))),
        },
        Expr::Var(x) => Expr::Var(find(x)),
        Expr::LetRec(fundef, e) => {
            let FunDef { name, ty, args, body } = fundef;
            Expr::LetRec(
                FunDef {
                    name,
                    ty,
                    args,
                    body: Box::new(propagate_in(env, *body)),
                },
                Box::new(propagate_in(env, *e)),
            )
        }
        Expr::App(f, ys) => Expr::App(find(f), ys.into_iter().map(find).collect()),
        Expr::Tuple(xs) => Expr::Tuple(xs.into_iter().map(find).collect()),
        Expr::LetTuple(xts, y, e) => Expr::LetTuple(xts, find(y), Box::new(propagate_in(env, *e))),
        Expr::Get(x, y) => Expr::Get(find(x), find(y)),
        Expr::Put(x, y, z) => Expr::Put(find(x), find(y), find(z)),
        Expr::ExtFunApp(f, ys) => Expr::ExtFunApp(f, ys.into_iter().map(find).collect()),
    }
}
