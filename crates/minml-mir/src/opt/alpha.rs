//! Alpha renaming.
//!
//! Replaces every bound name with a fresh one from the [`IdGen`]. After
//! renaming, no two binders in the tree share a name and nothing is
//! shadowed, which the later passes rely on when they move bindings around.

use minml_common::{Env, IdGen};

use crate::knf::{Expr, FunDef, Name};

/// Rename every binder in `e`.
pub fn rename(e: Expr, gen: &mut IdGen) -> Expr {
    rename_with(&Env::new(), e, gen)
}

/// Rename every binder in `e`, substituting free names found in `env`.
///
/// The inliner uses this with `env` mapping formals to actual arguments.
pub fn rename_with(env: &Env<Name>, e: Expr, gen: &mut IdGen) -> Expr {
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
            Box::new(rename_with(env, *e1, gen)),
            Box::new(rename_with(env, *e2, gen)),
        ),
        Expr::IfLE(x, y, e1, e2) => Expr::IfLE(
            find(x),
            find(y),
            Box::new(rename_with(env, *e1, gen)),
            Box::new(rename_with(env, *e2, gen)),
        ),
        Expr::Let((x, t), e1, e2) => {
            let fresh = gen.gen_id(&x);
            let e1 = rename_with(env, *e1, gen);
            let e2 = rename_with(&env.insert(x, fresh.clone()), *e2, gen);
            Expr::Let((fresh, t), Box::new(e1), Box::new(e2))
        }
        Expr::Var(x) => Expr::Var(find(x)),
        Expr::LetRec(fundef, e) => {
            let FunDef { name, ty, args, body } = fundef;
            let fresh = gen.gen_id(&name);
            let env = env.insert(name, fresh.clone());
            let fresh_args: Vec<(Name, _)> =
                args.iter().map(|(x, t)| (gen.gen_id(x), t.clone())).collect();
            let body_env = env.extend(
                args.into_iter()
                    .zip(&fresh_args)
                    .map(|((x, _), (y, _))| (x, y.clone())),
            );
            let body = rename_with(&body_env, *body, gen);
            let e = rename_with(&env, *e, gen);
            Expr::LetRec(
                FunDef {
                    name: fresh,
                    ty,
                    args: fresh_args,
                    body: Box::new(body),
                },
                Box::new(e),
            )
        }
        Expr::App(f, ys) => Expr::App(find(f), ys.into_iter().map(find).collect()),
        Expr::Tuple(xs) => Expr::Tuple(xs.into_iter().map(find).collect()),
        Expr::LetTuple(xts, y, e) => {
            let fresh: Vec<_> = xts.iter().map(|(x, t)| (gen.gen_id(x), t.clone())).collect();
            let body_env = env.extend(
                xts.into_iter()
                    .zip(&fresh)
                    .map(|((x, _), (z, _))| (x, z.clone())),
            );
            let y = find(y);
            Expr::LetTuple(fresh, y, Box::new(rename_with(&body_env, *e, gen)))
        }
        Expr::Get(x, y) => Expr::Get(find(x), find(y)),
        Expr::Put(x, y, z) => Expr::Put(find(x), find(y), find(z)),
        Expr::ExtFunApp(f, ys) => Expr::ExtFunApp(f, ys.into_iter().map(find).collect()),
    }
}
