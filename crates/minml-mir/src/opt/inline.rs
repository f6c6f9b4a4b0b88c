//! Inline expansion of small functions.
//!
//! A function whose body has at most `threshold` nodes is recorded when its
//! `let rec` is entered; every call to it in scope is replaced by a freshly
//! renamed copy of the body with the actual arguments substituted for the
//! formals. Each call site gets its own copy, so the bindings of two
//! expansions of the same function never collide.

use log::debug;
use minml_common::{Env, IdGen};

use crate::knf::{Expr, FunDef, Name};
use crate::opt::alpha;

/// Formals and body of a function small enough to inline.
#[derive(Clone, Debug)]
struct Inlinable {
    args: Vec<Name>,
    body: Expr,
}

struct Inliner<'a> {
    threshold: usize,
    gen: &'a mut IdGen,
}

/// Inline calls to functions whose body size is at most `threshold`.
pub fn expand(e: Expr, threshold: usize, gen: &mut IdGen) -> Expr {
    Inliner { threshold, gen }.expr(&Env::new(), e)
}

impl<'a> Inliner<'a> {
    fn expr(&mut self, env: &Env<Inlinable>, e: Expr) -> Expr {
        match e {
            Expr::IfEq(x, y, e1, e2) => {
                let e1 = self.expr(env, *e1);
                Expr::IfEq(x, y, Box::new(e1), Box::new(self.expr(env, *e2)))
            }
            Expr::IfLE(x, y, e1, e2) => {
                let e1 = self.expr(env, *e1);
                Expr::IfLE(x, y, Box::new(e1), Box::new(self.expr(env, *e2)))
            }
            Expr::Let(xt, e1, e2) => {
                let e1 = self.expr(env, *e1);
                Expr::Let(xt, Box::new(e1), Box::new(self.expr(env, *e2)))
            }
            Expr::LetRec(fundef, e) => {
                let FunDef { name, ty, args, body } = fundef;
                let env = if body.size() <= self.threshold {
                    let candidate = Inlinable {
                        args: args.iter().map(|(x, _)| x.clone()).collect(),
                        body: (*body).clone(),
                    };
                    env.insert(name.clone(), candidate)
                } else {
                    env.clone()
                };
                let body = self.expr(&env, *body);
                let e = self.expr(&env, *e);
                Expr::LetRec(
                    FunDef {
                        name,
                        ty,
                        args,
                        body: Box::new(body),
                    },
                    Box::new(e),
                )
            }
            Expr::App(f, ys) => match env.get(&f) {
                Some(Inlinable { args, body }) => {
                    debug!("inlining {}", f);
                    let subst = Env::new().extend(args.iter().cloned().zip(ys));
                    alpha::rename_with(&subst, body.clone(), self.gen)
                }
                None => Expr::App(f, ys),
            },
            Expr::LetTuple(xts, y, e) => Expr::LetTuple(xts, y, Box::new(self.expr(env, *e))),
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
            | Expr::Put(..)
            | Expr::ExtArray(_)
            | Expr::ExtFunApp(..) => e,
        }
    }
}
