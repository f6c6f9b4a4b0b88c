//! Let flattening.
//!
//! `let x = (let y = e1 in e2) in e3` becomes
//! `let y = e1 in let x = e2 in e3`, and likewise for `let rec` and tuple
//! lets in the bound position. Binders are unique after alpha renaming, so
//! moving `y` outward cannot capture anything in `e3`.

use crate::knf::{Expr, FunDef, Name};
use crate::types::MirType;

/// Flatten every let nested in a let-bound position.
pub fn flatten(e: Expr) -> Expr {
    match e {
        Expr::IfEq(x, y, e1, e2) => {
            Expr::IfEq(x, y, Box::new(flatten(*e1)), Box::new(flatten(*e2)))
        }
        Expr::IfLE(x, y, e1, e2) => {
            Expr::IfLE(x, y, Box::new(flatten(*e1)), Box::new(flatten(*e2)))
        }
        Expr::Let(xt, e1, e2) => reassociate(flatten(*e1), xt, *e2),
        Expr::LetRec(fundef, e) => {
            let FunDef { name, ty, args, body } = fundef;
            Expr::LetRec(
                FunDef {
                    name,
                    ty,
                    args,
                    body: Box::new(flatten(*body)),
                },
                Box::new(flatten(*e)),
            )
        }
        Expr::LetTuple(xts, y, e) => Expr::LetTuple(xts, y, Box::new(flatten(*e))),
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

/// Build `let xt = bound in body`, hoisting the binding chain of an
/// already flattened `bound` above the new let.
fn reassociate(bound: Expr, xt: (Name, MirType), body: Expr) -> Expr {
    match bound {
        Expr::Let(yt, e3, e4) => Expr::Let(yt, e3, Box::new(reassociate(*e4, xt, body))),
        Expr::LetRec(fundef, e) => Expr::LetRec(fundef, Box::new(reassociate(*e, xt, body))),
        Expr::LetTuple(yts, z, e) => Expr::LetTuple(yts, z, Box::new(reassociate(*e, xt, body))),
        bound => Expr::Let(xt, Box::new(bound), Box::new(flatten(body))),
    }
}
