//! Typed tree to K-normal form lowering.
//!
//! Every compound operand is hoisted into a `let` bound to a fresh
//! temporary, in left-to-right order, so the lowered program evaluates its
//! sub-expressions in the same order as the source. Booleans become the
//! integers 1 and 0, comparisons become `IfEq`/`IfLE` branches, and free
//! names are resolved against the external symbol table.

use minml_common::{Env, IdGen};
use minml_typeck::ast::{BinOp, UnaryOp};
use minml_typeck::tast::{ExprKind, TypedExpr};
use minml_typeck::ty::Ty;
use minml_typeck::ExtEnv;

use crate::error::LowerError;
use crate::knf::{Expr, FunDef, Name};
use crate::types::{resolve_type, MirType};

type Lowered = Result<(Expr, MirType), LowerError>;

/// Lower a typed program to K-normal form.
///
/// Returns the lowered expression together with its type. `ext` must be the
/// external table filled in by type checking.
pub fn normalize(expr: &TypedExpr, ext: &ExtEnv, gen: &mut IdGen) -> Lowered {
    let mut normalizer = Normalizer { ext, gen };
    normalizer.expr(&Env::new(), expr)
}

// ── Normalizer ───────────────────────────────────────────────────────

struct Normalizer<'a> {
    ext: &'a ExtEnv,
    gen: &'a mut IdGen,
}

fn bool_lit(b: bool) -> TypedExpr {
    TypedExpr::new(ExprKind::Bool(b), Ty::Bool)
}

fn binders(bs: &[minml_typeck::tast::Binding]) -> Vec<(Name, MirType)> {
    bs.iter().map(|b| (b.name.clone(), resolve_type(&b.ty))).collect()
}

impl<'a> Normalizer<'a> {
    /// Lower `operands` left to right, reusing operands that are already
    /// names and binding every other one to a fresh temporary, then hand the
    /// names to `build`. The temporaries wrap the built node outermost
    /// first.
    fn insert_let<F>(&mut self, env: &Env<MirType>, operands: &[&TypedExpr], build: F) -> Lowered
    where
        F: FnOnce(&mut Self, Vec<Name>) -> Lowered,
    {
        let mut names = Vec::with_capacity(operands.len());
        let mut pending = Vec::new();
        for operand in operands {
            match self.expr(env, operand)? {
                (Expr::Var(x), _) => names.push(x),
                (e, ty) => {
                    let tmp = self.gen.gen_tmp(ty.tag());
                    names.push(tmp.clone());
                    pending.push((tmp, ty, e));
                }
            }
        }
        let (mut body, ty) = build(self, names)?;
        for (tmp, tmp_ty, bound) in pending.into_iter().rev() {
            body = Expr::Let((tmp, tmp_ty), Box::new(bound), Box::new(body));
        }
        Ok((body, ty))
    }

    fn expr(&mut self, env: &Env<MirType>, e: &TypedExpr) -> Lowered {
        match &e.kind {
            ExprKind::Unit => Ok((Expr::Unit, MirType::Unit)),
            ExprKind::Bool(b) => Ok((Expr::Int(i64::from(*b)), MirType::Bool)),
            ExprKind::Int(n) => Ok((Expr::Int(*n), MirType::Int)),
            ExprKind::Float(d) => Ok((Expr::Float(*d), MirType::Float)),

            ExprKind::Unary(UnaryOp::Not, c) => {
                self.branch(env, c, &bool_lit(false), &bool_lit(true))
            }
            ExprKind::Unary(UnaryOp::Neg, x) => {
                self.insert_let(env, &[&**x], |_, xs| {
                    Ok((Expr::Neg(xs[0].clone()), MirType::Int))
                })
            }
            ExprKind::Unary(UnaryOp::FNeg, x) => {
                self.insert_let(env, &[&**x], |_, xs| {
                    Ok((Expr::FNeg(xs[0].clone()), MirType::Float))
                })
            }

            ExprKind::Binary(op, _, _) if op.is_comparison() => {
                self.branch(env, e, &bool_lit(true), &bool_lit(false))
            }
            ExprKind::Binary(op, l, r) => {
                let op = *op;
                self.insert_let(env, &[&**l, &**r], move |_, xs| {
                    let (x, y) = (xs[0].clone(), xs[1].clone());
                    Ok(match op {
                        BinOp::Add => (Expr::Add(x, y), MirType::Int),
                        BinOp::Sub => (Expr::Sub(x, y), MirType::Int),
                        BinOp::FAdd => (Expr::FAdd(x, y), MirType::Float),
                        BinOp::FSub => (Expr::FSub(x, y), MirType::Float),
                        BinOp::FMul => (Expr::FMul(x, y), MirType::Float),
                        BinOp::FDiv => (Expr::FDiv(x, y), MirType::Float),
                        BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Ge | BinOp::Lt | BinOp::Gt => {
                            unreachable!("comparisons are lowered as branches")
                        }
                    })
                })
            }

            ExprKind::If(c, t, f) => self.branch(env, c, t, f),

            ExprKind::Let(b, e1, e2) => {
                let ty = resolve_type(&b.ty);
                let (e1, _) = self.expr(env, e1)?;
                let (e2, body_ty) = self.expr(&env.insert(b.name.clone(), ty.clone()), e2)?;
                Ok((Expr::Let((b.name.clone(), ty), Box::new(e1), Box::new(e2)), body_ty))
            }

            ExprKind::Var(x) => {
                if let Some(ty) = env.get(x) {
                    return Ok((Expr::Var(x.clone()), ty.clone()));
                }
                let ext: &'a ExtEnv = self.ext;
                match ext.get(x) {
                    Some(ty @ Ty::Array(_)) => Ok((Expr::ExtArray(x.clone()), resolve_type(ty))),
                    _ => Err(LowerError::UnresolvedReference { name: x.clone() }),
                }
            }

            ExprKind::LetRec(fundef, cont) => {
                let ty = resolve_type(&fundef.name.ty);
                let fun_env = env.insert(fundef.name.name.clone(), ty.clone());
                let args = binders(&fundef.args);
                let (body, _) = self.expr(&fun_env.extend(args.iter().cloned()), &fundef.body)?;
                let (cont, cont_ty) = self.expr(&fun_env, cont)?;
                let fundef = FunDef {
                    name: fundef.name.name.clone(),
                    ty,
                    args,
                    body: Box::new(body),
                };
                Ok((Expr::LetRec(fundef, Box::new(cont)), cont_ty))
            }

            ExprKind::App(f, args) => {
                let ret = resolve_type(&e.ty);
                if let ExprKind::Var(name) = &f.kind {
                    if !env.contains(name) {
                        let ext: &'a ExtEnv = self.ext;
                        return match ext.get(name) {
                            Some(Ty::Fun(..)) => {
                                let name = name.clone();
                                let operands: Vec<&TypedExpr> = args.iter().collect();
                                self.insert_let(env, &operands, move |_, xs| {
                                    Ok((Expr::ExtFunApp(name, xs), ret))
                                })
                            }
                            _ => Err(LowerError::UnknownExternalFunction { name: name.clone() }),
                        };
                    }
                }
                let operands: Vec<&TypedExpr> =
                    std::iter::once(f.as_ref()).chain(args.iter()).collect();
                self.insert_let(env, &operands, move |_, mut xs| {
                    let f = xs.remove(0);
                    Ok((Expr::App(f, xs), ret))
                })
            }

            ExprKind::Tuple(elems) => {
                let ty = resolve_type(&e.ty);
                let operands: Vec<&TypedExpr> = elems.iter().collect();
                self.insert_let(env, &operands, move |_, xs| Ok((Expr::Tuple(xs), ty)))
            }

            ExprKind::LetTuple(pat, e1, e2) => {
                let pat = binders(pat);
                self.insert_let(env, &[&**e1], move |this, xs| {
                    let body_env = env.extend(pat.iter().cloned());
                    let (e2, ty) = this.expr(&body_env, e2)?;
                    Ok((Expr::LetTuple(pat, xs[0].clone(), Box::new(e2)), ty))
                })
            }

            ExprKind::Array(len, init) => {
                let ty = resolve_type(&e.ty);
                let create = match init.ty {
                    Ty::Float => "create_float_array",
                    _ => "create_array",
                };
                self.insert_let(env, &[&**len, &**init], move |_, xs| {
                    Ok((Expr::ExtFunApp(create.to_string(), xs), ty))
                })
            }

            ExprKind::Get(a, i) => {
                let ty = resolve_type(&e.ty);
                self.insert_let(env, &[&**a, &**i], move |_, xs| {
                    Ok((Expr::Get(xs[0].clone(), xs[1].clone()), ty))
                })
            }

            ExprKind::Put(a, i, v) => self.insert_let(env, &[&**a, &**i, &**v], |_, xs| {
                Ok((Expr::Put(xs[0].clone(), xs[1].clone(), xs[2].clone()), MirType::Unit))
            }),

            ExprKind::Seq(e1, e2) => {
                let (e1, _) = self.expr(env, e1)?;
                let tmp = self.gen.gen_tmp(MirType::Unit.tag());
                let (e2, ty) = self.expr(env, e2)?;
                Ok((Expr::Let((tmp, MirType::Unit), Box::new(e1), Box::new(e2)), ty))
            }
        }
    }

    /// Lower `if cond then t else f`.
    fn branch(
        &mut self,
        env: &Env<MirType>,
        cond: &TypedExpr,
        t: &TypedExpr,
        f: &TypedExpr,
    ) -> Lowered {
        match &cond.kind {
            ExprKind::Unary(UnaryOp::Not, c) => self.branch(env, c, f, t),
            ExprKind::Binary(op, l, r) if op.is_comparison() => {
                let op = *op;
                self.insert_let(env, &[&**l, &**r], move |this, xs| {
                    let (x, y) = (xs[0].clone(), xs[1].clone());
                    let (t, ty) = this.expr(env, t)?;
                    let (f, _) = this.expr(env, f)?;
                    let (t, f) = (Box::new(t), Box::new(f));
                    let e = match op {
                        BinOp::Eq => Expr::IfEq(x, y, t, f),
                        BinOp::Ne => Expr::IfEq(x, y, f, t),
                        BinOp::Le => Expr::IfLE(x, y, t, f),
                        BinOp::Ge => Expr::IfLE(y, x, t, f),
                        BinOp::Lt => Expr::IfLE(y, x, f, t),
                        BinOp::Gt => Expr::IfLE(x, y, f, t),
                        BinOp::Add
                        | BinOp::Sub
                        | BinOp::FAdd
                        | BinOp::FSub
                        | BinOp::FMul
                        | BinOp::FDiv => unreachable!("guarded by is_comparison"),
                    };
                    Ok((e, ty))
                })
            }
            _ => self.insert_let(env, &[cond], move |this, xs| {
                let (t, ty) = this.expr(env, t)?;
                let (f, _) = this.expr(env, f)?;
                let false_tmp = this.gen.gen_tmp(MirType::Bool.tag());
                let test = Expr::IfEq(xs[0].clone(), false_tmp.clone(), Box::new(f), Box::new(t));
                Ok((Expr::let_(false_tmp, MirType::Bool, Expr::Int(0), test), ty))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minml_typeck::ast::{self, BinOp};

    fn ext_with_print() -> ExtEnv {
        let mut ext = ExtEnv::default();
        ext.insert("print_int".into(), Ty::fun(vec![Ty::Int], Ty::Unit));
        ext
    }

    fn lower_with(e: ast::Expr, ext: &mut ExtEnv) -> Lowered {
        let typed = minml_typeck::check(&e, ext).expect("program should type-check");
        normalize(&typed.expr, ext, &mut IdGen::new())
    }

    fn lower(e: ast::Expr) -> Expr {
        lower_with(e, &mut ext_with_print()).expect("program should lower").0
    }

    fn print(e: ast::Expr) -> ast::Expr {
        ast::Expr::call("print_int", vec![e])
    }

    #[test]
    fn compound_operands_are_hoisted_in_order() {
        // let x = 1 in print_int(x + 1)
        let e = ast::Expr::let_(
            "x",
            ast::Expr::Int(1),
            print(ast::Expr::binary(BinOp::Add, ast::Expr::var("x"), ast::Expr::Int(1))),
        );
        insta::assert_snapshot!(lower(e).to_string(), @r"
        let x: int = 1 in
        let Ti2: int =
          let Ti1: int = 1 in
          x + Ti1
        in
        extern print_int(Ti2)
        ");
    }

    #[test]
    fn comparison_becomes_branch() {
        // print_int(if 1 < 2 then 3 else 4)
        let e = print(ast::Expr::if_(
            ast::Expr::binary(BinOp::Lt, ast::Expr::Int(1), ast::Expr::Int(2)),
            ast::Expr::Int(3),
            ast::Expr::Int(4),
        ));
        insta::assert_snapshot!(lower(e).to_string(), @r"
        let Ti3: int =
          let Ti1: int = 1 in
          let Ti2: int = 2 in
          if Ti2 <= Ti1 then
            4
          else
            3
        in
        extern print_int(Ti3)
        ");
    }

    #[test]
    fn boolean_value_is_compared_with_false() {
        // let b = true in print_int(if b then 1 else 0)
        let e = ast::Expr::let_(
            "b",
            ast::Expr::Bool(true),
            print(ast::Expr::if_(ast::Expr::var("b"), ast::Expr::Int(1), ast::Expr::Int(0))),
        );
        let knf = lower(e);
        let Expr::Let((b, ty), bound, body) = knf else {
            panic!("expected a let");
        };
        assert_eq!((b.as_str(), ty), ("b", MirType::Bool));
        assert_eq!(*bound, Expr::Int(1));
        insta::assert_snapshot!(body.to_string(), @r"
        let Ti2: int =
          let Tb1: bool = 0 in
          if b = Tb1 then
            0
          else
            1
        in
        extern print_int(Ti2)
        ");
    }

    #[test]
    fn not_swaps_branches() {
        // print_int(if not (1 = 2) then 5 else 6)
        let cmp = ast::Expr::binary(BinOp::Eq, ast::Expr::Int(1), ast::Expr::Int(2));
        let e = print(ast::Expr::if_(
            ast::Expr::unary(UnaryOp::Not, cmp),
            ast::Expr::Int(5),
            ast::Expr::Int(6),
        ));
        let knf = lower(e);
        let Expr::Let(_, bound, _) = knf else {
            panic!("expected a let");
        };
        let Expr::Let(_, _, rest) = *bound else { panic!("expected a let") };
        let Expr::Let(_, _, test) = *rest else { panic!("expected a let") };
        assert_eq!(
            *test,
            Expr::IfEq("Ti1".into(), "Ti2".into(), Box::new(Expr::Int(6)), Box::new(Expr::Int(5)))
        );
    }

    #[test]
    fn external_array_and_function() {
        let mut ext = ext_with_print();
        ext.insert("arr".into(), Ty::array(Ty::Int));
        // print_int(arr.(0))
        let e = print(ast::Expr::get(ast::Expr::var("arr"), ast::Expr::Int(0)));
        let (knf, ty) = lower_with(e, &mut ext).unwrap();
        assert_eq!(ty, MirType::Unit);
        insta::assert_snapshot!(knf.to_string(), @r"
        let Ti3: int =
          let Ta1: int array = extern arr in
          let Ti2: int = 0 in
          Ta1.(Ti2)
        in
        extern print_int(Ti3)
        ");
    }

    #[test]
    fn array_creation_picks_float_variant() {
        // let a = Array.make 3 1.5 in ()
        let e = ast::Expr::let_(
            "a",
            ast::Expr::array(ast::Expr::Int(3), ast::Expr::Float(1.5)),
            ast::Expr::Unit,
        );
        let knf = lower(e);
        let Expr::Let((_, ty), bound, _) = knf else { panic!("expected a let") };
        assert_eq!(ty, MirType::Array(Box::new(MirType::Float)));
        let mut inner = *bound;
        while let Expr::Let(_, _, body) = inner {
            inner = *body;
        }
        assert_eq!(
            inner,
            Expr::ExtFunApp("create_float_array".into(), vec!["Ti1".into(), "Td2".into()])
        );
    }

    #[test]
    fn seq_binds_unit_temporary() {
        // print_int(1); print_int(2)
        let e = ast::Expr::seq(print(ast::Expr::Int(1)), print(ast::Expr::Int(2)));
        let knf = lower(e);
        let Expr::Let((tmp, ty), _, _) = &knf else { panic!("expected a let") };
        assert!(tmp.starts_with("Tu"));
        assert_eq!(*ty, MirType::Unit);
    }

    #[test]
    fn local_function_call_is_app() {
        // let rec f x = x + 1 in print_int(f 2)
        let e = ast::Expr::let_rec(
            "f",
            &["x"],
            ast::Expr::binary(BinOp::Add, ast::Expr::var("x"), ast::Expr::Int(1)),
            print(ast::Expr::call("f", vec![ast::Expr::Int(2)])),
        );
        let Expr::LetRec(fundef, cont) = lower(e) else { panic!("expected let rec") };
        assert_eq!(fundef.ty, MirType::Fun(vec![MirType::Int], Box::new(MirType::Int)));
        assert_eq!(fundef.args, vec![("x".to_string(), MirType::Int)]);
        insta::assert_snapshot!(cont.to_string(), @r"
        let Ti3: int =
          let Ti2: int = 2 in
          f(Ti2)
        in
        extern print_int(Ti3)
        ");
    }

    #[test]
    fn unresolved_reference_is_an_error() {
        // x is assumed external with type Int, which is not an array.
        let e = print(ast::Expr::var("x"));
        let err = lower_with(e, &mut ext_with_print()).unwrap_err();
        assert_eq!(err, LowerError::UnresolvedReference { name: "x".into() });
    }

    #[test]
    fn non_function_external_call_is_an_error() {
        let mut ext = ext_with_print();
        let e = print(ast::Expr::Int(1));
        let typed = minml_typeck::check(&e, &mut ext).unwrap();
        ext.insert("print_int".into(), Ty::Int);
        let err = normalize(&typed.expr, &ext, &mut IdGen::new()).unwrap_err();
        assert_eq!(err, LowerError::UnknownExternalFunction { name: "print_int".into() });
    }
}
