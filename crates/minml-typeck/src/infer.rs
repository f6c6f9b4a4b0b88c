//! The type inference pass.
//!
//! Walks the input tree once in post order, threading an immutable
//! `name -> Ty` environment, and emits unification constraints as it goes.
//! Names that are bound nowhere in the program are treated as external
//! symbols and recorded in the caller's [`ExtEnv`].
//!
//! Inference is fail-fast: the first `TypeError` aborts the pass and no
//! partial tree is returned.

use minml_common::Env;
use rustc_hash::FxHashMap;

use crate::ast::{BinOp, Binder, Expr, FunDef, UnaryOp};
use crate::error::{TypeError, TypeWarning};
use crate::tast::{Binding, ExprKind, TypedExpr, TypedFunDef};
use crate::ty::{Ty, TyVar};
use crate::unify::InferCtx;
use crate::TypeckResult;

/// Types of external symbols (names used but not bound in the program).
///
/// The table is shared with later stages: the K-normalizer consults it to
/// tell external arrays and external functions apart.
pub type ExtEnv = FxHashMap<String, Ty>;

struct Infer<'a> {
    ctx: InferCtx,
    ext: &'a mut ExtEnv,
    /// Caller-supplied variables mapped to keys of `ctx`.
    imported: FxHashMap<TyVar, Ty>,
}

impl<'a> Infer<'a> {
    /// Replace every variable of a caller-supplied type by a variable of
    /// this context. The same foreign variable always maps to the same one.
    fn import(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => {
                if let Some(t) = self.imported.get(&v) {
                    return t.clone();
                }
                let t = self.ctx.fresh_var();
                self.imported.insert(v, t.clone());
                t
            }
            Ty::Fun(params, ret) => {
                let params = params.into_iter().map(|p| self.import(p)).collect();
                Ty::fun(params, self.import(*ret))
            }
            Ty::Tuple(elems) => Ty::Tuple(elems.into_iter().map(|e| self.import(e)).collect()),
            Ty::Array(elem) => Ty::array(self.import(*elem)),
            Ty::Unit | Ty::Bool | Ty::Int | Ty::Float => ty,
        }
    }

    fn binder(&mut self, b: &Binder) -> Binding {
        let ty = match &b.ty {
            Some(ty) => self.import(ty.clone()),
            None => self.ctx.fresh_var(),
        };
        Binding::new(b.name.clone(), ty)
    }

    fn expect(&mut self, expected: Ty, e: &TypedExpr) -> Result<(), TypeError> {
        self.ctx.unify(expected, e.ty.clone())
    }

    fn infer_var(&mut self, env: &Env<Ty>, name: &str) -> Ty {
        if let Some(ty) = env.get(name) {
            return ty.clone();
        }
        if let Some(ty) = self.ext.get(name) {
            return ty.clone();
        }
        self.ctx.warn(TypeWarning::AssumedExternal {
            name: name.to_string(),
        });
        let ty = self.ctx.fresh_var();
        self.ext.insert(name.to_string(), ty.clone());
        ty
    }

    fn infer_expr(&mut self, env: &Env<Ty>, expr: &Expr) -> Result<TypedExpr, TypeError> {
        let (kind, ty) = match expr {
            Expr::Unit => (ExprKind::Unit, Ty::Unit),
            Expr::Bool(b) => (ExprKind::Bool(*b), Ty::Bool),
            Expr::Int(n) => (ExprKind::Int(*n), Ty::Int),
            Expr::Float(d) => (ExprKind::Float(*d), Ty::Float),

            Expr::Unary(op, e) => {
                let e = self.infer_expr(env, e)?;
                let ty = match op {
                    UnaryOp::Not => Ty::Bool,
                    UnaryOp::Neg => Ty::Int,
                    UnaryOp::FNeg => Ty::Float,
                };
                self.expect(ty.clone(), &e)?;
                (ExprKind::Unary(*op, Box::new(e)), ty)
            }

            Expr::Binary(op, lhs, rhs) => {
                let l = self.infer_expr(env, lhs)?;
                let r = self.infer_expr(env, rhs)?;
                let ty = match op {
                    BinOp::Add | BinOp::Sub => {
                        self.expect(Ty::Int, &l)?;
                        self.expect(Ty::Int, &r)?;
                        Ty::Int
                    }
                    BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv => {
                        self.expect(Ty::Float, &l)?;
                        self.expect(Ty::Float, &r)?;
                        Ty::Float
                    }
                    BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Ge | BinOp::Lt | BinOp::Gt => {
                        self.ctx.unify(l.ty.clone(), r.ty.clone())?;
                        Ty::Bool
                    }
                };
                (ExprKind::Binary(*op, Box::new(l), Box::new(r)), ty)
            }

            Expr::If(cond, then, else_) => {
                let c = self.infer_expr(env, cond)?;
                self.expect(Ty::Bool, &c)?;
                let t = self.infer_expr(env, then)?;
                let e = self.infer_expr(env, else_)?;
                self.ctx.unify(t.ty.clone(), e.ty.clone())?;
                let ty = t.ty.clone();
                (ExprKind::If(Box::new(c), Box::new(t), Box::new(e)), ty)
            }

            Expr::Let(binder, bound, body) => {
                let b = self.binder(binder);
                let e1 = self.infer_expr(env, bound)?;
                self.expect(b.ty.clone(), &e1)?;
                let e2 = self.infer_expr(&env.insert(b.name.clone(), b.ty.clone()), body)?;
                let ty = e2.ty.clone();
                (ExprKind::Let(b, Box::new(e1), Box::new(e2)), ty)
            }

            Expr::Var(name) => (ExprKind::Var(name.clone()), self.infer_var(env, name)),

            Expr::LetRec(fundef, cont) => {
                let (fundef, fun_env) = self.infer_fundef(env, fundef)?;
                let e = self.infer_expr(&fun_env, cont)?;
                let ty = e.ty.clone();
                (ExprKind::LetRec(fundef, Box::new(e)), ty)
            }

            Expr::App(fun, args) => {
                let f = self.infer_expr(env, fun)?;
                let args = args
                    .iter()
                    .map(|a| self.infer_expr(env, a))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.ctx.fresh_var();
                let expected = Ty::fun(args.iter().map(|a| a.ty.clone()).collect(), ret.clone());
                self.ctx.unify(f.ty.clone(), expected)?;
                (ExprKind::App(Box::new(f), args), ret)
            }

            Expr::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| self.infer_expr(env, e))
                    .collect::<Result<Vec<_>, _>>()?;
                let ty = Ty::Tuple(elems.iter().map(|e| e.ty.clone()).collect());
                (ExprKind::Tuple(elems), ty)
            }

            Expr::LetTuple(pat, bound, body) => {
                let pat: Vec<Binding> = pat.iter().map(|b| self.binder(b)).collect();
                let e1 = self.infer_expr(env, bound)?;
                self.expect(Ty::Tuple(pat.iter().map(|b| b.ty.clone()).collect()), &e1)?;
                let body_env = env.extend(pat.iter().map(|b| (b.name.clone(), b.ty.clone())));
                let e2 = self.infer_expr(&body_env, body)?;
                let ty = e2.ty.clone();
                (ExprKind::LetTuple(pat, Box::new(e1), Box::new(e2)), ty)
            }

            Expr::Array(len, init) => {
                let len = self.infer_expr(env, len)?;
                self.expect(Ty::Int, &len)?;
                let init = self.infer_expr(env, init)?;
                let ty = Ty::array(init.ty.clone());
                (ExprKind::Array(Box::new(len), Box::new(init)), ty)
            }

            Expr::Get(array, index) => {
                let elem = self.ctx.fresh_var();
                let a = self.infer_expr(env, array)?;
                self.expect(Ty::array(elem.clone()), &a)?;
                let i = self.infer_expr(env, index)?;
                self.expect(Ty::Int, &i)?;
                (ExprKind::Get(Box::new(a), Box::new(i)), elem)
            }

            Expr::Put(array, index, value) => {
                let elem = self.ctx.fresh_var();
                let a = self.infer_expr(env, array)?;
                self.expect(Ty::array(elem.clone()), &a)?;
                let i = self.infer_expr(env, index)?;
                self.expect(Ty::Int, &i)?;
                let v = self.infer_expr(env, value)?;
                self.expect(elem, &v)?;
                (
                    ExprKind::Put(Box::new(a), Box::new(i), Box::new(v)),
                    Ty::Unit,
                )
            }

            Expr::Seq(first, second) => {
                let e1 = self.infer_expr(env, first)?;
                self.expect(Ty::Unit, &e1)?;
                let e2 = self.infer_expr(env, second)?;
                let ty = e2.ty.clone();
                (ExprKind::Seq(Box::new(e1), Box::new(e2)), ty)
            }
        };
        Ok(TypedExpr::new(kind, ty))
    }

    /// Infer a function definition. Returns the typed definition and the
    /// environment in which its continuation is checked (the function name
    /// bound, formals not).
    fn infer_fundef(
        &mut self,
        env: &Env<Ty>,
        fundef: &FunDef,
    ) -> Result<(TypedFunDef, Env<Ty>), TypeError> {
        let name = self.binder(&fundef.name);
        let args: Vec<Binding> = fundef.args.iter().map(|a| self.binder(a)).collect();

        let fun_env = env.insert(name.name.clone(), name.ty.clone());
        let body_env = fun_env.extend(args.iter().map(|a| (a.name.clone(), a.ty.clone())));
        let body = self.infer_expr(&body_env, &fundef.body)?;

        let actual = Ty::fun(args.iter().map(|a| a.ty.clone()).collect(), body.ty.clone());
        self.ctx.unify(name.ty.clone(), actual)?;

        let fundef = TypedFunDef {
            name,
            args,
            body: Box::new(body),
        };
        Ok((fundef, fun_env))
    }
}

/// Infer types for a whole program.
///
/// On success every type in the returned tree is fully resolved, and so is
/// every entry of `ext`. Unconstrained type variables are defaulted to `Int`
/// with a warning.
///
/// Type variables in binder annotations and in pre-populated `ext` entries
/// belong to the caller; they are renamed into the inference context first.
pub fn infer(expr: &Expr, ext: &mut ExtEnv) -> Result<TypeckResult, TypeError> {
    let mut infer = Infer {
        ctx: InferCtx::new(),
        ext,
        imported: FxHashMap::default(),
    };
    let mut names: Vec<String> = infer.ext.keys().cloned().collect();
    names.sort();
    for name in names {
        if let Some(ty) = infer.ext.remove(&name) {
            let ty = infer.import(ty);
            infer.ext.insert(name, ty);
        }
    }
    let typed = infer.infer_expr(&Env::new(), expr)?;

    if infer.ctx.unify(Ty::Unit, typed.ty.clone()).is_err() {
        let found = infer.ctx.resolve(typed.ty.clone());
        return Err(TypeError::TopLevelNotUnit { found });
    }

    let Infer { mut ctx, ext, .. } = infer;
    let expr = typed.map_types(&mut |ty| ctx.deref(ty));

    let mut names: Vec<String> = ext.keys().cloned().collect();
    names.sort();
    for name in names {
        if let Some(ty) = ext.remove(&name) {
            let ty = ctx.deref(ty);
            ext.insert(name, ty);
        }
    }

    Ok(TypeckResult {
        expr,
        warnings: ctx.warnings,
    })
}
