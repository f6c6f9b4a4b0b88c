//! Unification engine for Hindley-Milner type inference.
//!
//! Implements the type solver on top of `ena`'s union-find table. Each
//! `TyVar` is a write-once cell: binding it stores a type in the table, and
//! every later query sees the binding transparently through [`InferCtx::resolve`].
//! Binding is guarded by an occurs check so no type can refer to itself.

use ena::unify::InPlaceUnificationTable;

use crate::error::{TypeError, TypeWarning};
use crate::ty::{Ty, TyVar};

/// The inference context -- owns the unification table and the warnings.
pub struct InferCtx {
    /// The union-find unification table (ena).
    table: InPlaceUnificationTable<TyVar>,
    /// Warnings accumulated during inference and dereferencing.
    pub warnings: Vec<TypeWarning>,
}

impl InferCtx {
    /// Create a new, empty inference context.
    pub fn new() -> Self {
        InferCtx {
            table: InPlaceUnificationTable::new(),
            warnings: Vec::new(),
        }
    }

    /// Record a warning and forward it to the logger.
    pub fn warn(&mut self, warning: TypeWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    // ── Type Variable Creation ──────────────────────────────────────────

    /// Create a fresh, unbound type variable.
    pub fn fresh_var(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve a type by following union-find indirection.
    ///
    /// Bound variables are replaced by their contents, recursively.
    /// Unbound variables are normalized to the root of their equivalence
    /// class so that two unified-but-unbound variables compare equal.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(v) {
                Some(inner) => self.resolve(inner),
                None => Ty::Var(self.table.find(v)),
            },
            Ty::Fun(params, ret) => {
                let params = params.into_iter().map(|p| self.resolve(p)).collect();
                let ret = Box::new(self.resolve(*ret));
                Ty::Fun(params, ret)
            }
            Ty::Tuple(elems) => Ty::Tuple(elems.into_iter().map(|e| self.resolve(e)).collect()),
            Ty::Array(elem) => Ty::Array(Box::new(self.resolve(*elem))),
            other => other,
        }
    }

    // ── Occurs Check ────────────────────────────────────────────────────

    /// Check if a type variable occurs anywhere within a type.
    ///
    /// This prevents infinite types like `a ~ (a) -> Int`.
    pub fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => {
                if self.table.unioned(*v, var) {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in(var, &inner),
                    None => false,
                }
            }
            Ty::Unit | Ty::Bool | Ty::Int | Ty::Float => false,
            Ty::Fun(params, ret) => {
                params.iter().any(|p| self.occurs_in(var, p)) || self.occurs_in(var, ret)
            }
            Ty::Tuple(elems) => elems.iter().any(|e| self.occurs_in(var, e)),
            Ty::Array(elem) => self.occurs_in(var, elem),
        }
    }

    // ── Unification ─────────────────────────────────────────────────────

    /// Unify two types, making them equal.
    ///
    /// Both types are first resolved through the union-find table, then
    /// structurally compared. Unbound variables are bound as needed; the
    /// first shape mismatch aborts with a `TypeError`.
    pub fn unify(&mut self, a: Ty, b: Ty) -> Result<(), TypeError> {
        let a = self.resolve(a);
        let b = self.resolve(b);

        match (a, b) {
            (Ty::Unit, Ty::Unit)
            | (Ty::Bool, Ty::Bool)
            | (Ty::Int, Ty::Int)
            | (Ty::Float, Ty::Float) => Ok(()),

            // Two identical variables -- already unified.
            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),

            // Variable meets variable -- union them.
            (Ty::Var(v1), Ty::Var(v2)) => {
                self.table
                    .unify_var_var(v1, v2)
                    .expect("unifying two unbound vars should not fail");
                Ok(())
            }

            // Variable meets concrete type -- bind the variable (with occurs check).
            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    return Err(TypeError::InfiniteType { var: v, ty });
                }
                self.table
                    .unify_var_value(v, Some(ty))
                    .expect("binding an unbound var after occurs check should not fail");
                Ok(())
            }

            // Function types -- unify params pairwise, then return types.
            (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) => {
                if p1.len() != p2.len() {
                    return Err(TypeError::ArityMismatch {
                        expected: p1.len(),
                        found: p2.len(),
                        expected_ty: Ty::Fun(p1, r1),
                        found_ty: Ty::Fun(p2, r2),
                    });
                }
                for (a, b) in p1.into_iter().zip(p2) {
                    self.unify(a, b)?;
                }
                self.unify(*r1, *r2)
            }

            // Tuple types -- unify element-wise.
            (Ty::Tuple(e1), Ty::Tuple(e2)) => {
                if e1.len() != e2.len() {
                    return Err(TypeError::ArityMismatch {
                        expected: e1.len(),
                        found: e2.len(),
                        expected_ty: Ty::Tuple(e1),
                        found_ty: Ty::Tuple(e2),
                    });
                }
                for (a, b) in e1.into_iter().zip(e2) {
                    self.unify(a, b)?;
                }
                Ok(())
            }

            (Ty::Array(e1), Ty::Array(e2)) => self.unify(*e1, *e2),

            // Everything else is a mismatch.
            (expected, found) => Err(TypeError::Mismatch { expected, found }),
        }
    }

    // ── Dereferencing ───────────────────────────────────────────────────

    /// Fully resolve a type for the typed tree.
    ///
    /// Every variable is replaced by its binding. A variable that is still
    /// unbound is bound to `Int` (with a warning) so that all later
    /// occurrences of it agree.
    pub fn deref(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(v) {
                Some(inner) => self.deref(inner),
                None => {
                    let root = self.table.find(v);
                    self.warn(TypeWarning::DefaultedToInt { var: root });
                    self.table
                        .unify_var_value(root, Some(Ty::Int))
                        .expect("binding an unbound var to Int should not fail");
                    Ty::Int
                }
            },
            Ty::Fun(params, ret) => {
                let params = params.into_iter().map(|p| self.deref(p)).collect();
                let ret = Box::new(self.deref(*ret));
                Ty::Fun(params, ret)
            }
            Ty::Tuple(elems) => Ty::Tuple(elems.into_iter().map(|e| self.deref(e)).collect()),
            Ty::Array(elem) => Ty::Array(Box::new(self.deref(*elem))),
            other => other,
        }
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_types(ctx: &mut InferCtx) -> Vec<Ty> {
        let a = ctx.fresh_var();
        vec![
            Ty::Unit,
            Ty::Bool,
            Ty::Int,
            Ty::Float,
            Ty::fun(vec![Ty::Int], Ty::Int),
            Ty::fun(vec![Ty::Int, Ty::Int], Ty::Int),
            Ty::fun(vec![Ty::Float], Ty::Bool),
            Ty::Tuple(vec![Ty::Int, Ty::Float]),
            Ty::Tuple(vec![Ty::Int]),
            Ty::array(Ty::Int),
            Ty::array(Ty::Float),
            Ty::fun(vec![a.clone()], Ty::Int),
            a,
        ]
    }

    #[test]
    fn unify_two_fresh_vars() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();

        assert!(ctx.unify(a.clone(), b.clone()).is_ok());

        // After unification, binding one to Int should make both resolve to Int.
        assert!(ctx.unify(a.clone(), Ty::Int).is_ok());
        assert_eq!(ctx.resolve(a), Ty::Int);
        assert_eq!(ctx.resolve(b), Ty::Int);
    }

    #[test]
    fn unify_var_with_itself_is_a_no_op() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        assert!(ctx.unify(a.clone(), a.clone()).is_ok());
        assert!(matches!(ctx.resolve(a), Ty::Var(_)));
    }

    #[test]
    fn bound_var_is_transparent() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        ctx.unify(a.clone(), Ty::Float).unwrap();

        assert!(ctx.unify(a.clone(), Ty::Float).is_ok());
        assert!(matches!(
            ctx.unify(a, Ty::Int),
            Err(TypeError::Mismatch { expected: Ty::Float, found: Ty::Int })
        ));
    }

    #[test]
    fn unify_mismatch() {
        let mut ctx = InferCtx::new();
        match ctx.unify(Ty::Int, Ty::Bool).unwrap_err() {
            TypeError::Mismatch { expected, found } => {
                assert_eq!(expected, Ty::Int);
                assert_eq!(found, Ty::Bool);
            }
            other => panic!("expected Mismatch, got {:?}", other),
        }
    }

    #[test]
    fn unify_function_return_mismatch() {
        let mut ctx = InferCtx::new();
        let f1 = Ty::fun(vec![Ty::Int], Ty::Float);
        let f2 = Ty::fun(vec![Ty::Int], Ty::Bool);

        match ctx.unify(f1, f2).unwrap_err() {
            TypeError::Mismatch { expected, found } => {
                assert_eq!(expected, Ty::Float);
                assert_eq!(found, Ty::Bool);
            }
            other => panic!("expected Mismatch, got {:?}", other),
        }
    }

    #[test]
    fn unify_function_arity_mismatch() {
        let mut ctx = InferCtx::new();
        let f1 = Ty::fun(vec![Ty::Int], Ty::Int);
        let f2 = Ty::fun(vec![Ty::Int, Ty::Int], Ty::Int);

        match ctx.unify(f1, f2).unwrap_err() {
            TypeError::ArityMismatch {
                expected: 1,
                found: 2,
                ..
            } => {}
            other => panic!("expected ArityMismatch(1, 2), got {:?}", other),
        }
    }

    #[test]
    fn unify_tuples_and_arrays() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let t1 = Ty::Tuple(vec![Ty::Int, Ty::array(a.clone())]);
        let t2 = Ty::Tuple(vec![Ty::Int, Ty::array(Ty::Float)]);

        assert!(ctx.unify(t1, t2).is_ok());
        assert_eq!(ctx.resolve(a), Ty::Float);

        assert!(ctx
            .unify(Ty::Tuple(vec![Ty::Int]), Ty::Tuple(vec![Ty::Int, Ty::Int]))
            .is_err());
    }

    #[test]
    fn occurs_check_infinite_type() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();

        // Unify a ~ (a) -> Int => should detect infinite type.
        let fun = Ty::fun(vec![a.clone()], Ty::Int);
        match ctx.unify(a.clone(), fun).unwrap_err() {
            TypeError::InfiniteType { .. } => {}
            other => panic!("expected InfiniteType, got {:?}", other),
        }
        // The failed binding must not have written the cell.
        assert!(matches!(ctx.resolve(a), Ty::Var(_)));
    }

    #[test]
    fn occurs_check_through_unioned_vars() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        ctx.unify(a.clone(), b.clone()).unwrap();

        let result = ctx.unify(a, Ty::array(b));
        assert!(matches!(result, Err(TypeError::InfiniteType { .. })));
    }

    #[test]
    fn unification_is_symmetric() {
        let mut probe = InferCtx::new();
        let count = sample_types(&mut probe).len();

        for i in 0..count {
            for j in 0..count {
                let mut ctx1 = InferCtx::new();
                let tys1 = sample_types(&mut ctx1);
                let forward = ctx1.unify(tys1[i].clone(), tys1[j].clone()).is_ok();

                let mut ctx2 = InferCtx::new();
                let tys2 = sample_types(&mut ctx2);
                let backward = ctx2.unify(tys2[j].clone(), tys2[i].clone()).is_ok();

                assert_eq!(
                    forward, backward,
                    "unify({}, {}) and its mirror disagree",
                    tys1[i], tys1[j]
                );
            }
        }
    }

    #[test]
    fn deref_defaults_unbound_vars_to_int() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        ctx.unify(a.clone(), b.clone()).unwrap();

        let ty = Ty::Tuple(vec![a.clone(), Ty::fun(vec![b], Ty::Float)]);
        assert_eq!(
            ctx.deref(ty),
            Ty::Tuple(vec![Ty::Int, Ty::fun(vec![Ty::Int], Ty::Float)])
        );
        // One warning for the whole equivalence class.
        assert_eq!(ctx.warnings.len(), 1);
        assert!(matches!(ctx.warnings[0], TypeWarning::DefaultedToInt { .. }));
        assert_eq!(ctx.resolve(a), Ty::Int);
    }

    #[test]
    fn deref_keeps_bound_vars() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        ctx.unify(Ty::array(a.clone()), Ty::array(Ty::Bool)).unwrap();
        assert_eq!(ctx.deref(Ty::array(a)), Ty::array(Ty::Bool));
        assert!(ctx.warnings.is_empty());
    }
}
