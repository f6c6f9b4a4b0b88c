//! Type representation for the MinML type system.
//!
//! Defines the core `Ty` enum and type variables (`TyVar`). A type variable
//! is a write-once cell: it starts unbound and is bound at most once by
//! unification. The cells live in `ena`'s union-find table owned by
//! [`InferCtx`](crate::unify::InferCtx); a `TyVar` is only a key into it.

use std::fmt;

/// A type variable, identified by a `u32` index into the unification table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// A MinML type.
///
/// - `Unit`, `Bool`, `Int`, `Float`: primitive types
/// - `Fun`: a function type (params -> return)
/// - `Tuple`: a tuple type
/// - `Array`: a mutable array with elements of one type
/// - `Var`: an inference variable (to be resolved by unification)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Unit,
    Bool,
    Int,
    Float,
    /// A function type: `(param_types) -> return_type`.
    Fun(Vec<Ty>, Box<Ty>),
    /// A tuple type: `(Int, Float, Bool)`.
    Tuple(Vec<Ty>),
    /// An array type: `Array<Float>`.
    Array(Box<Ty>),
    /// A type variable (unresolved during inference).
    Var(TyVar),
}

impl Ty {
    /// Create a function type.
    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Fun(params, Box::new(ret))
    }

    /// Create an array type.
    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    /// Whether the type mentions no type variables at all.
    pub fn is_ground(&self) -> bool {
        match self {
            Ty::Unit | Ty::Bool | Ty::Int | Ty::Float => true,
            Ty::Fun(params, ret) => params.iter().all(Ty::is_ground) && ret.is_ground(),
            Ty::Tuple(elems) => elems.iter().all(Ty::is_ground),
            Ty::Array(elem) => elem.is_ground(),
            Ty::Var(_) => false,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, tys: &[Ty]) -> fmt::Result {
    for (i, t) in tys.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", t)?;
    }
    Ok(())
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unit => write!(f, "Unit"),
            Ty::Bool => write!(f, "Bool"),
            Ty::Int => write!(f, "Int"),
            Ty::Float => write!(f, "Float"),
            Ty::Fun(params, ret) => {
                write!(f, "(")?;
                write_list(f, params)?;
                write!(f, ") -> {}", ret)
            }
            Ty::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                write!(f, ")")
            }
            Ty::Array(elem) => write!(f, "Array<{}>", elem),
            Ty::Var(v) => write!(f, "?{}", v.0),
        }
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}
