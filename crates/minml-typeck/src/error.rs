//! Type errors and warnings.
//!
//! Type errors are fatal: the first one aborts inference. Warnings are
//! advisory; they are collected on the inference context and also logged.

use std::fmt;

use crate::ty::{Ty, TyVar};

/// A type error encountered during inference.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// Two types that should be equal have different shapes.
    Mismatch { expected: Ty, found: Ty },
    /// A type variable appears in the type it would be bound to.
    ///
    /// Example: unifying `a` with `(a) -> Int` would create the infinite
    /// type `(((...) -> Int) -> Int) -> Int`.
    InfiniteType { var: TyVar, ty: Ty },
    /// Two function or tuple types have a different number of components.
    ArityMismatch {
        expected: usize,
        found: usize,
        expected_ty: Ty,
        found_ty: Ty,
    },
    /// The program as a whole does not have type `Unit`.
    TopLevelNotUnit { found: Ty },
}

impl TypeError {
    /// Whether this error came from a failed unification (as opposed to the
    /// program-level `Unit` check).
    pub fn is_unify_error(&self) -> bool {
        !matches!(self, TypeError::TopLevelNotUnit { .. })
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch { expected, found } => {
                write!(f, "cannot unify `{}` with `{}`", expected, found)
            }
            TypeError::InfiniteType { var, ty } => {
                write!(f, "infinite type: ?{} occurs in `{}`", var.0, ty)
            }
            TypeError::ArityMismatch {
                expected,
                found,
                expected_ty,
                found_ty,
            } => write!(
                f,
                "cannot unify `{}` with `{}`: expected {} components, found {}",
                expected_ty, found_ty, expected, found
            ),
            TypeError::TopLevelNotUnit { found } => {
                write!(f, "top level does not have type `Unit` (found `{}`)", found)
            }
        }
    }
}

impl std::error::Error for TypeError {}

/// A non-fatal diagnostic produced during inference.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeWarning {
    /// A free variable was assumed to be an external symbol.
    AssumedExternal { name: String },
    /// A type variable was never constrained and was defaulted to `Int`.
    DefaultedToInt { var: TyVar },
}

impl fmt::Display for TypeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeWarning::AssumedExternal { name } => {
                write!(f, "free variable `{}` assumed as external", name)
            }
            TypeWarning::DefaultedToInt { var } => {
                write!(f, "uninstantiated type variable ?{} assumed to be `Int`", var.0)
            }
        }
    }
}
