//! MinML type checker: Hindley-Milner type inference.
//!
//! This crate assigns a type to every node of a MinML program and resolves
//! the types of external symbols the program refers to.
//!
//! # Architecture
//!
//! - [`ty`]: Core type representation (Ty, TyVar)
//! - [`ast`]: The untyped input tree
//! - [`tast`]: The typed output tree
//! - [`unify`]: Unification engine with occurs check
//! - [`error`]: Type errors and warnings
//! - [`infer`]: The inference walk

pub mod ast;
pub mod error;
pub mod infer;
pub mod tast;
pub mod ty;
pub mod unify;

pub use infer::ExtEnv;

use crate::error::{TypeError, TypeWarning};
use crate::tast::TypedExpr;

/// The result of type checking a MinML program.
#[derive(Debug)]
pub struct TypeckResult {
    /// The fully typed program; its type is `Unit`.
    pub expr: TypedExpr,
    /// Non-fatal diagnostics (assumed externals, defaulted variables).
    pub warnings: Vec<TypeWarning>,
}

/// Type-check a program.
///
/// This is the main entry point for the type checker. `ext` holds the types
/// of external symbols; it may be pre-populated, and any free name the
/// program uses is added to it.
///
/// # Errors
///
/// Returns the first `TypeError` encountered.
pub fn check(expr: &ast::Expr, ext: &mut ExtEnv) -> Result<TypeckResult, TypeError> {
    infer::infer(expr, ext)
}
