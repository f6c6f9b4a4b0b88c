//! MinML middle end: from the typed tree to closure-converted code.
//!
//! # Architecture
//!
//! - [`types`]: Concrete types of the middle IR (MirType)
//! - [`knf`]: K-normal form, the IR all rewrite passes work on
//! - [`lower`]: Typed tree to K-normal form
//! - [`opt`]: The fixpoint rewrite pipeline
//! - [`closure`]: Closure conversion to flat top-level functions
//! - [`error`]: Lowering and compile errors
//!
//! [`compile`] runs type checking and every stage of this crate in order.

pub mod closure;
pub mod error;
pub mod knf;
pub mod lower;
pub mod opt;
pub mod types;

use log::info;
use minml_common::IdGen;
use minml_typeck::ast;
use minml_typeck::ExtEnv;

use crate::error::CompileError;
use crate::opt::OptConfig;

/// Compile a program down to closure-converted form.
///
/// Resets `gen` before starting, so names in the output only depend on the
/// input program. `ext` receives the types of every external symbol the
/// program uses.
///
/// # Errors
///
/// Returns the first type or lowering error; no partial output is produced.
pub fn compile(
    expr: &ast::Expr,
    ext: &mut ExtEnv,
    config: &OptConfig,
    gen: &mut IdGen,
) -> Result<closure::Program, CompileError> {
    gen.reset();

    info!("type checking");
    let typed = minml_typeck::check(expr, ext)?;

    info!("K-normalizing");
    let (knf, _) = lower::normalize(&typed.expr, ext, gen)?;

    info!("optimizing");
    let knf = opt::optimize(knf, config, gen);

    info!("closure converting");
    let program = closure::convert(&knf);
    info!(
        "compiled into {} top-level function(s)",
        program.fundefs.len()
    );
    Ok(program)
}
