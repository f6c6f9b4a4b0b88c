//! Shared infrastructure for the MinML middle end.
//!
//! - [`fresh`]: the fresh-name generator threaded through every stage that
//!   introduces bindings
//! - [`env`]: immutable, persistent name environments

pub mod env;
pub mod fresh;

pub use env::Env;
pub use fresh::IdGen;
