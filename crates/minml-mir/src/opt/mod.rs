//! The K-normal form rewrite pipeline.
//!
//! Six passes run in a fixed order once per round:
//!
//! - [`alpha`]: give every binder a globally unique name
//! - [`beta`]: copy propagation of `let x = y`
//! - [`assoc`]: flatten lets nested in a let-bound position
//! - [`inline`]: expand calls to small functions
//! - [`const_fold`]: evaluate operations on known literals
//! - [`elim`]: drop unused effect-free bindings
//!
//! The input is renamed once before the first round, so binders are unique
//! even when no round runs. Rounds then repeat until one leaves the tree
//! unchanged (up to the renaming done by [`alpha`]) or the configured
//! iteration bound is reached.

pub mod alpha;
pub mod assoc;
pub mod beta;
pub mod const_fold;
pub mod elim;
pub mod inline;

use std::path::Path;

use log::debug;
use minml_common::IdGen;
use serde::{Deserialize, Serialize};

use crate::knf::{alpha_eq, Expr};

/// Tuning knobs of the rewrite pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptConfig {
    /// Functions whose body has at most this many nodes are inlined.
    pub inline_threshold: usize,
    /// Upper bound on the number of rounds.
    pub max_iterations: usize,
}

impl Default for OptConfig {
    fn default() -> Self {
        OptConfig {
            inline_threshold: 10,
            max_iterations: 1000,
        }
    }
}

impl OptConfig {
    /// Parse a configuration from a flat TOML table. Missing keys keep
    /// their defaults.
    pub fn from_toml_str(content: &str) -> Result<OptConfig, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<OptConfig, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }
}

/// Run one round of all six passes.
fn round(e: Expr, config: &OptConfig, gen: &mut IdGen) -> Expr {
    let e = alpha::rename(e, gen);
    let e = beta::propagate(e);
    let e = assoc::flatten(e);
    let e = inline::expand(e, config.inline_threshold, gen);
    let e = const_fold::fold(e);
    elim::eliminate(e)
}

/// Optimize a K-normal form program.
///
/// Always halts after at most `config.max_iterations` rounds. Stopping at
/// the bound does not mean a fixpoint was reached. Every binder of the
/// result is unique, whatever the bound.
pub fn optimize(e: Expr, config: &OptConfig, gen: &mut IdGen) -> Expr {
    let mut current = alpha::rename(e, gen);
    for iteration in 1..=config.max_iterations {
        let next = round(current.clone(), config, gen);
        if alpha_eq(&next, &current) {
            debug!("optimizer reached a fixpoint after {} iteration(s)", iteration);
            return next;
        }
        current = next;
    }
    debug!(
        "optimizer stopped at the iteration bound ({})",
        config.max_iterations
    );
    current
}
