//! Persistent name environments.
//!
//! An [`Env`] maps names to values. Extending an environment never mutates
//! it: `insert` and `extend` return a new environment that shares every
//! existing frame with the original. Sibling branches of a traversal can
//! therefore extend the same parent independently, and a speculative
//! descent can simply drop its extended environment instead of undoing it.
//!
//! Internally the environment is a chain of frames, innermost first. Each
//! frame holds the bindings introduced together (a let, a function's formal
//! parameters, a tuple pattern). Lookups search from the innermost frame
//! outward, so later bindings shadow earlier ones.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

struct Frame<V> {
    bindings: FxHashMap<String, V>,
    parent: Option<Rc<Frame<V>>>,
}

/// An immutable, persistent mapping from names to values.
pub struct Env<V> {
    head: Option<Rc<Frame<V>>>,
}

impl<V> Env<V> {
    /// Create an empty environment.
    pub fn new() -> Self {
        Env { head: None }
    }

    /// Return a new environment with `name` bound to `value`.
    pub fn insert(&self, name: impl Into<String>, value: V) -> Env<V> {
        let mut bindings = FxHashMap::default();
        bindings.insert(name.into(), value);
        self.push_frame(bindings)
    }

    /// Return a new environment with every pair of `bindings` added as one frame.
    ///
    /// If a name appears twice in `bindings`, the last occurrence wins.
    pub fn extend<I, S>(&self, bindings: I) -> Env<V>
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
    {
        let bindings: FxHashMap<String, V> =
            bindings.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if bindings.is_empty() {
            return self.clone();
        }
        self.push_frame(bindings)
    }

    fn push_frame(&self, bindings: FxHashMap<String, V>) -> Env<V> {
        Env {
            head: Some(Rc::new(Frame {
                bindings,
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up a name, searching from the innermost frame outward.
    pub fn get(&self, name: &str) -> Option<&V> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if let Some(value) = f.bindings.get(name) {
                return Some(value);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    /// Whether `name` is bound anywhere in the environment.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether the environment has no bindings at all.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl<V> Clone for Env<V> {
    fn clone(&self) -> Self {
        Env {
            head: self.head.clone(),
        }
    }
}

impl<V> Default for Env<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for Env<V> {
    // Unlink uniquely-owned frames one at a time so that dropping a long
    // chain does not recurse once per frame.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut frame) => next = frame.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Env<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        let mut frame = self.head.as_deref();
        while let Some(fr) = frame {
            list.entry(&fr.bindings);
            frame = fr.parent.as_deref();
        }
        list.finish()
    }
}
