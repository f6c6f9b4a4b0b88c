//! Fresh-name generation.
//!
//! Every stage that introduces a binding asks an [`IdGen`] for a new name.
//! The generator owns one monotonically increasing counter shared by all
//! kinds of names, so two names produced by the same generator never
//! collide. A compiler driver owns one generator per compilation unit and
//! calls [`IdGen::reset`] before starting a new one.

/// Produces globally unique names within one compilation unit.
#[derive(Debug, Default)]
pub struct IdGen {
    counter: u32,
}

impl IdGen {
    /// Create a generator whose first name uses suffix `1`.
    pub fn new() -> Self {
        IdGen { counter: 0 }
    }

    /// Reset the counter for a new compilation unit.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Number of names produced since the last reset.
    pub fn count(&self) -> u32 {
        self.counter
    }

    fn next(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// A fresh variant of `base`, rendered as `base.N`.
    ///
    /// A previous `.N` suffix on `base` is dropped first, so renaming an
    /// already-renamed variable yields `x.7` rather than `x.3.7`.
    pub fn gen_id(&mut self, base: &str) -> String {
        let n = self.next();
        format!("{}.{}", strip_suffix(base), n)
    }

    /// A fresh temporary whose name carries a one-letter type tag, e.g. `Ti4`.
    pub fn gen_tmp(&mut self, tag: char) -> String {
        let n = self.next();
        format!("T{}{}", tag, n)
    }
}

/// Strip a trailing `.<digits>` suffix added by [`IdGen::gen_id`].
pub fn strip_suffix(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, digits))
            if !base.is_empty()
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}
