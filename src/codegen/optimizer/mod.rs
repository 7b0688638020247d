// SPDX-License-Identifier: MIT

//! Boolean and arithmetic simplifier
//!
//! This module provides:
//! - `Simplifier::simplify_cond` - constant folding, De Morgan, flattening,
//!   contradiction detection, interval subsumption and absorption
//! - `Simplifier::simplify_expr` - arithmetic identities, `WHEN` collapsing and
//!   nested-`WHEN` context pruning
//!
//! Both share one recursion budget. When it runs out the sub-tree is returned
//! unsimplified.

mod cond;
mod expr;
pub mod interval;

use crate::config::CompilerOptions;

/// Per-compile simplifier state
#[derive(Debug, Clone)]
pub struct Simplifier {
    depth: usize,
    max_depth: usize,
}

impl Simplifier {
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    pub fn from_options(options: &CompilerOptions) -> Self {
        Self::new(options.max_simplify_depth)
    }

    /// Run `f` one level deeper, or return `value` unchanged past the limit
    fn guarded<T>(&mut self, value: T, f: impl FnOnce(&mut Self, T) -> T) -> T {
        if self.depth >= self.max_depth {
            log::debug!("Simplifier depth limit {} reached", self.max_depth);
            return value;
        }
        self.depth += 1;
        let result = f(self, value);
        self.depth -= 1;
        result
    }

    /// Current nesting depth; zero between top-level calls
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::from_options(&CompilerOptions::default())
    }
}
