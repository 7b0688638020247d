// SPDX-License-Identifier: MIT

//! Graph-to-expression compiler
//!
//! This module provides:
//! - `generate` - compile a project into one optimized `WHEN` expression
//! - `Compiler` - per-run state: dependency graph, memo tables, simplifier
//!
//! Stages run leaves first: graph builder, logic/value evaluator, condition
//! context propagation, value resolution, output synthesis, simplification and
//! printing.

pub mod ast;
mod context;
mod evaluator;
pub mod graph;
pub mod optimizer;
pub mod printer;
mod resolver;
mod synth;

use std::collections::{HashMap, HashSet};

use crate::config::CompilerOptions;
use crate::error::SigcodeError;
use crate::formula::Expander;
use crate::project::{Project, TemplateSet};

pub use ast::{ArithOp, CmpOp, Condition, Expr};
pub use graph::{DependencyGraph, NodeId};
pub use optimizer::Simplifier;
pub use resolver::{Resolution, Variant};

/// Text returned for a project without `Output` elements
pub const NO_OUTPUTS: &str = "/* Нет выходов */";

/// Compile `project` with default options
pub fn generate(project: &Project, templates: &TemplateSet) -> String {
    generate_with_options(project, templates, &CompilerOptions::default())
}

/// Compile `project` into expression text
///
/// Never fails: errors are rendered as `/* Ошибка: <message> */`.
pub fn generate_with_options(
    project: &Project,
    templates: &TemplateSet,
    options: &CompilerOptions,
) -> String {
    if project.outputs().next().is_none() {
        return NO_OUTPUTS.to_string();
    }
    match Compiler::new(project, templates, options).compile() {
        Ok(code) => code,
        Err(e) => {
            log::warn!("Code generation failed: {}", e);
            format!("/* Ошибка: {} */", e)
        }
    }
}

/// Results of one memoized evaluation stage
///
/// A result is stored only when no cycle placeholder was used while
/// computing it (tracked by `Compiler::cycle_hits`).
struct Memo<T> {
    done: HashMap<NodeId, T>,
    visiting: HashSet<NodeId>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            done: HashMap::new(),
            visiting: HashSet::new(),
        }
    }
}

/// State of a single compile
///
/// Nothing here outlives [`Compiler::compile`], so independent compiles never
/// share caches or recursion counters.
pub struct Compiler<'p> {
    project: &'p Project,
    graph: DependencyGraph<'p>,
    expander: Expander<'p>,
    simplifier: Simplifier,
    logic: Memo<Condition>,
    values: Memo<Expr>,
    contexts: Memo<Option<Condition>>,
    resolutions: Memo<Resolution>,
    /// Cycle placeholders handed out so far, across every memo table
    cycle_hits: usize,
}

impl<'p> Compiler<'p> {
    pub fn new(project: &'p Project, templates: &'p TemplateSet, options: &CompilerOptions) -> Self {
        Self {
            project,
            graph: DependencyGraph::new(project),
            expander: Expander::new(project, templates, options.max_expansion_depth),
            simplifier: Simplifier::from_options(options),
            logic: Memo::default(),
            values: Memo::default(),
            contexts: Memo::default(),
            resolutions: Memo::default(),
            cycle_hits: 0,
        }
    }

    /// Compile every output into one expression
    pub fn compile(mut self) -> Result<String, SigcodeError> {
        let variants = self.collect_variants()?;
        if variants.is_empty() {
            return Ok("0".to_string());
        }
        let folded = synth::fold_variants(variants);
        let simplified = self.simplifier.simplify_expr(folded);
        Ok(printer::cleanup_parentheses(&simplified.to_string()))
    }

    /// `(condition, expression)` contributed by element `id`
    pub fn resolve(&mut self, id: &str) -> Result<Resolution, SigcodeError> {
        match self.graph.build(id) {
            Some(node) => self.eval_graph_value(node),
            None => Ok(Resolution::Unresolved),
        }
    }
}
