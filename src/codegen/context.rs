// SPDX-License-Identifier: MIT

//! Condition context: the guards enclosing a node

use super::ast::Condition;
use super::graph::NodeId;
use super::Compiler;
use crate::error::SigcodeError;
use crate::project::{ElementKind, Port};

impl<'p> Compiler<'p> {
    /// Conjunction of every guard reaching `node` through `cond-0` chains
    ///
    /// A separator also inherits the context of its value input. `None`
    /// means unconstrained.
    pub(super) fn collect_all_cond(&mut self, node: NodeId) -> Result<Option<Condition>, SigcodeError> {
        if let Some(done) = self.contexts.done.get(&node) {
            return Ok(done.clone());
        }
        if !self.contexts.visiting.insert(node) {
            log::debug!("Condition cycle through {}", self.graph.element(node).id);
            self.cycle_hits += 1;
            return Ok(None);
        }
        let hits = self.cycle_hits;
        let result = self.context_of(node);
        self.contexts.visiting.remove(&node);

        let context = result?;
        if self.cycle_hits == hits {
            self.contexts.done.insert(node, context.clone());
        }
        Ok(context)
    }

    fn context_of(&mut self, node: NodeId) -> Result<Option<Condition>, SigcodeError> {
        let mut context = None;

        if let Some(edge) = self.graph.cond_input(node) {
            let own = self.cond_from_port(edge.node, edge.from_port())?;
            let upstream = self.collect_all_cond(edge.node)?;
            context = Condition::and_opt(own, upstream);
        }

        if matches!(self.graph.element(node).kind, ElementKind::Separator) {
            if let Some(input) = self.graph.input(node, 0) {
                let inherited = self.collect_all_cond(input)?;
                context = Condition::and_opt(context, inherited);
            }
        }

        Ok(context)
    }

    /// Condition exposed by `source` on its output `port`
    ///
    /// Separators expose their input on `out-0` and its negation on `out-1`.
    /// Elements that are not logical expose nothing.
    pub(super) fn cond_from_port(
        &mut self,
        source: NodeId,
        port: &Port,
    ) -> Result<Option<Condition>, SigcodeError> {
        match self.graph.element(source).kind {
            ElementKind::Separator => {
                let logic = match self.graph.input(source, 0) {
                    Some(input) => self.eval_logic(input)?,
                    None => Condition::True,
                };
                Ok(match port {
                    Port::Out(0) => Some(logic),
                    Port::Out(1) => Some(Condition::not(logic)),
                    _ => None,
                })
            }
            ElementKind::And(_)
            | ElementKind::Or(_)
            | ElementKind::Not
            | ElementKind::If(_)
            | ElementKind::Range(_) => Ok(Some(self.eval_logic(source)?)),
            _ => Ok(None),
        }
    }
}
