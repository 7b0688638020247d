// SPDX-License-Identifier: MIT

//! Graph value resolution: `(condition, expression)` per value node

use super::ast::{Condition, Expr};
use super::graph::NodeId;
use super::Compiler;
use crate::error::SigcodeError;
use crate::project::ElementKind;

/// A guarded value contributed to an output
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// `None` when the value applies unconditionally
    pub cond: Option<Condition>,
    pub expr: Expr,
}

/// Outcome of resolving one node
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Value(Variant),
    /// Nothing to read, e.g. a separator with no input
    Unresolved,
    /// The node is already being resolved further up
    CycleDetected,
}

impl Resolution {
    fn value(cond: Option<Condition>, expr: Expr) -> Self {
        Resolution::Value(Variant { cond, expr })
    }

    pub fn into_variant(self) -> Option<Variant> {
        match self {
            Resolution::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<'p> Compiler<'p> {
    pub(super) fn eval_graph_value(&mut self, node: NodeId) -> Result<Resolution, SigcodeError> {
        if let Some(done) = self.resolutions.done.get(&node) {
            return Ok(done.clone());
        }
        if !self.resolutions.visiting.insert(node) {
            log::debug!("Cycle through {}, no contribution", self.graph.element(node).id);
            self.cycle_hits += 1;
            return Ok(Resolution::CycleDetected);
        }
        let hits = self.cycle_hits;
        let result = self.resolution_of(node);
        self.resolutions.visiting.remove(&node);

        let resolution = result?;
        if self.cycle_hits == hits {
            self.resolutions.done.insert(node, resolution.clone());
        }
        Ok(resolution)
    }

    fn resolution_of(&mut self, node: NodeId) -> Result<Resolution, SigcodeError> {
        let element = self.graph.element(node);
        match &element.kind {
            ElementKind::Separator => match self.graph.input(node, 0) {
                Some(input) => self.eval_graph_value(input),
                None => Ok(Resolution::Unresolved),
            },
            ElementKind::Switch(_) => {
                let context = self.collect_all_cond(node)?;
                let tree = self.eval_value(node)?;
                let expr = match context {
                    Some(c) => Expr::when(c, tree, Expr::zero()),
                    None => tree,
                };
                Ok(Resolution::value(None, expr))
            }
            ElementKind::Formula(_) => {
                let mut cond = self.collect_all_cond(node)?;
                for input in self.graph.inputs_below(node, None) {
                    if let Resolution::Value(v) = self.eval_graph_value(input)? {
                        cond = Condition::merge(cond, v.cond);
                    }
                }
                let expr = self.eval_value(node)?;
                Ok(Resolution::value(cond, expr))
            }
            ElementKind::InputSignal(_) | ElementKind::Table(_) | ElementKind::Const(_) => {
                let cond = self.collect_all_cond(node)?;
                let expr = self.eval_value(node)?;
                Ok(Resolution::value(cond, expr))
            }
            _ => {
                let cond = self.collect_all_cond(node)?;
                Ok(Resolution::value(cond, Expr::zero()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use crate::project::{Project, ProjectLoader, TemplateSet};
    use serde_json::json;

    fn conn(from: &str, from_port: &str, to: &str, to_port: &str) -> serde_json::Value {
        json!({"fromElement": from, "fromPort": from_port, "toElement": to, "toPort": to_port})
    }

    fn project(value: serde_json::Value) -> Project {
        ProjectLoader::parse_json(&value.to_string()).unwrap()
    }

    fn resolve(p: &Project, id: &str) -> Resolution {
        let templates = TemplateSet::default();
        Compiler::new(p, &templates, &CompilerOptions::default())
            .resolve(id)
            .unwrap()
    }

    fn guarded_inputs() -> Project {
        project(json!({
            "elements": {
                "a": {"type": "input-signal", "props": {"name": "A"}},
                "zero": {"type": "const", "props": {"value": 0}},
                "if-a": {"type": "if", "props": {"operator": "="}},
                "k": {"type": "const", "props": {"value": 2}},
                "formula-1": {"type": "formula", "props": {"expression": "k*3"}},
                "sw": {"type": "switch", "props": {"cases": [{"op": ">", "value": "1"}]}},
                "sep": {"type": "separator", "props": {}},
                "not-1": {"type": "not", "props": {}}
            },
            "connections": [
                conn("a", "out-0", "if-a", "in-0"), conn("zero", "out-0", "if-a", "in-1"),
                conn("if-a", "out-0", "k", "cond-0"),
                conn("k", "out-0", "formula-1", "in-0"),
                conn("a", "out-0", "sw", "in-0"), conn("k", "out-0", "sw", "in-2"),
                conn("if-a", "out-0", "sw", "cond-0"),
                conn("if-a", "out-0", "not-1", "in-0")
            ]
        }))
    }

    #[test]
    fn test_formula_inherits_input_guards() {
        let p = guarded_inputs();
        let v = resolve(&p, "formula-1").into_variant().unwrap();
        assert_eq!(v.cond, Some(Condition::eq0("A")));
        assert_eq!(v.expr, Expr::var("k*3"));
    }

    #[test]
    fn test_switch_folds_context_into_value() {
        let p = guarded_inputs();
        let v = resolve(&p, "sw").into_variant().unwrap();
        assert_eq!(v.cond, None);
        assert_eq!(v.expr.to_string(), "WHEN(A = 0, WHEN(A > 1, 2, 0), 0)");
    }

    #[test]
    fn test_logic_elements_contribute_zero() {
        let p = guarded_inputs();
        assert_eq!(
            resolve(&p, "not-1"),
            Resolution::Value(Variant {
                cond: None,
                expr: Expr::zero()
            })
        );
    }

    #[test]
    fn test_unresolved_sources() {
        let p = guarded_inputs();
        assert_eq!(resolve(&p, "sep"), Resolution::Unresolved);
        assert_eq!(resolve(&p, "missing"), Resolution::Unresolved);
    }

    #[test]
    fn test_reentry_is_reported_as_cycle() {
        let p = project(json!({
            "elements": {
                "formula-1": {"type": "formula", "props": {"expression": "a"}},
                "formula-2": {"type": "formula", "props": {"expression": "b"}}
            },
            "connections": [
                conn("formula-2", "out-0", "formula-1", "in-0"),
                conn("formula-1", "out-0", "formula-2", "in-0")
            ]
        }));
        let templates = TemplateSet::default();
        let mut c = Compiler::new(&p, &templates, &CompilerOptions::default());
        let f1 = c.graph.build("formula-1").unwrap();
        let f2 = c.graph.build("formula-2").unwrap();

        c.resolutions.visiting.insert(f1);
        assert_eq!(c.eval_graph_value(f1).unwrap(), Resolution::CycleDetected);
        c.resolutions.visiting.clear();

        let v = c.eval_graph_value(f1).unwrap().into_variant().unwrap();
        assert_eq!(v, Variant { cond: None, expr: Expr::var("a") });
        let v = c.eval_graph_value(f2).unwrap().into_variant().unwrap();
        assert_eq!(v.expr, Expr::var("b"));
    }

    #[test]
    fn test_shared_inputs_are_resolved_once() {
        let mut elements = serde_json::Map::new();
        elements.insert("s".into(), json!({"type": "input-signal", "props": {"name": "S"}}));
        elements.insert("zero".into(), json!({"type": "const", "props": {"value": 0}}));
        elements.insert("if-s".into(), json!({"type": "if", "props": {"operator": "!="}}));
        elements.insert("base".into(), json!({"type": "const", "props": {"value": 1}}));
        let mut connections = vec![
            conn("s", "out-0", "if-s", "in-0"),
            conn("zero", "out-0", "if-s", "in-1"),
            conn("if-s", "out-0", "base", "cond-0"),
        ];
        let mut prev = "base".to_string();
        for i in 1..=40 {
            let id = format!("formula-{}", i);
            elements.insert(id.clone(), json!({"type": "formula", "props": {"expression": "q"}}));
            connections.push(conn(&prev, "out-0", &id, "in-0"));
            connections.push(conn(&prev, "out-0", &id, "in-1"));
            prev = id;
        }
        let p = project(json!({"elements": elements, "connections": connections}));

        let templates = TemplateSet::default();
        let mut c = Compiler::new(&p, &templates, &CompilerOptions::default());
        let v = c.resolve(&prev).unwrap().into_variant().unwrap();
        assert_eq!(v.cond, Some(Condition::ne0("S")));
        assert_eq!(v.expr, Expr::var("q"));
        assert_eq!(c.resolutions.done.len(), 41);
    }
}
