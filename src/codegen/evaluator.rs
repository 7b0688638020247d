// SPDX-License-Identifier: MIT

//! Logic and value evaluation per element kind

use super::ast::{CmpOp, Condition, Expr};
use super::graph::NodeId;
use super::optimizer::interval::parse_number_literal;
use super::printer::format_number;
use super::Compiler;
use crate::error::SigcodeError;
use crate::project::{ElementKind, RangeProps, SwitchCase, SwitchProps};

/// Comparison atom of an `if` element
///
/// `=` / `!=` against a literal `0` become `Eq0` / `Ne0`. An unknown operator
/// reads as `TRUE`.
pub(super) fn build_if_atom(left: &Expr, op: &str, right: &Expr) -> Condition {
    let Some(op) = CmpOp::from_symbol(op.trim()) else {
        log::warn!("Unknown comparison operator '{}', reading as TRUE", op);
        return Condition::True;
    };
    let (l, r) = (left.operand_name(), right.operand_name());
    let zero_side = if right.is_zero() {
        Some(l.clone())
    } else if left.is_zero() {
        Some(r.clone())
    } else {
        None
    };
    match (op, zero_side) {
        (CmpOp::Eq, Some(v)) => Condition::Eq0(v),
        (CmpOp::NotEq, Some(v)) => Condition::Ne0(v),
        (op, _) => Condition::cmp(l, op, r),
    }
}

fn range_condition(input: &Expr, range: &RangeProps) -> Condition {
    let name = input.operand_name();
    let mut terms = Vec::new();
    if let Some(min) = range.min_value {
        let op = if range.inclusive_min { CmpOp::Gte } else { CmpOp::Gt };
        terms.push(Condition::cmp(name.clone(), op, format_number(min)));
    }
    if let Some(max) = range.max_value {
        let op = if range.inclusive_max { CmpOp::Lte } else { CmpOp::Lt };
        terms.push(Condition::cmp(name, op, format_number(max)));
    }
    Condition::all(terms)
}

/// Test of one switch case against the selector
///
/// A logical selector compared with `1`/`0` is used as is or negated.
fn case_condition(case: &SwitchCase, logical: Option<&Condition>, selector: &Expr) -> Option<Condition> {
    let Some(op) = CmpOp::from_symbol(case.op.trim()) else {
        log::warn!("Switch case operator '{}' is not supported, skipping case", case.op);
        return None;
    };
    let Some(sel) = logical else {
        return Some(Condition::cmp(selector.operand_name(), op, case.value.clone()));
    };
    let cond = match (op, parse_number_literal(&case.value)) {
        (CmpOp::Eq, Some(n)) if n != 0.0 => sel.clone(),
        (CmpOp::NotEq, Some(n)) if n == 0.0 => sel.clone(),
        (CmpOp::Eq, Some(_)) | (CmpOp::NotEq, Some(_)) => Condition::not(sel.clone()),
        (op, _) => Condition::cmp(sel.to_string(), op, case.value.clone()),
    };
    Some(cond)
}

impl<'p> Compiler<'p> {
    /// Boolean meaning of a node; non-logical kinds read as `TRUE`
    pub(super) fn eval_logic(&mut self, node: NodeId) -> Result<Condition, SigcodeError> {
        if let Some(done) = self.logic.done.get(&node) {
            return Ok(done.clone());
        }
        if !self.logic.visiting.insert(node) {
            log::debug!("Logic cycle through {}", self.graph.element(node).id);
            self.cycle_hits += 1;
            return Ok(Condition::True);
        }
        let hits = self.cycle_hits;
        let result = self.logic_of(node);
        self.logic.visiting.remove(&node);

        let cond = result?;
        if self.cycle_hits == hits {
            self.logic.done.insert(node, cond.clone());
        }
        Ok(cond)
    }

    fn logic_of(&mut self, node: NodeId) -> Result<Condition, SigcodeError> {
        let element = self.graph.element(node);
        match &element.kind {
            ElementKind::If(props) => {
                let left = self.input_value(node, 0)?;
                let right = self.input_value(node, 1)?;
                Ok(build_if_atom(&left, &props.operator, &right))
            }
            ElementKind::And(gate) => {
                let mut terms = Vec::new();
                for input in self.graph.inputs_below(node, gate.input_count) {
                    terms.push(self.eval_logic(input)?);
                }
                Ok(Condition::all(terms))
            }
            ElementKind::Or(gate) => {
                let mut terms = Vec::new();
                for input in self.graph.inputs_below(node, gate.input_count) {
                    terms.push(self.eval_logic(input)?);
                }
                Ok(Condition::any(terms))
            }
            ElementKind::Not => Ok(Condition::not(self.input_logic(node, 0)?)),
            ElementKind::Separator => self.input_logic(node, 0),
            ElementKind::Range(range) => {
                let input = self.input_value(node, 0)?;
                Ok(range_condition(&input, range))
            }
            _ => Ok(Condition::True),
        }
    }

    /// Numeric/symbolic value of a node; kinds without a value read as `0`
    pub(super) fn eval_value(&mut self, node: NodeId) -> Result<Expr, SigcodeError> {
        if let Some(done) = self.values.done.get(&node) {
            return Ok(done.clone());
        }
        if !self.values.visiting.insert(node) {
            log::debug!("Value cycle through {}", self.graph.element(node).id);
            self.cycle_hits += 1;
            return Ok(Expr::zero());
        }
        let hits = self.cycle_hits;
        let result = self.value_of(node);
        self.values.visiting.remove(&node);

        let expr = result?;
        if self.cycle_hits == hits {
            self.values.done.insert(node, expr.clone());
        }
        Ok(expr)
    }

    fn value_of(&mut self, node: NodeId) -> Result<Expr, SigcodeError> {
        let element = self.graph.element(node);
        match &element.kind {
            ElementKind::InputSignal(_) | ElementKind::Table(_) => {
                Ok(Expr::var(element.signal_name()))
            }
            ElementKind::Const(c) => Ok(Expr::Const(c.value)),
            ElementKind::Formula(_) => Ok(Expr::var(self.expander.expand_formula(&element.id)?)),
            ElementKind::Separator => self.input_value(node, 0),
            ElementKind::Switch(props) => self.switch_tree(node, props),
            _ => Ok(Expr::zero()),
        }
    }

    /// Case chain of a switch, case 0 outermost
    fn switch_tree(&mut self, node: NodeId, props: &SwitchProps) -> Result<Expr, SigcodeError> {
        let selector = self.graph.input(node, 0);
        let logical = match selector {
            Some(s) if self.graph.element(s).kind.is_logical() => Some(self.eval_logic(s)?),
            _ => None,
        };
        let selector_value = match (selector, &logical) {
            (Some(s), None) => self.eval_value(s)?,
            _ => Expr::zero(),
        };

        let mut tree = self.input_value(node, 1)?;
        for (i, case) in props.cases.iter().enumerate().rev() {
            let Some(test) = case_condition(case, logical.as_ref(), &selector_value) else {
                continue;
            };
            let value = self.input_value(node, case.input_index.unwrap_or(2 + i))?;
            tree = Expr::when(test, value, tree);
        }
        Ok(tree)
    }

    fn input_value(&mut self, node: NodeId, k: usize) -> Result<Expr, SigcodeError> {
        match self.graph.input(node, k) {
            Some(input) => self.eval_value(input),
            None => Ok(Expr::zero()),
        }
    }

    fn input_logic(&mut self, node: NodeId, k: usize) -> Result<Condition, SigcodeError> {
        match self.graph.input(node, k) {
            Some(input) => self.eval_logic(input),
            None => Ok(Condition::True),
        }
    }
}
