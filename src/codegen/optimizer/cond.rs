// SPDX-License-Identifier: MIT

//! Condition simplification

use std::collections::HashSet;

use super::interval::{self, Mode};
use super::Simplifier;
use crate::codegen::ast::{AtomKey, Condition};

/// Split a left-folded `And` chain into its conjuncts
pub(super) fn flatten_and(c: Condition, out: &mut Vec<Condition>) {
    match c {
        Condition::And(a, b) => {
            flatten_and(*a, out);
            flatten_and(*b, out);
        }
        other => out.push(other),
    }
}

pub(super) fn flatten_or(c: Condition, out: &mut Vec<Condition>) {
    match c {
        Condition::Or(a, b) => {
            flatten_or(*a, out);
            flatten_or(*b, out);
        }
        other => out.push(other),
    }
}

/// Borrowed conjuncts of a condition
pub(super) fn conjuncts(c: &Condition) -> Vec<&Condition> {
    match c {
        Condition::And(a, b) => {
            let mut out = conjuncts(a);
            out.extend(conjuncts(b));
            out
        }
        other => vec![other],
    }
}

fn disjuncts(c: &Condition) -> Vec<&Condition> {
    match c {
        Condition::Or(a, b) => {
            let mut out = disjuncts(a);
            out.extend(disjuncts(b));
            out
        }
        other => vec![other],
    }
}

/// Terms of a flat `And`/`Or` being assembled, atoms deduplicated by key
#[derive(Default)]
struct Terms {
    atoms: Vec<Condition>,
    keys: HashSet<AtomKey>,
    others: Vec<Condition>,
}

impl Terms {
    /// Add a term; `false` when it is the complement of an atom already present
    fn add(&mut self, term: Condition) -> bool {
        match term.atom_key() {
            Some(key) => {
                if self.keys.contains(&key.negate()) {
                    log::debug!("Complementary atoms on {}", key);
                    return false;
                }
                if self.keys.insert(key) {
                    self.atoms.push(term);
                }
            }
            None => {
                if !self.others.contains(&term) {
                    self.others.push(term);
                }
            }
        }
        true
    }

    /// Add a conjunct, flattening nested `And`; `false` on contradiction
    fn add_conjunct(&mut self, term: Condition) -> bool {
        match term {
            Condition::True => true,
            Condition::False => false,
            Condition::And(a, b) => self.add_conjunct(*a) && self.add_conjunct(*b),
            other => self.add(other),
        }
    }

    /// Remove `Or` branches contradicting a sibling atom, until nothing changes
    ///
    /// Returns `false` when some `Or` loses every branch.
    fn prune_disjunctions(&mut self) -> bool {
        loop {
            let mut changed = false;
            for term in std::mem::take(&mut self.others) {
                if !matches!(term, Condition::Or(..)) {
                    self.others.push(term);
                    continue;
                }
                let mut branches = Vec::new();
                flatten_or(term, &mut branches);
                let before = branches.len();
                branches.retain(|b| !self.atoms.iter().any(|ctx| b.is_negation_of(ctx)));
                if branches.is_empty() {
                    log::debug!("Every OR branch contradicts its context");
                    return false;
                }
                changed |= branches.len() < before;
                let rebuilt = Condition::any(branches);
                if !self.add_conjunct(rebuilt) {
                    return false;
                }
            }
            if !changed {
                return true;
            }
        }
    }

    fn into_terms(self) -> Vec<Condition> {
        let mut terms = self.atoms;
        terms.extend(self.others);
        terms
    }
}

/// Drop compound terms that one of their parts, present as a sibling, absorbs
///
/// `x AND (x OR y)` keeps `x`; `x OR (x AND y)` keeps `x`.
fn absorb(terms: Vec<Condition>, parts: fn(&Condition) -> Option<Vec<&Condition>>) -> Vec<Condition> {
    if terms.len() < 2 {
        return terms;
    }
    let mut keep = vec![true; terms.len()];
    for i in 0..terms.len() {
        let Some(split) = parts(&terms[i]) else {
            continue;
        };
        let absorbed = split
            .iter()
            .any(|p| (0..terms.len()).any(|j| j != i && keep[j] && **p == terms[j]));
        if absorbed {
            keep[i] = false;
        }
    }
    terms
        .into_iter()
        .zip(keep)
        .filter_map(|(t, k)| k.then_some(t))
        .collect()
}

fn or_parts(c: &Condition) -> Option<Vec<&Condition>> {
    matches!(c, Condition::Or(..)).then(|| disjuncts(c))
}

fn and_parts(c: &Condition) -> Option<Vec<&Condition>> {
    matches!(c, Condition::And(..)).then(|| conjuncts(c))
}

/// Two interval atoms on one variable that cannot hold together
fn has_disjoint_intervals(atoms: &[Condition]) -> bool {
    let intervals: Vec<_> = atoms
        .iter()
        .filter_map(interval::Interval::from_condition)
        .collect();
    intervals.iter().enumerate().any(|(i, a)| {
        intervals[i + 1..]
            .iter()
            .any(|b| a.var == b.var && a.is_disjoint_from(b))
    })
}

impl Simplifier {
    /// Simplify a condition to a canonical, smaller equivalent
    pub fn simplify_cond(&mut self, c: Condition) -> Condition {
        self.guarded(c, Self::simplify_cond_core)
    }

    fn simplify_cond_core(&mut self, c: Condition) -> Condition {
        match c {
            Condition::Not(x) => self.simplify_not(*x),
            Condition::And(a, b) => self.simplify_and(*a, *b),
            Condition::Or(a, b) => self.simplify_or(*a, *b),
            atom => atom,
        }
    }

    fn simplify_not(&mut self, x: Condition) -> Condition {
        if let Condition::Not(inner) = x {
            return self.simplify_cond(*inner);
        }
        match self.simplify_cond(x) {
            Condition::True => Condition::False,
            Condition::False => Condition::True,
            Condition::Not(inner) => *inner,
            Condition::Eq0(v) => Condition::Ne0(v),
            Condition::Ne0(v) => Condition::Eq0(v),
            Condition::Cmp { left, op, right } => Condition::Cmp {
                left,
                op: op.negate(),
                right,
            },
            Condition::And(a, b) => {
                self.simplify_cond(Condition::or(Condition::not(*a), Condition::not(*b)))
            }
            Condition::Or(a, b) => {
                self.simplify_cond(Condition::and(Condition::not(*a), Condition::not(*b)))
            }
        }
    }

    fn simplify_and(&mut self, a: Condition, b: Condition) -> Condition {
        let a = self.simplify_cond(a);
        let b = self.simplify_cond(b);
        if a.is_false() || b.is_false() {
            return Condition::False;
        }
        if a.is_true() {
            return b;
        }
        if b.is_true() {
            return a;
        }

        let mut terms = Terms::default();
        if !terms.add_conjunct(a) || !terms.add_conjunct(b) || !terms.prune_disjunctions() {
            return Condition::False;
        }
        if has_disjoint_intervals(&terms.atoms) {
            log::debug!("Conjunction of disjoint ranges");
            return Condition::False;
        }
        terms.atoms = interval::remove_redundant(std::mem::take(&mut terms.atoms), Mode::And);

        let result = absorb(terms.into_terms(), or_parts);
        match result.len() {
            0 => Condition::True,
            _ => Condition::all(result),
        }
    }

    fn simplify_or(&mut self, a: Condition, b: Condition) -> Condition {
        let a = self.simplify_cond(a);
        let b = self.simplify_cond(b);
        if a.is_true() || b.is_true() {
            return Condition::True;
        }
        if a.is_false() {
            return b;
        }
        if b.is_false() {
            return a;
        }

        let mut flat = Vec::new();
        flatten_or(a, &mut flat);
        flatten_or(b, &mut flat);

        let mut terms = Terms::default();
        for term in flat {
            match term {
                Condition::True => return Condition::True,
                Condition::False => continue,
                other => {
                    if !terms.add(other) {
                        return Condition::True;
                    }
                }
            }
        }
        terms.atoms = interval::remove_redundant(std::mem::take(&mut terms.atoms), Mode::Or);

        let result = absorb(terms.into_terms(), and_parts);
        match result.len() {
            0 => Condition::False,
            _ => Condition::any(result),
        }
    }
}
