// SPDX-License-Identifier: MIT

//! Interval reasoning over single-variable comparisons

use crate::codegen::ast::{CmpOp, Condition};

/// Parse a plain numeric literal: `-12`, `3.5`, `3,5`
///
/// Anything else (exponents, signs other than a leading `-`, names) is not a literal.
pub fn parse_number_literal(s: &str) -> Option<f64> {
    let trimmed = s.trim().replacen(',', ".", 1);
    let digits = trimmed.strip_prefix('-').unwrap_or(&trimmed);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int) || !frac.map(all_digits).unwrap_or(true) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// The set of values of one variable satisfying a comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub var: String,
    pub min: f64,
    pub min_inclusive: bool,
    pub max: f64,
    pub max_inclusive: bool,
}

impl Interval {
    /// Interval of a `Cmp` with exactly one numeric side
    ///
    /// Only `<`, `<=`, `>`, `>=` and `=` describe intervals; `!=` does not.
    pub fn from_condition(c: &Condition) -> Option<Interval> {
        let Condition::Cmp { left, op, right } = c else {
            return None;
        };
        let (var, op, value) = match (parse_number_literal(left), parse_number_literal(right)) {
            (None, Some(n)) => (left, *op, n),
            (Some(n), None) => (right, op.reverse(), n),
            _ => return None,
        };

        let mut iv = Interval {
            var: var.clone(),
            min: f64::NEG_INFINITY,
            min_inclusive: false,
            max: f64::INFINITY,
            max_inclusive: false,
        };
        match op {
            CmpOp::Lt => iv.max = value,
            CmpOp::Lte => {
                iv.max = value;
                iv.max_inclusive = true;
            }
            CmpOp::Gt => iv.min = value,
            CmpOp::Gte => {
                iv.min = value;
                iv.min_inclusive = true;
            }
            CmpOp::Eq => {
                iv.min = value;
                iv.max = value;
                iv.min_inclusive = true;
                iv.max_inclusive = true;
            }
            CmpOp::NotEq => return None,
        }
        Some(iv)
    }

    /// `self ⊆ other`
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        let lower_ok = if self.min == f64::NEG_INFINITY {
            other.min == f64::NEG_INFINITY
        } else if other.min == f64::NEG_INFINITY || self.min > other.min {
            true
        } else if self.min < other.min {
            false
        } else {
            !(self.min_inclusive && !other.min_inclusive)
        };
        if !lower_ok {
            return false;
        }

        if self.max == f64::INFINITY {
            other.max == f64::INFINITY
        } else if other.max == f64::INFINITY || self.max < other.max {
            true
        } else if self.max > other.max {
            false
        } else {
            !(self.max_inclusive && !other.max_inclusive)
        }
    }
}

impl Interval {
    /// No value lies in both intervals
    pub fn is_disjoint_from(&self, other: &Interval) -> bool {
        let (lo, lo_inclusive) = if self.min > other.min {
            (self.min, self.min_inclusive)
        } else if other.min > self.min {
            (other.min, other.min_inclusive)
        } else {
            (self.min, self.min_inclusive && other.min_inclusive)
        };
        let (hi, hi_inclusive) = if self.max < other.max {
            (self.max, self.max_inclusive)
        } else if other.max < self.max {
            (other.max, other.max_inclusive)
        } else {
            (self.max, self.max_inclusive && other.max_inclusive)
        };
        lo > hi || (lo == hi && !(lo_inclusive && hi_inclusive))
    }
}

/// How two comparisons relate as intervals over the same variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    /// The first is contained in the second
    FirstInSecond,
    /// The second is contained in the first
    SecondInFirst,
}

pub fn relation(a: &Condition, b: &Condition) -> Option<Relation> {
    let ia = Interval::from_condition(a)?;
    let ib = Interval::from_condition(b)?;
    if ia.var != ib.var {
        return None;
    }
    match (ia.is_subset_of(&ib), ib.is_subset_of(&ia)) {
        (true, true) => Some(Relation::Equal),
        (true, false) => Some(Relation::FirstInSecond),
        (false, true) => Some(Relation::SecondInFirst),
        (false, false) => None,
    }
}

/// Which side of a nested relation is redundant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// In a conjunction the narrower comparison wins
    And,
    /// In a disjunction the wider comparison wins
    Or,
}

/// Drop comparisons implied by (`Or`) or implying (`And`) a sibling
pub fn remove_redundant(atoms: Vec<Condition>, mode: Mode) -> Vec<Condition> {
    if atoms.len() < 2 {
        return atoms;
    }
    let mut keep = vec![true; atoms.len()];
    for i in 0..atoms.len() {
        if !keep[i] {
            continue;
        }
        for j in 0..atoms.len() {
            if i == j || !keep[j] {
                continue;
            }
            let drop_first = match (relation(&atoms[i], &atoms[j]), mode) {
                (Some(Relation::FirstInSecond), Mode::Or)
                | (Some(Relation::SecondInFirst), Mode::And) => true,
                (Some(Relation::FirstInSecond), Mode::And)
                | (Some(Relation::SecondInFirst), Mode::Or) => {
                    keep[j] = false;
                    false
                }
                _ => false,
            };
            if drop_first {
                keep[i] = false;
                break;
            }
        }
    }
    atoms
        .into_iter()
        .zip(keep)
        .filter_map(|(atom, kept)| kept.then_some(atom))
        .collect()
}
