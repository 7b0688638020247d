// SPDX-License-Identifier: MIT

//! Text rendering of compiled expressions
//!
//! Rendering is deliberately naive (every compound gets its own parentheses);
//! [`cleanup_parentheses`] then removes the redundant pairs from the final string.

use std::fmt;

use super::ast::{Condition, Expr};

/// Render a number the way the editor shows it: `10`, `2.5`, never `-0`
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{}", n)
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::True => write!(f, "TRUE"),
            Condition::False => write!(f, "FALSE"),
            Condition::Eq0(v) => write!(f, "{} = 0", v),
            Condition::Ne0(v) => write!(f, "{} != 0", v),
            Condition::Cmp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Condition::And(a, b) => write!(f, "({} AND {})", a, b),
            Condition::Or(a, b) => write!(f, "({} OR {})", a, b),
            Condition::Not(x) => write!(f, "NOT({})", x),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(n) => write!(f, "{}", format_number(*n)),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::BinOp { op, left, right } => write!(f, "({}{}{})", left, op, right),
            Expr::When {
                cond,
                then,
                otherwise,
            } => write!(f, "WHEN({}, {}, {})", cond, then, otherwise),
        }
    }
}

const MAX_CLEANUP_PASSES: usize = 20;

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Remove redundant parentheses from rendered code
///
/// Drops doubled pairs `((x + y))`, pairs around a bare identifier or number,
/// and a pair enclosing the whole text. A pair directly preceded by a word
/// character or `)` belongs to a call and is left alone.
pub fn cleanup_parentheses(code: &str) -> String {
    let mut chars: Vec<char> = code.chars().collect();
    for _ in 0..MAX_CLEANUP_PASSES {
        let before = chars.clone();
        strip_doubled(&mut chars);
        strip_atoms(&mut chars);
        if chars == before {
            break;
        }
    }
    let text: String = chars.into_iter().collect();
    strip_outer(text.trim())
}

/// Index of the `)` closing the `(` at `open`
fn matching_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_doubled(chars: &mut Vec<char>) {
    let mut pos = 0;
    while pos + 1 < chars.len() {
        if chars[pos] != '(' || chars[pos + 1] != '(' {
            pos += 1;
            continue;
        }
        if pos > 0 && is_word(chars[pos - 1]) {
            pos += 1;
            continue;
        }
        let outer = matching_close(chars, pos);
        let inner = matching_close(chars, pos + 1);
        match (outer, inner) {
            (Some(end), Some(inner_end)) if inner_end + 1 == end => {
                chars.remove(end);
                chars.remove(pos);
            }
            _ => pos += 1,
        }
    }
}

fn strip_atoms(chars: &mut Vec<char>) {
    let mut out: Vec<char> = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '(' {
            let guarded = out.last().map(|&c| is_word(c) || c == ')').unwrap_or(false);
            if !guarded {
                if let Some((atom, next)) = atom_in_parens(chars, i) {
                    out.extend(atom);
                    i = next;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    *chars = out;
}

/// `( name )` starting at `open`: the trimmed name and the index after `)`
fn atom_in_parens(chars: &[char], open: usize) -> Option<(Vec<char>, usize)> {
    let mut j = open + 1;
    while j < chars.len() && chars[j] == ' ' {
        j += 1;
    }
    let start = j;
    if j >= chars.len() || !is_word(chars[j]) {
        return None;
    }
    while j < chars.len() && (is_word(chars[j]) || chars[j] == '.') {
        j += 1;
    }
    let end = j;
    while j < chars.len() && chars[j] == ' ' {
        j += 1;
    }
    if j < chars.len() && chars[j] == ')' {
        Some((chars[start..end].to_vec(), j + 1))
    } else {
        None
    }
}

fn strip_outer(text: &str) -> String {
    let mut s = text.to_string();
    loop {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() <= 2 || chars[0] != '(' || chars[chars.len() - 1] != ')' {
            break;
        }
        if matching_close(&chars, 0) != Some(chars.len() - 1) {
            break;
        }
        s = chars[1..chars.len() - 1]
            .iter()
            .collect::<String>()
            .trim()
            .to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ast::{ArithOp, CmpOp};

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_print_conditions() {
        let c = Condition::and(
            Condition::eq0("a"),
            Condition::or(
                Condition::ne0("b"),
                Condition::not(Condition::cmp("x", CmpOp::Gte, "5")),
            ),
        );
        assert_eq!(c.to_string(), "(a = 0 AND (b != 0 OR NOT(x >= 5)))");
        assert_eq!(Condition::True.to_string(), "TRUE");
    }

    #[test]
    fn test_print_expressions() {
        let e = Expr::when(
            Condition::cmp("x", CmpOp::Eq, "1"),
            Expr::binop(ArithOp::Add, Expr::var("a"), Expr::Const(1.0)),
            Expr::zero(),
        );
        assert_eq!(e.to_string(), "WHEN(x = 1, (a+1), 0)");
    }

    #[test]
    fn test_cleanup_doubled_and_outer() {
        assert_eq!(cleanup_parentheses("((x + y))"), "x + y");
        assert_eq!(cleanup_parentheses("((a = 0 AND b = 0))"), "a = 0 AND b = 0");
        assert_eq!(cleanup_parentheses("(a) + (b)"), "a + b");
    }

    #[test]
    fn test_cleanup_keeps_call_parentheses() {
        assert_eq!(cleanup_parentheses("ABS(x)"), "ABS(x)");
        assert_eq!(cleanup_parentheses("ROUND(0)"), "ROUND(0)");
        assert_eq!(
            cleanup_parentheses("WHEN((x > 0) AND (y > 0), a, 0)"),
            "WHEN((x > 0) AND (y > 0), a, 0)"
        );
        assert_eq!(
            cleanup_parentheses("WHEN((a = 0 AND b = 0), c, 0)"),
            "WHEN((a = 0 AND b = 0), c, 0)"
        );
    }

    #[test]
    fn test_cleanup_atoms() {
        assert_eq!(cleanup_parentheses("(Сигнал)*2"), "Сигнал*2");
        assert_eq!(cleanup_parentheses("x*(42)"), "x*42");
        assert_eq!(cleanup_parentheses("x*(3.14)"), "x*3.14");
        assert_eq!(cleanup_parentheses("x*(-5)"), "x*(-5)");
    }

    #[test]
    fn test_cleanup_does_not_merge_sibling_groups() {
        assert_eq!(
            cleanup_parentheses("(a = 0) OR ((b + c) = 0)"),
            "(a = 0) OR ((b + c) = 0)"
        );
        assert_eq!(cleanup_parentheses("((a+b) - (c+d))"), "(a+b) - (c+d)");
    }
}
