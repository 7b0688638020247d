// SPDX-License-Identifier: MIT

//! Expression simplification and nested-`WHEN` context pruning

use std::collections::HashSet;

use super::cond::{conjuncts, flatten_and};
use super::Simplifier;
use crate::codegen::ast::{ArithOp, AtomKey, Condition, Expr};

fn is_one(e: &Expr) -> bool {
    matches!(e, Expr::Const(n) if *n == 1.0)
}

fn fold_arith(op: ArithOp, left: Expr, right: Expr) -> Expr {
    if let (Some(l), Some(r)) = (left.as_const(), right.as_const()) {
        let folded = match op {
            ArithOp::Add => Some(l + r),
            ArithOp::Sub => Some(l - r),
            ArithOp::Mul => Some(l * r),
            ArithOp::Div if r != 0.0 => Some(l / r),
            ArithOp::Div => None,
        };
        if let Some(n) = folded.filter(|n| n.is_finite()) {
            return Expr::Const(n);
        }
    }
    match op {
        ArithOp::Add if right.is_zero() => left,
        ArithOp::Add if left.is_zero() => right,
        ArithOp::Sub if right.is_zero() => left,
        ArithOp::Mul if left.is_zero() || right.is_zero() => Expr::zero(),
        ArithOp::Mul if is_one(&left) => right,
        ArithOp::Mul if is_one(&right) => left,
        ArithOp::Div if is_one(&right) => left,
        _ => Expr::binop(op, left, right),
    }
}

/// `WHEN` with a constant guard or equal branches reduces to one branch
fn collapse(cond: Condition, then: Expr, otherwise: Expr) -> Expr {
    match cond {
        Condition::True => then,
        Condition::False => otherwise,
        _ if then == otherwise => then,
        cond => Expr::when(cond, then, otherwise),
    }
}

fn atom_keys(c: &Condition) -> HashSet<AtomKey> {
    conjuncts(c).into_iter().filter_map(Condition::atom_key).collect()
}

impl Simplifier {
    /// Simplify an expression tree
    pub fn simplify_expr(&mut self, e: Expr) -> Expr {
        self.guarded(e, |s, e| {
            let basic = s.simplify_expr_basic(e);
            s.prune_nested_when(basic, &[])
        })
    }

    fn simplify_expr_basic(&mut self, e: Expr) -> Expr {
        self.guarded(e, |s, e| match e {
            Expr::Const(_) | Expr::Var(_) => e,
            Expr::BinOp { op, left, right } => {
                let left = s.simplify_expr_basic(*left);
                let right = s.simplify_expr_basic(*right);
                fold_arith(op, left, right)
            }
            Expr::When {
                cond,
                then,
                otherwise,
            } => {
                let cond = s.simplify_cond(cond);
                let then = s.simplify_expr_basic(*then);
                let otherwise = s.simplify_expr_basic(*otherwise);
                collapse(cond, then, otherwise)
            }
        })
    }

    /// Rewrite else-chains knowing every enclosing guard in `previous` was false
    fn prune_nested_when(&mut self, e: Expr, previous: &[Condition]) -> Expr {
        self.guarded(e, |s, e| {
            let (cond, then, otherwise) = match e {
                Expr::When {
                    cond,
                    then,
                    otherwise,
                } => (cond, then, otherwise),
                other => return other,
            };
            let then = s.prune_nested_when(*then, previous);

            let mut context = previous.to_vec();
            context.push(cond.clone());
            let otherwise = match *otherwise {
                Expr::When {
                    cond: inner,
                    then: inner_then,
                    otherwise: inner_else,
                } => {
                    let inner = s.simplify_cond_in_context(inner, &context);
                    match inner {
                        Condition::True => s.prune_nested_when(*inner_then, &context),
                        Condition::False => s.prune_nested_when(*inner_else, &context),
                        inner => {
                            let t = s.prune_nested_when(*inner_then, &context);
                            let e = s.prune_nested_when(*inner_else, &context);
                            collapse(inner, t, e)
                        }
                    }
                }
                other => s.prune_nested_when(other, &context),
            };

            collapse(cond, then, otherwise)
        })
    }

    /// Drop conjuncts of `cond` already settled by an earlier, false guard
    ///
    /// Applies when `cond` shares at least one atom with an earlier guard and
    /// differs from it in exactly one negated atom. The shared atoms are
    /// removed; atoms the earlier guard does not mention are kept.
    pub fn simplify_cond_in_context(&mut self, cond: Condition, previous: &[Condition]) -> Condition {
        if previous.is_empty() {
            return self.simplify_cond(cond);
        }

        let mut inner = Vec::new();
        flatten_and(cond.clone(), &mut inner);

        for prev in previous {
            let prev_keys = atom_keys(prev);
            let mut shared = 0;
            let mut negated = 0;
            for key in inner.iter().filter_map(Condition::atom_key) {
                if prev_keys.contains(&key) {
                    shared += 1;
                } else if prev_keys.contains(&key.negate()) {
                    negated += 1;
                }
            }
            if shared == 0 || negated != 1 {
                continue;
            }

            let remaining: Vec<Condition> = inner
                .into_iter()
                .filter(|t| t.atom_key().map_or(true, |k| !prev_keys.contains(&k)))
                .collect();
            if remaining.is_empty() {
                return Condition::True;
            }
            return self.simplify_cond(Condition::all(remaining));
        }

        self.simplify_cond(cond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ast::CmpOp;

    fn simplify(e: Expr) -> Expr {
        Simplifier::default().simplify_expr(e)
    }

    #[test]
    fn test_arithmetic_identities() {
        let x = || Expr::var("x");
        assert_eq!(simplify(Expr::binop(ArithOp::Add, x(), Expr::zero())), x());
        assert_eq!(simplify(Expr::binop(ArithOp::Add, Expr::zero(), x())), x());
        assert_eq!(simplify(Expr::binop(ArithOp::Mul, x(), Expr::Const(1.0))), x());
        assert_eq!(
            simplify(Expr::binop(ArithOp::Mul, Expr::zero(), x())),
            Expr::zero()
        );
        assert_eq!(
            simplify(Expr::binop(ArithOp::Mul, Expr::Const(2.0), Expr::Const(3.0))),
            Expr::Const(6.0)
        );
        assert_eq!(
            simplify(Expr::binop(ArithOp::Div, Expr::Const(1.0), Expr::zero())),
            Expr::binop(ArithOp::Div, Expr::Const(1.0), Expr::zero())
        );
    }

    #[test]
    fn test_when_collapse() {
        let c = Condition::ne0("a");
        assert_eq!(
            simplify(Expr::when(Condition::True, Expr::var("t"), Expr::var("e"))),
            Expr::var("t")
        );
        assert_eq!(
            simplify(Expr::when(
                Condition::and(Condition::eq0("a"), c.clone()),
                Expr::var("t"),
                Expr::var("e")
            )),
            Expr::var("e")
        );
        assert_eq!(
            simplify(Expr::when(c, Expr::var("t"), Expr::var("t"))),
            Expr::var("t")
        );
    }

    #[test]
    fn test_nested_when_strips_shared_guards() {
        let a = || Condition::ne0("a");
        let b = || Condition::cmp("b", CmpOp::Gt, "1");
        let outer = Condition::and(a(), b());
        let inner = Condition::and(a(), Condition::cmp("b", CmpOp::Lte, "1"));
        let e = Expr::when(
            outer,
            Expr::var("x"),
            Expr::when(inner, Expr::var("y"), Expr::zero()),
        );
        assert_eq!(
            simplify(e).to_string(),
            "WHEN((a != 0 AND b > 1), x, WHEN(b <= 1, y, 0))"
        );
    }

    #[test]
    fn test_nested_when_needs_shared_atom() {
        let e = Expr::when(
            Condition::ne0("a"),
            Expr::var("x"),
            Expr::when(Condition::eq0("a"), Expr::var("y"), Expr::zero()),
        );
        assert_eq!(simplify(e).to_string(), "WHEN(a != 0, x, WHEN(a = 0, y, 0))");
    }

    #[test]
    fn test_nested_when_keeps_new_atoms() {
        let e = Expr::when(
            Condition::and(Condition::ne0("a"), Condition::ne0("b")),
            Expr::var("x"),
            Expr::when(
                Condition::all(vec![
                    Condition::ne0("a"),
                    Condition::eq0("b"),
                    Condition::ne0("c"),
                ]),
                Expr::var("y"),
                Expr::zero(),
            ),
        );
        assert_eq!(
            simplify(e).to_string(),
            "WHEN((a != 0 AND b != 0), x, WHEN((b = 0 AND c != 0), y, 0))"
        );
    }

    #[test]
    fn test_expr_idempotence() {
        let e = Expr::when(
            Condition::and(Condition::ne0("a"), Condition::ne0("b")),
            Expr::binop(ArithOp::Add, Expr::var("x"), Expr::zero()),
            Expr::when(
                Condition::and(Condition::ne0("a"), Condition::eq0("b")),
                Expr::var("y"),
                Expr::zero(),
            ),
        );
        let once = simplify(e);
        assert_eq!(simplify(once.clone()), once);
    }
}
