// SPDX-License-Identifier: MIT

//! Output synthesis

use super::ast::Expr;
use super::resolver::Variant;
use super::Compiler;
use crate::error::SigcodeError;
use crate::project::Port;

/// Fold variants into one expression, earlier variants taking priority
///
/// An unconditional variant replaces everything declared after it.
pub(super) fn fold_variants(variants: Vec<Variant>) -> Expr {
    variants
        .into_iter()
        .rev()
        .fold(Expr::zero(), |acc, v| match v.cond {
            Some(cond) => Expr::when(cond, v.expr, acc),
            None => v.expr,
        })
}

impl<'p> Compiler<'p> {
    /// Variants feeding every output, in output then connection order
    ///
    /// Conditions are simplified; an unconditional `0` is dropped.
    pub(super) fn collect_variants(&mut self) -> Result<Vec<Variant>, SigcodeError> {
        let project = self.project;
        let mut variants = Vec::new();

        for output in project.outputs() {
            let inputs = project
                .connections_into(&output.id)
                .filter(|c| matches!(c.to_port, Port::In(_)));
            for conn in inputs {
                let Some(source) = self.graph.build(&conn.from_element) else {
                    log::debug!("Output {} reads missing element {}", output.id, conn.from_element);
                    continue;
                };
                let resolution = self.eval_graph_value(source)?;
                let Some(variant) = resolution.clone().into_variant() else {
                    log::debug!("{} contributes nothing: {:?}", conn.from_element, resolution);
                    continue;
                };

                let cond = variant.cond.map(|c| self.simplifier.simplify_cond(c));
                if cond.is_none() && variant.expr.is_zero() {
                    continue;
                }
                log::debug!(
                    "Output {} variant from {}: cond={}, expr={}",
                    output.id,
                    conn.from_element,
                    cond.as_ref().map_or_else(|| "-".to_string(), |c| c.to_string()),
                    variant.expr
                );
                variants.push(Variant {
                    cond,
                    expr: variant.expr,
                });
            }
        }

        Ok(variants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ast::Condition;

    fn variant(cond: Option<Condition>, expr: Expr) -> Variant {
        Variant { cond, expr }
    }

    #[test]
    fn test_empty_fold_is_zero() {
        assert_eq!(fold_variants(vec![]), Expr::zero());
    }

    #[test]
    fn test_unconditional_variant_wins_over_later_ones() {
        let folded = fold_variants(vec![
            variant(None, Expr::var("A")),
            variant(Some(Condition::ne0("c")), Expr::var("B")),
        ]);
        assert_eq!(folded, Expr::var("A"));
    }

    #[test]
    fn test_conditional_variants_chain() {
        let folded = fold_variants(vec![
            variant(Some(Condition::ne0("c")), Expr::var("B")),
            variant(Some(Condition::eq0("d")), Expr::Const(1.0)),
            variant(None, Expr::var("A")),
        ]);
        assert_eq!(folded.to_string(), "WHEN(c != 0, B, WHEN(d = 0, 1, A))");
    }
}
