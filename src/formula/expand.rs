// SPDX-License-Identifier: MIT

//! Template and formula-reference expansion

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::ast::{BinaryOp, FormulaExpr};
use super::parser::parse;
use crate::error::SigcodeError;
use crate::project::{Bound, ElementKind, Project, TemplateSet};

/// A template with its body and bounds already parsed
#[derive(Debug)]
struct ParsedTemplate {
    params: Vec<String>,
    body: FormulaExpr,
    /// `(parameter index, min, max)` for every bounded parameter
    bounds: Vec<(usize, Option<FormulaExpr>, Option<FormulaExpr>)>,
    fallback: f64,
}

impl ParsedTemplate {
    /// Body with parameters bound to `args`, wrapped in its bound checks
    fn instantiate(&self, args: &[FormulaExpr]) -> FormulaExpr {
        let bindings: HashMap<&str, &FormulaExpr> = self
            .params
            .iter()
            .map(String::as_str)
            .zip(args.iter())
            .collect();
        let bind = |e: &FormulaExpr| substitute(e.clone(), &bindings);

        let mut guards = Vec::new();
        for (i, min, max) in &self.bounds {
            if let Some(min) = min {
                guards.push(FormulaExpr::binary(BinaryOp::Gte, args[*i].clone(), bind(min)));
            }
            if let Some(max) = max {
                guards.push(FormulaExpr::binary(BinaryOp::Lte, args[*i].clone(), bind(max)));
            }
        }

        let body = bind(&self.body);
        match guards
            .into_iter()
            .reduce(|a, b| FormulaExpr::binary(BinaryOp::And, a, b))
        {
            Some(guard) => FormulaExpr::call(
                "WHEN",
                vec![guard, body, FormulaExpr::Number(self.fallback)],
            ),
            None => body,
        }
    }
}

fn substitute(e: FormulaExpr, bindings: &HashMap<&str, &FormulaExpr>) -> FormulaExpr {
    e.map_bottom_up(&mut |node| {
        Ok::<_, std::convert::Infallible>(match node {
            FormulaExpr::Ident(name) => match bindings.get(name.as_str()) {
                Some(arg) => (*arg).clone(),
                None => FormulaExpr::Ident(name),
            },
            other => other,
        })
    })
    .unwrap_or_else(|never| match never {})
}

/// Expands formula elements of one project
///
/// Calls naming a template are replaced by the template body, and
/// identifiers naming another formula element are replaced by that formula.
/// A formula reached again while it is being expanded reads as `0`.
pub struct Expander<'p> {
    project: &'p Project,
    templates: &'p TemplateSet,
    max_depth: usize,
    parsed: HashMap<String, Rc<ParsedTemplate>>,
    cache: HashMap<String, FormulaExpr>,
    visiting: HashSet<String>,
}

impl<'p> Expander<'p> {
    pub fn new(project: &'p Project, templates: &'p TemplateSet, max_depth: usize) -> Self {
        Self {
            project,
            templates,
            max_depth,
            parsed: HashMap::new(),
            cache: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Expanded text of the formula element `id`
    pub fn expand_formula(&mut self, id: &str) -> Result<String, SigcodeError> {
        Ok(self.formula_ast(id, 0)?.to_string())
    }

    fn formula_ast(&mut self, id: &str, depth: usize) -> Result<FormulaExpr, SigcodeError> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(cached.clone());
        }
        if self.visiting.contains(id) {
            log::debug!("Formula {} references itself, reading it as 0", id);
            return Ok(FormulaExpr::Number(0.0));
        }

        let project: &'p Project = self.project;
        let text = match project.element(id).map(|e| &e.kind) {
            Some(ElementKind::Formula(props)) => props.expression.trim(),
            _ => return Ok(FormulaExpr::ident(id)),
        };
        if text.is_empty() {
            return Ok(FormulaExpr::Number(0.0));
        }

        let parsed = match parse(text, |other| project.elements.contains(other)) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Formula {} kept verbatim: {}", id, e);
                return Ok(FormulaExpr::Raw(text.to_string()));
            }
        };

        let top_level = self.visiting.is_empty();
        self.visiting.insert(id.to_string());
        let expanded = self.expand(parsed, depth);
        self.visiting.remove(id);

        let expanded = expanded?;
        // Nested results may have a cyclic reference cut to 0
        if top_level {
            self.cache.insert(id.to_string(), expanded.clone());
        }
        Ok(expanded)
    }

    /// Expand bottom-up, so call arguments are expanded before the call
    fn expand(&mut self, e: FormulaExpr, depth: usize) -> Result<FormulaExpr, SigcodeError> {
        e.map_bottom_up(&mut |node| self.expand_node(node, depth))
    }

    fn expand_node(&mut self, node: FormulaExpr, depth: usize) -> Result<FormulaExpr, SigcodeError> {
        if depth >= self.max_depth {
            return Ok(node);
        }
        match node {
            FormulaExpr::Ident(name) if self.is_formula(&name) => self.formula_ast(&name, depth + 1),
            FormulaExpr::Call { name, args } => match self.template(&name)? {
                Some(template) if template.params.len() == args.len() => {
                    let instance = template.instantiate(&args);
                    self.expand(instance, depth + 1)
                }
                Some(template) => {
                    log::debug!(
                        "Template {} takes {} arguments, got {}",
                        name,
                        template.params.len(),
                        args.len()
                    );
                    Ok(FormulaExpr::Call { name, args })
                }
                None => Ok(FormulaExpr::Call { name, args }),
            },
            other => Ok(other),
        }
    }

    fn is_formula(&self, id: &str) -> bool {
        matches!(
            self.project.element(id).map(|e| &e.kind),
            Some(ElementKind::Formula(_))
        )
    }

    fn template(&mut self, name: &str) -> Result<Option<Rc<ParsedTemplate>>, SigcodeError> {
        if let Some(parsed) = self.parsed.get(name) {
            return Ok(Some(Rc::clone(parsed)));
        }
        let templates: &'p TemplateSet = self.templates;
        let Some(template) = templates.get(name) else {
            return Ok(None);
        };

        let project: &'p Project = self.project;
        let parse_part = |text: &str| {
            parse(text, |id| project.elements.contains(id))
                .map_err(|e| SigcodeError::template(name, e.to_string()))
        };
        let bound = |b: &Option<Bound>| -> Result<Option<FormulaExpr>, SigcodeError> {
            match b {
                None => Ok(None),
                Some(Bound::Number(n)) => Ok(Some(FormulaExpr::Number(*n))),
                Some(Bound::Expr(text)) => parse_part(text).map(Some),
            }
        };

        let mut bounds = Vec::new();
        for (i, param) in template.args.iter().enumerate() {
            let (min, max) = (bound(&param.min)?, bound(&param.max)?);
            if min.is_some() || max.is_some() {
                bounds.push((i, min, max));
            }
        }
        let parsed = Rc::new(ParsedTemplate {
            params: template.args.iter().map(|p| p.name.clone()).collect(),
            body: parse_part(template.body_text())?,
            bounds,
            fallback: template.fallback(),
        });
        self.parsed.insert(name.to_string(), Rc::clone(&parsed));
        Ok(Some(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Element, FormulaProps, Template, TemplateArgs, TemplateParam};

    fn formula(id: &str, expression: &str) -> Element {
        Element::new(
            id,
            ElementKind::Formula(FormulaProps {
                expression: expression.to_string(),
                input_count: None,
            }),
        )
    }

    fn h_template() -> TemplateSet {
        TemplateSet::new(vec![Template::new(
            "h",
            TemplateArgs(vec![TemplateParam::bounded(
                "p",
                Some(Bound::Number(0.0)),
                Some(Bound::Number(20.0)),
            )]),
            "p*2",
        )])
    }

    fn expand(project: &Project, templates: &TemplateSet, id: &str) -> String {
        Expander::new(project, templates, 10)
            .expand_formula(id)
            .unwrap()
    }

    #[test]
    fn test_bounded_template() {
        let project = Project::new(vec![formula("formula-1", "h(10)")], vec![]);
        assert_eq!(
            expand(&project, &h_template(), "formula-1"),
            "WHEN((10 >= 0) AND (10 <= 20), 10*2, 0)"
        );
    }

    #[test]
    fn test_unbounded_template_substitutes_whole_identifiers() {
        let templates = TemplateSet::new(vec![Template::new(
            "avg",
            TemplateArgs::positional(["a", "b"]),
            "(a+b)/2",
        )]);
        let project = Project::new(vec![formula("f", "avg(ab, b*3)")], vec![]);
        assert_eq!(expand(&project, &templates, "f"), "(ab+b*3)/2");
    }

    #[test]
    fn test_arity_mismatch_leaves_call() {
        let project = Project::new(vec![formula("f", "h(1, 2) + max(x)")], vec![]);
        assert_eq!(expand(&project, &h_template(), "f"), "h(1, 2)+max(x)");
    }

    #[test]
    fn test_formula_references_are_inlined() {
        let project = Project::new(
            vec![formula("formula-1", "a+b"), formula("formula-2", "formula-1*2")],
            vec![],
        );
        assert_eq!(
            expand(&project, &TemplateSet::default(), "formula-2"),
            "(a+b)*2"
        );
    }

    #[test]
    fn test_self_reference_reads_as_zero() {
        let project = Project::new(
            vec![formula("formula-1", "formula-2+1"), formula("formula-2", "formula-1*3")],
            vec![],
        );
        assert_eq!(
            expand(&project, &TemplateSet::default(), "formula-1"),
            "0*3+1"
        );
    }

    #[test]
    fn test_recursive_template_stops_at_depth() {
        let templates = TemplateSet::new(vec![Template::new(
            "r",
            TemplateArgs::positional(["x"]),
            "r(x)+1",
        )]);
        let project = Project::new(vec![formula("f", "r(y)")], vec![]);
        let mut expander = Expander::new(&project, &templates, 3);
        assert_eq!(expander.expand_formula("f").unwrap(), "r(y)+1+1+1");
    }

    #[test]
    fn test_empty_and_unparseable_formulas() {
        let project = Project::new(vec![formula("e", "  "), formula("bad", "a + * b")], vec![]);
        let templates = TemplateSet::default();
        assert_eq!(expand(&project, &templates, "e"), "0");
        assert_eq!(expand(&project, &templates, "bad"), "a + * b");
    }

    #[test]
    fn test_bad_template_body_is_an_error() {
        let templates = TemplateSet::new(vec![Template::new(
            "broken",
            TemplateArgs::positional(["x"]),
            "x +",
        )]);
        let project = Project::new(vec![formula("f", "broken(1)")], vec![]);
        let err = Expander::new(&project, &templates, 10)
            .expand_formula("f")
            .unwrap_err();
        assert!(err.to_string().starts_with("Template 'broken'"));
    }

    #[test]
    fn test_expression_bound_mentions_other_parameter() {
        let templates = TemplateSet::new(vec![Template::new(
            "clip",
            TemplateArgs(vec![
                TemplateParam::bounded("v", None, Some(Bound::Expr("limit".to_string()))),
                TemplateParam::unbounded("limit"),
            ]),
            "v",
        )]);
        let project = Project::new(vec![formula("f", "clip(speed, 90)")], vec![]);
        assert_eq!(expand(&project, &templates, "f"), "WHEN(speed <= 90, speed, 0)");
    }
}
