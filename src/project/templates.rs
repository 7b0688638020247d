// SPDX-License-Identifier: MIT

//! Named parametric formula templates
//!
//! A template file looks like:
//!
//! ```json
//! { "templates": [
//!     { "name": "h", "args": { "p": { "min": 0, "max": 20 } }, "body": "p*2" },
//!     { "name": "avg", "args": ["a", "b"], "body": "(a+b)/2" }
//! ] }
//! ```

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// All known templates, indexed by name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "TemplateFile")]
pub struct TemplateSet {
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: Vec<Template>,
}

impl From<TemplateFile> for TemplateSet {
    fn from(file: TemplateFile) -> Self {
        TemplateSet::new(file.templates)
    }
}

impl TemplateSet {
    /// Build a set; nameless templates are skipped, later duplicates win
    pub fn new(templates: Vec<Template>) -> Self {
        let mut set = TemplateSet::default();
        for template in templates {
            if template.name.is_empty() {
                continue;
            }
            match set.index.get(&template.name) {
                Some(&i) => set.templates[i] = template,
                None => {
                    set.index
                        .insert(template.name.clone(), set.templates.len());
                    set.templates.push(template);
                }
            }
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.index.get(name).map(|&i| &self.templates[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A formula macro: `name(args…) = body`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: TemplateArgs,
    #[serde(default)]
    pub body: String,
    /// Value used when a bound check fails (default 0)
    #[serde(default)]
    pub return_value: Option<f64>,
}

impl Template {
    pub fn new(name: impl Into<String>, args: TemplateArgs, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            body: body.into(),
            return_value: None,
        }
    }

    /// Body text, `0` when empty
    pub fn body_text(&self) -> &str {
        if self.body.trim().is_empty() {
            "0"
        } else {
            &self.body
        }
    }

    pub fn fallback(&self) -> f64 {
        self.return_value.unwrap_or(0.0)
    }
}

/// Formal parameters in declaration order
///
/// Accepts both `["p", "t"]` and `{"p": {"min": 0}, "t": null}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateArgs(pub Vec<TemplateParam>);

impl TemplateArgs {
    pub fn positional<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(TemplateParam::unbounded).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateParam> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParam {
    pub name: String,
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

impl TemplateParam {
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: None,
            max: None,
        }
    }

    pub fn bounded(name: impl Into<String>, min: Option<Bound>, max: Option<Bound>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }
}

/// A parameter bound: a number or a formula snippet
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Expr(String),
}

#[derive(Deserialize, Default)]
struct ParamBounds {
    #[serde(default)]
    min: Option<Bound>,
    #[serde(default)]
    max: Option<Bound>,
}

impl<'de> Deserialize<'de> for TemplateArgs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ArgsVisitor;

        impl<'de> Visitor<'de> for ArgsVisitor {
            type Value = TemplateArgs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of parameter names or a map of parameter bounds")
            }

            fn visit_unit<E: de::Error>(self) -> Result<TemplateArgs, E> {
                Ok(TemplateArgs::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<TemplateArgs, E> {
                Ok(TemplateArgs::default())
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<TemplateArgs, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut params = Vec::new();
                while let Some(name) = seq.next_element::<String>()? {
                    params.push(TemplateParam::unbounded(name));
                }
                Ok(TemplateArgs(params))
            }

            fn visit_map<A>(self, mut map: A) -> Result<TemplateArgs, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut params = Vec::new();
                while let Some((name, bounds)) = map.next_entry::<String, Option<ParamBounds>>()? {
                    let bounds = bounds.unwrap_or_default();
                    params.push(TemplateParam::bounded(name, bounds.min, bounds.max));
                }
                Ok(TemplateArgs(params))
            }
        }

        deserializer.deserialize_any(ArgsVisitor)
    }
}
