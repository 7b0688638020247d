// SPDX-License-Identifier: MIT

//! Editor document types: elements, ports and connections
//!
//! These mirror the JSON the graph editor saves. Only the fields that matter to
//! code generation are modelled; UI fields (positions, sizes, colours) are ignored.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;


/// A saved editor project
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    /// Elements keyed by id, in document order
    #[serde(default)]
    pub elements: Elements,
    /// Directed, port-addressed connections
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Last generated code, if any
    #[serde(default)]
    pub code: Option<String>,
}

impl Project {
    /// Build a project from already-typed parts
    pub fn new(elements: Vec<Element>, connections: Vec<Connection>) -> Self {
        Self {
            elements: Elements::from(elements),
            connections,
            code: None,
        }
    }

    /// Look up an element by id
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// All `Output` elements in document order
    pub fn outputs(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::Output(_)))
    }

    /// Connections terminating at `id`, in declaration order
    pub fn connections_into<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.to_element == id)
    }
}

/// Ordered element table
///
/// JSON objects carry no order guarantee in most maps, but the editor relies on
/// insertion order when several outputs exist, so the table keeps document order.
#[derive(Debug, Clone, Default)]
pub struct Elements {
    items: Vec<Element>,
    index: HashMap<String, usize>,
}

impl Elements {
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn insert(&mut self, element: Element) {
        match self.index.get(&element.id) {
            Some(&i) => self.items[i] = element,
            None => {
                self.index.insert(element.id.clone(), self.items.len());
                self.items.push(element);
            }
        }
    }
}

impl From<Vec<Element>> for Elements {
    fn from(elements: Vec<Element>) -> Self {
        let mut table = Elements::default();
        for element in elements {
            table.insert(element);
        }
        table
    }
}

impl<'de> Deserialize<'de> for Elements {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ElementsVisitor;

        impl<'de> Visitor<'de> for ElementsVisitor {
            type Value = Elements;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of element id to element")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Elements, E> {
                Ok(Elements::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Elements, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = Elements::default();
                while let Some((id, raw)) = map.next_entry::<String, RawElement>()? {
                    table.insert(Element::from_raw(id, raw));
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(ElementsVisitor)
    }
}

/// A node of the visual graph
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
}

/// Element kinds with their kind-specific properties
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    InputSignal(SignalProps),
    Const(ConstProps),
    And(GateProps),
    Or(GateProps),
    Not,
    If(IfProps),
    Separator,
    Formula(FormulaProps),
    Switch(SwitchProps),
    Range(RangeProps),
    Output(OutputProps),
    Table(SignalProps),
    Group,
    /// A type string this compiler does not know; contributes nothing
    Unknown(String),
}

impl ElementKind {
    /// Kinds whose output is a boolean condition
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            ElementKind::And(_)
                | ElementKind::Or(_)
                | ElementKind::Not
                | ElementKind::If(_)
                | ElementKind::Range(_)
                | ElementKind::Separator
        )
    }

    /// Editor type string
    pub fn type_name(&self) -> &str {
        match self {
            ElementKind::InputSignal(_) => "input-signal",
            ElementKind::Const(_) => "const",
            ElementKind::And(_) => "and",
            ElementKind::Or(_) => "or",
            ElementKind::Not => "not",
            ElementKind::If(_) => "if",
            ElementKind::Separator => "separator",
            ElementKind::Formula(_) => "formula",
            ElementKind::Switch(_) => "switch",
            ElementKind::Range(_) => "range",
            ElementKind::Output(_) => "output",
            ElementKind::Table(_) => "table",
            ElementKind::Group => "group",
            ElementKind::Unknown(name) => name,
        }
    }
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Display name of a signal/table element, falling back to its id
    pub fn signal_name(&self) -> &str {
        match &self.kind {
            ElementKind::InputSignal(p) | ElementKind::Table(p) => match p.name.as_deref() {
                Some(name) if !name.is_empty() => name,
                _ => &self.id,
            },
            _ => &self.id,
        }
    }

    /// Build an element from its saved form; malformed props fall back to defaults
    fn from_raw(id: String, raw: RawElement) -> Self {
        let props = match raw.props {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let typed = |props: Value| -> Result<ElementKind, serde_json::Error> {
            Ok(match raw.kind.as_str() {
                "input-signal" => ElementKind::InputSignal(serde_json::from_value(props)?),
                "const" => ElementKind::Const(serde_json::from_value(props)?),
                "and" => ElementKind::And(serde_json::from_value(props)?),
                "or" => ElementKind::Or(serde_json::from_value(props)?),
                "not" => ElementKind::Not,
                "if" => ElementKind::If(serde_json::from_value(props)?),
                "separator" => ElementKind::Separator,
                "formula" => ElementKind::Formula(serde_json::from_value(props)?),
                "switch" => ElementKind::Switch(serde_json::from_value(props)?),
                "range" => ElementKind::Range(serde_json::from_value(props)?),
                "output" => ElementKind::Output(serde_json::from_value(props)?),
                "table" => ElementKind::Table(serde_json::from_value(props)?),
                "group" => ElementKind::Group,
                other => {
                    log::debug!("Element {} has unknown type '{}'", id, other);
                    ElementKind::Unknown(other.to_string())
                }
            })
        };

        let kind = match typed(props) {
            Ok(kind) => kind,
            Err(e) => {
                log::warn!("Element {} has malformed props, using defaults: {}", id, e);
                typed(Value::Object(Default::default()))
                    .unwrap_or_else(|_| ElementKind::Unknown(raw.kind.clone()))
            }
        };
        log::trace!("Loaded element {} ({})", id, kind.type_name());

        Element { id, kind }
    }
}

#[derive(Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    props: Value,
}

/// Props of `input-signal` and `table`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SignalProps {
    #[serde(deserialize_with = "lenient_opt_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConstProps {
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
}

/// Props of the n-ary `and` / `or` gates
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateProps {
    #[serde(deserialize_with = "lenient_count")]
    pub input_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IfProps {
    #[serde(deserialize_with = "lenient_operator")]
    pub operator: String,
}

impl Default for IfProps {
    fn default() -> Self {
        Self {
            operator: "=".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormulaProps {
    #[serde(deserialize_with = "lenient_expression")]
    pub expression: String,
    #[serde(deserialize_with = "lenient_count")]
    pub input_count: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwitchProps {
    pub cases: Vec<SwitchCase>,
}

/// One `switch` case, tested in declaration order
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SwitchCase {
    /// Input port holding this case's value; defaults to `in-(2 + case index)`
    #[serde(deserialize_with = "lenient_count")]
    pub input_index: Option<usize>,
    #[serde(deserialize_with = "lenient_operator")]
    pub op: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
}

impl Default for SwitchCase {
    fn default() -> Self {
        Self {
            input_index: None,
            op: "=".to_string(),
            value: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RangeProps {
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub min_value: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub max_value: Option<f64>,
    pub inclusive_min: bool,
    pub inclusive_max: bool,
}

impl Default for RangeProps {
    fn default() -> Self {
        Self {
            min_value: None,
            max_value: None,
            inclusive_min: true,
            inclusive_max: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputProps {
    pub label: Option<String>,
    pub output_group: Option<String>,
}

/// A named attachment point: `in-<k>`, `out-<k>` or `cond-0`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Port {
    In(usize),
    Out(usize),
    Cond,
    Other(String),
}

impl Port {
    /// Index of an `in-<k>` port
    pub fn input_index(&self) -> Option<usize> {
        match self {
            Port::In(k) => Some(*k),
            _ => None,
        }
    }
}

impl From<String> for Port {
    fn from(s: String) -> Self {
        Port::from(s.as_str())
    }
}

impl From<&str> for Port {
    fn from(s: &str) -> Self {
        let parsed = s.split_once('-').and_then(|(prefix, idx)| {
            let k = idx.parse::<usize>().ok()?;
            match prefix {
                "in" => Some(Port::In(k)),
                "out" => Some(Port::Out(k)),
                "cond" if k == 0 => Some(Port::Cond),
                _ => None,
            }
        });
        parsed.unwrap_or_else(|| Port::Other(s.to_string()))
    }
}

impl From<Port> for String {
    fn from(p: Port) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::In(k) => write!(f, "in-{}", k),
            Port::Out(k) => write!(f, "out-{}", k),
            Port::Cond => write!(f, "cond-0"),
            Port::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A directed connection between two ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from_element: String,
    pub from_port: Port,
    pub to_element: String,
    pub to_port: Port,
}

impl Connection {
    pub fn new(
        from_element: impl Into<String>,
        from_port: impl Into<Port>,
        to_element: impl Into<String>,
        to_port: impl Into<Port>,
    ) -> Self {
        Self {
            from_element: from_element.into(),
            from_port: from_port.into(),
            to_element: to_element.into(),
            to_port: to_port.into(),
        }
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).filter(|n| n.is_finite()).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).filter(|n| n.is_finite()))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as usize))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if b { "1" } else { "0" }).to_string(),
        _ => "0".to_string(),
    })
}

/// Text of a scalar prop; `None` for null, arrays and objects
fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(text_from_value(Value::deserialize(deserializer)?))
}

fn lenient_expression<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Comparison operator text; a missing or non-text operator reads as `=`
fn lenient_operator<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        _ => "=".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_parsing() {
        assert_eq!(Port::from("in-0"), Port::In(0));
        assert_eq!(Port::from("in-12"), Port::In(12));
        assert_eq!(Port::from("out-1"), Port::Out(1));
        assert_eq!(Port::from("cond-0"), Port::Cond);
        assert_eq!(Port::from("cond-1"), Port::Other("cond-1".to_string()));
        assert_eq!(Port::from("weird"), Port::Other("weird".to_string()));
        assert_eq!(Port::In(3).to_string(), "in-3");
    }

    #[test]
    fn test_elements_keep_document_order() {
        let project: Project = serde_json::from_value(json!({
            "elements": {
                "output-2": {"type": "output", "props": {}},
                "output-1": {"type": "output", "props": {}},
                "sig": {"type": "input-signal", "props": {"name": "Speed"}}
            },
            "connections": []
        }))
        .unwrap();

        let ids: Vec<&str> = project.outputs().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["output-2", "output-1"]);
        assert_eq!(project.element("sig").unwrap().signal_name(), "Speed");
    }

    #[test]
    fn test_lenient_props() {
        let project: Project = serde_json::from_value(json!({
            "elements": {
                "c": {"type": "const", "props": {"value": "42"}},
                "bad": {"type": "const", "props": {"value": "abc"}},
                "r": {"type": "range", "props": {"minValue": 1, "maxValue": ""}},
                "n": {"type": "not"},
                "x": {"type": "sticky-note", "props": {"text": "hi"}}
            }
        }))
        .unwrap();

        assert_eq!(
            project.element("c").unwrap().kind,
            ElementKind::Const(ConstProps { value: 42.0 })
        );
        assert_eq!(
            project.element("bad").unwrap().kind,
            ElementKind::Const(ConstProps { value: 0.0 })
        );
        match &project.element("r").unwrap().kind {
            ElementKind::Range(r) => {
                assert_eq!(r.min_value, Some(1.0));
                assert_eq!(r.max_value, None);
                assert!(r.inclusive_min && r.inclusive_max);
            }
            other => panic!("Expected Range, got {:?}", other),
        }
        assert_eq!(project.element("n").unwrap().kind, ElementKind::Not);
        assert_eq!(
            project.element("x").unwrap().kind,
            ElementKind::Unknown("sticky-note".to_string())
        );
    }

    #[test]
    fn test_malformed_props_fall_back_to_defaults() {
        let project: Project = serde_json::from_value(json!({
            "elements": {
                "s": {"type": "input-signal", "props": {"name": 5}},
                "i": {"type": "if", "props": {"operator": null}},
                "f": {"type": "formula", "props": {"expression": null, "inputCount": 2}},
                "g": {"type": "range", "props": "not an object"},
                "o": {"type": "output", "props": {"label": ["x"]}}
            }
        }))
        .unwrap();

        match &project.element("s").unwrap().kind {
            ElementKind::InputSignal(p) => assert_eq!(p.name.as_deref(), Some("5")),
            other => panic!("Expected InputSignal, got {:?}", other),
        }
        match &project.element("i").unwrap().kind {
            ElementKind::If(p) => assert_eq!(p.operator, "="),
            other => panic!("Expected If, got {:?}", other),
        }
        match &project.element("f").unwrap().kind {
            ElementKind::Formula(p) => assert_eq!(p.expression, ""),
            other => panic!("Expected Formula, got {:?}", other),
        }
        assert_eq!(
            project.element("g").unwrap().kind,
            ElementKind::Range(RangeProps::default())
        );
        assert_eq!(
            project.element("o").unwrap().kind,
            ElementKind::Output(OutputProps::default())
        );
        assert_eq!(project.element("o").unwrap().kind.type_name(), "output");
    }

    #[test]
    fn test_switch_case_values() {
        let props: SwitchProps = serde_json::from_value(json!({
            "cases": [
                {"op": "=", "value": 1},
                {"inputIndex": 4, "op": ">", "value": "2.5"},
                {}
            ]
        }))
        .unwrap();
        assert_eq!(props.cases[0].value, "1");
        assert_eq!(props.cases[1].input_index, Some(4));
        assert_eq!(props.cases[1].value, "2.5");
        assert_eq!(props.cases[2], SwitchCase::default());
    }

    #[test]
    fn test_signal_name_falls_back_to_id() {
        let e = Element::new(
            "input-signal-3",
            ElementKind::InputSignal(SignalProps {
                name: Some(String::new()),
            }),
        );
        assert_eq!(e.signal_name(), "input-signal-3");
    }

    #[test]
    fn test_connection_roundtrip_names() {
        let c: Connection = serde_json::from_value(json!({
            "fromElement": "a", "fromPort": "out-0", "toElement": "b", "toPort": "cond-0"
        }))
        .unwrap();
        assert_eq!(c, Connection::new("a", "out-0", "b", "cond-0"));
        assert_eq!(serde_json::to_value(&c).unwrap()["toPort"], "cond-0");
    }
}
