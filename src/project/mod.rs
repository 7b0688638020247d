// SPDX-License-Identifier: MIT

//! Editor documents consumed by the compiler
//!
//! This module provides:
//! - `Project` - elements and connections of one graph
//! - `TemplateSet` - named formula templates
//! - `ProjectLoader` - JSON/YAML file loading

pub mod loader;
mod templates;
mod types;

pub use loader::{Format, ProjectLoader};
pub use templates::{Bound, Template, TemplateArgs, TemplateParam, TemplateSet};
pub use types::{
    Connection, ConstProps, Element, ElementKind, Elements, FormulaProps, GateProps, IfProps,
    OutputProps, Port, Project, RangeProps, SignalProps, SwitchCase, SwitchProps,
};
