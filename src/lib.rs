// SPDX-License-Identifier: MIT

//! sigcode-rs: compiles signal dataflow graphs into closed-form `WHEN` expressions.
//!
//! The editor layer supplies a [`project::Project`] (elements and port-addressed
//! connections) plus an optional [`project::TemplateSet`]; [`codegen::generate`]
//! returns the optimized expression text.

pub mod codegen;
pub mod config;
pub mod error;
pub mod formula;
pub mod project;
pub mod server;

pub use codegen::{generate, generate_with_options};
pub use config::{CompilerOptions, Settings};
pub use error::{FormulaError, ProjectError, SigcodeError};
