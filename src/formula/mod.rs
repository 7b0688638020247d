// SPDX-License-Identifier: MIT

//! Formula mini-language
//!
//! This module provides:
//! - `lexer` / `parser` - formula text to [`FormulaExpr`]
//! - `ast` - the formula AST and its canonical text form
//! - `Expander` - inlining of templates and formula-to-formula references

pub mod ast;
mod expand;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, FormulaExpr, UnaryOp};
pub use expand::Expander;
pub use parser::parse;
