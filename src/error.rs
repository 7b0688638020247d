// SPDX-License-Identifier: MIT

//! Typed error handling for sigcode-rs
//!
//! Compilation itself is fail-open: [`crate::codegen::generate`] never returns an
//! error, it embeds the message of a [`SigcodeError`] into the output text instead.

use thiserror::Error;

/// Top-level error type for sigcode-rs
#[derive(Debug, Error)]
pub enum SigcodeError {
    /// Configuration errors (bad settings file, invalid env override)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Project / template document errors
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// A formula template that cannot be expanded
    #[error("Template '{name}': {message}")]
    Template { name: String, message: String },

    /// Formula text that failed to lex or parse
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Errors raised while reading editor documents
#[derive(Debug, Error)]
pub enum ProjectError {
    /// File not found when loading a project or template file
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// File extension is neither JSON nor YAML
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Filename escapes the configured project directory
    #[error("Invalid project filename: {0}")]
    InvalidFilename(String),
}

/// Lexer / parser errors for formula text
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormulaError {
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unexpected token '{found}' at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        pos: usize,
    },

    #[error("Unexpected end of formula, expected {0}")]
    UnexpectedEnd(String),

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),
}

impl SigcodeError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a template error
    pub fn template(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for SigcodeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for SigcodeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = SigcodeError::template("h", "body does not parse");
        assert_eq!(err.to_string(), "Template 'h': body does not parse");
    }

    #[test]
    fn test_formula_error_converts() {
        let err: SigcodeError = FormulaError::UnexpectedEnd("expression".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Formula error: Unexpected end of formula, expected expression"
        );
    }

    #[test]
    fn test_project_error_converts() {
        let err: SigcodeError = ProjectError::FileNotFound("a.json".to_string()).into();
        assert!(err.to_string().contains("a.json"));
    }
}
