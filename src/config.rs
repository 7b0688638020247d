// SPDX-License-Identifier: MIT

//! Settings and compiler options
//!
//! Settings come from an optional YAML/JSON file, then environment variables
//! (`.env` is read by the binary before this runs), then CLI flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SigcodeError;
use crate::project::Format;

pub const ENV_PROJECT_DIR: &str = "SIGCODE_PROJECT_DIR";
pub const ENV_TEMPLATES: &str = "SIGCODE_TEMPLATES";
pub const ENV_PORT: &str = "SIGCODE_PORT";
pub const ENV_MAX_DEPTH: &str = "SIGCODE_MAX_DEPTH";

/// Limits applied to a single compile
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Recursion bound shared by the condition and expression simplifiers
    pub max_simplify_depth: usize,
    /// Nesting bound for template and formula-reference expansion
    pub max_expansion_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_simplify_depth: 200,
            max_expansion_depth: 10,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding saved projects
    #[serde(alias = "projectDataFolder")]
    pub project_dir: Option<PathBuf>,
    /// Formula template file
    #[serde(alias = "templatesPath")]
    pub templates_path: Option<PathBuf>,
    /// HTTP port for `serve`
    pub port: u16,
    pub compiler: CompilerOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_dir: None,
            templates_path: None,
            port: 8000,
            compiler: CompilerOptions::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML or JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SigcodeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match Format::from_path(path)? {
            Format::Json => Self::parse_json(&content),
            Format::Yaml => Self::parse_yaml(&content),
        }
    }

    pub fn parse_json(content: &str) -> Result<Self, SigcodeError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn parse_yaml(content: &str) -> Result<Self, SigcodeError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `SIGCODE_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), SigcodeError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SigcodeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_PROJECT_DIR) {
            self.project_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup(ENV_TEMPLATES) {
            self.templates_path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| SigcodeError::config(format!("{} is not a port: {}", ENV_PORT, port)))?;
        }
        if let Some(depth) = lookup(ENV_MAX_DEPTH) {
            self.compiler.max_simplify_depth = depth.trim().parse().map_err(|_| {
                SigcodeError::config(format!("{} is not a number: {}", ENV_MAX_DEPTH, depth))
            })?;
        }
        Ok(())
    }
}
