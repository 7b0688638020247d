// SPDX-License-Identifier: MIT

//! Project loader - JSON/YAML file loading and parsing
//!
//! This module handles loading editor projects and formula template files.

use super::templates::TemplateSet;
use super::types::Project;
use crate::config::CompilerOptions;
use crate::error::{ProjectError, SigcodeError};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Document format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, ProjectError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            _ => Err(ProjectError::UnsupportedFormat(
                path.to_string_lossy().to_string(),
            )),
        }
    }
}

/// Loads projects and templates from disk
pub struct ProjectLoader;

impl ProjectLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a project file
    pub fn load_project<P: AsRef<Path>>(&self, path: P) -> Result<Project, SigcodeError> {
        let value = self.load_value(path)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Load a project file as an untyped document, keeping every field
    pub fn load_value<P: AsRef<Path>>(&self, path: P) -> Result<Value, SigcodeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProjectError::FileNotFound(path.to_string_lossy().to_string()).into());
        }
        let content = fs::read_to_string(path)?;
        match Format::from_path(path)? {
            Format::Json => Ok(serde_json::from_str(&content)?),
            Format::Yaml => Ok(serde_yaml::from_str(&content)?),
        }
    }

    /// Load a template file; a missing file means no templates
    pub fn load_templates<P: AsRef<Path>>(&self, path: P) -> Result<TemplateSet, SigcodeError> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Templates not found: {}", path.display());
            return Ok(TemplateSet::default());
        }
        let content = fs::read_to_string(path)?;
        let set = match Format::from_path(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Yaml => serde_yaml::from_str(&content)?,
        };
        Ok(set)
    }

    /// Parse a project from a JSON string
    pub fn parse_json(content: &str) -> Result<Project, SigcodeError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a project from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Project, SigcodeError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Recompute the `code` field of an untyped project document
    ///
    /// Every other field is left as it was.
    pub fn regenerate(
        document: &mut Value,
        templates: &TemplateSet,
        options: &CompilerOptions,
    ) -> Result<String, SigcodeError> {
        let project: Project = serde_json::from_value(document.clone())?;
        let code = crate::codegen::generate_with_options(&project, templates, options);
        match document {
            Value::Object(map) => {
                map.insert("code".to_string(), Value::String(code.clone()));
            }
            _ => return Err(SigcodeError::other("Project document is not an object")),
        }
        Ok(code)
    }
}

impl Default for ProjectLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::types::ElementKind;
    use serde_json::json;

    #[test]
    fn test_parse_json_project() {
        let content = r#"{
            "elements": {
                "input-signal-1": {"id": "input-signal-1", "type": "input-signal",
                                   "x": 10, "y": 20, "props": {"name": "Speed"}},
                "output-1": {"id": "output-1", "type": "output", "props": {"label": "Out"}}
            },
            "connections": [
                {"fromElement": "input-signal-1", "fromPort": "out-0",
                 "toElement": "output-1", "toPort": "in-0"}
            ],
            "counter": 2,
            "project": {"code": "SPEED_COPY"}
        }"#;
        let project = ProjectLoader::parse_json(content).unwrap();
        assert_eq!(project.elements.len(), 2);
        assert_eq!(project.connections.len(), 1);
        assert!(matches!(
            project.element("output-1").unwrap().kind,
            ElementKind::Output(_)
        ));
    }

    #[test]
    fn test_parse_yaml_project() {
        let yaml = r#"
elements:
  c1:
    type: const
    props:
      value: 5
  out:
    type: output
connections:
  - fromElement: c1
    fromPort: out-0
    toElement: out
    toPort: in-0
"#;
        let project = ProjectLoader::parse_yaml(yaml).unwrap();
        assert_eq!(project.elements.len(), 2);
        assert_eq!(project.connections[0].from_element, "c1");
    }

    #[test]
    fn test_invalid_document_returns_error() {
        let content = r#"{"elements": {"c": {"type": "const", "props": {"value": [1]}}},
                          "connections": "nope"}"#;
        assert!(ProjectLoader::parse_json(content).is_err());
    }

    #[test]
    fn test_regenerate_only_touches_code() {
        let mut doc = json!({
            "elements": {
                "c": {"type": "const", "props": {"value": 7}, "x": 1},
                "out": {"type": "output", "props": {}}
            },
            "connections": [
                {"fromElement": "c", "fromPort": "out-0", "toElement": "out", "toPort": "in-0"}
            ],
            "counter": 3,
            "code": "stale"
        });
        let code = ProjectLoader::regenerate(
            &mut doc,
            &TemplateSet::default(),
            &CompilerOptions::default(),
        )
        .unwrap();
        assert_eq!(code, "7");
        assert_eq!(doc["code"], "7");
        assert_eq!(doc["counter"], 3);
        assert_eq!(doc["elements"]["c"]["x"], 1);
    }

    #[test]
    fn test_unsupported_format() {
        let err = Format::from_path(Path::new("project.txt")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_missing_project_file() {
        let loader = ProjectLoader::new();
        let err = loader.load_project("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
