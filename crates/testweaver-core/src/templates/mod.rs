//! Named template registry with the embedded C# test templates.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::TemplateError;

/// Templates compiled into the binary, keyed by `{language}/{name}`.
const EMBEDDED: &[(&str, &str)] = &[
    ("csharp/unit-test", include_str!("csharp/unit-test.mustache")),
    ("csharp/service-test", include_str!("csharp/service-test.mustache")),
    ("csharp/controller-test", include_str!("csharp/controller-test.mustache")),
];

/// Compiled Mustache templates by name. Later registrations replace earlier ones.
pub struct TemplateRegistry {
    templates: HashMap<String, mustache::Template>,
}

impl TemplateRegistry {
    /// Registry holding the embedded templates.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, source) in EMBEDDED {
            if let Err(e) = registry.register(name, source) {
                warn!("Embedded template {name} failed to parse: {e}");
            }
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Parse and register `content` under `name`.
    pub fn register(&mut self, name: &str, content: &str) -> Result<(), TemplateError> {
        let template = mustache::compile_str(content).map_err(|source| TemplateError::Compile {
            template: name.to_string(),
            source,
        })?;
        self.templates.insert(name.to_string(), template);
        debug!("Registered template: {name}");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        debug!("Rendering template: {name}");
        let mut out = Vec::new();
        template
            .render(&mut out, data)
            .map_err(|source| TemplateError::Render {
                template: name.to_string(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Register every `*.mustache` below `dir`, named by relative path without
    /// the extension (`csharp/unit-test`). A missing directory registers nothing.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        if !dir.is_dir() {
            warn!("Template directory does not exist: {}", dir.display());
            return Ok(0);
        }
        let mut loaded = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| TemplateError::Io {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            let is_template = path.extension().is_some_and(|ext| ext == "mustache");
            if !entry.file_type().is_file() || !is_template {
                continue;
            }
            let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let name = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            self.register(&name, &content)?;
            loaded += 1;
        }
        debug!("Loaded {loaded} templates from {}", dir.display());
        Ok(loaded)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_templates_are_registered() {
        let registry = TemplateRegistry::new();
        assert_eq!(
            registry.names(),
            vec!["csharp/controller-test", "csharp/service-test", "csharp/unit-test"]
        );
    }

    #[test]
    fn unknown_template() {
        let registry = TemplateRegistry::empty();
        let err = registry.render("csharp/none", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(name) if name == "csharp/none"));
    }

    #[test]
    fn register_overrides() {
        let mut registry = TemplateRegistry::new();
        registry
            .register("csharp/unit-test", "// {{className}}")
            .unwrap();
        let out = registry
            .render("csharp/unit-test", &json!({ "className": "Calculator" }))
            .unwrap();
        assert_eq!(out, "// Calculator");
    }

    #[test]
    fn sections_lists_and_raw_values() {
        let mut registry = TemplateRegistry::empty();
        registry
            .register(
                "t",
                "{{#usings}}\nusing {{.}};\n{{/usings}}\n{{#isAsync}}async {{/isAsync}}{{^isAsync}}void {{/isAsync}}{{{call}}}",
            )
            .unwrap();
        let out = registry
            .render(
                "t",
                &json!({ "usings": ["System", "Xunit"], "isAsync": false, "call": "Get<int>()" }),
            )
            .unwrap();
        assert_eq!(out, "using System;\nusing Xunit;\nvoid Get<int>()");
    }

    #[test]
    fn unbalanced_section_is_rejected() {
        let mut registry = TemplateRegistry::empty();
        let err = registry.register("broken", "{{#a}}x").unwrap_err();
        assert!(matches!(err, TemplateError::Compile { template, .. } if template == "broken"));
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn load_directory_names_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("csharp")).unwrap();
        std::fs::write(dir.path().join("csharp/custom.mustache"), "{{x}}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = TemplateRegistry::empty();
        assert_eq!(registry.load_from_directory(dir.path()).unwrap(), 1);
        assert_eq!(
            registry.render("csharp/custom", &json!({ "x": "ok" })).unwrap(),
            "ok"
        );
        assert_eq!(
            registry.load_from_directory(&dir.path().join("missing")).unwrap(),
            0
        );
    }
}
