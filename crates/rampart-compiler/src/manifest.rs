//! Project manifest (`rampart.yaml`) parser.
//!
//! The manifest names the model file, the service config files merged on top
//! of each other and the options to compile them with.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compile::CompileOptions;
use crate::error::CompileError;

/// Conventional manifest file name.
pub const MANIFEST_FILE: &str = "rampart.yaml";

/// A project manifest (`rampart.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Model file (relative to the manifest or absolute).
    pub model: String,
    /// Service config files, merged in order.
    #[serde(default)]
    pub configs: Vec<String>,
    #[serde(default)]
    pub options: CompileOptions,
}

impl ProjectManifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::ManifestError(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content, path)
    }

    /// Parse a manifest from YAML content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, CompileError> {
        let manifest: Self = serde_yaml::from_str(content).map_err(|e| {
            CompileError::ManifestError(format!("failed to parse {}: {}", path.display(), e))
        })?;
        if manifest.model.trim().is_empty() {
            return Err(CompileError::ManifestError(format!(
                "{} does not name a model file",
                path.display()
            )));
        }
        Ok(manifest)
    }

    pub fn model_path(&self, base_path: &Path) -> PathBuf {
        resolve(&self.model, base_path)
    }

    pub fn config_paths(&self, base_path: &Path) -> Vec<PathBuf> {
        self.configs.iter().map(|c| resolve(c, base_path)).collect()
    }

    pub fn compile_options(&self) -> CompileOptions {
        self.options.clone()
    }
}

fn resolve(path: &str, base_path: &Path) -> PathBuf {
    if Path::new(path).is_absolute() {
        Path::new(path).to_path_buf()
    } else {
        base_path.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::SubsumptionPolicy;
    use tempfile::TempDir;

    #[test]
    fn parse_minimal_manifest() {
        let manifest = ProjectManifest::parse("model: api.yaml", Path::new(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.model, "api.yaml");
        assert!(manifest.configs.is_empty());
        assert_eq!(manifest.options, CompileOptions::default());
    }

    #[test]
    fn parse_manifest_with_options() {
        let content = r#"
model: model/library.yaml
configs:
  - service.yaml
  - overrides/quota.yaml
options:
  shorten_collection_names: true
  subsumption: reversed
  suppress:
    - documentation-missing
"#;
        let manifest = ProjectManifest::parse(content, Path::new(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.configs.len(), 2);

        let options = manifest.compile_options();
        assert!(options.shorten_collection_names);
        assert_eq!(options.subsumption, SubsumptionPolicy::Reversed);
        assert_eq!(options.suppress, vec!["documentation-missing"]);
        assert_eq!(options.max_errors, CompileOptions::default().max_errors);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let content = "model: model.yaml\nconfigs: [/etc/rampart/service.yaml, local.yaml]";
        let manifest = ProjectManifest::parse(content, Path::new(MANIFEST_FILE)).unwrap();
        let base = Path::new("/work/project");
        assert_eq!(
            manifest.model_path(base),
            PathBuf::from("/work/project/model.yaml")
        );
        assert_eq!(
            manifest.config_paths(base),
            vec![
                PathBuf::from("/etc/rampart/service.yaml"),
                PathBuf::from("/work/project/local.yaml"),
            ]
        );
    }

    #[test]
    fn missing_model_is_rejected() {
        let result = ProjectManifest::parse("configs: [a.yaml]", Path::new(MANIFEST_FILE));
        assert!(result.unwrap_err().to_string().contains("failed to parse"));

        let result = ProjectManifest::parse("model: \"  \"", Path::new(MANIFEST_FILE));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("does not name a model file"));
    }

    #[test]
    fn load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = ProjectManifest::load(&temp.path().join(MANIFEST_FILE));
        assert!(result.unwrap_err().to_string().contains("failed to read"));
    }

    #[test]
    fn compile_project_from_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("model.yaml"),
            r#"
package: echo.v1
messages:
  - name: Msg
    fields:
      - { name: text, number: 1, type: string }
services:
  - name: Echo
    methods:
      - name: CreateMessage
        input: Msg
        output: Msg
        http: { post: /v1/messages, body: "*" }
"#,
        )
        .unwrap();
        std::fs::write(temp.path().join("service.yaml"), "name: echo.example.com\n").unwrap();
        let manifest_path = temp.path().join(MANIFEST_FILE);
        std::fs::write(
            &manifest_path,
            "model: model.yaml\nconfigs: [service.yaml]\noptions:\n  suppress: [documentation-missing]\n",
        )
        .unwrap();

        let manifest = ProjectManifest::load(&manifest_path).unwrap();
        let result = crate::compile_with_manifest(&manifest, temp.path()).unwrap();
        assert!(result.success(), "{:?}", result.diagnostics);
        assert_eq!(result.warnings, 0, "{:?}", result.diagnostics);
        assert_eq!(result.sources.len(), 2);
        let config = result.config.unwrap();
        assert_eq!(config.name, "echo.example.com");
        assert_eq!(config.http.rules[0].selector, "echo.v1.Echo.CreateMessage");
    }
}
