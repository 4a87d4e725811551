//! Compilation entry points.

use std::path::Path;

use rampart_model::{
    parse_model, parse_service_config, ElementId, ElementKind, Model, Scoper, ServiceConfig,
};
use rampart_telemetry::log_compile_started;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aspect::CompileContext;
use crate::aspects::http::CollectionSummary;
use crate::attributes::Attributes;
use crate::diag::{DiagCollector, Diagnostic, Diagnostics, SuppressionPolicy};
use crate::error::CompileError;
use crate::manifest::ProjectManifest;
use crate::pipeline::Pipeline;
use crate::selector::SubsumptionPolicy;

/// Compiler version (from Cargo.toml).
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Drop redundant prefixes from REST collection names where unambiguous.
    pub shorten_collection_names: bool,
    /// Direction of wildcard selector subsumption.
    pub subsumption: SubsumptionPolicy,
    /// Errors beyond this count abort the run with E3004 (default: 100).
    pub max_errors: usize,
    /// Warnings beyond this count are counted but not kept (default: 1000).
    pub max_warnings: usize,
    /// Suppressed warnings: `rule` or `rule@selector`.
    pub suppress: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            shorten_collection_names: false,
            subsumption: SubsumptionPolicy::default(),
            max_errors: 100,
            max_warnings: 1000,
            suppress: Vec::new(),
        }
    }
}

/// An input file and its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file: String,
    pub sha256: String,
}

/// Outcome of a compilation that was not aborted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    /// The normalized service config; `None` when errors were reported.
    pub config: Option<ServiceConfig>,
    /// REST collections inferred from the HTTP bindings.
    pub collections: Vec<CollectionSummary>,
    /// Stored diagnostics, in report order.
    pub diagnostics: Vec<Diagnostic>,
    pub errors: usize,
    /// Includes warnings past the storage cap.
    pub warnings: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceFile>,
}

impl CompileResult {
    pub fn success(&self) -> bool {
        self.errors == 0 && self.config.is_some()
    }
}

/// Compile a parsed model and service config with the built-in aspects.
pub fn compile(
    model: &Model,
    config: &ServiceConfig,
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    let mut pipeline = Pipeline::builtin()?;
    compile_with_pipeline(&mut pipeline, model, config, options)
}

/// Compile with a caller-assembled pipeline.
pub fn compile_with_pipeline(
    pipeline: &mut Pipeline,
    model: &Model,
    config: &ServiceConfig,
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    let apis = exposed_interfaces(model, config);
    log_compile_started!(
        service = %config.name,
        apis = apis.len(),
        elements = model.len()
    );

    let scoper = Scoper::from_roots(model, &apis);
    let mut attrs = Attributes::new(model);
    let mut diags = Diagnostics::new(
        DiagCollector::new(options.max_errors, options.max_warnings),
        SuppressionPolicy::new(&options.suppress),
    );

    let normalized = {
        let mut cx = CompileContext {
            model,
            scoper: &scoper,
            config,
            options,
            apis: &apis,
            attrs: &mut attrs,
            diags: &mut diags,
        };
        pipeline.run(&mut cx)?
    };

    let collections = attrs
        .get(model.root())
        .collections
        .as_ref()
        .map(|all| all.iter().map(|c| c.summary(model)).collect())
        .unwrap_or_default();

    let errors = diags.error_count();
    let warnings = diags.collector.warning_count();
    Ok(CompileResult {
        config: normalized,
        collections,
        diagnostics: diags.collector.into_diagnostics(),
        errors,
        warnings,
        sources: Vec::new(),
    })
}

/// Load and compile a model file and service config files.
///
/// Config files are merged in the given order; each input is recorded in the
/// result with its SHA-256.
pub fn compile_files(
    model_path: &Path,
    config_paths: &[&Path],
    options: &CompileOptions,
) -> Result<CompileResult, CompileError> {
    let mut sources = Vec::with_capacity(config_paths.len() + 1);

    let content = std::fs::read_to_string(model_path)?;
    let file = display_name(model_path);
    let model = parse_model(&content, &file)?;
    sources.push(SourceFile {
        file,
        sha256: compute_sha256(&content),
    });

    let mut config = ServiceConfig::default();
    for path in config_paths {
        let content = std::fs::read_to_string(path)?;
        let file = display_name(path);
        config.merge(parse_service_config(&content, &file)?);
        sources.push(SourceFile {
            file,
            sha256: compute_sha256(&content),
        });
    }

    let mut result = compile(&model, &config, options)?;
    result.sources = sources;
    Ok(result)
}

/// Compile the project described by a manifest.
///
/// Relative paths in the manifest resolve against `manifest_base_path`.
pub fn compile_with_manifest(
    project_manifest: &ProjectManifest,
    manifest_base_path: &Path,
) -> Result<CompileResult, CompileError> {
    let model_path = project_manifest.model_path(manifest_base_path);
    let config_paths = project_manifest.config_paths(manifest_base_path);
    let config_refs: Vec<&Path> = config_paths.iter().map(|p| p.as_path()).collect();
    compile_files(&model_path, &config_refs, &project_manifest.compile_options())
}

/// Interfaces listed under `apis`, or every interface when none are listed.
/// Names that do not resolve are reported by the mixin aspect.
fn exposed_interfaces(model: &Model, config: &ServiceConfig) -> Vec<ElementId> {
    if config.apis.is_empty() {
        return model.interfaces().collect();
    }
    config
        .apis
        .iter()
        .filter_map(|api| model.lookup(&api.name))
        .filter(|id| model.kind(*id) == ElementKind::Interface)
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn compute_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
