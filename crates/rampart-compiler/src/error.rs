use thiserror::Error;

/// Fatal errors that stop a compilation outright.
///
/// Problems in user input are reported as [`crate::diag::Diagnostic`]s instead;
/// these variants cover broken aspect registration, resource exhaustion and
/// unreadable inputs.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Model or service config could not be loaded.
    #[error(transparent)]
    Parse(#[from] rampart_model::ParseError),

    /// E3001: Aspects depend on each other in a cycle.
    #[error("E3001: aspect dependency cycle: {}", .0.join(" -> "))]
    AspectCycle(Vec<String>),

    /// E3002: An aspect depends on an aspect that is not registered.
    #[error("E3002: aspect '{aspect}' depends on unregistered aspect '{dependency}'")]
    UnknownAspectDependency { aspect: String, dependency: String },

    /// E3003: Two aspects registered under the same name.
    #[error("E3003: aspect '{0}' registered more than once")]
    DuplicateAspect(String),

    /// E3004: Too many errors were reported.
    #[error("E3004: too many errors (limit {0}), compilation aborted")]
    DiagnosticLimit(usize),

    /// Project manifest parsing or loading error.
    #[error("manifest error: {0}")]
    ManifestError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
