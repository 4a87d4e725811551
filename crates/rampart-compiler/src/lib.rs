//! Compiles service configs against a protobuf element graph.
//!
//! Aspects (HTTP, documentation, quota, ...) merge their rules onto the
//! elements reachable from the exposed interfaces, lint rules check the
//! result, and normalization re-emits every rule with exact selectors.

pub mod aspect;
pub mod aspects;
pub mod attributes;
pub mod compile;
pub mod diag;
pub mod error;
pub mod field_selector;
pub mod lint;
pub mod manifest;
pub mod path_template;
pub mod pipeline;
pub mod rules;
pub mod selector;
pub mod sorter;

pub use aspect::{Aspect, CompileContext};
pub use aspects::http::{CollectionSummary, RestKind};
pub use compile::{
    compile, compile_files, compile_with_manifest, compile_with_pipeline, CompileOptions,
    CompileResult, SourceFile, COMPILER_VERSION,
};
pub use diag::{Diagnostic, Severity};
pub use error::CompileError;
pub use manifest::{ProjectManifest, MANIFEST_FILE};
pub use pipeline::Pipeline;
pub use selector::SubsumptionPolicy;
