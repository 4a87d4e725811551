//! Test harnesses for Rampart.
//!
//! Fixture projects live under `tests/fixtures` at the workspace root and are
//! shared by the library regression tests here and the CLI tests, which drive
//! the `rampart` binary as a subprocess.

use std::path::PathBuf;

use rampart_compiler::{compile_with_manifest, CompileError, CompileResult, ProjectManifest};

#[cfg(test)]
pub mod cli;

/// Absolute path to the shared test fixtures directory.
pub fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/rampart-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|crates| crates.parent())
        .map(|root| root.join("tests/fixtures"))
        .unwrap_or_else(|| PathBuf::from("tests/fixtures"))
}

/// Compile the fixture project whose manifest is `fixtures()/<name>/rampart.yaml`.
pub fn compile_fixture(name: &str) -> Result<CompileResult, CompileError> {
    let dir = fixtures().join(name);
    let manifest = ProjectManifest::load(&dir.join(rampart_compiler::MANIFEST_FILE))?;
    compile_with_manifest(&manifest, &dir)
}
