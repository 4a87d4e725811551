//! The aspect plugin interface.

use rampart_model::{ElementId, Model, Scoper, ServiceConfig};

use crate::attributes::Attributes;
use crate::compile::CompileOptions;
use crate::diag::Diagnostics;
use crate::lint::LintRegistry;

/// Everything an aspect can see or touch during one compilation.
pub struct CompileContext<'a> {
    pub model: &'a Model,
    pub scoper: &'a Scoper,
    pub config: &'a ServiceConfig,
    pub options: &'a CompileOptions,
    /// Interfaces exposed by the service, in model order.
    pub apis: &'a [ElementId],
    pub attrs: &'a mut Attributes,
    pub diags: &'a mut Diagnostics,
}

/// A unit of configuration semantics (HTTP, documentation, quota, ...).
///
/// A fresh set of aspects is created for every compilation, so per-run state
/// lives in plain fields. Hooks run in dependency order: an aspect's `merge`
/// for an element always runs after the `merge` of every aspect it depends on
/// has finished for the whole graph.
pub trait Aspect {
    /// Unique name, also the prefix of this aspect's warning rules.
    fn name(&self) -> &'static str;

    /// Names of aspects whose merged attributes this aspect reads.
    fn merge_dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    fn register_lint_rules(&self, _registry: &mut LintRegistry) {}

    fn start_merging(&mut self, _cx: &mut CompileContext<'_>) {}

    fn merge(&mut self, _cx: &mut CompileContext<'_>, _element: ElementId) {}

    fn end_merging(&mut self, _cx: &mut CompileContext<'_>) {}

    fn start_normalization(&mut self, _cx: &mut CompileContext<'_>, _out: &mut ServiceConfig) {}

    /// Re-emit the attributes of `element` as canonical rules in `out`.
    fn normalize(
        &mut self,
        _cx: &mut CompileContext<'_>,
        _element: ElementId,
        _out: &mut ServiceConfig,
    ) {
    }

    fn end_normalization(&mut self, _cx: &mut CompileContext<'_>, _out: &mut ServiceConfig) {}
}
