//! Major versions of interfaces.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::Regex;

use rampart_model::{ElementId, ElementKind, Model, ServiceConfig};

use crate::aspect::{Aspect, CompileContext};
use crate::aspects::http::DEFAULT_VERSION;
use crate::diag::AspectReporter;
use crate::lint::{LintContext, LintRegistry, LintRule};

pub const NAME: &str = "versioning";

const E_BAD_VERSION: &str = "E2030";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAttribute {
    /// Major version such as `v1` or `v2beta1`.
    pub major: String,
}

fn major_regex() -> &'static Regex {
    static MAJOR: OnceLock<Regex> = OnceLock::new();
    MAJOR.get_or_init(|| Regex::new(r"^v\d+([a-z]+\d*)?").expect("version pattern compiles"))
}

/// Major version of a version string (`v2.1` -> `v2`).
pub fn major_version(version: &str) -> Option<String> {
    let version = version.trim();
    let major = major_regex().find(version)?.as_str();
    let rest = &version[major.len()..];
    (rest.is_empty() || rest.starts_with('.')).then(|| major.to_string())
}

/// Major version implied by an interface's package, defaulting to `v1`.
pub fn package_version(model: &Model, interface: ElementId) -> String {
    model
        .full_name(interface)
        .split('.')
        .find_map(major_version)
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// Version of an interface: from its `apis` entry, else from the package.
pub fn interface_version(model: &Model, config: &ServiceConfig, interface: ElementId) -> String {
    let name = model.full_name(interface);
    config
        .apis
        .iter()
        .rev()
        .find(|api| api.name == name)
        .and_then(|api| api.version.as_deref())
        .and_then(major_version)
        .unwrap_or_else(|| package_version(model, interface))
}

#[derive(Debug, Default)]
pub struct VersioningAspect {
    /// Interfaces by major version.
    seen: BTreeMap<String, Vec<String>>,
}

impl Aspect for VersioningAspect {
    fn name(&self) -> &'static str {
        NAME
    }

    fn merge_dependencies(&self) -> &'static [&'static str] {
        &["http"]
    }

    fn register_lint_rules(&self, registry: &mut LintRegistry) {
        registry.register(Box::new(HttpVersionRule));
    }

    fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
        let mut reporter = cx.diags.reporter(NAME);
        for api in &cx.config.apis {
            let Some(version) = &api.version else {
                continue;
            };
            if major_version(version).is_none() {
                reporter.error(
                    E_BAD_VERSION,
                    &api.origin,
                    format!(
                        "version '{}' of api '{}' must start with a major version like 'v1'",
                        version, api.name
                    ),
                );
            }
        }
    }

    fn merge(&mut self, cx: &mut CompileContext<'_>, element: ElementId) {
        if cx.model.kind(element) != ElementKind::Interface {
            return;
        }
        let major = interface_version(cx.model, cx.config, element);
        self.seen
            .entry(major.clone())
            .or_default()
            .push(cx.model.full_name(element).to_string());
        cx.attrs.get_mut(element).version = Some(VersionAttribute { major });
    }

    fn end_merging(&mut self, cx: &mut CompileContext<'_>) {
        if self.seen.len() <= 1 {
            return;
        }
        let summary: Vec<_> = self
            .seen
            .iter()
            .map(|(major, interfaces)| format!("{} ({})", major, interfaces.join(", ")))
            .collect();
        let location = cx.model.element(cx.model.root()).location.clone();
        cx.diags.reporter(NAME).warning(
            "inconsistent",
            None,
            &location,
            format!("interfaces disagree on the major version: {}", summary.join("; ")),
        );
    }
}

/// Methods whose REST path version differs from their interface version.
struct HttpVersionRule;

impl LintRule for HttpVersionRule {
    fn aspect(&self) -> &'static str {
        NAME
    }

    fn name(&self) -> &'static str {
        "http-version"
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Method
    }

    fn check(&self, cx: &LintContext<'_>, element: ElementId, reporter: &mut AspectReporter<'_>) {
        let Some(interface) = cx.model.element(element).parent else {
            return;
        };
        let Some(version) = &cx.attrs.get(interface).version else {
            return;
        };
        let Some(methods) = &cx.attrs.get(element).rest_methods else {
            return;
        };
        let name = cx.model.full_name(element);
        for method in methods.iter().filter(|m| !m.is_unbound()) {
            if method.version != version.major {
                reporter.warning(
                    self.name(),
                    Some(name),
                    &cx.model.element(element).location,
                    format!(
                        "HTTP path version '{}' of '{}' differs from interface version '{}'",
                        method.version, name, version.major
                    ),
                );
            }
        }
    }
}
