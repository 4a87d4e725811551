//! Diagnostics collection and warning suppression.

use std::collections::HashSet;
use std::fmt;

use rampart_model::Location;
use serde::{Deserialize, Serialize};

use crate::selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single error or warning tied to a location.
///
/// Errors carry an `E2xxx` code; warnings carry the kebab-case rule name they
/// can be suppressed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: &str, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            location,
            message: message.into(),
        }
    }

    pub fn warning(rule: &str, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: rule.to_string(),
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {}: {}",
            self.severity, self.code, self.location, self.message
        )
    }
}

/// Destination for diagnostics.
pub trait DiagSink {
    fn add_diag(&mut self, diag: Diagnostic);

    fn error_count(&self) -> usize;

    fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Bounded diagnostic store.
///
/// Once more than `max_errors` errors arrive the collector marks itself
/// exhausted; the pipeline checks this and aborts the run. Warnings past
/// `max_warnings` are counted but not stored.
#[derive(Debug, Clone)]
pub struct DiagCollector {
    diags: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
    max_errors: usize,
    max_warnings: usize,
}

impl DiagCollector {
    pub fn new(max_errors: usize, max_warnings: usize) -> Self {
        Self {
            diags: Vec::new(),
            errors: 0,
            warnings: 0,
            max_errors,
            max_warnings,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diags
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    /// True once the error cap has been exceeded.
    pub fn is_exhausted(&self) -> bool {
        self.errors > self.max_errors
    }
}

impl DiagSink for DiagCollector {
    fn add_diag(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => {
                self.errors += 1;
                if self.errors <= self.max_errors {
                    self.diags.push(diag);
                }
            }
            Severity::Warning => {
                self.warnings += 1;
                if self.warnings <= self.max_warnings {
                    self.diags.push(diag);
                }
            }
        }
    }

    fn error_count(&self) -> usize {
        self.errors
    }
}

/// Which warnings are silenced.
///
/// Entries are either a bare rule name (`http-body-missing`) that silences the
/// rule everywhere, or `rule@selector` which silences it for matching elements.
#[derive(Debug, Clone, Default)]
pub struct SuppressionPolicy {
    global: HashSet<String>,
    scoped: Vec<(String, String)>,
}

impl SuppressionPolicy {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            match entry.split_once('@') {
                Some((rule, sel)) => policy
                    .scoped
                    .push((rule.trim().to_string(), sel.trim().to_string())),
                None if !entry.is_empty() => {
                    policy.global.insert(entry.to_string());
                }
                None => {}
            }
        }
        policy
    }

    pub fn is_suppressed(&self, rule: &str, element: Option<&str>) -> bool {
        if self.global.contains(rule) {
            return true;
        }
        let Some(element) = element else {
            return false;
        };
        self.scoped
            .iter()
            .any(|(r, sel)| r == rule && selector::matches(sel, element))
    }
}

/// Diagnostics plus the policy that filters warnings on their way in.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub collector: DiagCollector,
    pub suppression: SuppressionPolicy,
}

impl Diagnostics {
    pub fn new(collector: DiagCollector, suppression: SuppressionPolicy) -> Self {
        Self {
            collector,
            suppression,
        }
    }

    /// A reporter that attributes diagnostics to `aspect`.
    pub fn reporter(&mut self, aspect: &'static str) -> AspectReporter<'_> {
        AspectReporter {
            aspect,
            policy: &self.suppression,
            sink: &mut self.collector,
        }
    }

    pub fn error_count(&self) -> usize {
        self.collector.error_count()
    }
}

/// Sink adapter used by aspects.
///
/// Warning rule names are qualified with the aspect name (`body-missing`
/// reported by `http` becomes `http-body-missing`) and dropped when the
/// suppression policy silences them. Errors always pass through.
pub struct AspectReporter<'a> {
    aspect: &'static str,
    policy: &'a SuppressionPolicy,
    sink: &'a mut dyn DiagSink,
}

impl AspectReporter<'_> {
    pub fn error(&mut self, code: &str, location: &Location, message: impl Into<String>) {
        self.sink
            .add_diag(Diagnostic::error(code, location.clone(), message));
    }

    /// Report a warning unless suppressed for `element`.
    pub fn warning(
        &mut self,
        rule: &str,
        element: Option<&str>,
        location: &Location,
        message: impl Into<String>,
    ) {
        let rule = format!("{}-{}", self.aspect, rule);
        if self.policy.is_suppressed(&rule, element) {
            return;
        }
        self.sink
            .add_diag(Diagnostic::warning(&rule, location.clone(), message));
    }
}

impl DiagSink for AspectReporter<'_> {
    fn add_diag(&mut self, diag: Diagnostic) {
        if diag.severity == Severity::Warning && self.policy.is_suppressed(&diag.code, None) {
            return;
        }
        self.sink.add_diag(diag);
    }

    fn error_count(&self) -> usize {
        self.sink.error_count()
    }
}
