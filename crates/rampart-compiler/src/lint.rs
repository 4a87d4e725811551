//! Lint rules run over the merged model.

use std::collections::HashMap;

use rampart_model::{ElementId, ElementKind, Model, ServiceConfig};

use crate::attributes::Attributes;
use crate::diag::AspectReporter;

/// Read-only view handed to lint rules.
pub struct LintContext<'a> {
    pub model: &'a Model,
    pub config: &'a ServiceConfig,
    pub attrs: &'a Attributes,
}

/// A style check over elements of one kind. Findings are warnings named
/// `{aspect}-{rule}` and can be suppressed like any other warning.
pub trait LintRule {
    /// Aspect owning the rule.
    fn aspect(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn kind(&self) -> ElementKind;

    fn check(&self, cx: &LintContext<'_>, element: ElementId, reporter: &mut AspectReporter<'_>);
}

/// Lint rules indexed by the element kind they apply to.
#[derive(Default)]
pub struct LintRegistry {
    rules: HashMap<ElementKind, Vec<Box<dyn LintRule>>>,
}

impl LintRegistry {
    pub fn register(&mut self, rule: Box<dyn LintRule>) {
        self.rules.entry(rule.kind()).or_default().push(rule);
    }

    pub fn rules_for(&self, kind: ElementKind) -> &[Box<dyn LintRule>] {
        self.rules.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, ElementKind);

    impl LintRule for Named {
        fn aspect(&self) -> &'static str {
            "test"
        }

        fn name(&self) -> &'static str {
            self.0
        }

        fn kind(&self) -> ElementKind {
            self.1
        }

        fn check(&self, _: &LintContext<'_>, _: ElementId, _: &mut AspectReporter<'_>) {}
    }

    #[test]
    fn rules_are_dispatched_by_kind() {
        let mut registry = LintRegistry::default();
        registry.register(Box::new(Named("a", ElementKind::Method)));
        registry.register(Box::new(Named("b", ElementKind::Method)));
        registry.register(Box::new(Named("c", ElementKind::Interface)));

        let names: Vec<_> = registry
            .rules_for(ElementKind::Method)
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(registry.rules_for(ElementKind::Field).is_empty());
        assert_eq!(registry.len(), 3);
    }
}
