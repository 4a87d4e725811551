//! HTTP bindings and the REST view derived from them.

mod binding;
mod rest;

pub use binding::{
    evaluate, evaluate_rule, BodyBinding, HttpAttribute, HttpBinding, HttpMethod,
};
pub use rest::{
    rest_method, CollectionAttribute, CollectionSummary, RestAnalyzer, RestKind, RestMethod,
    DEFAULT_VERSION,
};

use rampart_model::{ElementId, ElementKind, HttpRule, ServiceConfig};

use crate::aspect::{Aspect, CompileContext};
use crate::diag::AspectReporter;
use crate::lint::{LintContext, LintRegistry, LintRule};
use crate::rules::RuleSet;

pub const NAME: &str = "http";

/// Binds methods to HTTP and infers their REST collections.
#[derive(Debug)]
pub struct HttpAspect {
    rules: RuleSet<HttpRule>,
    analyzer: RestAnalyzer,
}

impl Default for HttpAspect {
    fn default() -> Self {
        Self {
            rules: RuleSet::new(Vec::new()),
            analyzer: RestAnalyzer::default(),
        }
    }
}

impl Aspect for HttpAspect {
    fn name(&self) -> &'static str {
        NAME
    }

    fn register_lint_rules(&self, registry: &mut LintRegistry) {
        registry.register(Box::new(RestPatternRule));
        registry.register(Box::new(RestConflictRule));
    }

    fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
        self.rules = RuleSet::build(
            cx.config.http.rules.clone(),
            cx.options.subsumption,
            &mut cx.diags.reporter(NAME),
        );
        tracing::debug!(rules = self.rules.len(), "http rules loaded");
    }

    fn merge(&mut self, cx: &mut CompileContext<'_>, element: ElementId) {
        let model = cx.model;
        if model.kind(element) != ElementKind::Method {
            return;
        }

        // Service config rules take precedence over the IDL annotation.
        let (rule, from_idl) = match self.rules.matching_rule(model, element) {
            Some(rule) => (rule.clone(), false),
            None => match model.method_info(element).and_then(|i| i.http.clone()) {
                Some(rule) => (rule, true),
                None => {
                    cx.attrs.get_mut(element).rest_methods =
                        Some(vec![RestMethod::unbound(model, element)]);
                    return;
                }
            },
        };

        let mut reporter = cx.diags.reporter(NAME);
        let Some((primary, additional)) = evaluate_rule(model, element, &rule, &mut reporter)
        else {
            cx.attrs.get_mut(element).rest_methods =
                Some(vec![RestMethod::unbound(model, element)]);
            return;
        };

        let config_version = cx.config.config_version();
        let rest_methods: Vec<RestMethod> = std::iter::once(&primary)
            .chain(&additional)
            .map(|binding| rest_method(model, element, binding, config_version))
            .collect();
        for method in &rest_methods {
            self.analyzer.add(method);
        }

        let attrs = cx.attrs.get_mut(element);
        attrs.http = Some(HttpAttribute {
            primary,
            additional,
            from_idl,
        });
        attrs.rest_methods = Some(rest_methods);
    }

    fn end_merging(&mut self, cx: &mut CompileContext<'_>) {
        let mut reporter = cx.diags.reporter(NAME);
        self.rules.report_unmatched("http", &mut reporter);

        let analyzer = std::mem::take(&mut self.analyzer);
        let collections = analyzer.finalize(
            cx.model,
            cx.scoper,
            cx.options.shorten_collection_names,
            &mut reporter,
        );
        tracing::debug!(collections = collections.len(), "rest collections built");
        cx.attrs.get_mut(cx.model.root()).collections = Some(collections);
    }

    fn normalize(
        &mut self,
        cx: &mut CompileContext<'_>,
        element: ElementId,
        out: &mut ServiceConfig,
    ) {
        if let Some(http) = &cx.attrs.get(element).http {
            out.http
                .rules
                .push(http.to_rule(cx.model, cx.model.full_name(element)));
        }
    }
}

/// Methods whose binding does not follow a REST pattern.
struct RestPatternRule;

impl LintRule for RestPatternRule {
    fn aspect(&self) -> &'static str {
        NAME
    }

    fn name(&self) -> &'static str {
        "rest-pattern"
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Method
    }

    fn check(&self, cx: &LintContext<'_>, element: ElementId, reporter: &mut AspectReporter<'_>) {
        let Some(methods) = &cx.attrs.get(element).rest_methods else {
            return;
        };
        let name = cx.model.full_name(element);
        for method in methods.iter().filter(|m| !m.has_valid_rest_pattern) {
            reporter.warning(
                self.name(),
                Some(name),
                &cx.model.element(element).location,
                format!(
                    "'{}' does not follow a REST pattern and is exposed as custom method '{}'",
                    name, method.name
                ),
            );
        }
    }
}

/// Collections where several methods claim the same REST name.
struct RestConflictRule;

impl LintRule for RestConflictRule {
    fn aspect(&self) -> &'static str {
        NAME
    }

    fn name(&self) -> &'static str {
        "rest-conflict"
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Model
    }

    fn check(&self, cx: &LintContext<'_>, element: ElementId, reporter: &mut AspectReporter<'_>) {
        let Some(collections) = &cx.attrs.get(element).collections else {
            return;
        };
        for collection in collections {
            for (name, methods) in collection.conflicts() {
                let rpcs: Vec<_> = methods
                    .iter()
                    .map(|m| cx.model.full_name(m.method))
                    .collect();
                reporter.warning(
                    self.name(),
                    None,
                    &cx.model.element(element).location,
                    format!(
                        "collection '{}' has several '{}' methods: {}",
                        collection.full_name(),
                        name,
                        rpcs.join(", ")
                    ),
                );
            }
        }
    }
}
