//! Element descriptions and deprecation notes.

use rampart_model::{DocumentationRule, ElementId, ElementKind, Location, ServiceConfig};

use crate::aspect::{Aspect, CompileContext};
use crate::diag::AspectReporter;
use crate::lint::{LintContext, LintRegistry, LintRule};
use crate::rules::RuleSet;

pub const NAME: &str = "documentation";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentationAttribute {
    pub description: Option<String>,
    pub deprecation_description: Option<String>,
    /// Set when a documentation rule matched, as opposed to an IDL comment.
    pub from_rule: bool,
}

#[derive(Debug)]
pub struct DocumentationAspect {
    rules: RuleSet<DocumentationRule>,
}

impl Default for DocumentationAspect {
    fn default() -> Self {
        Self {
            rules: RuleSet::new(Vec::new()),
        }
    }
}

impl Aspect for DocumentationAspect {
    fn name(&self) -> &'static str {
        NAME
    }

    fn register_lint_rules(&self, registry: &mut LintRegistry) {
        registry.register(Box::new(MissingDescription(ElementKind::Interface)));
        registry.register(Box::new(MissingDescription(ElementKind::Method)));
    }

    fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
        self.rules = RuleSet::build(
            cx.config.documentation.rules.clone(),
            cx.options.subsumption,
            &mut cx.diags.reporter(NAME),
        );
    }

    fn merge(&mut self, cx: &mut CompileContext<'_>, element: ElementId) {
        let model = cx.model;
        if model.kind(element) == ElementKind::Model {
            return;
        }
        let attr = match self.rules.matching_rule(model, element) {
            Some(rule) => DocumentationAttribute {
                description: rule
                    .description
                    .clone()
                    .or_else(|| model.element(element).description.clone()),
                deprecation_description: rule.deprecation_description.clone(),
                from_rule: true,
            },
            None => match &model.element(element).description {
                Some(description) => DocumentationAttribute {
                    description: Some(description.clone()),
                    ..Default::default()
                },
                None => return,
            },
        };
        cx.attrs.get_mut(element).documentation = Some(attr);
    }

    fn end_merging(&mut self, cx: &mut CompileContext<'_>) {
        self.rules
            .report_unmatched("documentation", &mut cx.diags.reporter(NAME));
    }

    fn start_normalization(&mut self, cx: &mut CompileContext<'_>, out: &mut ServiceConfig) {
        out.documentation.summary = cx.config.documentation.summary.clone();
    }

    fn normalize(
        &mut self,
        cx: &mut CompileContext<'_>,
        element: ElementId,
        out: &mut ServiceConfig,
    ) {
        let Some(doc) = &cx.attrs.get(element).documentation else {
            return;
        };
        if !doc.from_rule {
            return;
        }
        out.documentation.rules.push(DocumentationRule {
            selector: cx.model.full_name(element).to_string(),
            description: doc.description.clone(),
            deprecation_description: doc.deprecation_description.clone(),
            origin: Location::default(),
        });
    }
}

struct MissingDescription(ElementKind);

impl LintRule for MissingDescription {
    fn aspect(&self) -> &'static str {
        NAME
    }

    fn name(&self) -> &'static str {
        "missing"
    }

    fn kind(&self) -> ElementKind {
        self.0
    }

    fn check(&self, cx: &LintContext<'_>, element: ElementId, reporter: &mut AspectReporter<'_>) {
        let documented = cx
            .attrs
            .get(element)
            .documentation
            .as_ref()
            .is_some_and(|d| d.description.is_some());
        if !documented {
            let name = cx.model.full_name(element);
            reporter.warning(
                self.name(),
                Some(name),
                &cx.model.element(element).location,
                format!("{} '{}' has no description", self.0, name),
            );
        }
    }
}
