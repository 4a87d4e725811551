//! Quota limits and per-method metric costs.

use std::collections::{BTreeMap, HashSet};

use rampart_model::{ElementId, ElementKind, Location, MetricRule, QuotaLimit, ServiceConfig};

use crate::aspect::{Aspect, CompileContext};
use crate::rules::RuleSet;

pub const NAME: &str = "quota";

const E_LIMIT: &str = "E2050";
const E_UNKNOWN_METRIC: &str = "E2051";
const E_NEGATIVE_COST: &str = "E2052";

#[derive(Debug)]
pub struct QuotaAspect {
    metrics: HashSet<String>,
    rules: RuleSet<MetricRule>,
}

impl Default for QuotaAspect {
    fn default() -> Self {
        Self {
            metrics: HashSet::new(),
            rules: RuleSet::new(Vec::new()),
        }
    }
}

impl Aspect for QuotaAspect {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
        let mut reporter = cx.diags.reporter(NAME);
        let mut names = HashSet::new();
        for limit in &cx.config.quota.limits {
            if limit.name.trim().is_empty() {
                reporter.error(E_LIMIT, &limit.origin, "quota limit must have a name");
            } else if !names.insert(limit.name.as_str()) {
                reporter.error(
                    E_LIMIT,
                    &limit.origin,
                    format!("quota limit '{}' is declared more than once", limit.name),
                );
            }
            if limit.metric.trim().is_empty() {
                reporter.error(
                    E_LIMIT,
                    &limit.origin,
                    format!("quota limit '{}' must name a metric", limit.name),
                );
            } else {
                self.metrics.insert(limit.metric.clone());
            }
        }

        self.rules = RuleSet::build(
            cx.config.quota.metric_rules.clone(),
            cx.options.subsumption,
            &mut reporter,
        );
    }

    fn merge(&mut self, cx: &mut CompileContext<'_>, element: ElementId) {
        let model = cx.model;
        if model.kind(element) != ElementKind::Method {
            return;
        }
        let Some(rule) = self.rules.matching_rule(model, element) else {
            return;
        };

        let mut reporter = cx.diags.reporter(NAME);
        let mut costs = BTreeMap::new();
        for (metric, cost) in &rule.metric_costs {
            if !self.metrics.contains(metric) {
                reporter.error(
                    E_UNKNOWN_METRIC,
                    &rule.origin,
                    format!(
                        "metric '{}' used by '{}' is not declared by any quota limit",
                        metric,
                        model.full_name(element)
                    ),
                );
                continue;
            }
            if *cost < 0 {
                reporter.error(
                    E_NEGATIVE_COST,
                    &rule.origin,
                    format!("cost of metric '{}' must not be negative, got {}", metric, cost),
                );
                continue;
            }
            costs.insert(metric.clone(), *cost);
        }
        cx.attrs.get_mut(element).metric_costs = Some(costs);
    }

    fn end_merging(&mut self, cx: &mut CompileContext<'_>) {
        self.rules.report_unmatched("quota", &mut cx.diags.reporter(NAME));
    }

    fn start_normalization(&mut self, cx: &mut CompileContext<'_>, out: &mut ServiceConfig) {
        out.quota.limits = cx
            .config
            .quota
            .limits
            .iter()
            .map(|limit| QuotaLimit {
                origin: Location::default(),
                ..limit.clone()
            })
            .collect();
    }

    fn normalize(
        &mut self,
        cx: &mut CompileContext<'_>,
        element: ElementId,
        out: &mut ServiceConfig,
    ) {
        if let Some(costs) = &cx.attrs.get(element).metric_costs {
            out.quota.metric_rules.push(MetricRule {
                selector: cx.model.full_name(element).to_string(),
                metric_costs: costs.clone(),
                origin: Location::default(),
            });
        }
    }
}
