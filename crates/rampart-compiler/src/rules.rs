//! Selector-keyed rule lists with minimization and match tracking.

use std::collections::HashMap;

use rampart_model::{DocumentationRule, ElementId, HttpRule, Location, MetricRule, Model};

use crate::diag::AspectReporter;
use crate::selector::{self, SubsumptionPolicy, UNIVERSAL};

/// A configuration rule applying to the elements its selector names.
pub trait ConfigRule {
    /// Comma-joined selector list.
    fn selector(&self) -> &str;

    fn origin(&self) -> &Location;
}

impl ConfigRule for HttpRule {
    fn selector(&self) -> &str {
        &self.selector
    }

    fn origin(&self) -> &Location {
        &self.origin
    }
}

impl ConfigRule for DocumentationRule {
    fn selector(&self) -> &str {
        &self.selector
    }

    fn origin(&self) -> &Location {
        &self.origin
    }
}

impl ConfigRule for MetricRule {
    fn selector(&self) -> &str {
        &self.selector
    }

    fn origin(&self) -> &Location {
        &self.origin
    }
}

#[derive(Debug, Clone)]
struct ActiveRule<R> {
    rule: R,
    selectors: Vec<String>,
    used: Vec<bool>,
}

/// Rules of one kind, in declaration order.
///
/// Matching scans from the last rule backwards, so later declarations win.
#[derive(Debug, Clone)]
pub struct RuleSet<R> {
    rules: Vec<ActiveRule<R>>,
    cache: HashMap<ElementId, Option<usize>>,
}

impl<R: ConfigRule> RuleSet<R> {
    /// Wrap rules without validation or minimization.
    pub fn new(rules: Vec<R>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let selectors = selector::split(rule.selector());
                let used = vec![false; selectors.len()];
                ActiveRule {
                    rule,
                    selectors,
                    used,
                }
            })
            .collect();
        Self {
            rules,
            cache: HashMap::new(),
        }
    }

    /// Validate, then minimize.
    pub fn build(rules: Vec<R>, policy: SubsumptionPolicy, reporter: &mut AspectReporter<'_>) -> Self {
        let mut set = Self::new(rules);
        set.report_bad_selectors(reporter);
        set.minimize(policy, reporter);
        set
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Total number of active selectors across all rules.
    pub fn selector_count(&self) -> usize {
        self.rules.iter().map(|r| r.selectors.len()).sum()
    }

    pub fn rules(&self) -> impl Iterator<Item = &R> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|r| r.selectors.iter().map(String::as_str))
    }

    /// Report (and drop) syntactically invalid selectors, and rules with none.
    pub fn report_bad_selectors(&mut self, reporter: &mut AspectReporter<'_>) {
        for active in &mut self.rules {
            if active.selectors.is_empty() {
                reporter.error(
                    "E2001",
                    active.rule.origin(),
                    "rule has no selector".to_string(),
                );
                continue;
            }
            let origin = active.rule.origin().clone();
            active.selectors.retain(|sel| {
                let valid = selector::is_valid(sel);
                if !valid {
                    reporter.error(
                        "E2001",
                        &origin,
                        format!("invalid selector '{}'", sel),
                    );
                }
                valid
            });
            active.used = vec![false; active.selectors.len()];
        }
        self.rules.retain(|r| !r.selectors.is_empty());
    }

    /// Drop selectors shadowed by a later rule.
    ///
    /// Because matching prefers later rules, a selector subsumed by a later
    /// rule's selector can never win. Within a single file this is an error.
    pub fn minimize(&mut self, policy: SubsumptionPolicy, reporter: &mut AspectReporter<'_>) {
        for i in 0..self.rules.len() {
            let (head, tail) = self.rules.split_at_mut(i + 1);
            let current = &mut head[i];
            let origin = current.rule.origin().clone();
            let mut kept = Vec::with_capacity(current.selectors.len());
            for sel in current.selectors.drain(..) {
                let shadow = tail.iter().find_map(|later| {
                    later
                        .selectors
                        .iter()
                        .find(|s| selector::subsumes(s, &sel, policy))
                        .map(|s| (later, s))
                });
                match shadow {
                    None => kept.push(sel),
                    Some((later, by)) => {
                        if later.rule.origin().file == origin.file {
                            reporter.error(
                                "E2002",
                                &origin,
                                format!(
                                    "selector '{}' is subsumed by selector '{}' at {} in the same file",
                                    sel,
                                    by,
                                    later.rule.origin()
                                ),
                            );
                        }
                        tracing::debug!(selector = %sel, subsumed_by = %by, "dropping shadowed selector");
                    }
                }
            }
            current.used = vec![false; kept.len()];
            current.selectors = kept;
        }
        self.rules.retain(|r| !r.selectors.is_empty());
        self.cache.clear();
    }

    /// The rule applying to `element`, if any.
    pub fn matching_rule(&mut self, model: &Model, element: ElementId) -> Option<&R> {
        let index = match self.cache.get(&element) {
            Some(cached) => *cached,
            None => {
                let name = model.full_name(element);
                let found = self.rules.iter().enumerate().rev().find_map(|(i, r)| {
                    r.selectors
                        .iter()
                        .position(|s| selector::matches(s, name))
                        .map(|p| (i, p))
                });
                if let Some((i, p)) = found {
                    self.rules[i].used[p] = true;
                }
                let index = found.map(|(i, _)| i);
                self.cache.insert(element, index);
                index
            }
        };
        index.map(|i| &self.rules[i].rule)
    }

    /// Selectors no element has matched so far. `*` is never reported.
    pub fn unmatched_selectors(&self) -> Vec<(&str, &Location)> {
        self.rules
            .iter()
            .flat_map(|r| {
                r.selectors
                    .iter()
                    .zip(&r.used)
                    .filter(|(sel, used)| !**used && sel.as_str() != UNIVERSAL)
                    .map(move |(sel, _)| (sel.as_str(), r.rule.origin()))
            })
            .collect()
    }

    /// Warn about every selector that never matched.
    pub fn report_unmatched(&self, what: &str, reporter: &mut AspectReporter<'_>) {
        for (sel, origin) in self.unmatched_selectors() {
            reporter.warning(
                "unmatched-selector",
                None,
                origin,
                format!("selector '{}' in {} rules did not match any element", sel, what),
            );
        }
    }
}
