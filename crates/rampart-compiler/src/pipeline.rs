//! Stage orchestration: merge, lint, normalize.

use rampart_model::{ElementId, ServiceConfig};
use rampart_telemetry::{log_aspects_layered, log_stage_completed, log_stage_failed};

use crate::aspect::{Aspect, CompileContext};
use crate::aspects;
use crate::error::CompileError;
use crate::lint::{LintContext, LintRegistry};
use crate::sorter;

/// A set of aspects sorted into dependency layers, plus their lint rules.
pub struct Pipeline {
    aspects: Vec<Box<dyn Aspect>>,
    layers: Vec<Vec<usize>>,
    lint: LintRegistry,
}

impl Pipeline {
    /// Sort `aspects` by their merge dependencies.
    ///
    /// Fails on duplicate names, dependency cycles and dependencies on
    /// aspects that are not in the set.
    pub fn new(aspects: Vec<Box<dyn Aspect>>) -> Result<Self, CompileError> {
        let nodes: Vec<(&str, &[&str])> = aspects
            .iter()
            .map(|a| (a.name(), a.merge_dependencies()))
            .collect();
        let layers = sorter::layers(&nodes)?;

        let mut lint = LintRegistry::default();
        for aspect in &aspects {
            aspect.register_lint_rules(&mut lint);
        }

        let pipeline = Self {
            aspects,
            layers,
            lint,
        };
        log_aspects_layered!(
            layers = ?pipeline.layer_names(),
            lint_rules = pipeline.lint.len()
        );
        Ok(pipeline)
    }

    /// Pipeline over the built-in aspects.
    pub fn builtin() -> Result<Self, CompileError> {
        Self::new(aspects::builtin())
    }

    /// Aspect names per layer, dependencies first.
    pub fn layer_names(&self) -> Vec<Vec<&'static str>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|&i| self.aspects[i].name()).collect())
            .collect()
    }

    /// Run all stages. Returns the normalized config, or `None` when merge or
    /// lint reported errors.
    pub fn run(
        &mut self,
        cx: &mut CompileContext<'_>,
    ) -> Result<Option<ServiceConfig>, CompileError> {
        let elements = cx.scoper.reachable_elements(cx.model);

        if !self.merge(cx, &elements)? {
            return Ok(None);
        }
        if !self.lint(cx, &elements)? {
            return Ok(None);
        }
        let config = self.normalize(cx, &elements);
        check_limit(cx)?;
        Ok(Some(config))
    }

    fn merge(
        &mut self,
        cx: &mut CompileContext<'_>,
        elements: &[ElementId],
    ) -> Result<bool, CompileError> {
        let errors_before = cx.diags.error_count();

        for layer in &self.layers {
            for &i in layer {
                self.aspects[i].start_merging(cx);
            }
        }
        check_limit(cx)?;

        // A layer only starts once every element was merged by all lower layers.
        for layer in &self.layers {
            for &element in elements {
                for &i in layer {
                    self.aspects[i].merge(cx, element);
                }
            }
            check_limit(cx)?;
        }

        for layer in &self.layers {
            for &i in layer {
                self.aspects[i].end_merging(cx);
            }
        }
        check_limit(cx)?;

        Ok(stage_outcome("merge", errors_before, cx))
    }

    fn lint(
        &self,
        cx: &mut CompileContext<'_>,
        elements: &[ElementId],
    ) -> Result<bool, CompileError> {
        let errors_before = cx.diags.error_count();
        let lcx = LintContext {
            model: cx.model,
            config: cx.config,
            attrs: &*cx.attrs,
        };
        for &element in elements {
            for rule in self.lint.rules_for(cx.model.kind(element)) {
                rule.check(&lcx, element, &mut cx.diags.reporter(rule.aspect()));
            }
        }
        check_limit(cx)?;
        Ok(stage_outcome("lint", errors_before, cx))
    }

    fn normalize(
        &mut self,
        cx: &mut CompileContext<'_>,
        elements: &[ElementId],
    ) -> ServiceConfig {
        let mut out = ServiceConfig {
            name: cx.config.name.clone(),
            title: cx.config.title.clone(),
            config_version: Some(cx.config.config_version()),
            ..ServiceConfig::default()
        };

        for layer in &self.layers {
            for &i in layer {
                self.aspects[i].start_normalization(cx, &mut out);
            }
        }
        for &element in elements {
            for layer in &self.layers {
                for &i in layer {
                    self.aspects[i].normalize(cx, element, &mut out);
                }
            }
        }
        for layer in &self.layers {
            for &i in layer {
                self.aspects[i].end_normalization(cx, &mut out);
            }
        }

        log_stage_completed!(stage = "normalize", http_rules = out.http.rules.len());
        out
    }
}

fn check_limit(cx: &CompileContext<'_>) -> Result<(), CompileError> {
    if cx.diags.collector.is_exhausted() {
        log_stage_failed!(reason = "diagnostic limit");
        return Err(CompileError::DiagnosticLimit(cx.diags.collector.max_errors()));
    }
    Ok(())
}

fn stage_outcome(stage: &'static str, errors_before: usize, cx: &CompileContext<'_>) -> bool {
    let new_errors = cx.diags.error_count() - errors_before;
    if new_errors == 0 {
        log_stage_completed!(stage, warnings = cx.diags.collector.warning_count());
        true
    } else {
        log_stage_failed!(stage, errors = new_errors);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::compile::CompileOptions;
    use crate::diag::{DiagCollector, Diagnostics, SuppressionPolicy};
    use rampart_model::{parse_model, Model, Scoper};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        deps: &'static [&'static str],
        log: Log,
        fail_on_start: bool,
    }

    impl Recorder {
        fn boxed(
            name: &'static str,
            deps: &'static [&'static str],
            log: &Log,
        ) -> Box<dyn Aspect> {
            Box::new(Self {
                name,
                deps,
                log: Rc::clone(log),
                fail_on_start: false,
            })
        }
    }

    impl Aspect for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn merge_dependencies(&self) -> &'static [&'static str] {
            self.deps
        }

        fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
            self.log.borrow_mut().push(format!("start:{}", self.name));
            if self.fail_on_start {
                cx.diags
                    .reporter("test")
                    .error("E9999", &Default::default(), "boom");
            }
        }

        fn merge(&mut self, cx: &mut CompileContext<'_>, element: ElementId) {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.name, cx.model.full_name(element)));
        }

        fn end_merging(&mut self, _cx: &mut CompileContext<'_>) {
            self.log.borrow_mut().push(format!("end:{}", self.name));
        }

        fn normalize(
            &mut self,
            _cx: &mut CompileContext<'_>,
            _element: ElementId,
            _out: &mut ServiceConfig,
        ) {
            self.log.borrow_mut().push(format!("normalize:{}", self.name));
        }
    }

    fn model() -> Model {
        parse_model(
            r#"
package: p
messages:
  - name: M
services:
  - name: S
    methods:
      - name: Get
        input: M
        output: M
"#,
            "p.yaml",
        )
        .unwrap()
    }

    fn run(
        pipeline: &mut Pipeline,
        model: &Model,
        options: &CompileOptions,
    ) -> (Result<Option<ServiceConfig>, CompileError>, Diagnostics) {
        let config = ServiceConfig::default();
        let scoper = Scoper::all(model);
        let mut attrs = Attributes::new(model);
        let mut diags = Diagnostics::new(
            DiagCollector::new(options.max_errors, options.max_warnings),
            SuppressionPolicy::default(),
        );
        let result = {
            let mut cx = CompileContext {
                model,
                scoper: &scoper,
                config: &config,
                options,
                apis: &[],
                attrs: &mut attrs,
                diags: &mut diags,
            };
            pipeline.run(&mut cx)
        };
        (result, diags)
    }

    #[test]
    fn merge_runs_layer_by_layer() {
        let log: Log = Rc::default();
        let mut pipeline = Pipeline::new(vec![
            Recorder::boxed("b", &["a"], &log),
            Recorder::boxed("a", &[], &log),
        ])
        .unwrap();
        assert_eq!(pipeline.layer_names(), vec![vec!["a"], vec!["b"]]);

        let model = model();
        let (result, _) = run(&mut pipeline, &model, &CompileOptions::default());
        assert!(result.unwrap().is_some());

        let log = log.borrow();
        let pos = |entry: &str| log.iter().position(|e| e == entry).unwrap();
        assert!(pos("start:a") < pos("start:b"));
        assert!(pos("start:b") < pos("a:p"));
        // every element is merged by `a` before `b` sees any
        assert!(pos("a:p.S.Get") < pos("b:p"));
        assert!(pos("b:p.S.Get") < pos("end:a"));
        assert!(pos("end:a") < pos("end:b"));
        assert!(pos("end:b") < pos("normalize:a"));
    }

    #[test]
    fn errors_skip_normalization() {
        let log: Log = Rc::default();
        let failing: Box<dyn Aspect> = Box::new(Recorder {
            name: "a",
            deps: &[],
            log: Rc::clone(&log),
            fail_on_start: true,
        });
        let mut pipeline = Pipeline::new(vec![failing]).unwrap();
        let model = model();
        let (result, diags) = run(&mut pipeline, &model, &CompileOptions::default());
        assert!(result.unwrap().is_none());
        assert_eq!(diags.error_count(), 1);
        assert!(!log.borrow().iter().any(|e| e.starts_with("normalize:")));
    }

    #[test]
    fn exceeding_error_cap_is_fatal() {
        let log: Log = Rc::default();
        let failing: Box<dyn Aspect> = Box::new(Recorder {
            name: "a",
            deps: &[],
            log: Rc::clone(&log),
            fail_on_start: true,
        });
        let mut pipeline = Pipeline::new(vec![failing]).unwrap();
        let options = CompileOptions {
            max_errors: 0,
            ..CompileOptions::default()
        };
        let model = model();
        let (result, _) = run(&mut pipeline, &model, &options);
        assert!(matches!(result, Err(CompileError::DiagnosticLimit(0))));
    }

    #[test]
    fn cyclic_aspects_are_rejected() {
        let log: Log = Rc::default();
        let result = Pipeline::new(vec![
            Recorder::boxed("a", &["b"], &log),
            Recorder::boxed("b", &["a"], &log),
        ]);
        assert!(matches!(result, Err(CompileError::AspectCycle(_))));
    }

    #[test]
    fn builtin_layers() {
        let pipeline = Pipeline::builtin().unwrap();
        assert_eq!(
            pipeline.layer_names(),
            vec![
                vec!["http", "documentation", "quota", "endpoints"],
                vec!["versioning"],
                vec!["mixin"],
            ]
        );
    }
}
