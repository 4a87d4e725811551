//! Evaluation of a single HTTP rule against a method.

use std::fmt;

use rampart_model::well_known::{ANY, LIST_VALUE, STRUCT, VALUE};
use rampart_model::{CustomHttpPattern, ElementId, HttpRule, Location, Model};

use crate::diag::AspectReporter;
use crate::field_selector::{self, FieldSelector};
use crate::path_template::{self, PathTemplate};

pub const E_PATH_SYNTAX: &str = "E2010";
pub const E_UNDEFINED_FIELD: &str = "E2011";
pub const E_PATH_FIELD: &str = "E2012";
pub const E_BODY_FIELD: &str = "E2013";
pub const E_PARAM_FIELD: &str = "E2014";
pub const E_OVERLAPPING_PATH: &str = "E2015";
pub const E_PATTERN: &str = "E2016";
pub const E_BODY_NOT_ALLOWED: &str = "E2017";
pub const E_RESPONSE: &str = "E2018";
pub const E_ADDITIONAL_BINDING: &str = "E2019";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Custom(kind) => kind,
        }
    }

    fn forbids_body(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }

    fn expects_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the request body carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyBinding {
    None,
    /// `body: "*"`: every field not bound by the path.
    AllUnbound,
    Field(FieldSelector),
}

/// A resolved HTTP binding of a method.
#[derive(Debug, Clone)]
pub struct HttpBinding {
    pub method: HttpMethod,
    pub template: PathTemplate,
    pub body: BodyBinding,
    pub response_body: Option<FieldSelector>,
    pub path_fields: Vec<FieldSelector>,
    pub body_fields: Vec<FieldSelector>,
    pub param_fields: Vec<FieldSelector>,
    pub location: Location,
}

impl HttpBinding {
    /// Message type of the request body when it is a single message field.
    pub fn body_type(&self, model: &Model) -> Option<ElementId> {
        match &self.body {
            BodyBinding::Field(selector) => selector.message_type(model),
            _ => None,
        }
    }

    /// Canonical rule for this binding, without selector.
    pub fn to_rule(&self, model: &Model) -> HttpRule {
        let path = self.template.to_string();
        let mut rule = HttpRule::default();
        match &self.method {
            HttpMethod::Get => rule.get = Some(path),
            HttpMethod::Put => rule.put = Some(path),
            HttpMethod::Post => rule.post = Some(path),
            HttpMethod::Delete => rule.delete = Some(path),
            HttpMethod::Patch => rule.patch = Some(path),
            HttpMethod::Custom(kind) => {
                rule.custom = Some(CustomHttpPattern {
                    kind: kind.clone(),
                    path,
                })
            }
        }
        rule.body = match &self.body {
            BodyBinding::None => None,
            BodyBinding::AllUnbound => Some("*".to_string()),
            BodyBinding::Field(selector) => Some(selector.path(model)),
        };
        rule.response_body = self.response_body.as_ref().map(|s| s.path(model));
        rule
    }
}

/// HTTP attribute of a method.
#[derive(Debug, Clone)]
pub struct HttpAttribute {
    pub primary: HttpBinding,
    pub additional: Vec<HttpBinding>,
    /// The rule came from the IDL annotation rather than the service config.
    pub from_idl: bool,
}

impl HttpAttribute {
    pub fn bindings(&self) -> impl Iterator<Item = &HttpBinding> {
        std::iter::once(&self.primary).chain(&self.additional)
    }

    pub fn to_rule(&self, model: &Model, selector: &str) -> HttpRule {
        let mut rule = self.primary.to_rule(model);
        rule.selector = selector.to_string();
        rule.additional_bindings = self.additional.iter().map(|b| b.to_rule(model)).collect();
        rule
    }
}

/// Evaluate `rule` and its additional bindings for `method`.
///
/// Returns `None` when the primary pattern or path is unreadable; broken additional
/// bindings are reported and left out.
pub fn evaluate_rule(
    model: &Model,
    method: ElementId,
    rule: &HttpRule,
    reporter: &mut AspectReporter<'_>,
) -> Option<(HttpBinding, Vec<HttpBinding>)> {
    let primary = evaluate(model, method, rule, reporter);

    let mut additional = Vec::with_capacity(rule.additional_bindings.len());
    for extra in &rule.additional_bindings {
        let location = if extra.origin == Location::default() {
            &rule.origin
        } else {
            &extra.origin
        };
        let mut valid = true;
        if !extra.additional_bindings.is_empty() {
            reporter.error(
                E_ADDITIONAL_BINDING,
                location,
                "additional bindings must not declare nested additional bindings",
            );
            valid = false;
        }
        if !extra.selector.is_empty() {
            reporter.error(
                E_ADDITIONAL_BINDING,
                location,
                format!(
                    "additional bindings must not declare a selector, found '{}'",
                    extra.selector
                ),
            );
            valid = false;
        }
        if !valid {
            continue;
        }
        let mut extra = extra.clone();
        extra.origin = location.clone();
        if let Some(binding) = evaluate(model, method, &extra, reporter) {
            additional.push(binding);
        }
    }

    primary.map(|p| (p, additional))
}

/// Evaluate one binding rule.
///
/// Returns `None` only when the pattern or the path template cannot be
/// read. Field errors are reported and the binding is still returned.
pub fn evaluate(
    model: &Model,
    method: ElementId,
    rule: &HttpRule,
    reporter: &mut AspectReporter<'_>,
) -> Option<HttpBinding> {
    let info = model.method_info(method)?;
    let element = model.full_name(method);
    let location = &rule.origin;

    let (http_method, raw_path) = pattern(rule, reporter)?;
    let template = match path_template::parse(raw_path) {
        Ok(template) => template,
        Err(err) => {
            reporter.error(
                E_PATH_SYNTAX,
                location,
                format!("invalid path template '{}': {}", raw_path, err),
            );
            return None;
        }
    };

    let input = info.input;
    let mut path_fields = Vec::new();
    for field_path in template.field_paths() {
        match FieldSelector::resolve(model, input, field_path) {
            Ok(selector) => {
                if let Err(msg) = field_selector::check_path_field(model, &selector) {
                    reporter.error(E_PATH_FIELD, location, msg);
                }
                path_fields.push(selector);
            }
            Err(err) => reporter.error(E_UNDEFINED_FIELD, location, err.to_string()),
        }
    }
    report_overlaps(model, &path_fields, location, reporter);

    let body = match rule.body.as_deref().map(str::trim) {
        None | Some("") => BodyBinding::None,
        Some("*") => BodyBinding::AllUnbound,
        Some(path) => match FieldSelector::resolve(model, input, path) {
            Ok(selector) => {
                if let Err(msg) = field_selector::check_body_field(model, &selector) {
                    reporter.error(E_BODY_FIELD, location, msg);
                }
                BodyBinding::Field(selector)
            }
            Err(err) => {
                reporter.error(E_UNDEFINED_FIELD, location, err.to_string());
                BodyBinding::None
            }
        },
    };

    let mut bound = path_fields.clone();
    if let BodyBinding::Field(selector) = &body {
        report_body_overlaps(model, selector, &path_fields, location, reporter);
        bound.push(selector.clone());
    }
    let unbound = field_selector::unbound_fields(model, input, &bound);
    let (body_fields, param_fields) = match &body {
        BodyBinding::AllUnbound => (unbound, Vec::new()),
        BodyBinding::Field(selector) => (vec![selector.clone()], unbound),
        BodyBinding::None => (Vec::new(), unbound),
    };
    for param in &param_fields {
        if let Err(msg) = field_selector::check_param_field(model, input, param) {
            reporter.error(E_PARAM_FIELD, location, msg);
        }
    }

    let has_body = rule.body.as_deref().is_some_and(|b| !b.trim().is_empty());
    if has_body && http_method.forbids_body() {
        reporter.error(
            E_BODY_NOT_ALLOWED,
            location,
            format!("{} binding of '{}' must not declare a body", http_method, element),
        );
    } else if !has_body && http_method.expects_body() {
        reporter.warning(
            "body-missing",
            Some(element),
            location,
            format!("{} binding of '{}' declares no body", http_method, element),
        );
    }

    let response_body = match rule.response_body.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(path) => match FieldSelector::resolve(model, info.output, path) {
            Ok(selector) => Some(selector),
            Err(err) => {
                reporter.error(E_UNDEFINED_FIELD, location, err.to_string());
                None
            }
        },
    };
    check_response(model, info.output, response_body.as_ref(), element, location, reporter);

    Some(HttpBinding {
        method: http_method,
        template,
        body,
        response_body,
        path_fields,
        body_fields,
        param_fields,
        location: location.clone(),
    })
}

fn pattern<'r>(
    rule: &'r HttpRule,
    reporter: &mut AspectReporter<'_>,
) -> Option<(HttpMethod, &'r str)> {
    let mut found = Vec::new();
    let standard = [
        (HttpMethod::Get, &rule.get),
        (HttpMethod::Put, &rule.put),
        (HttpMethod::Post, &rule.post),
        (HttpMethod::Delete, &rule.delete),
        (HttpMethod::Patch, &rule.patch),
    ];
    for (method, path) in standard {
        if let Some(path) = path {
            found.push((method, path.as_str()));
        }
    }
    if let Some(custom) = &rule.custom {
        found.push((HttpMethod::Custom(custom.kind.trim().to_string()), custom.path.as_str()));
    }

    if found.len() != 1 {
        reporter.error(
            E_PATTERN,
            &rule.origin,
            format!(
                "HTTP rule must set exactly one of get, put, post, delete, patch or custom, found {}",
                found.len()
            ),
        );
        return None;
    }
    let (method, path) = found.pop()?;
    if matches!(&method, HttpMethod::Custom(kind) if kind.is_empty()) {
        reporter.error(E_PATTERN, &rule.origin, "custom HTTP pattern must name a method");
        return None;
    }
    Some((method, path))
}

fn report_overlaps(
    model: &Model,
    fields: &[FieldSelector],
    location: &Location,
    reporter: &mut AspectReporter<'_>,
) {
    for (i, a) in fields.iter().enumerate() {
        for b in &fields[i + 1..] {
            if overlap(a, b) {
                reporter.error(
                    E_OVERLAPPING_PATH,
                    location,
                    format!(
                        "path bindings '{}' and '{}' overlap",
                        a.path(model),
                        b.path(model)
                    ),
                );
            }
        }
    }
}

fn report_body_overlaps(
    model: &Model,
    body: &FieldSelector,
    path_fields: &[FieldSelector],
    location: &Location,
    reporter: &mut AspectReporter<'_>,
) {
    for field in path_fields.iter().filter(|f| overlap(body, f)) {
        reporter.error(
            E_OVERLAPPING_PATH,
            location,
            format!(
                "body field '{}' overlaps path binding '{}'",
                body.path(model),
                field.path(model)
            ),
        );
    }
}

fn overlap(a: &FieldSelector, b: &FieldSelector) -> bool {
    a == b || a.is_prefix_of(b) || b.is_prefix_of(a)
}

fn check_response(
    model: &Model,
    output: ElementId,
    response_body: Option<&FieldSelector>,
    element: &str,
    location: &Location,
    reporter: &mut AspectReporter<'_>,
) {
    let message = match response_body {
        None => output,
        Some(selector) => match (selector.message_type(model), selector.info(model)) {
            (Some(message), Some(info)) if !info.repeated => message,
            _ => {
                reporter.error(
                    E_RESPONSE,
                    location,
                    format!(
                        "response body field '{}' cannot be rendered as a JSON object",
                        selector.path(model)
                    ),
                );
                return;
            }
        },
    };

    let name = model.full_name(message);
    if field_selector::is_scalar_like(model, message) || name == VALUE || name == LIST_VALUE {
        reporter.error(
            E_RESPONSE,
            location,
            format!(
                "response type '{}' of '{}' cannot be rendered as a JSON object",
                name, element
            ),
        );
    } else if name == ANY || name == STRUCT {
        reporter.warning(
            "response-codegen",
            Some(element),
            location,
            format!(
                "response type '{}' of '{}' is not supported by client code generators",
                name, element
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{DiagCollector, Diagnostics, SuppressionPolicy};
    use rampart_model::parse_model;

    const MODEL: &str = r#"
package: t
messages:
  - name: M
    fields:
      - { name: a, number: 1, type: string }
      - { name: b, number: 2, type: N }
      - { name: c, number: 3, type: string }
      - { name: d, number: 4, type: string, label: repeated }
  - name: N
    fields:
      - { name: x, number: 1, type: string }
  - name: Req
    fields:
      - { name: name, number: 1, type: string }
      - { name: shelf, number: 2, type: Shelf }
      - { name: filter, number: 3, type: string }
  - name: Shelf
    fields:
      - { name: name, number: 1, type: string }
      - { name: theme, number: 2, type: string }
  - name: Ping
    fields:
      - { name: id, number: 1, type: string }
services:
  - name: S
    methods:
      - { name: GetM, input: M, output: M }
      - { name: CreateShelf, input: Req, output: Shelf }
      - { name: Touch, input: Ping, output: Shelf }
      - { name: Raw, input: Ping, output: google.protobuf.Value }
      - { name: Loose, input: Ping, output: google.protobuf.Struct }
"#;

    fn diags() -> Diagnostics {
        Diagnostics::new(DiagCollector::new(100, 100), SuppressionPolicy::default())
    }

    fn rule(yaml: &str) -> HttpRule {
        let mut rule: HttpRule = serde_yaml::from_str(yaml).unwrap();
        rule.origin = Location::new("service.yaml", "http.rules[0]");
        rule
    }

    fn messages(diags: &Diagnostics) -> Vec<String> {
        diags
            .collector
            .diagnostics()
            .iter()
            .map(|d| format!("{} {}", d.code, d.message))
            .collect()
    }

    #[test]
    fn unbound_fields_become_params_and_are_checked() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.GetM").unwrap();
        let mut diags = diags();
        let binding = evaluate(&model, method, &rule("get: /some/{a}"), &mut diags.reporter("http"))
            .expect("field errors keep the binding");
        let path: Vec<_> = binding.path_fields.iter().map(|p| p.path(&model)).collect();
        assert_eq!(path, vec!["a"]);
        let params: Vec<_> = binding.param_fields.iter().map(|p| p.path(&model)).collect();
        assert_eq!(params, vec!["b", "c", "d"]);

        let found = messages(&diags);
        assert_eq!(found.len(), 2, "{:?}", found);
        assert!(found[0].starts_with("E2014 message field 'b'"));
        assert!(found[0].contains("not allowed as HTTP parameter"));
        assert!(found[1].starts_with("E2014 repeated field 'd'"));
    }

    #[test]
    fn body_field_and_params() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.CreateShelf").unwrap();
        let mut diags = diags();
        let binding = evaluate(
            &model,
            method,
            &rule("{ post: \"/v1/{name=shelves/*}\", body: shelf }"),
            &mut diags.reporter("http"),
        )
        .unwrap();
        assert_eq!(diags.collector.diagnostics().len(), 0);
        assert_eq!(binding.path_fields.len(), 1);
        assert_eq!(binding.body_fields[0].path(&model), "shelf");
        let params: Vec<_> = binding.param_fields.iter().map(|p| p.path(&model)).collect();
        assert_eq!(params, vec!["filter"]);
        assert_eq!(binding.body_type(&model), model.lookup("t.Shelf"));
    }

    #[test]
    fn star_body_captures_everything_unbound() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.CreateShelf").unwrap();
        let mut diags = diags();
        let binding = evaluate(
            &model,
            method,
            &rule("{ post: \"/v1/{shelf.name}\", body: \"*\" }"),
            &mut diags.reporter("http"),
        )
        .unwrap();
        let body: Vec<_> = binding.body_fields.iter().map(|p| p.path(&model)).collect();
        assert_eq!(body, vec!["name", "shelf.theme", "filter"]);
        assert!(binding.param_fields.is_empty());
    }

    #[test]
    fn structural_errors() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.CreateShelf").unwrap();

        // Unreadable patterns and paths yield no binding; field errors keep it.
        let cases = [
            ("{ get: /v1/x, post: /v1/y }", "E2016", false),
            ("{ body: shelf }", "E2016", false),
            ("get: v1/x", "E2010", false),
            ("{ get: \"/v1/{missing}\" }", "E2011", true),
            ("{ get: \"/v1/{shelf}\" }", "E2012", true),
            ("{ get: \"/v1/{shelf.name}/{shelf}\" }", "E2015", true),
            ("{ post: \"/v1/{shelf.name}\", body: shelf }", "E2015", true),
            ("{ post: /v1/x, body: filter }", "E2013", true),
            ("{ get: /v1/x, body: shelf }", "E2017", true),
        ];
        for (yaml, code, bound) in cases {
            let mut diags = diags();
            let binding = evaluate(&model, method, &rule(yaml), &mut diags.reporter("http"));
            assert_eq!(binding.is_some(), bound, "{}", yaml);
            let codes: Vec<_> = diags
                .collector
                .diagnostics()
                .iter()
                .map(|d| d.code.clone())
                .collect();
            assert!(codes.contains(&code.to_string()), "{}: {:?}", yaml, codes);
        }
    }

    #[test]
    fn body_field_may_not_overlap_path() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.CreateShelf").unwrap();
        let mut diags = diags();
        let binding = evaluate(
            &model,
            method,
            &rule("{ post: \"/v1/{shelf.name}\", body: shelf }"),
            &mut diags.reporter("http"),
        );
        assert!(binding.is_some());
        let found = messages(&diags);
        assert_eq!(found, vec!["E2015 body field 'shelf' overlaps path binding 'shelf.name'"]);
    }

    #[test]
    fn missing_body_is_a_warning() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.Touch").unwrap();
        let mut diags = diags();
        let binding = evaluate(&model, method, &rule("post: /v1/ping"), &mut diags.reporter("http"));
        assert!(binding.is_some());
        assert_eq!(diags.error_count(), 0);
        assert_eq!(diags.collector.diagnostics()[0].code, "http-body-missing");
    }

    #[test]
    fn response_type_checks() {
        let model = parse_model(MODEL, "t.yaml").unwrap();

        let mut diags = diags();
        let raw = model.lookup("t.S.Raw").unwrap();
        assert!(evaluate(&model, raw, &rule("get: /v1/raw"), &mut diags.reporter("http")).is_some());
        assert_eq!(diags.collector.diagnostics()[0].code, "E2018");

        let mut diags = self::diags();
        let loose = model.lookup("t.S.Loose").unwrap();
        assert!(evaluate(&model, loose, &rule("get: /v1/loose"), &mut diags.reporter("http")).is_some());
        assert_eq!(diags.collector.diagnostics()[0].code, "http-response-codegen");
    }

    #[test]
    fn additional_bindings_may_not_nest() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.CreateShelf").unwrap();
        let mut diags = diags();
        let rule = rule(
            r#"
post: /v1/shelves
body: shelf
additional_bindings:
  - post: /v1/archive/shelves
    body: shelf
  - selector: t.S.Other
    post: /v1/other
    body: shelf
  - post: /v1/nested
    body: shelf
    additional_bindings:
      - get: /v1/deeper
"#,
        );
        let (primary, additional) =
            evaluate_rule(&model, method, &rule, &mut diags.reporter("http")).unwrap();
        assert_eq!(primary.template.to_string(), "/v1/shelves");
        assert_eq!(additional.len(), 1);
        assert_eq!(diags.error_count(), 2);
        assert!(diags
            .collector
            .diagnostics()
            .iter()
            .all(|d| d.code == E_ADDITIONAL_BINDING));
    }

    #[test]
    fn canonical_rule() {
        let model = parse_model(MODEL, "t.yaml").unwrap();
        let method = model.lookup("t.S.CreateShelf").unwrap();
        let mut diags = diags();
        let binding = evaluate(
            &model,
            method,
            &rule("{ post: \"/v1/{name=shelves/*}\", body: shelf }"),
            &mut diags.reporter("http"),
        )
        .unwrap();
        let attr = HttpAttribute {
            primary: binding,
            additional: Vec::new(),
            from_idl: false,
        };
        let rule = attr.to_rule(&model, "t.S.CreateShelf");
        assert_eq!(rule.post.as_deref(), Some("/v1/{name=shelves/*}"));
        assert_eq!(rule.body.as_deref(), Some("shelf"));
        assert_eq!(rule.selector, "t.S.CreateShelf");
    }
}
