//! Field paths resolved against message schemas.

use rampart_model::well_known::{self, WRAPPERS};
use rampart_model::{ElementId, FieldInfo, FieldType, Model};
use thiserror::Error;

/// Well-known messages that render as a single string and so may appear in
/// the path or as a query parameter.
const SCALAR_LIKE: &[&str] = &[
    well_known::TIMESTAMP,
    well_known::DURATION,
    well_known::FIELD_MASK,
];

/// Well-known messages accepted as a request body.
const BODY_CAPABLE: &[&str] = &[
    well_known::ANY,
    well_known::STRUCT,
    well_known::VALUE,
    well_known::LIST_VALUE,
    well_known::EMPTY,
];

/// Whether a message renders as a single scalar value over HTTP.
pub fn is_scalar_like(model: &Model, message: ElementId) -> bool {
    let name = model.full_name(message);
    SCALAR_LIKE.contains(&name) || WRAPPERS.iter().any(|(w, _)| *w == name)
}

/// Whether a message may be used as an HTTP request body.
pub fn is_body_capable(model: &Model, message: ElementId) -> bool {
    let name = model.full_name(message);
    !well_known::is_well_known(name) || BODY_CAPABLE.contains(&name)
}

/// A chain of fields from a root message to a (possibly nested) field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldSelector {
    fields: Vec<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldSelectorError {
    #[error("undefined field '{path}' on message '{message}'")]
    UndefinedField { path: String, message: String },
}

impl FieldSelector {
    pub fn single(field: ElementId) -> Self {
        Self {
            fields: vec![field],
        }
    }

    /// Resolve `path` (e.g. `shelf.name`) against `root`.
    pub fn resolve(model: &Model, root: ElementId, path: &str) -> Result<Self, FieldSelectorError> {
        let mut fields = Vec::new();
        let mut current = Some(root);
        for segment in path.split('.') {
            let field = current
                .and_then(|msg| model.field(msg, segment))
                .ok_or_else(|| FieldSelectorError::UndefinedField {
                    path: path.to_string(),
                    message: match current {
                        Some(msg) => model.full_name(msg).to_string(),
                        None => match fields.last() {
                            Some(last) => model.full_name(*last).to_string(),
                            None => model.full_name(root).to_string(),
                        },
                    },
                })?;
            current = model.field_info(field).and_then(FieldInfo::message_type);
            fields.push(field);
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[ElementId] {
        &self.fields
    }

    pub fn last_field(&self) -> ElementId {
        // Selectors are never empty: constructors always push a field.
        self.fields[self.fields.len() - 1]
    }

    pub fn info<'m>(&self, model: &'m Model) -> Option<&'m FieldInfo> {
        model.field_info(self.last_field())
    }

    /// Message type of the last field, if it is a message.
    pub fn message_type(&self, model: &Model) -> Option<ElementId> {
        self.info(model).and_then(FieldInfo::message_type)
    }

    pub fn extend(&self, field: ElementId) -> Self {
        let mut fields = self.fields.clone();
        fields.push(field);
        Self { fields }
    }

    /// Proper-prefix test.
    pub fn is_prefix_of(&self, other: &FieldSelector) -> bool {
        self.fields.len() < other.fields.len() && other.fields.starts_with(&self.fields)
    }

    /// Dotted path of simple field names.
    pub fn path(&self, model: &Model) -> String {
        self.fields
            .iter()
            .map(|f| model.element(*f).simple_name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn type_name(model: &Model, info: &FieldInfo) -> String {
    match info.ty {
        FieldType::Scalar(s) => s.name().to_string(),
        FieldType::Message(id) | FieldType::Enum(id) => model.full_name(id).to_string(),
    }
}

/// Check a field bound into the URL path.
pub fn check_path_field(model: &Model, selector: &FieldSelector) -> Result<(), String> {
    let path = selector.path(model);
    for (i, field) in selector.fields().iter().enumerate() {
        let Some(info) = model.field_info(*field) else {
            continue;
        };
        let is_last = i + 1 == selector.fields().len();
        if info.is_map() {
            return Err(format!("map field '{}' cannot be bound in the HTTP path", path));
        }
        if info.repeated {
            return Err(format!(
                "repeated field '{}' cannot be bound in the HTTP path",
                path
            ));
        }
        if let (true, Some(msg)) = (is_last, info.message_type()) {
            if !is_scalar_like(model, msg) {
                return Err(format!(
                    "message field '{}' of type '{}' cannot be bound in the HTTP path",
                    path,
                    type_name(model, info)
                ));
            }
        }
    }
    Ok(())
}

/// Check a field declared as the request body.
pub fn check_body_field(model: &Model, selector: &FieldSelector) -> Result<(), String> {
    let path = selector.path(model);
    let Some(info) = selector.info(model) else {
        return Ok(());
    };
    let Some(msg) = info.message_type() else {
        return Err(format!(
            "body field '{}' has type '{}' but must be a message",
            path,
            type_name(model, info)
        ));
    };
    if info.repeated {
        return Err(format!("body field '{}' must not be repeated", path));
    }
    if !is_body_capable(model, msg) {
        return Err(format!(
            "body field '{}' has type '{}' which cannot be used as a request body",
            path,
            model.full_name(msg)
        ));
    }
    Ok(())
}

/// Check a field exposed as a query parameter.
pub fn check_param_field(
    model: &Model,
    root: ElementId,
    selector: &FieldSelector,
) -> Result<(), String> {
    let path = selector.path(model);
    let Some(info) = selector.info(model) else {
        return Ok(());
    };
    if info.is_map() {
        return Err(format!("map field '{}' not allowed as HTTP parameter", path));
    }

    let mut seen = vec![root];
    for field in selector.fields() {
        if let Some(msg) = model.field_info(*field).and_then(FieldInfo::message_type) {
            if seen.contains(&msg) {
                return Err(format!("cyclic message field '{}'", path));
            }
            seen.push(msg);
        }
    }

    match (info.message_type(), info.repeated) {
        (Some(msg), _) if is_scalar_like(model, msg) && !info.repeated => Ok(()),
        (Some(_), true) => Err(format!(
            "repeated message field '{}' not allowed as HTTP parameter",
            path
        )),
        (None, true) => Err(format!(
            "repeated field '{}' not allowed as HTTP parameter",
            path
        )),
        (Some(msg), false) => Err(format!(
            "message field '{}' of type '{}' not allowed as HTTP parameter",
            path,
            model.full_name(msg)
        )),
        (None, false) => Ok(()),
    }
}

/// Fields of `root` not covered by `bound`.
///
/// A field is unbound when neither it nor an ancestor is bound. A message
/// field with only some sub-fields bound is descended into so just the
/// remaining sub-fields are reported.
pub fn unbound_fields(model: &Model, root: ElementId, bound: &[FieldSelector]) -> Vec<FieldSelector> {
    fn walk(
        model: &Model,
        message: ElementId,
        prefix: Option<&FieldSelector>,
        bound: &[FieldSelector],
        out: &mut Vec<FieldSelector>,
    ) {
        for field in model.fields(message) {
            let selector = match prefix {
                Some(p) => p.extend(field),
                None => FieldSelector::single(field),
            };
            if bound
                .iter()
                .any(|b| *b == selector || b.is_prefix_of(&selector))
            {
                continue;
            }
            let partial = bound.iter().any(|b| selector.is_prefix_of(b));
            match selector.message_type(model) {
                Some(sub) if partial => walk(model, sub, Some(&selector), bound, out),
                _ => out.push(selector),
            }
        }
    }

    let mut out = Vec::new();
    walk(model, root, None, bound, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_model::parse_model;

    const MODEL: &str = r#"
package: t
messages:
  - name: M
    fields:
      - { name: a, number: 1, type: string }
      - { name: b, number: 2, type: N }
      - { name: c, number: 3, type: string }
      - { name: d, number: 4, type: D }
  - name: N
    fields:
      - { name: x, number: 1, type: string }
  - name: D
    fields:
      - { name: e, number: 1, type: string }
      - { name: f, number: 2, type: string }
  - name: Node
    fields:
      - { name: id, number: 1, type: string }
      - { name: parent, number: 2, type: Node }
      - { name: tags, number: 3, type: string, label: repeated }
      - { name: labels, number: 4, type: "map<string, string>" }
      - { name: children, number: 5, type: Node, label: repeated }
      - { name: when, number: 6, type: google.protobuf.Timestamp }
      - { name: payload, number: 7, type: google.protobuf.Struct }
      - { name: count, number: 8, type: google.protobuf.Int32Value }
"#;

    fn model() -> Model {
        parse_model(MODEL, "t.yaml").unwrap()
    }

    fn resolve(model: &Model, root: &str, path: &str) -> FieldSelector {
        let root = model.lookup(root).unwrap();
        FieldSelector::resolve(model, root, path).unwrap()
    }

    fn paths(model: &Model, selectors: &[FieldSelector]) -> Vec<String> {
        selectors.iter().map(|s| s.path(model)).collect()
    }

    #[test]
    fn resolves_nested_paths() {
        let model = model();
        let sel = resolve(&model, "t.M", "d.e");
        assert_eq!(sel.fields().len(), 2);
        assert_eq!(sel.path(&model), "d.e");
        assert_eq!(model.full_name(sel.last_field()), "t.D.e");
    }

    #[test]
    fn resolution_is_idempotent() {
        let model = model();
        assert_eq!(resolve(&model, "t.M", "d.f"), resolve(&model, "t.M", "d.f"));
    }

    #[test]
    fn undefined_field_names_path_and_message() {
        let model = model();
        let root = model.lookup("t.M").unwrap();
        let err = FieldSelector::resolve(&model, root, "d.zz").unwrap_err();
        assert_eq!(
            err,
            FieldSelectorError::UndefinedField {
                path: "d.zz".into(),
                message: "t.D".into()
            }
        );
        let err = FieldSelector::resolve(&model, root, "a.b").unwrap_err();
        assert!(err.to_string().contains("'a.b'"));
    }

    #[test]
    fn prefix_relation() {
        let model = model();
        let d = resolve(&model, "t.M", "d");
        let de = resolve(&model, "t.M", "d.e");
        assert!(d.is_prefix_of(&de));
        assert!(!de.is_prefix_of(&d));
        assert!(!d.is_prefix_of(&d));
    }

    #[test]
    fn unbound_excludes_bound_fields() {
        let model = model();
        let root = model.lookup("t.M").unwrap();
        let bound = vec![resolve(&model, "t.M", "a")];
        assert_eq!(paths(&model, &unbound_fields(&model, root, &bound)), vec!["b", "c", "d"]);
    }

    #[test]
    fn unbound_descends_into_partially_bound_messages() {
        let model = model();
        let root = model.lookup("t.M").unwrap();
        let bound = vec![resolve(&model, "t.M", "a"), resolve(&model, "t.M", "d.e")];
        assert_eq!(
            paths(&model, &unbound_fields(&model, root, &bound)),
            vec!["b", "c", "d.f"]
        );
    }

    #[test]
    fn path_field_checks() {
        let model = model();
        assert!(check_path_field(&model, &resolve(&model, "t.Node", "id")).is_ok());
        assert!(check_path_field(&model, &resolve(&model, "t.Node", "when")).is_ok());
        assert!(check_path_field(&model, &resolve(&model, "t.Node", "parent.id")).is_ok());
        let err = check_path_field(&model, &resolve(&model, "t.Node", "tags")).unwrap_err();
        assert!(err.contains("repeated"));
        let err = check_path_field(&model, &resolve(&model, "t.Node", "labels")).unwrap_err();
        assert!(err.contains("map"));
        let err = check_path_field(&model, &resolve(&model, "t.Node", "parent")).unwrap_err();
        assert!(err.contains("message field"));
    }

    #[test]
    fn body_field_checks() {
        let model = model();
        assert!(check_body_field(&model, &resolve(&model, "t.Node", "parent")).is_ok());
        assert!(check_body_field(&model, &resolve(&model, "t.Node", "payload")).is_ok());
        assert!(check_body_field(&model, &resolve(&model, "t.Node", "id")).is_err());
        assert!(check_body_field(&model, &resolve(&model, "t.Node", "children")).is_err());
        assert!(check_body_field(&model, &resolve(&model, "t.Node", "when")).is_err());
    }

    #[test]
    fn param_field_checks() {
        let model = model();
        let root = model.lookup("t.Node").unwrap();
        let check = |path: &str| check_param_field(&model, root, &resolve(&model, "t.Node", path));
        assert!(check("id").is_ok());
        assert!(check("when").is_ok());
        assert!(check("count").is_ok());
        assert!(check("labels").unwrap_err().contains("map field"));
        assert!(check("tags").unwrap_err().contains("repeated field"));
        assert!(check("children").unwrap_err().contains("cyclic"));
        assert!(check("parent.parent").unwrap_err().contains("cyclic"));
        assert!(check("payload").unwrap_err().contains("not allowed as HTTP parameter"));
    }
}
