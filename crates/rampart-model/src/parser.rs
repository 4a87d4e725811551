use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::config::{HttpRule, ServiceConfig};
use crate::error::ParseError;
use crate::model::{
    ElementId, ElementKind, FieldInfo, FieldType, Location, MessageInfo, MethodInfo, Model,
    ScalarType,
};
use crate::well_known;

/// On-disk shape of a model description.
#[derive(Debug, Deserialize)]
struct ModelFile {
    package: String,
    #[serde(default)]
    messages: Vec<MessageDecl>,
    #[serde(default)]
    enums: Vec<EnumDecl>,
    #[serde(default)]
    services: Vec<ServiceDecl>,
}

#[derive(Debug, Deserialize)]
struct MessageDecl {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    resource_for: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    name: String,
    number: u32,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    label: Label,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Label {
    #[default]
    Optional,
    Repeated,
}

#[derive(Debug, Deserialize)]
struct EnumDecl {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceDecl {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    methods: Vec<MethodDecl>,
}

#[derive(Debug, Deserialize)]
struct MethodDecl {
    name: String,
    input: String,
    output: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    http: Option<HttpRule>,
}

/// Parse a model description from a YAML string.
pub fn parse_model(input: &str, file: &str) -> Result<Model, ParseError> {
    let root: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| ParseError::ParseError(e.to_string()))?;
    if !root.is_mapping() {
        return Err(ParseError::UnknownFormat("model"));
    }
    let decl: ModelFile =
        serde_yaml::from_value(root).map_err(|e| ParseError::SchemaError(e.to_string()))?;

    let package = decl.package.trim().to_string();
    if package.is_empty() {
        return Err(ParseError::SchemaError("missing 'package'".into()));
    }

    let mut model = Model::new(package.clone(), file);
    well_known::register(&mut model);

    // Register types first so fields can reference messages declared later.
    let mut messages = Vec::with_capacity(decl.messages.len());
    for msg in &decl.messages {
        let full_name = qualify(&package, &msg.name);
        ensure_unique(&model, &full_name)?;
        let info = MessageInfo {
            resource_for: msg.resource_for.clone(),
            well_known: false,
        };
        let id = model.add_message(
            &full_name,
            info,
            Location::new(file, msg.name.clone()),
            msg.description.clone(),
        );
        messages.push(id);
    }
    for en in &decl.enums {
        let full_name = qualify(&package, &en.name);
        ensure_unique(&model, &full_name)?;
        model.add_enum(
            &full_name,
            Location::new(file, en.name.clone()),
            en.description.clone(),
        );
    }

    for (msg, id) in decl.messages.iter().zip(messages) {
        let mut numbers = HashSet::new();
        for field in &msg.fields {
            if !numbers.insert(field.number) {
                return Err(ParseError::SchemaError(format!(
                    "duplicate field number {} in message '{}'",
                    field.number, msg.name
                )));
            }
            if model.field(id, &field.name).is_some() {
                return Err(ParseError::SchemaError(format!(
                    "duplicate field '{}' in message '{}'",
                    field.name, msg.name
                )));
            }
            let context = format!("{}.{}", msg.name, field.name);
            let info = parse_field_type(&model, &package, field, &context)?;
            model.add_field(
                id,
                &field.name,
                info,
                Location::new(file, context.clone()),
                field.description.clone(),
            );
        }
    }

    for svc in &decl.services {
        let full_name = qualify(&package, &svc.name);
        ensure_unique(&model, &full_name)?;
        let interface = model.add_interface(
            &full_name,
            Location::new(file, svc.name.clone()),
            svc.description.clone(),
        );
        for method in &svc.methods {
            let context = format!("{}.{}", svc.name, method.name);
            let input = resolve_message(&model, &package, &method.input, &context)?;
            let output = resolve_message(&model, &package, &method.output, &context)?;
            let mut http = method.http.clone();
            if let Some(rule) = http.as_mut() {
                rule.origin = Location::new(file, format!("{}.http", context));
            }
            model.add_method(
                interface,
                &method.name,
                MethodInfo {
                    input,
                    output,
                    http,
                },
                Location::new(file, context.clone()),
                method.description.clone(),
            );
        }
    }

    Ok(model)
}

/// Parse a model description from a file path.
pub fn parse_model_file(path: &Path) -> Result<Model, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_model(&content, &display_name(path))
}

/// Parse a service config from a YAML string, stamping rule origins with `file`.
pub fn parse_service_config(input: &str, file: &str) -> Result<ServiceConfig, ParseError> {
    let root: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| ParseError::ParseError(e.to_string()))?;
    if root.is_null() {
        // An empty file is a valid, empty config.
        return Ok(ServiceConfig::default());
    }
    if !root.is_mapping() {
        return Err(ParseError::UnknownFormat("service config"));
    }
    let mut config: ServiceConfig =
        serde_yaml::from_value(root).map_err(|e| ParseError::SchemaError(e.to_string()))?;
    config.assign_origins(file);
    Ok(config)
}

/// Parse and merge several service config files in order.
pub fn parse_service_config_files(paths: &[&Path]) -> Result<ServiceConfig, ParseError> {
    let mut merged = ServiceConfig::default();
    for path in paths {
        let content = std::fs::read_to_string(path)?;
        merged.merge(parse_service_config(&content, &display_name(path))?);
    }
    Ok(merged)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn qualify(package: &str, name: &str) -> String {
    format!("{}.{}", package, name)
}

fn ensure_unique(model: &Model, full_name: &str) -> Result<(), ParseError> {
    if model.lookup(full_name).is_some() {
        return Err(ParseError::SchemaError(format!(
            "'{}' is declared more than once",
            full_name
        )));
    }
    Ok(())
}

/// Resolve a type name relative to the package, then as a full name.
fn resolve_named(model: &Model, package: &str, name: &str) -> Option<ElementId> {
    let name = name.trim();
    if let Some(absolute) = name.strip_prefix('.') {
        return model.lookup(absolute);
    }
    model
        .lookup(&qualify(package, name))
        .or_else(|| model.lookup(name))
}

fn resolve_message(
    model: &Model,
    package: &str,
    name: &str,
    context: &str,
) -> Result<ElementId, ParseError> {
    match resolve_named(model, package, name) {
        Some(id) if model.kind(id) == ElementKind::Message => Ok(id),
        _ => Err(ParseError::UnresolvedType(format!(
            "message '{}' referenced by '{}'",
            name, context
        ))),
    }
}

fn resolve_value_type(
    model: &Model,
    package: &str,
    name: &str,
    context: &str,
) -> Result<FieldType, ParseError> {
    if let Some(scalar) = ScalarType::parse(name.trim()) {
        return Ok(FieldType::Scalar(scalar));
    }
    match resolve_named(model, package, name) {
        Some(id) if model.kind(id) == ElementKind::Message => Ok(FieldType::Message(id)),
        Some(id) if model.kind(id) == ElementKind::Enum => Ok(FieldType::Enum(id)),
        _ => Err(ParseError::UnresolvedType(format!(
            "type '{}' referenced by '{}'",
            name.trim(),
            context
        ))),
    }
}

fn parse_field_type(
    model: &Model,
    package: &str,
    field: &FieldDecl,
    context: &str,
) -> Result<FieldInfo, ParseError> {
    let ty = field.ty.trim();
    if let Some(inner) = ty.strip_prefix("map<").and_then(|s| s.strip_suffix('>')) {
        let (key, value) = inner.split_once(',').ok_or_else(|| {
            ParseError::SchemaError(format!("malformed map type '{}' on '{}'", ty, context))
        })?;
        let key = ScalarType::parse(key.trim())
            .filter(|k| k.is_map_key())
            .ok_or_else(|| {
                ParseError::SchemaError(format!(
                    "invalid map key type '{}' on '{}'",
                    key.trim(),
                    context
                ))
            })?;
        if field.label == Label::Repeated {
            return Err(ParseError::SchemaError(format!(
                "map field '{}' cannot be labeled repeated",
                context
            )));
        }
        return Ok(FieldInfo {
            number: field.number,
            ty: resolve_value_type(model, package, value, context)?,
            repeated: true,
            map_key: Some(key),
        });
    }

    Ok(FieldInfo {
        number: field.number,
        ty: resolve_value_type(model, package, ty, context)?,
        repeated: field.label == Label::Repeated,
        map_key: None,
    })
}
