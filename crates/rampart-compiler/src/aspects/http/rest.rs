//! REST method and collection inference.
//!
//! Every bound method gets a [`RestMethod`]: the standard verb it implements
//! (or a custom method name) and the collection it acts on. Methods are then
//! grouped into [`CollectionAttribute`]s keyed by version and collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use rampart_model::{ElementId, Model, Scoper};

use super::binding::{HttpBinding, HttpMethod};
use crate::diag::AspectReporter;
use crate::path_template::{PathSegment, PathTemplate};

/// Version assumed when a path does not start with one.
pub const DEFAULT_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestKind {
    Get,
    List,
    Create,
    Update,
    Patch,
    Delete,
    Custom,
}

impl RestKind {
    fn standard_name(self) -> &'static str {
        match self {
            RestKind::Get => "get",
            RestKind::List => "list",
            RestKind::Create => "create",
            RestKind::Update => "update",
            RestKind::Patch => "patch",
            RestKind::Delete => "delete",
            RestKind::Custom => "custom",
        }
    }
}

/// The REST identity of one binding of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct RestMethod {
    pub method: ElementId,
    pub kind: RestKind,
    /// `get`, `list`, ... or the custom method name.
    pub name: String,
    /// Empty for methods without an HTTP binding.
    pub version: String,
    /// Dotted collection name, e.g. `shelves.books`.
    pub base_collection: String,
    pub custom_verb: Option<String>,
    pub has_valid_rest_pattern: bool,
    pub response_type: Option<ElementId>,
    /// Message type of a single-field request body.
    pub body_type: Option<ElementId>,
}

impl RestMethod {
    /// REST identity of a method without HTTP binding.
    pub fn unbound(model: &Model, method: ElementId) -> Self {
        Self {
            method,
            kind: RestKind::Custom,
            name: model.full_name(method).to_string(),
            version: String::new(),
            base_collection: String::new(),
            custom_verb: None,
            has_valid_rest_pattern: true,
            response_type: None,
            body_type: None,
        }
    }

    pub fn is_unbound(&self) -> bool {
        self.version.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    /// Any of the five standard verbs.
    Standard,
}

impl Verb {
    fn accepts(self, method: &HttpMethod) -> bool {
        match (self, method) {
            (_, HttpMethod::Custom(_)) => false,
            (Verb::Standard, _) => true,
            (Verb::Get, HttpMethod::Get)
            | (Verb::Put, HttpMethod::Put)
            | (Verb::Post, HttpMethod::Post)
            | (Verb::Patch, HttpMethod::Patch)
            | (Verb::Delete, HttpMethod::Delete) => true,
            _ => false,
        }
    }
}

/// Shape of the last path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// A field binding or wildcard.
    Variable,
    Literal,
    /// The template ends in `:verb`.
    CustomVerb,
}

struct MethodPattern {
    verb: Verb,
    rpc_name: &'static str,
    shape: Shape,
    kind: RestKind,
}

/// First match wins, so standard methods are tried before the custom and
/// legacy custom shapes.
const PATTERNS: &[MethodPattern] = &[
    MethodPattern { verb: Verb::Get, rpc_name: "^Get", shape: Shape::Variable, kind: RestKind::Get },
    MethodPattern { verb: Verb::Get, rpc_name: "^List", shape: Shape::Literal, kind: RestKind::List },
    MethodPattern { verb: Verb::Put, rpc_name: "^Update", shape: Shape::Variable, kind: RestKind::Update },
    MethodPattern { verb: Verb::Post, rpc_name: "^(Create|Insert)", shape: Shape::Literal, kind: RestKind::Create },
    MethodPattern { verb: Verb::Patch, rpc_name: "^(Update|Patch)", shape: Shape::Variable, kind: RestKind::Patch },
    MethodPattern { verb: Verb::Delete, rpc_name: "^Delete", shape: Shape::Variable, kind: RestKind::Delete },
    MethodPattern { verb: Verb::Standard, rpc_name: "", shape: Shape::CustomVerb, kind: RestKind::Custom },
    MethodPattern { verb: Verb::Post, rpc_name: "", shape: Shape::Literal, kind: RestKind::Custom },
    MethodPattern { verb: Verb::Get, rpc_name: "", shape: Shape::Literal, kind: RestKind::Custom },
];

fn pattern_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|p| Regex::new(p.rpc_name).expect("method pattern compiles"))
            .collect()
    })
}

fn version_regex() -> &'static Regex {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION.get_or_init(|| Regex::new(r"^v\d+([a-z]+\d*)?$").expect("version pattern compiles"))
}

fn shape(template: &PathTemplate) -> Shape {
    if template.custom_verb().is_some() {
        return Shape::CustomVerb;
    }
    match template.last_path_segment() {
        Some(PathSegment::FieldBinding { .. }) => Shape::Variable,
        Some(segment) if segment.is_wildcard() => Shape::Variable,
        _ => Shape::Literal,
    }
}

/// Version from the first path segment, and the remaining literals.
fn split_version(template: &PathTemplate) -> (String, Vec<&str>) {
    let mut literals = template.literals();
    let leading = match template.segments().first() {
        Some(PathSegment::Literal { text, .. }) if version_regex().is_match(text) => Some(text),
        _ => None,
    };
    match leading {
        Some(version) => {
            literals.remove(0);
            (version.clone(), literals)
        }
        None => (DEFAULT_VERSION.to_string(), literals),
    }
}

pub(crate) fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Infer the REST identity of `binding` on `method`.
pub fn rest_method(
    model: &Model,
    method: ElementId,
    binding: &HttpBinding,
    config_version: u32,
) -> RestMethod {
    let rpc = model.element(method).simple_name.as_str();
    let template = &binding.template;
    let shape = shape(template);
    let (version, literals) = split_version(template);

    let matched = PATTERNS
        .iter()
        .zip(pattern_regexes())
        .find(|(p, re)| p.verb.accepts(&binding.method) && p.shape == shape && re.is_match(rpc))
        .map(|(p, _)| p);

    let (kind, name, custom_verb, valid, base) = match matched {
        Some(p) if p.kind != RestKind::Custom => (
            p.kind,
            p.kind.standard_name().to_string(),
            None,
            true,
            literals.join("."),
        ),
        Some(_) if shape == Shape::CustomVerb => {
            let verb = template.custom_verb().unwrap_or_default().to_string();
            (RestKind::Custom, verb.clone(), Some(verb), true, literals.join("."))
        }
        // Legacy custom method: the trailing literal names the method.
        Some(_) => match literals.split_last() {
            Some((last, rest)) => (RestKind::Custom, last.to_string(), None, true, rest.join(".")),
            None => (RestKind::Custom, lower_camel(rpc), None, true, String::new()),
        },
        None => {
            let name = match literals.last() {
                Some(last) if config_version <= 1 => last.to_string(),
                _ => lower_camel(rpc),
            };
            (RestKind::Custom, name, None, false, literals.join("."))
        }
    };

    RestMethod {
        method,
        kind,
        name,
        version,
        base_collection: base,
        custom_verb,
        has_valid_rest_pattern: valid,
        response_type: model.method_info(method).map(|i| i.output),
        body_type: binding.body_type(model),
    }
}

/// REST methods sharing a version and base collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionAttribute {
    pub version: String,
    pub base_name: String,
    /// Display name; equals `base_name` unless names were shortened.
    pub name: String,
    methods: BTreeMap<String, Vec<RestMethod>>,
    pub resource_type: Option<ElementId>,
}

impl CollectionAttribute {
    pub fn new(version: impl Into<String>, base_name: impl Into<String>) -> Self {
        let base_name = base_name.into();
        Self {
            version: version.into(),
            name: base_name.clone(),
            base_name,
            methods: BTreeMap::new(),
            resource_type: None,
        }
    }

    /// `version.name`, or just the version for the root collection.
    pub fn full_name(&self) -> String {
        if self.name.is_empty() {
            self.version.clone()
        } else {
            format!("{}.{}", self.version, self.name)
        }
    }

    pub fn add(&mut self, method: RestMethod) {
        self.methods.entry(method.name.clone()).or_default().push(method);
    }

    /// The REST method shown under `name`; the last one added wins.
    pub fn rest_method(&self, name: &str) -> Option<&RestMethod> {
        self.methods.get(name).and_then(|m| m.last())
    }

    pub fn rest_methods(&self) -> impl Iterator<Item = &RestMethod> {
        self.methods.values().flatten()
    }

    /// Names claimed by more than one method.
    pub fn conflicts(&self) -> impl Iterator<Item = (&str, &[RestMethod])> {
        self.methods
            .iter()
            .filter(|(_, methods)| methods.len() > 1)
            .map(|(name, methods)| (name.as_str(), methods.as_slice()))
    }

    fn is_named(&self, target: &str) -> bool {
        target == self.base_name || target == self.name || target == self.full_name()
    }

    pub fn summary(&self, model: &Model) -> CollectionSummary {
        CollectionSummary {
            name: self.full_name(),
            resource_type: self.resource_type.map(|t| model.full_name(t).to_string()),
            methods: self
                .methods
                .iter()
                .filter_map(|(name, methods)| {
                    methods
                        .last()
                        .map(|m| (name.clone(), model.full_name(m.method).to_string()))
                })
                .collect(),
        }
    }
}

/// Serializable view of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// REST method name to RPC full name.
    pub methods: BTreeMap<String, String>,
}

/// Collects REST methods during merging and builds the collections at the end.
#[derive(Debug, Default)]
pub struct RestAnalyzer {
    collections: BTreeMap<(String, String), CollectionAttribute>,
}

impl RestAnalyzer {
    pub fn add(&mut self, method: &RestMethod) {
        if method.is_unbound() {
            return;
        }
        self.collections
            .entry((method.version.clone(), method.base_collection.clone()))
            .or_insert_with(|| CollectionAttribute::new(&method.version, &method.base_collection))
            .add(method.clone());
    }

    /// Shorten names if asked, then assign resource types: explicit
    /// `resource_for` annotations first, the ranking heuristic otherwise.
    pub fn finalize(
        self,
        model: &Model,
        scoper: &Scoper,
        shorten: bool,
        reporter: &mut AspectReporter<'_>,
    ) -> Vec<CollectionAttribute> {
        let mut collections: Vec<_> = self.collections.into_values().collect();
        if shorten {
            shorten_names(&mut collections);
        }

        for message in model.messages() {
            let Some(target) = model
                .message_info(message)
                .and_then(|info| info.resource_for.as_deref())
            else {
                continue;
            };
            match collections.iter_mut().find(|c| c.is_named(target)) {
                Some(collection) => collection.resource_type = Some(message),
                None if scoper.is_reachable(message) => reporter.warning(
                    "unknown-collection",
                    Some(model.full_name(message)),
                    &model.element(message).location,
                    format!(
                        "message '{}' is declared as the resource of unknown collection '{}'",
                        model.full_name(message),
                        target
                    ),
                ),
                None => {}
            }
        }

        for collection in &mut collections {
            if collection.resource_type.is_none() {
                collection.resource_type = rank_resource_type(collection);
            }
        }
        collections
    }
}

/// The type ranked strictly highest by GET responses and CREATE/UPDATE
/// bodies. Ties yield no resource type.
fn rank_resource_type(collection: &CollectionAttribute) -> Option<ElementId> {
    let mut ranks: BTreeMap<ElementId, usize> = BTreeMap::new();
    for method in collection.rest_methods() {
        let candidate = match method.kind {
            RestKind::Get => method.response_type,
            RestKind::Create | RestKind::Update => method.body_type,
            _ => None,
        };
        if let Some(ty) = candidate {
            *ranks.entry(ty).or_default() += 1;
        }
    }

    let best = ranks.values().copied().max()?;
    let mut top = ranks.iter().filter(|(_, rank)| **rank == best);
    let (winner, _) = top.next()?;
    match top.next() {
        Some(_) => None,
        None => Some(*winner),
    }
}

/// Replace each collection's display name with the shortest dotted suffix
/// that is unique within its version, camel-casing joined segments.
/// Collections that stay ambiguous keep their full base name.
fn shorten_names(collections: &mut [CollectionAttribute]) {
    let segments: Vec<Vec<String>> = collections
        .iter()
        .map(|c| c.base_name.split('.').map(str::to_string).collect())
        .collect();
    let mut depth = vec![1usize; collections.len()];

    let candidate = |segs: &[String], depth: usize| -> String {
        let start = segs.len().saturating_sub(depth);
        segs[start..]
            .iter()
            .enumerate()
            .map(|(i, s)| if i == 0 { s.clone() } else { upper_camel(s) })
            .collect()
    };

    loop {
        let mut groups: HashMap<(&str, String), Vec<usize>> = HashMap::new();
        for (i, collection) in collections.iter().enumerate() {
            groups
                .entry((collection.version.as_str(), candidate(&segments[i], depth[i])))
                .or_default()
                .push(i);
        }
        let mut changed = false;
        for members in groups.values().filter(|m| m.len() > 1) {
            for &i in members {
                if depth[i] < segments[i].len() {
                    depth[i] += 1;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    for (i, collection) in collections.iter_mut().enumerate() {
        collection.name = candidate(&segments[i], depth[i]);
    }

    let mut taken: HashMap<(String, String), usize> = HashMap::new();
    for collection in collections.iter() {
        *taken
            .entry((collection.version.clone(), collection.name.clone()))
            .or_default() += 1;
    }
    for collection in collections.iter_mut() {
        let key = (collection.version.clone(), collection.name.clone());
        if taken.get(&key).is_some_and(|count| *count > 1) {
            collection.name = collection.base_name.clone();
        }
    }
}
