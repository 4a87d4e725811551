use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::HttpRule;

/// Index of an element inside its [`Model`].
///
/// Ids are only handed out by the model that owns the element, so indexing
/// with an id never goes out of bounds for that model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    /// The model root.
    pub const ROOT: ElementId = ElementId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of an element. Lint rules and aspects dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Model,
    Interface,
    Method,
    Message,
    Field,
    Enum,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Model => "model",
            ElementKind::Interface => "interface",
            ElementKind::Method => "method",
            ElementKind::Message => "message",
            ElementKind::Field => "field",
            ElementKind::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// Where an element or rule was declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    /// Logical path inside the file (e.g. `http.rules[2]` or `Shelf.name`).
    pub path: String,
}

impl Location {
    pub fn new(file: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file.is_empty(), self.path.is_empty()) {
            (true, true) => f.write_str("<unknown>"),
            (false, true) => f.write_str(&self.file),
            (true, false) => f.write_str(&self.path),
            (false, false) => write!(f, "{}:{}", self.file, self.path),
        }
    }
}

/// Protobuf scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Uint32,
    Fixed64,
    Fixed32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "double" => Self::Double,
            "float" => Self::Float,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "fixed64" => Self::Fixed64,
            "fixed32" => Self::Fixed32,
            "sfixed32" => Self::Sfixed32,
            "sfixed64" => Self::Sfixed64,
            "sint32" => Self::Sint32,
            "sint64" => Self::Sint64,
            "bool" => Self::Bool,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }

    /// Whether the type is allowed as a map key.
    pub fn is_map_key(self) -> bool {
        !matches!(self, Self::Double | Self::Float | Self::Bytes)
    }
}

/// The value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Scalar(ScalarType),
    Message(ElementId),
    Enum(ElementId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub number: u32,
    /// For map fields this is the value type.
    pub ty: FieldType,
    pub repeated: bool,
    pub map_key: Option<ScalarType>,
}

impl FieldInfo {
    pub fn is_map(&self) -> bool {
        self.map_key.is_some()
    }

    pub fn message_type(&self) -> Option<ElementId> {
        match self.ty {
            FieldType::Message(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub input: ElementId,
    pub output: ElementId,
    /// HTTP annotation declared on the method in the IDL.
    pub http: Option<HttpRule>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageInfo {
    /// Collection this message is declared to be the resource of.
    pub resource_for: Option<String>,
    pub well_known: bool,
}

/// Per-kind payload of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementDetail {
    Model,
    Interface,
    Method(MethodInfo),
    Message(MessageInfo),
    Field(FieldInfo),
    Enum,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub simple_name: String,
    pub full_name: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub location: Location,
    /// Leading comment from the IDL.
    pub description: Option<String>,
    pub detail: ElementDetail,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self.detail {
            ElementDetail::Model => ElementKind::Model,
            ElementDetail::Interface => ElementKind::Interface,
            ElementDetail::Method(_) => ElementKind::Method,
            ElementDetail::Message(_) => ElementKind::Message,
            ElementDetail::Field(_) => ElementKind::Field,
            ElementDetail::Enum => ElementKind::Enum,
        }
    }
}

/// The element graph of one compilation.
///
/// Elements live in an arena; parents are plain ids so children never own
/// their parent.
#[derive(Debug, Clone)]
pub struct Model {
    package: String,
    elements: Vec<Element>,
    by_name: HashMap<String, ElementId>,
}

impl Model {
    /// Create a model holding only its root element.
    pub fn new(package: impl Into<String>, file: impl Into<String>) -> Self {
        let package = package.into();
        let root = Element {
            simple_name: package.clone(),
            full_name: package.clone(),
            parent: None,
            children: Vec::new(),
            location: Location::new(file, ""),
            description: None,
            detail: ElementDetail::Model,
        };
        Self {
            package,
            elements: vec![root],
            by_name: HashMap::new(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn root(&self) -> ElementId {
        ElementId::ROOT
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.len() <= 1
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(|i| ElementId(i as u32))
    }

    pub fn full_name(&self, id: ElementId) -> &str {
        &self.element(id).full_name
    }

    pub fn kind(&self, id: ElementId) -> ElementKind {
        self.element(id).kind()
    }

    /// Look up a named element by its full dotted name.
    pub fn lookup(&self, full_name: &str) -> Option<ElementId> {
        self.by_name.get(full_name.trim_start_matches('.')).copied()
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.element(id).children
    }

    pub fn interfaces(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children_of_kind(ElementId::ROOT, ElementKind::Interface)
    }

    pub fn messages(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children_of_kind(ElementId::ROOT, ElementKind::Message)
    }

    pub fn methods(&self, interface: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.children_of_kind(interface, ElementKind::Method)
    }

    pub fn fields(&self, message: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.children_of_kind(message, ElementKind::Field)
    }

    fn children_of_kind(
        &self,
        id: ElementId,
        kind: ElementKind,
    ) -> impl Iterator<Item = ElementId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }

    /// Find a field of `message` by simple name.
    pub fn field(&self, message: ElementId, name: &str) -> Option<ElementId> {
        self.fields(message)
            .find(|field| self.element(*field).simple_name == name)
    }

    pub fn method_info(&self, id: ElementId) -> Option<&MethodInfo> {
        match &self.element(id).detail {
            ElementDetail::Method(info) => Some(info),
            _ => None,
        }
    }

    pub fn field_info(&self, id: ElementId) -> Option<&FieldInfo> {
        match &self.element(id).detail {
            ElementDetail::Field(info) => Some(info),
            _ => None,
        }
    }

    pub fn message_info(&self, id: ElementId) -> Option<&MessageInfo> {
        match &self.element(id).detail {
            ElementDetail::Message(info) => Some(info),
            _ => None,
        }
    }

    /// Depth-first pre-order walk from the root, children in declaration order.
    pub fn pre_order(&self) -> Vec<ElementId> {
        let mut order = Vec::with_capacity(self.elements.len());
        let mut stack = vec![ElementId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn add_interface(
        &mut self,
        full_name: &str,
        location: Location,
        description: Option<String>,
    ) -> ElementId {
        self.push(ElementId::ROOT, full_name, location, description, ElementDetail::Interface)
    }

    pub fn add_method(
        &mut self,
        interface: ElementId,
        simple_name: &str,
        info: MethodInfo,
        location: Location,
        description: Option<String>,
    ) -> ElementId {
        let full_name = format!("{}.{}", self.full_name(interface), simple_name);
        self.push(interface, &full_name, location, description, ElementDetail::Method(info))
    }

    pub fn add_message(
        &mut self,
        full_name: &str,
        info: MessageInfo,
        location: Location,
        description: Option<String>,
    ) -> ElementId {
        self.push(ElementId::ROOT, full_name, location, description, ElementDetail::Message(info))
    }

    pub fn add_field(
        &mut self,
        message: ElementId,
        simple_name: &str,
        info: FieldInfo,
        location: Location,
        description: Option<String>,
    ) -> ElementId {
        let full_name = format!("{}.{}", self.full_name(message), simple_name);
        self.push(message, &full_name, location, description, ElementDetail::Field(info))
    }

    pub fn add_enum(
        &mut self,
        full_name: &str,
        location: Location,
        description: Option<String>,
    ) -> ElementId {
        self.push(ElementId::ROOT, full_name, location, description, ElementDetail::Enum)
    }

    fn push(
        &mut self,
        parent: ElementId,
        full_name: &str,
        location: Location,
        description: Option<String>,
        detail: ElementDetail,
    ) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        let simple_name = full_name
            .rsplit('.')
            .next()
            .unwrap_or(full_name)
            .to_string();
        self.elements.push(Element {
            simple_name,
            full_name: full_name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            location,
            description,
            detail,
        });
        self.elements[parent.index()].children.push(id);
        self.by_name.insert(full_name.to_string(), id);
        id
    }
}
