//! Per-element attributes attached by aspects.

use std::collections::BTreeMap;

use rampart_model::{ElementId, Model};

use crate::aspects::documentation::DocumentationAttribute;
use crate::aspects::http::{CollectionAttribute, HttpAttribute, RestMethod};
use crate::aspects::mixin::MixinAttribute;
use crate::aspects::versioning::VersionAttribute;

/// Attributes of one element. A slot is `None` until its aspect attaches it.
#[derive(Debug, Clone, Default)]
pub struct ElementAttributes {
    /// Methods: resolved HTTP bindings.
    pub http: Option<HttpAttribute>,
    /// Methods: one REST identity per binding (a single degenerate entry when
    /// the method has no binding).
    pub rest_methods: Option<Vec<RestMethod>>,
    /// Model root: every REST collection of the service.
    pub collections: Option<Vec<CollectionAttribute>>,
    /// Interfaces: major version.
    pub version: Option<VersionAttribute>,
    /// Interfaces: resolved mixins.
    pub mixins: Option<Vec<MixinAttribute>>,
    pub documentation: Option<DocumentationAttribute>,
    /// Methods: metric costs from quota rules.
    pub metric_costs: Option<BTreeMap<String, i64>>,
}

/// Side table holding the attributes of every element of a model.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    table: Vec<ElementAttributes>,
}

impl Attributes {
    pub fn new(model: &Model) -> Self {
        Self {
            table: vec![ElementAttributes::default(); model.len()],
        }
    }

    pub fn get(&self, id: ElementId) -> &ElementAttributes {
        &self.table[id.index()]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut ElementAttributes {
        &mut self.table[id.index()]
    }
}
