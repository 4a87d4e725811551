//! Service configuration documents.
//!
//! The same types describe both the YAML the user writes and the normalized
//! document the compiler emits, so a normalized config can be fed back in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Location;

/// Config version assumed when a document does not declare one.
pub const DEFAULT_CONFIG_VERSION: u32 = 3;

/// A service configuration, possibly merged from several files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apis: Vec<ApiConfig>,
    #[serde(default, skip_serializing_if = "HttpConfig::is_empty")]
    pub http: HttpConfig,
    #[serde(default, skip_serializing_if = "DocumentationConfig::is_empty")]
    pub documentation: DocumentationConfig,
    #[serde(default, skip_serializing_if = "QuotaConfig::is_empty")]
    pub quota: QuotaConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<EndpointConfig>,
}

impl ServiceConfig {
    /// The effective config version.
    pub fn config_version(&self) -> u32 {
        self.config_version.unwrap_or(DEFAULT_CONFIG_VERSION)
    }

    /// Fold a later config file into this one.
    ///
    /// Scalars from `other` win when present; rule lists are appended so
    /// declaration order across files is preserved.
    pub fn merge(&mut self, other: ServiceConfig) {
        if !other.name.is_empty() {
            self.name = other.name;
        }
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.config_version.is_some() {
            self.config_version = other.config_version;
        }
        self.apis.extend(other.apis);
        self.http.rules.extend(other.http.rules);
        if other.documentation.summary.is_some() {
            self.documentation.summary = other.documentation.summary;
        }
        self.documentation.rules.extend(other.documentation.rules);
        self.quota.limits.extend(other.quota.limits);
        self.quota.metric_rules.extend(other.quota.metric_rules);
        self.endpoints.extend(other.endpoints);
    }

    /// Stamp every rule with the file and index it was declared at.
    pub fn assign_origins(&mut self, file: &str) {
        for (idx, rule) in self.http.rules.iter_mut().enumerate() {
            rule.origin = Location::new(file, format!("http.rules[{}]", idx));
            for (nested, binding) in rule.additional_bindings.iter_mut().enumerate() {
                binding.origin = Location::new(
                    file,
                    format!("http.rules[{}].additional_bindings[{}]", idx, nested),
                );
            }
        }
        for (idx, rule) in self.documentation.rules.iter_mut().enumerate() {
            rule.origin = Location::new(file, format!("documentation.rules[{}]", idx));
        }
        for (idx, limit) in self.quota.limits.iter_mut().enumerate() {
            limit.origin = Location::new(file, format!("quota.limits[{}]", idx));
        }
        for (idx, rule) in self.quota.metric_rules.iter_mut().enumerate() {
            rule.origin = Location::new(file, format!("quota.metric_rules[{}]", idx));
        }
        for (idx, api) in self.apis.iter_mut().enumerate() {
            api.origin = Location::new(file, format!("apis[{}]", idx));
        }
        for (idx, endpoint) in self.endpoints.iter_mut().enumerate() {
            endpoint.origin = Location::new(file, format!("endpoints[{}]", idx));
        }
    }
}

/// An interface exposed by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<MixinConfig>,
    #[serde(skip)]
    pub origin: Location,
}

/// An interface whose methods are re-exposed by the including API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixinConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// The `http` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub rules: Vec<HttpRule>,
}

impl HttpConfig {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// An HTTP binding rule, either from the service config or an IDL annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomHttpPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_bindings: Vec<HttpRule>,
    #[serde(skip)]
    pub origin: Location,
}

/// A non-standard HTTP verb binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomHttpPattern {
    pub kind: String,
    pub path: String,
}

/// The `documentation` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<DocumentationRule>,
}

impl DocumentationConfig {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.rules.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRule {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_description: Option<String>,
    #[serde(skip)]
    pub origin: Location,
}

/// The `quota` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<QuotaLimit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_rules: Vec<MetricRule>,
}

impl QuotaConfig {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.metric_rules.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaLimit {
    pub name: String,
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Values keyed by tier; `BTreeMap` keeps output order stable.
    #[serde(default)]
    pub values: BTreeMap<String, i64>,
    #[serde(skip)]
    pub origin: Location,
}

/// Per-method metric costs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRule {
    pub selector: String,
    #[serde(default)]
    pub metric_costs: BTreeMap<String, i64>,
    #[serde(skip)]
    pub origin: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_cors: bool,
    #[serde(skip)]
    pub origin: Location,
}
