//! Input model for the Rampart service-config compiler.
//!
//! Loads a protobuf-style service description into an element graph, and
//! service-config YAML into typed rule lists. Also provides the reachability
//! predicate used to scope compilation to the exposed interfaces.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod scoper;
pub mod well_known;

pub use config::{
    ApiConfig, CustomHttpPattern, DocumentationConfig, DocumentationRule, EndpointConfig,
    HttpConfig, HttpRule, MetricRule, MixinConfig, QuotaConfig, QuotaLimit, ServiceConfig,
    DEFAULT_CONFIG_VERSION,
};
pub use error::ParseError;
pub use model::{
    Element, ElementDetail, ElementId, ElementKind, FieldInfo, FieldType, Location, MessageInfo,
    MethodInfo, Model, ScalarType,
};
pub use parser::{parse_model, parse_model_file, parse_service_config, parse_service_config_files};
pub use scoper::Scoper;
