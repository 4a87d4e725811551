//! Built-in aspects.

pub mod documentation;
pub mod endpoints;
pub mod http;
pub mod mixin;
pub mod quota;
pub mod versioning;

use crate::aspect::Aspect;

/// A fresh instance of every built-in aspect, in registration order.
pub fn builtin() -> Vec<Box<dyn Aspect>> {
    vec![
        Box::new(http::HttpAspect::default()),
        Box::new(versioning::VersioningAspect::default()),
        Box::new(documentation::DocumentationAspect::default()),
        Box::new(quota::QuotaAspect::default()),
        Box::new(mixin::MixinAspect::default()),
        Box::new(endpoints::EndpointsAspect),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use rampart_model::{parse_model, parse_service_config};

    use crate::compile::{compile, CompileOptions, CompileResult};

    /// Three interfaces: `Api`, a mixin candidate `Locations` that shares a
    /// method name with it, and `Conflicting` which redeclares `GetThing`
    /// with another response type.
    pub const DEMO: &str = r#"
package: demo.v1
messages:
  - name: Thing
    fields:
      - { name: name, number: 1, type: string }
  - name: GetThingRequest
    fields:
      - { name: name, number: 1, type: string }
services:
  - name: Api
    methods:
      - name: GetThing
        input: GetThingRequest
        output: Thing
        http: { get: "/v1/{name=things/*}" }
      - name: GetLocation
        input: GetThingRequest
        output: Thing
  - name: Locations
    methods:
      - name: GetLocation
        input: GetThingRequest
        output: Thing
        http: { get: "/v1/{name=locations/*}" }
  - name: Conflicting
    methods:
      - name: GetThing
        input: GetThingRequest
        output: GetThingRequest
"#;

    /// Compile [`DEMO`] against `config` with documentation warnings off.
    pub fn compile_demo(config: &str) -> CompileResult {
        let model = parse_model(DEMO, "demo.yaml").unwrap();
        let config = parse_service_config(config, "service.yaml").unwrap();
        let options = CompileOptions {
            suppress: vec!["documentation-missing".to_string()],
            ..CompileOptions::default()
        };
        compile(&model, &config, &options).unwrap()
    }

    pub fn codes(result: &CompileResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }
}
