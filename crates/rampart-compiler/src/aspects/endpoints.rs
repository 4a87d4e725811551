//! Serving endpoints of the service.

use std::collections::HashSet;

use rampart_model::{EndpointConfig, Location, ServiceConfig};

use crate::aspect::{Aspect, CompileContext};

pub const NAME: &str = "endpoints";

const E_ENDPOINT: &str = "E2060";

#[derive(Debug, Default)]
pub struct EndpointsAspect;

impl Aspect for EndpointsAspect {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
        let mut reporter = cx.diags.reporter(NAME);
        let mut names = HashSet::new();
        for endpoint in &cx.config.endpoints {
            if endpoint.name.trim().is_empty() {
                reporter.error(E_ENDPOINT, &endpoint.origin, "endpoint must have a name");
            } else if !names.insert(endpoint.name.as_str()) {
                reporter.error(
                    E_ENDPOINT,
                    &endpoint.origin,
                    format!("endpoint '{}' is declared more than once", endpoint.name),
                );
            }
        }
    }

    fn start_normalization(&mut self, cx: &mut CompileContext<'_>, out: &mut ServiceConfig) {
        out.endpoints = cx
            .config
            .endpoints
            .iter()
            .map(|endpoint| EndpointConfig {
                origin: Location::default(),
                ..endpoint.clone()
            })
            .collect();
    }
}
