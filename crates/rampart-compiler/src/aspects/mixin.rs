//! API mixins: interfaces whose methods an API re-exposes.

use std::collections::HashMap;

use rampart_model::{ApiConfig, ElementId, ElementKind, Location, MixinConfig, ServiceConfig};

use crate::aspect::{Aspect, CompileContext};
use crate::aspects::versioning;

pub const NAME: &str = "mixin";

const E_UNKNOWN_API: &str = "E2040";
const E_UNKNOWN_MIXIN: &str = "E2041";
const E_REDECLARED_TYPES: &str = "E2042";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinAttribute {
    pub interface: ElementId,
    /// Path prefix declared for the mixin, carried into the normalized `apis`.
    pub root: Option<String>,
}

#[derive(Debug, Default)]
pub struct MixinAspect {
    declared: HashMap<ElementId, (Vec<MixinAttribute>, Location)>,
}

impl Aspect for MixinAspect {
    fn name(&self) -> &'static str {
        NAME
    }

    fn merge_dependencies(&self) -> &'static [&'static str] {
        &["http", "versioning"]
    }

    fn start_merging(&mut self, cx: &mut CompileContext<'_>) {
        let model = cx.model;
        let mut reporter = cx.diags.reporter(NAME);
        for api in &cx.config.apis {
            let interface = match model.lookup(&api.name) {
                Some(id) if model.kind(id) == ElementKind::Interface => id,
                _ => {
                    reporter.error(
                        E_UNKNOWN_API,
                        &api.origin,
                        format!("api '{}' does not name an interface", api.name),
                    );
                    continue;
                }
            };
            let mut mixins = Vec::with_capacity(api.mixins.len());
            for mixin in &api.mixins {
                match model.lookup(&mixin.name) {
                    Some(id) if model.kind(id) == ElementKind::Interface => {
                        mixins.push(MixinAttribute {
                            interface: id,
                            root: mixin.root.clone(),
                        })
                    }
                    _ => reporter.error(
                        E_UNKNOWN_MIXIN,
                        &api.origin,
                        format!(
                            "mixin '{}' of api '{}' does not name an interface",
                            mixin.name, api.name
                        ),
                    ),
                }
            }
            if !mixins.is_empty() {
                self.declared
                    .insert(interface, (mixins, api.origin.clone()));
            }
        }
    }

    fn merge(&mut self, cx: &mut CompileContext<'_>, element: ElementId) {
        let Some((mixins, origin)) = self.declared.get(&element) else {
            return;
        };
        let model = cx.model;
        let api_name = model.full_name(element);
        let api_version = cx
            .attrs
            .get(element)
            .version
            .as_ref()
            .map(|v| v.major.clone())
            .unwrap_or_else(|| versioning::interface_version(model, cx.config, element));

        let mut reporter = cx.diags.reporter(NAME);
        for mixin in mixins {
            let mixin_name = model.full_name(mixin.interface);
            let mixin_version = versioning::interface_version(model, cx.config, mixin.interface);
            if mixin_version != api_version {
                reporter.warning(
                    "version-mismatch",
                    Some(api_name),
                    origin,
                    format!(
                        "mixin '{}' has version '{}' but api '{}' has version '{}'",
                        mixin_name, mixin_version, api_name, api_version
                    ),
                );
            }

            for mixed in model.methods(mixin.interface) {
                let simple = &model.element(mixed).simple_name;
                let Some(redeclared) = model
                    .methods(element)
                    .find(|m| &model.element(*m).simple_name == simple)
                else {
                    continue;
                };
                let (Some(theirs), Some(ours)) =
                    (model.method_info(mixed), model.method_info(redeclared))
                else {
                    continue;
                };
                if theirs.input != ours.input || theirs.output != ours.output {
                    reporter.error(
                        E_REDECLARED_TYPES,
                        &model.element(redeclared).location,
                        format!(
                            "'{}' redeclares '{}' with different request or response types",
                            model.full_name(redeclared),
                            model.full_name(mixed)
                        ),
                    );
                }
                if theirs.http.is_some() && cx.attrs.get(redeclared).http.is_none() {
                    reporter.warning(
                        "missing-http",
                        Some(model.full_name(redeclared)),
                        &model.element(redeclared).location,
                        format!(
                            "'{}' drops the HTTP binding of mixin method '{}'",
                            model.full_name(redeclared),
                            model.full_name(mixed)
                        ),
                    );
                }
            }
        }
        cx.attrs.get_mut(element).mixins = Some(mixins.clone());
    }

    fn normalize(
        &mut self,
        cx: &mut CompileContext<'_>,
        element: ElementId,
        out: &mut ServiceConfig,
    ) {
        if !cx.apis.contains(&element) {
            return;
        }
        let model = cx.model;
        let attrs = cx.attrs.get(element);
        out.apis.push(ApiConfig {
            name: model.full_name(element).to_string(),
            version: attrs.version.as_ref().map(|v| v.major.clone()),
            mixins: attrs
                .mixins
                .iter()
                .flatten()
                .map(|m| MixinConfig {
                    name: model.full_name(m.interface).to_string(),
                    root: m.root.clone(),
                })
                .collect(),
            origin: Location::default(),
        });
    }
}
