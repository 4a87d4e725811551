//! Reachability of elements from the exposed interfaces.

use crate::model::{ElementId, ElementKind, FieldType, Model};

/// Answers whether an element takes part in the compilation.
///
/// An element is reachable when it is the model root, one of the root
/// interfaces or their methods, or a message/enum transitively referenced by
/// those methods' request and response types (together with its fields).
#[derive(Debug, Clone)]
pub struct Scoper {
    reachable: Vec<bool>,
}

impl Scoper {
    /// Every element is reachable.
    pub fn all(model: &Model) -> Self {
        Self {
            reachable: vec![true; model.len()],
        }
    }

    /// Reachability starting from the given interfaces.
    pub fn from_roots(model: &Model, roots: &[ElementId]) -> Self {
        let mut reachable = vec![false; model.len()];
        reachable[model.root().index()] = true;

        let mut pending: Vec<ElementId> = Vec::new();
        for &interface in roots {
            if model.kind(interface) != ElementKind::Interface {
                continue;
            }
            reachable[interface.index()] = true;
            for method in model.methods(interface) {
                reachable[method.index()] = true;
                if let Some(info) = model.method_info(method) {
                    pending.push(info.input);
                    pending.push(info.output);
                }
            }
        }

        while let Some(id) = pending.pop() {
            if reachable[id.index()] {
                continue;
            }
            reachable[id.index()] = true;
            for field in model.fields(id) {
                reachable[field.index()] = true;
                match model.field_info(field).map(|f| f.ty) {
                    Some(FieldType::Message(target)) | Some(FieldType::Enum(target)) => {
                        pending.push(target)
                    }
                    _ => {}
                }
            }
        }

        Self { reachable }
    }

    pub fn is_reachable(&self, id: ElementId) -> bool {
        self.reachable.get(id.index()).copied().unwrap_or(false)
    }

    /// Reachable elements in pre-order.
    pub fn reachable_elements(&self, model: &Model) -> Vec<ElementId> {
        model
            .pre_order()
            .into_iter()
            .filter(|id| self.is_reachable(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_model;

    const MODEL: &str = r#"
package: demo.v1
messages:
  - name: Request
    fields:
      - { name: item, number: 1, type: Item }
  - name: Item
    fields:
      - { name: kind, number: 1, type: Kind }
  - name: Orphan
    fields:
      - { name: x, number: 1, type: string }
enums:
  - name: Kind
    values: [KIND_UNSPECIFIED]
services:
  - name: Public
    methods:
      - { name: Get, input: Request, output: Item }
  - name: Hidden
    methods:
      - { name: Peek, input: Orphan, output: Orphan }
"#;

    #[test]
    fn follows_method_types_transitively() {
        let model = parse_model(MODEL, "demo.yaml").expect("model parses");
        let public = model.lookup("demo.v1.Public").expect("Public");
        let scoper = Scoper::from_roots(&model, &[public]);

        for name in [
            "demo.v1.Public.Get",
            "demo.v1.Request.item",
            "demo.v1.Item",
            "demo.v1.Kind",
        ] {
            let id = model.lookup(name).expect(name);
            assert!(scoper.is_reachable(id), "{} should be reachable", name);
        }
        for name in ["demo.v1.Hidden", "demo.v1.Orphan", "google.protobuf.Timestamp"] {
            let id = model.lookup(name).expect(name);
            assert!(!scoper.is_reachable(id), "{} should not be reachable", name);
        }
    }
}
