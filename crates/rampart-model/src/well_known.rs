//! `google.protobuf` well-known message types.
//!
//! These are registered into every model so user messages can reference them
//! without declaring them.

use crate::model::{
    ElementId, FieldInfo, FieldType, Location, MessageInfo, Model, ScalarType,
};

pub const TIMESTAMP: &str = "google.protobuf.Timestamp";
pub const DURATION: &str = "google.protobuf.Duration";
pub const FIELD_MASK: &str = "google.protobuf.FieldMask";
pub const EMPTY: &str = "google.protobuf.Empty";
pub const ANY: &str = "google.protobuf.Any";
pub const STRUCT: &str = "google.protobuf.Struct";
pub const VALUE: &str = "google.protobuf.Value";
pub const LIST_VALUE: &str = "google.protobuf.ListValue";

/// Wrapper messages and the scalar each one boxes.
pub const WRAPPERS: &[(&str, ScalarType)] = &[
    ("google.protobuf.DoubleValue", ScalarType::Double),
    ("google.protobuf.FloatValue", ScalarType::Float),
    ("google.protobuf.Int64Value", ScalarType::Int64),
    ("google.protobuf.UInt64Value", ScalarType::Uint64),
    ("google.protobuf.Int32Value", ScalarType::Int32),
    ("google.protobuf.UInt32Value", ScalarType::Uint32),
    ("google.protobuf.BoolValue", ScalarType::Bool),
    ("google.protobuf.StringValue", ScalarType::String),
    ("google.protobuf.BytesValue", ScalarType::Bytes),
];

const FILE: &str = "google/protobuf";

pub fn is_well_known(full_name: &str) -> bool {
    full_name.starts_with("google.protobuf.")
}

/// Register every well-known message in `model`.
pub fn register(model: &mut Model) {
    let timestamp = message(model, TIMESTAMP);
    scalar(model, timestamp, "seconds", 1, ScalarType::Int64, false);
    scalar(model, timestamp, "nanos", 2, ScalarType::Int32, false);

    let duration = message(model, DURATION);
    scalar(model, duration, "seconds", 1, ScalarType::Int64, false);
    scalar(model, duration, "nanos", 2, ScalarType::Int32, false);

    let mask = message(model, FIELD_MASK);
    scalar(model, mask, "paths", 1, ScalarType::String, true);

    message(model, EMPTY);

    let any = message(model, ANY);
    scalar(model, any, "type_url", 1, ScalarType::String, false);
    scalar(model, any, "value", 2, ScalarType::Bytes, false);

    let structure = message(model, STRUCT);
    let value = message(model, VALUE);
    let list = message(model, LIST_VALUE);

    let fields = FieldInfo {
        number: 1,
        ty: FieldType::Message(value),
        repeated: true,
        map_key: Some(ScalarType::String),
    };
    model.add_field(structure, "fields", fields, location(STRUCT), None);

    scalar(model, value, "number_value", 2, ScalarType::Double, false);
    scalar(model, value, "string_value", 3, ScalarType::String, false);
    scalar(model, value, "bool_value", 4, ScalarType::Bool, false);
    nested(model, value, "struct_value", 5, structure, false);
    nested(model, value, "list_value", 6, list, false);

    nested(model, list, "values", 1, value, true);

    for (name, ty) in WRAPPERS {
        let wrapper = message(model, name);
        scalar(model, wrapper, "value", 1, *ty, false);
    }
}

fn location(name: &str) -> Location {
    Location::new(FILE, name.trim_start_matches("google.protobuf."))
}

fn message(model: &mut Model, name: &str) -> ElementId {
    let info = MessageInfo {
        resource_for: None,
        well_known: true,
    };
    model.add_message(name, info, location(name), None)
}

fn scalar(
    model: &mut Model,
    message: ElementId,
    name: &str,
    number: u32,
    ty: ScalarType,
    repeated: bool,
) {
    let info = FieldInfo {
        number,
        ty: FieldType::Scalar(ty),
        repeated,
        map_key: None,
    };
    let loc = location(model.full_name(message));
    model.add_field(message, name, info, loc, None);
}

fn nested(
    model: &mut Model,
    message: ElementId,
    name: &str,
    number: u32,
    ty: ElementId,
    repeated: bool,
) {
    let info = FieldInfo {
        number,
        ty: FieldType::Message(ty),
        repeated,
        map_key: None,
    };
    let loc = location(model.full_name(message));
    model.add_field(message, name, info, loc, None);
}
