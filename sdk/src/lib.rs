//! dynaproto-sdk
//!
//! This crate ties the pieces together for runtime use:
//!
//! - `compile_schema` (re-exported from the compiler),
//! - `Schema` / `Instance` / `Value` (re-exported from the schema crate),
//! - JSON bridging for message instances.

pub use dynaproto_compiler::builder::Builder;
pub use dynaproto_compiler::compiler::compile_schema;
pub use dynaproto_compiler::error::ProtoError;
pub use dynaproto_schema::{Instance, Schema, Value};

pub mod error {
    pub use dynaproto_compiler::error::ProtoError;
    pub use dynaproto_schema::error::{DecodeError, EncodeError};
}

pub mod schema {
    pub use dynaproto_schema::{
        Constant, EnumDef, FieldDef, FieldType, MessageDef, Node, NodeKind, Rule, ScalarType,
        Schema, TypeId, WireType, ROOT,
    };
}

use dynaproto_schema::{EncodeError, FieldType, Rule, ScalarType};
use serde_json::{json, Map, Number};

/// Renders a message instance as JSON. Absent fields are omitted; enum
/// values print as their declared names where known, and `bytes` fields
/// print as arrays of numbers.
pub fn instance_to_json(schema: &Schema, instance: &Instance) -> serde_json::Value {
    let Some(def) = schema.message(instance.type_id()) else {
        return serde_json::Value::Null;
    };
    let mut object = Map::new();
    for field in &def.fields {
        if let Some(value) = instance.get(schema, &field.name) {
            object.insert(field.name.clone(), value_to_json(schema, field.ty, value));
        }
    }
    serde_json::Value::Object(object)
}

fn value_to_json(schema: &Schema, ty: FieldType, value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::Int32(v) => json!(v),
        Value::Uint32(v) => json!(v),
        Value::Int64(v) => json!(v),
        Value::Float(v) => Number::from_f64(f64::from(*v))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Double(v) => Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(v) => json!(v),
        Value::Bytes(v) => json!(v),
        Value::Enum(number) => {
            let name = match ty {
                FieldType::Enum(id) => schema
                    .enum_def(id)
                    .and_then(|def| def.name(*number)),
                _ => None,
            };
            match name {
                Some(name) => json!(name),
                None => json!(number),
            }
        }
        Value::Array(values) => serde_json::Value::Array(
            values
                .iter()
                .map(|item| value_to_json(schema, ty, item))
                .collect(),
        ),
        Value::Message(instance) => instance_to_json(schema, instance),
    }
}

/// Builds an instance of the named message from a JSON object. Unknown keys
/// are an error; missing keys keep the field's declared default (or stay
/// absent). Enum fields accept either a value name or a raw number.
pub fn instance_from_json(
    schema: &Schema,
    name: &str,
    json: &serde_json::Value,
) -> Result<Instance, EncodeError> {
    let serde_json::Value::Object(object) = json else {
        return Err(EncodeError::TypeMismatch {
            field: name.to_owned(),
        });
    };
    let mut instance = schema.instance(name)?;
    let type_id = instance.type_id();
    for (key, entry) in object {
        let def = schema
            .message(type_id)
            .ok_or_else(|| EncodeError::UnknownMessage(name.to_owned()))?;
        let (_, field) = def.field_by_name(key).ok_or_else(|| EncodeError::UnknownField {
            message: schema.full_name(type_id),
            field: key.clone(),
        })?;
        let (field_name, rule, ty) = (field.name.clone(), field.rule, field.ty);
        let value = if rule == Rule::Repeated {
            let serde_json::Value::Array(items) = entry else {
                return Err(EncodeError::TypeMismatch { field: field_name });
            };
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(value_from_json(schema, &field_name, ty, item)?);
            }
            Value::Array(values)
        } else {
            value_from_json(schema, &field_name, ty, entry)?
        };
        instance.set(schema, &field_name, value)?;
    }
    Ok(instance)
}

fn value_from_json(
    schema: &Schema,
    field_name: &str,
    ty: FieldType,
    json: &serde_json::Value,
) -> Result<Value, EncodeError> {
    let mismatch = || EncodeError::TypeMismatch {
        field: field_name.to_owned(),
    };
    match ty {
        FieldType::Scalar(scalar) => match scalar {
            ScalarType::Bool => Ok(Value::Bool(json.as_bool().ok_or_else(mismatch)?)),
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
                let number = json.as_i64().ok_or_else(mismatch)?;
                i32::try_from(number).map(Value::Int32).map_err(|_| mismatch())
            }
            ScalarType::Uint32 | ScalarType::Fixed32 => {
                let number = json.as_u64().ok_or_else(mismatch)?;
                u32::try_from(number).map(Value::Uint32).map_err(|_| mismatch())
            }
            ScalarType::Sfixed64 => Ok(Value::Int64(json.as_i64().ok_or_else(mismatch)?)),
            ScalarType::Float => Ok(Value::Float(json.as_f64().ok_or_else(mismatch)? as f32)),
            ScalarType::Double => Ok(Value::Double(json.as_f64().ok_or_else(mismatch)?)),
            ScalarType::String => Ok(Value::String(
                json.as_str().ok_or_else(mismatch)?.to_owned(),
            )),
            ScalarType::Bytes => {
                let items = json.as_array().ok_or_else(mismatch)?;
                let mut bytes = Vec::with_capacity(items.len());
                for item in items {
                    let number = item.as_u64().ok_or_else(mismatch)?;
                    bytes.push(u8::try_from(number).map_err(|_| mismatch())?);
                }
                Ok(Value::Bytes(bytes))
            }
        },
        FieldType::Enum(id) => {
            if let Some(word) = json.as_str() {
                let def = schema.enum_def(id).ok_or_else(mismatch)?;
                return def.number(word).map(Value::Enum).ok_or_else(mismatch);
            }
            let number = json.as_i64().ok_or_else(mismatch)?;
            i32::try_from(number).map(Value::Enum).map_err(|_| mismatch())
        }
        FieldType::Message(id) => {
            let name = schema.full_name(id);
            instance_from_json(schema, &name, json).map(Value::Message)
        }
    }
}
