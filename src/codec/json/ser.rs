//! Emits the Protobuf canonical JSON mapping from a [`DynamicMessage`].
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};

use crate::descriptor::{FieldDescriptor, FieldType};
use crate::dynamic::{scalar_default, DynamicMessage, MapKey, Value};
use crate::error::JsonEncodeError;

/// Options governing JSON serialization.
#[derive(Debug, Clone, Copy)]
pub struct JsonSerializeOptions {
    use_original_field_names: bool,
    pretty_printed: bool,
    include_default_values: bool,
}

impl JsonSerializeOptions {
    pub const fn new() -> Self {
        JsonSerializeOptions {
            use_original_field_names: false,
            pretty_printed: false,
            include_default_values: false,
        }
    }

    pub const fn use_original_field_names(mut self, value: bool) -> Self {
        self.use_original_field_names = value;
        self
    }

    pub const fn pretty_printed(mut self, value: bool) -> Self {
        self.pretty_printed = value;
        self
    }

    pub const fn include_default_values(mut self, value: bool) -> Self {
        self.include_default_values = value;
        self
    }
}

impl Default for JsonSerializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

pub fn serialize(message: &DynamicMessage) -> Result<String, JsonEncodeError> {
    serialize_with_options(message, &JsonSerializeOptions::default())
}

pub fn serialize_with_options(
    message: &DynamicMessage,
    options: &JsonSerializeOptions,
) -> Result<String, JsonEncodeError> {
    let value = message_to_json(message, options)?;
    Ok(if options.pretty_printed {
        serde_json::to_string_pretty(&value).expect("a JSON value tree always serializes")
    } else {
        serde_json::to_string(&value).expect("a JSON value tree always serializes")
    })
}

pub fn message_to_json(message: &DynamicMessage, options: &JsonSerializeOptions) -> Result<Json, JsonEncodeError> {
    let descriptor = message.descriptor().clone();
    let mut object = Map::new();

    if options.include_default_values {
        for field in descriptor.fields() {
            let key = field_key(field, options);
            if let Some(value) = message.get_field_by_number(field.number()) {
                object.insert(key, field_value_to_json(field, value, options)?);
            } else if !field.is_map() && !field.is_repeated() && field.field_type() != FieldType::Message {
                let default = scalar_default(field.field_type());
                object.insert(key, scalar_to_json(field, field.field_type(), &default, options)?);
            }
        }
    } else {
        for (field, value) in message.fields() {
            let key = field_key(field, options);
            object.insert(key, field_value_to_json(field, value, options)?);
        }
    }

    Ok(Json::Object(object))
}

fn field_key(field: &FieldDescriptor, options: &JsonSerializeOptions) -> String {
    if options.use_original_field_names {
        field.name().to_string()
    } else {
        field.json_name().to_string()
    }
}

fn field_value_to_json(
    field: &FieldDescriptor,
    value: &Value,
    options: &JsonSerializeOptions,
) -> Result<Json, JsonEncodeError> {
    if field.is_map() {
        let entries = value.as_map().ok_or_else(|| JsonEncodeError::InvalidMapKeyType {
            field: field.name().to_string(),
        })?;
        let info = field
            .map_entry_info()
            .ok_or_else(|| JsonEncodeError::InvalidMapKeyType {
                field: field.name().to_string(),
            })?;
        let mut object = Map::new();
        let mut keys: Vec<(String, &Value)> = entries
            .iter()
            .map(|(k, v)| (map_key_to_json_string(k), v))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, val) in keys {
            object.insert(key, scalar_to_json(field, info.value_type, val, options)?);
        }
        return Ok(Json::Object(object));
    }

    if field.is_repeated() {
        let items = value.as_list().ok_or_else(|| JsonEncodeError::UnsupportedFieldType {
            field: field.name().to_string(),
            ty: field.field_type(),
        })?;
        let mut array = Vec::with_capacity(items.len());
        for item in items {
            array.push(scalar_to_json(field, field.field_type(), item, options)?);
        }
        return Ok(Json::Array(array));
    }

    scalar_to_json(field, field.field_type(), value, options)
}

fn scalar_to_json(
    field: &FieldDescriptor,
    ty: FieldType,
    value: &Value,
    options: &JsonSerializeOptions,
) -> Result<Json, JsonEncodeError> {
    Ok(match ty {
        FieldType::Bool => Json::Bool(value.as_bool().unwrap_or_default()),
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            Json::Number(Number::from(value.as_i32().unwrap_or_default()))
        }
        FieldType::UInt32 | FieldType::Fixed32 => Json::Number(Number::from(value.as_u32().unwrap_or_default())),
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            Json::String(value.as_i64().unwrap_or_default().to_string())
        }
        FieldType::UInt64 | FieldType::Fixed64 => Json::String(value.as_u64().unwrap_or_default().to_string()),
        FieldType::Float => float_to_json(value.as_f32().unwrap_or_default() as f64),
        FieldType::Double => float_to_json(value.as_f64().unwrap_or_default()),
        FieldType::String => Json::String(value.as_str().unwrap_or_default().to_string()),
        FieldType::Bytes => Json::String(BASE64.encode(value.as_bytes().unwrap_or_default())),
        FieldType::Enum => {
            let number = match value {
                Value::EnumNumber(n) => *n,
                _ => 0,
            };
            Json::Number(Number::from(number))
        }
        FieldType::Message => {
            let nested = value
                .as_message()
                .ok_or_else(|| JsonEncodeError::UnsupportedFieldType {
                    field: field.name().to_string(),
                    ty: FieldType::Message,
                })?;
            message_to_json(nested, options)?
        }
        FieldType::Group => {
            return Err(JsonEncodeError::UnsupportedFieldType {
                field: field.name().to_string(),
                ty: FieldType::Group,
            })
        }
    })
}

fn float_to_json(value: f64) -> Json {
    if value.is_nan() {
        Json::String("NaN".to_string())
    } else if value.is_infinite() {
        Json::String(if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else {
        Number::from_f64(value)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(value.to_string()))
    }
}

fn map_key_to_json_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}
