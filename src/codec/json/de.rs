//! Parses the Protobuf canonical JSON mapping into a [`DynamicMessage`].
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value as Json;

use crate::descriptor::registry::TypeRegistry;
use crate::descriptor::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::dynamic::{DynamicMessage, MapKey, Value};
use crate::error::JsonDecodeError;

use super::describe_json_kind;

/// Options governing JSON deserialization.
#[derive(Debug, Clone, Copy)]
pub struct JsonDeserializeOptions {
    ignore_unknown_fields: bool,
    strict_type_validation: bool,
}

impl JsonDeserializeOptions {
    pub const fn new() -> Self {
        JsonDeserializeOptions {
            ignore_unknown_fields: true,
            strict_type_validation: true,
        }
    }

    pub const fn ignore_unknown_fields(mut self, value: bool) -> Self {
        self.ignore_unknown_fields = value;
        self
    }

    pub const fn strict_type_validation(mut self, value: bool) -> Self {
        self.strict_type_validation = value;
        self
    }
}

impl Default for JsonDeserializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `json` under `descriptor` using default options and no type registry. Nested
/// `message`-typed fields fail with [`JsonDecodeError::UnsupportedNestedMessage`].
pub fn deserialize(json: &str, descriptor: &MessageDescriptor) -> Result<DynamicMessage, JsonDecodeError> {
    deserialize_with_options(json, descriptor, &JsonDeserializeOptions::default(), None)
}

pub fn deserialize_with_options(
    json: &str,
    descriptor: &MessageDescriptor,
    options: &JsonDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<DynamicMessage, JsonDecodeError> {
    let value: Json = serde_json::from_str(json).map_err(|err| JsonDecodeError::InvalidJson {
        message: err.to_string(),
    })?;
    json_to_message(&value, descriptor, options, registry)
}

fn json_to_message(
    value: &Json,
    descriptor: &MessageDescriptor,
    options: &JsonDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<DynamicMessage, JsonDecodeError> {
    let object = match value {
        Json::Object(object) => object,
        other => {
            return Err(JsonDecodeError::InvalidJsonStructure {
                expected: "object".to_string(),
                actual: describe_json_kind(other),
            })
        }
    };

    let mut message = DynamicMessage::new(descriptor.clone());
    for (key, val) in object {
        let field = descriptor
            .get_field_by_json_name(key)
            .or_else(|| descriptor.get_field_by_name(key));
        match field {
            None => {
                if !options.ignore_unknown_fields {
                    return Err(JsonDecodeError::UnknownField {
                        field: key.clone(),
                        message: descriptor.full_name().to_string(),
                    });
                }
            }
            Some(field) => {
                let field = field.clone();
                if val.is_null() {
                    continue;
                }
                let converted = field_value_from_json(&field, val, options, registry)?;
                message
                    .set_field_by_number(field.number(), converted)
                    .expect("converted JSON value always matches the field's own descriptor");
            }
        }
    }
    Ok(message)
}

fn field_value_from_json(
    field: &FieldDescriptor,
    value: &Json,
    options: &JsonDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<Value, JsonDecodeError> {
    if field.is_map() {
        let object = match value {
            Json::Object(object) => object,
            other => {
                return Err(JsonDecodeError::InvalidJsonStructure {
                    expected: "object".to_string(),
                    actual: describe_json_kind(other),
                })
            }
        };
        let info = field
            .map_entry_info()
            .ok_or_else(|| JsonDecodeError::InvalidMapKeyType {
                field: field.name().to_string(),
            })?;
        let mut map = HashMap::with_capacity(object.len());
        for (key, val) in object {
            let map_key = convert_json_string_to_map_key(field, info.key_type, key)?;
            let map_value = scalar_from_json(field, info.value_type, val, options, registry)?;
            map.insert(map_key, map_value);
        }
        return Ok(Value::Map(map));
    }

    if field.is_repeated() {
        let array = match value {
            Json::Array(array) => array,
            other => {
                return Err(JsonDecodeError::InvalidJsonStructure {
                    expected: "array".to_string(),
                    actual: describe_json_kind(other),
                })
            }
        };
        let mut items = Vec::with_capacity(array.len());
        for (index, item) in array.iter().enumerate() {
            let converted = scalar_from_json(field, field.field_type(), item, options, registry)
                .map_err(|inner| JsonDecodeError::InvalidArrayElement {
                    field: field.name().to_string(),
                    index,
                    inner: Box::new(inner),
                })?;
            items.push(converted);
        }
        return Ok(Value::List(items));
    }

    scalar_from_json(field, field.field_type(), value, options, registry)
}

fn scalar_from_json(
    field: &FieldDescriptor,
    ty: FieldType,
    value: &Json,
    options: &JsonDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<Value, JsonDecodeError> {
    let name = field.name();
    Ok(match ty {
        FieldType::Bool => match value {
            Json::Bool(b) => Value::Bool(*b),
            other => {
                return Err(JsonDecodeError::InvalidJsonStructure {
                    expected: "boolean".to_string(),
                    actual: describe_json_kind(other),
                })
            }
        },
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            let v = parse_i64(name, value, options.strict_type_validation)?;
            if v < i32::MIN as i64 || v > i32::MAX as i64 {
                return Err(JsonDecodeError::NumberOutOfRange {
                    field: name.to_string(),
                    value: v.to_string(),
                });
            }
            Value::I32(v as i32)
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            Value::I64(parse_i64(name, value, options.strict_type_validation)?)
        }
        FieldType::UInt32 | FieldType::Fixed32 => {
            let v = parse_u64(name, value, options.strict_type_validation)?;
            if v > u32::MAX as u64 {
                return Err(JsonDecodeError::NumberOutOfRange {
                    field: name.to_string(),
                    value: v.to_string(),
                });
            }
            Value::U32(v as u32)
        }
        FieldType::UInt64 | FieldType::Fixed64 => {
            Value::U64(parse_u64(name, value, options.strict_type_validation)?)
        }
        FieldType::Float => Value::F32(parse_double(name, value)? as f32),
        FieldType::Double => Value::F64(parse_double(name, value)?),
        FieldType::String => match value {
            Json::String(s) => Value::String(s.clone()),
            other => {
                return Err(JsonDecodeError::InvalidJsonStructure {
                    expected: "string".to_string(),
                    actual: describe_json_kind(other),
                })
            }
        },
        FieldType::Bytes => match value {
            Json::String(s) => {
                let bytes = BASE64.decode(s.as_bytes()).map_err(|_| JsonDecodeError::InvalidBase64 {
                    field: name.to_string(),
                    value: s.clone(),
                })?;
                Value::Bytes(bytes)
            }
            other => {
                return Err(JsonDecodeError::InvalidJsonStructure {
                    expected: "base64 string".to_string(),
                    actual: describe_json_kind(other),
                })
            }
        },
        FieldType::Enum => match value {
            Json::Number(n) => Value::EnumNumber(n.as_i64().unwrap_or_default() as i32),
            Json::String(s) => {
                if let Ok(number) = s.parse::<i32>() {
                    Value::EnumNumber(number)
                } else if let Some(number) = field
                    .type_name()
                    .and_then(|type_name| registry.and_then(|r| r.resolve_enum(type_name)))
                    .and_then(|enum_desc| enum_desc.value_by_name(s))
                {
                    Value::EnumNumber(number)
                } else {
                    return Err(JsonDecodeError::InvalidEnumValue {
                        field: name.to_string(),
                        value: s.clone(),
                    });
                }
            }
            other => {
                return Err(JsonDecodeError::InvalidJsonStructure {
                    expected: "number or string".to_string(),
                    actual: describe_json_kind(other),
                })
            }
        },
        FieldType::Message => {
            let type_name = field
                .type_name()
                .ok_or_else(|| JsonDecodeError::UnsupportedNestedMessage {
                    type_name: String::new(),
                })?;
            let nested_descriptor = registry
                .and_then(|r| r.resolve_message(type_name))
                .ok_or_else(|| JsonDecodeError::UnsupportedNestedMessage {
                    type_name: type_name.to_string(),
                })?;
            let nested = json_to_message(value, &nested_descriptor, options, registry)?;
            Value::Message(nested)
        }
        FieldType::Group => {
            return Err(JsonDecodeError::InvalidJsonStructure {
                expected: "unsupported".to_string(),
                actual: describe_json_kind(value),
            })
        }
    })
}

fn parse_i64(field: &str, value: &Json, strict: bool) -> Result<i64, JsonDecodeError> {
    match value {
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            if let Some(f) = n.as_f64() {
                if f.fract() != 0.0 && strict {
                    return Err(JsonDecodeError::InvalidNumberFormat {
                        field: field.to_string(),
                        value: n.to_string(),
                    });
                }
                return Ok(f as i64);
            }
            Err(JsonDecodeError::InvalidNumberFormat {
                field: field.to_string(),
                value: n.to_string(),
            })
        }
        Json::String(s) => s.parse::<i64>().map_err(|_| JsonDecodeError::InvalidNumberFormat {
            field: field.to_string(),
            value: s.clone(),
        }),
        other => Err(JsonDecodeError::InvalidJsonStructure {
            expected: "number or numeric string".to_string(),
            actual: describe_json_kind(other),
        }),
    }
}

fn parse_u64(field: &str, value: &Json, strict: bool) -> Result<u64, JsonDecodeError> {
    match value {
        Json::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            if let Some(f) = n.as_f64() {
                if f.fract() != 0.0 && strict {
                    return Err(JsonDecodeError::InvalidNumberFormat {
                        field: field.to_string(),
                        value: n.to_string(),
                    });
                }
                if f < 0.0 {
                    return Err(JsonDecodeError::NumberOutOfRange {
                        field: field.to_string(),
                        value: n.to_string(),
                    });
                }
                return Ok(f as u64);
            }
            Err(JsonDecodeError::InvalidNumberFormat {
                field: field.to_string(),
                value: n.to_string(),
            })
        }
        Json::String(s) => s.parse::<u64>().map_err(|_| JsonDecodeError::InvalidNumberFormat {
            field: field.to_string(),
            value: s.clone(),
        }),
        other => Err(JsonDecodeError::InvalidJsonStructure {
            expected: "number or numeric string".to_string(),
            actual: describe_json_kind(other),
        }),
    }
}

fn parse_double(field: &str, value: &Json) -> Result<f64, JsonDecodeError> {
    match value {
        Json::Number(n) => n.as_f64().ok_or_else(|| JsonDecodeError::InvalidNumberFormat {
            field: field.to_string(),
            value: n.to_string(),
        }),
        Json::String(s) => match s.as_str() {
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            other => other.parse::<f64>().map_err(|_| JsonDecodeError::InvalidNumberFormat {
                field: field.to_string(),
                value: s.clone(),
            }),
        },
        other => Err(JsonDecodeError::InvalidJsonStructure {
            expected: "number or numeric string".to_string(),
            actual: describe_json_kind(other),
        }),
    }
}

fn convert_json_string_to_map_key(
    field: &FieldDescriptor,
    key_type: FieldType,
    key: &str,
) -> Result<MapKey, JsonDecodeError> {
    match key_type {
        FieldType::String => Ok(MapKey::String(key.to_string())),
        FieldType::Bool => match key {
            "true" => Ok(MapKey::Bool(true)),
            "false" => Ok(MapKey::Bool(false)),
            _ => Err(JsonDecodeError::InvalidMapKeyFormat {
                field: field.name().to_string(),
                value: key.to_string(),
            }),
        },
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => key
            .parse::<i32>()
            .map(MapKey::I32)
            .map_err(|_| JsonDecodeError::InvalidMapKeyFormat {
                field: field.name().to_string(),
                value: key.to_string(),
            }),
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => key
            .parse::<i64>()
            .map(MapKey::I64)
            .map_err(|_| JsonDecodeError::InvalidMapKeyFormat {
                field: field.name().to_string(),
                value: key.to_string(),
            }),
        FieldType::UInt32 | FieldType::Fixed32 => key
            .parse::<u32>()
            .map(MapKey::U32)
            .map_err(|_| JsonDecodeError::InvalidMapKeyFormat {
                field: field.name().to_string(),
                value: key.to_string(),
            }),
        FieldType::UInt64 | FieldType::Fixed64 => key
            .parse::<u64>()
            .map(MapKey::U64)
            .map_err(|_| JsonDecodeError::InvalidMapKeyFormat {
                field: field.name().to_string(),
                value: key.to_string(),
            }),
        _ => Err(JsonDecodeError::InvalidMapKeyType {
            field: field.name().to_string(),
        }),
    }
}
