//! The Protobuf canonical JSON mapping.
pub mod de;
pub mod ser;

pub use de::{deserialize, deserialize_with_options, JsonDeserializeOptions};
pub use ser::{serialize, serialize_with_options, JsonSerializeOptions};

pub(crate) fn describe_json_kind(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(_) => "boolean".to_string(),
        serde_json::Value::Number(_) => "number".to_string(),
        serde_json::Value::String(_) => "string".to_string(),
        serde_json::Value::Array(_) => "array".to_string(),
        serde_json::Value::Object(_) => "object".to_string(),
    }
}
