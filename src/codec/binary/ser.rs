//! Descriptor-driven encoder: a single forward pass over a [`DynamicMessage`]'s present
//! fields in ascending field-number order, with no suspension point to carry state across.
use crate::descriptor::{FieldDescriptor, FieldType, MapEntryInfo};
use crate::dynamic::{DynamicMessage, MapKey, Value};
use crate::error::EncodeError;
use crate::wire::{encode_fixed32, encode_fixed64, encode_key, encode_varint, zigzag_encode_32, zigzag_encode_64, WireType};

/// Options governing binary serialization.
#[derive(Debug, Clone, Copy)]
pub struct BinarySerializeOptions {
    use_packed_repeated: bool,
}

impl BinarySerializeOptions {
    pub const fn new() -> Self {
        BinarySerializeOptions {
            use_packed_repeated: true,
        }
    }

    pub const fn use_packed_repeated(mut self, value: bool) -> Self {
        self.use_packed_repeated = value;
        self
    }
}

impl Default for BinarySerializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes `message` to the binary wire format using default options.
pub fn serialize(message: &DynamicMessage) -> Result<Vec<u8>, EncodeError> {
    serialize_with_options(message, &BinarySerializeOptions::default())
}

pub fn serialize_with_options(
    message: &DynamicMessage,
    options: &BinarySerializeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_message_body(&mut buf, message, options)?;
    Ok(buf)
}

fn encode_message_body(
    buf: &mut Vec<u8>,
    message: &DynamicMessage,
    options: &BinarySerializeOptions,
) -> Result<(), EncodeError> {
    for (field, value) in message.fields() {
        encode_field(buf, field, value, options)?;
    }
    buf.extend_from_slice(message.unknown_fields().as_bytes());
    Ok(())
}

fn wire_type_for(field: &FieldDescriptor, ty: FieldType) -> Result<WireType, EncodeError> {
    match ty {
        FieldType::Double | FieldType::Fixed64 | FieldType::SFixed64 => Ok(WireType::Fixed64),
        FieldType::Float | FieldType::Fixed32 | FieldType::SFixed32 => Ok(WireType::Fixed32),
        FieldType::Int32
        | FieldType::Int64
        | FieldType::UInt32
        | FieldType::UInt64
        | FieldType::SInt32
        | FieldType::SInt64
        | FieldType::Bool
        | FieldType::Enum => Ok(WireType::Varint),
        FieldType::String | FieldType::Bytes | FieldType::Message => Ok(WireType::LengthDelimited),
        FieldType::Group => Err(EncodeError::UnsupportedFieldType {
            field: field.name().to_string(),
            ty: FieldType::Group,
        }),
    }
}

fn mismatch(field: &FieldDescriptor, expected: &str, actual: &Value) -> EncodeError {
    EncodeError::ValueTypeMismatch {
        field: field.name().to_string(),
        expected: expected.to_string(),
        actual: actual.shape_name().to_string(),
    }
}

fn encode_field(
    buf: &mut Vec<u8>,
    field: &FieldDescriptor,
    value: &Value,
    options: &BinarySerializeOptions,
) -> Result<(), EncodeError> {
    if field.field_type() == FieldType::Group {
        return Err(EncodeError::UnsupportedFieldType {
            field: field.name().to_string(),
            ty: FieldType::Group,
        });
    }

    if field.is_map() {
        let entries = value.as_map().ok_or_else(|| mismatch(field, "map", value))?;
        let info = field
            .map_entry_info()
            .ok_or_else(|| EncodeError::MissingMapEntryInfo {
                field: field.name().to_string(),
            })?;
        let mut ordered: Vec<(Vec<u8>, &MapKey, &Value)> = Vec::with_capacity(entries.len());
        for (key, val) in entries {
            let mut key_bytes = Vec::new();
            encode_map_key_sort_bytes(&mut key_bytes, key);
            ordered.push((key_bytes, key, val));
        }
        ordered.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, key, val) in ordered {
            encode_key(buf, field.number(), WireType::LengthDelimited);
            encode_map_entry(buf, field, key, val, info, options)?;
        }
        return Ok(());
    }

    if field.is_repeated() {
        let items = value.as_list().ok_or_else(|| mismatch(field, "list", value))?;
        if options.use_packed_repeated && field.is_packable() {
            let mut payload = Vec::new();
            for item in items {
                encode_scalar_body(&mut payload, field, field.field_type(), item, options)?;
            }
            encode_key(buf, field.number(), WireType::LengthDelimited);
            encode_varint(buf, payload.len() as u64);
            buf.extend_from_slice(&payload);
        } else {
            let wt = wire_type_for(field, field.field_type())?;
            for item in items {
                encode_key(buf, field.number(), wt);
                encode_scalar_body(buf, field, field.field_type(), item, options)?;
            }
        }
        return Ok(());
    }

    let wt = wire_type_for(field, field.field_type())?;
    encode_key(buf, field.number(), wt);
    encode_scalar_body(buf, field, field.field_type(), value, options)
}

fn encode_map_entry(
    buf: &mut Vec<u8>,
    field: &FieldDescriptor,
    key: &MapKey,
    value: &Value,
    info: &MapEntryInfo,
    options: &BinarySerializeOptions,
) -> Result<(), EncodeError> {
    let mut entry_buf = Vec::new();
    let key_value = map_key_to_value(key);
    let key_wt = wire_type_for(field, info.key_type)?;
    encode_key(&mut entry_buf, 1, key_wt);
    encode_scalar_body(&mut entry_buf, field, info.key_type, &key_value, options)?;
    let value_wt = wire_type_for(field, info.value_type)?;
    encode_key(&mut entry_buf, 2, value_wt);
    encode_scalar_body(&mut entry_buf, field, info.value_type, value, options)?;

    encode_varint(buf, entry_buf.len() as u64);
    buf.extend_from_slice(&entry_buf);
    Ok(())
}

fn map_key_to_value(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(v) => Value::Bool(*v),
        MapKey::I32(v) => Value::I32(*v),
        MapKey::I64(v) => Value::I64(*v),
        MapKey::U32(v) => Value::U32(*v),
        MapKey::U64(v) => Value::U64(*v),
        MapKey::String(v) => Value::String(v.clone()),
    }
}

fn encode_map_key_sort_bytes(buf: &mut Vec<u8>, key: &MapKey) {
    match key {
        MapKey::Bool(v) => buf.push(*v as u8),
        MapKey::I32(v) => buf.extend_from_slice(&v.to_be_bytes()),
        MapKey::I64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        MapKey::U32(v) => buf.extend_from_slice(&v.to_be_bytes()),
        MapKey::U64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        MapKey::String(v) => buf.extend_from_slice(v.as_bytes()),
    }
}

fn encode_scalar_body(
    buf: &mut Vec<u8>,
    field: &FieldDescriptor,
    ty: FieldType,
    value: &Value,
    options: &BinarySerializeOptions,
) -> Result<(), EncodeError> {
    match ty {
        FieldType::Bool => {
            let v = value.as_bool().ok_or_else(|| mismatch(field, "bool", value))?;
            buf.push(v as u8);
        }
        FieldType::Int32 => {
            let v = value.as_i32().ok_or_else(|| mismatch(field, "i32", value))?;
            encode_varint(buf, v as i64 as u64);
        }
        FieldType::Int64 => {
            let v = value.as_i64().ok_or_else(|| mismatch(field, "i64", value))?;
            encode_varint(buf, v as u64);
        }
        FieldType::UInt32 => {
            let v = value.as_u32().ok_or_else(|| mismatch(field, "u32", value))?;
            encode_varint(buf, v as u64);
        }
        FieldType::UInt64 => {
            let v = value.as_u64().ok_or_else(|| mismatch(field, "u64", value))?;
            encode_varint(buf, v);
        }
        FieldType::SInt32 => {
            let v = value.as_i32().ok_or_else(|| mismatch(field, "i32", value))?;
            encode_varint(buf, zigzag_encode_32(v) as u64);
        }
        FieldType::SInt64 => {
            let v = value.as_i64().ok_or_else(|| mismatch(field, "i64", value))?;
            encode_varint(buf, zigzag_encode_64(v));
        }
        FieldType::Fixed32 => {
            let v = value.as_u32().ok_or_else(|| mismatch(field, "u32", value))?;
            encode_fixed32(buf, v);
        }
        FieldType::Fixed64 => {
            let v = value.as_u64().ok_or_else(|| mismatch(field, "u64", value))?;
            encode_fixed64(buf, v);
        }
        FieldType::SFixed32 => {
            let v = value.as_i32().ok_or_else(|| mismatch(field, "i32", value))?;
            encode_fixed32(buf, v as u32);
        }
        FieldType::SFixed64 => {
            let v = value.as_i64().ok_or_else(|| mismatch(field, "i64", value))?;
            encode_fixed64(buf, v as u64);
        }
        FieldType::Float => {
            let v = value.as_f32().ok_or_else(|| mismatch(field, "f32", value))?;
            encode_fixed32(buf, v.to_bits());
        }
        FieldType::Double => {
            let v = value.as_f64().ok_or_else(|| mismatch(field, "f64", value))?;
            encode_fixed64(buf, v.to_bits());
        }
        FieldType::Enum => {
            let v = match value {
                Value::EnumNumber(n) => *n,
                _ => return Err(mismatch(field, "enum", value)),
            };
            encode_varint(buf, v as i64 as u64);
        }
        FieldType::String => {
            let v = value.as_str().ok_or_else(|| mismatch(field, "string", value))?;
            encode_varint(buf, v.len() as u64);
            buf.extend_from_slice(v.as_bytes());
        }
        FieldType::Bytes => {
            let v = value.as_bytes().ok_or_else(|| mismatch(field, "bytes", value))?;
            encode_varint(buf, v.len() as u64);
            buf.extend_from_slice(v);
        }
        FieldType::Message => {
            let nested = value.as_message().ok_or_else(|| mismatch(field, "message", value))?;
            let mut nested_buf = Vec::new();
            encode_message_body(&mut nested_buf, nested, options)?;
            encode_varint(buf, nested_buf.len() as u64);
            buf.extend_from_slice(&nested_buf);
        }
        FieldType::Group => {
            return Err(EncodeError::UnsupportedFieldType {
                field: field.name().to_string(),
                ty: FieldType::Group,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::{FieldDescriptorBuilder, FileDescriptorBuilder, MessageDescriptorBuilder};
    use crate::descriptor::MessageDescriptor;

    fn build(fields: Vec<FieldDescriptorBuilder>) -> MessageDescriptor {
        let mut builder = MessageDescriptorBuilder::new("M");
        for field in fields {
            builder = builder.field(field);
        }
        FileDescriptorBuilder::new("test.proto", "pkg")
            .message(builder)
            .build()
            .unwrap()
            .messages()
            .next()
            .unwrap()
            .clone()
    }

    #[test]
    fn s1_string_field() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);
        let mut message = DynamicMessage::new(descriptor);
        message.set_field_by_number(1, Value::String("hello".into())).unwrap();
        let bytes = serialize(&message).unwrap();
        assert_eq!(bytes, vec![0x0A, 0x05, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn s2_int32_field() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("i", 1, FieldType::Int32)]);
        let mut message = DynamicMessage::new(descriptor);
        message.set_field_by_number(1, Value::I32(150)).unwrap();
        let bytes = serialize(&message).unwrap();
        assert_eq!(bytes, vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn s3_packed_repeated_int32() {
        let descriptor = build(vec![
            FieldDescriptorBuilder::new("r", 4, FieldType::Int32).repeated(),
        ]);
        let mut message = DynamicMessage::new(descriptor);
        message
            .set_field_by_number(4, Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3)]))
            .unwrap();
        let bytes = serialize(&message).unwrap();
        assert_eq!(bytes, vec![0x22, 0x03, 0x01, 0x02, 0x03]);

        let unpacked_opts = BinarySerializeOptions::new().use_packed_repeated(false);
        let bytes = serialize_with_options(&message, &unpacked_opts).unwrap();
        assert_eq!(bytes, vec![0x20, 0x01, 0x20, 0x02, 0x20, 0x03]);
    }

    #[test]
    fn s4_map_field() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("m", 7, FieldType::Message)
            .map(FieldType::String, FieldType::Int32, None)]);
        let mut message = DynamicMessage::new(descriptor);
        let mut map = std::collections::HashMap::new();
        map.insert(MapKey::String("k".into()), Value::I32(42));
        message.set_field_by_number(7, Value::Map(map)).unwrap();
        let bytes = serialize(&message).unwrap();
        assert_eq!(
            bytes,
            vec![0x3A, 0x05, 0x0A, 0x01, b'k', 0x10, 0x2A]
        );
    }

    #[test]
    fn deterministic_across_runs() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);
        let mut message = DynamicMessage::new(descriptor);
        message.set_field_by_number(1, Value::String("x".into())).unwrap();
        assert_eq!(serialize(&message).unwrap(), serialize(&message).unwrap());
    }
}
