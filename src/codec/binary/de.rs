//! Descriptor-driven streaming decoder.
use bytes::Buf;

use crate::descriptor::registry::TypeRegistry;
use crate::descriptor::{FieldDescriptor, FieldType, MapEntryInfo, MessageDescriptor};
use crate::dynamic::{scalar_default, DynamicMessage, MapKey, Value};
use crate::error::DecodeError;
use crate::wire::{
    decode_fixed32, decode_fixed64, decode_tag, decode_varint, skip_field, zigzag_decode_32,
    zigzag_decode_64, WireType,
};

/// Options governing binary deserialization.
#[derive(Debug, Clone, Copy)]
pub struct BinaryDeserializeOptions {
    preserve_unknown_fields: bool,
    strict_utf8_validation: bool,
}

impl BinaryDeserializeOptions {
    pub const fn new() -> Self {
        BinaryDeserializeOptions {
            preserve_unknown_fields: true,
            strict_utf8_validation: true,
        }
    }

    pub const fn preserve_unknown_fields(mut self, value: bool) -> Self {
        self.preserve_unknown_fields = value;
        self
    }

    pub const fn strict_utf8_validation(mut self, value: bool) -> Self {
        self.strict_utf8_validation = value;
        self
    }
}

impl Default for BinaryDeserializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes `bytes` under `descriptor` using default options and no type registry. Nested
/// `message`-typed fields fail with [`DecodeError::UnsupportedNestedMessage`].
pub fn deserialize(bytes: &[u8], descriptor: &MessageDescriptor) -> Result<DynamicMessage, DecodeError> {
    deserialize_with_options(bytes, descriptor, &BinaryDeserializeOptions::default(), None)
}

pub fn deserialize_with_options(
    bytes: &[u8],
    descriptor: &MessageDescriptor,
    options: &BinaryDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<DynamicMessage, DecodeError> {
    let mut buf = bytes;
    decode_message_body(&mut buf, descriptor, options, registry)
}

fn decode_message_body(
    buf: &mut &[u8],
    descriptor: &MessageDescriptor,
    options: &BinaryDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<DynamicMessage, DecodeError> {
    let mut message = DynamicMessage::new(descriptor.clone());

    while buf.has_remaining() {
        let start = *buf;
        let tag = decode_varint(buf)?;
        let (field_number, wire_type) = decode_tag(tag)?;

        let field = descriptor.get_field(field_number).cloned();
        match field {
            None => {
                skip_field(buf, wire_type)?;
                if options.preserve_unknown_fields {
                    let total_consumed = start.len() - buf.len();
                    message.unknown_fields_mut().append(&start[..total_consumed]);
                }
            }
            Some(field) => {
                decode_known_field(buf, &mut message, &field, wire_type, options, registry)?;
            }
        }
    }

    Ok(message)
}

fn expected_wire_type(ty: FieldType) -> Option<WireType> {
    match ty {
        FieldType::Double | FieldType::Fixed64 | FieldType::SFixed64 => Some(WireType::Fixed64),
        FieldType::Float | FieldType::Fixed32 | FieldType::SFixed32 => Some(WireType::Fixed32),
        FieldType::Int32
        | FieldType::Int64
        | FieldType::UInt32
        | FieldType::UInt64
        | FieldType::SInt32
        | FieldType::SInt64
        | FieldType::Bool
        | FieldType::Enum => Some(WireType::Varint),
        FieldType::String | FieldType::Bytes | FieldType::Message => Some(WireType::LengthDelimited),
        FieldType::Group => None,
    }
}

fn decode_known_field(
    buf: &mut &[u8],
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    wire_type: WireType,
    options: &BinaryDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<(), DecodeError> {
    if field.field_type() == FieldType::Group {
        return Err(DecodeError::UnsupportedFieldType { ty: FieldType::Group });
    }

    if field.is_map() {
        let info = field
            .map_entry_info()
            .expect("map field always has map entry info")
            .clone();
        if wire_type != WireType::LengthDelimited {
            return Err(DecodeError::WireTypeMismatch {
                field: field.name().to_string(),
                expected: WireType::LengthDelimited.as_u32(),
                actual: wire_type.as_u32(),
            });
        }
        let len = decode_varint(buf)? as usize;
        if buf.remaining() < len {
            return Err(DecodeError::TruncatedMessage);
        }
        let mut entry_buf = &buf[..len];
        buf.advance(len);
        let (key, value) = decode_map_entry(&mut entry_buf, field, &info, options, registry)?;

        let target = message
            .get_field_mut_by_number(field.number())
            .filter(|v| matches!(v, Value::Map(_)));
        match target {
            Some(Value::Map(map)) => {
                map.insert(key, value);
            }
            _ => {
                let mut map = std::collections::HashMap::new();
                map.insert(key, value);
                message
                    .set_field_by_number(field.number(), Value::Map(map))
                    .expect("map shape always valid for a map field");
            }
        }
        return Ok(());
    }

    if field.is_repeated() {
        let expected = expected_wire_type(field.field_type());
        if wire_type == WireType::LengthDelimited && expected != Some(WireType::LengthDelimited) {
            // packed encoding of a normally varint/fixed element type
            let len = decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(DecodeError::TruncatedMessage);
            }
            let mut packed_buf = &buf[..len];
            buf.advance(len);
            let mut items = Vec::new();
            while packed_buf.has_remaining() {
                let before = packed_buf.len();
                let value = decode_scalar(&mut packed_buf, field, field.field_type(), options, registry)?;
                if packed_buf.len() >= before {
                    return Err(DecodeError::MalformedPackedField {
                        field: field.name().to_string(),
                    });
                }
                items.push(value);
            }
            append_to_list(message, field, items);
            return Ok(());
        }

        if expected != Some(wire_type) {
            return Err(DecodeError::WireTypeMismatch {
                field: field.name().to_string(),
                expected: expected.map(WireType::as_u32).unwrap_or(0),
                actual: wire_type.as_u32(),
            });
        }
        let value = decode_scalar(buf, field, field.field_type(), options, registry)?;
        append_to_list(message, field, vec![value]);
        return Ok(());
    }

    let expected = expected_wire_type(field.field_type());
    if expected != Some(wire_type) {
        return Err(DecodeError::WireTypeMismatch {
            field: field.name().to_string(),
            expected: expected.map(WireType::as_u32).unwrap_or(0),
            actual: wire_type.as_u32(),
        });
    }
    let value = decode_scalar(buf, field, field.field_type(), options, registry)?;
    message
        .set_field_by_number(field.number(), value)
        .expect("decoded value always matches the field's own descriptor");
    Ok(())
}

fn append_to_list(message: &mut DynamicMessage, field: &FieldDescriptor, mut items: Vec<Value>) {
    let target = message
        .get_field_mut_by_number(field.number())
        .filter(|v| matches!(v, Value::List(_)));
    match target {
        Some(Value::List(list)) => list.append(&mut items),
        _ => {
            message
                .set_field_by_number(field.number(), Value::List(items))
                .expect("list shape always valid for a repeated field");
        }
    }
}

fn decode_map_entry(
    buf: &mut &[u8],
    field: &FieldDescriptor,
    info: &MapEntryInfo,
    options: &BinaryDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<(MapKey, Value), DecodeError> {
    let mut key: Option<Value> = None;
    let mut value: Option<Value> = None;

    while buf.has_remaining() {
        let tag = decode_varint(buf)?;
        let (number, wire_type) = decode_tag(tag)?;
        match number {
            1 => {
                let expected = expected_wire_type(info.key_type);
                if expected != Some(wire_type) {
                    return Err(DecodeError::MalformedMapEntry {
                        field: field.name().to_string(),
                    });
                }
                key = Some(decode_scalar(buf, field, info.key_type, options, registry)?);
            }
            2 => {
                let expected = expected_wire_type(info.value_type);
                if expected != Some(wire_type) {
                    return Err(DecodeError::MalformedMapEntry {
                        field: field.name().to_string(),
                    });
                }
                value = Some(decode_scalar(buf, field, info.value_type, options, registry)?);
            }
            _ => {
                skip_field(buf, wire_type)?;
            }
        }
    }

    let key = match key {
        Some(v) => value_to_map_key(v),
        None => value_to_map_key(scalar_default(info.key_type)),
    };
    let value = match value {
        Some(v) => v,
        None => default_map_value(info, registry)?,
    };
    Ok((key, value))
}

fn default_map_value(info: &MapEntryInfo, registry: Option<&TypeRegistry>) -> Result<Value, DecodeError> {
    match info.value_type {
        FieldType::Message => {
            let type_name = info
                .value_type_name
                .as_deref()
                .ok_or(DecodeError::MissingTypeName { ty: FieldType::Message })?;
            let descriptor = registry
                .and_then(|r| r.resolve_message(type_name))
                .ok_or_else(|| DecodeError::UnsupportedNestedMessage {
                    type_name: type_name.to_string(),
                })?;
            Ok(Value::Message(DynamicMessage::new(descriptor)))
        }
        FieldType::Enum => Ok(Value::EnumNumber(0)),
        other => Ok(scalar_default(other)),
    }
}

fn value_to_map_key(value: Value) -> MapKey {
    match value {
        Value::Bool(v) => MapKey::Bool(v),
        Value::I32(v) => MapKey::I32(v),
        Value::I64(v) => MapKey::I64(v),
        Value::U32(v) => MapKey::U32(v),
        Value::U64(v) => MapKey::U64(v),
        Value::String(v) => MapKey::String(v),
        other => panic!("{} is not a valid map key shape", other.shape_name()),
    }
}

fn decode_scalar(
    buf: &mut &[u8],
    field: &FieldDescriptor,
    ty: FieldType,
    options: &BinaryDeserializeOptions,
    registry: Option<&TypeRegistry>,
) -> Result<Value, DecodeError> {
    Ok(match ty {
        FieldType::Bool => {
            let v = decode_varint(buf)?;
            Value::Bool(v != 0)
        }
        FieldType::Int32 => Value::I32(decode_varint(buf)? as i32),
        FieldType::Int64 => Value::I64(decode_varint(buf)? as i64),
        FieldType::UInt32 => Value::U32(decode_varint(buf)? as u32),
        FieldType::UInt64 => Value::U64(decode_varint(buf)?),
        FieldType::SInt32 => Value::I32(zigzag_decode_32(decode_varint(buf)? as u32)),
        FieldType::SInt64 => Value::I64(zigzag_decode_64(decode_varint(buf)?)),
        FieldType::Fixed32 => Value::U32(decode_fixed32(buf)?),
        FieldType::Fixed64 => Value::U64(decode_fixed64(buf)?),
        FieldType::SFixed32 => Value::I32(decode_fixed32(buf)? as i32),
        FieldType::SFixed64 => Value::I64(decode_fixed64(buf)? as i64),
        FieldType::Float => Value::F32(f32::from_bits(decode_fixed32(buf)?)),
        FieldType::Double => Value::F64(f64::from_bits(decode_fixed64(buf)?)),
        FieldType::Enum => Value::EnumNumber(decode_varint(buf)? as i32),
        FieldType::String => {
            let len = decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(DecodeError::TruncatedMessage);
            }
            let bytes = &buf[..len];
            let string = if options.strict_utf8_validation {
                std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidUtf8String {
                        field: field.name().to_string(),
                    })?
                    .to_string()
            } else {
                String::from_utf8_lossy(bytes).into_owned()
            };
            buf.advance(len);
            Value::String(string)
        }
        FieldType::Bytes => {
            let len = decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(DecodeError::TruncatedMessage);
            }
            let bytes = buf[..len].to_vec();
            buf.advance(len);
            Value::Bytes(bytes)
        }
        FieldType::Message => {
            let len = decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(DecodeError::TruncatedMessage);
            }
            let type_name = field
                .type_name()
                .ok_or(DecodeError::MissingTypeName { ty: FieldType::Message })?;
            let nested_descriptor = registry
                .and_then(|r| r.resolve_message(type_name))
                .ok_or_else(|| DecodeError::UnsupportedNestedMessage {
                    type_name: type_name.to_string(),
                })?;
            let mut nested_buf = &buf[..len];
            buf.advance(len);
            let nested = decode_message_body(&mut nested_buf, &nested_descriptor, options, registry)?;
            Value::Message(nested)
        }
        FieldType::Group => {
            return Err(DecodeError::UnsupportedFieldType { ty: FieldType::Group });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::binary::ser::{serialize, serialize_with_options, BinarySerializeOptions};
    use crate::descriptor::builder::{FieldDescriptorBuilder, FileDescriptorBuilder, MessageDescriptorBuilder};

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
    fn round_trip_string_and_int() {
        let descriptor = build(vec![
            FieldDescriptorBuilder::new("s", 1, FieldType::String),
            FieldDescriptorBuilder::new("i", 2, FieldType::Int32),
        ]);
        let mut message = DynamicMessage::new(descriptor.clone());
        message.set_field_by_number(1, Value::String("hello".into())).unwrap();
        message.set_field_by_number(2, Value::I32(150)).unwrap();
        let bytes = serialize(&message).unwrap();
        let decoded = deserialize(&bytes, &descriptor).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn packed_and_unpacked_equivalent() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("r", 4, FieldType::Int32).repeated()]);
        let mut message = DynamicMessage::new(descriptor.clone());
        message
            .set_field_by_number(4, Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3)]))
            .unwrap();
        let packed = serialize(&message).unwrap();
        let unpacked = serialize_with_options(&message, &BinarySerializeOptions::new().use_packed_repeated(false)).unwrap();
        assert_eq!(deserialize(&packed, &descriptor).unwrap(), deserialize(&unpacked, &descriptor).unwrap());
    }

    #[test]
    fn unknown_fields_preserved_round_trip() {
        let full = build(vec![
            FieldDescriptorBuilder::new("s", 1, FieldType::String),
            FieldDescriptorBuilder::new("i", 2, FieldType::Int32),
        ]);
        let partial = build(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);

        let mut message = DynamicMessage::new(full);
        message.set_field_by_number(1, Value::String("hi".into())).unwrap();
        message.set_field_by_number(2, Value::I32(42)).unwrap();
        let bytes = serialize(&message).unwrap();

        let decoded = deserialize(&bytes, &partial).unwrap();
        assert!(!decoded.unknown_fields().is_empty());
        let reencoded = serialize(&decoded).unwrap();
        assert_eq!(reencoded, bytes);
    }

    #[test]
    fn truncated_input_fails() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);
        let mut message = DynamicMessage::new(descriptor.clone());
        message.set_field_by_number(1, Value::String("hello".into())).unwrap();
        let bytes = serialize(&message).unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(deserialize(truncated, &descriptor).is_err());
    }

    #[test]
    fn invalid_utf8_rejected() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);
        let bytes = vec![0x0A, 0x01, 0xFF];
        assert!(matches!(
            deserialize(&bytes, &descriptor),
            Err(DecodeError::InvalidUtf8String { .. })
        ));
    }

    #[test]
    fn map_field_round_trip() {
        let descriptor = build(vec![FieldDescriptorBuilder::new("m", 7, FieldType::Message)
            .map(FieldType::String, FieldType::Int32, None)]);
        let mut message = DynamicMessage::new(descriptor.clone());
        let mut map = std::collections::HashMap::new();
        map.insert(MapKey::String("k".into()), Value::I32(42));
        message.set_field_by_number(7, Value::Map(map)).unwrap();
        let bytes = serialize(&message).unwrap();
        assert_eq!(bytes, vec![0x3A, 0x05, 0x0A, 0x01, b'k', 0x10, 0x2A]);
        let decoded = deserialize(&bytes, &descriptor).unwrap();
        assert_eq!(decoded, message);
    }
}
