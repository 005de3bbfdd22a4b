//! Runtime message values: a closed set of shapes ([`Value`]) stored against a
//! [`crate::descriptor::MessageDescriptor`], with no code generation involved.
pub mod fields;
pub mod unknown;

use std::collections::HashMap;

use crate::descriptor::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::error::SetFieldError;

use fields::FieldStorage;
use unknown::UnknownFieldSet;

/// A map key: the closed set of scalar shapes Protobuf allows as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl MapKey {
    /// A short name for the shape, used in error messages.
    pub fn shape_name(&self) -> &'static str {
        match self {
            MapKey::Bool(_) => "bool",
            MapKey::I32(_) => "i32",
            MapKey::I64(_) => "i64",
            MapKey::U32(_) => "u32",
            MapKey::U64(_) => "u64",
            MapKey::String(_) => "string",
        }
    }

    fn matches_type(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (MapKey::Bool(_), FieldType::Bool)
                | (MapKey::I32(_), FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32)
                | (MapKey::I64(_), FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64)
                | (MapKey::U32(_), FieldType::UInt32 | FieldType::Fixed32)
                | (MapKey::U64(_), FieldType::UInt64 | FieldType::Fixed64)
                | (MapKey::String(_), FieldType::String)
        )
    }
}

/// A runtime field value. The shape is closed: every variant corresponds to exactly one
/// semantic category from the descriptor model (scalar, message, repeated, map).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    EnumNumber(i32),
    Message(DynamicMessage),
    List(Vec<Value>),
    Map(HashMap<MapKey, Value>),
}

impl Value {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut DynamicMessage> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<MapKey, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut HashMap<MapKey, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this value is a legal value for `field` to hold: scalar variant matches the
    /// field's type, list elements all match for repeated fields, and map keys/values match
    /// for map fields.
    pub fn is_valid_for_field(&self, field: &FieldDescriptor) -> bool {
        if field.is_map() {
            let Value::Map(entries) = self else {
                return false;
            };
            let Some(info) = field.map_entry_info() else {
                return false;
            };
            return entries
                .iter()
                .all(|(k, v)| k.matches_type(info.key_type) && scalar_matches(v, info.value_type));
        }
        if field.is_repeated() {
            let Value::List(items) = self else {
                return false;
            };
            return items.iter().all(|item| scalar_matches(item, field.field_type()));
        }
        scalar_matches(self, field.field_type())
    }
}

fn scalar_matches(value: &Value, ty: FieldType) -> bool {
    matches!(
        (value, ty),
        (Value::Bool(_), FieldType::Bool)
            | (Value::I32(_), FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32)
            | (Value::I64(_), FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64)
            | (Value::U32(_), FieldType::UInt32 | FieldType::Fixed32)
            | (Value::U64(_), FieldType::UInt64 | FieldType::Fixed64)
            | (Value::F32(_), FieldType::Float)
            | (Value::F64(_), FieldType::Double)
            | (Value::String(_), FieldType::String)
            | (Value::Bytes(_), FieldType::Bytes)
            | (Value::Message(_), FieldType::Message)
            | (Value::EnumNumber(_), FieldType::Enum)
    )
}

/// The zero value for a scalar field type. Panics if given `Message` or `Group`, which have
/// no context-free default — callers construct those through [`MessageFactory`].
pub fn scalar_default(ty: FieldType) -> Value {
    match ty {
        FieldType::Bool => Value::Bool(false),
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => Value::I32(0),
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => Value::I64(0),
        FieldType::UInt32 | FieldType::Fixed32 => Value::U32(0),
        FieldType::UInt64 | FieldType::Fixed64 => Value::U64(0),
        FieldType::Float => Value::F32(0.0),
        FieldType::Double => Value::F64(0.0),
        FieldType::String => Value::String(String::new()),
        FieldType::Bytes => Value::Bytes(Vec::new()),
        FieldType::Enum => Value::EnumNumber(0),
        FieldType::Message | FieldType::Group => {
            panic!("{} has no context-free default value", ty)
        }
    }
}

/// A message instance whose schema is known only through its [`MessageDescriptor`].
#[derive(Debug, Clone)]
pub struct DynamicMessage {
    descriptor: MessageDescriptor,
    storage: FieldStorage,
    unknown_fields: UnknownFieldSet,
}

impl PartialEq for DynamicMessage {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.full_name() == other.descriptor.full_name()
            && self.storage == other.storage
            && self.unknown_fields == other.unknown_fields
    }
}

impl DynamicMessage {
    /// Creates a zero-initialized message: every field absent, no unknown fields.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        DynamicMessage {
            descriptor,
            storage: FieldStorage::default(),
            unknown_fields: UnknownFieldSet::new(),
        }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub fn has_field_by_number(&self, number: u32) -> bool {
        self.storage.has(number)
    }

    pub fn has_field_by_name(&self, name: &str) -> bool {
        match self.descriptor.get_field_by_name(name) {
            Some(field) => self.storage.has(field.number()),
            None => false,
        }
    }

    pub fn get_field_by_number(&self, number: u32) -> Option<&Value> {
        self.storage.get(number)
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<&Value> {
        let field = self.descriptor.get_field_by_name(name)?;
        self.storage.get(field.number())
    }

    pub fn get_field_mut_by_number(&mut self, number: u32) -> Option<&mut Value> {
        self.storage.get_mut(number)
    }

    pub fn set_field_by_number(&mut self, number: u32, value: Value) -> Result<(), SetFieldError> {
        let field = self
            .descriptor
            .get_field(number)
            .cloned()
            .ok_or(SetFieldError::NotFound)?;
        self.set_field_inner(&field, value)
    }

    pub fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), SetFieldError> {
        let field = self
            .descriptor
            .get_field_by_name(name)
            .cloned()
            .ok_or(SetFieldError::NotFound)?;
        self.set_field_inner(&field, value)
    }

    fn set_field_inner(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), SetFieldError> {
        if !value.is_valid_for_field(field) {
            return Err(SetFieldError::InvalidType {
                expected: describe_field_shape(field),
                actual: value.shape_name().to_string(),
            });
        }
        if let Some(oneof) = field.containing_oneof() {
            for &sibling in oneof.field_numbers() {
                if sibling != field.number() {
                    self.storage.clear(sibling);
                }
            }
        }
        self.storage.set(field.number(), value);
        Ok(())
    }

    pub fn clear_field_by_number(&mut self, number: u32) {
        self.storage.clear(number);
    }

    pub fn clear_field_by_name(&mut self, name: &str) {
        if let Some(field) = self.descriptor.get_field_by_name(name) {
            self.storage.clear(field.number());
        }
    }

    /// Present fields only, in ascending field-number order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.storage.iter().map(move |(number, value)| {
            (
                self.descriptor
                    .get_field(number)
                    .expect("stored field number always has a descriptor"),
                value,
            )
        })
    }

    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown_fields
    }

    pub(crate) fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
        &mut self.unknown_fields
    }

    /// A borrowed, named accessor bundling a field descriptor with this message.
    pub fn field_accessor(&mut self, name: &str) -> Option<FieldAccessor<'_>> {
        let field = self.descriptor.get_field_by_name(name)?.clone();
        Some(FieldAccessor { message: self, field })
    }
}

fn describe_field_shape(field: &FieldDescriptor) -> String {
    if field.is_map() {
        let info = field.map_entry_info().expect("map field always has map entry info");
        format!("map<{:?}, {:?}>", info.key_type, info.value_type)
    } else if field.is_repeated() {
        format!("repeated {}", field.field_type())
    } else {
        field.field_type().to_string()
    }
}

/// Bundles a resolved [`FieldDescriptor`] with the message that owns it, so repeated
/// accesses to the same field don't need to re-resolve it by name or number.
#[derive(Debug)]
pub struct FieldAccessor<'a> {
    message: &'a mut DynamicMessage,
    field: FieldDescriptor,
}

impl<'a> FieldAccessor<'a> {
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn has(&self) -> bool {
        self.message.has_field_by_number(self.field.number())
    }

    pub fn get(&self) -> Option<&Value> {
        self.message.get_field_by_number(self.field.number())
    }

    pub fn set(&mut self, value: Value) -> Result<(), SetFieldError> {
        self.message.set_field_inner(&self.field.clone(), value)
    }

    pub fn clear(&mut self) {
        self.message.clear_field_by_number(self.field.number());
    }
}

/// Creates zero-initialized [`DynamicMessage`]s, optionally with a [`crate::descriptor::registry::TypeRegistry`]
/// on hand so callers have one place to thread registry access to the codecs.
#[derive(Debug, Clone, Default)]
pub struct MessageFactory {
    registry: Option<crate::descriptor::registry::TypeRegistry>,
}

impl MessageFactory {
    pub fn new() -> Self {
        MessageFactory::default()
    }

    pub fn with_registry(registry: crate::descriptor::registry::TypeRegistry) -> Self {
        MessageFactory {
            registry: Some(registry),
        }
    }

    pub fn registry(&self) -> Option<&crate::descriptor::registry::TypeRegistry> {
        self.registry.as_ref()
    }

    pub fn create(&self, descriptor: &MessageDescriptor) -> DynamicMessage {
        DynamicMessage::new(descriptor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::{FieldDescriptorBuilder, FileDescriptorBuilder, MessageDescriptorBuilder};

    fn person_descriptor() -> MessageDescriptor {
        FileDescriptorBuilder::new("test.proto", "pkg")
            .message(
                MessageDescriptorBuilder::new("Person")
                    .field(FieldDescriptorBuilder::new("name", 1, FieldType::String))
                    .field(FieldDescriptorBuilder::new("age", 2, FieldType::Int32)),
            )
            .build()
            .unwrap()
            .messages()
            .next()
            .unwrap()
            .clone()
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut message = DynamicMessage::new(person_descriptor());
        assert!(!message.has_field_by_name("name"));
        message
            .set_field_by_name("name", Value::String("ada".into()))
            .unwrap();
        assert!(message.has_field_by_name("name"));
        assert_eq!(message.get_field_by_name("name").unwrap().as_str(), Some("ada"));
        message.clear_field_by_name("name");
        assert!(!message.has_field_by_name("name"));
    }

    #[test]
    fn set_rejects_wrong_shape() {
        let mut message = DynamicMessage::new(person_descriptor());
        let err = message
            .set_field_by_name("age", Value::String("nope".into()))
            .unwrap_err();
        assert!(matches!(err, SetFieldError::InvalidType { .. }));
    }

    #[test]
    fn set_rejects_unknown_field() {
        let mut message = DynamicMessage::new(person_descriptor());
        let err = message
            .set_field_by_name("nonexistent", Value::Bool(true))
            .unwrap_err();
        assert_eq!(err, SetFieldError::NotFound);
    }

    #[test]
    fn oneof_siblings_are_cleared() {
        let descriptor = FileDescriptorBuilder::new("test.proto", "pkg")
            .message(
                MessageDescriptorBuilder::new("Choice")
                    .oneof("kind")
                    .field(FieldDescriptorBuilder::new("a", 1, FieldType::Int32).oneof_index(0))
                    .field(FieldDescriptorBuilder::new("b", 2, FieldType::String).oneof_index(0)),
            )
            .build()
            .unwrap()
            .messages()
            .next()
            .unwrap()
            .clone();
        let mut message = DynamicMessage::new(descriptor);
        message.set_field_by_name("a", Value::I32(1)).unwrap();
        assert!(message.has_field_by_name("a"));
        message.set_field_by_name("b", Value::String("x".into())).unwrap();
        assert!(!message.has_field_by_name("a"));
        assert!(message.has_field_by_name("b"));
    }
}
