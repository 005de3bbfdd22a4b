//! The immutable descriptor graph: files, messages, fields, enums and services.
//!
//! Descriptors are constructed through the builder API in [`builder`] rather than parsed
//! from `.proto` source or a compiled `FileDescriptorProto` — there is no such front end
//! in this crate.
pub mod builder;
pub mod registry;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use crate::error::FieldType;

/// Metadata describing how a map field is encoded: its synthetic entry message has
/// field 1 = key, field 2 = value.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntryInfo {
    pub key_type: FieldType,
    pub value_type: FieldType,
    pub value_type_name: Option<String>,
}

#[derive(Debug)]
pub(crate) struct OneofDescriptorInner {
    pub(crate) name: String,
    pub(crate) field_numbers: Vec<u32>,
}

/// A oneof group: at most one of its member fields may hold a value at a time.
#[derive(Debug, Clone)]
pub struct OneofDescriptor(pub(crate) Arc<OneofDescriptorInner>);

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn field_numbers(&self) -> &[u32] {
        &self.0.field_numbers
    }
}

#[derive(Debug)]
pub(crate) struct FieldDescriptorInner {
    pub(crate) name: String,
    pub(crate) json_name: String,
    pub(crate) number: u32,
    pub(crate) field_type: FieldType,
    pub(crate) type_name: Option<String>,
    pub(crate) is_repeated: bool,
    pub(crate) is_map: bool,
    pub(crate) oneof: Option<OneofDescriptor>,
    pub(crate) map_entry: Option<MapEntryInfo>,
}

/// Describes a single field of a [`MessageDescriptor`].
#[derive(Debug, Clone)]
pub struct FieldDescriptor(pub(crate) Arc<FieldDescriptorInner>);

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn json_name(&self) -> &str {
        &self.0.json_name
    }

    pub fn number(&self) -> u32 {
        self.0.number
    }

    pub fn field_type(&self) -> FieldType {
        self.0.field_type
    }

    pub fn type_name(&self) -> Option<&str> {
        self.0.type_name.as_deref()
    }

    pub fn is_repeated(&self) -> bool {
        self.0.is_repeated
    }

    pub fn is_map(&self) -> bool {
        self.0.is_map
    }

    pub fn containing_oneof(&self) -> Option<&OneofDescriptor> {
        self.0.oneof.as_ref()
    }

    pub fn map_entry_info(&self) -> Option<&MapEntryInfo> {
        self.0.map_entry.as_ref()
    }

    /// Whether this field, if repeated, is eligible for the packed encoding: every
    /// scalar/enum type whose wire type is varint, fixed32 or fixed64.
    pub fn is_packable(&self) -> bool {
        self.is_repeated()
            && !self.is_map()
            && matches!(
                self.field_type(),
                FieldType::Double
                    | FieldType::Float
                    | FieldType::Int32
                    | FieldType::Int64
                    | FieldType::UInt32
                    | FieldType::UInt64
                    | FieldType::SInt32
                    | FieldType::SInt64
                    | FieldType::Fixed32
                    | FieldType::Fixed64
                    | FieldType::SFixed32
                    | FieldType::SFixed64
                    | FieldType::Bool
                    | FieldType::Enum
            )
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self.number() == other.number()
            && self.field_type() == other.field_type()
            && self.type_name() == other.type_name()
            && self.is_repeated() == other.is_repeated()
            && self.is_map() == other.is_map()
            && self.map_entry_info() == other.map_entry_info()
    }
}

#[derive(Debug)]
pub(crate) struct MessageDescriptorInner {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) fields: BTreeMap<u32, FieldDescriptor>,
    pub(crate) fields_by_name: std::collections::HashMap<String, u32>,
    pub(crate) oneofs: Vec<OneofDescriptor>,
}

/// Describes a protobuf message type: its fields, in ascending field-number order.
#[derive(Debug, Clone)]
pub struct MessageDescriptor(pub(crate) Arc<MessageDescriptorInner>);

impl MessageDescriptor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.0.fields.values()
    }

    pub fn field_count(&self) -> usize {
        self.0.fields.len()
    }

    pub fn get_field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.0.fields.get(&number)
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.0
            .fields_by_name
            .get(name)
            .and_then(|number| self.0.fields.get(number))
    }

    pub fn get_field_by_json_name(&self, json_name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.json_name() == json_name)
    }

    pub fn oneofs(&self) -> impl Iterator<Item = &OneofDescriptor> {
        self.0.oneofs.iter()
    }
}

impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        if self.full_name() != other.full_name() || self.field_count() != other.field_count() {
            return false;
        }
        self.fields().eq(other.fields())
    }
}

#[derive(Debug)]
pub(crate) struct EnumDescriptorInner {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) values: Vec<(String, i32)>,
}

/// Describes a protobuf enum type. Declaration order is preserved; numbers may repeat (aliases).
#[derive(Debug, Clone)]
pub struct EnumDescriptor(pub(crate) Arc<EnumDescriptorInner>);

impl EnumDescriptor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.values.iter().map(|(name, number)| (name.as_str(), *number))
    }

    pub fn value_by_name(&self, name: &str) -> Option<i32> {
        self.0
            .values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, number)| *number)
    }

    pub fn name_by_number(&self, number: i32) -> Option<&str> {
        self.0
            .values
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(name, _)| name.as_str())
    }

    pub fn default_number(&self) -> i32 {
        self.0.values.first().map(|(_, n)| *n).unwrap_or(0)
    }
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.full_name() == other.full_name() && self.0.values == other.0.values
    }
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub(crate) name: String,
    pub(crate) request_type: String,
    pub(crate) response_type: String,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn response_type(&self) -> &str {
        &self.response_type
    }
}

#[derive(Debug)]
pub(crate) struct ServiceDescriptorInner {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) methods: Vec<MethodDescriptor>,
}

/// Metadata-only description of an RPC service; no RPC behavior is modeled here.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor(pub(crate) Arc<ServiceDescriptorInner>);

impl ServiceDescriptor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.0.methods.iter()
    }
}

#[derive(Debug)]
pub(crate) struct FileDescriptorInner {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) messages: Vec<MessageDescriptor>,
    pub(crate) enums: Vec<EnumDescriptor>,
    pub(crate) services: Vec<ServiceDescriptor>,
}

/// A compilation unit: a named package of messages, enums and services.
#[derive(Debug, Clone)]
pub struct FileDescriptor(pub(crate) Arc<FileDescriptorInner>);

impl FileDescriptor {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn package(&self) -> &str {
        &self.0.package
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.0.messages.iter()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.0.enums.iter()
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.0.services.iter()
    }
}

/// Derives the camelCase `json_name` for a proto field name.
///
/// Underscores are discarded; the character immediately following a discarded underscore
/// is uppercased. Every other character passes through unchanged.
pub fn to_json_name(proto_name: &str) -> String {
    let mut result = String::with_capacity(proto_name.len());
    let mut capitalize_next = false;
    for c in proto_name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_name_examples() {
        assert_eq!(to_json_name("foo_bar"), "fooBar");
        assert_eq!(to_json_name("foo_bar_baz"), "fooBarBaz");
        assert_eq!(to_json_name("foo"), "foo");
        assert_eq!(to_json_name("_foo"), "Foo");
        assert_eq!(to_json_name("foo_"), "foo");
    }
}
