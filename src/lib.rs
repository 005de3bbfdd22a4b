//! A descriptor-driven dynamic Protocol Buffers runtime.
//!
//! Message types are described at runtime through [`descriptor::builder`] rather than
//! generated from `.proto` source, and [`dynamic::DynamicMessage`] holds field values
//! against that descriptor. [`codec::binary`] implements the protobuf wire format and
//! [`codec::json`] implements the canonical JSON mapping, both driven purely off the
//! descriptor graph.
#![deny(missing_debug_implementations)]

pub mod codec;
pub mod descriptor;
pub mod dynamic;
pub mod error;
pub mod wire;

pub use descriptor::builder::{
    EnumDescriptorBuilder, FieldDescriptorBuilder, FileDescriptorBuilder, MessageDescriptorBuilder,
    MethodDescriptorBuilder, ServiceDescriptorBuilder,
};
pub use descriptor::registry::TypeRegistry;
pub use descriptor::{
    to_json_name, EnumDescriptor, FieldDescriptor, FieldType, FileDescriptor, MapEntryInfo,
    MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor,
};
pub use dynamic::{scalar_default, DynamicMessage, FieldAccessor, MapKey, MessageFactory, Value};
pub use error::{DecodeError, DescriptorError, EncodeError, JsonDecodeError, JsonEncodeError, SetFieldError};
