//! Resolution of fully qualified type names to their descriptors.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{EnumDescriptor, FileDescriptor, MessageDescriptor};
use crate::error::DescriptorError;

#[derive(Debug, Clone)]
enum RegisteredType {
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
}

#[derive(Debug, Default)]
struct Inner {
    types: HashMap<String, RegisteredType>,
    files: HashMap<String, FileDescriptor>,
}

/// A shared, read-mostly table mapping fully qualified names to their descriptors.
///
/// Cheap to clone: internally an [`Arc`]. Registration uses interior mutability so a
/// registry can be built up incrementally and then shared across threads; decode paths
/// only ever call [`TypeRegistry::resolve_message`]/[`TypeRegistry::resolve_enum`], never a
/// mutating method.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Registers every message and enum defined in `file`.
    ///
    /// Re-registering a file under the same name is idempotent when every message/enum it
    /// defines has the identical shape already registered; otherwise it is a conflict.
    pub fn register_file(&self, file: FileDescriptor) -> Result<(), DescriptorError> {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        if let Some(existing) = inner.files.get(file.name()) {
            if files_match(existing, &file) {
                return Ok(());
            }
            return Err(DescriptorError::file_already_exists(file.name()));
        }

        for message in file.messages() {
            if let Some(RegisteredType::Message(existing)) = inner.types.get(message.full_name()) {
                if existing != message {
                    return Err(DescriptorError::type_already_exists(message.full_name()));
                }
            } else if inner.types.contains_key(message.full_name()) {
                return Err(DescriptorError::type_already_exists(message.full_name()));
            }
        }
        for enum_type in file.enums() {
            if let Some(RegisteredType::Enum(existing)) = inner.types.get(enum_type.full_name()) {
                if existing != enum_type {
                    return Err(DescriptorError::type_already_exists(enum_type.full_name()));
                }
            } else if inner.types.contains_key(enum_type.full_name()) {
                return Err(DescriptorError::type_already_exists(enum_type.full_name()));
            }
        }

        for message in file.messages() {
            inner
                .types
                .insert(message.full_name().to_string(), RegisteredType::Message(message.clone()));
        }
        for enum_type in file.enums() {
            inner.types.insert(
                enum_type.full_name().to_string(),
                RegisteredType::Enum(enum_type.clone()),
            );
        }
        inner.files.insert(file.name().to_string(), file);
        Ok(())
    }

    pub fn resolve_message(&self, full_name: &str) -> Option<MessageDescriptor> {
        let inner = self.inner.read().expect("registry lock poisoned");
        match inner.types.get(full_name) {
            Some(RegisteredType::Message(m)) => Some(m.clone()),
            _ => None,
        }
    }

    pub fn resolve_enum(&self, full_name: &str) -> Option<EnumDescriptor> {
        let inner = self.inner.read().expect("registry lock poisoned");
        match inner.types.get(full_name) {
            Some(RegisteredType::Enum(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// Looks up a message descriptor, reporting the resolution failure as a decode-shaped
    /// error so callers can propagate it directly.
    pub fn require_message(&self, full_name: &str) -> Result<MessageDescriptor, DescriptorError> {
        self.resolve_message(full_name)
            .ok_or_else(|| DescriptorError::type_not_found(full_name))
    }
}

fn files_match(a: &FileDescriptor, b: &FileDescriptor) -> bool {
    if a.package() != b.package() {
        return false;
    }
    a.messages().eq(b.messages()) && a.enums().eq(b.enums())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::{FieldDescriptorBuilder, FileDescriptorBuilder, MessageDescriptorBuilder};
    use crate::descriptor::FieldType;

    fn sample_file() -> FileDescriptor {
        FileDescriptorBuilder::new("test.proto", "pkg")
            .message(
                MessageDescriptorBuilder::new("Person")
                    .field(FieldDescriptorBuilder::new("name", 1, FieldType::String)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn resolves_registered_message() {
        let registry = TypeRegistry::new();
        registry.register_file(sample_file()).unwrap();
        assert!(registry.resolve_message("pkg.Person").is_some());
        assert!(registry.resolve_message("pkg.Nope").is_none());
    }

    #[test]
    fn idempotent_reregistration_of_identical_file() {
        let registry = TypeRegistry::new();
        registry.register_file(sample_file()).unwrap();
        registry.register_file(sample_file()).unwrap();
    }

    #[test]
    fn conflicting_reregistration_is_rejected() {
        let registry = TypeRegistry::new();
        registry.register_file(sample_file()).unwrap();
        let other = FileDescriptorBuilder::new("test.proto", "pkg")
            .message(
                MessageDescriptorBuilder::new("Person")
                    .field(FieldDescriptorBuilder::new("name", 1, FieldType::Int32)),
            )
            .build()
            .unwrap();
        assert!(registry.register_file(other).is_err());
    }
}
