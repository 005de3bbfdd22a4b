//! Programmatic construction of the descriptor graph.
//!
//! There is no `.proto` front end in this crate: callers build [`FileDescriptor`]s directly
//! through these builders, which perform the same shape validation a descriptor pool would
//! perform when accepting a compiled `FileDescriptorProto`.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::{
    to_json_name, EnumDescriptor, EnumDescriptorInner, FieldDescriptor, FieldDescriptorInner,
    FieldType, FileDescriptor, FileDescriptorInner, MapEntryInfo, MessageDescriptor,
    MessageDescriptorInner, MethodDescriptor, OneofDescriptor, OneofDescriptorInner,
    ServiceDescriptor, ServiceDescriptorInner,
};
use crate::error::DescriptorError;

fn is_valid_map_key_type(ty: FieldType) -> bool {
    matches!(
        ty,
        FieldType::String
            | FieldType::Bool
            | FieldType::Int32
            | FieldType::SInt32
            | FieldType::SFixed32
            | FieldType::Int64
            | FieldType::SInt64
            | FieldType::SFixed64
            | FieldType::UInt32
            | FieldType::Fixed32
            | FieldType::UInt64
            | FieldType::Fixed64
    )
}

/// Builds a single [`FieldDescriptor`].
#[derive(Debug)]
pub struct FieldDescriptorBuilder {
    name: String,
    json_name: Option<String>,
    number: u32,
    field_type: FieldType,
    type_name: Option<String>,
    is_repeated: bool,
    is_map: bool,
    oneof_index: Option<usize>,
    map_entry: Option<MapEntryInfo>,
}

impl FieldDescriptorBuilder {
    pub fn new(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        FieldDescriptorBuilder {
            name: name.into(),
            json_name: None,
            number,
            field_type,
            type_name: None,
            is_repeated: false,
            is_map: false,
            oneof_index: None,
            map_entry: None,
        }
    }

    pub fn json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = Some(json_name.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn repeated(mut self) -> Self {
        self.is_repeated = true;
        self
    }

    /// Marks this field as a map, with the given key/value shape. Implies `repeated`.
    pub fn map(
        mut self,
        key_type: FieldType,
        value_type: FieldType,
        value_type_name: Option<String>,
    ) -> Self {
        self.is_repeated = true;
        self.is_map = true;
        self.map_entry = Some(MapEntryInfo {
            key_type,
            value_type,
            value_type_name,
        });
        self
    }

    pub fn oneof_index(mut self, index: usize) -> Self {
        self.oneof_index = Some(index);
        self
    }
}

/// Builds a single [`MessageDescriptor`].
#[derive(Debug)]
pub struct MessageDescriptorBuilder {
    name: String,
    fields: Vec<FieldDescriptorBuilder>,
    oneof_names: Vec<String>,
}

impl MessageDescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        MessageDescriptorBuilder {
            name: name.into(),
            fields: Vec::new(),
            oneof_names: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptorBuilder) -> Self {
        self.fields.push(field);
        self
    }

    pub fn oneof(mut self, name: impl Into<String>) -> Self {
        self.oneof_names.push(name.into());
        self
    }

    fn build(self, package: &str) -> Result<MessageDescriptor, DescriptorError> {
        let full_name = qualify(package, &self.name);

        let mut oneofs: Vec<OneofDescriptor> = self
            .oneof_names
            .iter()
            .map(|name| {
                OneofDescriptor(Arc::new(OneofDescriptorInner {
                    name: name.clone(),
                    field_numbers: Vec::new(),
                }))
            })
            .collect();
        let mut oneof_field_numbers: Vec<Vec<u32>> = vec![Vec::new(); oneofs.len()];

        let mut fields: BTreeMap<u32, FieldDescriptor> = BTreeMap::new();
        let mut fields_by_name: HashMap<String, u32> = HashMap::new();

        for field in self.fields {
            if fields.contains_key(&field.number) {
                return Err(DescriptorError::duplicate_field_number(
                    &full_name,
                    field.number,
                ));
            }
            if fields_by_name.contains_key(&field.name) {
                return Err(DescriptorError::duplicate_field_name(&full_name, &field.name));
            }
            if field.field_type == FieldType::Group {
                return Err(DescriptorError::group_field_rejected(&full_name, &field.name));
            }
            if !field.is_map
                && matches!(field.field_type, FieldType::Message | FieldType::Enum)
                && field.type_name.is_none()
            {
                return Err(DescriptorError::missing_type_name(&full_name, &field.name));
            }
            if let Some(map_entry) = &field.map_entry {
                if !is_valid_map_key_type(map_entry.key_type) {
                    return Err(DescriptorError::invalid_map_key_type(&full_name, &field.name));
                }
                if matches!(map_entry.value_type, FieldType::Message | FieldType::Enum)
                    && map_entry.value_type_name.is_none()
                {
                    return Err(DescriptorError::missing_type_name(&full_name, &field.name));
                }
            }
            let oneof = match field.oneof_index {
                Some(index) => {
                    let oneof = oneofs
                        .get(index)
                        .cloned()
                        .ok_or_else(|| DescriptorError::invalid_oneof_index(&full_name, &field.name))?;
                    oneof_field_numbers[index].push(field.number);
                    Some(oneof)
                }
                None => None,
            };

            let json_name = field
                .json_name
                .clone()
                .unwrap_or_else(|| to_json_name(&field.name));

            let number = field.number;
            let name = field.name.clone();
            let descriptor = FieldDescriptor(Arc::new(FieldDescriptorInner {
                name: field.name,
                json_name,
                number: field.number,
                field_type: field.field_type,
                type_name: field.type_name,
                is_repeated: field.is_repeated,
                is_map: field.is_map,
                oneof,
                map_entry: field.map_entry,
            }));
            fields.insert(number, descriptor);
            fields_by_name.insert(name, number);
        }

        for (oneof, numbers) in oneofs.iter_mut().zip(oneof_field_numbers.into_iter()) {
            Arc::get_mut(&mut oneof.0)
                .expect("oneof descriptor not yet shared")
                .field_numbers = numbers;
        }

        Ok(MessageDescriptor(Arc::new(MessageDescriptorInner {
            name: self.name,
            full_name,
            fields,
            fields_by_name,
            oneofs,
        })))
    }
}

/// Builds a single [`EnumDescriptor`].
#[derive(Debug)]
pub struct EnumDescriptorBuilder {
    name: String,
    values: Vec<(String, i32)>,
}

impl EnumDescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        EnumDescriptorBuilder {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, number: i32) -> Self {
        self.values.push((name.into(), number));
        self
    }

    fn build(self, package: &str) -> Result<EnumDescriptor, DescriptorError> {
        let full_name = qualify(package, &self.name);
        if self.values.is_empty() {
            return Err(DescriptorError::empty_enum(&full_name));
        }
        let mut seen_names = HashSet::new();
        for (name, _) in &self.values {
            if !seen_names.insert(name.clone()) {
                return Err(DescriptorError::duplicate_field_name(&full_name, name));
            }
        }
        Ok(EnumDescriptor(Arc::new(EnumDescriptorInner {
            name: self.name,
            full_name,
            values: self.values,
        })))
    }
}

/// Builds a single RPC method's metadata.
#[derive(Debug)]
pub struct MethodDescriptorBuilder {
    name: String,
    request_type: String,
    response_type: String,
}

impl MethodDescriptorBuilder {
    pub fn new(
        name: impl Into<String>,
        request_type: impl Into<String>,
        response_type: impl Into<String>,
    ) -> Self {
        MethodDescriptorBuilder {
            name: name.into(),
            request_type: request_type.into(),
            response_type: response_type.into(),
        }
    }
}

/// Builds a single [`ServiceDescriptor`].
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
    name: String,
    methods: Vec<MethodDescriptorBuilder>,
}

impl ServiceDescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ServiceDescriptorBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodDescriptorBuilder) -> Self {
        self.methods.push(method);
        self
    }

    fn build(self, package: &str) -> ServiceDescriptor {
        let full_name = qualify(package, &self.name);
        let methods = self
            .methods
            .into_iter()
            .map(|m| MethodDescriptor {
                name: m.name,
                request_type: m.request_type,
                response_type: m.response_type,
            })
            .collect();
        ServiceDescriptor(Arc::new(ServiceDescriptorInner {
            name: self.name,
            full_name,
            methods,
        }))
    }
}

/// Builds a single [`FileDescriptor`].
#[derive(Debug)]
pub struct FileDescriptorBuilder {
    name: String,
    package: String,
    messages: Vec<MessageDescriptorBuilder>,
    enums: Vec<EnumDescriptorBuilder>,
    services: Vec<ServiceDescriptorBuilder>,
}

impl FileDescriptorBuilder {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        FileDescriptorBuilder {
            name: name.into(),
            package: package.into(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn message(mut self, message: MessageDescriptorBuilder) -> Self {
        self.messages.push(message);
        self
    }

    pub fn enum_type(mut self, enum_type: EnumDescriptorBuilder) -> Self {
        self.enums.push(enum_type);
        self
    }

    pub fn service(mut self, service: ServiceDescriptorBuilder) -> Self {
        self.services.push(service);
        self
    }

    pub fn build(self) -> Result<FileDescriptor, DescriptorError> {
        let messages = self
            .messages
            .into_iter()
            .map(|m| m.build(&self.package))
            .collect::<Result<Vec<_>, _>>()?;
        let enums = self
            .enums
            .into_iter()
            .map(|e| e.build(&self.package))
            .collect::<Result<Vec<_>, _>>()?;
        let services = self
            .services
            .into_iter()
            .map(|s| s.build(&self.package))
            .collect();

        Ok(FileDescriptor(Arc::new(FileDescriptorInner {
            name: self.name,
            package: self.package,
            messages,
            enums,
            services,
        })))
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}
