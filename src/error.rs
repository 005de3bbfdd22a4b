//! Error types shared by the descriptor builder, the type registry and both codecs.
use std::fmt;

/// An error raised while building or registering descriptors.
#[derive(Debug)]
pub struct DescriptorError {
    kind: DescriptorErrorKind,
}

#[derive(Debug)]
enum DescriptorErrorKind {
    DuplicateFieldNumber { message: String, number: u32 },
    DuplicateFieldName { message: String, field: String },
    MissingTypeName { message: String, field: String },
    InvalidMapKeyType { message: String, field: String },
    EmptyEnum { name: String },
    InvalidOneofIndex { message: String, field: String },
    GroupFieldRejected { message: String, field: String },
    TypeAlreadyExists { name: String },
    FileAlreadyExists { name: String },
    TypeNotFound { name: String },
}

impl DescriptorError {
    pub(crate) fn duplicate_field_number(message: impl ToString, number: u32) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::DuplicateFieldNumber {
                message: message.to_string(),
                number,
            },
        }
    }

    pub(crate) fn duplicate_field_name(message: impl ToString, field: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::DuplicateFieldName {
                message: message.to_string(),
                field: field.to_string(),
            },
        }
    }

    pub(crate) fn missing_type_name(message: impl ToString, field: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::MissingTypeName {
                message: message.to_string(),
                field: field.to_string(),
            },
        }
    }

    pub(crate) fn invalid_map_key_type(message: impl ToString, field: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::InvalidMapKeyType {
                message: message.to_string(),
                field: field.to_string(),
            },
        }
    }

    pub(crate) fn empty_enum(name: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::EmptyEnum {
                name: name.to_string(),
            },
        }
    }

    pub(crate) fn invalid_oneof_index(message: impl ToString, field: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::InvalidOneofIndex {
                message: message.to_string(),
                field: field.to_string(),
            },
        }
    }

    pub(crate) fn group_field_rejected(message: impl ToString, field: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::GroupFieldRejected {
                message: message.to_string(),
                field: field.to_string(),
            },
        }
    }

    pub(crate) fn type_already_exists(name: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::TypeAlreadyExists {
                name: name.to_string(),
            },
        }
    }

    pub(crate) fn file_already_exists(name: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::FileAlreadyExists {
                name: name.to_string(),
            },
        }
    }

    pub(crate) fn type_not_found(name: impl ToString) -> Self {
        DescriptorError {
            kind: DescriptorErrorKind::TypeNotFound {
                name: name.to_string(),
            },
        }
    }
}

impl std::error::Error for DescriptorError {}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DescriptorErrorKind::DuplicateFieldNumber { message, number } => write!(
                f,
                "field number {} is used more than once in message '{}'",
                number, message
            ),
            DescriptorErrorKind::DuplicateFieldName { message, field } => write!(
                f,
                "field '{}' is defined more than once in message '{}'",
                field, message
            ),
            DescriptorErrorKind::MissingTypeName { message, field } => write!(
                f,
                "field '{}' of message '{}' has a message or enum type but no type name",
                field, message
            ),
            DescriptorErrorKind::InvalidMapKeyType { message, field } => write!(
                f,
                "field '{}' of message '{}' has a map with an unsupported key type",
                field, message
            ),
            DescriptorErrorKind::EmptyEnum { name } => {
                write!(f, "enum '{}' must have at least one value", name)
            }
            DescriptorErrorKind::InvalidOneofIndex { message, field } => write!(
                f,
                "the oneof index for field '{}' of message '{}' is invalid",
                field, message
            ),
            DescriptorErrorKind::GroupFieldRejected { message, field } => write!(
                f,
                "field '{}' of message '{}' uses the unsupported group type",
                field, message
            ),
            DescriptorErrorKind::TypeAlreadyExists { name } => write!(
                f,
                "the message or enum type '{}' is defined multiple times",
                name
            ),
            DescriptorErrorKind::FileAlreadyExists { name } => write!(
                f,
                "a conflicting file named '{}' is already registered. Duplicate files must match exactly.",
                name
            ),
            DescriptorErrorKind::TypeNotFound { name } => {
                write!(f, "the message or enum type '{}' was not found", name)
            }
        }
    }
}

/// Closed set of wire field types understood by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Double,
    Float,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Bool,
    String,
    Bytes,
    Message,
    Enum,
    Group,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::UInt32 => "uint32",
            FieldType::UInt64 => "uint64",
            FieldType::SInt32 => "sint32",
            FieldType::SInt64 => "sint64",
            FieldType::Fixed32 => "fixed32",
            FieldType::Fixed64 => "fixed64",
            FieldType::SFixed32 => "sfixed32",
            FieldType::SFixed64 => "sfixed64",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Message => "message",
            FieldType::Enum => "enum",
            FieldType::Group => "group",
        };
        f.write_str(name)
    }
}

/// An error raised by [`crate::dynamic::DynamicMessage`] field accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum SetFieldError {
    /// No field with the given name or number exists on the message.
    NotFound,
    /// The value's shape does not match what the field descriptor requires.
    InvalidType { expected: String, actual: String },
}

impl fmt::Display for SetFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetFieldError::NotFound => write!(f, "no such field"),
            SetFieldError::InvalidType { expected, actual } => {
                write!(f, "expected a value of type {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for SetFieldError {}

/// An error raised while encoding a [`crate::dynamic::DynamicMessage`] to the binary wire format.
#[derive(Debug)]
pub enum EncodeError {
    InvalidFieldType {
        field: String,
        expected: FieldType,
        actual: FieldType,
    },
    ValueTypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },
    MissingMapEntryInfo {
        field: String,
    },
    MissingFieldValue {
        field: String,
    },
    UnsupportedFieldType {
        field: String,
        ty: FieldType,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::InvalidFieldType {
                field,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' has type {} but a value of type {} was supplied",
                field, expected, actual
            ),
            EncodeError::ValueTypeMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' expected a value shaped like {}, found {}",
                field, expected, actual
            ),
            EncodeError::MissingMapEntryInfo { field } => write!(
                f,
                "field '{}' is a map but has no map entry descriptor",
                field
            ),
            EncodeError::MissingFieldValue { field } => write!(
                f,
                "field '{}' reports a value present but none could be read",
                field
            ),
            EncodeError::UnsupportedFieldType { field, ty } => {
                write!(f, "field '{}' has unsupported type {}", field, ty)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// An error raised while decoding a message from the binary wire format.
#[derive(Debug)]
pub enum DecodeError {
    TruncatedVarint,
    TruncatedMessage,
    InvalidWireType { tag: u32 },
    WireTypeMismatch { field: String, expected: u32, actual: u32 },
    MalformedPackedField { field: String },
    MalformedMapEntry { field: String },
    InvalidUtf8String { field: String },
    MissingTypeName { ty: FieldType },
    UnsupportedNestedMessage { type_name: String },
    UnsupportedFieldType { ty: FieldType },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedVarint => write!(f, "buffer ended inside a varint"),
            DecodeError::TruncatedMessage => write!(f, "buffer ended before the declared length"),
            DecodeError::InvalidWireType { tag } => {
                write!(f, "tag {} has an unrecognized wire type", tag)
            }
            DecodeError::WireTypeMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "field '{}' expected wire type {} but found {}",
                field, expected, actual
            ),
            DecodeError::MalformedPackedField { field } => write!(
                f,
                "packed payload for field '{}' did not end on an element boundary",
                field
            ),
            DecodeError::MalformedMapEntry { field } => {
                write!(f, "map entry for field '{}' is malformed", field)
            }
            DecodeError::InvalidUtf8String { field } => {
                write!(f, "field '{}' contains invalid UTF-8", field)
            }
            DecodeError::MissingTypeName { ty } => {
                write!(f, "a field of type {} is missing its type name", ty)
            }
            DecodeError::UnsupportedNestedMessage { type_name } => write!(
                f,
                "nested message type '{}' could not be resolved in the type registry",
                type_name
            ),
            DecodeError::UnsupportedFieldType { ty } => {
                write!(f, "field type {} is not supported", ty)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// An error raised while emitting the Protobuf JSON mapping.
#[derive(Debug)]
pub enum JsonEncodeError {
    InvalidMapKeyType { field: String },
    UnsupportedFieldType { field: String, ty: FieldType },
    Encode(EncodeError),
}

impl fmt::Display for JsonEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonEncodeError::InvalidMapKeyType { field } => {
                write!(f, "field '{}' has a map key type not representable in JSON", field)
            }
            JsonEncodeError::UnsupportedFieldType { field, ty } => {
                write!(f, "field '{}' has unsupported type {}", field, ty)
            }
            JsonEncodeError::Encode(inner) => write!(f, "{}", inner),
        }
    }
}

impl std::error::Error for JsonEncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JsonEncodeError::Encode(inner) => Some(inner),
            _ => None,
        }
    }
}

/// An error raised while parsing the Protobuf JSON mapping.
#[derive(Debug)]
pub enum JsonDecodeError {
    InvalidJson { message: String },
    InvalidJsonStructure { expected: String, actual: String },
    UnknownField { field: String, message: String },
    InvalidNumberFormat { field: String, value: String },
    NumberOutOfRange { field: String, value: String },
    InvalidEnumValue { field: String, value: String },
    InvalidBase64 { field: String, value: String },
    InvalidMapKeyFormat { field: String, value: String },
    InvalidMapKeyType { field: String },
    InvalidArrayElement {
        field: String,
        index: usize,
        inner: Box<JsonDecodeError>,
    },
    UnsupportedNestedMessage { type_name: String },
}

impl fmt::Display for JsonDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonDecodeError::InvalidJson { message } => write!(f, "invalid JSON: {}", message),
            JsonDecodeError::InvalidJsonStructure { expected, actual } => write!(
                f,
                "expected JSON {} but found {}",
                expected, actual
            ),
            JsonDecodeError::UnknownField { field, message } => write!(
                f,
                "unknown field '{}' for message '{}'",
                field, message
            ),
            JsonDecodeError::InvalidNumberFormat { field, value } => write!(
                f,
                "field '{}' has an invalid numeric value '{}'",
                field, value
            ),
            JsonDecodeError::NumberOutOfRange { field, value } => write!(
                f,
                "field '{}' has a value '{}' out of range for its type",
                field, value
            ),
            JsonDecodeError::InvalidEnumValue { field, value } => write!(
                f,
                "field '{}' has an invalid enum value '{}'",
                field, value
            ),
            JsonDecodeError::InvalidBase64 { field, value } => write!(
                f,
                "field '{}' has invalid base64 '{}'",
                field, value
            ),
            JsonDecodeError::InvalidMapKeyFormat { field, value } => write!(
                f,
                "field '{}' has a map key '{}' that cannot be parsed",
                field, value
            ),
            JsonDecodeError::InvalidMapKeyType { field } => write!(
                f,
                "field '{}' has a map key type not representable in JSON",
                field
            ),
            JsonDecodeError::InvalidArrayElement { field, index, inner } => write!(
                f,
                "field '{}' element {} is invalid: {}",
                field, index, inner
            ),
            JsonDecodeError::UnsupportedNestedMessage { type_name } => write!(
                f,
                "nested message type '{}' could not be resolved in the type registry",
                type_name
            ),
        }
    }
}

impl std::error::Error for JsonDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JsonDecodeError::InvalidArrayElement { inner, .. } => Some(inner),
            _ => None,
        }
    }
}
