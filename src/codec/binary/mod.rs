//! The Protobuf binary wire format codec.
pub mod de;
pub mod ser;

pub use de::{deserialize, deserialize_with_options, BinaryDeserializeOptions};
pub use ser::{serialize, serialize_with_options, BinarySerializeOptions};
