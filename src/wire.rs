//! Tag, varint, zigzag and fixed-width primitives for the Protobuf binary wire format.
//!
//! Every primitive here is implemented directly against [`bytes::Buf`]/[`bytes::BufMut`];
//! none of it is delegated to a generated-code runtime's encoding module.
use bytes::{Buf, BufMut};

use crate::error::DecodeError;

/// The wire type carried in the low three bits of a field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl WireType {
    pub fn from_u32(value: u32) -> Option<WireType> {
        match value {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Encodes a field tag `(field_number << 3) | wire_type` as a varint.
pub fn encode_tag(field_number: u32, wire_type: WireType) -> u64 {
    ((field_number as u64) << 3) | (wire_type.as_u32() as u64)
}

pub fn encode_key(buf: &mut impl BufMut, field_number: u32, wire_type: WireType) {
    encode_varint(buf, encode_tag(field_number, wire_type));
}

/// Decodes a tag into `(field_number, wire_type)`. Fails if the wire type bits are unrecognized.
pub fn decode_tag(tag: u64) -> Result<(u32, WireType), DecodeError> {
    let wire_type = (tag & 0x7) as u32;
    let field_number = (tag >> 3) as u32;
    match WireType::from_u32(wire_type) {
        Some(wt) => Ok((field_number, wt)),
        None => Err(DecodeError::InvalidWireType { tag: wire_type }),
    }
}

/// Encodes an unsigned varint, 7 bits per byte, MSB as the continuation flag.
pub fn encode_varint(buf: &mut impl BufMut, mut value: u64) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            break;
        } else {
            buf.put_u8(((value & 0x7f) | 0x80) as u8);
            value >>= 7;
        }
    }
}

/// Decodes an unsigned varint. Fails with [`DecodeError::TruncatedVarint`] if the buffer
/// ends before a terminating byte, or if more than 10 bytes (70 bits) are consumed.
pub fn decode_varint(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(DecodeError::TruncatedVarint);
        }
        if shift >= 64 {
            return Err(DecodeError::TruncatedVarint);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Number of bytes [`encode_varint`] would emit for `value`.
pub fn encoded_varint_len(value: u64) -> usize {
    // Every 7 bits needs one more byte; at least one byte is always emitted.
    let significant_bits = 64 - value.leading_zeros().min(63);
    let significant_bits = significant_bits.max(1);
    ((significant_bits as usize) + 6) / 7
}

pub fn encoded_key_len(field_number: u32) -> usize {
    encoded_varint_len(encode_tag(field_number, WireType::Varint))
}

/// Maps a signed 32-bit integer to an unsigned varint-friendly representation.
pub fn zigzag_encode_32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn zigzag_decode_32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn zigzag_encode_64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode_64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn encode_fixed32(buf: &mut impl BufMut, value: u32) {
    buf.put_u32_le(value);
}

pub fn decode_fixed32(buf: &mut impl Buf) -> Result<u32, DecodeError> {
    if buf.remaining() < 4 {
        return Err(DecodeError::TruncatedMessage);
    }
    Ok(buf.get_u32_le())
}

pub fn encode_fixed64(buf: &mut impl BufMut, value: u64) {
    buf.put_u64_le(value);
}

pub fn decode_fixed64(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    if buf.remaining() < 8 {
        return Err(DecodeError::TruncatedMessage);
    }
    Ok(buf.get_u64_le())
}

/// Skips the payload belonging to `wire_type`, for a field with no descriptor entry.
/// Returns the raw bytes consumed (tag not included) so callers can stash them verbatim.
pub fn skip_field(buf: &mut impl Buf, wire_type: WireType) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
        }
        WireType::Fixed64 => {
            decode_fixed64(buf)?;
        }
        WireType::Fixed32 => {
            decode_fixed32(buf)?;
        }
        WireType::LengthDelimited => {
            let len = decode_varint(buf)? as usize;
            if buf.remaining() < len {
                return Err(DecodeError::TruncatedMessage);
            }
            buf.advance(len);
        }
        WireType::StartGroup | WireType::EndGroup => {
            return Err(DecodeError::UnsupportedFieldType {
                ty: crate::error::FieldType::Group,
            });
        }
    }
    Ok(())
}
