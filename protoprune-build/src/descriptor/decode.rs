//! Decoder for FileDescriptorSet from protobuf binary format.

use super::*;
use crate::error::DecodeError;
use bytes::{Buf, BytesMut};

/// Maximum size for a single message (64MB).
/// This prevents DoS attacks from malicious input with huge length values.
const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Maximum bytes for a 64-bit varint (10 bytes).
const MAX_VARINT_BYTES: usize = 10;

/// Protobuf wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum WireType {
    Varint = 0,
    I64 = 1,
    Len = 2,
    SGroup = 3,
    EGroup = 4,
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::I64),
            2 => Ok(Self::Len),
            3 => Ok(Self::SGroup),
            4 => Ok(Self::EGroup),
            5 => Ok(Self::I32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }
}

/// Decode a FileDescriptorSet from protobuf binary data.
///
/// Decoded descriptors borrow from `data` rather than copying it.
pub fn decode_file_descriptor_set(data: impl Into<Bytes>) -> Result<FileDescriptorSet, DecodeError> {
    let mut buf: Bytes = data.into();
    let mut fds = FileDescriptorSet::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => fds.file.push(decode_file_descriptor_proto(decode_bytes(&mut buf)?)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(fds)
}

/// Decode a FileDescriptorProto, keeping unmodelled fields verbatim.
fn decode_file_descriptor_proto(mut buf: Bytes) -> Result<FileDescriptorProto, DecodeError> {
    let mut fdp = FileDescriptorProto::default();
    let mut unknown = BytesMut::new();

    while buf.has_remaining() {
        let field_start = buf.clone();
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => fdp.name = Some(decode_string(&mut buf)?),
            2 => fdp.package = Some(decode_string(&mut buf)?),
            3 => fdp.dependency.push(decode_string(&mut buf)?),
            4 => fdp.message_type.push(decode_descriptor_proto(decode_bytes(&mut buf)?)?),
            5 => fdp.enum_type.push(decode_enum_descriptor_proto(decode_bytes(&mut buf)?)?),
            6 => fdp.service.push(decode_service_descriptor_proto(decode_bytes(&mut buf)?)?),
            7 => fdp.extension.push(decode_field_descriptor_proto(decode_bytes(&mut buf)?)?),
            9 => fdp.source_code_info = Some(decode_source_code_info(decode_bytes(&mut buf)?)?),
            10 => decode_repeated_i32(&mut buf, wire_type, &mut fdp.public_dependency)?,
            11 => decode_repeated_i32(&mut buf, wire_type, &mut fdp.weak_dependency)?,
            12 => fdp.syntax = Some(decode_string(&mut buf)?),
            _ => {
                skip_field(&mut buf, wire_type)?;
                let consumed = field_start.len() - buf.len();
                unknown.extend_from_slice(&field_start[..consumed]);
            }
        }
    }

    fdp.unknown_fields = unknown.freeze();
    Ok(fdp)
}

/// Decode a DescriptorProto (message type).
fn decode_descriptor_proto(body: Bytes) -> Result<DescriptorProto, DecodeError> {
    let mut buf = body.clone();
    let mut dp = DescriptorProto {
        encoded: body,
        ..Default::default()
    };

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => dp.name = Some(decode_string(&mut buf)?),
            2 => dp.field.push(decode_field_descriptor_proto(decode_bytes(&mut buf)?)?),
            3 => dp.nested_type.push(decode_descriptor_proto(decode_bytes(&mut buf)?)?),
            4 => dp.enum_type.push(decode_enum_descriptor_proto(decode_bytes(&mut buf)?)?),
            6 => dp.extension.push(decode_field_descriptor_proto(decode_bytes(&mut buf)?)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(dp)
}

/// Decode a FieldDescriptorProto.
fn decode_field_descriptor_proto(body: Bytes) -> Result<FieldDescriptorProto, DecodeError> {
    let mut buf = body.clone();
    let mut fdp = FieldDescriptorProto {
        encoded: body,
        ..Default::default()
    };

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => fdp.name = Some(decode_string(&mut buf)?),
            2 => fdp.extendee = Some(decode_string(&mut buf)?),
            3 => fdp.number = Some(decode_varint(&mut buf)? as i32),
            5 => fdp.r#type = Some(decode_varint(&mut buf)? as i32),
            6 => fdp.type_name = Some(decode_string(&mut buf)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(fdp)
}

/// Decode an EnumDescriptorProto.
fn decode_enum_descriptor_proto(body: Bytes) -> Result<EnumDescriptorProto, DecodeError> {
    let mut buf = body.clone();
    let mut edp = EnumDescriptorProto {
        encoded: body,
        ..Default::default()
    };

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => edp.name = Some(decode_string(&mut buf)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(edp)
}

/// Decode a ServiceDescriptorProto.
fn decode_service_descriptor_proto(body: Bytes) -> Result<ServiceDescriptorProto, DecodeError> {
    let mut buf = body.clone();
    let mut sdp = ServiceDescriptorProto {
        encoded: body,
        ..Default::default()
    };

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => sdp.name = Some(decode_string(&mut buf)?),
            2 => sdp.method.push(decode_method_descriptor_proto(decode_bytes(&mut buf)?)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(sdp)
}

/// Decode a MethodDescriptorProto.
fn decode_method_descriptor_proto(mut buf: Bytes) -> Result<MethodDescriptorProto, DecodeError> {
    let mut mdp = MethodDescriptorProto::default();

    while buf.has_remaining() {
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => mdp.name = Some(decode_string(&mut buf)?),
            2 => mdp.input_type = Some(decode_string(&mut buf)?),
            3 => mdp.output_type = Some(decode_string(&mut buf)?),
            _ => skip_field(&mut buf, wire_type)?,
        }
    }

    Ok(mdp)
}

/// Decode a SourceCodeInfo, keeping unmodelled fields verbatim.
fn decode_source_code_info(mut buf: Bytes) -> Result<SourceCodeInfo, DecodeError> {
    let mut info = SourceCodeInfo::default();
    let mut unknown = BytesMut::new();

    while buf.has_remaining() {
        let field_start = buf.clone();
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => info.location.push(decode_location(decode_bytes(&mut buf)?)?),
            _ => {
                skip_field(&mut buf, wire_type)?;
                let consumed = field_start.len() - buf.len();
                unknown.extend_from_slice(&field_start[..consumed]);
            }
        }
    }

    info.unknown_fields = unknown.freeze();
    Ok(info)
}

/// Decode a SourceCodeInfo.Location, splitting its path from everything else.
fn decode_location(body: Bytes) -> Result<Location, DecodeError> {
    let mut buf = body.clone();
    let mut location = Location {
        encoded: body,
        ..Default::default()
    };
    let mut rest = BytesMut::new();

    while buf.has_remaining() {
        let field_start = buf.clone();
        let (field_number, wire_type) = decode_key(&mut buf)?;
        match field_number {
            1 => decode_repeated_i32(&mut buf, wire_type, &mut location.path)?,
            _ => {
                skip_field(&mut buf, wire_type)?;
                let consumed = field_start.len() - buf.len();
                rest.extend_from_slice(&field_start[..consumed]);
            }
        }
    }

    location.rest = rest.freeze();
    Ok(location)
}

/// Decode a repeated int32 that may be packed or unpacked.
fn decode_repeated_i32(
    buf: &mut Bytes,
    wire_type: WireType,
    out: &mut Vec<i32>,
) -> Result<(), DecodeError> {
    if wire_type == WireType::Len {
        let mut packed = decode_bytes(buf)?;
        while packed.has_remaining() {
            out.push(decode_varint(&mut packed)? as i32);
        }
    } else {
        out.push(decode_varint(buf)? as i32);
    }
    Ok(())
}

/// Decode a field key (tag number + wire type).
fn decode_key(buf: &mut impl Buf) -> Result<(u32, WireType), DecodeError> {
    let key = decode_varint(buf)?;
    let wire_type = WireType::try_from((key & 0x07) as u8)?;
    let field_number = (key >> 3) as u32;
    Ok((field_number, wire_type))
}

/// Decode a varint (LEB128) with iteration limit to prevent infinite loops.
///
/// Varints can be at most 10 bytes for 64-bit values. The 10th byte can only
/// have its lowest bit set (representing bit 63 of the result).
fn decode_varint(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for i in 0..MAX_VARINT_BYTES {
        if !buf.has_remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = buf.get_u8();

        // For the 10th byte (shift=63), only bit 0 can be set (bit 63 of result)
        if shift == 63 && (byte & 0x7E) != 0 {
            return Err(DecodeError::InvalidVarint);
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;

        if i == MAX_VARINT_BYTES - 1 {
            return Err(DecodeError::InvalidVarint);
        }
    }

    Err(DecodeError::InvalidVarint)
}

/// Decode a length value and validate it's within bounds.
fn decode_len(buf: &mut impl Buf) -> Result<usize, DecodeError> {
    let len = decode_varint(buf)?;
    if len > MAX_MESSAGE_SIZE as u64 {
        return Err(DecodeError::LengthOverflow(len));
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(len)
}

/// Split off a length-delimited value without copying.
fn decode_bytes(buf: &mut Bytes) -> Result<Bytes, DecodeError> {
    let len = decode_len(buf)?;
    Ok(buf.split_to(len))
}

/// Decode a length-delimited string.
fn decode_string(buf: &mut Bytes) -> Result<String, DecodeError> {
    let raw = decode_bytes(buf)?;
    std::str::from_utf8(&raw)
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Skip a field based on its wire type.
fn skip_field(buf: &mut Bytes, wire_type: WireType) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
        }
        WireType::I64 => {
            if buf.remaining() < 8 {
                return Err(DecodeError::UnexpectedEof);
            }
            buf.advance(8);
        }
        WireType::Len => {
            let len = decode_len(buf)?;
            buf.advance(len);
        }
        WireType::I32 => {
            if buf.remaining() < 4 {
                return Err(DecodeError::UnexpectedEof);
            }
            buf.advance(4);
        }
        WireType::SGroup | WireType::EGroup => return Err(DecodeError::GroupEncoding),
    }
    Ok(())
}
