//! Descriptor types for protobuf FileDescriptorSet.
//!
//! These types mirror the parts of google/protobuf/descriptor.proto that the
//! type graph needs. Every message, enum and service also keeps its complete
//! encoded body, and file-level fields that are not modelled are kept verbatim,
//! so a pruned set can be written back without losing options, comments or
//! anything else protoc produced.

mod decode;
mod encode;
#[cfg(test)]
pub(crate) mod fixtures;

pub use decode::decode_file_descriptor_set;
pub use encode::encode_schema;

use bytes::Bytes;

/// A collection of file descriptors.
/// Corresponds to google.protobuf.FileDescriptorSet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptorSet {
    /// The file descriptors.
    pub file: Vec<FileDescriptorProto>, // field 1
}

/// Describes a complete .proto file.
/// Corresponds to google.protobuf.FileDescriptorProto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptorProto {
    /// The file name, relative to root of source tree.
    pub name: Option<String>, // field 1
    /// The package name.
    pub package: Option<String>, // field 2
    /// Names of files imported by this file.
    pub dependency: Vec<String>, // field 3
    /// All top-level message definitions in this file.
    pub message_type: Vec<DescriptorProto>, // field 4
    /// All top-level enum definitions in this file.
    pub enum_type: Vec<EnumDescriptorProto>, // field 5
    /// All service definitions in this file.
    pub service: Vec<ServiceDescriptorProto>, // field 6
    /// Top-level extension declarations.
    pub extension: Vec<FieldDescriptorProto>, // field 7
    /// Comments and source locations, present with `--include_source_info`.
    pub source_code_info: Option<SourceCodeInfo>, // field 9
    /// Indexes of the public imported files in the dependency list.
    pub public_dependency: Vec<i32>, // field 10
    /// Indexes of the weak imported files in the dependency list.
    pub weak_dependency: Vec<i32>, // field 11
    /// The syntax of the proto file (e.g., "proto2", "proto3").
    pub syntax: Option<String>, // field 12
    /// Encoded key/value pairs of every other field (options, edition).
    pub unknown_fields: Bytes,
}

/// Describes a message type.
/// Corresponds to google.protobuf.DescriptorProto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorProto {
    /// The message name.
    pub name: Option<String>, // field 1
    /// Fields of the message.
    pub field: Vec<FieldDescriptorProto>, // field 2
    /// Nested message types.
    pub nested_type: Vec<DescriptorProto>, // field 3
    /// Nested enum types.
    pub enum_type: Vec<EnumDescriptorProto>, // field 4
    /// Extensions declared inside the message.
    pub extension: Vec<FieldDescriptorProto>, // field 6
    /// The complete encoded message body.
    pub encoded: Bytes,
}

/// Describes a field within a message.
/// Corresponds to google.protobuf.FieldDescriptorProto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDescriptorProto {
    /// The field name.
    pub name: Option<String>, // field 1
    /// For extensions, the fully-qualified type being extended.
    pub extendee: Option<String>, // field 2
    /// The field number (tag).
    pub number: Option<i32>, // field 3
    /// The field type.
    pub r#type: Option<i32>, // field 5
    /// For message and enum types, the fully-qualified type name.
    pub type_name: Option<String>, // field 6
    /// The complete encoded field body.
    pub encoded: Bytes,
}

impl FieldDescriptorProto {
    /// Get the field type.
    pub fn field_type(&self) -> Option<Type> {
        self.r#type.and_then(Type::from_i32)
    }

    /// The named type this field refers to, if any.
    ///
    /// protoc always fills in `type_name` for message, enum and group fields.
    pub fn referenced_type(&self) -> Option<&str> {
        match self.field_type() {
            Some(Type::Message | Type::Enum | Type::Group) | None => self.type_name.as_deref(),
            Some(_) => None,
        }
    }
}

/// Describes an enum type.
/// Corresponds to google.protobuf.EnumDescriptorProto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumDescriptorProto {
    /// The enum name.
    pub name: Option<String>, // field 1
    /// The complete encoded enum body.
    pub encoded: Bytes,
}

/// Describes a service.
/// Corresponds to google.protobuf.ServiceDescriptorProto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceDescriptorProto {
    /// The service name.
    pub name: Option<String>, // field 1
    /// The service methods.
    pub method: Vec<MethodDescriptorProto>, // field 2
    /// The complete encoded service body.
    pub encoded: Bytes,
}

/// Describes a service method.
/// Corresponds to google.protobuf.MethodDescriptorProto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodDescriptorProto {
    /// The method name.
    pub name: Option<String>, // field 1
    /// Fully-qualified input type name.
    pub input_type: Option<String>, // field 2
    /// Fully-qualified output type name.
    pub output_type: Option<String>, // field 3
}

/// Source locations of a file's declarations.
/// Corresponds to google.protobuf.SourceCodeInfo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCodeInfo {
    pub location: Vec<Location>, // field 1
    /// Encoded key/value pairs of every other field.
    pub unknown_fields: Bytes,
}

/// A span of the source file and its comments.
/// Corresponds to google.protobuf.SourceCodeInfo.Location.
///
/// `path` addresses a descriptor element by field numbers and list indexes:
/// `[4, 2]` is the file's third message, `[4, 2, 2, 0]` that message's first
/// field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub path: Vec<i32>, // field 1
    /// Encoded key/value pairs of every field except `path`.
    pub rest: Bytes,
    /// The complete encoded location body.
    pub encoded: Bytes,
}

/// Field type enumeration.
/// Corresponds to google.protobuf.FieldDescriptorProto.Type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Type {
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sfixed32 = 15,
    Sfixed64 = 16,
    Sint32 = 17,
    Sint64 = 18,
}

impl Type {
    /// Convert from i32.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Double),
            2 => Some(Self::Float),
            3 => Some(Self::Int64),
            4 => Some(Self::Uint64),
            5 => Some(Self::Int32),
            6 => Some(Self::Fixed64),
            7 => Some(Self::Fixed32),
            8 => Some(Self::Bool),
            9 => Some(Self::String),
            10 => Some(Self::Group),
            11 => Some(Self::Message),
            12 => Some(Self::Bytes),
            13 => Some(Self::Uint32),
            14 => Some(Self::Enum),
            15 => Some(Self::Sfixed32),
            16 => Some(Self::Sfixed64),
            17 => Some(Self::Sint32),
            18 => Some(Self::Sint64),
            _ => None,
        }
    }
}
