//! Error types for protoprune-build.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, pruning or emitting a schema.
#[derive(Debug, Error)]
pub enum Error {
    /// No `.proto` files were requested.
    #[error("no proto files specified, set at least one with Config::proto_file")]
    NoProtoFiles,
    /// An include or exclude rule is malformed.
    #[error("invalid pruning rule `{identifier}`: {reason}")]
    InvalidIdentifier {
        identifier: String,
        reason: &'static str,
    },
    /// Missing file_descriptor_set_path when skip_protoc is set.
    #[error("file_descriptor_set_path required when skip_protoc is set")]
    MissingDescriptorPath,
    /// Missing OUT_DIR environment variable.
    #[error("OUT_DIR not set. Run from build.rs or set out_dir().")]
    MissingOutDir,
    /// Neither an emitter nor a descriptor set output was configured.
    #[error("nothing to generate: pass an emitter or set file_descriptor_set_path")]
    NothingToGenerate,
    /// protoc not found.
    #[error("protoc not found. Set PROTOC env var or install protoc.")]
    ProtocNotFound,
    /// protoc invocation failed.
    #[error("protoc failed: {}", truncate(.0))]
    ProtocFailed(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to decode a FileDescriptorSet.
    #[error("failed to decode FileDescriptorSet: {0}")]
    Decode(#[from] DecodeError),
    /// A descriptor is missing its name.
    #[error("missing name in {0} descriptor")]
    MissingName(&'static str),
    /// A type references a name the schema does not declare.
    #[error("type `{referrer}` references unknown type `{reference}`")]
    UnresolvedReference { referrer: String, reference: String },
    /// A retained type references a type removed by an exclude rule.
    #[error("retained type `{referrer}` references pruned type `{referenced}`")]
    SchemaIntegrity { referrer: String, referenced: String },
    /// The emitter rejected a type.
    #[error("failed to generate `{target}`: {message}")]
    Emit { target: String, message: String },
    /// Generated output could not be written.
    #[error("failed to write `{target}` to {}", .path.display())]
    Write {
        target: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the FileDescriptorSet codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid varint encoding")]
    InvalidVarint,
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    #[error("invalid wire type: {0}")]
    InvalidWireType(u8),
    #[error("deprecated group encoding not supported")]
    GroupEncoding,
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("length prefix {0} exceeds the maximum message size")]
    LengthOverflow(u64),
}

/// Truncate very long protoc output to keep build logs readable.
fn truncate(msg: &str) -> String {
    const MAX_LEN: usize = 1000;
    if msg.len() <= MAX_LEN {
        return msg.to_string();
    }
    let mut end = MAX_LEN;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &msg[..end])
}
