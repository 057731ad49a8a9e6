//! Encoder for writing a (pruned) schema back as a FileDescriptorSet.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use log::debug;

use super::decode::WireType;
use super::{FieldDescriptorProto, FileDescriptorProto, SourceCodeInfo};
use crate::schema::{ProtoFile, Schema, TypeKind};

/// Encode `schema` as a google.protobuf.FileDescriptorSet.
///
/// Types are written from their original encoded bodies. Imports of files that
/// are no longer part of the schema are replaced by whatever those files
/// re-exported with `import public`, and public/weak import indexes are
/// renumbered. File-level extensions whose extendee or field type was pruned
/// are dropped, and source locations are renumbered to match.
pub fn encode_schema(schema: &Schema) -> Bytes {
    let mut out = BytesMut::new();
    for file in schema.files() {
        let body = encode_file(schema, file);
        put_len_field(&mut out, 1, &body);
    }
    out.freeze()
}

/// Old list index -> new list index, keyed by FileDescriptorProto field number.
///
/// Elements missing from a list's map were dropped.
type Renumbering = HashMap<i32, HashMap<i32, i32>>;

fn encode_file(schema: &Schema, file: &ProtoFile) -> BytesMut {
    let descriptor = file.descriptor();
    let mut buf = BytesMut::new();
    let mut renumbering = Renumbering::new();

    if let Some(name) = &descriptor.name {
        put_string_field(&mut buf, 1, name);
    }
    if let Some(package) = &descriptor.package {
        put_string_field(&mut buf, 2, package);
    }

    let imports = Imports::rebuild(schema, descriptor);
    for dependency in &imports.dependency {
        put_string_field(&mut buf, 3, dependency);
    }

    for field_number in [4, 5, 6] {
        renumbering.insert(field_number, HashMap::new());
    }
    for node in file.types().iter().filter(|node| node.is_top_level()) {
        let (field_number, encoded) = match node.kind() {
            TypeKind::Message(message) => (4, &message.encoded),
            TypeKind::Enum(enumeration) => (5, &enumeration.encoded),
            TypeKind::Service(service) => (6, &service.encoded),
        };
        let kept = renumbering.entry(field_number).or_default();
        kept.insert(node.index() as i32, kept.len() as i32);
        put_len_field(&mut buf, field_number as u32, encoded);
    }

    let kept = renumbering.entry(7).or_default();
    for (index, extension) in descriptor.extension.iter().enumerate() {
        if extension_survives(extension, schema) {
            kept.insert(index as i32, kept.len() as i32);
            put_len_field(&mut buf, 7, &extension.encoded);
        } else {
            debug!(
                "Dropping extension {} from {}",
                extension.name.as_deref().unwrap_or_default(),
                file.name()
            );
        }
    }

    renumbering.insert(3, imports.renumbered.clone());
    renumbering.insert(
        10,
        positions(&descriptor.public_dependency, &imports.renumbered, &imports.public),
    );
    renumbering.insert(
        11,
        positions(&descriptor.weak_dependency, &imports.renumbered, &imports.weak),
    );
    if let Some(info) = &descriptor.source_code_info {
        put_len_field(&mut buf, 9, &encode_source_code_info(info, &renumbering));
    }

    for (field_number, indexes) in [(10, &imports.public), (11, &imports.weak)] {
        for index in indexes {
            put_varint_field(&mut buf, field_number, *index as u64);
        }
    }

    if let Some(syntax) = &descriptor.syntax {
        put_string_field(&mut buf, 12, syntax);
    }
    buf.put_slice(&descriptor.unknown_fields);

    buf
}

/// A file's import list after pruning.
#[derive(Debug, Default)]
struct Imports<'a> {
    dependency: Vec<&'a str>,
    /// Indexes into `dependency`.
    public: Vec<i32>,
    /// Indexes into `dependency`.
    weak: Vec<i32>,
    /// Old dependency index -> new dependency index, for imports that survived.
    renumbered: HashMap<i32, i32>,
}

impl<'a> Imports<'a> {
    /// Keep imports of files still in `schema`. An import of a dropped file is
    /// replaced by the surviving files it re-exported, keeping its publicity.
    fn rebuild(schema: &'a Schema, descriptor: &'a FileDescriptorProto) -> Self {
        let mut imports = Self::default();
        let mut forwarded_public = Vec::new();

        for (index, dependency) in descriptor.dependency.iter().enumerate() {
            let index = index as i32;
            if schema.file(dependency).is_some() {
                let new_index = imports.add(dependency);
                imports.renumbered.insert(index, new_index);
                continue;
            }

            let forwarded = schema.public_reexports(dependency);
            if forwarded.is_empty() {
                debug!("Dropping import of pruned file {dependency}");
            }
            for reexport in forwarded {
                debug!("Importing {reexport} in place of pruned file {dependency}");
                let new_index = imports.add(reexport);
                if descriptor.public_dependency.contains(&index) {
                    forwarded_public.push(new_index);
                }
            }
        }

        let kept_public: Vec<i32> = descriptor
            .public_dependency
            .iter()
            .filter_map(|index| imports.renumbered.get(index).copied())
            .collect();
        for new_index in kept_public.into_iter().chain(forwarded_public) {
            if !imports.public.contains(&new_index) {
                imports.public.push(new_index);
            }
        }
        imports.weak = descriptor
            .weak_dependency
            .iter()
            .filter_map(|index| imports.renumbered.get(index).copied())
            .collect();
        imports
    }

    /// Index of `dependency`, appending it if not yet imported.
    fn add(&mut self, dependency: &'a str) -> i32 {
        let index = match self.dependency.iter().position(|d| *d == dependency) {
            Some(index) => index,
            None => {
                self.dependency.push(dependency);
                self.dependency.len() - 1
            }
        };
        index as i32
    }
}

/// Renumbering of a public/weak index list: old position -> new position.
fn positions(
    old: &[i32],
    renumbered: &HashMap<i32, i32>,
    new: &[i32],
) -> HashMap<i32, i32> {
    old.iter()
        .enumerate()
        .filter_map(|(position, index)| {
            let new_index = renumbered.get(index)?;
            let new_position = new.iter().position(|i| i == new_index)?;
            Some((position as i32, new_position as i32))
        })
        .collect()
}

/// Drop locations of removed elements and renumber the rest.
fn encode_source_code_info(info: &SourceCodeInfo, renumbering: &Renumbering) -> BytesMut {
    let mut buf = BytesMut::new();
    for location in &info.location {
        match renumber_path(&location.path, renumbering) {
            None => {}
            Some(path) if path == location.path => put_len_field(&mut buf, 1, &location.encoded),
            Some(path) => {
                let mut body = BytesMut::new();
                put_packed_field(&mut body, 1, &path);
                body.put_slice(&location.rest);
                put_len_field(&mut buf, 1, &body);
            }
        }
    }
    buf.put_slice(&info.unknown_fields);
    buf
}

/// `None` when the path points into an element that no longer exists.
fn renumber_path(path: &[i32], renumbering: &Renumbering) -> Option<Vec<i32>> {
    match path {
        [field_number, index, rest @ ..] => match renumbering.get(field_number) {
            Some(kept) => {
                let mut path = vec![*field_number, *kept.get(index)?];
                path.extend_from_slice(rest);
                Some(path)
            }
            None => Some(path.to_vec()),
        },
        _ => Some(path.to_vec()),
    }
}

/// An extension survives when both the extended type and its field type do.
fn extension_survives(extension: &FieldDescriptorProto, schema: &Schema) -> bool {
    let resolves = |name: Option<&str>| name.map_or(true, |name| schema.get(name).is_some());
    resolves(extension.extendee.as_deref()) && resolves(extension.referenced_type())
}

pub(crate) fn put_key(buf: &mut impl BufMut, field_number: u32, wire_type: WireType) {
    put_varint(buf, (u64::from(field_number) << 3) | wire_type as u64);
}

pub(crate) fn put_varint(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub(crate) fn put_varint_field(buf: &mut impl BufMut, field_number: u32, value: u64) {
    put_key(buf, field_number, WireType::Varint);
    put_varint(buf, value);
}

pub(crate) fn put_len_field(buf: &mut impl BufMut, field_number: u32, value: &[u8]) {
    put_key(buf, field_number, WireType::Len);
    put_varint(buf, value.len() as u64);
    buf.put_slice(value);
}

pub(crate) fn put_string_field(buf: &mut impl BufMut, field_number: u32, value: &str) {
    put_len_field(buf, field_number, value.as_bytes());
}

fn put_packed_field(buf: &mut impl BufMut, field_number: u32, values: &[i32]) {
    let mut packed = BytesMut::new();
    for value in values {
        put_varint(&mut packed, *value as u64);
    }
    put_len_field(buf, field_number, &packed);
}
