//! Builders for encoded descriptors used by unit tests.

use bytes::{Bytes, BytesMut};

pub(crate) use super::encode::{put_len_field, put_string_field, put_varint, put_varint_field};

pub(crate) const TYPE_INT64: i32 = 3;
pub(crate) const TYPE_STRING: i32 = 9;
pub(crate) const TYPE_MESSAGE: i32 = 11;
pub(crate) const TYPE_ENUM: i32 = 14;

/// An encoded FieldDescriptorProto.
pub(crate) fn field(name: &str, number: i32, r#type: i32, type_name: Option<&str>) -> Bytes {
    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 1, name);
    put_varint_field(&mut buf, 3, number as u64);
    put_varint_field(&mut buf, 4, 1);
    put_varint_field(&mut buf, 5, r#type as u64);
    if let Some(type_name) = type_name {
        put_string_field(&mut buf, 6, type_name);
    }
    buf.freeze()
}

/// An encoded extension FieldDescriptorProto.
pub(crate) fn extension(
    name: &str,
    number: i32,
    r#type: i32,
    type_name: Option<&str>,
    extendee: &str,
) -> Bytes {
    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 2, extendee);
    buf.extend_from_slice(&field(name, number, r#type, type_name));
    buf.freeze()
}

/// An encoded DescriptorProto.
pub(crate) fn message(name: &str, fields: &[Bytes], nested: &[Bytes], enums: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 1, name);
    for field in fields {
        put_len_field(&mut buf, 2, field);
    }
    for nested in nested {
        put_len_field(&mut buf, 3, nested);
    }
    for enumeration in enums {
        put_len_field(&mut buf, 4, enumeration);
    }
    buf.freeze()
}

/// An encoded EnumDescriptorProto with a single zero value.
pub(crate) fn enumeration(name: &str) -> Bytes {
    let mut value = BytesMut::new();
    put_string_field(&mut value, 1, &format!("{}_UNSPECIFIED", name.to_uppercase()));
    put_varint_field(&mut value, 2, 0);

    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 1, name);
    put_len_field(&mut buf, 2, &value);
    buf.freeze()
}

/// An encoded MethodDescriptorProto.
pub(crate) fn method(name: &str, input: &str, output: &str) -> Bytes {
    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 1, name);
    put_string_field(&mut buf, 2, input);
    put_string_field(&mut buf, 3, output);
    buf.freeze()
}

/// An encoded ServiceDescriptorProto.
pub(crate) fn service(name: &str, methods: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 1, name);
    for method in methods {
        put_len_field(&mut buf, 2, method);
    }
    buf.freeze()
}

/// An encoded proto3 FileDescriptorProto.
pub(crate) fn file(
    name: &str,
    package: &str,
    dependencies: &[&str],
    messages: &[Bytes],
    enums: &[Bytes],
    services: &[Bytes],
) -> Bytes {
    let mut buf = BytesMut::new();
    put_string_field(&mut buf, 1, name);
    if !package.is_empty() {
        put_string_field(&mut buf, 2, package);
    }
    for dependency in dependencies {
        put_string_field(&mut buf, 3, dependency);
    }
    for message in messages {
        put_len_field(&mut buf, 4, message);
    }
    for enumeration in enums {
        put_len_field(&mut buf, 5, enumeration);
    }
    for service in services {
        put_len_field(&mut buf, 6, service);
    }
    put_string_field(&mut buf, 12, "proto3");
    buf.freeze()
}

/// An encoded SourceCodeInfo.Location with a packed path and a leading comment.
pub(crate) fn location(path: &[i32], leading_comment: &str) -> Bytes {
    let mut packed = BytesMut::new();
    for element in path {
        put_varint(&mut packed, *element as u64);
    }
    let mut buf = BytesMut::new();
    put_len_field(&mut buf, 1, &packed);
    put_string_field(&mut buf, 3, leading_comment);
    buf.freeze()
}

/// An encoded SourceCodeInfo.
pub(crate) fn source_code_info(locations: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    for location in locations {
        put_len_field(&mut buf, 1, location);
    }
    buf.freeze()
}

/// `file` with extra encoded fields appended.
pub(crate) fn with_fields(file: Bytes, extra: impl FnOnce(&mut BytesMut)) -> Bytes {
    let mut buf = BytesMut::from(&file[..]);
    extra(&mut buf);
    buf.freeze()
}

/// An encoded FileDescriptorSet.
pub(crate) fn file_set(files: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    for file in files {
        put_len_field(&mut buf, 1, file);
    }
    buf.freeze()
}
