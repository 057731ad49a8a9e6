//! Hand-encoded FileDescriptorSets for integration tests.

#![allow(dead_code)]

use bytes::{BufMut, Bytes, BytesMut};

const TYPE_MESSAGE: u64 = 11;

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn put_len(buf: &mut BytesMut, field: u64, value: &[u8]) {
    put_varint(buf, field << 3 | 2);
    put_varint(buf, value.len() as u64);
    buf.put_slice(value);
}

fn put_uint(buf: &mut BytesMut, field: u64, value: u64) {
    put_varint(buf, field << 3);
    put_varint(buf, value);
}

/// A message whose fields all reference other messages: `(field name, type name)`.
pub fn message(name: &str, fields: &[(&str, &str)]) -> Bytes {
    let mut buf = BytesMut::new();
    put_len(&mut buf, 1, name.as_bytes());
    for (number, (field_name, type_name)) in fields.iter().enumerate() {
        let mut field = BytesMut::new();
        put_len(&mut field, 1, field_name.as_bytes());
        put_uint(&mut field, 3, number as u64 + 1);
        put_uint(&mut field, 4, 1);
        put_uint(&mut field, 5, TYPE_MESSAGE);
        put_len(&mut field, 6, type_name.as_bytes());
        put_len(&mut buf, 2, &field);
    }
    buf.freeze()
}

/// A proto3 file.
pub fn file(name: &str, package: &str, dependencies: &[&str], messages: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    put_len(&mut buf, 1, name.as_bytes());
    put_len(&mut buf, 2, package.as_bytes());
    for dependency in dependencies {
        put_len(&mut buf, 3, dependency.as_bytes());
    }
    for message in messages {
        put_len(&mut buf, 4, message);
    }
    put_len(&mut buf, 12, b"proto3");
    buf.freeze()
}

pub fn file_set(files: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    for file in files {
        put_len(&mut buf, 1, file);
    }
    buf.freeze()
}

/// ```text
/// shop/order.proto   Order -> Money, Customer
///                    Legacy -> Money
/// shop/common.proto  Money, Customer, Unused
/// ```
pub fn shop() -> Bytes {
    file_set(&[
        file(
            "shop/common.proto",
            "shop",
            &[],
            &[
                message("Money", &[]),
                message("Customer", &[]),
                message("Unused", &[]),
            ],
        ),
        file(
            "shop/order.proto",
            "shop",
            &["shop/common.proto"],
            &[
                message(
                    "Order",
                    &[("total", ".shop.Money"), ("customer", ".shop.Customer")],
                ),
                message("Legacy", &[("total", ".shop.Money")]),
            ],
        ),
    ])
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
