//! Directory fixture types and specs shared by the crate's tests.

use std::sync::Once;

use prost::Message as _;
use prost_reflect::{DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
};
use rusqlite::Connection;

use crate::{Column, Index, ProtoTable, Strength};

static INSTALL: Once = Once::new();

/// Register the fixture types with the global registry, once per process.
pub fn install_descriptors() {
    INSTALL.call_once(|| {
        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("directory.proto".to_string()),
                package: Some("directory".to_string()),
                syntax: Some("proto2".to_string()),
                message_type: vec![DescriptorProto {
                    name: Some("Employee".to_string()),
                    field: vec![
                        field("name", 1, Label::Optional, Type::String),
                        field("badge", 2, Label::Optional, Type::Int64),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        proto_sqlite::registry::load_descriptor_set(&set.encode_to_vec()).unwrap();
    });
}

/// An in-memory database with the `protobuf_*` functions registered.
pub fn connection() -> Connection {
    install_descriptors();
    let conn = Connection::open_in_memory().unwrap();
    proto_sqlite::register(&conn).unwrap();
    conn
}

pub fn spec() -> ProtoTable {
    ProtoTable {
        table: "people".to_string(),
        message: "directory.Employee".to_string(),
        columns: vec![
            Column {
                name: "full_name".to_string(),
                sql_type: "TEXT".to_string(),
                path: "$.name".to_string(),
                strength: Strength::Strong,
            },
            Column {
                name: "badge".to_string(),
                sql_type: "INTEGER".to_string(),
                path: "$.badge".to_string(),
                strength: Strength::Weak,
            },
        ],
        indexes: vec![Index {
            suffix: "by_badge".to_string(),
            components: vec!["badge".to_string(), "id DESC".to_string()],
        }],
    }
}

pub fn employee_message(name: &str, badge: i64) -> DynamicMessage {
    let descriptor = proto_sqlite::registry::message_by_name("directory.Employee").unwrap();
    let mut message = DynamicMessage::new(descriptor);
    message.set_field_by_name("name", Value::String(name.to_string()));
    message.set_field_by_name("badge", Value::I64(badge));
    message
}

pub fn employee(name: &str, badge: i64) -> Vec<u8> {
    employee_message(name, badge).encode_to_vec()
}

fn field(name: &str, number: i32, label: Label, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(r#type as i32),
        ..Default::default()
    }
}
