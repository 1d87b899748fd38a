//! Address-book fixture types, constructed programmatically so tests
//! need no on-disk descriptors or protoc invocation.

use std::sync::Once;

use prost::Message as _;
use prost_reflect::{DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet,
};

static INSTALL: Once = Once::new();

/// Register the fixture types with the global registry, once per process.
pub fn install() {
    INSTALL.call_once(|| {
        let set = file_descriptor_set();
        crate::registry::load_descriptor_set(&set.encode_to_vec()).unwrap();
    });
}

/// Build and encode an `addressbook.Person`.
pub fn person(f: impl FnOnce(&mut DynamicMessage)) -> Vec<u8> {
    let descriptor = crate::registry::message_by_name("addressbook.Person").unwrap();
    let mut message = DynamicMessage::new(descriptor);
    f(&mut message);
    message.encode_to_vec()
}

/// Build an `addressbook.Phone` list element.
pub fn phone(number: &str, phone_type: i32) -> Value {
    let descriptor = crate::registry::message_by_name("addressbook.Phone").unwrap();
    let mut message = DynamicMessage::new(descriptor);
    message.set_field_by_name("number", Value::String(number.to_string()));
    message.set_field_by_name("type", Value::EnumNumber(phone_type));
    Value::Message(message)
}

fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("addressbook.proto".to_string()),
            package: Some("addressbook".to_string()),
            syntax: Some("proto2".to_string()),
            message_type: vec![
                DescriptorProto {
                    name: Some("Phone".to_string()),
                    field: vec![
                        field("number", 1, Label::Optional, Type::String, None, None),
                        field(
                            "type",
                            2,
                            Label::Optional,
                            Type::Enum,
                            Some(".addressbook.PhoneType"),
                            None,
                        ),
                    ],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("Company".to_string()),
                    field: vec![field("name", 1, Label::Optional, Type::String, None, None)],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("Person".to_string()),
                    field: vec![
                        field("name", 1, Label::Optional, Type::String, None, None),
                        field("age", 2, Label::Optional, Type::Int32, None, Some("42")),
                        field(
                            "phones",
                            3,
                            Label::Repeated,
                            Type::Message,
                            Some(".addressbook.Phone"),
                            None,
                        ),
                        field("verified", 4, Label::Optional, Type::Bool, None, None),
                        field("token", 5, Label::Optional, Type::Uint64, None, None),
                        field("height", 6, Label::Optional, Type::Double, None, None),
                        field("avatar", 7, Label::Optional, Type::Bytes, None, None),
                        field(
                            "employer",
                            8,
                            Label::Optional,
                            Type::Message,
                            Some(".addressbook.Company"),
                            None,
                        ),
                        field(
                            "favorite",
                            9,
                            Label::Optional,
                            Type::Enum,
                            Some(".addressbook.PhoneType"),
                            None,
                        ),
                    ],
                    ..Default::default()
                },
            ],
            enum_type: vec![EnumDescriptorProto {
                name: Some("PhoneType".to_string()),
                value: vec![
                    EnumValueDescriptorProto {
                        name: Some("MOBILE".to_string()),
                        number: Some(0),
                        ..Default::default()
                    },
                    EnumValueDescriptorProto {
                        name: Some("HOME".to_string()),
                        number: Some(1),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn field(
    name: &str,
    number: i32,
    label: Label,
    r#type: Type,
    type_name: Option<&str>,
    default_value: Option<&str>,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(r#type as i32),
        type_name: type_name.map(str::to_string),
        default_value: default_value.map(str::to_string),
        ..Default::default()
    }
}
