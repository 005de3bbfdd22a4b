use protoflex::codec::binary::{deserialize, deserialize_with_options, serialize, BinaryDeserializeOptions};
use protoflex::{
    DynamicMessage, EnumDescriptorBuilder, FieldDescriptorBuilder, FieldType, FileDescriptorBuilder,
    MapKey, MessageDescriptor, MessageDescriptorBuilder, TypeRegistry, Value,
};

fn single_message(fields: Vec<FieldDescriptorBuilder>) -> MessageDescriptor {
    let mut builder = MessageDescriptorBuilder::new("M");
    for field in fields {
        builder = builder.field(field);
    }
    FileDescriptorBuilder::new("test.proto", "pkg")
        .message(builder)
        .build()
        .unwrap()
        .messages()
        .next()
        .unwrap()
        .clone()
}

#[test]
fn s1_s2_s3_s4_scenarios() {
    let string_msg = single_message(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);
    let mut m = DynamicMessage::new(string_msg);
    m.set_field_by_number(1, Value::String("hello".into())).unwrap();
    assert_eq!(serialize(&m).unwrap(), vec![0x0A, 0x05, b'h', b'e', b'l', b'l', b'o']);

    let int_msg = single_message(vec![FieldDescriptorBuilder::new("i", 1, FieldType::Int32)]);
    let mut m = DynamicMessage::new(int_msg);
    m.set_field_by_number(1, Value::I32(150)).unwrap();
    assert_eq!(serialize(&m).unwrap(), vec![0x08, 0x96, 0x01]);

    let repeated_msg = single_message(vec![FieldDescriptorBuilder::new("r", 4, FieldType::Int32).repeated()]);
    let mut m = DynamicMessage::new(repeated_msg);
    m.set_field_by_number(4, Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3)]))
        .unwrap();
    assert_eq!(serialize(&m).unwrap(), vec![0x22, 0x03, 0x01, 0x02, 0x03]);

    let map_msg = single_message(vec![FieldDescriptorBuilder::new("m", 7, FieldType::Message)
        .map(FieldType::String, FieldType::Int32, None)]);
    let mut m = DynamicMessage::new(map_msg);
    let mut map = std::collections::HashMap::new();
    map.insert(MapKey::String("k".into()), Value::I32(42));
    m.set_field_by_number(7, Value::Map(map)).unwrap();
    assert_eq!(serialize(&m).unwrap(), vec![0x3A, 0x05, 0x0A, 0x01, b'k', 0x10, 0x2A]);
}

#[test]
fn round_trip_preserves_field_number_order() {
    let descriptor = single_message(vec![
        FieldDescriptorBuilder::new("c", 3, FieldType::Int32),
        FieldDescriptorBuilder::new("a", 1, FieldType::Int32),
        FieldDescriptorBuilder::new("b", 2, FieldType::Int32),
    ]);
    let mut message = DynamicMessage::new(descriptor.clone());
    message.set_field_by_number(3, Value::I32(3)).unwrap();
    message.set_field_by_number(1, Value::I32(1)).unwrap();
    message.set_field_by_number(2, Value::I32(2)).unwrap();

    let bytes = serialize(&message).unwrap();
    let field_numbers: Vec<u32> = bytes
        .iter()
        .step_by(3)
        .map(|tag| (*tag as u32) >> 3)
        .collect();
    assert_eq!(field_numbers, vec![1, 2, 3]);

    let decoded = deserialize(&bytes, &descriptor).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn truncation_of_nonempty_message_fails() {
    let descriptor = single_message(vec![FieldDescriptorBuilder::new("s", 1, FieldType::String)]);
    let mut message = DynamicMessage::new(descriptor.clone());
    message.set_field_by_number(1, Value::String("protoflex".into())).unwrap();
    let bytes = serialize(&message).unwrap();
    for cut in 1..bytes.len() {
        let prefix = &bytes[..bytes.len() - cut];
        assert!(
            deserialize(prefix, &descriptor).is_err(),
            "truncating to {} bytes should fail to decode",
            prefix.len()
        );
    }
}

#[test]
fn oneof_exclusivity() {
    let descriptor = FileDescriptorBuilder::new("test.proto", "pkg")
        .message(
            MessageDescriptorBuilder::new("Choice")
                .oneof("kind")
                .field(FieldDescriptorBuilder::new("a", 1, FieldType::Int32).oneof_index(0))
                .field(FieldDescriptorBuilder::new("b", 2, FieldType::String).oneof_index(0)),
        )
        .build()
        .unwrap()
        .messages()
        .next()
        .unwrap()
        .clone();

    let mut message = DynamicMessage::new(descriptor);
    message.set_field_by_number(1, Value::I32(1)).unwrap();
    message.set_field_by_number(2, Value::String("x".into())).unwrap();
    assert!(!message.has_field_by_number(1));
    assert!(message.has_field_by_number(2));
}

#[test]
fn nested_message_round_trips_through_registry() {
    let registry = TypeRegistry::new();

    let child_file = FileDescriptorBuilder::new("child.proto", "pkg")
        .message(
            MessageDescriptorBuilder::new("Child")
                .field(FieldDescriptorBuilder::new("label", 1, FieldType::String)),
        )
        .build()
        .unwrap();
    registry.register_file(child_file.clone()).unwrap();

    let parent_file = FileDescriptorBuilder::new("parent.proto", "pkg")
        .message(
            MessageDescriptorBuilder::new("Parent")
                .field(
                    FieldDescriptorBuilder::new("child", 1, FieldType::Message).type_name("pkg.Child"),
                )
                .field(FieldDescriptorBuilder::new("count", 2, FieldType::Int32)),
        )
        .build()
        .unwrap();
    registry.register_file(parent_file.clone()).unwrap();

    let parent_descriptor = registry.resolve_message("pkg.Parent").unwrap();
    let child_descriptor = registry.resolve_message("pkg.Child").unwrap();

    let mut child = DynamicMessage::new(child_descriptor);
    child.set_field_by_number(1, Value::String("leaf".into())).unwrap();

    let mut parent = DynamicMessage::new(parent_descriptor.clone());
    parent.set_field_by_number(1, Value::Message(child)).unwrap();
    parent.set_field_by_number(2, Value::I32(7)).unwrap();

    let bytes = serialize(&parent).unwrap();
    let decoded = deserialize_with_options(
        &bytes,
        &parent_descriptor,
        &BinaryDeserializeOptions::default(),
        Some(&registry),
    )
    .unwrap();
    assert_eq!(decoded, parent);
}

#[test]
fn enum_field_round_trips() {
    let enum_type = EnumDescriptorBuilder::new("Status").value("OK", 0).value("FAIL", 1);
    let file = FileDescriptorBuilder::new("test.proto", "pkg")
        .enum_type(enum_type)
        .message(
            MessageDescriptorBuilder::new("M")
                .field(FieldDescriptorBuilder::new("status", 1, FieldType::Enum).type_name("pkg.Status")),
        )
        .build()
        .unwrap();
    let descriptor = file.messages().next().unwrap().clone();
    let mut message = DynamicMessage::new(descriptor.clone());
    message.set_field_by_number(1, Value::EnumNumber(1)).unwrap();
    let bytes = serialize(&message).unwrap();
    let decoded = deserialize(&bytes, &descriptor).unwrap();
    assert_eq!(decoded, message);
}
