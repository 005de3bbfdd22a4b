use protoflex::codec::json::{deserialize, deserialize_with_options, serialize, serialize_with_options, JsonDeserializeOptions, JsonSerializeOptions};
use protoflex::{
    DynamicMessage, FieldDescriptorBuilder, FieldType, FileDescriptorBuilder, MessageDescriptor,
    MessageDescriptorBuilder, TypeRegistry, Value,
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
fn s5_int64_as_string_round_trips() {
    let descriptor = single_message(vec![FieldDescriptorBuilder::new("big_num", 1, FieldType::Int64)]);
    let mut message = DynamicMessage::new(descriptor.clone());
    message.set_field_by_number(1, Value::I64(9007199254740993)).unwrap();

    let json = serialize(&message).unwrap();
    assert_eq!(json, r#"{"bigNum":"9007199254740993"}"#);

    let decoded = deserialize(&json, &descriptor).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn s6_special_floats_round_trip() {
    let descriptor = single_message(vec![FieldDescriptorBuilder::new("value", 1, FieldType::Double)]);

    for (literal, value) in [
        ("NaN", f64::NAN),
        ("Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        let mut message = DynamicMessage::new(descriptor.clone());
        message.set_field_by_number(1, Value::F64(value)).unwrap();
        let json = serialize(&message).unwrap();
        assert_eq!(json, format!(r#"{{"value":"{}"}}"#, literal));

        let decoded = deserialize(&json, &descriptor).unwrap();
        let decoded_value = decoded.get_field_by_number(1).unwrap().as_f64().unwrap();
        if value.is_nan() {
            assert!(decoded_value.is_nan());
        } else {
            assert_eq!(decoded_value, value);
        }
    }
}

#[test]
fn round_trip_without_nested_messages() {
    let descriptor = single_message(vec![
        FieldDescriptorBuilder::new("name", 1, FieldType::String),
        FieldDescriptorBuilder::new("tags", 2, FieldType::String).repeated(),
        FieldDescriptorBuilder::new("active", 3, FieldType::Bool),
        FieldDescriptorBuilder::new("score", 4, FieldType::Float),
    ]);
    let mut message = DynamicMessage::new(descriptor.clone());
    message.set_field_by_number(1, Value::String("ada".into())).unwrap();
    message
        .set_field_by_number(
            2,
            Value::List(vec![Value::String("x".into()), Value::String("y".into())]),
        )
        .unwrap();
    message.set_field_by_number(3, Value::Bool(true)).unwrap();
    message.set_field_by_number(4, Value::F32(1.5)).unwrap();

    let json = serialize(&message).unwrap();
    let decoded = deserialize(&json, &descriptor).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn unknown_fields_ignored_by_default_rejected_when_disabled() {
    let descriptor = single_message(vec![FieldDescriptorBuilder::new("name", 1, FieldType::String)]);
    let json = r#"{"name":"ada","extra":true}"#;

    assert!(deserialize(json, &descriptor).is_ok());

    let strict = JsonDeserializeOptions::new().ignore_unknown_fields(false);
    assert!(deserialize_with_options(json, &descriptor, &strict, None).is_err());
}

#[test]
fn nested_message_resolves_through_registry() {
    let registry = TypeRegistry::new();
    let child_file = FileDescriptorBuilder::new("child.proto", "pkg")
        .message(
            MessageDescriptorBuilder::new("Child")
                .field(FieldDescriptorBuilder::new("label", 1, FieldType::String)),
        )
        .build()
        .unwrap();
    registry.register_file(child_file).unwrap();

    let parent_file = FileDescriptorBuilder::new("parent.proto", "pkg")
        .message(
            MessageDescriptorBuilder::new("Parent")
                .field(FieldDescriptorBuilder::new("child", 1, FieldType::Message).type_name("pkg.Child")),
        )
        .build()
        .unwrap();
    registry.register_file(parent_file).unwrap();

    let parent_descriptor = registry.resolve_message("pkg.Parent").unwrap();
    let json = r#"{"child":{"label":"leaf"}}"#;
    let decoded = deserialize_with_options(
        json,
        &parent_descriptor,
        &JsonDeserializeOptions::default(),
        Some(&registry),
    )
    .unwrap();

    let child_value = decoded.get_field_by_number(1).unwrap().as_message().unwrap();
    assert_eq!(child_value.get_field_by_number(1).unwrap().as_str(), Some("leaf"));
}

#[test]
fn original_field_names_option_uses_proto_names() {
    let descriptor = single_message(vec![FieldDescriptorBuilder::new("full_name", 1, FieldType::String)]);
    let mut message = DynamicMessage::new(descriptor);
    message.set_field_by_number(1, Value::String("grace".into())).unwrap();
    let json = serialize_with_options(&message, &JsonSerializeOptions::new().use_original_field_names(true)).unwrap();
    assert_eq!(json, r#"{"full_name":"grace"}"#);
}

#[test]
fn map_field_round_trips_with_sorted_keys() {
    let descriptor = single_message(vec![FieldDescriptorBuilder::new("counts", 1, FieldType::Message)
        .map(FieldType::String, FieldType::Int32, None)]);
    let mut message = DynamicMessage::new(descriptor.clone());
    let mut map = std::collections::HashMap::new();
    map.insert(protoflex::MapKey::String("b".into()), Value::I32(2));
    map.insert(protoflex::MapKey::String("a".into()), Value::I32(1));
    message.set_field_by_number(1, Value::Map(map)).unwrap();

    let json = serialize(&message).unwrap();
    assert_eq!(json, r#"{"counts":{"a":1,"b":2}}"#);

    let decoded = deserialize(&json, &descriptor).unwrap();
    assert_eq!(decoded, message);
}
