//! Pairing schemas with host-type resolutions: recursive records and
//! reader/writer field drift.

mod common;

use avrokit::resolver::{HostType, Resolver, StructDescriptor, TypeDescriptor};
use avrokit::{BinaryDeserializer, BinarySerializer, Record, Value};
use common::schema;

fn int_descriptor() -> TypeDescriptor {
    i32::descriptor()
}

///////////////////////////////////////////////////////////////////////////////
/// Recursive records
///////////////////////////////////////////////////////////////////////////////

fn node(value: i32, children: Vec<Value>) -> Value {
    let mut rec = Record::new("Node");
    rec.insert("value", value).unwrap();
    rec.insert("children", Value::Array(children)).unwrap();
    Value::Record(rec)
}

#[test]
fn recursive_record_roundtrips() {
    let s = schema(
        r##"{
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "children", "type": {"type": "array", "items": "Node"}}
            ]
        }"##,
    );

    let descriptor = StructDescriptor::new("Node")
        .field("value", int_descriptor())
        .field(
            "children",
            TypeDescriptor::list(TypeDescriptor::reference("Node")),
        )
        .build();
    let resolution = Resolver::new().resolve(&descriptor).unwrap();

    let serializer = BinarySerializer::compile(&s, &resolution).unwrap();
    let deserializer = BinaryDeserializer::compile(&s, &resolution).unwrap();

    let tree = node(
        5,
        vec![
            node(4, vec![]),
            node(7, vec![node(6, vec![]), node(8, vec![])]),
        ],
    );

    let buf = serializer.to_bytes(&tree).unwrap();
    let decoded = deserializer.deserialize(&mut buf.as_slice()).unwrap();
    assert_eq!(tree, decoded);
}

#[test]
fn mutually_recursive_schema_compiles() {
    let s = schema(
        r##"{
            "type": "record",
            "name": "Tree",
            "fields": [
                {"name": "label", "type": "string"},
                {"name": "left", "type": ["null", "Tree"]},
                {"name": "right", "type": ["null", "Tree"]}
            ]
        }"##,
    );

    let serializer = BinarySerializer::natural(&s).unwrap();
    let deserializer = BinaryDeserializer::natural(&s).unwrap();

    let mut leaf = Record::new("Tree");
    leaf.insert("label", "leaf").unwrap();
    leaf.insert("left", Value::Null).unwrap();
    leaf.insert("right", Value::Null).unwrap();

    let mut root = Record::new("Tree");
    root.insert("label", "root").unwrap();
    root.insert("left", Value::Record(leaf)).unwrap();
    root.insert("right", Value::Null).unwrap();
    let root = Value::Record(root);

    let buf = serializer.to_bytes(&root).unwrap();
    assert_eq!(deserializer.deserialize(&mut buf.as_slice()).unwrap(), root);
}

///////////////////////////////////////////////////////////////////////////////
/// Missing-field skipping
///////////////////////////////////////////////////////////////////////////////

// The writer's schema interleaves four field shapes twice; the reader's host
// type carries only the odd-numbered fields.
const WRITER_SCHEMA: &str = r##"{
    "type": "record",
    "name": "Everything",
    "fields": [
        {"name": "f1", "type": ["null", {"type": "array", "items": "boolean"}]},
        {"name": "f2", "type": {"type": "array", "items": "boolean"}},
        {"name": "f3", "type": {"type": "map", "values": "boolean"}},
        {"name": "f4", "type": "boolean"},
        {"name": "f5", "type": ["null", {"type": "array", "items": "boolean"}]},
        {"name": "f6", "type": {"type": "array", "items": "boolean"}},
        {"name": "f7", "type": {"type": "map", "values": "boolean"}},
        {"name": "f8", "type": "boolean"}
    ]
}"##;

fn full_value() -> Value {
    let mut map3 = std::collections::HashMap::new();
    map3.insert("k3".to_string(), Value::Boolean(true));
    let mut map7 = std::collections::HashMap::new();
    map7.insert("k7".to_string(), Value::Boolean(false));

    let mut rec = Record::new("Everything");
    rec.insert("f1", Value::Array(vec![Value::Boolean(true)]))
        .unwrap();
    rec.insert("f2", Value::Array(vec![Value::Boolean(false)]))
        .unwrap();
    rec.insert("f3", Value::Map(map3)).unwrap();
    rec.insert("f4", true).unwrap();
    rec.insert("f5", Value::Null).unwrap();
    rec.insert("f6", Value::Array(vec![])).unwrap();
    rec.insert("f7", Value::Map(map7)).unwrap();
    rec.insert("f8", false).unwrap();
    Value::Record(rec)
}

#[test]
fn writer_fields_absent_from_host_type_are_skipped() {
    let s = schema(WRITER_SCHEMA);
    let serializer = BinarySerializer::natural(&s).unwrap();
    let buf = serializer.to_bytes(&full_value()).unwrap();

    let bool_array = TypeDescriptor::list(TypeDescriptor::Boolean);
    let descriptor = StructDescriptor::new("Everything")
        .field("f1", TypeDescriptor::optional(bool_array.clone()))
        .field("f3", TypeDescriptor::dictionary(TypeDescriptor::Str, TypeDescriptor::Boolean))
        .field("f5", TypeDescriptor::optional(bool_array))
        .field("f7", TypeDescriptor::dictionary(TypeDescriptor::Str, TypeDescriptor::Boolean))
        .build();
    let resolution = Resolver::new().resolve(&descriptor).unwrap();

    let deserializer = BinaryDeserializer::compile(&s, &resolution).unwrap();
    let decoded = deserializer.deserialize(&mut buf.as_slice()).unwrap();
    let decoded = decoded.as_record().unwrap();

    // exactly the four host fields, populated with the written values
    assert_eq!(decoded.len(), 4);
    assert_eq!(
        decoded.get("f1").unwrap(),
        &Value::Array(vec![Value::Boolean(true)])
    );
    let f3 = decoded.get("f3").unwrap().as_map().unwrap();
    assert_eq!(f3.get("k3").unwrap(), &Value::Boolean(true));
    assert_eq!(decoded.get("f5").unwrap(), &Value::Null);
    let f7 = decoded.get("f7").unwrap().as_map().unwrap();
    assert_eq!(f7.get("k7").unwrap(), &Value::Boolean(false));
}

#[test]
fn host_fields_absent_from_writer_schema_surface_as_null() {
    let s = schema(
        r##"{
            "type": "record",
            "name": "Row",
            "fields": [{"name": "present", "type": "int"}]
        }"##,
    );
    let serializer = BinarySerializer::natural(&s).unwrap();
    let mut rec = Record::new("Row");
    rec.insert("present", 3).unwrap();
    let buf = serializer.to_bytes(&Value::Record(rec)).unwrap();

    let descriptor = StructDescriptor::new("Row")
        .field("present", int_descriptor())
        .field("added_later", TypeDescriptor::optional(TypeDescriptor::Str))
        .build();
    let resolution = Resolver::new().resolve(&descriptor).unwrap();

    let deserializer = BinaryDeserializer::compile(&s, &resolution).unwrap();
    let decoded = deserializer.deserialize(&mut buf.as_slice()).unwrap();
    let decoded = decoded.as_record().unwrap();
    assert_eq!(decoded.get("present").unwrap(), &Value::Int(3));
    assert_eq!(decoded.get("added_later").unwrap(), &Value::Null);
}
