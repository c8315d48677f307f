//! A record schema that contains itself through an array field, compiled
//! against a matching self-referential host type.

use avrokit::resolver::{Resolver, StructDescriptor, TypeDescriptor};
use avrokit::{BinaryDeserializer, BinarySerializer, Record, Schema, Value};
use std::str::FromStr;

fn node(value: i32, children: Vec<Value>) -> Value {
    let mut rec = Record::new("Node");
    rec.insert("value", value).unwrap();
    rec.insert("children", Value::Array(children)).unwrap();
    Value::Record(rec)
}

fn main() -> Result<(), anyhow::Error> {
    let schema = Schema::from_str(
        r##"{
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "children", "type": {"type": "array", "items": "Node"}}
            ]
        }"##,
    )?;

    let descriptor = StructDescriptor::new("Node")
        .field(
            "value",
            TypeDescriptor::Integer {
                size: 4,
                signed: true,
            },
        )
        .field(
            "children",
            TypeDescriptor::list(TypeDescriptor::reference("Node")),
        )
        .build();
    let resolution = Resolver::new().resolve(&descriptor)?;

    let serializer = BinarySerializer::compile(&schema, &resolution)?;
    let deserializer = BinaryDeserializer::compile(&schema, &resolution)?;

    let tree = node(5, vec![node(4, vec![]), node(7, vec![node(6, vec![])])]);
    let bytes = serializer.to_bytes(&tree)?;
    let decoded = deserializer.deserialize(&mut bytes.as_slice())?;
    assert_eq!(tree, decoded);
    println!("round-tripped a tree through {} bytes", bytes.len());

    Ok(())
}
