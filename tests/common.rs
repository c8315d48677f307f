#![allow(dead_code)]

use avrokit::{BinaryDeserializer, BinarySerializer, Schema, Value};
use std::str::FromStr;

pub(crate) fn schema(text: &str) -> Schema {
    Schema::from_str(text).unwrap()
}

// Encodes and decodes a value with schema-driven codecs, returning the
// decoded value.
pub(crate) fn roundtrip_natural(schema_text: &str, value: &Value) -> Value {
    let schema = schema(schema_text);
    let serializer = BinarySerializer::natural(&schema).unwrap();
    let deserializer = BinaryDeserializer::natural(&schema).unwrap();
    let buf = serializer.to_bytes(value).unwrap();
    deserializer.deserialize(&mut buf.as_slice()).unwrap()
}
