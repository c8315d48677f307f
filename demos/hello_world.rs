//! Compile a codec pair for a primitive schema and round-trip a value.

use avrokit::{from_value, to_value, BinaryDeserializer, BinarySerializer, Schema};
use std::str::FromStr;

fn main() -> Result<(), anyhow::Error> {
    let schema = Schema::from_str(r##""string""##)?;

    let serializer = BinarySerializer::natural(&schema)?;
    let deserializer = BinaryDeserializer::natural(&schema)?;

    let bytes = serializer.to_bytes(&to_value(&"hello world")?)?;
    let value = deserializer.deserialize(&mut bytes.as_slice())?;
    let decoded: String = from_value(&value)?;
    println!("{}", decoded);

    Ok(())
}
