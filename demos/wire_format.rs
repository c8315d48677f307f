//! Wrap a compiled codec in the schema-registry wire envelope.

use avrokit::wire::{WireDeserializer, WireSerializer};
use avrokit::{to_value, Schema};
use std::str::FromStr;

fn main() -> Result<(), anyhow::Error> {
    let schema = Schema::from_str(r##""string""##)?;

    let serializer = WireSerializer::natural(12, &schema)?;
    let payload = serializer.to_bytes(&to_value(&"sup")?)?;
    println!("payload: {:?}", payload);

    let deserializer = WireDeserializer::natural(12, &schema)?;
    let value = deserializer.deserialize(&payload)?;
    println!("decoded: {:?}", value);

    // a deserializer bound to another id refuses the payload
    let other = WireDeserializer::natural(11, &schema)?;
    assert!(other.deserialize(&payload).is_err());

    Ok(())
}
