//! Avrokit is an Avro serialization toolkit: it models Avro schemas, reads
//! and writes them as JSON (including Parsing Canonical Form), describes
//! host data types as structural resolutions, and compiles a schema together
//! with a resolution into binary encoders and decoders. A wire-format layer
//! adapts the compiled codecs to the schema-registry envelope used by
//! Kafka-family ecosystems.
//!
//! ## Encoding and decoding a datum
//!
//!```rust
//! use avrokit::{from_value, to_value, BinaryDeserializer, BinarySerializer, Schema};
//! use std::str::FromStr;
//! use anyhow::Error;
//!
//! fn main() -> Result<(), Error> {
//!     let schema = Schema::from_str(r##""string""##)?;
//!
//!     // schema-driven codecs; pair a schema with a type resolution via
//!     // BinarySerializer::compile to bind a specific host type instead
//!     let serializer = BinarySerializer::natural(&schema)?;
//!     let deserializer = BinaryDeserializer::natural(&schema)?;
//!
//!     let bytes = serializer.to_bytes(&to_value(&"hello")?)?;
//!     let value = deserializer.deserialize(&mut bytes.as_slice())?;
//!     let decoded: String = from_value(&value)?;
//!     assert_eq!(decoded, "hello");
//!     Ok(())
//! }
//!```
//!
//! ## The schema-registry wire format
//!
//! [`wire::WireSerializer`] and [`wire::WireDeserializer`] wrap compiled
//! codecs in the `{0x00, schema id}` envelope; [`wire::RegistryEncoder`] and
//! [`wire::RegistryDecoder`] fetch schemas from a [`wire::SchemaRegistry`]
//! client and cache one compiled codec per subject or id.

#![recursion_limit = "1024"]
#![deny(unused_must_use)]
#![deny(rust_2018_idioms)]

mod codec;
mod error;
pub mod resolver;
mod schema;
mod serde_avro;
mod util;
mod value;
pub mod wire;

pub use codec::BinaryDeserializer;
pub use codec::BinarySerializer;
pub use error::AvrokitErr;
pub use error::AvrokitResult;
pub use resolver::{HostType, Resolver, TypeDescriptor, TypeResolution};
pub use schema::CanonicalSchema;
pub use schema::Schema;
pub use serde_avro::from_value;
pub use serde_avro::to_value;
pub use value::Decimal;
pub use value::Duration;
pub use value::Record;
pub use value::Value;
