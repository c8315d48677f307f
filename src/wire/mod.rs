//! The Confluent-style wire format: a one-byte magic marker and a big-endian
//! schema id prepended to the Avro binary payload, plus the adapters that
//! pair it with a schema registry.

mod asynchronous;
mod registry;

pub use asynchronous::{
    wire_deserializer_for_id, wire_deserializer_for_subject, wire_serializer_for_id,
    wire_serializer_for_subject, RegistryDecoder, RegistryEncoder, SubjectNameStrategy,
    SubjectRole,
};
pub use registry::{
    RegisteredSchema, RegistryError, SchemaRegistry, ERROR_CODE_SUBJECT_NOT_FOUND,
};

use crate::codec::{BinaryDeserializer, BinarySerializer};
use crate::error::{AvrokitErr, AvrokitResult};
use crate::resolver::TypeResolution;
use crate::value::Value;
use crate::Schema;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::Write;

/// The leading byte of every wire-format payload.
pub const WIRE_MAGIC: u8 = 0x00;

/// Bytes occupied by the magic marker and the schema id.
pub const WIRE_HEADER_LEN: usize = 5;

/// Reads and checks the 5-byte wire header, returning the embedded schema id.
pub fn read_wire_header(payload: &[u8]) -> AvrokitResult<i32> {
    if payload.len() < WIRE_HEADER_LEN {
        return Err(AvrokitErr::TruncatedWireHeader);
    }
    if payload[0] != WIRE_MAGIC {
        return Err(AvrokitErr::BadWireHeader);
    }
    Ok(BigEndian::read_i32(&payload[1..WIRE_HEADER_LEN]))
}

/// Writes the 5-byte wire header for the given schema id.
pub fn write_wire_header<W: Write>(id: i32, writer: &mut W) -> AvrokitResult<()> {
    writer
        .write_all(&[WIRE_MAGIC])
        .and_then(|_| writer.write_i32::<BigEndian>(id))
        .map_err(AvrokitErr::EncodeFailed)
}

/// A compiled encoder closed over a schema id; every payload it produces
/// carries the wire header followed by the Avro binary body.
pub struct WireSerializer {
    id: i32,
    inner: BinarySerializer,
}

impl WireSerializer {
    /// Compiles a wire serializer for the host type described by `resolution`.
    pub fn new(id: i32, schema: &Schema, resolution: &TypeResolution) -> AvrokitResult<Self> {
        Ok(WireSerializer {
            id,
            inner: BinarySerializer::compile(schema, resolution)?,
        })
    }

    /// Compiles a wire serializer driven by the schema alone.
    pub fn natural(id: i32, schema: &Schema) -> AvrokitResult<Self> {
        Ok(WireSerializer {
            id,
            inner: BinarySerializer::natural(schema)?,
        })
    }

    /// The schema id stamped into every payload.
    pub fn schema_id(&self) -> i32 {
        self.id
    }

    /// Encodes one value, header included, onto the sink.
    pub fn serialize<W: Write>(&self, value: &Value, writer: &mut W) -> AvrokitResult<()> {
        write_wire_header(self.id, writer)?;
        self.inner.serialize(value, writer)
    }

    /// Encodes one value, header included, into a fresh buffer.
    pub fn to_bytes(&self, value: &Value) -> AvrokitResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize(value, &mut buf)?;
        Ok(buf)
    }
}

/// A compiled decoder bound to a specific schema id; payloads carrying any
/// other id are rejected.
pub struct WireDeserializer {
    id: i32,
    inner: BinaryDeserializer,
}

impl WireDeserializer {
    /// Compiles a wire deserializer for the host type described by
    /// `resolution`.
    pub fn new(id: i32, schema: &Schema, resolution: &TypeResolution) -> AvrokitResult<Self> {
        Ok(WireDeserializer {
            id,
            inner: BinaryDeserializer::compile(schema, resolution)?,
        })
    }

    /// Compiles a wire deserializer driven by the writer's schema alone.
    pub fn natural(id: i32, schema: &Schema) -> AvrokitResult<Self> {
        Ok(WireDeserializer {
            id,
            inner: BinaryDeserializer::natural(schema)?,
        })
    }

    /// The schema id this deserializer is bound to.
    pub fn schema_id(&self) -> i32 {
        self.id
    }

    /// Decodes one wire payload, checking the header and the embedded id.
    pub fn deserialize(&self, payload: &[u8]) -> AvrokitResult<Value> {
        let found = read_wire_header(payload)?;
        if found != self.id {
            return Err(AvrokitErr::WireIdMismatch {
                found,
                expected: self.id,
            });
        }
        let mut body = &payload[WIRE_HEADER_LEN..];
        self.inner.deserialize(&mut body)
    }
}
