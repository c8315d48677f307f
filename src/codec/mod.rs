//! Compiles a schema together with a type resolution into callable binary
//! codecs.
//!
//! Compilation walks the schema once, pairing each node against the host
//! type's resolution and producing an immutable plan; running the plan reads
//! or writes Avro binary on any `std::io` byte source/sink. Recursive
//! schemas are handled with a per-build cache of forward links that resolve
//! when construction completes, so compiled codecs run eagerly.

mod decode;
mod encode;

use crate::error::{AvrokitErr, AvrokitResult};
use crate::resolver::TypeResolution;
use crate::resolver::TimeUnit;
use crate::schema::{Registry, Variant};
use crate::value::Value;
use crate::Schema;
use std::io::{Read, Write};

/// A compiled encoder for one `(schema, type resolution)` pair.
///
/// Serializers are immutable and safe to share across threads; only the byte
/// sink must not be shared between concurrent calls.
pub struct BinarySerializer {
    plan: encode::EncodePlan,
}

impl BinarySerializer {
    /// Compiles an encoder writing the given schema from values of the host
    /// type described by `resolution`.
    pub fn compile(schema: &Schema, resolution: &TypeResolution) -> AvrokitResult<Self> {
        let mut build = encode::EncoderBuild::new(schema.registry());
        let plan = build.compile(schema.variant(), Binding::Typed(resolution))?;
        Ok(BinarySerializer { plan })
    }

    /// Compiles an encoder driven by the schema alone; every value shape the
    /// schema itself implies is accepted.
    pub fn natural(schema: &Schema) -> AvrokitResult<Self> {
        let mut build = encode::EncoderBuild::new(schema.registry());
        let plan = build.compile(schema.variant(), Binding::Natural)?;
        Ok(BinarySerializer { plan })
    }

    /// Encodes one value onto the sink.
    pub fn serialize<W: Write>(&self, value: &Value, writer: &mut W) -> AvrokitResult<()> {
        encode::encode(&self.plan, value, writer)
    }

    /// Encodes one value into a fresh buffer.
    pub fn to_bytes(&self, value: &Value) -> AvrokitResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize(value, &mut buf)?;
        Ok(buf)
    }
}

/// A compiled decoder for one `(writer schema, type resolution)` pair.
///
/// The decoder consumes the writer's byte layout in full: fields the host
/// type does not carry are decoded and discarded, and host fields the writer
/// never wrote surface as null.
pub struct BinaryDeserializer {
    plan: decode::DecodePlan,
}

impl BinaryDeserializer {
    /// Compiles a decoder reading the writer's schema into values of the
    /// host type described by `resolution`.
    pub fn compile(schema: &Schema, resolution: &TypeResolution) -> AvrokitResult<Self> {
        let mut build = decode::DecoderBuild::new(schema.registry());
        let plan = build.compile(schema.variant(), Binding::Typed(resolution))?;
        Ok(BinaryDeserializer { plan })
    }

    /// Compiles a decoder driven by the writer's schema alone.
    pub fn natural(schema: &Schema) -> AvrokitResult<Self> {
        let mut build = decode::DecoderBuild::new(schema.registry());
        let plan = build.compile(schema.variant(), Binding::Natural)?;
        Ok(BinaryDeserializer { plan })
    }

    /// Decodes one value from the source.
    pub fn deserialize<R: Read>(&self, reader: &mut R) -> AvrokitResult<Value> {
        decode::decode(&self.plan, reader)
    }
}

// What a schema node is being paired with during compilation: a component of
// the host type's resolution, or nothing (schema-driven compilation, used
// for discarded fields and union branches the host type does not cover).
#[derive(Clone, Copy)]
pub(crate) enum Binding<'r> {
    Typed(&'r TypeResolution),
    Natural,
}

impl<'r> Binding<'r> {
    // For a non-union schema node, an optional host type contributes its
    // payload resolution; nullness only exists on the wire through unions.
    fn through_optional(self) -> Self {
        match self {
            Binding::Typed(TypeResolution::Optional(inner)) => Binding::Typed(&**inner),
            b => b,
        }
    }
}

// Whether a resolution can be paired with a schema node at all. Promotions
// (int to long, float to double, bytes to string and back) count as matches;
// the plans perform the widening.
pub(crate) fn resolution_matches(
    resolution: &TypeResolution,
    variant: &Variant,
    cxt: &Registry,
) -> bool {
    let variant = match variant {
        Variant::Named(n) => match cxt.get(n) {
            Some(v) => v,
            None => return false,
        },
        v => v,
    };
    match (resolution, variant) {
        (TypeResolution::Optional(inner), v) if !matches!(v, Variant::Union { .. }) => {
            resolution_matches(inner, v, cxt)
        }
        (TypeResolution::Boolean, Variant::Boolean) => true,
        (TypeResolution::Integer { .. }, Variant::Int)
        | (TypeResolution::Integer { .. }, Variant::Long)
        | (TypeResolution::Integer { .. }, Variant::Float)
        | (TypeResolution::Integer { .. }, Variant::Double) => true,
        (TypeResolution::Floating { .. }, Variant::Double)
        | (TypeResolution::Floating { .. }, Variant::Float) => true,
        // a floating host can take promoted int and long writers
        (TypeResolution::Floating { .. }, Variant::Int)
        | (TypeResolution::Floating { .. }, Variant::Long) => true,
        (TypeResolution::Integer { size: 8, .. }, Variant::TimeMicros)
        | (TypeResolution::Integer { size: 8, .. }, Variant::TimestampMillis)
        | (TypeResolution::Integer { size: 8, .. }, Variant::TimestampMicros) => true,
        (TypeResolution::Decimal { scale, .. }, Variant::Decimal { scale: s, .. }) => scale == s,
        (TypeResolution::Str, Variant::Str)
        | (TypeResolution::Str, Variant::Bytes)
        | (TypeResolution::Str, Variant::Uuid) => true,
        (TypeResolution::ByteSeq, Variant::Bytes)
        | (TypeResolution::ByteSeq, Variant::Str)
        | (TypeResolution::ByteSeq, Variant::Fixed { .. }) => true,
        (TypeResolution::Date, Variant::Date) => true,
        (TypeResolution::TimeOfDay { unit: TimeUnit::Millis }, Variant::TimeMillis) => true,
        (TypeResolution::TimeOfDay { unit: TimeUnit::Micros }, Variant::TimeMicros) => true,
        (TypeResolution::Timestamp { unit: TimeUnit::Millis }, Variant::TimestampMillis) => true,
        (TypeResolution::Timestamp { unit: TimeUnit::Micros }, Variant::TimestampMicros) => true,
        (TypeResolution::Duration, Variant::Duration { .. }) => true,
        (TypeResolution::Uuid, Variant::Uuid) | (TypeResolution::Uuid, Variant::Str) => true,
        (TypeResolution::Array { .. }, Variant::Array { .. }) => true,
        (TypeResolution::Map { .. }, Variant::Map { .. }) => true,
        (TypeResolution::Enum(e), Variant::Enum { name, .. }) => e.name.matches(name),
        (TypeResolution::Record(r), Variant::Record { name, .. }) => r.name.matches(name),
        (TypeResolution::Reference(r), Variant::Record { name, .. })
        | (TypeResolution::Reference(r), Variant::Enum { name, .. })
        | (TypeResolution::Reference(r), Variant::Fixed { name, .. }) => r.matches(name),
        _ => false,
    }
}

pub(crate) fn ensure_compatible(
    binding: Binding<'_>,
    variant: &Variant,
    cxt: &Registry,
) -> AvrokitResult<()> {
    match binding.through_optional() {
        Binding::Natural => Ok(()),
        Binding::Typed(resolution) => {
            if resolution_matches(resolution, variant, cxt) {
                Ok(())
            } else {
                Err(AvrokitErr::ResolutionMismatch {
                    resolved: resolution.kind_name().to_string(),
                    schema: variant.type_name().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::descriptor::{StructDescriptor, TypeDescriptor};
    use crate::resolver::Resolver;
    use std::str::FromStr;

    fn int_schema() -> Schema {
        Schema::from_str(r##""int""##).unwrap()
    }

    #[test]
    fn typed_compile_rejects_incompatible_resolution() {
        let schema = int_schema();
        let resolver = Resolver::new();
        let resolution = resolver.resolve(&TypeDescriptor::Str).unwrap();
        assert!(matches!(
            BinarySerializer::compile(&schema, &resolution),
            Err(AvrokitErr::ResolutionMismatch { .. })
        ));
    }

    #[test]
    fn typed_compile_rejects_name_mismatch() {
        let schema = Schema::from_str(
            r##"{"type": "record", "name": "Expected", "fields": [{"name": "x", "type": "int"}]}"##,
        )
        .unwrap();
        let resolver = Resolver::new();
        let resolution = resolver
            .resolve(
                &StructDescriptor::new("Surprise")
                    .field(
                        "x",
                        TypeDescriptor::Integer {
                            size: 4,
                            signed: true,
                        },
                    )
                    .build(),
            )
            .unwrap();
        assert!(matches!(
            BinarySerializer::compile(&schema, &resolution),
            Err(AvrokitErr::ResolvedNameMismatch { .. })
        ));
    }

    #[test]
    fn natural_compile_accepts_every_schema() {
        for text in &[
            r##""null""##,
            r##""boolean""##,
            r##""bytes""##,
            r##"{"type": "array", "items": "long"}"##,
            r##"{"type": "map", "values": "double"}"##,
            r##"["null", "string"]"##,
            r##"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"##,
            r##"{"type": "fixed", "name": "F", "size": 3}"##,
            r##"{"type": "int", "logicalType": "date"}"##,
            r##"{"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}"##,
        ] {
            let schema = Schema::from_str(text).unwrap();
            BinarySerializer::natural(&schema).unwrap();
            BinaryDeserializer::natural(&schema).unwrap();
        }
    }
}
