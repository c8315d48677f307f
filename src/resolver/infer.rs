//! Generates a schema from a type resolution. This is how the wire adapter
//! registers a schema for a subject that has none, and how the CLI creates
//! schemas from descriptor manifests.

use super::{TimeUnit, TypeResolution};
use crate::error::{AvrokitErr, AvrokitResult};
use crate::schema::common::{Field, Name, Order};
use crate::schema::writer;
use crate::schema::{CanonicalSchema, Registry, Variant};
use crate::Schema;
use indexmap::IndexMap;

/// Builds the schema a host type with the given resolution naturally writes.
pub fn infer_schema(resolution: &TypeResolution) -> AvrokitResult<Schema> {
    let mut cxt = Registry::new();
    let variant = variant_of(resolution, &mut cxt)?;
    let canonical = CanonicalSchema(writer::to_json(&variant, &cxt, true)?);
    Ok(Schema {
        cxt,
        variant,
        canonical,
    })
}

fn variant_of(resolution: &TypeResolution, cxt: &mut Registry) -> AvrokitResult<Variant> {
    let variant = match resolution {
        TypeResolution::Boolean => Variant::Boolean,
        TypeResolution::Integer { size, .. } => {
            if *size <= 4 {
                Variant::Int
            } else {
                Variant::Long
            }
        }
        TypeResolution::Floating { size } => {
            if *size <= 4 {
                Variant::Float
            } else {
                Variant::Double
            }
        }
        TypeResolution::Decimal { precision, scale } => Variant::Decimal {
            precision: *precision,
            scale: *scale,
            inner: Box::new(Variant::Bytes),
        },
        TypeResolution::Str => Variant::Str,
        TypeResolution::ByteSeq => Variant::Bytes,
        TypeResolution::Date => Variant::Date,
        TypeResolution::TimeOfDay {
            unit: TimeUnit::Millis,
        } => Variant::TimeMillis,
        TypeResolution::TimeOfDay {
            unit: TimeUnit::Micros,
        } => Variant::TimeMicros,
        TypeResolution::Timestamp {
            unit: TimeUnit::Millis,
        } => Variant::TimestampMillis,
        TypeResolution::Timestamp {
            unit: TimeUnit::Micros,
        } => Variant::TimestampMicros,
        TypeResolution::Duration => {
            let name = Name::new("duration")?;
            let fixed = Variant::Fixed {
                name: name.clone(),
                aliases: None,
                size: 12,
            };
            let duration = Variant::Duration {
                inner: Box::new(fixed),
            };
            if cxt.get(&name.fullname()).is_some() {
                Variant::Named(name.fullname())
            } else {
                cxt.insert(name.fullname(), duration.clone());
                duration
            }
        }
        TypeResolution::Uuid => Variant::Uuid,
        TypeResolution::Optional(inner) => {
            let inner = variant_of(inner, cxt)?;
            Variant::Union {
                variants: vec![Variant::Null, inner],
            }
        }
        TypeResolution::Array { items } => Variant::Array {
            items: Box::new(variant_of(items, cxt)?),
        },
        TypeResolution::Map { values, .. } => Variant::Map {
            values: Box::new(variant_of(values, cxt)?),
        },
        TypeResolution::Enum(e) => {
            let name = Name::new(&e.name.value)?;
            if cxt.get(&name.fullname()).is_some() {
                return Ok(Variant::Named(name.fullname()));
            }
            let symbols = e.symbols.iter().map(|s| s.name.clone()).collect();
            let variant = Variant::Enum {
                name: name.clone(),
                aliases: None,
                doc: None,
                symbols,
            };
            cxt.insert(name.fullname(), variant.clone());
            variant
        }
        TypeResolution::Record(rec) => {
            let name = Name::new(&rec.name.value)?;
            let fullname = name.fullname();
            if cxt.get(&fullname).is_some() {
                return Ok(Variant::Named(fullname));
            }
            // placeholder first, so self references resolve
            cxt.insert(fullname.clone(), Variant::Named(fullname.clone()));
            let mut fields = IndexMap::with_capacity(rec.fields.len());
            for f in &rec.fields {
                let ty = variant_of(&f.resolution, cxt)?;
                fields.insert(
                    f.name.clone(),
                    Field::new(&f.name, ty, None, None, Order::Ascending, None)?,
                );
            }
            let variant = Variant::Record {
                name,
                aliases: None,
                doc: None,
                fields,
            };
            cxt.insert(fullname, variant.clone());
            variant
        }
        TypeResolution::Reference(name) => {
            if cxt.get(&name.value).is_some() {
                Variant::Named(name.value.clone())
            } else {
                return Err(AvrokitErr::NamedSchemaNotFound(name.value.clone()));
            }
        }
    };
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::descriptor::{StructDescriptor, TypeDescriptor};
    use crate::resolver::Resolver;

    #[test]
    fn scalar_inference() {
        let resolver = Resolver::new();
        let resolution = resolver
            .resolve(&TypeDescriptor::Integer {
                size: 4,
                signed: true,
            })
            .unwrap();
        let schema = infer_schema(&resolution).unwrap();
        assert_eq!(schema.to_json(false).unwrap(), r##""int""##);
    }

    #[test]
    fn recursive_record_inference() {
        let desc = StructDescriptor::new("Node")
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
        let resolver = Resolver::new();
        let resolution = resolver.resolve(&desc).unwrap();
        let schema = infer_schema(&resolution).unwrap();
        let json = schema.to_json(false).unwrap();
        assert!(json.contains(r##""items":"Node""##));
        // and it parses back
        let reparsed: Schema = json.parse().unwrap();
        assert_eq!(&reparsed, &schema);
    }

    #[test]
    fn optional_becomes_nullable_union() {
        let resolver = Resolver::new();
        let resolution = resolver
            .resolve(&TypeDescriptor::optional(TypeDescriptor::Str))
            .unwrap();
        let schema = infer_schema(&resolution).unwrap();
        assert_eq!(schema.to_json(false).unwrap(), r##"["null","string"]"##);
    }
}
