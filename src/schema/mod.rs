//! Contains routines for parsing and validating an Avro schema.
//! Schemas in avro are written as JSON and can be provided as .avsc files
//! to the codec builders.

pub mod common;
#[cfg(test)]
mod tests;
use crate::error::AvrokitErr;
pub use common::Order;
mod canonical;
pub mod parser;
pub(crate) mod writer;
pub(crate) use parser::Registry;
pub use canonical::CanonicalSchema;

use crate::error::AvrokitResult;
use crate::value::Value;
use common::{Field, Name};
use indexmap::IndexMap;
use serde_json;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Variant {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Record {
        name: Name,
        aliases: Option<Vec<String>>,
        doc: Option<String>,
        fields: IndexMap<String, Field>,
    },
    Fixed {
        name: Name,
        aliases: Option<Vec<String>>,
        size: usize,
    },
    Enum {
        name: Name,
        aliases: Option<Vec<String>>,
        doc: Option<String>,
        symbols: Vec<String>,
    },
    Map {
        values: Box<Variant>,
    },
    Array {
        items: Box<Variant>,
    },
    Union {
        variants: Vec<Variant>,
    },
    Named(String),
    // Logical refinements. The base type each one is valid over is enforced
    // by the parser; the canonical form strips them back down to the base.
    Decimal {
        precision: usize,
        scale: usize,
        inner: Box<Variant>,
    },
    Uuid,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Duration {
        inner: Box<Variant>,
    },
}

/// Represents a parsed avro schema, paired with the lookup table that
/// resolves named references within it.
#[derive(Debug)]
pub struct Schema {
    // Schema context that has a lookup table to resolve named schema references
    pub(crate) cxt: Registry,
    // typed and stripped version of schema used internally.
    pub(crate) variant: Variant,
    // canonical form of schema. This is used for equality.
    pub(crate) canonical: CanonicalSchema,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl std::str::FromStr for Schema {
    type Err = AvrokitErr;
    /// Parse an avro schema from a JSON string.
    /// One can use Rust's raw string syntax (r##""##) to pass schema.
    fn from_str(schema: &str) -> Result<Self, Self::Err> {
        let schema_json =
            serde_json::from_str(schema).map_err(|e| AvrokitErr::SchemaParseErr(e.into()))?;
        Schema::parse_imp(schema_json)
    }
}

impl Schema {
    /// Parses an avro schema from a JSON schema in a file.
    /// Alternatively, one can use the [`FromStr`](https://doc.rust-lang.org/std/str/trait.FromStr.html)
    /// impl to create the Schema from a JSON string:
    /// ```
    /// use std::str::FromStr;
    /// use avrokit::Schema;
    ///
    /// let schema = Schema::from_str(r##""null""##).unwrap();
    /// ```
    pub fn from_path<P: AsRef<Path> + Debug>(path: P) -> AvrokitResult<Self> {
        let schema_file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(AvrokitErr::SchemaParseErr)?;
        let value = serde_json::from_reader(schema_file)
            .map_err(|e| AvrokitErr::SchemaParseErr(e.into()))?;
        Schema::parse_imp(value)
    }

    fn parse_imp(schema_json: serde_json::Value) -> AvrokitResult<Self> {
        let mut parser = Registry::new();
        let variant = parser.parse_schema(&schema_json, None)?;
        let canonical = CanonicalSchema(writer::to_json(&variant, &parser, true)?);
        Ok(Schema {
            cxt: parser,
            variant,
            canonical,
        })
    }

    pub(crate) fn variant(&self) -> &Variant {
        &self.variant
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.cxt
    }

    /// Renders this schema back to JSON text. With `canonical` set, the
    /// output is the Parsing Canonical Form: fullnames folded into `name`
    /// and all nonessential attributes (doc, aliases, defaults, logical
    /// type attributes) omitted.
    pub fn to_json(&self, canonical: bool) -> AvrokitResult<String> {
        let json = writer::to_json(&self.variant, &self.cxt, canonical)?;
        Ok(json.to_string())
    }

    /// Checks that the given value conforms to this schema.
    #[inline(always)]
    pub fn validate(&self, value: &Value) -> AvrokitResult<()> {
        self.variant.validate(value, &self.cxt)
    }

    /// Returns the canonical form of an Avro schema.
    /// Example:
    /// ```rust
    /// use avrokit::Schema;
    /// use std::str::FromStr;
    ///
    /// let schema = Schema::from_str(r##"
    ///     {
    ///         "type": "record",
    ///         "name": "LongList",
    ///         "aliases": ["LinkedLongs"],
    ///         "fields" : [
    ///             {"name": "value", "type": "long"},
    ///             {"name": "next", "type": ["null", "LongList"]
    ///         }]
    ///     }
    /// "##).unwrap();
    ///
    /// let canonical = schema.canonical_form();
    /// ```
    pub fn canonical_form(&self) -> &CanonicalSchema {
        &self.canonical
    }
}

impl Variant {
    /// Short name used in error messages and resolver diagnostics.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Variant::Null => "null",
            Variant::Boolean => "boolean",
            Variant::Int => "int",
            Variant::Long => "long",
            Variant::Float => "float",
            Variant::Double => "double",
            Variant::Bytes => "bytes",
            Variant::Str => "string",
            Variant::Record { .. } => "record",
            Variant::Fixed { .. } => "fixed",
            Variant::Enum { .. } => "enum",
            Variant::Map { .. } => "map",
            Variant::Array { .. } => "array",
            Variant::Union { .. } => "union",
            Variant::Named(_) => "named",
            Variant::Decimal { .. } => "decimal",
            Variant::Uuid => "uuid",
            Variant::Date => "date",
            Variant::TimeMillis => "time-millis",
            Variant::TimeMicros => "time-micros",
            Variant::TimestampMillis => "timestamp-millis",
            Variant::TimestampMicros => "timestamp-micros",
            Variant::Duration { .. } => "duration",
        }
    }

    pub(crate) fn is_named(&self) -> bool {
        matches!(
            self,
            Variant::Record { .. } | Variant::Fixed { .. } | Variant::Enum { .. }
        )
    }

    pub(crate) fn name(&self) -> Option<&Name> {
        match self {
            Variant::Record { name, .. }
            | Variant::Fixed { name, .. }
            | Variant::Enum { name, .. } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn get_named_mut(&mut self) -> Option<&mut Name> {
        match self {
            Variant::Record { name, .. }
            | Variant::Fixed { name, .. }
            | Variant::Enum { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn validate(&self, value: &Value, cxt: &Registry) -> AvrokitResult<()> {
        let variant = self;
        match (value, variant) {
            (Value::Null, Variant::Null)
            | (Value::Boolean(_), Variant::Boolean)
            | (Value::Int(_), Variant::Int)
            // long is promotable to float or double
            | (Value::Long(_), Variant::Long)
            | (Value::Long(_), Variant::Float)
            | (Value::Long(_), Variant::Double)
            // int is promotable to long, float or double
            | (Value::Int(_), Variant::Long)
            | (Value::Int(_), Variant::Float)
            | (Value::Int(_), Variant::Double)
            | (Value::Float(_), Variant::Float)
            // float is promotable to double
            | (Value::Float(_), Variant::Double)
            | (Value::Double(_), Variant::Double)
            | (Value::Str(_), Variant::Str)
            // string is promotable to bytes
            | (Value::Str(_), Variant::Bytes)
            // bytes is promotable to string
            | (Value::Bytes(_), Variant::Str)
            | (Value::Bytes(_), Variant::Bytes)
            // logical values over their base schemas
            | (Value::Date(_), Variant::Date)
            | (Value::TimeMillis(_), Variant::TimeMillis)
            | (Value::TimeMicros(_), Variant::TimeMicros)
            | (Value::TimestampMillis(_), Variant::TimestampMillis)
            | (Value::TimestampMicros(_), Variant::TimestampMicros)
            | (Value::Uuid(_), Variant::Uuid)
            | (Value::Str(_), Variant::Uuid)
            | (Value::Duration(_), Variant::Duration { .. }) => {}
            (Value::Decimal(d), Variant::Decimal { scale, .. }) => {
                if d.scale() != *scale {
                    return Err(AvrokitErr::DecimalScaleMismatch {
                        found: d.scale(),
                        expected: *scale,
                    });
                }
            }
            (Value::Fixed(v), Variant::Fixed { size, .. })
            | (Value::Bytes(v), Variant::Fixed { size, .. }) => {
                if v.len() != *size {
                    return Err(AvrokitErr::FixedValueLenMismatch {
                        found: v.len(),
                        expected: *size,
                    });
                }
            }
            (Value::Record(rec), Variant::Record { ref fields, .. }) => {
                for (fname, fvalue) in &rec.fields {
                    if let Some(ftype) = fields.get(fname) {
                        ftype.ty.validate(&fvalue.value, cxt)?;
                    } else {
                        return Err(AvrokitErr::RecordFieldMissing);
                    }
                }
            }
            (Value::Map(hmap), Variant::Map { values }) => {
                for v in hmap.values() {
                    values.validate(v, cxt)?;
                }
            }
            (Value::Enum(sym), Variant::Enum { symbols, .. }) if symbols.contains(sym) => {
                return Ok(())
            }
            (Value::Array(items), Variant::Array { items: item_schema }) => {
                for v in items {
                    item_schema.validate(v, cxt)?;
                }
            }
            (v, Variant::Named(name)) => {
                if let Some(schema) = cxt.get(name) {
                    if schema.validate(v, cxt).is_ok() {
                        return Ok(());
                    }
                }
                return Err(AvrokitErr::NamedSchemaNotFoundForValue);
            }
            // Value `a` can be any of the above schemas + any named schema in the schema registry
            (a, Variant::Union { variants }) => {
                for s in variants.iter() {
                    if s.validate(a, cxt).is_ok() {
                        return Ok(());
                    }
                }

                return Err(AvrokitErr::NotFoundInUnion);
            }

            (v, s) => {
                return Err(AvrokitErr::SchemaDataValidationFailed(
                    format!("{:?}", s),
                    format!("{:?}", v),
                ))
            }
        }

        Ok(())
    }
}
