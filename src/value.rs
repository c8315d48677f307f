//! The runtime value model that compiled codecs read and write.

use crate::error::AvrokitErr;
use crate::schema;
use crate::schema::common::validate_name;
use crate::schema::parser::parse_default;
use crate::schema::Variant;
use crate::Schema;
use indexmap::IndexMap;
use schema::Order;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

// Convenient type alias for map initialization.
pub type Map = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FieldValue {
    pub(crate) value: Value,
    #[serde(skip_serializing)]
    order: schema::Order,
}

impl FieldValue {
    pub(crate) fn new(value: Value) -> Self {
        FieldValue {
            value,
            order: Order::Ascending,
        }
    }
}

/// The [Record](https://avro.apache.org/docs/current/spec.html#schema_record) avro type.
/// Avro records translate to a struct in Rust. Any struct that implements serde's
/// Serialize trait can be converted to an avro record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub(crate) name: String,
    pub(crate) fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Creates a new avro record type with the given name.
    pub fn new(name: &str) -> Self {
        Record {
            fields: IndexMap::new(),
            name: name.to_string(),
        }
    }

    /// Returns the full name this record was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field to the record.
    pub fn insert<T: Into<Value>>(&mut self, field_name: &str, ty: T) -> Result<(), AvrokitErr> {
        validate_name(field_name)?;
        self.fields
            .insert(field_name.to_string(), FieldValue::new(ty.into()));
        Ok(())
    }

    /// Returns a reference to the value of the given field, if present.
    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name).map(|f| &f.value)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), &v.value))
    }

    /// Creates a record from a [BTreeMap](https://doc.rust-lang.org/std/collections/struct.BTreeMap.html) by consuming it.
    /// The values in `BTreeMap` must implement `Into<Value>`. The `name` provided must match with the name in the record
    /// schema being provided to the codec builder.
    pub fn from_btree<K: Into<String> + Ord + Display, V: Into<Value>>(
        name: &str,
        btree: BTreeMap<K, V>,
    ) -> Result<Self, AvrokitErr> {
        let mut record = Record::new(name);
        for (k, v) in btree {
            let field_value = FieldValue {
                value: v.into(),
                order: Order::Ascending,
            };
            record.fields.insert(k.to_string(), field_value);
        }

        Ok(record)
    }

    /// Creates a record from a JSON object (serde_json::Value). A conforming record schema must be provided.
    pub fn from_json(
        json: serde_json::Map<String, serde_json::Value>,
        schema: &Schema,
    ) -> Result<Value, AvrokitErr> {
        if let Variant::Record {
            name,
            fields: record_schema_fields,
            ..
        } = schema.variant()
        {
            let mut values = IndexMap::with_capacity(record_schema_fields.len());
            'fields: for (k, v) in record_schema_fields {
                if let Some(json_value) = json.get(k) {
                    if let Variant::Union { variants } = &v.ty {
                        for var in variants {
                            if let Ok(v) = parse_default(json_value, var) {
                                values.insert(k.to_string(), FieldValue::new(v));
                                continue 'fields;
                            }
                        }
                        return Err(AvrokitErr::FailedDefaultUnion);
                    } else {
                        let parsed_value = parse_default(json_value, &v.ty)?;
                        values.insert(k.to_string(), FieldValue::new(parsed_value));
                    }
                } else if let Some(v) = &v.default {
                    values.insert(k.to_string(), FieldValue::new(v.clone()));
                } else {
                    return Err(AvrokitErr::FieldNotFound(k.to_string()));
                }
            }

            Ok(Value::Record(Record {
                fields: values,
                name: name.fullname(),
            }))
        } else {
            Err(AvrokitErr::ExpectedJsonObject)
        }
    }
}

/// An unscaled integer paired with a scale, the in-memory form of the
/// `decimal` logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decimal {
    unscaled: i128,
    scale: usize,
}

impl Decimal {
    /// Creates a decimal from its unscaled two's-complement value and scale.
    pub fn new(unscaled: i128, scale: usize) -> Self {
        Decimal { unscaled, scale }
    }

    /// The unscaled integer value.
    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    /// Number of digits to the right of the decimal point.
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Minimal two's-complement big-endian representation of the unscaled value.
    pub(crate) fn to_be_bytes_min(&self) -> Vec<u8> {
        let bytes = self.unscaled.to_be_bytes();
        // strip redundant sign bytes, keeping the sign bit intact
        let mut start = 0;
        while start < bytes.len() - 1 {
            let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        bytes[start..].to_vec()
    }

    /// Sign-extends the unscaled value into exactly `size` big-endian bytes.
    pub(crate) fn to_be_bytes_fixed(&self, size: usize) -> Result<Vec<u8>, AvrokitErr> {
        let min = self.to_be_bytes_min();
        if min.len() > size {
            return Err(AvrokitErr::DecimalOutOfRange(size));
        }
        let fill = if self.unscaled < 0 { 0xff } else { 0x00 };
        let mut out = vec![fill; size];
        out[size - min.len()..].copy_from_slice(&min);
        Ok(out)
    }

    /// Reads a two's-complement big-endian unscaled value.
    pub(crate) fn from_be_bytes(buf: &[u8], scale: usize) -> Result<Self, AvrokitErr> {
        if buf.len() > 16 {
            return Err(AvrokitErr::DecodeFailed(crate::error::io_err(
                "decimal wider than 128 bits",
            )));
        }
        let fill = if buf.first().map_or(false, |b| b & 0x80 != 0) {
            0xff
        } else {
            0x00
        };
        let mut wide = [fill; 16];
        wide[16 - buf.len()..].copy_from_slice(buf);
        Ok(Decimal {
            unscaled: i128::from_be_bytes(wide),
            scale,
        })
    }
}

/// The `duration` logical type: months, days and milliseconds, each an
/// unsigned 32-bit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Duration {
    /// Number of months.
    pub months: u32,
    /// Number of days.
    pub days: u32,
    /// Number of milliseconds.
    pub millis: u32,
}

impl Duration {
    /// Creates a duration from months, days and milliseconds.
    pub fn new(months: u32, days: u32, millis: u32) -> Self {
        Duration {
            months,
            days,
            millis,
        }
    }
}

/// Represents an Avro value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// A null value.
    Null,
    /// An i32 integer value.
    Int(i32),
    /// An i64 long value.
    Long(i64),
    /// A boolean value.
    Boolean(bool),
    /// A f32 float value.
    Float(f32),
    /// A f64 float value.
    Double(f64),
    /// A Record value.
    Record(Record),
    /// A Fixed value.
    Fixed(Vec<u8>),
    /// A Map value.
    Map(Map),
    /// A sequence of u8 bytes.
    Bytes(Vec<u8>),
    /// Rust strings map directly to avro strings
    Str(String),
    /// A union is a sequence of unique `Value`s
    Union(Box<Value>),
    /// An enumeration. Unlike Rust enums, enums in avro don't support data within their variants.
    Enum(String),
    /// An array of `Value`s
    Array(Vec<Value>),
    /// Days since the unix epoch (the `date` logical type over int).
    Date(i32),
    /// Milliseconds after midnight (the `time-millis` logical type over int).
    TimeMillis(i32),
    /// Microseconds after midnight (the `time-micros` logical type over long).
    TimeMicros(i64),
    /// Milliseconds since the unix epoch (the `timestamp-millis` logical type over long).
    TimestampMillis(i64),
    /// Microseconds since the unix epoch (the `timestamp-micros` logical type over long).
    TimestampMicros(i64),
    /// An arbitrary-precision decimal (the `decimal` logical type over bytes or fixed).
    Decimal(Decimal),
    /// A months/days/millis duration (the `duration` logical type over fixed(12)).
    Duration(Duration),
    /// A UUID, encoded on the wire as its canonical string form.
    Uuid(uuid::Uuid),
    /// auxiliary u8 helper for serde. Not an avro value.
    Byte(u8),
}

///////////////////////////////////////////////////////////////////////////////
/// From impls for Value
///////////////////////////////////////////////////////////////////////////////

impl From<()> for Value {
    fn from(_v: ()) -> Value {
        Value::Null
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(v: HashMap<String, T>) -> Value {
        let mut map = HashMap::with_capacity(v.len());
        for (k, v) in v.into_iter() {
            map.insert(k, v.into());
        }
        Value::Map(map)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(value)
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(value: &'a [u8]) -> Value {
        Value::Bytes(value.to_vec())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Long(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value::Long(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Value {
        Value::Str(value.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Value {
        let mut new_vec = vec![];
        for i in values {
            new_vec.push(i.into());
        }
        Value::Array(new_vec)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Value {
        Value::Record(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Value {
        Value::Decimal(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Value {
        Value::Duration(value)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Value {
        Value::Uuid(value)
    }
}

// Days between 0001-01-01 (CE) and the unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl From<chrono::NaiveDate> for Value {
    fn from(value: chrono::NaiveDate) -> Value {
        use chrono::Datelike;
        Value::Date(value.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Value {
        Value::TimestampMillis(value.timestamp_millis())
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Value -> Rust value
///////////////////////////////////////////////////////////////////////////////

impl Value {
    /// Try to retrieve an avro null
    pub fn as_null(&self) -> Result<(), AvrokitErr> {
        if let Value::Null = self {
            Ok(())
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro boolean
    pub fn as_boolean(&self) -> Result<&bool, AvrokitErr> {
        if let Value::Boolean(b) = self {
            Ok(b)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro int
    pub fn as_int(&self) -> Result<&i32, AvrokitErr> {
        if let Value::Int(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro long
    pub fn as_long(&self) -> Result<&i64, AvrokitErr> {
        if let Value::Long(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro float
    pub fn as_float(&self) -> Result<&f32, AvrokitErr> {
        if let Value::Float(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro double
    pub fn as_double(&self) -> Result<&f64, AvrokitErr> {
        if let Value::Double(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro bytes
    pub fn as_bytes(&self) -> Result<&[u8], AvrokitErr> {
        if let Value::Bytes(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro string
    pub fn as_string(&self) -> Result<&str, AvrokitErr> {
        if let Value::Str(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro record
    pub fn as_record(&self) -> Result<&Record, AvrokitErr> {
        if let Value::Record(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve the variant of the enum as a string
    pub fn as_enum(&self) -> Result<&str, AvrokitErr> {
        if let Value::Enum(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro array
    pub fn as_array(&self) -> Result<&[Value], AvrokitErr> {
        if let Value::Array(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro map
    pub fn as_map(&self) -> Result<&HashMap<String, Value>, AvrokitErr> {
        if let Value::Map(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro union
    pub fn as_union(&self) -> Result<&Value, AvrokitErr> {
        if let Value::Union(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve an avro fixed
    pub fn as_fixed(&self) -> Result<&[u8], AvrokitErr> {
        if let Value::Fixed(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
    /// Try to retrieve a decimal
    pub fn as_decimal(&self) -> Result<&Decimal, AvrokitErr> {
        if let Value::Decimal(v) = self {
            Ok(v)
        } else {
            Err(AvrokitErr::ExpectedVariantNotFound)
        }
    }
}
