//! Deserializes decoded [`Value`](crate::Value)s back into native Rust
//! types.

use crate::error::AvrokitErr;
use crate::value::{FieldValue, Value};
use indexmap::map::Iter as FieldIter;
use serde::de::{self, Deserialize, DeserializeSeed, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;
use std::collections::hash_map;
use std::slice;

/// `from_value` is the serde API for deserialization of a decoded
/// [`Value`](crate::Value) into native Rust types.
pub fn from_value<'de, D: Deserialize<'de>>(value: &'de Value) -> Result<D, AvrokitErr> {
    D::deserialize(&mut ValueReader::new(value))
}

pub(crate) struct ValueReader<'de> {
    inner: &'de Value,
}

impl<'de> ValueReader<'de> {
    pub(crate) fn new(inner: &'de Value) -> Self {
        ValueReader { inner }
    }
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut ValueReader<'de> {
    type Error = AvrokitErr;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.inner {
            Value::Null => visitor.visit_unit(),
            Value::Boolean(v) => visitor.visit_bool(*v),
            Value::Int(v) => visitor.visit_i32(*v),
            Value::Long(v) => visitor.visit_i64(*v),
            Value::Float(v) => visitor.visit_f32(*v),
            Value::Double(v) => visitor.visit_f64(*v),
            Value::Str(ref v) => visitor.visit_borrowed_str(v),
            Value::Bytes(ref bytes) => visitor.visit_borrowed_bytes(bytes),
            Value::Array(items) => visitor.visit_seq(ItemsAccess::new(items)),
            Value::Enum(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            // logical values surface as their base representations
            Value::Date(v) | Value::TimeMillis(v) => visitor.visit_i32(*v),
            Value::TimeMicros(v) | Value::TimestampMillis(v) | Value::TimestampMicros(v) => {
                visitor.visit_i64(*v)
            }
            Value::Uuid(u) => visitor.visit_string(u.to_string()),
            Value::Decimal(d) => visitor.visit_i128(d.unscaled()),
            _ => Err(AvrokitErr::Unsupported),
        }
    }

    forward_to_deserialize_any! {
        unit bool u8 i8 i16 i32 i64 i128 u16 u32 u64 f32 f64 str bytes byte_buf string ignored_any enum
    }

    // a decoded null is the absent side of an optional host field
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.inner {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.inner {
            Value::Array(ref items) => visitor.visit_seq(ItemsAccess::new(items)),
            Value::Bytes(buf) | Value::Fixed(buf) => {
                visitor.visit_seq(ByteSeqAccess { bytes: buf.iter() })
            }
            Value::Union(v) => match v.as_ref() {
                Value::Array(ref items) => visitor.visit_seq(ItemsAccess::new(items)),
                _ => Err(AvrokitErr::Unsupported),
            },
            _ => Err(AvrokitErr::Unsupported),
        }
    }

    // avro bytes
    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    // for struct field
    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.inner {
            Value::Map(m) => visitor.visit_map(MapPairsAccess {
                entries: m.iter(),
                value: None,
            }),
            v => Err(AvrokitErr::UnexpectedAvroValue {
                value: format!("{:?}", v),
            }),
        }
    }

    fn deserialize_struct<V>(
        self,
        _a: &'static str,
        _b: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.inner {
            Value::Record(ref r) => visitor.visit_map(RecordAccess::new(r.fields.iter())),
            Value::Union(ref inner) => match **inner {
                Value::Record(ref rec) => visitor.visit_map(RecordAccess::new(rec.fields.iter())),
                _ => Err(de::Error::custom("Union variant not a record/struct")),
            },
            _ => Err(de::Error::custom("Must be a record/struct")),
        }
    }

    ///////////////////////////////////////////////////////////////////////////
    /// Not yet supported types
    ///////////////////////////////////////////////////////////////////////////

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(AvrokitErr::Unsupported)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(AvrokitErr::Unsupported)
    }

    fn deserialize_char<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        Err(AvrokitErr::Unsupported)
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Access adapters over decoded values
///////////////////////////////////////////////////////////////////////////////

struct ItemsAccess<'de> {
    items: slice::Iter<'de, Value>,
}

impl<'de> ItemsAccess<'de> {
    fn new(items: &'de [Value]) -> Self {
        ItemsAccess {
            items: items.iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for ItemsAccess<'de> {
    type Error = AvrokitErr;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some(item) => seed.deserialize(&mut ValueReader::new(item)).map(Some),
            None => Ok(None),
        }
    }
}

struct ByteSeqAccess<'de> {
    bytes: slice::Iter<'de, u8>,
}

impl<'de> de::SeqAccess<'de> for ByteSeqAccess<'de> {
    type Error = AvrokitErr;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.bytes.next() {
            Some(byte) => seed.deserialize((*byte).into_deserializer()).map(Some),
            None => Ok(None),
        }
    }
}

// Walks a decoded record's fields in schema order, handing out the field
// name and its value in lockstep.
struct RecordAccess<'de> {
    fields: FieldIter<'de, String, FieldValue>,
    value: Option<&'de Value>,
}

impl<'de> RecordAccess<'de> {
    fn new(fields: FieldIter<'de, String, FieldValue>) -> Self {
        RecordAccess {
            fields,
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for RecordAccess<'de> {
    type Error = AvrokitErr;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.fields.next() {
            Some((name, field)) => {
                self.value = Some(&field.value);
                seed.deserialize(name.as_str().into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(&mut ValueReader::new(value)),
            None => Err(de::Error::custom("record value requested before its key")),
        }
    }
}

struct MapPairsAccess<'de> {
    entries: hash_map::Iter<'de, String, Value>,
    value: Option<&'de Value>,
}

impl<'de> de::MapAccess<'de> for MapPairsAccess<'de> {
    type Error = AvrokitErr;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.as_str().into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(&mut ValueReader::new(value)),
            None => Err(de::Error::custom("map value requested before its key")),
        }
    }
}
