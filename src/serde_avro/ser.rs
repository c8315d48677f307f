//! Serializes native Rust types into the runtime [`Value`](crate::Value)
//! model that compiled codecs consume.

use crate::error::AvrokitErr;
use crate::value::{Map, Record, Value};
use serde::ser::{self, Impossible, Serialize};

pub struct ValueWriter;

/// `to_value` is the serde API for serialization of Rust types to an
/// avrokit [`Value`](crate::Value).
pub fn to_value<T>(value: &T) -> Result<Value, AvrokitErr>
where
    T: Serialize,
{
    value.serialize(&mut ValueWriter)
}

// Shapes avro has no counterpart for surface as errors straight from the
// entry methods, so the compound-serializer slots for them never come alive.
type Unrepresentable = Impossible<Value, AvrokitErr>;

fn unrepresentable(what: &str) -> AvrokitErr {
    AvrokitErr::Message(format!("avro cannot represent {}", what))
}

impl<'a> ser::Serializer for &'a mut ValueWriter {
    type Ok = Value;
    type Error = AvrokitErr;
    type SerializeSeq = ItemsSerializer;
    type SerializeTuple = ItemsSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = RecordSerializer;
    type SerializeTupleStruct = Unrepresentable;
    type SerializeTupleVariant = Unrepresentable;
    type SerializeStructVariant = Unrepresentable;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    // i8/u8 map to the auxiliary Byte value so that sequences of them can be
    // recognized as avro bytes
    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Byte(v as u8))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Byte(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Long(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        Ok(v.into())
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Null)
    }

    // data-free Rust enum variants are avro enum symbols
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Enum(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize,
    {
        Err(unrepresentable("enum variants carrying data"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(ItemsSerializer::with_capacity(len))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(unrepresentable("tuple structs"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(unrepresentable("enum variants carrying data"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapSerializer::with_capacity(len))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(RecordSerializer::new(name))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(unrepresentable("enum variants carrying data"))
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Sequences and tuples: avro arrays, with a byte-sequence special case
///////////////////////////////////////////////////////////////////////////////

pub struct ItemsSerializer {
    items: Vec<Value>,
}

impl ItemsSerializer {
    fn with_capacity(len: Option<usize>) -> Self {
        ItemsSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), AvrokitErr> {
        self.items.push(value.serialize(&mut ValueWriter)?);
        Ok(())
    }

    // A sequence whose elements serialized as the auxiliary Byte value is a
    // byte sequence, not an avro array.
    fn finish(self) -> Value {
        match self.items.first() {
            Some(Value::Byte(_)) => Value::Bytes(
                self.items
                    .into_iter()
                    .filter_map(|v| if let Value::Byte(b) = v { Some(b) } else { None })
                    .collect(),
            ),
            _ => Value::Array(self.items),
        }
    }
}

impl ser::SerializeSeq for ItemsSerializer {
    type Ok = Value;
    type Error = AvrokitErr;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for ItemsSerializer {
    type Ok = Value;
    type Error = AvrokitErr;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Maps: string keys only
///////////////////////////////////////////////////////////////////////////////

pub struct MapSerializer {
    map: Map,
    pending_key: Option<String>,
}

impl MapSerializer {
    fn with_capacity(len: Option<usize>) -> Self {
        MapSerializer {
            map: Map::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        }
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = AvrokitErr;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        match key.serialize(&mut ValueWriter)? {
            Value::Str(s) => {
                self.pending_key = Some(s);
                Ok(())
            }
            _ => Err(AvrokitErr::ExpectedString),
        }
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| AvrokitErr::Message("map value serialized before its key".to_string()))?;
        self.map.insert(key, value.serialize(&mut ValueWriter)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Map(self.map))
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Structs: avro records, fields in declaration order
///////////////////////////////////////////////////////////////////////////////

pub struct RecordSerializer {
    record: Record,
}

impl RecordSerializer {
    fn new(name: &str) -> Self {
        RecordSerializer {
            record: Record::new(name),
        }
    }
}

impl ser::SerializeStruct for RecordSerializer {
    type Ok = Value;
    type Error = AvrokitErr;

    fn serialize_field<T: ?Sized>(
        &mut self,
        name: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: Serialize,
    {
        let value = value.serialize(&mut ValueWriter)?;
        self.record.insert(name, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Record(self.record))
    }
}
