//! Decode plans: the reader half of a compiled codec.

use super::{resolution_matches, Binding};
use crate::error::{io_err, AvrokitErr, AvrokitResult};
use crate::resolver::TypeResolution;
use crate::schema::{Registry, Variant};
use crate::util::{decode_bytes, decode_int, decode_long, decode_string};
use crate::value::{Decimal, Duration, Record, Value};
use byteorder::{LittleEndian, ReadBytesExt};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) enum DecodePlan {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Fixed {
        size: usize,
    },
    Enum {
        symbols: Vec<String>,
    },
    Array {
        items: Box<DecodePlan>,
    },
    Map {
        values: Box<DecodePlan>,
    },
    Union {
        branches: Vec<DecodePlan>,
    },
    Record {
        name: String,
        fields: Vec<FieldPlan>,
        // host fields the writer never wrote; they surface as null
        extra: Vec<String>,
    },
    // promotions requested by the host type
    IntToLong,
    IntToFloat,
    IntToDouble,
    LongToFloat,
    LongToDouble,
    FloatToDouble,
    BytesToStr,
    StrToBytes,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    DecimalBytes {
        scale: usize,
    },
    DecimalFixed {
        scale: usize,
        size: usize,
    },
    Duration,
    Uuid,
    Link {
        name: String,
        cell: Arc<OnceCell<DecodePlan>>,
    },
}

#[derive(Debug)]
pub(crate) struct FieldPlan {
    name: String,
    plan: DecodePlan,
    // fields absent from the host type are decoded and discarded
    keep: bool,
}

pub(crate) struct DecoderBuild<'s> {
    cxt: &'s Registry,
    cache: HashMap<String, Arc<OnceCell<DecodePlan>>>,
}

impl<'s> DecoderBuild<'s> {
    pub(crate) fn new(cxt: &'s Registry) -> Self {
        DecoderBuild {
            cxt,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn compile(
        &mut self,
        variant: &Variant,
        binding: Binding<'_>,
    ) -> AvrokitResult<DecodePlan> {
        let binding = match variant {
            Variant::Union { .. } => binding,
            _ => binding.through_optional(),
        };
        match variant {
            Variant::Null => Ok(DecodePlan::Null),
            Variant::Boolean => self.checked(variant, binding, DecodePlan::Boolean),
            Variant::Int => {
                let plan = match binding {
                    Binding::Typed(TypeResolution::Integer { size: 8, .. }) => DecodePlan::IntToLong,
                    Binding::Typed(TypeResolution::Floating { size: 4 }) => DecodePlan::IntToFloat,
                    Binding::Typed(TypeResolution::Floating { .. }) => DecodePlan::IntToDouble,
                    _ => DecodePlan::Int,
                };
                self.checked(variant, binding, plan)
            }
            Variant::Long => {
                let plan = match binding {
                    Binding::Typed(TypeResolution::Floating { size: 4 }) => DecodePlan::LongToFloat,
                    Binding::Typed(TypeResolution::Floating { .. }) => DecodePlan::LongToDouble,
                    _ => DecodePlan::Long,
                };
                self.checked(variant, binding, plan)
            }
            Variant::Float => {
                let plan = match binding {
                    Binding::Typed(TypeResolution::Floating { size: 8 }) => DecodePlan::FloatToDouble,
                    _ => DecodePlan::Float,
                };
                self.checked(variant, binding, plan)
            }
            Variant::Double => self.checked(variant, binding, DecodePlan::Double),
            Variant::Bytes => {
                let plan = match binding {
                    Binding::Typed(TypeResolution::Str) => DecodePlan::BytesToStr,
                    _ => DecodePlan::Bytes,
                };
                self.checked(variant, binding, plan)
            }
            Variant::Str => {
                let plan = match binding {
                    Binding::Typed(TypeResolution::ByteSeq) => DecodePlan::StrToBytes,
                    _ => DecodePlan::Str,
                };
                self.checked(variant, binding, plan)
            }
            Variant::Date => self.checked(variant, binding, DecodePlan::Date),
            Variant::TimeMillis => self.checked(variant, binding, DecodePlan::TimeMillis),
            Variant::TimeMicros => self.checked(variant, binding, DecodePlan::TimeMicros),
            Variant::TimestampMillis => {
                self.checked(variant, binding, DecodePlan::TimestampMillis)
            }
            Variant::TimestampMicros => {
                self.checked(variant, binding, DecodePlan::TimestampMicros)
            }
            Variant::Uuid => self.checked(variant, binding, DecodePlan::Uuid),
            Variant::Fixed { size, .. } => {
                self.checked(variant, binding, DecodePlan::Fixed { size: *size })
            }
            Variant::Decimal {
                scale, inner: base, ..
            } => {
                let plan = match &**base {
                    Variant::Fixed { size, .. } => DecodePlan::DecimalFixed {
                        scale: *scale,
                        size: *size,
                    },
                    _ => DecodePlan::DecimalBytes { scale: *scale },
                };
                self.checked(variant, binding, plan)
            }
            Variant::Duration { .. } => self.checked(variant, binding, DecodePlan::Duration),
            Variant::Enum { name, symbols, .. } => {
                match binding {
                    Binding::Typed(TypeResolution::Enum(e)) => {
                        if !e.name.matches(name) {
                            return Err(AvrokitErr::ResolvedNameMismatch {
                                resolved: e.name.value().to_string(),
                                schema: name.fullname(),
                            });
                        }
                    }
                    Binding::Typed(TypeResolution::Reference(r)) => {
                        if !r.matches(name) {
                            return Err(AvrokitErr::ResolvedNameMismatch {
                                resolved: r.value().to_string(),
                                schema: name.fullname(),
                            });
                        }
                    }
                    Binding::Typed(other) => {
                        return Err(AvrokitErr::ResolutionMismatch {
                            resolved: other.kind_name().to_string(),
                            schema: name.fullname(),
                        })
                    }
                    Binding::Natural => {}
                }
                Ok(DecodePlan::Enum {
                    symbols: symbols.clone(),
                })
            }
            Variant::Array { items } => {
                let item_binding = match binding {
                    Binding::Typed(TypeResolution::Array { items }) => Binding::Typed(&**items),
                    Binding::Natural => Binding::Natural,
                    Binding::Typed(other) => {
                        return Err(AvrokitErr::ResolutionMismatch {
                            resolved: other.kind_name().to_string(),
                            schema: "array".to_string(),
                        })
                    }
                };
                Ok(DecodePlan::Array {
                    items: Box::new(self.compile(items, item_binding)?),
                })
            }
            Variant::Map { values } => {
                let value_binding = match binding {
                    Binding::Typed(TypeResolution::Map { values, .. }) => Binding::Typed(&**values),
                    Binding::Natural => Binding::Natural,
                    Binding::Typed(other) => {
                        return Err(AvrokitErr::ResolutionMismatch {
                            resolved: other.kind_name().to_string(),
                            schema: "map".to_string(),
                        })
                    }
                };
                Ok(DecodePlan::Map {
                    values: Box::new(self.compile(values, value_binding)?),
                })
            }
            Variant::Union { variants } => {
                let payload = binding.through_optional();
                let mut branches = Vec::with_capacity(variants.len());
                for branch in variants {
                    let branch_binding = match payload {
                        Binding::Typed(r) if resolution_matches(r, branch, self.cxt) => {
                            Binding::Typed(r)
                        }
                        _ => Binding::Natural,
                    };
                    branches.push(self.compile(branch, branch_binding)?);
                }
                Ok(DecodePlan::Union { branches })
            }
            Variant::Record { name, fields, .. } => {
                let fullname = name.fullname();
                if let Some(cell) = self.cache.get(&fullname) {
                    return Ok(DecodePlan::Link {
                        name: fullname,
                        cell: cell.clone(),
                    });
                }
                let record_res = match binding {
                    Binding::Typed(TypeResolution::Record(rr)) => {
                        if !rr.name.matches(name) {
                            return Err(AvrokitErr::ResolvedNameMismatch {
                                resolved: rr.name.value().to_string(),
                                schema: fullname,
                            });
                        }
                        Some(rr)
                    }
                    Binding::Typed(TypeResolution::Reference(r)) => {
                        if !r.matches(name) {
                            return Err(AvrokitErr::ResolvedNameMismatch {
                                resolved: r.value().to_string(),
                                schema: fullname,
                            });
                        }
                        None
                    }
                    Binding::Typed(other) => {
                        return Err(AvrokitErr::ResolutionMismatch {
                            resolved: other.kind_name().to_string(),
                            schema: fullname,
                        })
                    }
                    Binding::Natural => None,
                };

                let cell = Arc::new(OnceCell::new());
                self.cache.insert(fullname.clone(), cell.clone());

                let mut field_plans = Vec::with_capacity(fields.len());
                for (fname, field) in fields {
                    let (field_binding, keep) = match record_res {
                        Some(rr) => match rr.fields.iter().find(|f| &f.name == fname) {
                            Some(f) => (Binding::Typed(&f.resolution), true),
                            // writer field with no host counterpart: consume
                            // and discard
                            None => (Binding::Natural, false),
                        },
                        None => (Binding::Natural, true),
                    };
                    field_plans.push(FieldPlan {
                        name: fname.clone(),
                        plan: self.compile(&field.ty, field_binding)?,
                        keep,
                    });
                }

                // host fields the writer schema does not carry
                let extra = match record_res {
                    Some(rr) => rr
                        .fields
                        .iter()
                        .filter(|f| !fields.contains_key(&f.name))
                        .map(|f| f.name.clone())
                        .collect(),
                    None => vec![],
                };

                let plan = DecodePlan::Record {
                    name: fullname.clone(),
                    fields: field_plans,
                    extra,
                };
                let _ = cell.set(plan);
                Ok(DecodePlan::Link {
                    name: fullname,
                    cell,
                })
            }
            Variant::Named(n) => {
                if let Some(cell) = self.cache.get(n) {
                    return Ok(DecodePlan::Link {
                        name: n.clone(),
                        cell: cell.clone(),
                    });
                }
                let definition = self
                    .cxt
                    .get(n)
                    .ok_or_else(|| AvrokitErr::NamedSchemaNotFound(n.clone()))?
                    .clone();
                self.compile(&definition, binding)
            }
        }
    }

    fn checked(
        &self,
        variant: &Variant,
        binding: Binding<'_>,
        plan: DecodePlan,
    ) -> AvrokitResult<DecodePlan> {
        super::ensure_compatible(binding, variant, self.cxt)?;
        Ok(plan)
    }
}

// Block-coded sequences prefix each block with a count; a negative count
// carries the absolute item count and is followed by the block's byte size.
fn decode_block_count<R: Read>(reader: &mut R) -> AvrokitResult<i64> {
    let count = decode_long(reader)?;
    if count < 0 {
        let _byte_size = decode_long(reader)?;
        Ok(-count)
    } else {
        Ok(count)
    }
}

pub(crate) fn decode<R: Read>(plan: &DecodePlan, reader: &mut R) -> AvrokitResult<Value> {
    let value = match plan {
        DecodePlan::Null => Value::Null,
        DecodePlan::Boolean => {
            let mut buf = [0u8; 1];
            reader
                .read_exact(&mut buf)
                .map_err(AvrokitErr::DecodeFailed)?;
            match buf {
                [0x00] => Value::Boolean(false),
                [0x01] => Value::Boolean(true),
                _ => {
                    return Err(AvrokitErr::DecodeFailed(io_err(
                        "invalid boolean value, expected a 0x00 or a 0x01",
                    )))
                }
            }
        }
        DecodePlan::Int => Value::Int(decode_int(reader)?),
        DecodePlan::Long => Value::Long(decode_long(reader)?),
        DecodePlan::Float => Value::Float(
            reader
                .read_f32::<LittleEndian>()
                .map_err(AvrokitErr::DecodeFailed)?,
        ),
        DecodePlan::Double => Value::Double(
            reader
                .read_f64::<LittleEndian>()
                .map_err(AvrokitErr::DecodeFailed)?,
        ),
        DecodePlan::Bytes => Value::Bytes(decode_bytes(reader)?),
        DecodePlan::Str => Value::Str(decode_string(reader)?),
        DecodePlan::IntToLong => Value::Long(decode_int(reader)? as i64),
        DecodePlan::IntToFloat => Value::Float(decode_int(reader)? as f32),
        DecodePlan::IntToDouble => Value::Double(decode_int(reader)? as f64),
        DecodePlan::LongToFloat => Value::Float(decode_long(reader)? as f32),
        DecodePlan::LongToDouble => Value::Double(decode_long(reader)? as f64),
        DecodePlan::FloatToDouble => Value::Double(
            reader
                .read_f32::<LittleEndian>()
                .map_err(AvrokitErr::DecodeFailed)? as f64,
        ),
        DecodePlan::BytesToStr => {
            let buf = decode_bytes(reader)?;
            let s = String::from_utf8(buf)
                .map_err(|_| AvrokitErr::DecodeFailed(io_err("bytes are not valid utf-8")))?;
            Value::Str(s)
        }
        DecodePlan::StrToBytes => Value::Bytes(decode_bytes(reader)?),
        DecodePlan::Fixed { size } => {
            let mut buf = vec![0u8; *size];
            reader
                .read_exact(&mut buf)
                .map_err(AvrokitErr::DecodeFailed)?;
            Value::Fixed(buf)
        }
        DecodePlan::Enum { symbols } => {
            let idx = decode_int(reader)?;
            if idx < 0 || idx as usize >= symbols.len() {
                return Err(AvrokitErr::InvalidEnumSymbolIdx(
                    idx as usize,
                    format!("{:?}", symbols),
                ));
            }
            Value::Enum(symbols[idx as usize].clone())
        }
        DecodePlan::Array { items } => {
            let mut collected = vec![];
            loop {
                let count = decode_block_count(reader)?;
                if count == 0 {
                    break;
                }
                for _ in 0..count {
                    collected.push(decode(items, reader)?);
                }
            }
            Value::Array(collected)
        }
        DecodePlan::Map { values } => {
            let mut hm = HashMap::new();
            loop {
                let count = decode_block_count(reader)?;
                if count == 0 {
                    break;
                }
                for _ in 0..count {
                    let key = decode_string(reader)?;
                    hm.insert(key, decode(values, reader)?);
                }
            }
            Value::Map(hm)
        }
        DecodePlan::Union { branches } => {
            let idx = decode_long(reader)?;
            let branch = branches
                .get(idx as usize)
                .filter(|_| idx >= 0)
                .ok_or(AvrokitErr::InvalidUnionBranchIdx(idx))?;
            decode(branch, reader)?
        }
        DecodePlan::Record {
            name,
            fields,
            extra,
        } => {
            let mut rec = Record::new(name);
            for field in fields {
                let value = decode(&field.plan, reader)?;
                if field.keep {
                    rec.insert(&field.name, value)?;
                }
            }
            for fname in extra {
                rec.insert(fname, Value::Null)?;
            }
            Value::Record(rec)
        }
        DecodePlan::Date => Value::Date(decode_int(reader)?),
        DecodePlan::TimeMillis => Value::TimeMillis(decode_int(reader)?),
        DecodePlan::TimeMicros => Value::TimeMicros(decode_long(reader)?),
        DecodePlan::TimestampMillis => Value::TimestampMillis(decode_long(reader)?),
        DecodePlan::TimestampMicros => Value::TimestampMicros(decode_long(reader)?),
        DecodePlan::DecimalBytes { scale } => {
            let buf = decode_bytes(reader)?;
            Value::Decimal(Decimal::from_be_bytes(&buf, *scale)?)
        }
        DecodePlan::DecimalFixed { scale, size } => {
            let mut buf = vec![0u8; *size];
            reader
                .read_exact(&mut buf)
                .map_err(AvrokitErr::DecodeFailed)?;
            Value::Decimal(Decimal::from_be_bytes(&buf, *scale)?)
        }
        DecodePlan::Duration => {
            let months = reader
                .read_u32::<LittleEndian>()
                .map_err(AvrokitErr::DecodeFailed)?;
            let days = reader
                .read_u32::<LittleEndian>()
                .map_err(AvrokitErr::DecodeFailed)?;
            let millis = reader
                .read_u32::<LittleEndian>()
                .map_err(AvrokitErr::DecodeFailed)?;
            Value::Duration(Duration::new(months, days, millis))
        }
        DecodePlan::Uuid => {
            let s = decode_string(reader)?;
            let parsed = uuid::Uuid::parse_str(&s)
                .map_err(|_| AvrokitErr::DecodeFailed(io_err("invalid uuid string")))?;
            Value::Uuid(parsed)
        }
        DecodePlan::Link { name, cell } => {
            let plan = cell
                .get()
                .ok_or_else(|| AvrokitErr::UnresolvedLink(name.clone()))?;
            decode(plan, reader)?
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::super::{BinaryDeserializer, BinarySerializer};
    use crate::value::Value;
    use crate::Schema;
    use std::str::FromStr;

    #[test]
    fn negative_block_counts_are_accepted() {
        let schema = Schema::from_str(r##"{"type": "array", "items": "int"}"##).unwrap();
        let deserializer = BinaryDeserializer::natural(&schema).unwrap();
        // one block of 2 items announced with a negative count and a byte
        // size, then the end marker: [-2 zigzag, 2 bytes, 1, 2, 0]
        let buf: Vec<u8> = vec![0x03, 0x04, 0x02, 0x04, 0x00];
        let value = deserializer.deserialize(&mut buf.as_slice()).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn multiple_blocks_concatenate() {
        let schema = Schema::from_str(r##"{"type": "array", "items": "int"}"##).unwrap();
        let deserializer = BinaryDeserializer::natural(&schema).unwrap();
        // two blocks of one item each
        let buf: Vec<u8> = vec![0x02, 0x02, 0x02, 0x04, 0x00];
        let value = deserializer.deserialize(&mut buf.as_slice()).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn union_branch_index_out_of_range_fails() {
        let schema = Schema::from_str(r##"["null", "int"]"##).unwrap();
        let deserializer = BinaryDeserializer::natural(&schema).unwrap();
        let buf: Vec<u8> = vec![0x04];
        assert!(deserializer.deserialize(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn boolean_rejects_other_bytes() {
        let schema = Schema::from_str(r##""boolean""##).unwrap();
        let deserializer = BinaryDeserializer::natural(&schema).unwrap();
        let buf: Vec<u8> = vec![0x02];
        assert!(deserializer.deserialize(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn truncated_record_fails() {
        let schema = Schema::from_str(
            r##"{"type": "record", "name": "R", "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"}
            ]}"##,
        )
        .unwrap();
        let serializer = BinarySerializer::natural(&schema).unwrap();
        let mut rec = crate::value::Record::new("R");
        rec.insert("a", 3i64).unwrap();
        rec.insert("b", "hello").unwrap();
        let buf = serializer.to_bytes(&Value::Record(rec)).unwrap();

        let deserializer = BinaryDeserializer::natural(&schema).unwrap();
        assert!(deserializer
            .deserialize(&mut buf[..buf.len() - 2].as_ref())
            .is_err());
    }
}
