//! Encode plans: the writer half of a compiled codec.

use super::{ensure_compatible, resolution_matches, Binding};
use crate::error::{AvrokitErr, AvrokitResult};
use crate::resolver::TypeResolution;
use crate::schema::{Registry, Variant};
use crate::util::{encode_len_prefixed, encode_long, encode_raw_bytes};
use crate::value::Value;
use byteorder::{LittleEndian, WriteBytesExt};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) enum EncodePlan {
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
        items: Box<EncodePlan>,
    },
    Map {
        values: Box<EncodePlan>,
    },
    Union {
        branches: Vec<(BranchKind, EncodePlan)>,
        null_branch: Option<usize>,
    },
    Record {
        fields: Vec<(String, EncodePlan)>,
    },
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
    // Forward reference to a named schema's plan; the cell is filled once the
    // definition finishes compiling.
    Link {
        name: String,
        cell: Arc<OnceCell<EncodePlan>>,
    },
}

// A compile-time summary of what runtime value shapes a union branch accepts.
#[derive(Debug)]
pub(crate) enum BranchKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Fixed { size: usize },
    Enum { symbols: Vec<String> },
    Array,
    Map,
    Record { fullname: String, bare: String },
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Decimal,
    Duration,
    Uuid,
}

pub(crate) fn branch_kind(variant: &Variant, cxt: &Registry) -> AvrokitResult<BranchKind> {
    let variant = match variant {
        Variant::Named(n) => cxt
            .get(n)
            .ok_or_else(|| AvrokitErr::NamedSchemaNotFound(n.clone()))?,
        v => v,
    };
    let kind = match variant {
        Variant::Null => BranchKind::Null,
        Variant::Boolean => BranchKind::Boolean,
        Variant::Int => BranchKind::Int,
        Variant::Long => BranchKind::Long,
        Variant::Float => BranchKind::Float,
        Variant::Double => BranchKind::Double,
        Variant::Bytes => BranchKind::Bytes,
        Variant::Str => BranchKind::Str,
        Variant::Fixed { size, .. } => BranchKind::Fixed { size: *size },
        Variant::Enum { symbols, .. } => BranchKind::Enum {
            symbols: symbols.clone(),
        },
        Variant::Array { .. } => BranchKind::Array,
        Variant::Map { .. } => BranchKind::Map,
        Variant::Record { name, .. } => BranchKind::Record {
            fullname: name.fullname(),
            bare: name.name.clone(),
        },
        Variant::Date => BranchKind::Date,
        Variant::TimeMillis => BranchKind::TimeMillis,
        Variant::TimeMicros => BranchKind::TimeMicros,
        Variant::TimestampMillis => BranchKind::TimestampMillis,
        Variant::TimestampMicros => BranchKind::TimestampMicros,
        Variant::Decimal { .. } => BranchKind::Decimal,
        Variant::Duration { .. } => BranchKind::Duration,
        Variant::Uuid => BranchKind::Uuid,
        Variant::Union { .. } | Variant::Named(_) => {
            return Err(AvrokitErr::DuplicateSchemaInUnion)
        }
    };
    Ok(kind)
}

// Runtime union branch selection: does this branch accept the value's
// runtime type? First match in declaration order wins, so promotions only
// apply when the exact branch is absent or later.
fn accepts(kind: &BranchKind, value: &Value) -> bool {
    match (value, kind) {
        (Value::Null, BranchKind::Null) => true,
        (Value::Boolean(_), BranchKind::Boolean) => true,
        (Value::Int(_), BranchKind::Int)
        | (Value::Int(_), BranchKind::Long)
        | (Value::Int(_), BranchKind::Float)
        | (Value::Int(_), BranchKind::Double) => true,
        (Value::Long(_), BranchKind::Long)
        | (Value::Long(_), BranchKind::Float)
        | (Value::Long(_), BranchKind::Double) => true,
        (Value::Float(_), BranchKind::Float) | (Value::Float(_), BranchKind::Double) => true,
        (Value::Double(_), BranchKind::Double) => true,
        (Value::Str(_), BranchKind::Str)
        | (Value::Str(_), BranchKind::Bytes)
        | (Value::Str(_), BranchKind::Uuid) => true,
        (Value::Bytes(_), BranchKind::Bytes) | (Value::Bytes(_), BranchKind::Str) => true,
        (Value::Bytes(v), BranchKind::Fixed { size })
        | (Value::Fixed(v), BranchKind::Fixed { size }) => v.len() == *size,
        (Value::Enum(sym), BranchKind::Enum { symbols }) => symbols.contains(sym),
        (Value::Array(_), BranchKind::Array) => true,
        (Value::Map(_), BranchKind::Map) => true,
        (Value::Record(r), BranchKind::Record { fullname, bare }) => {
            r.name() == fullname || r.name() == bare
        }
        (Value::Date(_), BranchKind::Date) => true,
        (Value::TimeMillis(_), BranchKind::TimeMillis) => true,
        (Value::TimeMicros(_), BranchKind::TimeMicros) => true,
        (Value::TimestampMillis(_), BranchKind::TimestampMillis) => true,
        (Value::TimestampMicros(_), BranchKind::TimestampMicros) => true,
        (Value::Decimal(_), BranchKind::Decimal) => true,
        (Value::Duration(_), BranchKind::Duration) => true,
        (Value::Uuid(_), BranchKind::Uuid) | (Value::Uuid(_), BranchKind::Str) => true,
        _ => false,
    }
}

pub(crate) struct EncoderBuild<'s> {
    cxt: &'s Registry,
    cache: HashMap<String, Arc<OnceCell<EncodePlan>>>,
}

impl<'s> EncoderBuild<'s> {
    pub(crate) fn new(cxt: &'s Registry) -> Self {
        EncoderBuild {
            cxt,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn compile(
        &mut self,
        variant: &Variant,
        binding: Binding<'_>,
    ) -> AvrokitResult<EncodePlan> {
        match variant {
            Variant::Null => Ok(EncodePlan::Null),
            Variant::Boolean => self.scalar(variant, binding, EncodePlan::Boolean),
            Variant::Int => self.scalar(variant, binding, EncodePlan::Int),
            Variant::Long => self.scalar(variant, binding, EncodePlan::Long),
            Variant::Float => self.scalar(variant, binding, EncodePlan::Float),
            Variant::Double => self.scalar(variant, binding, EncodePlan::Double),
            Variant::Bytes => self.scalar(variant, binding, EncodePlan::Bytes),
            Variant::Str => self.scalar(variant, binding, EncodePlan::Str),
            Variant::Date => self.scalar(variant, binding, EncodePlan::Date),
            Variant::TimeMillis => self.scalar(variant, binding, EncodePlan::TimeMillis),
            Variant::TimeMicros => self.scalar(variant, binding, EncodePlan::TimeMicros),
            Variant::TimestampMillis => self.scalar(variant, binding, EncodePlan::TimestampMillis),
            Variant::TimestampMicros => self.scalar(variant, binding, EncodePlan::TimestampMicros),
            Variant::Uuid => self.scalar(variant, binding, EncodePlan::Uuid),
            Variant::Fixed { size, .. } => {
                ensure_compatible(binding, variant, self.cxt)?;
                Ok(EncodePlan::Fixed { size: *size })
            }
            Variant::Decimal {
                scale, inner: base, ..
            } => {
                ensure_compatible(binding, variant, self.cxt)?;
                match &**base {
                    Variant::Fixed { size, .. } => Ok(EncodePlan::DecimalFixed {
                        scale: *scale,
                        size: *size,
                    }),
                    _ => Ok(EncodePlan::DecimalBytes { scale: *scale }),
                }
            }
            Variant::Duration { .. } => {
                ensure_compatible(binding, variant, self.cxt)?;
                Ok(EncodePlan::Duration)
            }
            Variant::Enum { name, symbols, .. } => {
                match binding.through_optional() {
                    Binding::Typed(TypeResolution::Enum(e)) => {
                        if !e.name.matches(name) {
                            return Err(AvrokitErr::ResolvedNameMismatch {
                                resolved: e.name.value().to_string(),
                                schema: name.fullname(),
                            });
                        }
                        for sym in symbols {
                            if !e.symbols.iter().any(|s| &s.name == sym) {
                                return Err(AvrokitErr::ResolutionMismatch {
                                    resolved: format!("enum without symbol `{}`", sym),
                                    schema: name.fullname(),
                                });
                            }
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
                Ok(EncodePlan::Enum {
                    symbols: symbols.clone(),
                })
            }
            Variant::Array { items } => {
                let item_binding = match binding.through_optional() {
                    Binding::Typed(TypeResolution::Array { items }) => Binding::Typed(&**items),
                    Binding::Natural => Binding::Natural,
                    Binding::Typed(other) => {
                        return Err(AvrokitErr::ResolutionMismatch {
                            resolved: other.kind_name().to_string(),
                            schema: "array".to_string(),
                        })
                    }
                };
                Ok(EncodePlan::Array {
                    items: Box::new(self.compile(items, item_binding)?),
                })
            }
            Variant::Map { values } => {
                let value_binding = match binding.through_optional() {
                    Binding::Typed(TypeResolution::Map { values, .. }) => Binding::Typed(&**values),
                    Binding::Natural => Binding::Natural,
                    Binding::Typed(other) => {
                        return Err(AvrokitErr::ResolutionMismatch {
                            resolved: other.kind_name().to_string(),
                            schema: "map".to_string(),
                        })
                    }
                };
                Ok(EncodePlan::Map {
                    values: Box::new(self.compile(values, value_binding)?),
                })
            }
            Variant::Union { variants } => {
                // a nullable host type contributes its payload to the
                // non-null branches
                let payload = binding.through_optional();
                let mut null_branch = None;
                let mut branches = Vec::with_capacity(variants.len());
                for (idx, branch) in variants.iter().enumerate() {
                    if let Variant::Null = branch {
                        null_branch = Some(idx);
                    }
                    let branch_binding = match payload {
                        Binding::Typed(r) if resolution_matches(r, branch, self.cxt) => {
                            Binding::Typed(r)
                        }
                        _ => Binding::Natural,
                    };
                    let kind = branch_kind(branch, self.cxt)?;
                    branches.push((kind, self.compile(branch, branch_binding)?));
                }
                Ok(EncodePlan::Union {
                    branches,
                    null_branch,
                })
            }
            Variant::Record { name, fields, .. } => {
                let fullname = name.fullname();
                if let Some(cell) = self.cache.get(&fullname) {
                    return Ok(EncodePlan::Link {
                        name: fullname,
                        cell: cell.clone(),
                    });
                }
                let record_res = match binding.through_optional() {
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

                // placeholder goes in before field compilation so that a
                // field referring back to this record links to it
                let cell = Arc::new(OnceCell::new());
                self.cache.insert(fullname.clone(), cell.clone());

                let mut field_plans = Vec::with_capacity(fields.len());
                for (fname, field) in fields {
                    let field_binding = record_res
                        .and_then(|rr| rr.fields.iter().find(|f| &f.name == fname))
                        .map(|f| Binding::Typed(&f.resolution))
                        .unwrap_or(Binding::Natural);
                    field_plans.push((fname.clone(), self.compile(&field.ty, field_binding)?));
                }

                let plan = EncodePlan::Record {
                    fields: field_plans,
                };
                let _ = cell.set(plan);
                Ok(EncodePlan::Link {
                    name: fullname,
                    cell,
                })
            }
            Variant::Named(n) => {
                if let Some(cell) = self.cache.get(n) {
                    return Ok(EncodePlan::Link {
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

    fn scalar(
        &self,
        variant: &Variant,
        binding: Binding<'_>,
        plan: EncodePlan,
    ) -> AvrokitResult<EncodePlan> {
        ensure_compatible(binding, variant, self.cxt)?;
        Ok(plan)
    }
}

pub(crate) fn encode<W: Write>(
    plan: &EncodePlan,
    value: &Value,
    writer: &mut W,
) -> AvrokitResult<()> {
    match (plan, value) {
        (EncodePlan::Null, Value::Null) => {}
        (EncodePlan::Boolean, Value::Boolean(b)) => {
            writer
                .write_all(&[*b as u8])
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Int, Value::Int(i)) => {
            crate::util::encode_int(*i, writer)?;
        }
        // int is promotable to long, float or double
        (EncodePlan::Long, Value::Int(i)) => {
            encode_long(*i as i64, writer)?;
        }
        (EncodePlan::Long, Value::Long(l)) => {
            encode_long(*l, writer)?;
        }
        (EncodePlan::Float, Value::Int(i)) => {
            writer
                .write_f32::<LittleEndian>(*i as f32)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Float, Value::Long(l)) => {
            writer
                .write_f32::<LittleEndian>(*l as f32)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Float, Value::Float(f)) => {
            writer
                .write_f32::<LittleEndian>(*f)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Double, Value::Int(i)) => {
            writer
                .write_f64::<LittleEndian>(*i as f64)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Double, Value::Long(l)) => {
            writer
                .write_f64::<LittleEndian>(*l as f64)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        // float is promotable to double
        (EncodePlan::Double, Value::Float(f)) => {
            writer
                .write_f64::<LittleEndian>(*f as f64)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Double, Value::Double(d)) => {
            writer
                .write_f64::<LittleEndian>(*d)
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Bytes, Value::Bytes(b)) => {
            encode_len_prefixed(b, writer)?;
        }
        // string is promotable to bytes and back
        (EncodePlan::Bytes, Value::Str(s)) | (EncodePlan::Str, Value::Str(s)) => {
            encode_len_prefixed(s.as_bytes(), writer)?;
        }
        (EncodePlan::Str, Value::Bytes(b)) => {
            encode_len_prefixed(b, writer)?;
        }
        (EncodePlan::Fixed { size }, Value::Fixed(v))
        | (EncodePlan::Fixed { size }, Value::Bytes(v)) => {
            if v.len() != *size {
                return Err(AvrokitErr::FixedValueLenMismatch {
                    found: v.len(),
                    expected: *size,
                });
            }
            encode_raw_bytes(v, writer)?;
        }
        (EncodePlan::Enum { symbols }, Value::Enum(sym)) => {
            if let Some(idx) = symbols.iter().position(|r| r == sym) {
                crate::util::encode_int(idx as i32, writer)?;
            } else {
                return Err(AvrokitErr::SchemaDataMismatch);
            }
        }
        (EncodePlan::Array { items }, Value::Array(values)) => {
            if !values.is_empty() {
                encode_long(values.len() as i64, writer)?;
                for v in values {
                    encode(items, v, writer)?;
                }
            }
            // end of blocks
            encode_long(0, writer)?;
        }
        (EncodePlan::Map { values }, Value::Map(hmap)) => {
            if !hmap.is_empty() {
                encode_long(hmap.len() as i64, writer)?;
                for (k, v) in hmap.iter() {
                    encode_len_prefixed(k.as_bytes(), writer)?;
                    encode(values, v, writer)?;
                }
            }
            encode_long(0, writer)?;
        }
        (EncodePlan::Union { .. }, Value::Union(_)) => {
            return Err(AvrokitErr::NoImmediateUnion);
        }
        (
            EncodePlan::Union {
                branches,
                null_branch,
            },
            value,
        ) => {
            // null first, then first accepting branch in declaration order
            if let Value::Null = value {
                match null_branch {
                    Some(idx) => {
                        encode_long(*idx as i64, writer)?;
                        return Ok(());
                    }
                    None => return Err(AvrokitErr::NotFoundInUnion),
                }
            }
            for (idx, (kind, branch)) in branches.iter().enumerate() {
                if accepts(kind, value) {
                    encode_long(idx as i64, writer)?;
                    return encode(branch, value, writer);
                }
            }
            return Err(AvrokitErr::NotFoundInUnion);
        }
        (EncodePlan::Record { fields }, Value::Record(record)) => {
            for (fname, fplan) in fields {
                let field_value = record
                    .get(fname)
                    .ok_or_else(|| AvrokitErr::FieldNotFound(fname.clone()))?;
                encode(fplan, field_value, writer)?;
            }
        }
        (EncodePlan::Date, Value::Date(d)) => {
            crate::util::encode_int(*d, writer)?;
        }
        (EncodePlan::Date, Value::Int(d)) => {
            crate::util::encode_int(*d, writer)?;
        }
        (EncodePlan::TimeMillis, Value::TimeMillis(t)) => {
            crate::util::encode_int(*t, writer)?;
        }
        (EncodePlan::TimeMillis, Value::Int(t)) => {
            crate::util::encode_int(*t, writer)?;
        }
        (EncodePlan::TimeMicros, Value::TimeMicros(t))
        | (EncodePlan::TimeMicros, Value::Long(t)) => {
            encode_long(*t, writer)?;
        }
        (EncodePlan::TimestampMillis, Value::TimestampMillis(t))
        | (EncodePlan::TimestampMillis, Value::Long(t)) => {
            encode_long(*t, writer)?;
        }
        (EncodePlan::TimestampMicros, Value::TimestampMicros(t))
        | (EncodePlan::TimestampMicros, Value::Long(t)) => {
            encode_long(*t, writer)?;
        }
        (EncodePlan::DecimalBytes { scale }, Value::Decimal(d)) => {
            if d.scale() != *scale {
                return Err(AvrokitErr::DecimalScaleMismatch {
                    found: d.scale(),
                    expected: *scale,
                });
            }
            encode_len_prefixed(&d.to_be_bytes_min(), writer)?;
        }
        (EncodePlan::DecimalFixed { scale, size }, Value::Decimal(d)) => {
            if d.scale() != *scale {
                return Err(AvrokitErr::DecimalScaleMismatch {
                    found: d.scale(),
                    expected: *scale,
                });
            }
            encode_raw_bytes(&d.to_be_bytes_fixed(*size)?, writer)?;
        }
        (EncodePlan::Duration, Value::Duration(d)) => {
            writer
                .write_u32::<LittleEndian>(d.months)
                .and_then(|_| writer.write_u32::<LittleEndian>(d.days))
                .and_then(|_| writer.write_u32::<LittleEndian>(d.millis))
                .map_err(AvrokitErr::EncodeFailed)?;
        }
        (EncodePlan::Uuid, Value::Uuid(u)) => {
            encode_len_prefixed(u.to_string().as_bytes(), writer)?;
        }
        (EncodePlan::Uuid, Value::Str(s)) => {
            // validate before writing so the sink never sees a non-uuid
            let parsed = uuid::Uuid::parse_str(s).map_err(|_| AvrokitErr::SchemaDataMismatch)?;
            encode_len_prefixed(parsed.to_string().as_bytes(), writer)?;
        }
        (EncodePlan::Link { name, cell }, value) => {
            let plan = cell
                .get()
                .ok_or_else(|| AvrokitErr::UnresolvedLink(name.clone()))?;
            encode(plan, value, writer)?;
        }
        _ => return Err(AvrokitErr::SchemaDataMismatch),
    }
    Ok(())
}
