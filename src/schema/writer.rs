//! Renders a parsed schema back to JSON, either in full or in
//! Parsing Canonical Form.

use crate::error::{AvrokitErr, AvrokitResult};
use crate::schema::common::{Field, Name, Order};
use crate::schema::{Registry, Variant};
use crate::value::Value;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::HashMap;

// Tracks which named schemas have already been written out in full. A second
// occurrence of the same fullname is emitted as a bare name string when the
// definitions coincide, and rejected when they do not.
#[derive(Debug, Default)]
pub(crate) struct NameCache {
    seen: HashMap<String, Variant>,
}

impl NameCache {
    // Returns true when the definition was already present (and equal).
    fn insert(&mut self, fullname: &str, variant: &Variant) -> AvrokitResult<bool> {
        if let Some(existing) = self.seen.get(fullname) {
            if existing == variant {
                Ok(true)
            } else {
                Err(AvrokitErr::SchemaConflict(fullname.to_string()))
            }
        } else {
            self.seen.insert(fullname.to_string(), variant.clone());
            Ok(false)
        }
    }
}

pub(crate) fn to_json(
    variant: &Variant,
    cxt: &Registry,
    canonical: bool,
) -> AvrokitResult<JsonValue> {
    let mut names = NameCache::default();
    write_variant(variant, cxt, &mut names, canonical)
}

pub(crate) fn write_variant(
    variant: &Variant,
    cxt: &Registry,
    names: &mut NameCache,
    canonical: bool,
) -> AvrokitResult<JsonValue> {
    match variant {
        Variant::Null
        | Variant::Boolean
        | Variant::Int
        | Variant::Long
        | Variant::Float
        | Variant::Double
        | Variant::Bytes
        | Variant::Str => Ok(json!(variant.type_name())),
        Variant::Record {
            name,
            aliases,
            doc,
            fields,
        } => {
            if names.insert(&name.fullname(), variant)? {
                return Ok(json!(name.fullname()));
            }
            let mut field_objs = Vec::with_capacity(fields.len());
            for field in fields.values() {
                field_objs.push(write_field(field, cxt, names, canonical)?);
            }
            if canonical {
                let mut map = JsonMap::new();
                map.insert("name".to_string(), json!(name.fullname()));
                map.insert("type".to_string(), json!("record"));
                map.insert("fields".to_string(), json!(field_objs));
                Ok(JsonValue::Object(map))
            } else {
                let mut map = named_header("record", name);
                write_doc_and_aliases(&mut map, doc.as_ref(), aliases.as_ref());
                map.insert("fields".to_string(), json!(field_objs));
                Ok(JsonValue::Object(map))
            }
        }
        Variant::Enum {
            name,
            aliases,
            doc,
            symbols,
        } => {
            if names.insert(&name.fullname(), variant)? {
                return Ok(json!(name.fullname()));
            }
            if canonical {
                let mut map = JsonMap::new();
                map.insert("name".to_string(), json!(name.fullname()));
                map.insert("type".to_string(), json!("enum"));
                map.insert("symbols".to_string(), json!(symbols));
                Ok(JsonValue::Object(map))
            } else {
                let mut map = named_header("enum", name);
                write_doc_and_aliases(&mut map, doc.as_ref(), aliases.as_ref());
                map.insert("symbols".to_string(), json!(symbols));
                Ok(JsonValue::Object(map))
            }
        }
        Variant::Fixed { .. } => write_fixed(variant, names, canonical, None),
        Variant::Array { items } => {
            let items = write_variant(items, cxt, names, canonical)?;
            let mut map = JsonMap::new();
            map.insert("type".to_string(), json!("array"));
            map.insert("items".to_string(), items);
            Ok(JsonValue::Object(map))
        }
        Variant::Map { values } => {
            let values = write_variant(values, cxt, names, canonical)?;
            let mut map = JsonMap::new();
            map.insert("type".to_string(), json!("map"));
            map.insert("values".to_string(), values);
            Ok(JsonValue::Object(map))
        }
        Variant::Union { variants } => {
            let mut branches = Vec::with_capacity(variants.len());
            for v in variants {
                branches.push(write_variant(v, cxt, names, canonical)?);
            }
            Ok(JsonValue::Array(branches))
        }
        Variant::Named(fullname) => {
            if names.seen.contains_key(fullname) {
                return Ok(json!(fullname));
            }
            // reference precedes its definition in this traversal; write the
            // definition from the registry
            let definition = cxt
                .get(fullname)
                .ok_or_else(|| AvrokitErr::NamedSchemaNotFound(fullname.clone()))?
                .clone();
            write_variant(&definition, cxt, names, canonical)
        }
        Variant::Date => write_logical("int", "date", canonical),
        Variant::TimeMillis => write_logical("int", "time-millis", canonical),
        Variant::TimeMicros => write_logical("long", "time-micros", canonical),
        Variant::TimestampMillis => write_logical("long", "timestamp-millis", canonical),
        Variant::TimestampMicros => write_logical("long", "timestamp-micros", canonical),
        Variant::Uuid => write_logical("string", "uuid", canonical),
        Variant::Decimal {
            precision,
            scale,
            inner,
        } => match &**inner {
            Variant::Fixed { .. } => {
                let mut attrs = JsonMap::new();
                attrs.insert("logicalType".to_string(), json!("decimal"));
                attrs.insert("precision".to_string(), json!(precision));
                attrs.insert("scale".to_string(), json!(scale));
                // the enclosing decimal is the registered definition for the
                // fixed's fullname
                write_fixed_of(inner, variant, names, canonical, Some(attrs))
            }
            _ => {
                if canonical {
                    Ok(json!("bytes"))
                } else {
                    let mut map = JsonMap::new();
                    map.insert("type".to_string(), json!("bytes"));
                    map.insert("logicalType".to_string(), json!("decimal"));
                    map.insert("precision".to_string(), json!(precision));
                    map.insert("scale".to_string(), json!(scale));
                    Ok(JsonValue::Object(map))
                }
            }
        },
        Variant::Duration { inner } => {
            let mut attrs = JsonMap::new();
            attrs.insert("logicalType".to_string(), json!("duration"));
            write_fixed_of(inner, variant, names, canonical, Some(attrs))
        }
    }
}

// Non-canonical header shared by the named types: type, name, namespace.
fn named_header(ty: &str, name: &Name) -> JsonMap<String, JsonValue> {
    let mut map = JsonMap::new();
    map.insert("type".to_string(), json!(ty));
    map.insert("name".to_string(), json!(name.name.clone()));
    if let Some(ns) = name.namespace() {
        if !ns.is_empty() {
            map.insert("namespace".to_string(), json!(ns));
        }
    }
    map
}

fn write_doc_and_aliases(
    map: &mut JsonMap<String, JsonValue>,
    doc: Option<&String>,
    aliases: Option<&Vec<String>>,
) {
    if let Some(doc) = doc {
        map.insert("doc".to_string(), json!(doc));
    }
    if let Some(aliases) = aliases {
        map.insert("aliases".to_string(), json!(aliases));
    }
}

fn write_fixed(
    fixed: &Variant,
    names: &mut NameCache,
    canonical: bool,
    logical_attrs: Option<JsonMap<String, JsonValue>>,
) -> AvrokitResult<JsonValue> {
    write_fixed_of(fixed, fixed, names, canonical, logical_attrs)
}

// Writes a fixed schema, registering `definition` (which may be a logical
// refinement wrapping the fixed) under the fixed's fullname.
fn write_fixed_of(
    fixed: &Variant,
    definition: &Variant,
    names: &mut NameCache,
    canonical: bool,
    logical_attrs: Option<JsonMap<String, JsonValue>>,
) -> AvrokitResult<JsonValue> {
    let (name, aliases, size) = match fixed {
        Variant::Fixed {
            name,
            aliases,
            size,
        } => (name, aliases, size),
        other => {
            return Err(AvrokitErr::UnknownSchema(vec![format!(
                "expected a fixed base, found {}",
                other.type_name()
            )]))
        }
    };
    if names.insert(&name.fullname(), definition)? {
        return Ok(json!(name.fullname()));
    }
    if canonical {
        let mut map = JsonMap::new();
        map.insert("name".to_string(), json!(name.fullname()));
        map.insert("type".to_string(), json!("fixed"));
        map.insert("size".to_string(), json!(size));
        Ok(JsonValue::Object(map))
    } else {
        let mut map = named_header("fixed", name);
        write_doc_and_aliases(&mut map, None, aliases.as_ref());
        map.insert("size".to_string(), json!(size));
        if let Some(attrs) = logical_attrs {
            for (k, v) in attrs {
                map.insert(k, v);
            }
        }
        Ok(JsonValue::Object(map))
    }
}

fn write_logical(base: &str, logical: &str, canonical: bool) -> AvrokitResult<JsonValue> {
    if canonical {
        Ok(json!(base))
    } else {
        let mut map = JsonMap::new();
        map.insert("type".to_string(), json!(base));
        map.insert("logicalType".to_string(), json!(logical));
        Ok(JsonValue::Object(map))
    }
}

fn write_field(
    field: &Field,
    cxt: &Registry,
    names: &mut NameCache,
    canonical: bool,
) -> AvrokitResult<JsonValue> {
    let ty = write_variant(&field.ty, cxt, names, canonical)?;
    let mut map = JsonMap::new();
    map.insert("name".to_string(), json!(field.name));
    map.insert("type".to_string(), ty);
    if !canonical {
        if let Some(doc) = &field.doc {
            map.insert("doc".to_string(), json!(doc));
        }
        if let Some(default) = &field.default {
            map.insert("default".to_string(), value_to_json(default));
        }
        if field.order != Order::Ascending {
            map.insert("order".to_string(), json!(field.order.as_str()));
        }
        if let Some(aliases) = &field.aliases {
            map.insert("aliases".to_string(), json!(aliases));
        }
    }
    Ok(JsonValue::Object(map))
}

// Renders a default value back to its JSON form.
fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(b),
        Value::Int(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::Float(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Str(s) | Value::Enum(s) => json!(s),
        Value::Bytes(b) | Value::Fixed(b) => json!(String::from_utf8_lossy(b)),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(m) => {
            let mut map = JsonMap::new();
            for (k, v) in m {
                map.insert(k.clone(), value_to_json(v));
            }
            JsonValue::Object(map)
        }
        Value::Record(rec) => {
            let mut map = JsonMap::new();
            for (k, v) in &rec.fields {
                map.insert(k.clone(), value_to_json(&v.value));
            }
            JsonValue::Object(map)
        }
        Value::Date(v) | Value::TimeMillis(v) => json!(v),
        Value::TimeMicros(v) | Value::TimestampMillis(v) | Value::TimestampMicros(v) => json!(v),
        // json numbers cap out at 64 bits; the unscaled value is carried as
        // a string so the full i128 magnitude survives
        Value::Decimal(d) => json!(d.unscaled().to_string()),
        Value::Duration(d) => json!([d.months, d.days, d.millis]),
        Value::Uuid(u) => json!(u.to_string()),
        Value::Union(inner) => value_to_json(inner),
        Value::Byte(b) => json!(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Schema;
    use indexmap::IndexMap;
    use std::str::FromStr;

    fn record_named(fullname: &str, field_ty: Variant) -> Variant {
        let name = Name::new(fullname).unwrap();
        let mut fields = IndexMap::new();
        fields.insert(
            "value".to_string(),
            Field::new("value", field_ty, None, None, Order::Ascending, None).unwrap(),
        );
        Variant::Record {
            name,
            aliases: None,
            doc: None,
            fields,
        }
    }

    #[test]
    fn conflicting_names_fail_on_write() {
        let dup_a = record_named("ns.Dup", Variant::Int);
        let dup_b = record_named("ns.Dup", Variant::Str);
        let union = Variant::Union {
            variants: vec![dup_a, dup_b],
        };
        let err = to_json(&union, &Registry::new(), false);
        assert!(matches!(err, Err(AvrokitErr::SchemaConflict(_))));
    }

    #[test]
    fn repeated_reference_writes_name_string() {
        let schema = Schema::from_str(
            r##"
            {
                "type": "record",
                "name": "ns.Dup",
                "fields": [
                    {"name": "left", "type": {"type": "fixed", "name": "Block", "size": 4}},
                    {"name": "right", "type": "Block"}
                ]
            }
            "##,
        )
        .unwrap();
        let json = schema.to_json(false).unwrap();
        assert_eq!(json.matches("\"size\"").count(), 1);
        assert!(json.contains(r##""right","type":"ns.Block""##));
    }

    #[test]
    fn canonical_strips_nonessentials() {
        let schema = Schema::from_str(
            r##"
            {
                "type": "record",
                "name": "Rec",
                "namespace": "com.foo",
                "doc": "docs are stripped",
                "aliases": ["OldRec"],
                "fields": [
                    {"name": "ts", "type": {"type": "long", "logicalType": "timestamp-millis"}, "doc": "field doc"},
                    {"name": "count", "type": "int", "default": 42}
                ]
            }
            "##,
        )
        .unwrap();
        let canonical = schema.to_json(true).unwrap();
        for gone in &["doc", "aliases", "logicalType", "default", "namespace"] {
            assert!(!canonical.contains(gone), "found `{}` in {}", gone, canonical);
        }
        assert!(canonical.contains(r##""name":"com.foo.Rec""##));
    }

    #[test]
    fn canonical_attribute_order_is_name_then_type() {
        let schema = Schema::from_str(
            r##"{"type": "fixed", "name": "Sum", "namespace": "md5", "size": 16}"##,
        )
        .unwrap();
        assert_eq!(
            schema.to_json(true).unwrap(),
            r##"{"name":"md5.Sum","type":"fixed","size":16}"##
        );
    }

    #[test]
    fn logical_date_canonicalizes_to_bare_int() {
        let schema = Schema::from_str(r##"{"type": "int", "logicalType": "date"}"##).unwrap();
        assert_eq!(schema.to_json(true).unwrap(), r##""int""##);
        assert_eq!(
            schema.to_json(false).unwrap(),
            r##"{"type":"int","logicalType":"date"}"##
        );
    }
}
