use super::common::{Field, Name, Order};
use super::Variant;
use crate::error::AvrokitErr;
use crate::error::AvrokitResult;
use crate::schema::common::validate_name;
use crate::value::Decimal;
use crate::value::FieldValue;
use crate::value::Value;
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::borrow::ToOwned;
use std::collections::HashMap;
use std::collections::HashSet;

// Wraps a { name -> schema } lookup table to aid parsing named references in complex schemas.
// During parsing, the value for each key may get updated as the parser discovers
// more information about the schema.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    cxt: HashMap<String, Variant>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            cxt: HashMap::new(),
        }
    }

    pub(crate) fn get<'a>(&'a self, name: &str) -> Option<&'a Variant> {
        self.cxt.get(name)
    }

    pub(crate) fn insert(&mut self, name: String, variant: Variant) -> Option<Variant> {
        self.cxt.insert(name, variant)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.cxt.contains_key(name)
    }

    pub(crate) fn parse_schema(
        &mut self,
        value: &JsonValue,
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AvrokitErr> {
        match value {
            // Parse a complex schema
            JsonValue::Object(ref schema) => self.parse_object(schema, enclosing_namespace),
            // Parse a primitive schema, could also be a named schema reference
            JsonValue::String(ref schema) => self.parse_primitive(schema, enclosing_namespace),
            // Parse a union schema
            JsonValue::Array(ref schema) => self.parse_union(schema, enclosing_namespace),
            other => Err(AvrokitErr::UnknownSchema(vec![format!(
                "expected a json string, object or array, found: {}",
                other
            )])),
        }
    }

    fn parse_union(
        &mut self,
        schema: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AvrokitErr> {
        let mut union_schema = vec![];
        let mut seen = HashSet::new();
        for s in schema {
            let parsed_schema = self.parse_schema(s, enclosing_namespace)?;
            if let Variant::Union { .. } = parsed_schema {
                return Err(AvrokitErr::DuplicateSchemaInUnion);
            }
            // Two branches with the same base type or the same fullname are
            // indistinguishable when reading, so unions reject them.
            if !seen.insert(union_branch_key(&parsed_schema)) {
                return Err(AvrokitErr::DuplicateSchemaInUnion);
            }
            union_schema.push(parsed_schema);
        }
        Ok(Variant::Union {
            variants: union_schema,
        })
    }

    fn get_fullname(&self, name: &str, enclosing_namespace: Option<&str>) -> String {
        if name.contains('.') {
            return name.to_string();
        }
        if let Some(namespace) = enclosing_namespace {
            format!("{}.{}", namespace, name)
        } else {
            name.to_string()
        }
    }

    /// Parse a `serde_json::Value` representing a primitive Avro type into a `Variant`.
    fn parse_primitive(
        &mut self,
        schema: &str,
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AvrokitErr> {
        match schema {
            "null" => Ok(Variant::Null),
            "boolean" => Ok(Variant::Boolean),
            "int" => Ok(Variant::Int),
            "long" => Ok(Variant::Long),
            "double" => Ok(Variant::Double),
            "float" => Ok(Variant::Float),
            "bytes" => Ok(Variant::Bytes),
            "string" => Ok(Variant::Str),
            other if !other.is_empty() => {
                let name = self.get_fullname(other, enclosing_namespace);
                if self.cxt.contains_key(&name) {
                    Ok(Variant::Named(name))
                } else if self.cxt.contains_key(other) {
                    // unqualified reference to a schema in the null namespace
                    Ok(Variant::Named(other.to_string()))
                } else {
                    Err(AvrokitErr::NamedSchemaNotFound(other.to_string()))
                }
            }
            _ => Err(AvrokitErr::InvalidPrimitiveSchema),
        }
    }

    fn parse_record_fields(
        &mut self,
        fields: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> Result<IndexMap<String, Field>, AvrokitErr> {
        let mut fields_parsed = IndexMap::with_capacity(fields.len());
        for field_obj in fields {
            match field_obj {
                JsonValue::Object(o) => {
                    let name = o
                        .get("name")
                        .and_then(|a| a.as_str())
                        .ok_or(AvrokitErr::RecordNameNotFound)?;

                    let ty: &JsonValue = o.get("type").ok_or(AvrokitErr::RecordTypeNotFound)?;
                    let mut ty = self.parse_schema(ty, enclosing_namespace)?;

                    // if ty is named use enclosing namespace to construct the fullname
                    if let Some(name) = ty.get_named_mut() {
                        if name.namespace().is_none() {
                            if let Some(namespace) = enclosing_namespace {
                                name.set_namespace(namespace)?;
                            }
                        }
                    }

                    let default = if let Some(v) = o.get("default") {
                        Some(parse_default(v, &ty)?)
                    } else {
                        None
                    };

                    let order = if let Some(order) = o.get("order") {
                        parse_field_order(order)?
                    } else {
                        Order::Ascending
                    };

                    let doc = parse_doc(o.get("doc"));
                    let aliases = parse_aliases(o.get("aliases"));

                    let prev = fields_parsed.insert(
                        name.to_string(),
                        Field::new(name, ty, doc, default, order, aliases)?,
                    );
                    if prev.is_some() {
                        return Err(AvrokitErr::DuplicateField(name.to_string()));
                    }
                }
                _ => return Err(AvrokitErr::InvalidRecordFieldType),
            }
        }

        Ok(fields_parsed)
    }

    // Inserts a freshly parsed named schema, rejecting redefinitions.
    fn register_named(&mut self, fullname: String, variant: Variant) -> Result<(), AvrokitErr> {
        if self.cxt.contains_key(&fullname) {
            return Err(AvrokitErr::DuplicateSchema(fullname));
        }
        self.cxt.insert(fullname, variant);
        Ok(())
    }

    // Parses the attributes of a fixed schema without touching the registry,
    // so that logical refinements over fixed can register the wrapped variant.
    fn parse_fixed_raw(
        &mut self,
        value: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> Result<(Name, Variant), AvrokitErr> {
        let name = Name::from_json(value, enclosing_namespace)?;
        let size = value.get("size").ok_or(AvrokitErr::FixedSizeNotFound)?;
        let size = size.as_u64().ok_or(AvrokitErr::FixedSizeNotNumber)? as usize;
        let aliases = parse_aliases(value.get("aliases"));

        let fixed_schema = Variant::Fixed {
            name: name.clone(),
            aliases,
            size,
        };

        Ok((name, fixed_schema))
    }

    // Logical types are tried first. A `logicalType` attribute over the wrong
    // base, or with malformed attributes that make the refinement meaningless,
    // falls back to the base type as the Avro spec prescribes; a matching base
    // with inconsistent attributes is an error.
    fn parse_logical(
        &mut self,
        value: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
        reasons: &mut Vec<String>,
    ) -> Result<Option<Variant>, AvrokitErr> {
        let logical = match value.get("logicalType") {
            Some(JsonValue::String(s)) => s.as_str(),
            Some(other) => {
                reasons.push(format!("logicalType must be a string, found: {}", other));
                return Ok(None);
            }
            None => return Ok(None),
        };
        let base = value.get("type").and_then(|t| t.as_str());

        match (logical, base) {
            ("date", Some("int")) => Ok(Some(Variant::Date)),
            ("time-millis", Some("int")) => Ok(Some(Variant::TimeMillis)),
            ("time-micros", Some("long")) => Ok(Some(Variant::TimeMicros)),
            ("timestamp-millis", Some("long")) => Ok(Some(Variant::TimestampMillis)),
            ("timestamp-micros", Some("long")) => Ok(Some(Variant::TimestampMicros)),
            ("uuid", Some("string")) => Ok(Some(Variant::Uuid)),
            ("decimal", Some(base @ "bytes")) | ("decimal", Some(base @ "fixed")) => {
                let precision = value
                    .get("precision")
                    .and_then(|p| p.as_u64())
                    .filter(|p| *p > 0)
                    .ok_or_else(|| AvrokitErr::LogicalBaseMismatch {
                        logical: "decimal".to_string(),
                        base: format!("{} without a positive precision", base),
                    })? as usize;
                let scale = value.get("scale").and_then(|s| s.as_u64()).unwrap_or(0) as usize;
                if scale > precision {
                    return Err(AvrokitErr::LogicalBaseMismatch {
                        logical: "decimal".to_string(),
                        base: format!("scale {} exceeds precision {}", scale, precision),
                    });
                }
                if base == "fixed" {
                    let (name, fixed) = self.parse_fixed_raw(value, enclosing_namespace)?;
                    let decimal = Variant::Decimal {
                        precision,
                        scale,
                        inner: Box::new(fixed),
                    };
                    self.register_named(name.fullname(), decimal.clone())?;
                    return Ok(Some(decimal));
                }
                Ok(Some(Variant::Decimal {
                    precision,
                    scale,
                    inner: Box::new(Variant::Bytes),
                }))
            }
            ("duration", Some("fixed")) => {
                let (name, fixed) = self.parse_fixed_raw(value, enclosing_namespace)?;
                if let Variant::Fixed { size: 12, .. } = fixed {
                    let duration = Variant::Duration {
                        inner: Box::new(fixed),
                    };
                    self.register_named(name.fullname(), duration.clone())?;
                    Ok(Some(duration))
                } else {
                    Err(AvrokitErr::LogicalBaseMismatch {
                        logical: "duration".to_string(),
                        base: "fixed with a size other than 12".to_string(),
                    })
                }
            }
            (other, base) => {
                log::debug!(
                    "ignoring logicalType `{}` over base `{:?}`, falling back to base type",
                    other,
                    base
                );
                reasons.push(format!(
                    "logicalType `{}` is not applicable over base `{:?}`",
                    other, base
                ));
                Ok(None)
            }
        }
    }

    fn parse_object(
        &mut self,
        value: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> Result<Variant, AvrokitErr> {
        let mut reasons = vec![];
        if let Some(logical) = self.parse_logical(value, enclosing_namespace, &mut reasons)? {
            return Ok(logical);
        }

        match value.get("type") {
            Some(&JsonValue::String(ref s)) if s == "record" => {
                let rec_name = Name::from_json(value, enclosing_namespace)?;
                let fullname = rec_name.fullname();

                if self.cxt.contains_key(&fullname) {
                    return Err(AvrokitErr::DuplicateSchema(fullname));
                }
                // Insert a named reference before parsing fields to support
                // recursive schema definitions.
                self.cxt
                    .insert(fullname.clone(), Variant::Named(fullname.clone()));

                let fields = if let Some(JsonValue::Array(ref fields_vec)) = value.get("fields") {
                    fields_vec
                } else {
                    return Err(AvrokitErr::ExpectedFieldsJsonArray);
                };

                let fields = self.parse_record_fields(fields, {
                    if rec_name.namespace().is_some() {
                        // Most tightly enclosing namespace, which is this namespace
                        rec_name.namespace()
                    } else {
                        enclosing_namespace
                    }
                })?;

                let aliases = parse_aliases(value.get("aliases"));
                let doc = parse_doc(value.get("doc"));

                let rec = Variant::Record {
                    name: rec_name,
                    aliases,
                    doc,
                    fields,
                };

                // a nested definition may have claimed the name while fields
                // were being parsed
                if let Some(Variant::Named(_)) = self.cxt.get(&fullname) {
                    self.cxt.insert(fullname, rec.clone());
                } else {
                    return Err(AvrokitErr::DuplicateSchema(fullname));
                }

                Ok(rec)
            }
            Some(&JsonValue::String(ref s)) if s == "enum" => {
                let name = Name::from_json(value, enclosing_namespace)?;
                let aliases = parse_aliases(value.get("aliases"));
                let doc = parse_doc(value.get("doc"));
                let mut symbols = vec![];

                if let Some(v) = value.get("symbols") {
                    match v {
                        JsonValue::Array(sym) => {
                            for v in sym {
                                let symbol = v.as_str().ok_or(AvrokitErr::EnumSymbolParseErr)?;
                                validate_name(symbol)?;
                                if symbols.iter().any(|s| s == symbol) {
                                    return Err(AvrokitErr::DuplicateSymbol(symbol.to_string()));
                                }
                                symbols.push(symbol.to_string());
                            }
                        }
                        other => {
                            return Err(AvrokitErr::EnumParseErr(format!("{:?}", other)));
                        }
                    }
                } else {
                    return Err(AvrokitErr::EnumSymbolsMissing);
                }

                let name_str = name.fullname();

                let enum_schema = Variant::Enum {
                    name,
                    aliases,
                    doc,
                    symbols,
                };

                self.register_named(name_str, enum_schema.clone())?;

                Ok(enum_schema)
            }
            Some(&JsonValue::String(ref s)) if s == "array" => {
                let items_schema = value.get("items").ok_or_else(|| {
                    AvrokitErr::UnknownSchema(vec![
                        "Array schema must have `items` field defined".to_string()
                    ])
                })?;
                let parsed_items = self.parse_schema(items_schema, enclosing_namespace)?;
                Ok(Variant::Array {
                    items: Box::new(parsed_items),
                })
            }
            Some(&JsonValue::String(ref s)) if s == "map" => {
                let values_schema = value.get("values").ok_or_else(|| {
                    AvrokitErr::UnknownSchema(vec![
                        "Map schema must have `values` field defined".to_string()
                    ])
                })?;
                let parsed_values = self.parse_schema(values_schema, enclosing_namespace)?;
                Ok(Variant::Map {
                    values: Box::new(parsed_values),
                })
            }
            Some(&JsonValue::String(ref s)) if s == "fixed" => {
                let (name, fixed_schema) = self.parse_fixed_raw(value, enclosing_namespace)?;
                self.register_named(name.fullname(), fixed_schema.clone())?;
                Ok(fixed_schema)
            }
            Some(JsonValue::String(ref s)) if s == "null" => Ok(Variant::Null),
            Some(JsonValue::String(ref s)) if s == "boolean" => Ok(Variant::Boolean),
            Some(JsonValue::String(ref s)) if s == "int" => Ok(Variant::Int),
            Some(JsonValue::String(ref s)) if s == "long" => Ok(Variant::Long),
            Some(JsonValue::String(ref s)) if s == "float" => Ok(Variant::Float),
            Some(JsonValue::String(ref s)) if s == "double" => Ok(Variant::Double),
            Some(JsonValue::String(ref s)) if s == "bytes" => Ok(Variant::Bytes),
            Some(JsonValue::String(ref s)) if s == "string" => Ok(Variant::Str),
            other => {
                reasons.push(format!(
                    "object is not a logical, collection, named or primitive schema; `type` was {:?}",
                    other
                ));
                Err(AvrokitErr::UnknownSchema(reasons))
            }
        }
    }
}

// The branch identity the union uniqueness rule is keyed on: fullnames for
// named schemas, the base type name otherwise (a logical refinement competes
// with its base type).
fn union_branch_key(variant: &Variant) -> String {
    match variant {
        Variant::Record { name, .. } | Variant::Enum { name, .. } | Variant::Fixed { name, .. } => {
            name.fullname()
        }
        Variant::Decimal { inner, .. } | Variant::Duration { inner } => match &**inner {
            Variant::Fixed { name, .. } => name.fullname(),
            _ => "bytes".to_string(),
        },
        Variant::Named(name) => name.clone(),
        Variant::Date | Variant::TimeMillis => "int".to_string(),
        Variant::TimeMicros | Variant::TimestampMillis | Variant::TimestampMicros => {
            "long".to_string()
        }
        Variant::Uuid => "string".to_string(),
        other => other.type_name().to_string(),
    }
}

fn parse_doc(value: Option<&JsonValue>) -> Option<String> {
    if let Some(JsonValue::String(s)) = value {
        Some(s.to_string())
    } else {
        None
    }
}

// Parses the `order` of a field, defaults to `ascending` order
pub(crate) fn parse_field_order(order: &JsonValue) -> AvrokitResult<Order> {
    match *order {
        JsonValue::String(ref s) => s.parse(),
        _ => Err(AvrokitErr::InvalidFieldOrdering),
    }
}

// Parses aliases of a schema or a field
fn parse_aliases(aliases: Option<&JsonValue>) -> Option<Vec<String>> {
    match aliases {
        Some(JsonValue::Array(ref aliases)) => {
            let mut alias_parsed = Vec::with_capacity(aliases.len());
            for a in aliases {
                let a = a.as_str().map(ToOwned::to_owned)?;
                alias_parsed.push(a);
            }
            Some(alias_parsed)
        }
        _ => None,
    }
}

pub(crate) fn parse_default(
    default_value: &JsonValue,
    schema_variant: &Variant,
) -> Result<Value, AvrokitErr> {
    match (default_value, schema_variant) {
        (d, Variant::Union { variants }) => {
            let first_variant = variants.first().ok_or(AvrokitErr::FailedDefaultUnion)?;
            parse_default(d, first_variant)
        }
        (JsonValue::Null, Variant::Null) => Ok(Value::Null),
        (JsonValue::Bool(v), Variant::Boolean) => Ok(Value::Boolean(*v)),
        (JsonValue::Number(n), Variant::Int) => Ok(Value::Int(
            n.as_i64().ok_or(AvrokitErr::DefaultValueParse)? as i32,
        )),
        (JsonValue::Number(n), Variant::Long) => {
            Ok(Value::Long(n.as_i64().ok_or(AvrokitErr::DefaultValueParse)?))
        }
        (JsonValue::Number(n), Variant::Float) => Ok(Value::Float(
            n.as_f64().ok_or(AvrokitErr::DefaultValueParse)? as f32,
        )),
        (JsonValue::Number(n), Variant::Double) => Ok(Value::Double(
            n.as_f64().ok_or(AvrokitErr::DefaultValueParse)?,
        )),
        (JsonValue::Number(n), Variant::Date) => Ok(Value::Date(
            n.as_i64().ok_or(AvrokitErr::DefaultValueParse)? as i32,
        )),
        (JsonValue::Number(n), Variant::TimeMillis) => Ok(Value::TimeMillis(
            n.as_i64().ok_or(AvrokitErr::DefaultValueParse)? as i32,
        )),
        (JsonValue::Number(n), Variant::TimeMicros) => Ok(Value::TimeMicros(
            n.as_i64().ok_or(AvrokitErr::DefaultValueParse)?,
        )),
        (JsonValue::Number(n), Variant::TimestampMillis) => Ok(Value::TimestampMillis(
            n.as_i64().ok_or(AvrokitErr::DefaultValueParse)?,
        )),
        (JsonValue::Number(n), Variant::TimestampMicros) => Ok(Value::TimestampMicros(
            n.as_i64().ok_or(AvrokitErr::DefaultValueParse)?,
        )),
        (JsonValue::String(n), Variant::Uuid) => uuid::Uuid::parse_str(n)
            .map(Value::Uuid)
            .map_err(|_| AvrokitErr::DefaultValueParse),
        (JsonValue::Number(n), Variant::Decimal { scale, .. }) => {
            let unscaled = if let Some(i) = n.as_i64() {
                i128::from(i)
            } else if let Some(u) = n.as_u64() {
                i128::from(u)
            } else {
                return Err(AvrokitErr::DefaultValueParse);
            };
            Ok(Value::Decimal(Decimal::new(unscaled, *scale)))
        }
        // unscaled values wider than a json number arrive as strings
        (JsonValue::String(s), Variant::Decimal { scale, .. }) => s
            .parse::<i128>()
            .map(|unscaled| Value::Decimal(Decimal::new(unscaled, *scale)))
            .map_err(|_| AvrokitErr::DefaultValueParse),
        (JsonValue::String(n), Variant::Bytes) => Ok(Value::Bytes(n.as_bytes().to_vec())),
        (JsonValue::String(n), Variant::Str) => Ok(Value::Str(n.clone())),
        (JsonValue::Object(v), Variant::Record { name, fields, .. }) => {
            let mut values = IndexMap::with_capacity(v.len());

            for (k, v) in v {
                let parsed_value = parse_default(
                    v,
                    &fields.get(k).ok_or(AvrokitErr::DefaultValueParse)?.ty,
                )?;
                values.insert(k.to_string(), FieldValue::new(parsed_value));
            }

            Ok(Value::Record(crate::value::Record {
                fields: values,
                name: name.fullname(),
            }))
        }
        (JsonValue::String(n), Variant::Enum { symbols, .. }) => {
            if symbols.contains(n) {
                Ok(Value::Enum(n.clone()))
            } else {
                Err(AvrokitErr::EnumSymbolNotPresent)
            }
        }
        (JsonValue::Array(arr), Variant::Array { items }) => {
            let mut default_arr_items: Vec<Value> = Vec::with_capacity(arr.len());
            for v in arr {
                let parsed_default = parse_default(v, items);
                default_arr_items.push(parsed_default?);
            }

            Ok(Value::Array(default_arr_items))
        }
        (
            JsonValue::Object(map),
            Variant::Map {
                values: values_schema,
            },
        ) => {
            let mut values = std::collections::HashMap::with_capacity(map.len());
            for (k, v) in map {
                let parsed_value = parse_default(v, values_schema)?;
                values.insert(k.to_string(), parsed_value);
            }

            Ok(Value::Map(values))
        }

        (JsonValue::String(n), Variant::Fixed { .. }) => Ok(Value::Fixed(n.as_bytes().to_vec())),
        (_d, _s) => Err(AvrokitErr::DefaultValueParse),
    }
}
