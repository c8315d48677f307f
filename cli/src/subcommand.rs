use crate::codegen;
use crate::utils::{read_bytes, read_to_string};
use anyhow::{anyhow, Context};
use avrokit::wire::read_wire_header;
use avrokit::{BinarySerializer, Record, Schema, Value};
use std::path::Path;
use std::str::FromStr;

pub(crate) fn create_schema(schema_path: &Path, canonical: bool) -> anyhow::Result<()> {
    let schema = Schema::from_path(schema_path).with_context(|| "Schema did not validate")?;
    if canonical {
        println!("{}", schema.canonical_form());
    } else {
        let json: serde_json::Value = serde_json::from_str(&schema.to_json(false)?)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}

pub(crate) fn generate_code(schema_path: &Path) -> anyhow::Result<()> {
    let text = read_to_string(schema_path)?;
    // validate before generating from the normalized form
    let schema = Schema::from_str(&text).with_context(|| "Schema did not validate")?;
    let normalized: serde_json::Value = serde_json::from_str(&schema.to_json(false)?)?;
    print!("{}", codegen::generate(&normalized)?);
    Ok(())
}

pub(crate) fn get_schema(payload_path: &Path, registry_dir: Option<&Path>) -> anyhow::Result<()> {
    let payload = read_bytes(payload_path)?;
    let id = read_wire_header(&payload).with_context(|| "Not a wire-format payload")?;
    println!("{}", id);
    if let Some(dir) = registry_dir {
        let schema_path = dir.join(format!("{}.avsc", id));
        let text = read_to_string(&schema_path)?;
        let schema = Schema::from_str(&text)
            .with_context(|| format!("Schema {} did not validate", schema_path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&schema.to_json(false)?)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}

pub(crate) fn test_schema(schema_path: &Path, datum_path: &Path) -> anyhow::Result<()> {
    let schema_text = read_to_string(schema_path)?;
    let schema = Schema::from_str(&schema_text).with_context(|| "Schema did not validate")?;
    let datum_text = read_to_string(datum_path)?;
    let datum: serde_json::Value = serde_json::from_str(&datum_text)?;

    let value = value_from_json(datum, &schema)?;
    let value = match schema.validate(&value) {
        Ok(()) => value,
        // json numbers are parsed at double precision; retry a fractional
        // datum against a float schema
        Err(_) if matches!(value, Value::Double(_)) => {
            let narrowed = match value {
                Value::Double(d) => Value::Float(d as f32),
                v => v,
            };
            schema
                .validate(&narrowed)
                .map_err(|e| anyhow!("Datum does not conform to schema: {}", e))?;
            narrowed
        }
        Err(e) => return Err(anyhow!("Datum does not conform to schema: {}", e)),
    };

    // prove the datum actually encodes
    let serializer = BinarySerializer::natural(&schema)?;
    let encoded = serializer.to_bytes(&value)?;
    println!("ok: datum encodes to {} bytes", encoded.len());
    Ok(())
}

fn value_from_json(json: serde_json::Value, schema: &Schema) -> anyhow::Result<Value> {
    let value = match json {
        serde_json::Value::Object(map) => {
            Record::from_json(map, schema).map_err(|e| anyhow!("{}", e))?
        }
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => number_to_value(&n),
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            let mut collected = Vec::with_capacity(items.len());
            for item in items {
                collected.push(scalar_from_json(item)?);
            }
            Value::Array(collected)
        }
    };
    Ok(value)
}

fn number_to_value(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        if i >= i64::from(i32::min_value()) && i <= i64::from(i32::max_value()) {
            Value::Int(i as i32)
        } else {
            Value::Long(i)
        }
    } else {
        Value::Double(n.as_f64().unwrap_or_default())
    }
}

fn scalar_from_json(json: serde_json::Value) -> anyhow::Result<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => number_to_value(&n),
        serde_json::Value::String(s) => Value::Str(s),
        other => return Err(anyhow!("unsupported array item: {}", other)),
    })
}
