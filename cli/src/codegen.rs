//! Generates Rust type definitions from a normalized avro schema document.

use anyhow::anyhow;
use serde_json::Value as JsonValue;

// Named definitions are collected in encounter order and emitted after the
// walk, so nested records come out as standalone types.
struct Generator {
    definitions: Vec<String>,
}

pub(crate) fn generate(schema: &JsonValue) -> anyhow::Result<String> {
    let mut gen = Generator {
        definitions: vec![],
    };
    let top = gen.rust_type(schema)?;
    let mut out = String::new();
    out.push_str("use serde::{Deserialize, Serialize};\n");
    out.push_str("use std::collections::HashMap;\n\n");
    for def in &gen.definitions {
        out.push_str(def);
        out.push('\n');
    }
    if gen.definitions.is_empty() {
        out.push_str(&format!("pub type Datum = {};\n", top));
    }
    Ok(out)
}

impl Generator {
    // Returns the Rust type expression for a schema node, pushing any named
    // definitions it contains.
    fn rust_type(&mut self, schema: &JsonValue) -> anyhow::Result<String> {
        match schema {
            JsonValue::String(s) => Ok(primitive_or_ref(s)),
            JsonValue::Array(branches) => self.union_type(branches),
            JsonValue::Object(map) => {
                if let Some(logical) = map.get("logicalType").and_then(|l| l.as_str()) {
                    return logical_type(logical);
                }
                let ty = map
                    .get("type")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| anyhow!("schema object without a type"))?;
                match ty {
                    "record" => self.record_type(map),
                    "enum" => self.enum_type(map),
                    "fixed" => Ok("Vec<u8>".to_string()),
                    "array" => {
                        let items = map
                            .get("items")
                            .ok_or_else(|| anyhow!("array without items"))?;
                        Ok(format!("Vec<{}>", self.rust_type(items)?))
                    }
                    "map" => {
                        let values = map
                            .get("values")
                            .ok_or_else(|| anyhow!("map without values"))?;
                        Ok(format!("HashMap<String, {}>", self.rust_type(values)?))
                    }
                    other => Ok(primitive_or_ref(other)),
                }
            }
            other => Err(anyhow!("unsupported schema node: {}", other)),
        }
    }

    fn union_type(&mut self, branches: &[JsonValue]) -> anyhow::Result<String> {
        let nulls = branches
            .iter()
            .filter(|b| b.as_str() == Some("null"))
            .count();
        let others: Vec<&JsonValue> = branches
            .iter()
            .filter(|b| b.as_str() != Some("null"))
            .collect();
        match (nulls, others.as_slice()) {
            (1, [payload]) => Ok(format!("Option<{}>", self.rust_type(payload)?)),
            // general unions have no canonical Rust shape; fall back to the
            // dynamic value
            _ => Ok("avrokit::Value".to_string()),
        }
    }

    fn record_type(
        &mut self,
        map: &serde_json::Map<String, JsonValue>,
    ) -> anyhow::Result<String> {
        let name = bare_name(
            map.get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| anyhow!("record without a name"))?,
        );
        let fields = map
            .get("fields")
            .and_then(|f| f.as_array())
            .ok_or_else(|| anyhow!("record without fields"))?;

        let mut body = String::new();
        for field in fields {
            let field = field
                .as_object()
                .ok_or_else(|| anyhow!("record field must be an object"))?;
            let fname = field
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| anyhow!("record field without a name"))?;
            let fty = self.rust_type(
                field
                    .get("type")
                    .ok_or_else(|| anyhow!("record field without a type"))?,
            )?;
            if let Some(doc) = field.get("doc").and_then(|d| d.as_str()) {
                body.push_str(&format!("    /// {}\n", doc));
            }
            body.push_str(&format!("    pub {}: {},\n", fname, fty));
        }

        let mut def = String::new();
        if let Some(doc) = map.get("doc").and_then(|d| d.as_str()) {
            def.push_str(&format!("/// {}\n", doc));
        }
        def.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        def.push_str(&format!("pub struct {} {{\n{}}}\n", name, body));
        self.definitions.push(def);
        Ok(name)
    }

    fn enum_type(&mut self, map: &serde_json::Map<String, JsonValue>) -> anyhow::Result<String> {
        let name = bare_name(
            map.get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| anyhow!("enum without a name"))?,
        );
        let symbols = map
            .get("symbols")
            .and_then(|s| s.as_array())
            .ok_or_else(|| anyhow!("enum without symbols"))?;

        let mut body = String::new();
        for symbol in symbols {
            let symbol = symbol
                .as_str()
                .ok_or_else(|| anyhow!("enum symbol must be a string"))?;
            body.push_str(&format!("    {},\n", symbol));
        }

        let mut def = String::new();
        if let Some(doc) = map.get("doc").and_then(|d| d.as_str()) {
            def.push_str(&format!("/// {}\n", doc));
        }
        def.push_str("#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]\n");
        def.push_str(&format!("pub enum {} {{\n{}}}\n", name, body));
        self.definitions.push(def);
        Ok(name)
    }
}

fn primitive_or_ref(name: &str) -> String {
    match name {
        "null" => "()".to_string(),
        "boolean" => "bool".to_string(),
        "int" => "i32".to_string(),
        "long" => "i64".to_string(),
        "float" => "f32".to_string(),
        "double" => "f64".to_string(),
        "bytes" => "Vec<u8>".to_string(),
        "string" => "String".to_string(),
        other => bare_name(other),
    }
}

fn logical_type(logical: &str) -> anyhow::Result<String> {
    let ty = match logical {
        "date" | "time-millis" => "i32",
        "time-micros" | "timestamp-millis" | "timestamp-micros" => "i64",
        "uuid" => "uuid::Uuid",
        "decimal" => "i128",
        "duration" => "avrokit::Duration",
        other => return Err(anyhow!("unknown logicalType `{}`", other)),
    };
    Ok(ty.to_string())
}

// Named references in a normalized schema may be fullnames; Rust type names
// use the bare segment.
fn bare_name(fullname: &str) -> String {
    fullname
        .rsplit('.')
        .next()
        .unwrap_or(fullname)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::generate;

    #[test]
    fn record_generates_struct() {
        let schema = serde_json::json!({
            "type": "record",
            "name": "com.acme.User",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "email", "type": ["null", "string"]}
            ]
        });
        let code = generate(&schema).unwrap();
        assert!(code.contains("pub struct User {"));
        assert!(code.contains("pub id: i64,"));
        assert!(code.contains("pub email: Option<String>,"));
    }

    #[test]
    fn primitive_generates_alias() {
        let schema = serde_json::json!("string");
        let code = generate(&schema).unwrap();
        assert!(code.contains("pub type Datum = String;"));
    }
}
