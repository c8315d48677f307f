use serde_json::Value as JsonValue;
use std::cmp::PartialEq;

// wrap overflow of 0xc15d213aa4d7a795
const EMPTY: i64 = -4513414715797952619;

static FP_TABLE: once_cell::sync::Lazy<[i64; 256]> = {
    use once_cell::sync::Lazy;
    Lazy::new(|| {
        let mut fp_table: [i64; 256] = [0; 256];
        for i in 0..256 {
            let mut fp = i;
            for _ in 0..8 {
                fp = (fp as u64 >> 1) as i64 ^ (EMPTY & -(fp & 1));
            }
            fp_table[i as usize] = fp;
        }
        fp_table
    })
};

/// Represents the Parsing Canonical Form of an avro schema. This
/// representation strips irrelevant fields such as docs and aliases and folds
/// namespaces into fullnames, so that two schemas that encode data the same
/// way compare equal. Fingerprinting methods are available on this instance.
#[derive(Debug, PartialEq)]
pub struct CanonicalSchema(pub(crate) JsonValue);

impl std::fmt::Display for CanonicalSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = serde_json::to_string_pretty(&self.0);
        write!(f, "{}", c.map_err(|_| std::fmt::Error)?)
    }
}

impl CanonicalSchema {
    /// The canonical form as compact JSON text.
    pub fn as_text(&self) -> String {
        self.0.to_string()
    }

    /// The 64-bit Rabin fingerprint of the canonical form, as defined by the
    /// Avro specification.
    pub fn rabin64(&self) -> i64 {
        let buf = self.0.to_string();
        let buf = buf.as_bytes();
        let mut fp: i64 = EMPTY;

        buf.iter().for_each(|b| {
            let idx = ((fp ^ *b as i64) & 0xff) as usize;
            fp = (fp as u64 >> 8) as i64 ^ FP_TABLE[idx];
        });

        fp
    }
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use std::str::FromStr;

    #[test]
    fn canonical_primitives() {
        let schema_str = r##"{"type": "null"}"##;
        let schema = Schema::from_str(schema_str).unwrap();
        assert_eq!(schema.canonical_form().as_text(), r##""null""##);
    }

    #[test]
    fn schema_rabin_fingerprint() {
        let schema = r##""null""##;
        let expected = "0x63dd24e7cc258f8a";
        let schema = Schema::from_str(schema).unwrap();
        let canonical = schema.canonical_form();
        let actual = format!("0x{:x}", canonical.rabin64());
        assert_eq!(expected, actual);
    }

    #[test]
    fn equality_is_canonical_equality() {
        let a = Schema::from_str(r##"{"type": "string", "doc": "left"}"##).unwrap();
        let b = Schema::from_str(r##""string""##).unwrap();
        assert_eq!(a, b);
    }
}
