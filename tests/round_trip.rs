extern crate pretty_env_logger;

mod common;

use avrokit::resolver::{Resolver, StructDescriptor, TypeDescriptor};
use avrokit::{
    from_value, to_value, BinaryDeserializer, BinarySerializer, Decimal, Duration, Record, Value,
};
use common::{roundtrip_natural, schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

///////////////////////////////////////////////////////////////////////////////
/// Primitive schema round-trips
///////////////////////////////////////////////////////////////////////////////

#[test]
fn roundtrip_primitives() {
    assert_eq!(roundtrip_natural(r##""null""##, &Value::Null), Value::Null);
    assert_eq!(
        roundtrip_natural(r##""boolean""##, &Value::Boolean(true)),
        Value::Boolean(true)
    );
    assert_eq!(
        roundtrip_natural(r##""int""##, &Value::Int(i32::min_value())),
        Value::Int(i32::min_value())
    );
    assert_eq!(
        roundtrip_natural(r##""long""##, &Value::Long(i64::max_value())),
        Value::Long(i64::max_value())
    );
    assert_eq!(
        roundtrip_natural(r##""float""##, &Value::Float(core::f32::consts::PI)),
        Value::Float(core::f32::consts::PI)
    );
    assert_eq!(
        roundtrip_natural(r##""double""##, &Value::Double(core::f64::consts::E)),
        Value::Double(core::f64::consts::E)
    );
    assert_eq!(
        roundtrip_natural(r##""bytes""##, &Value::Bytes(vec![0, 1, 2, 255])),
        Value::Bytes(vec![0, 1, 2, 255])
    );
    assert_eq!(
        roundtrip_natural(r##""string""##, &Value::Str("avrokit".to_string())),
        Value::Str("avrokit".to_string())
    );
}

#[test]
fn roundtrip_collections() {
    let array = Value::Array(vec![Value::Int(1), Value::Int(-1), Value::Int(64)]);
    assert_eq!(
        roundtrip_natural(r##"{"type": "array", "items": "int"}"##, &array),
        array
    );

    let mut map = HashMap::new();
    map.insert("a".to_string(), Value::Boolean(true));
    map.insert("b".to_string(), Value::Boolean(false));
    let map = Value::Map(map);
    assert_eq!(
        roundtrip_natural(r##"{"type": "map", "values": "boolean"}"##, &map),
        map
    );
}

#[test]
fn roundtrip_enum_and_fixed() {
    let suit = Value::Enum("HEARTS".to_string());
    assert_eq!(
        roundtrip_natural(
            r##"{"type": "enum", "name": "Suit", "symbols": ["SPADES", "HEARTS"]}"##,
            &suit
        ),
        suit
    );

    let fixed = Value::Fixed(vec![1, 2, 3, 4, 5]);
    assert_eq!(
        roundtrip_natural(r##"{"type": "fixed", "name": "md5", "size": 5}"##, &fixed),
        fixed
    );
}

///////////////////////////////////////////////////////////////////////////////
/// Logical type round-trips
///////////////////////////////////////////////////////////////////////////////

#[test]
fn roundtrip_logical_types() {
    assert_eq!(
        roundtrip_natural(
            r##"{"type": "int", "logicalType": "date"}"##,
            &Value::Date(18_000)
        ),
        Value::Date(18_000)
    );
    assert_eq!(
        roundtrip_natural(
            r##"{"type": "long", "logicalType": "timestamp-millis"}"##,
            &Value::TimestampMillis(1_600_000_000_000)
        ),
        Value::TimestampMillis(1_600_000_000_000)
    );
    assert_eq!(
        roundtrip_natural(
            r##"{"type": "long", "logicalType": "time-micros"}"##,
            &Value::TimeMicros(86_399_999_999)
        ),
        Value::TimeMicros(86_399_999_999)
    );

    let uuid = Value::Uuid("f81d4fae-7dec-11d0-a765-00a0c91e6bf6".parse().unwrap());
    assert_eq!(
        roundtrip_natural(r##"{"type": "string", "logicalType": "uuid"}"##, &uuid),
        uuid
    );

    let duration = Value::Duration(Duration::new(1, 15, 500));
    assert_eq!(
        roundtrip_natural(
            r##"{"type": "fixed", "name": "dur", "size": 12, "logicalType": "duration"}"##,
            &duration
        ),
        duration
    );
}

#[test]
fn roundtrip_decimal_bytes_and_fixed() {
    for unscaled in &[0i128, 1, -1, 42_42, -99_999, 1 << 60] {
        let decimal = Value::Decimal(Decimal::new(*unscaled, 2));
        assert_eq!(
            roundtrip_natural(
                r##"{"type": "bytes", "logicalType": "decimal", "precision": 20, "scale": 2}"##,
                &decimal
            ),
            decimal
        );
        assert_eq!(
            roundtrip_natural(
                r##"{"type": "fixed", "name": "amount", "size": 16, "logicalType": "decimal", "precision": 20, "scale": 2}"##,
                &decimal
            ),
            decimal
        );
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Union branch selection
///////////////////////////////////////////////////////////////////////////////

#[test]
fn union_selects_null_branch_first() {
    let text = r##"["string", "null"]"##;
    assert_eq!(roundtrip_natural(text, &Value::Null), Value::Null);
    let s = Value::Str("x".to_string());
    assert_eq!(roundtrip_natural(text, &s), s);
}

#[test]
fn union_selects_first_assignable_branch_in_declaration_order() {
    let s = schema(r##"["null", "long", "double"]"##);
    let serializer = BinarySerializer::natural(&s).unwrap();

    // an int value has no exact branch; `long` is declared first
    let buf = serializer.to_bytes(&Value::Int(7)).unwrap();
    assert_eq!(buf[0], 0x02); // branch index 1

    let buf = serializer.to_bytes(&Value::Double(1.5)).unwrap();
    assert_eq!(buf[0], 0x04); // branch index 2
}

#[test]
fn union_rejects_unmatched_value() {
    let s = schema(r##"["null", "int"]"##);
    let serializer = BinarySerializer::natural(&s).unwrap();
    assert!(serializer.to_bytes(&Value::Str("nope".to_string())).is_err());
}

#[test]
fn union_distinguishes_records_by_name() {
    let text = r##"[
        {"type": "record", "name": "A", "fields": [{"name": "x", "type": "int"}]},
        {"type": "record", "name": "B", "fields": [{"name": "y", "type": "string"}]}
    ]"##;
    let mut b = Record::new("B");
    b.insert("y", "hi").unwrap();
    let value = Value::Record(b);
    let s = schema(text);
    let serializer = BinarySerializer::natural(&s).unwrap();
    let buf = serializer.to_bytes(&value).unwrap();
    assert_eq!(buf[0], 0x02); // second branch

    let decoded = BinaryDeserializer::natural(&s)
        .unwrap()
        .deserialize(&mut buf.as_slice())
        .unwrap();
    assert_eq!(decoded.as_record().unwrap().get("y").unwrap(),
        &Value::Str("hi".to_string()));
}

///////////////////////////////////////////////////////////////////////////////
/// Serde bridge
///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Mentee {
    id: i32,
    username: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Mentor {
    name: String,
    active: bool,
    mentees: Vec<Mentee>,
}

#[test]
fn structs_roundtrip_through_serde() {
    let text = r##"{
        "type": "record",
        "name": "Mentor",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "active", "type": "boolean"},
            {"name": "mentees", "type": {"type": "array", "items": {
                "type": "record",
                "name": "Mentee",
                "fields": [
                    {"name": "id", "type": "int"},
                    {"name": "username", "type": "string"}
                ]
            }}}
        ]
    }"##;

    let mentor = Mentor {
        name: "bob".to_string(),
        active: true,
        mentees: vec![Mentee {
            id: 1,
            username: "alice".to_string(),
        }],
    };

    let value = to_value(&mentor).unwrap();
    let decoded = roundtrip_natural(text, &value);
    let back: Mentor = from_value(&decoded).unwrap();
    assert_eq!(back, mentor);
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
struct Profile {
    name: String,
    nickname: Option<String>,
    session: uuid::Uuid,
    created_ms: i64,
    joined: i32,
}

#[test]
fn optional_and_logical_fields_roundtrip_through_serde() {
    let text = r##"{
        "type": "record",
        "name": "Profile",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "nickname", "type": ["null", "string"]},
            {"name": "session", "type": {"type": "string", "logicalType": "uuid"}},
            {"name": "created_ms", "type": {"type": "long", "logicalType": "timestamp-millis"}},
            {"name": "joined", "type": {"type": "int", "logicalType": "date"}}
        ]
    }"##;

    for nickname in &[Some("zeta".to_string()), None] {
        let profile = Profile {
            name: "bob".to_string(),
            nickname: nickname.clone(),
            session: "f81d4fae-7dec-11d0-a765-00a0c91e6bf6".parse().unwrap(),
            created_ms: 1_600_000_000_000,
            joined: 18_000,
        };

        let value = to_value(&profile).unwrap();
        let decoded = roundtrip_natural(text, &value);

        // the decoder produces logical values, not their base shapes
        let rec = decoded.as_record().unwrap();
        assert!(matches!(rec.get("session"), Some(Value::Uuid(_))));
        assert!(matches!(
            rec.get("created_ms"),
            Some(Value::TimestampMillis(_))
        ));
        assert!(matches!(rec.get("joined"), Some(Value::Date(_))));

        let back: Profile = from_value(&decoded).unwrap();
        assert_eq!(back, profile);
    }
}

#[test]
fn decimal_values_deserialize_to_i128() {
    let unscaled = 1i128 << 100;
    let value = Value::Decimal(Decimal::new(unscaled, 2));
    let back: i128 = from_value(&value).unwrap();
    assert_eq!(back, unscaled);
}

///////////////////////////////////////////////////////////////////////////////
/// Primitive promotion on read
///////////////////////////////////////////////////////////////////////////////

#[test]
fn typed_decoding_widens_promoted_primitives() {
    let s = schema(r##""int""##);
    let serializer = BinarySerializer::natural(&s).unwrap();
    let buf = serializer.to_bytes(&Value::Int(1024)).unwrap();

    let resolver = Resolver::new();

    let as_long = resolver
        .resolve(&TypeDescriptor::Integer {
            size: 8,
            signed: true,
        })
        .unwrap();
    let deserializer = BinaryDeserializer::compile(&s, &as_long).unwrap();
    assert_eq!(
        deserializer.deserialize(&mut buf.as_slice()).unwrap(),
        Value::Long(1024)
    );

    let as_double = resolver
        .resolve(&TypeDescriptor::Floating { size: 8 })
        .unwrap();
    let deserializer = BinaryDeserializer::compile(&s, &as_double).unwrap();
    assert_eq!(
        deserializer.deserialize(&mut buf.as_slice()).unwrap(),
        Value::Double(1024.0)
    );
}

#[test]
fn typed_decoding_reads_bytes_as_string() {
    let s = schema(r##""bytes""##);
    let serializer = BinarySerializer::natural(&s).unwrap();
    let buf = serializer.to_bytes(&Value::Bytes(b"text".to_vec())).unwrap();

    let resolver = Resolver::new();
    let as_str = resolver.resolve(&TypeDescriptor::Str).unwrap();
    let deserializer = BinaryDeserializer::compile(&s, &as_str).unwrap();
    assert_eq!(
        deserializer.deserialize(&mut buf.as_slice()).unwrap(),
        Value::Str("text".to_string())
    );
}

///////////////////////////////////////////////////////////////////////////////
/// Typed encoding with hints
///////////////////////////////////////////////////////////////////////////////

#[test]
fn renamed_members_encode_under_their_hint_names() {
    let text = r##"{
        "type": "record",
        "name": "Account",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "display_name", "type": "string"}
        ]
    }"##;
    let s = schema(text);

    let descriptor = StructDescriptor::new("Account")
        .field(
            "id",
            TypeDescriptor::Integer {
                size: 8,
                signed: true,
            },
        )
        .field_with(
            "nickname",
            TypeDescriptor::Str,
            avrokit::resolver::MemberHints::new().rename("display_name"),
        )
        .build();
    let resolution = Resolver::with_hints().resolve(&descriptor).unwrap();

    let serializer = BinarySerializer::compile(&s, &resolution).unwrap();
    let mut rec = Record::new("Account");
    rec.insert("id", 7i64).unwrap();
    rec.insert("display_name", "zeta").unwrap();
    let buf = serializer.to_bytes(&Value::Record(rec)).unwrap();

    let decoded = BinaryDeserializer::natural(&s)
        .unwrap()
        .deserialize(&mut buf.as_slice())
        .unwrap();
    assert_eq!(
        decoded.as_record().unwrap().get("display_name").unwrap(),
        &Value::Str("zeta".to_string())
    );
}
