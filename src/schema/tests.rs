use crate::error::AvrokitErr;
use crate::schema::common::{Field, Name, Order};
use crate::schema::Variant;
use crate::Decimal;
use crate::Schema;
use crate::Value;
use indexmap::IndexMap;
use std::str::FromStr;

#[test]
fn schema_parse_default_values() {
    let schema = Schema::from_str(
        r##"{
            "type": "record",
            "name": "Can",
            "doc":"Represents a can data",
            "namespace": "com.avro",
            "aliases": ["my_linked_list"],
            "fields" : [
                {
                    "name": "next",
                    "type": ["null", "Can"]
                },
                {
                    "name": "value",
                    "type": "long",
                    "default": 1,
                    "aliases": ["data"],
                    "order": "descending",
                    "doc": "This field holds the value of the linked list"
                }
            ]
        }"##,
    )
    .unwrap();

    let mut fields = IndexMap::new();
    let f1 = Field::new(
        "next",
        Variant::Union {
            variants: vec![Variant::Null, Variant::Named("com.avro.Can".to_string())],
        },
        None,
        None,
        Order::Ascending,
        None,
    )
    .unwrap();
    let f2 = Field::new(
        "value",
        Variant::Long,
        Some("This field holds the value of the linked list".to_string()),
        Some(Value::Long(1)),
        Order::Descending,
        Some(vec!["data".to_string()]),
    )
    .unwrap();
    fields.insert("next".to_string(), f1);
    fields.insert("value".to_string(), f2);

    let mut name = Name::new("Can").unwrap();
    name.set_namespace("com.avro").unwrap();

    let s = Variant::Record {
        name,
        aliases: Some(vec!["my_linked_list".to_string()]),
        doc: Some("Represents a can data".to_string()),
        fields,
    };

    assert_eq!(&s, schema.variant());
}

#[test]
fn nested_record_fields_parse_with_fullnames() {
    let schema = Schema::from_str(r##"{
        "name": "longlist",
        "namespace": "com.some",
        "type":"record",
        "fields": [
            {"name": "magic", "type": {"type": "fixed", "name": "magic", "size": 4, "namespace": "com.bar"}
            },
            {"name": "inner_rec", "type": {"type": "record", "name": "inner_rec", "fields": [
                {
                    "name": "test",
                    "type": {"type": "fixed", "name":"hello", "size":5}
                }
            ]}}
        ]
    }"##).unwrap();

    assert!(schema.cxt.contains("com.bar.magic"));
    assert!(schema.cxt.contains("com.some.hello"));
    assert!(schema.cxt.contains("com.some.longlist"));
    assert!(schema.cxt.contains("com.some.inner_rec"));
}

#[test]
fn recursive_record_parses() {
    let schema = Schema::from_str(
        r##"{
            "type": "record",
            "name": "Node",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "children", "type": {"type": "array", "items": "Node"}}
            ]
        }"##,
    )
    .unwrap();
    assert!(schema.cxt.contains("Node"));
    if let Variant::Record { fields, .. } = schema.variant() {
        let children = &fields["children"];
        assert_eq!(
            children.ty,
            Variant::Array {
                items: Box::new(Variant::Named("Node".to_string()))
            }
        );
    } else {
        panic!("expected a record");
    }
}

#[test]
fn duplicate_definition_is_rejected() {
    let schema = Schema::from_str(
        r##"{
            "type": "record",
            "name": "Outer",
            "fields": [
                {"name": "a", "type": {"type": "record", "name": "ns.Dup", "fields": [{"name": "x", "type": "int"}]}},
                {"name": "b", "type": {"type": "record", "name": "ns.Dup", "fields": [{"name": "x", "type": "string"}]}}
            ]
        }"##,
    );
    assert!(matches!(schema, Err(AvrokitErr::DuplicateSchema(ref n)) if n == "ns.Dup"));
}

#[test]
fn duplicate_record_field_is_rejected() {
    let schema = Schema::from_str(
        r##"{
            "type": "record",
            "name": "Rec",
            "fields": [
                {"name": "x", "type": "int"},
                {"name": "x", "type": "long"}
            ]
        }"##,
    );
    assert!(matches!(schema, Err(AvrokitErr::DuplicateField(_))));
}

#[test]
fn union_rejects_duplicate_primitives_and_immediate_unions() {
    assert!(matches!(
        Schema::from_str(r##"["int", "string", "int"]"##),
        Err(AvrokitErr::DuplicateSchemaInUnion)
    ));
    assert!(matches!(
        Schema::from_str(r##"["int", ["null", "string"]]"##),
        Err(AvrokitErr::DuplicateSchemaInUnion)
    ));
    // a logical type competes with its base type
    assert!(matches!(
        Schema::from_str(r##"["int", {"type": "int", "logicalType": "date"}]"##),
        Err(AvrokitErr::DuplicateSchemaInUnion)
    ));
}

#[test]
fn union_allows_distinct_named_types() {
    let schema = Schema::from_str(
        r##"[
            "null",
            {"type": "fixed", "name": "A", "size": 2},
            {"type": "fixed", "name": "B", "size": 2}
        ]"##,
    );
    assert!(schema.is_ok());
}

#[test]
fn unknown_schema_wraps_reasons() {
    match Schema::from_str(r##"{"frobnicate": true}"##) {
        Err(AvrokitErr::UnknownSchema(reasons)) => assert!(!reasons.is_empty()),
        other => panic!("expected UnknownSchema, got {:?}", other),
    }
}

#[test]
fn named_reference_must_be_defined_before_use() {
    let schema = Schema::from_str(
        r##"{
            "type": "record",
            "name": "Rec",
            "fields": [{"name": "a", "type": "Undefined"}]
        }"##,
    );
    assert!(matches!(schema, Err(AvrokitErr::NamedSchemaNotFound(_))));
}

#[test]
fn invalid_names_carry_offending_text() {
    match Schema::from_str(r##"{"type": "fixed", "name": "1bad", "size": 2}"##) {
        Err(AvrokitErr::InvalidName(name)) => assert_eq!(name, "1bad"),
        other => panic!("expected InvalidName, got {:?}", other),
    }
}

#[test]
fn enum_symbols_validated_and_unique() {
    assert!(matches!(
        Schema::from_str(
            r##"{"type": "enum", "name": "Suit", "symbols": ["HEARTS", "HEARTS"]}"##
        ),
        Err(AvrokitErr::DuplicateSymbol(_))
    ));
    assert!(matches!(
        Schema::from_str(r##"{"type": "enum", "name": "Suit", "symbols": ["not-valid"]}"##),
        Err(AvrokitErr::InvalidName(_))
    ));
}

#[test]
fn logical_types_parse_over_their_bases() {
    let cases = [
        (r##"{"type": "int", "logicalType": "date"}"##, Variant::Date),
        (
            r##"{"type": "int", "logicalType": "time-millis"}"##,
            Variant::TimeMillis,
        ),
        (
            r##"{"type": "long", "logicalType": "time-micros"}"##,
            Variant::TimeMicros,
        ),
        (
            r##"{"type": "long", "logicalType": "timestamp-millis"}"##,
            Variant::TimestampMillis,
        ),
        (
            r##"{"type": "long", "logicalType": "timestamp-micros"}"##,
            Variant::TimestampMicros,
        ),
        (
            r##"{"type": "string", "logicalType": "uuid"}"##,
            Variant::Uuid,
        ),
    ];
    for (text, expected) in &cases {
        let schema = Schema::from_str(text).unwrap();
        assert_eq!(schema.variant(), expected, "for {}", text);
    }
}

#[test]
fn decimal_requires_consistent_attributes() {
    let schema = Schema::from_str(
        r##"{"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}"##,
    )
    .unwrap();
    assert_eq!(
        schema.variant(),
        &Variant::Decimal {
            precision: 10,
            scale: 2,
            inner: Box::new(Variant::Bytes),
        }
    );

    assert!(matches!(
        Schema::from_str(
            r##"{"type": "bytes", "logicalType": "decimal", "precision": 2, "scale": 4}"##
        ),
        Err(AvrokitErr::LogicalBaseMismatch { .. })
    ));
}

#[test]
fn duration_must_be_fixed_twelve() {
    let schema = Schema::from_str(
        r##"{"type": "fixed", "name": "Dur", "size": 12, "logicalType": "duration"}"##,
    )
    .unwrap();
    assert!(matches!(schema.variant(), Variant::Duration { .. }));

    assert!(matches!(
        Schema::from_str(
            r##"{"type": "fixed", "name": "Dur", "size": 8, "logicalType": "duration"}"##
        ),
        Err(AvrokitErr::LogicalBaseMismatch { .. })
    ));
}

#[test]
fn unknown_logical_type_falls_back_to_base() {
    let schema =
        Schema::from_str(r##"{"type": "string", "logicalType": "no-such-refinement"}"##).unwrap();
    assert_eq!(schema.variant(), &Variant::Str);
}

#[test]
fn decimal_default_roundtrips_at_full_precision() {
    // an unscaled magnitude no i64 (or json number) can carry
    let big = i128::from(i64::max_value()) * 1000 + 7;
    let text = format!(
        r##"{{
            "type": "record",
            "name": "Ledger",
            "fields": [
                {{
                    "name": "balance",
                    "type": {{"type": "bytes", "logicalType": "decimal", "precision": 38, "scale": 2}},
                    "default": "{}"
                }},
                {{
                    "name": "fee",
                    "type": {{"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}},
                    "default": 42
                }}
            ]
        }}"##,
        big
    );

    let expect_balance = Value::Decimal(Decimal::new(big, 2));
    let expect_fee = Value::Decimal(Decimal::new(42, 2));

    let schema = Schema::from_str(&text).unwrap();
    if let Variant::Record { fields, .. } = schema.variant() {
        assert_eq!(fields["balance"].default.as_ref(), Some(&expect_balance));
        assert_eq!(fields["fee"].default.as_ref(), Some(&expect_fee));
    } else {
        panic!("expected a record");
    }

    // and the defaults survive a write and reparse
    let rewritten = Schema::from_str(&schema.to_json(false).unwrap()).unwrap();
    if let Variant::Record { fields, .. } = rewritten.variant() {
        assert_eq!(fields["balance"].default.as_ref(), Some(&expect_balance));
        assert_eq!(fields["fee"].default.as_ref(), Some(&expect_fee));
    } else {
        panic!("expected a record");
    }
}

#[test]
fn json_roundtrip_is_structurally_stable() {
    let text = r##"{
        "type": "record",
        "name": "LongList",
        "namespace": "com.lists",
        "fields": [
            {"name": "value", "type": "long"},
            {"name": "next", "type": ["null", "LongList"]}
        ]
    }"##;
    let schema = Schema::from_str(text).unwrap();
    let rewritten = Schema::from_str(&schema.to_json(false).unwrap()).unwrap();
    assert_eq!(schema, rewritten);

    // canonicalization is idempotent
    let canonical = schema.to_json(true).unwrap();
    let reparsed = Schema::from_str(&canonical).unwrap();
    assert_eq!(reparsed.to_json(true).unwrap(), canonical);
}
