#![allow(missing_docs)]

use serde::{de, ser};
use std::fmt::Display;
use std::io::{Error, ErrorKind};
use std::sync::Arc;

#[inline(always)]
pub(crate) fn io_err(msg: &str) -> Error {
    Error::new(ErrorKind::InvalidData, msg)
}

// Required impls for Serde
impl ser::Error for AvrokitErr {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}

impl de::Error for AvrokitErr {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}

pub type AvrokitResult<T> = Result<T, AvrokitErr>;

/// Errors returned from avrokit
#[derive(thiserror::Error, Debug)]
pub enum AvrokitErr {
    // Schema parse errors
    #[error("Failed to parse avro schema")]
    SchemaParseErr(#[source] std::io::Error),
    #[error("No schema reader case applied: {0:?}")]
    UnknownSchema(Vec<String>),
    #[error("Record schema does not have a required field named `name`")]
    RecordNameNotFound,
    #[error("Record field does not have a required `type`")]
    RecordTypeNotFound,
    #[error("Expected record fields to be a json array")]
    ExpectedFieldsJsonArray,
    #[error("Record's field json schema must be an object")]
    InvalidRecordFieldType,
    #[error("Could not parse name from json value")]
    NameParseFailed,
    #[error("Duplicate definition of named schema `{0}`")]
    DuplicateSchema(String),
    #[error("Duplicate field `{0}` in record schema")]
    DuplicateField(String),
    #[error("Invalid default value for union. Must match the first entry from union definition")]
    FailedDefaultUnion,
    #[error("Invalid default value for given schema")]
    DefaultValueParse,
    #[error("Unknown field ordering value")]
    UnknownFieldOrdering,
    #[error("Field ordering value must be a string")]
    InvalidFieldOrdering,
    #[error("Failed to parse symbol from enum's symbols field")]
    EnumSymbolParseErr,
    #[error("Enum schema must contain required `symbols` field")]
    EnumSymbolsMissing,
    #[error("Duplicate symbol `{0}` in enum schema")]
    DuplicateSymbol(String),
    #[error("Enum value symbol not present in enum schema `symbols` field")]
    EnumSymbolNotPresent,
    #[error("Enum schema parsing failed, found: {0}")]
    EnumParseErr(String),
    #[error("Fixed schema `size` field must be a number")]
    FixedSizeNotNumber,
    #[error("Fixed schema `size` field missing")]
    FixedSizeNotFound,
    #[error("Unions cannot have duplicate schemas or immediate unions")]
    DuplicateSchemaInUnion,
    #[error("Primitive schema must be a string")]
    InvalidPrimitiveSchema,
    #[error("Named schema `{0}` must be defined before use")]
    NamedSchemaNotFound(String),
    #[error("logicalType `{logical}` is not valid over base type `{base}`")]
    LogicalBaseMismatch { logical: String, base: String },

    // Schema write errors
    #[error("Name `{0}` designates two structurally distinct schemas")]
    SchemaConflict(String),

    // Name validation errors
    #[error("Name `{0}` must be [A-Za-z_] and subsequently contain only [A-Za-z0-9_]")]
    InvalidName(String),
    #[error("Namespace `{0}` must be empty or follow the grammar <name>[(<dot><name>)*]")]
    InvalidNamespace(String),

    // Type resolution errors
    #[error("No type resolver case applied: {0:?}")]
    UnsupportedType(Vec<String>),
    #[error("Resolved type `{resolved}` is not compatible with schema `{schema}`")]
    ResolutionMismatch { resolved: String, schema: String },
    #[error("Resolved name `{resolved}` does not match schema name `{schema}`")]
    ResolvedNameMismatch { resolved: String, schema: String },

    // Encode errors
    #[error("Write failed")]
    EncodeFailed(#[source] std::io::Error),
    #[error("Encoding failed. Value does not match schema")]
    SchemaDataMismatch,
    #[error("Value runtime type not found in union")]
    NotFoundInUnion,
    #[error("Unions must not contain immediate union values")]
    NoImmediateUnion,
    #[error("Mismatch in fixed bytes length: found {found}, expected {expected}")]
    FixedValueLenMismatch { found: usize, expected: usize },
    #[error("Decimal with scale {found} does not match schema scale {expected}")]
    DecimalScaleMismatch { found: usize, expected: usize },
    #[error("Decimal unscaled value does not fit in fixed({0})")]
    DecimalOutOfRange(usize),
    #[error("Field `{0}` not found in record value")]
    FieldNotFound(String),

    // Decode errors
    #[error("Read failed")]
    DecodeFailed(#[source] std::io::Error),
    #[error("Index read for enum is out of range as per schema. got: {0} symbols: {1}")]
    InvalidEnumSymbolIdx(usize, String),
    #[error("Union branch index {0} out of range")]
    InvalidUnionBranchIdx(i64),
    #[error("Recursive codec link was not resolved for `{0}`")]
    UnresolvedLink(String),

    // Wire format errors
    #[error("Wire payload must start with the 0x00 magic byte")]
    BadWireHeader,
    #[error("Wire payload truncated, expected at least 5 header bytes")]
    TruncatedWireHeader,
    #[error("Wire schema id mismatch: payload has {found}, deserializer is bound to {expected}")]
    WireIdMismatch { found: i32, expected: i32 },

    // Registry adapter errors
    #[error(transparent)]
    Registry(#[from] crate::wire::RegistryError),
    #[error("cached codec build failed: {0}")]
    SharedBuild(Arc<AvrokitErr>),

    // Validation errors
    #[error("Expected: {0}, found: {1}")]
    SchemaDataValidationFailed(String, String),
    #[error("Named schema was not found for given value")]
    NamedSchemaNotFoundForValue,
    #[error("Schema has a field not found in the value")]
    RecordFieldMissing,
    #[error("Json must be an object for record")]
    ExpectedJsonObject,

    // Serde specific errors
    #[error("Serde error: {0}")]
    Message(String),
    #[error("Expected a string value")]
    ExpectedString,
    #[error("Unsupported type")]
    Unsupported,
    #[error("Unexpected avro value: {value}")]
    UnexpectedAvroValue { value: String },

    // Value errors
    #[error("Expected value not found in variant instance")]
    ExpectedVariantNotFound,
}
