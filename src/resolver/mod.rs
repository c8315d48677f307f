//! Describes host data types as structural resolutions that the codec
//! builders pair with schemas.
//!
//! A [`TypeDescriptor`](descriptor::TypeDescriptor) says what a host type
//! looks like; a [`Resolver`] runs an ordered chain of cases over it and
//! produces a [`TypeResolution`], the shape the codec builder understands.

pub mod descriptor;
mod cases;
mod infer;

pub use descriptor::{
    EnumDescriptor, FieldDescriptor, HostType, MemberHints, StructDescriptor, SymbolDescriptor,
    TypeDescriptor,
};
pub use infer::infer_schema;

use crate::error::{AvrokitErr, AvrokitResult};
use crate::schema::common::Name;
use cases::ResolverCase;
use descriptor::TypeDescriptor as Descriptor;
use std::cell::RefCell;
use std::collections::HashMap;

/// Granularity of a time-of-day or timestamp resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Millisecond granularity, carried over an int or long base.
    Millis,
    /// Microsecond granularity, carried over a long base.
    Micros,
}

/// The name a resolution was given, recording whether it came from external
/// metadata (explicit) or was derived from the host type's declared name
/// (implicit). Explicit names must match schema fullnames exactly; implicit
/// names also match on the bare name alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedName {
    pub(crate) value: String,
    pub(crate) explicit: bool,
}

impl ResolvedName {
    pub(crate) fn implicit(value: &str) -> Self {
        ResolvedName {
            value: value.to_string(),
            explicit: false,
        }
    }

    pub(crate) fn explicit(value: &str) -> Self {
        ResolvedName {
            value: value.to_string(),
            explicit: true,
        }
    }

    /// The resolved name text.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn matches(&self, schema_name: &Name) -> bool {
        if self.explicit {
            self.value == schema_name.fullname()
        } else {
            self.value == schema_name.fullname() || self.value == schema_name.name
        }
    }
}

/// A resolved enum symbol: its schema-facing name, its raw host value and
/// the position of the member on the host type.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolResolution {
    pub name: String,
    pub raw: i64,
    pub position: usize,
}

/// A resolved enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumResolution {
    pub name: ResolvedName,
    pub symbols: Vec<SymbolResolution>,
}

/// A resolved record field: its schema-facing name, the resolution of its
/// type and the position of the writable member on the host type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResolution {
    pub name: String,
    pub resolution: TypeResolution,
    pub position: usize,
}

/// A resolved record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordResolution {
    pub name: ResolvedName,
    pub fields: Vec<FieldResolution>,
}

/// A structural description of a host data type, produced by a [`Resolver`]
/// and consumed by the codec builders.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeResolution {
    Boolean,
    /// An integral type of `size` bytes.
    Integer { size: u8, signed: bool },
    /// A floating point type of `size` bytes (4 or 8).
    Floating { size: u8 },
    Decimal { precision: usize, scale: usize },
    Str,
    ByteSeq,
    Date,
    TimeOfDay { unit: TimeUnit },
    Timestamp { unit: TimeUnit },
    Duration,
    Uuid,
    /// A type whose values carry a null indicator, e.g. `Option<T>`.
    Optional(Box<TypeResolution>),
    Array { items: Box<TypeResolution> },
    Map {
        keys: Box<TypeResolution>,
        values: Box<TypeResolution>,
    },
    Enum(EnumResolution),
    Record(RecordResolution),
    /// A by-name reference to a named resolution further up the tree. Breaks
    /// recursion in self-referential host types.
    Reference(ResolvedName),
}

impl TypeResolution {
    /// Short name used in diagnostics.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            TypeResolution::Boolean => "boolean",
            TypeResolution::Integer { .. } => "integer",
            TypeResolution::Floating { .. } => "floating",
            TypeResolution::Decimal { .. } => "decimal",
            TypeResolution::Str => "string",
            TypeResolution::ByteSeq => "byte sequence",
            TypeResolution::Date => "date",
            TypeResolution::TimeOfDay { .. } => "time of day",
            TypeResolution::Timestamp { .. } => "timestamp",
            TypeResolution::Duration => "duration",
            TypeResolution::Uuid => "uuid",
            TypeResolution::Optional(_) => "optional",
            TypeResolution::Array { .. } => "array",
            TypeResolution::Map { .. } => "map",
            TypeResolution::Enum(_) => "enum",
            TypeResolution::Record(_) => "record",
            TypeResolution::Reference(_) => "reference",
        }
    }
}

/// Runs an ordered chain of resolver cases over a type descriptor; the first
/// applicable case wins. Named resolutions are memoized per resolver so that
/// a host type referenced from several members is described once.
pub struct Resolver {
    cases: Vec<Box<dyn ResolverCase>>,
    memo: RefCell<HashMap<String, TypeResolution>>,
}

impl Resolver {
    /// The default chain: every declared member is visible under its declared
    /// name, in declaration order.
    pub fn new() -> Self {
        Resolver {
            cases: cases::reflection_chain(),
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// The metadata-aware chain: honors contract markers, member renames,
    /// omissions and explicit ordering hints.
    pub fn with_hints() -> Self {
        Resolver {
            cases: cases::hint_chain(),
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves the given descriptor, trying each case in order. When no case
    /// applies the per-case reasons are aggregated into an
    /// [`UnsupportedType`](crate::AvrokitErr::UnsupportedType) error.
    pub fn resolve(&self, descriptor: &Descriptor) -> AvrokitResult<TypeResolution> {
        let mut reasons = vec![];
        for case in &self.cases {
            match case.attempt(descriptor, self) {
                Ok(Some(resolution)) => return Ok(resolution),
                Ok(None) => {}
                Err(e) => reasons.push(format!("{}: {}", case.name(), e)),
            }
        }
        reasons.push(format!(
            "no resolver case applied to descriptor `{:?}`",
            descriptor
        ));
        Err(AvrokitErr::UnsupportedType(reasons))
    }

    pub(crate) fn memoized(&self, fullname: &str) -> Option<TypeResolution> {
        self.memo.borrow().get(fullname).cloned()
    }

    pub(crate) fn memoize(&self, fullname: String, resolution: TypeResolution) {
        self.memo.borrow_mut().insert(fullname, resolution);
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
