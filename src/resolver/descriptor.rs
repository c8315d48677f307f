//! Host-type descriptors: the input side of type resolution.
//!
//! A descriptor is a runtime description of what a host data type looks
//! like. Scalar descriptors come from [`HostType`] impls; structs and
//! enumerations are assembled with the builder methods, which is also where
//! external metadata (renames, omissions, contract markers, ordering) is
//! attached.

use super::TimeUnit;

/// External metadata attached to a single member of a struct or enumeration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberHints {
    pub(crate) rename: Option<String>,
    pub(crate) skip: bool,
    pub(crate) include: bool,
    pub(crate) order: Option<i32>,
}

impl MemberHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the member's schema-facing name.
    pub fn rename(mut self, name: &str) -> Self {
        self.rename = Some(name.to_string());
        self
    }

    /// Marks the member as not serialized.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Opts the member in on a contract type.
    pub fn include(mut self) -> Self {
        self.include = true;
        self
    }

    /// Assigns an explicit position used when the declaring type orders its
    /// members by annotation rather than declaration.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// A described struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) ty: TypeDescriptor,
    pub(crate) hints: MemberHints,
}

/// A described struct type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) rename: Option<String>,
    pub(crate) contract: bool,
    pub(crate) fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    /// Starts describing a struct with the given declared name.
    pub fn new(name: &str) -> Self {
        StructDescriptor {
            name: name.to_string(),
            namespace: None,
            rename: None,
            contract: false,
            fields: vec![],
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Overrides the type-level name (an explicit name).
    pub fn rename(mut self, name: &str) -> Self {
        self.rename = Some(name.to_string());
        self
    }

    /// Marks the type as a data contract: only members opted in with
    /// [`MemberHints::include`] are visible.
    pub fn contract(mut self) -> Self {
        self.contract = true;
        self
    }

    pub fn field(self, name: &str, ty: TypeDescriptor) -> Self {
        self.field_with(name, ty, MemberHints::new())
    }

    pub fn field_with(mut self, name: &str, ty: TypeDescriptor, hints: MemberHints) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            ty,
            hints,
        });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::Struct(self)
    }

    pub(crate) fn fullname(&self) -> String {
        let name = self.rename.as_ref().unwrap_or(&self.name);
        match &self.namespace {
            Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
            _ => name.clone(),
        }
    }
}

/// A described enumeration symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDescriptor {
    pub(crate) name: String,
    pub(crate) raw: i64,
    pub(crate) hints: MemberHints,
}

/// A described enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) rename: Option<String>,
    pub(crate) contract: bool,
    pub(crate) symbols: Vec<SymbolDescriptor>,
}

impl EnumDescriptor {
    pub fn new(name: &str) -> Self {
        EnumDescriptor {
            name: name.to_string(),
            namespace: None,
            rename: None,
            contract: false,
            symbols: vec![],
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn rename(mut self, name: &str) -> Self {
        self.rename = Some(name.to_string());
        self
    }

    pub fn contract(mut self) -> Self {
        self.contract = true;
        self
    }

    pub fn symbol(self, name: &str, raw: i64) -> Self {
        self.symbol_with(name, raw, MemberHints::new())
    }

    pub fn symbol_with(mut self, name: &str, raw: i64, hints: MemberHints) -> Self {
        self.symbols.push(SymbolDescriptor {
            name: name.to_string(),
            raw,
            hints,
        });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::Enumeration(self)
    }

    pub(crate) fn fullname(&self) -> String {
        let name = self.rename.as_ref().unwrap_or(&self.name);
        match &self.namespace {
            Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
            _ => name.clone(),
        }
    }
}

/// A runtime description of a host data type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Boolean,
    Integer { size: u8, signed: bool },
    Floating { size: u8 },
    Decimal { precision: usize, scale: usize },
    Str,
    ByteSeq,
    Date,
    TimeOfDay { unit: TimeUnit },
    Timestamp { unit: TimeUnit },
    Duration,
    Uuid,
    Optional(Box<TypeDescriptor>),
    List(Box<TypeDescriptor>),
    Dictionary {
        keys: Box<TypeDescriptor>,
        values: Box<TypeDescriptor>,
    },
    Struct(StructDescriptor),
    Enumeration(EnumDescriptor),
    /// A by-name reference to a struct or enumeration already being
    /// described; this is how self-referential host types are expressed.
    Reference(String),
}

impl TypeDescriptor {
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn list(items: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(items))
    }

    pub fn dictionary(keys: TypeDescriptor, values: TypeDescriptor) -> Self {
        TypeDescriptor::Dictionary {
            keys: Box::new(keys),
            values: Box::new(values),
        }
    }

    pub fn reference(name: &str) -> Self {
        TypeDescriptor::Reference(name.to_string())
    }
}

/// Host types with a canonical descriptor.
///
/// Implemented for the scalar types a host value can hold directly. `Vec<T>`
/// maps to a list of its element descriptor; describe byte sequences with
/// [`TypeDescriptor::ByteSeq`] instead of `Vec<u8>`.
pub trait HostType {
    fn descriptor() -> TypeDescriptor;
}

macro_rules! host_integer {
    ($($t:ty => ($size:expr, $signed:expr)),* $(,)?) => {
        $(
            impl HostType for $t {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::Integer { size: $size, signed: $signed }
                }
            }
        )*
    };
}

host_integer! {
    i8 => (1, true), i16 => (2, true), i32 => (4, true), i64 => (8, true),
    u8 => (1, false), u16 => (2, false), u32 => (4, false), u64 => (8, false),
}

impl HostType for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Boolean
    }
}

impl HostType for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Floating { size: 4 }
    }
}

impl HostType for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Floating { size: 8 }
    }
}

impl HostType for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Str
    }
}

impl HostType for &str {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Str
    }
}

impl HostType for uuid::Uuid {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Uuid
    }
}

impl HostType for chrono::NaiveDate {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Date
    }
}

impl HostType for chrono::NaiveTime {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::TimeOfDay {
            unit: TimeUnit::Millis,
        }
    }
}

impl HostType for chrono::DateTime<chrono::Utc> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Timestamp {
            unit: TimeUnit::Millis,
        }
    }
}

impl<T: HostType> HostType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::descriptor())
    }
}

impl<T: HostType> HostType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }
}

impl<T: HostType> HostType for std::collections::HashMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dictionary(TypeDescriptor::Str, T::descriptor())
    }
}
