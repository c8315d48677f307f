//! The ordered case chains that turn a descriptor into a resolution.

use super::descriptor::{EnumDescriptor, StructDescriptor, TypeDescriptor};
use super::{
    EnumResolution, FieldResolution, RecordResolution, ResolvedName, Resolver, SymbolResolution,
    TypeResolution,
};
use crate::error::AvrokitResult;

pub(crate) type CaseOutcome = AvrokitResult<Option<TypeResolution>>;

pub(crate) trait ResolverCase {
    fn name(&self) -> &'static str;
    // Ok(None) when the case does not apply to this descriptor.
    fn attempt(&self, descriptor: &TypeDescriptor, resolver: &Resolver) -> CaseOutcome;
}

pub(crate) fn reflection_chain() -> Vec<Box<dyn ResolverCase>> {
    vec![
        Box::new(ScalarCase),
        Box::new(TemporalCase),
        Box::new(OptionalCase),
        Box::new(ListCase),
        Box::new(DictionaryCase),
        Box::new(ReferenceCase),
        Box::new(EnumCase { hints: false }),
        Box::new(StructCase { hints: false }),
    ]
}

pub(crate) fn hint_chain() -> Vec<Box<dyn ResolverCase>> {
    vec![
        Box::new(ScalarCase),
        Box::new(TemporalCase),
        Box::new(OptionalCase),
        Box::new(ListCase),
        Box::new(DictionaryCase),
        Box::new(ReferenceCase),
        Box::new(EnumCase { hints: true }),
        Box::new(StructCase { hints: true }),
    ]
}

struct ScalarCase;

impl ResolverCase for ScalarCase {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn attempt(&self, descriptor: &TypeDescriptor, _resolver: &Resolver) -> CaseOutcome {
        let resolution = match descriptor {
            TypeDescriptor::Boolean => TypeResolution::Boolean,
            TypeDescriptor::Integer { size, signed } => TypeResolution::Integer {
                size: *size,
                signed: *signed,
            },
            TypeDescriptor::Floating { size } => TypeResolution::Floating { size: *size },
            TypeDescriptor::Decimal { precision, scale } => TypeResolution::Decimal {
                precision: *precision,
                scale: *scale,
            },
            TypeDescriptor::Str => TypeResolution::Str,
            TypeDescriptor::ByteSeq => TypeResolution::ByteSeq,
            TypeDescriptor::Uuid => TypeResolution::Uuid,
            _ => return Ok(None),
        };
        Ok(Some(resolution))
    }
}

struct TemporalCase;

impl ResolverCase for TemporalCase {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn attempt(&self, descriptor: &TypeDescriptor, _resolver: &Resolver) -> CaseOutcome {
        let resolution = match descriptor {
            TypeDescriptor::Date => TypeResolution::Date,
            TypeDescriptor::TimeOfDay { unit } => TypeResolution::TimeOfDay { unit: *unit },
            TypeDescriptor::Timestamp { unit } => TypeResolution::Timestamp { unit: *unit },
            TypeDescriptor::Duration => TypeResolution::Duration,
            _ => return Ok(None),
        };
        Ok(Some(resolution))
    }
}

struct OptionalCase;

impl ResolverCase for OptionalCase {
    fn name(&self) -> &'static str {
        "optional"
    }

    fn attempt(&self, descriptor: &TypeDescriptor, resolver: &Resolver) -> CaseOutcome {
        match descriptor {
            TypeDescriptor::Optional(inner) => {
                let inner = resolver.resolve(inner)?;
                Ok(Some(TypeResolution::Optional(Box::new(inner))))
            }
            _ => Ok(None),
        }
    }
}

struct ListCase;

impl ResolverCase for ListCase {
    fn name(&self) -> &'static str {
        "list"
    }

    fn attempt(&self, descriptor: &TypeDescriptor, resolver: &Resolver) -> CaseOutcome {
        match descriptor {
            TypeDescriptor::List(items) => {
                let items = resolver.resolve(items)?;
                Ok(Some(TypeResolution::Array {
                    items: Box::new(items),
                }))
            }
            _ => Ok(None),
        }
    }
}

struct DictionaryCase;

impl ResolverCase for DictionaryCase {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn attempt(&self, descriptor: &TypeDescriptor, resolver: &Resolver) -> CaseOutcome {
        match descriptor {
            TypeDescriptor::Dictionary { keys, values } => {
                let keys = resolver.resolve(keys)?;
                let values = resolver.resolve(values)?;
                Ok(Some(TypeResolution::Map {
                    keys: Box::new(keys),
                    values: Box::new(values),
                }))
            }
            _ => Ok(None),
        }
    }
}

struct ReferenceCase;

impl ResolverCase for ReferenceCase {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn attempt(&self, descriptor: &TypeDescriptor, _resolver: &Resolver) -> CaseOutcome {
        match descriptor {
            TypeDescriptor::Reference(name) => Ok(Some(TypeResolution::Reference(
                ResolvedName::implicit(name),
            ))),
            _ => Ok(None),
        }
    }
}

struct EnumCase {
    hints: bool,
}

impl EnumCase {
    fn resolve_enum(&self, desc: &EnumDescriptor) -> EnumResolution {
        let name = if self.hints && desc.rename.is_some() {
            ResolvedName::explicit(&desc.fullname())
        } else {
            ResolvedName::implicit(&implicit_fullname(&desc.name, desc.namespace.as_deref()))
        };

        let mut symbols: Vec<SymbolResolution> = desc
            .symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                if !self.hints {
                    return true;
                }
                if desc.contract {
                    s.hints.include
                } else {
                    !s.hints.skip
                }
            })
            .map(|(position, s)| {
                let name = if self.hints {
                    s.hints.rename.clone().unwrap_or_else(|| s.name.clone())
                } else {
                    s.name.clone()
                };
                SymbolResolution {
                    name,
                    raw: s.raw,
                    position,
                }
            })
            .collect();

        // raw value ascending, then name ascending
        symbols.sort_by(|a, b| a.raw.cmp(&b.raw).then_with(|| a.name.cmp(&b.name)));

        EnumResolution { name, symbols }
    }
}

impl ResolverCase for EnumCase {
    fn name(&self) -> &'static str {
        if self.hints {
            "enum (metadata-aware)"
        } else {
            "enum"
        }
    }

    fn attempt(&self, descriptor: &TypeDescriptor, resolver: &Resolver) -> CaseOutcome {
        match descriptor {
            TypeDescriptor::Enumeration(desc) => {
                let fullname = desc.fullname();
                if let Some(memoized) = resolver.memoized(&fullname) {
                    return Ok(Some(memoized));
                }
                let resolution = TypeResolution::Enum(self.resolve_enum(desc));
                resolver.memoize(fullname, resolution.clone());
                Ok(Some(resolution))
            }
            _ => Ok(None),
        }
    }
}

struct StructCase {
    hints: bool,
}

impl StructCase {
    fn resolve_struct(
        &self,
        desc: &StructDescriptor,
        resolver: &Resolver,
    ) -> AvrokitResult<RecordResolution> {
        let name = if self.hints && desc.rename.is_some() {
            ResolvedName::explicit(&desc.fullname())
        } else {
            ResolvedName::implicit(&implicit_fullname(&desc.name, desc.namespace.as_deref()))
        };

        let mut fields = vec![];
        for (position, field) in desc.fields.iter().enumerate() {
            if self.hints {
                if desc.contract && !field.hints.include {
                    continue;
                }
                if !desc.contract && field.hints.skip {
                    continue;
                }
            }
            let field_name = if self.hints {
                field
                    .hints
                    .rename
                    .clone()
                    .unwrap_or_else(|| field.name.clone())
            } else {
                field.name.clone()
            };
            fields.push((
                field.hints.order,
                FieldResolution {
                    name: field_name,
                    resolution: resolver.resolve(&field.ty)?,
                    position,
                },
            ));
        }

        // declaration order when unannotated; declared order then name when
        // any member carries an order hint
        if self.hints && fields.iter().any(|(order, _)| order.is_some()) {
            fields.sort_by(|(ao, af), (bo, bf)| {
                ao.unwrap_or(0)
                    .cmp(&bo.unwrap_or(0))
                    .then_with(|| af.name.cmp(&bf.name))
            });
        }

        Ok(RecordResolution {
            name,
            fields: fields.into_iter().map(|(_, f)| f).collect(),
        })
    }
}

impl ResolverCase for StructCase {
    fn name(&self) -> &'static str {
        if self.hints {
            "struct (metadata-aware)"
        } else {
            "struct"
        }
    }

    fn attempt(&self, descriptor: &TypeDescriptor, resolver: &Resolver) -> CaseOutcome {
        match descriptor {
            TypeDescriptor::Struct(desc) => {
                let fullname = desc.fullname();
                if let Some(memoized) = resolver.memoized(&fullname) {
                    return Ok(Some(memoized));
                }
                let resolution = TypeResolution::Record(self.resolve_struct(desc, resolver)?);
                resolver.memoize(fullname, resolution.clone());
                Ok(Some(resolution))
            }
            _ => Ok(None),
        }
    }
}

fn implicit_fullname(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}
