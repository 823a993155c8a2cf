//! Storage-kind mapping
//!
//! Maps each [`StorageKind`] to the [`Representation`] accessors return and
//! accept, and decides which reference attributes need a narrowing step.
use enum_map::{EnumMap, enum_map};
use strum::{Display, EnumIs, IntoStaticStr};

use crate::catalog::StorageKind;

/// Representation of an attribute value as seen through an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Representation {
    /// Owned text.
    Text,
    Bool,
    U64,
    I64,
    /// Target address.
    Address,
    /// Section offset.
    Offset,
    /// List of location expressions.
    LocList,
    /// List of address ranges.
    RangeList,
    /// Handle of another entry.
    EntryRef,
    /// Raw, uninterpreted bytes.
    Opaque,
}

impl Representation {
    /// Rust spelling used by the text renderer.
    pub fn rust_type(self) -> &'static str {
        match self {
            Representation::Text => "String",
            Representation::Bool => "bool",
            Representation::U64 => "u64",
            Representation::I64 => "i64",
            Representation::Address => "Address",
            Representation::Offset => "SectionOffset",
            Representation::LocList => "LocList",
            Representation::RangeList => "RangeList",
            Representation::EntryRef => "EntryId",
            Representation::Opaque => "Vec<u8>",
        }
    }
}

/// Storage kind to representation table plus the reference narrowing rule.
///
/// ```rust
/// # use hydie::{catalog::StorageKind, mapper::{Representation, StorageMapper}};
/// let mapper = StorageMapper::new("type");
/// assert_eq!(
///     mapper.representation_for(StorageKind::TypeReference),
///     mapper.representation_for(StorageKind::Reference),
/// );
/// assert_eq!(mapper.narrowed_target(StorageKind::TypeReference), Some("type"));
/// assert_eq!(mapper.narrowed_target(StorageKind::Reference), None);
/// ```
#[derive(Debug, Clone)]
pub struct StorageMapper {
    table: EnumMap<StorageKind, Representation>,
    narrowing_category: String,
}

impl StorageMapper {
    pub fn new(narrowing_category: impl Into<String>) -> Self {
        Self {
            table: enum_map! {
                StorageKind::String => Representation::Text,
                StorageKind::Flag => Representation::Bool,
                StorageKind::Unsigned => Representation::U64,
                StorageKind::Signed => Representation::I64,
                StorageKind::Address => Representation::Address,
                StorageKind::Offset => Representation::Offset,
                StorageKind::LocList => Representation::LocList,
                StorageKind::RangeList => Representation::RangeList,
                StorageKind::Reference | StorageKind::TypeReference => Representation::EntryRef,
                StorageKind::Unspecified => Representation::Opaque,
            },
            narrowing_category: narrowing_category.into(),
        }
    }

    pub fn representation_for(&self, storage: StorageKind) -> Representation {
        self.table[storage]
    }

    pub fn is_reference(&self, storage: StorageKind) -> bool {
        matches!(
            storage,
            StorageKind::Reference | StorageKind::TypeReference
        )
    }

    /// Category a reference must point into, when reads need a checked
    /// narrowing step (and writes an upcast).
    pub fn narrowed_target(&self, storage: StorageKind) -> Option<&str> {
        match storage {
            StorageKind::TypeReference => Some(&self.narrowing_category),
            _ => None,
        }
    }
}
