//! Attribute catalog
//!
//! The catalog maps every attribute name to the single storage kind a reader
//! normalises it to. It is built once from the schema document and never
//! mutated afterwards; descriptors are shared by [`Arc`] wherever a kind
//! refers to them.
use std::{collections::BTreeMap, sync::Arc};

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIs, EnumIter, EnumString, IntoStaticStr};

use crate::utils::{Error, Result};

/// Semantic storage kind of an attribute.
///
/// This says nothing about how the attribute is encoded on disk, only what a
/// decoded value looks like.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    EnumIs,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Display,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StorageKind {
    /// A null-terminated string.
    String,
    /// A boolean flag.
    Flag,
    /// An unsigned constant.
    Unsigned,
    /// A signed constant.
    Signed,
    /// A target address.
    Address,
    /// An offset into another debugging section.
    Offset,
    /// A location description, possibly a list of ranged expressions.
    #[serde(rename = "loclist")]
    #[strum(serialize = "loclist")]
    LocList,
    /// A list of non-contiguous address ranges.
    #[serde(rename = "rangelist")]
    #[strum(serialize = "rangelist")]
    RangeList,
    /// A reference to another entry.
    Reference,
    /// A reference to another entry that additionally describes a type.
    TypeReference,
    /// Placeholder for attributes whose normalised form is not settled yet.
    Unspecified,
}

/// An attribute name together with its storage kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub storage: StorageKind,
}

/// Immutable mapping from attribute name to [`AttributeDescriptor`].
///
/// ```rust
/// # use hydie::catalog::{AttributeCatalog, AttributeDescriptor, StorageKind};
/// let catalog = AttributeCatalog::new([
///     AttributeDescriptor { name: "name".into(), storage: StorageKind::String },
/// ])
/// .unwrap();
/// assert_eq!(catalog.lookup("name").unwrap().storage, StorageKind::String);
/// assert!(catalog.lookup("nope").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    order: Vec<Arc<AttributeDescriptor>>,
    by_name: BTreeMap<String, Arc<AttributeDescriptor>>,
}

impl AttributeCatalog {
    /// Build a catalog, rejecting duplicate names.
    pub fn new(descriptors: impl IntoIterator<Item = AttributeDescriptor>) -> Result<Self> {
        let mut catalog = Self::default();
        for descriptor in descriptors {
            if catalog.by_name.contains_key(&descriptor.name) {
                return Err(Error::DuplicateCatalogEntry(descriptor.name));
            }

            let descriptor = Arc::new(descriptor);
            catalog
                .by_name
                .insert(descriptor.name.clone(), Arc::clone(&descriptor));
            catalog.order.push(descriptor);
        }

        Ok(catalog)
    }

    /// Look up an attribute by name.
    ///
    /// The returned error carries an empty node name; callers validating a
    /// node should use [`Self::lookup_for`] instead.
    pub fn lookup(&self, name: &str) -> Result<&Arc<AttributeDescriptor>> {
        self.lookup_for("", name)
    }

    /// Look up an attribute used by `node`, naming the node on failure.
    pub fn lookup_for(&self, node: &str, name: &str) -> Result<&Arc<AttributeDescriptor>> {
        self.by_name.get(name).ok_or_else(|| Error::UnknownAttribute {
            node: node.to_string(),
            attribute: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate over descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AttributeDescriptor>> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
