//! Entry store
//!
//! In-memory entries built through an [`ArtifactSet`](crate::emit::ArtifactSet):
//! every entry records its kind, runtime tag, attribute slots and children.
//! Entries are kept in a [`SlotMap`] so that handles stay valid while other
//! entries are added or removed, and a removed entry is detected instead of
//! silently aliased.
use std::collections::BTreeMap;

use slotmap::{SlotMap, new_key_type};

use crate::{
    mapper::Representation,
    utils::{DataError, DataResult},
};

mod runtime;

pub use runtime::{ChildCursor, ChildSequence, Read, Runtime};

new_key_type! {
    /// Handle of an entry inside an [`EntryStore`].
    pub struct EntryId;
}

/// One location expression valid over `[begin, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocExpr {
    pub begin: u64,
    pub end: u64,
    pub expr: Vec<u8>,
}

/// Location description: a single expression or a list of ranged ones.
pub type LocList = Vec<LocExpr>;

/// Half-open address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    pub begin: u64,
    pub end: u64,
}

pub type RangeList = Vec<AddressRange>;

/// A decoded attribute value, one variant per [`Representation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    U64(u64),
    I64(i64),
    Address(u64),
    Offset(u64),
    LocList(LocList),
    RangeList(RangeList),
    EntryRef(EntryId),
    Opaque(Vec<u8>),
}

impl AttrValue {
    pub fn representation(&self) -> Representation {
        match self {
            AttrValue::Text(_) => Representation::Text,
            AttrValue::Bool(_) => Representation::Bool,
            AttrValue::U64(_) => Representation::U64,
            AttrValue::I64(_) => Representation::I64,
            AttrValue::Address(_) => Representation::Address,
            AttrValue::Offset(_) => Representation::Offset,
            AttrValue::LocList(_) => Representation::LocList,
            AttrValue::RangeList(_) => Representation::RangeList,
            AttrValue::EntryRef(_) => Representation::EntryRef,
            AttrValue::Opaque(_) => Representation::Opaque,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttrValue::U64(v) | AttrValue::Address(v) | AttrValue::Offset(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_entry(&self) -> Option<EntryId> {
        match self {
            AttrValue::EntryRef(id) => Some(*id),
            _ => None,
        }
    }
}

/// A single debugging entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: String,
    pub tag: u16,
    /// Attribute slots keyed by attribute name.
    pub attrs: BTreeMap<String, AttrValue>,
    /// Children in insertion order.
    pub children: Vec<EntryId>,
    pub parent: Option<EntryId>,
}

impl Entry {
    pub fn new(kind: impl Into<String>, tag: u16, parent: Option<EntryId>) -> Self {
        Self {
            kind: kind.into(),
            tag,
            attrs: BTreeMap::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// Arena owning every entry of a debugging-information tree.
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: SlotMap<EntryId, Entry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntryId) -> DataResult<&Entry> {
        self.entries.get(id).ok_or(DataError::DanglingEntry)
    }

    pub fn get_mut(&mut self, id: EntryId) -> DataResult<&mut Entry> {
        self.entries.get_mut(id).ok_or(DataError::DanglingEntry)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert `entry`, linking it under its parent if it has one.
    ///
    /// Nothing is inserted when the parent is not a live entry.
    pub(crate) fn insert(&mut self, entry: Entry) -> DataResult<EntryId> {
        if let Some(parent) = entry.parent {
            self.get(parent)?;
        }
        let parent = entry.parent;
        let id = self.entries.insert(entry);
        if let Some(parent) = parent {
            self.get_mut(parent)?.children.push(id);
        }
        Ok(id)
    }

    /// Remove an entry and, recursively, its children.
    pub fn remove(&mut self, id: EntryId) -> DataResult<Entry> {
        let entry = self.entries.remove(id).ok_or(DataError::DanglingEntry)?;
        if let Some(parent) = entry.parent.and_then(|p| self.entries.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        let mut pending = entry.children.clone();
        while let Some(child) = pending.pop() {
            if let Some(removed) = self.entries.remove(child) {
                pending.extend(removed.children);
            }
        }
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Entry)> {
        self.entries.iter()
    }
}
