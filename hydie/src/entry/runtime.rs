use log::trace;

use crate::{
    emit::{AccessorBody, ArtifactSet, Concrete, ReadStep},
    entry::{AttrValue, Entry, EntryId, EntryStore},
    utils::{DataError, DataResult},
};

/// Result of reading an attribute through its accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read<'s> {
    /// Mandatory attribute: always present.
    Bare(&'s AttrValue),
    /// Optional attribute: possibly absent.
    Maybe(Option<&'s AttrValue>),
}

impl<'s> Read<'s> {
    pub fn value(self) -> Option<&'s AttrValue> {
        match self {
            Read::Bare(v) => Some(v),
            Read::Maybe(v) => v,
        }
    }

    pub fn is_bare(&self) -> bool {
        matches!(self, Read::Bare(_))
    }
}

/// View over the children of one kind under a parent entry.
///
/// The view is restartable: every call to [`ChildSequence::begin`] starts a
/// fresh traversal in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct ChildSequence<'s> {
    store: &'s EntryStore,
    children: &'s [EntryId],
    tag: u16,
}

impl<'s> ChildSequence<'s> {
    /// Cursor on the first matching child.
    pub fn begin(&self) -> ChildCursor<'s> {
        let mut cursor = ChildCursor {
            seq: *self,
            pos: 0,
        };
        cursor.skip_foreign();
        cursor
    }

    /// Past-the-end cursor.
    pub fn end(&self) -> ChildCursor<'s> {
        ChildCursor {
            seq: *self,
            pos: self.children.len(),
        }
    }

    pub fn iter(&self) -> ChildCursor<'s> {
        self.begin()
    }
}

impl<'s> IntoIterator for ChildSequence<'s> {
    type Item = EntryId;
    type IntoIter = ChildCursor<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.begin()
    }
}

/// Position inside a [`ChildSequence`].
#[derive(Debug, Clone, Copy)]
pub struct ChildCursor<'s> {
    seq: ChildSequence<'s>,
    pos: usize,
}

impl ChildCursor<'_> {
    fn matches(&self, id: EntryId) -> bool {
        self.seq
            .store
            .get(id)
            .is_ok_and(|entry| entry.tag == self.seq.tag)
    }

    fn skip_foreign(&mut self) {
        while self.pos < self.seq.children.len() && !self.matches(self.seq.children[self.pos]) {
            self.pos += 1;
        }
    }
}

impl PartialEq for ChildCursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.seq.children, other.seq.children)
            && self.seq.tag == other.seq.tag
            && self.pos == other.pos
    }
}

impl Eq for ChildCursor<'_> {}

impl Iterator for ChildCursor<'_> {
    type Item = EntryId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.seq.children.get(self.pos)?;
        self.pos += 1;
        self.skip_foreign();
        Some(id)
    }
}

/// Executes emitted artifacts against an [`EntryStore`].
///
/// Construction goes through the dispatch table, attribute access through
/// the accessor bodies of each concrete kind, child iteration through the
/// child ranges of its interface, and category tests through the emitted
/// predicates.
#[derive(Debug, Clone, Copy)]
pub struct Runtime<'a> {
    artifacts: &'a ArtifactSet,
}

impl<'a> Runtime<'a> {
    pub fn new(artifacts: &'a ArtifactSet) -> Self {
        Self { artifacts }
    }

    /// Construct an entry of the kind registered for `tag`.
    ///
    /// Fails with [`DataError::UnrecognizedKind`] for unknown tags and with
    /// [`DataError::DanglingEntry`] for a dead parent; nothing is inserted in
    /// either case.
    pub fn construct(
        &self,
        store: &mut EntryStore,
        tag: u16,
        parent: Option<EntryId>,
    ) -> DataResult<EntryId> {
        let case = self.artifacts.dispatch.lookup(tag)?;
        trace!("Constructing `{}` ({tag:#06x})", case.kind);
        store.insert(Entry::new(case.kind.clone(), case.tag, parent))
    }

    fn concrete(&self, entry: &Entry) -> DataResult<&'a Concrete> {
        self.artifacts
            .concrete(&entry.kind)
            .ok_or(DataError::UnrecognizedKind(entry.tag))
    }

    fn body(&self, entry: &Entry, attribute: &str) -> DataResult<&'a AccessorBody> {
        self.concrete(entry)?
            .body(attribute)
            .ok_or_else(|| DataError::UnknownAccessor {
                kind: entry.kind.clone(),
                attribute: attribute.to_string(),
            })
    }

    /// Read an attribute through its accessor.
    ///
    /// Mandatory attributes read as [`Read::Bare`] and fail when absent;
    /// optional ones read as [`Read::Maybe`]. Type-constrained references are
    /// checked against the narrowing category.
    pub fn get<'s>(
        &self,
        store: &'s EntryStore,
        id: EntryId,
        attribute: &str,
    ) -> DataResult<Read<'s>> {
        let entry = store.get(id)?;
        let body = self.body(entry, attribute)?;
        let value = entry.attrs.get(&body.slot);

        if let (ReadStep::Narrow { category }, Some(value)) = (&body.read, value) {
            self.narrow(store, attribute, category, value)?;
        }

        if body.mandatory {
            value
                .map(Read::Bare)
                .ok_or_else(|| DataError::MissingMandatoryAttribute {
                    kind: entry.kind.clone(),
                    attribute: attribute.to_string(),
                })
        } else {
            Ok(Read::Maybe(value))
        }
    }

    fn narrow(
        &self,
        store: &EntryStore,
        attribute: &str,
        category: &str,
        value: &AttrValue,
    ) -> DataResult<()> {
        let target = value.as_entry().ok_or(DataError::StorageMismatch {
            attribute: attribute.to_string(),
            expected: "entry_ref",
            found: value.representation().into(),
        })?;
        let target = store.get(target)?;
        let member = self
            .artifacts
            .predicate(category)
            .is_some_and(|p| p.test(target.tag));
        if member {
            Ok(())
        } else {
            Err(DataError::NarrowingFailed {
                attribute: attribute.to_string(),
                category: category.to_string(),
                found: target.kind.clone(),
            })
        }
    }

    /// Write an attribute through its accessor.
    ///
    /// `None` clears an optional attribute and is rejected for mandatory ones.
    /// References are stored as plain entry handles.
    pub fn set(
        &self,
        store: &mut EntryStore,
        id: EntryId,
        attribute: &str,
        value: Option<AttrValue>,
    ) -> DataResult<()> {
        let body = self.body(store.get(id)?, attribute)?;
        let entry = store.get_mut(id)?;

        match value {
            Some(value) => {
                let found = value.representation();
                if found != body.representation {
                    return Err(DataError::StorageMismatch {
                        attribute: attribute.to_string(),
                        expected: body.representation.into(),
                        found: found.into(),
                    });
                }
                entry.attrs.insert(body.slot.clone(), value);
            }
            None if body.mandatory => {
                return Err(DataError::ClearMandatory {
                    kind: entry.kind.clone(),
                    attribute: attribute.to_string(),
                });
            }
            None => {
                entry.attrs.remove(&body.slot);
            }
        }
        Ok(())
    }

    /// Children of kind `child_kind` under `id`, in insertion order.
    pub fn children_of_kind<'s>(
        &self,
        store: &'s EntryStore,
        id: EntryId,
        child_kind: &str,
    ) -> DataResult<ChildSequence<'s>> {
        let entry = store.get(id)?;
        let permitted = self
            .artifacts
            .interface(&entry.kind)
            .is_some_and(|i| i.child_range(child_kind).is_some());
        let tag = self.artifacts.dispatch.tag_of(child_kind);
        match tag {
            Some(tag) if permitted => Ok(ChildSequence {
                store,
                children: &entry.children,
                tag,
            }),
            _ => Err(DataError::UnknownChildRange {
                kind: entry.kind.clone(),
                child: child_kind.to_string(),
            }),
        }
    }

    /// Whether the entry's kind belongs to `category`.
    pub fn is_a(&self, store: &EntryStore, id: EntryId, category: &str) -> DataResult<bool> {
        let entry = store.get(id)?;
        Ok(self
            .artifacts
            .predicate(category)
            .is_some_and(|p| p.test(entry.tag)))
    }

    /// Check that every mandatory attribute of the entry is present.
    pub fn validate(&self, store: &EntryStore, id: EntryId) -> DataResult<()> {
        let entry = store.get(id)?;
        let concrete = self.concrete(entry)?;
        match concrete
            .bodies
            .iter()
            .find(|b| b.mandatory && !entry.attrs.contains_key(&b.slot))
        {
            Some(missing) => Err(DataError::MissingMandatoryAttribute {
                kind: entry.kind.clone(),
                attribute: missing.attribute.clone(),
            }),
            None => Ok(()),
        }
    }
}
