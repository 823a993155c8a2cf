//! Artifact emission
//!
//! The [`Emitter`] turns a [`ResolvedSchema`] into an [`ArtifactSet`]: a
//! language-neutral description of everything a target needs to represent
//! entries: forward declarations, one interface per kind and category,
//! concrete representations with their accessor bodies, child-iteration
//! types, the runtime dispatch table and one membership predicate per
//! category. Names in the artifacts are plain snake_case identifiers; turning
//! them into target syntax is left to a renderer such as [`render`].
//!
//! Emission is a pure function of the resolved schema: emitting twice yields
//! equal artifact sets.
use std::collections::BTreeSet;

use log::{debug, info};

use crate::{
    catalog::StorageKind,
    mapper::{Representation, StorageMapper},
    resolve::{EffectiveSchema, ResolvedSchema},
    schema::AttributeUse,
    utils::{DataError, DataResult},
};

pub mod render;

/// Pluralise a kind name for child-range accessors.
///
/// ```rust
/// # use hydie::emit::pluralise;
/// assert_eq!(pluralise("member"), "members");
/// assert_eq!(pluralise("unspecified_parameters"), "unspecified_parameters");
/// ```
pub fn pluralise(name: &str) -> String {
    if name.ends_with('s') {
        name.to_string()
    } else {
        format!("{name}s")
    }
}

/// Turn an attribute name into an accessor-safe identifier fragment.
fn accessor_stem(attribute: &str) -> String {
    attribute.to_ascii_lowercase()
}

/// Forward declaration of one instantiable kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForwardDecl {
    pub kind: String,
    pub tag: u16,
}

/// Declaration of an accessor pair for an attribute the node declares itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessorDecl {
    pub attribute: String,
    pub getter: String,
    pub setter: String,
    pub storage: StorageKind,
    pub representation: Representation,
    pub mandatory: bool,
    /// Category a reference is narrowed to on read.
    pub narrowing: Option<String>,
}

/// Re-exposure of an accessor declared by a base.
///
/// Carries no storage semantics: those belong to the declaring node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReexportDecl {
    pub attribute: String,
    pub getter: String,
    pub setter: String,
    pub declared_in: String,
}

/// Pair of boundary accessors delimiting the children of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildRangeDecl {
    pub child_kind: String,
    pub begin: String,
    pub end: String,
    /// Name of the [`ChildIter`] type yielded by both boundaries.
    pub iterator: String,
}

/// Abstract interface of a kind or category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub node: String,
    pub instantiable: bool,
    /// Interfaces of the direct bases, in declaration order.
    pub bases: Vec<String>,
    pub accessors: Vec<AccessorDecl>,
    pub reexports: Vec<ReexportDecl>,
    pub child_ranges: Vec<ChildRangeDecl>,
}

impl Interface {
    pub fn child_range(&self, child_kind: &str) -> Option<&ChildRangeDecl> {
        self.child_ranges.iter().find(|c| c.child_kind == child_kind)
    }
}

/// How an accessor body reads its slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadStep {
    Direct,
    /// Checked downcast of a reference into the given category.
    Narrow { category: String },
}

/// How an accessor body writes its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStep {
    Direct,
    /// Upcast of a narrowed reference back to a plain reference.
    Upcast,
}

/// Where the use backing an accessor body was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BodyOrigin {
    Own,
    Inherited { declared_in: String },
}

/// Implementation of one accessor pair on a concrete representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessorBody {
    pub attribute: String,
    pub getter: String,
    pub setter: String,
    /// Storage slot, keyed by attribute name.
    pub slot: String,
    pub mandatory: bool,
    pub representation: Representation,
    pub read: ReadStep,
    pub write: WriteStep,
    pub origin: BodyOrigin,
}

/// Concrete representation of an instantiable kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concrete {
    pub kind: String,
    pub tag: u16,
    /// Accessor bodies for own attributes, then inherited ones.
    pub bodies: Vec<AccessorBody>,
}

impl Concrete {
    pub fn body(&self, attribute: &str) -> Option<&AccessorBody> {
        self.bodies.iter().find(|b| b.attribute == attribute)
    }
}

/// Child-iteration type over the children of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildIter {
    pub kind: String,
    pub name: String,
}

/// One case of the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchCase {
    pub tag: u16,
    pub kind: String,
}

/// Runtime tag to constructor table, in ascending tag order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    pub cases: Vec<DispatchCase>,
}

impl DispatchTable {
    /// Find the constructor for `tag`.
    pub fn lookup(&self, tag: u16) -> DataResult<&DispatchCase> {
        self.cases
            .binary_search_by_key(&tag, |c| c.tag)
            .map(|i| &self.cases[i])
            .map_err(|_| DataError::UnrecognizedKind(tag))
    }

    pub fn tag_of(&self, kind: &str) -> Option<u16> {
        self.cases.iter().find(|c| c.kind == kind).map(|c| c.tag)
    }
}

/// Membership predicate of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub category: String,
    pub function: String,
    /// Member kinds as `(tag, kind)`, in ascending tag order.
    pub disjuncts: Vec<DispatchCase>,
    tags: BTreeSet<u16>,
}

impl Predicate {
    pub fn test(&self, tag: u16) -> bool {
        self.tags.contains(&tag)
    }
}

/// Everything emitted for one resolved schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    /// One per kind, sorted by kind name.
    pub forward_decls: Vec<ForwardDecl>,
    /// One per node (categories included), in declaration order.
    pub interfaces: Vec<Interface>,
    /// One per kind, in declaration order.
    pub concretes: Vec<Concrete>,
    /// One per kind, in declaration order.
    pub child_iters: Vec<ChildIter>,
    pub dispatch: DispatchTable,
    /// One per category, in declaration order.
    pub predicates: Vec<Predicate>,
}

impl ArtifactSet {
    pub fn interface(&self, node: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.node == node)
    }

    pub fn concrete(&self, kind: &str) -> Option<&Concrete> {
        self.concretes.iter().find(|c| c.kind == kind)
    }

    pub fn predicate(&self, category: &str) -> Option<&Predicate> {
        self.predicates.iter().find(|p| p.category == category)
    }
}

/// Emits the [`ArtifactSet`] of a [`ResolvedSchema`].
///
/// Only resolved schemas can be handed to the emitter, so emission cannot
/// observe a partially closed graph.
pub struct Emitter<'a> {
    schema: &'a ResolvedSchema,
    mapper: StorageMapper,
}

impl<'a> Emitter<'a> {
    /// Emitter using the schema's own narrowing category.
    pub fn new(schema: &'a ResolvedSchema) -> Self {
        let mapper = StorageMapper::new(schema.graph().narrowing_category());
        Self::with_mapper(schema, mapper)
    }

    pub fn with_mapper(schema: &'a ResolvedSchema, mapper: StorageMapper) -> Self {
        Self { schema, mapper }
    }

    pub fn emit(&self) -> ArtifactSet {
        let mut forward_decls: Vec<ForwardDecl> = self
            .schema
            .kinds()
            .filter_map(|k| {
                k.tag.map(|tag| ForwardDecl {
                    kind: k.name.clone(),
                    tag,
                })
            })
            .collect();
        forward_decls.sort();

        let interfaces: Vec<Interface> = self
            .schema
            .nodes()
            .iter()
            .map(|node| self.interface(node))
            .collect();

        let concretes: Vec<Concrete> = self
            .schema
            .kinds()
            .filter_map(|k| self.concrete(k))
            .collect();

        let child_iters = self
            .schema
            .kinds()
            .map(|k| ChildIter {
                kind: k.name.clone(),
                name: Self::iterator_name(&k.name),
            })
            .collect();

        let mut cases: Vec<DispatchCase> = forward_decls
            .iter()
            .map(|f| DispatchCase {
                tag: f.tag,
                kind: f.kind.clone(),
            })
            .collect();
        cases.sort_by_key(|c| c.tag);
        let dispatch = DispatchTable { cases };

        let predicates = self
            .schema
            .predicates()
            .iter()
            .map(|p| {
                let mut disjuncts: Vec<DispatchCase> = p
                    .disjuncts
                    .iter()
                    .filter_map(|kind| {
                        dispatch.tag_of(kind).map(|tag| DispatchCase {
                            tag,
                            kind: kind.clone(),
                        })
                    })
                    .collect();
                disjuncts.sort_by_key(|c| c.tag);
                Predicate {
                    category: p.category.clone(),
                    function: format!("is_{}", p.category),
                    tags: disjuncts.iter().map(|c| c.tag).collect(),
                    disjuncts,
                }
            })
            .collect();

        let set = ArtifactSet {
            forward_decls,
            interfaces,
            concretes,
            child_iters,
            dispatch,
            predicates,
        };
        info!(
            "Emitted {} interfaces, {} concrete kinds, {} predicates",
            set.interfaces.len(),
            set.concretes.len(),
            set.predicates.len()
        );
        set
    }

    fn iterator_name(kind: &str) -> String {
        format!("{}_iterator", pluralise(kind))
    }

    fn accessor_decl(&self, attribute: &AttributeUse) -> Option<AccessorDecl> {
        let descriptor = self.schema.graph().catalog().lookup(&attribute.name).ok()?;
        let stem = accessor_stem(&attribute.name);
        Some(AccessorDecl {
            attribute: attribute.name.clone(),
            getter: format!("get_{stem}"),
            setter: format!("set_{stem}"),
            storage: descriptor.storage,
            representation: self.mapper.representation_for(descriptor.storage),
            mandatory: attribute.mandatory,
            narrowing: self
                .mapper
                .narrowed_target(descriptor.storage)
                .map(str::to_string),
        })
    }

    fn interface(&self, node: &EffectiveSchema) -> Interface {
        let accessors = node
            .own
            .iter()
            .filter_map(|a| self.accessor_decl(a))
            .collect();

        let reexports = node
            .inherited
            .iter()
            .map(|i| {
                let stem = accessor_stem(&i.attribute.name);
                ReexportDecl {
                    attribute: i.attribute.name.clone(),
                    getter: format!("get_{stem}"),
                    setter: format!("set_{stem}"),
                    declared_in: i.declared_in.clone(),
                }
            })
            .collect();

        let child_ranges = node
            .children
            .iter()
            .map(|child| {
                let plural = pluralise(child);
                ChildRangeDecl {
                    child_kind: child.clone(),
                    begin: format!("{plural}_begin"),
                    end: format!("{plural}_end"),
                    iterator: Self::iterator_name(child),
                }
            })
            .collect();

        debug!("Emitting interface for `{}`", node.name);
        Interface {
            node: node.name.clone(),
            instantiable: node.is_kind(),
            bases: node.bases.clone(),
            accessors,
            reexports,
            child_ranges,
        }
    }

    fn concrete(&self, kind: &EffectiveSchema) -> Option<Concrete> {
        let tag = kind.tag?;
        let own = kind.own.iter().map(|a| (a, BodyOrigin::Own));
        let inherited = kind.inherited.iter().map(|i| {
            (
                &i.attribute,
                BodyOrigin::Inherited {
                    declared_in: i.declared_in.clone(),
                },
            )
        });

        let bodies = own
            .chain(inherited)
            .filter_map(|(attribute, origin)| {
                let decl = self.accessor_decl(attribute)?;
                let (read, write) = match &decl.narrowing {
                    Some(category) => (
                        ReadStep::Narrow {
                            category: category.clone(),
                        },
                        WriteStep::Upcast,
                    ),
                    None => (ReadStep::Direct, WriteStep::Direct),
                };
                Some(AccessorBody {
                    slot: decl.attribute.clone(),
                    attribute: decl.attribute,
                    getter: decl.getter,
                    setter: decl.setter,
                    mandatory: decl.mandatory,
                    representation: decl.representation,
                    read,
                    write,
                    origin,
                })
            })
            .collect();

        Some(Concrete {
            kind: kind.name.clone(),
            tag,
            bodies,
        })
    }
}
