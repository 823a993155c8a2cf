//! Closure resolution
//!
//! Flattens the base graph of a [`SchemaGraph`] into one [`EffectiveSchema`]
//! per node: the attributes a node declares itself, the deduplicated
//! attributes it inherits, the transitive set of permitted children and the
//! transitive set of ancestors. Category membership predicates are derived
//! from the ancestor sets.
//!
//! Nodes are visited in topological order, so each node is closed exactly
//! once and every base is already closed when a dependent needs it. Diamonds
//! in the base graph therefore cost nothing extra.
//!
//! # Deduplication policy
//!
//! Inherited attributes are collected base by base, in the order the bases
//! are declared. For each base the node sees the base's own attributes
//! followed by what the base itself inherits. The first occurrence of an
//! attribute name wins. When a later occurrence disagrees on optionality a
//! single [`Diagnostic::ConflictingOptionality`] is recorded for that node
//! and attribute. Attributes a node declares itself always override
//! inherited ones and never produce diagnostics.
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use strum::{EnumIs, EnumTryAs};

use crate::schema::{AttributeUse, NodeDefinition, SchemaGraph};

/// An attribute reached through the base graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InheritedAttribute {
    pub attribute: AttributeUse,
    /// Node whose own attribute list declares this use.
    pub declared_in: String,
    /// Direct base the attribute was first reached through.
    pub via: String,
}

/// Closure result for one kind or category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSchema {
    pub name: String,
    /// Runtime tag, `None` for categories.
    pub tag: Option<u16>,
    /// Direct bases, as declared.
    pub bases: Vec<String>,
    /// Own attribute uses, verbatim.
    pub own: Vec<AttributeUse>,
    /// Inherited attribute uses, disjoint from `own` by name.
    pub inherited: Vec<InheritedAttribute>,
    /// Own children followed by children of every transitive base.
    pub children: Vec<String>,
    /// Transitive bases (kinds and categories), depth-first in declaration order.
    pub ancestors: Vec<String>,
}

impl EffectiveSchema {
    pub fn is_kind(&self) -> bool {
        self.tag.is_some()
    }

    /// Look up an attribute by name, own uses first.
    pub fn attribute(&self, name: &str) -> Option<&AttributeUse> {
        self.own
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.inherited(name).map(|i| &i.attribute))
    }

    pub fn inherited(&self, name: &str) -> Option<&InheritedAttribute> {
        self.inherited.iter().find(|i| i.attribute.name == name)
    }

    /// Every attribute the node exposes: own uses first, then inherited ones.
    pub fn all_attributes(&self) -> impl Iterator<Item = &AttributeUse> {
        self.own
            .iter()
            .chain(self.inherited.iter().map(|i| &i.attribute))
    }

    pub fn has_ancestor(&self, name: &str) -> bool {
        self.ancestors.iter().any(|a| a == name)
    }

    pub fn permits_child(&self, kind: &str) -> bool {
        self.children.iter().any(|c| c == kind)
    }
}

/// Non-fatal findings of the resolver.
///
/// These indicate schema authoring mistakes. Resolution still completes with
/// a deterministic choice, but the finding is kept and logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Diagnostic {
    /// An attribute is inherited through two paths that disagree on optionality.
    ConflictingOptionality {
        node: String,
        attribute: String,
        /// Base whose use was kept (first in declaration order).
        kept_via: String,
        kept_mandatory: bool,
        /// Base whose use was discarded.
        discarded_via: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ConflictingOptionality {
                node,
                attribute,
                kept_via,
                kept_mandatory,
                discarded_via,
            } => {
                let kept = if *kept_mandatory { "mandatory" } else { "optional" };
                let discarded = if *kept_mandatory { "optional" } else { "mandatory" };
                write!(
                    f,
                    "`{node}` inherits `{attribute}` as {kept} through `{kept_via}` and as {discarded} through `{discarded_via}`; keeping the {kept} use"
                )
            }
        }
    }
}

/// Membership test for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPredicate {
    pub category: String,
    /// Kinds having the category among their ancestors, in declaration order.
    pub disjuncts: Vec<String>,
    tags: BTreeSet<u16>,
}

impl CategoryPredicate {
    /// Test a runtime tag for membership.
    pub fn test(&self, tag: u16) -> bool {
        self.tags.contains(&tag)
    }

    pub fn contains_kind(&self, kind: &str) -> bool {
        self.disjuncts.iter().any(|k| k == kind)
    }

    pub fn tags(&self) -> impl Iterator<Item = u16> + '_ {
        self.tags.iter().copied()
    }
}

/// Computes [`EffectiveSchema`]s for a loaded [`SchemaGraph`].
pub struct Resolver {
    graph: SchemaGraph,
}

impl Resolver {
    pub fn new(graph: SchemaGraph) -> Self {
        Self { graph }
    }

    /// Close every node of the graph.
    ///
    /// Resolution is total: a loaded graph is acyclic and referentially
    /// sound, so this cannot fail.
    pub fn resolve(self) -> ResolvedSchema {
        let graph = self.graph;
        let mut closed: Vec<Option<EffectiveSchema>> = vec![None; graph.nodes().len()];
        let mut diagnostics = Vec::new();

        for &index in graph.topo_order() {
            let node = &graph.nodes()[index];
            let bases: Vec<&EffectiveSchema> = node
                .bases
                .iter()
                .filter_map(|b| graph.index_of(b))
                .filter_map(|b| closed[b].as_ref())
                .collect();

            let effective = Self::close_node(node, &bases, &mut diagnostics);
            closed[index] = Some(effective);
        }

        let effective: Vec<EffectiveSchema> = closed.into_iter().flatten().collect();
        debug_assert_eq!(effective.len(), graph.nodes().len());

        let mut by_name = BTreeMap::new();
        let mut by_tag = BTreeMap::new();
        for (index, schema) in effective.iter().enumerate() {
            by_name.insert(schema.name.clone(), index);
            if let Some(tag) = schema.tag {
                by_tag.insert(tag, index);
            }
        }

        let predicates: Vec<CategoryPredicate> = graph
            .categories()
            .map(|category| {
                let members: Vec<&EffectiveSchema> = effective
                    .iter()
                    .filter(|s| s.is_kind() && s.has_ancestor(&category.name))
                    .collect();
                CategoryPredicate {
                    category: category.name.clone(),
                    disjuncts: members.iter().map(|s| s.name.clone()).collect(),
                    tags: members.iter().filter_map(|s| s.tag).collect(),
                }
            })
            .collect();
        let predicate_index = predicates
            .iter()
            .enumerate()
            .map(|(i, p)| (p.category.clone(), i))
            .collect();

        // Report in declaration order, not in the order nodes were closed.
        diagnostics.sort_by_key(|d| match d {
            Diagnostic::ConflictingOptionality { node, .. } => graph.index_of(node),
        });
        for diagnostic in &diagnostics {
            warn!("{}", diagnostic);
        }
        info!(
            "Resolved {} kinds and {} categories ({} diagnostics)",
            by_tag.len(),
            predicates.len(),
            diagnostics.len()
        );

        ResolvedSchema {
            graph,
            effective,
            by_name,
            by_tag,
            predicates,
            predicate_index,
            diagnostics,
        }
    }

    /// Close a single node given its already-closed direct bases.
    fn close_node(
        node: &NodeDefinition,
        bases: &[&EffectiveSchema],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> EffectiveSchema {
        let own_names: BTreeSet<&str> = node.attributes.iter().map(|a| a.name.as_str()).collect();

        let mut inherited: Vec<InheritedAttribute> = Vec::new();
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();
        let mut reported: BTreeSet<String> = BTreeSet::new();

        for base in bases {
            // Everything the base exposes: own uses, then its inherited ones.
            let exposed = base
                .own
                .iter()
                .map(|a| (a, base.name.as_str()))
                .chain(
                    base.inherited
                        .iter()
                        .map(|i| (&i.attribute, i.declared_in.as_str())),
                );

            for (attribute, declared_in) in exposed {
                if own_names.contains(attribute.name.as_str()) {
                    continue;
                }

                match positions.get(&attribute.name) {
                    None => {
                        positions.insert(attribute.name.clone(), inherited.len());
                        inherited.push(InheritedAttribute {
                            attribute: attribute.clone(),
                            declared_in: declared_in.to_string(),
                            via: base.name.clone(),
                        });
                    }
                    Some(&pos) => {
                        let kept = &inherited[pos];
                        if kept.attribute.mandatory != attribute.mandatory
                            && reported.insert(attribute.name.clone())
                        {
                            diagnostics.push(Diagnostic::ConflictingOptionality {
                                node: node.name.clone(),
                                attribute: attribute.name.clone(),
                                kept_via: kept.via.clone(),
                                kept_mandatory: kept.attribute.mandatory,
                                discarded_via: base.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        let mut children: Vec<String> = Vec::new();
        let mut ancestors: Vec<String> = Vec::new();
        for child in node
            .children
            .iter()
            .chain(bases.iter().flat_map(|b| b.children.iter()))
        {
            if !children.contains(child) {
                children.push(child.clone());
            }
        }
        for base in bases {
            for ancestor in std::iter::once(&base.name).chain(base.ancestors.iter()) {
                if !ancestors.contains(ancestor) {
                    ancestors.push(ancestor.clone());
                }
            }
        }

        debug!(
            "Closed `{}`: {} own, {} inherited, {} children, {} ancestors",
            node.name,
            node.attributes.len(),
            inherited.len(),
            children.len(),
            ancestors.len()
        );

        EffectiveSchema {
            name: node.name.clone(),
            tag: node.tag(),
            bases: node.bases.iter().cloned().collect(),
            own: node.attributes.clone(),
            inherited,
            children,
            ancestors,
        }
    }
}

/// A schema whose every node has been closed.
///
/// This is the only input the [`crate::emit::Emitter`] accepts, so emission
/// can never run against an unresolved graph.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    graph: SchemaGraph,
    effective: Vec<EffectiveSchema>,
    by_name: BTreeMap<String, usize>,
    by_tag: BTreeMap<u16, usize>,
    predicates: Vec<CategoryPredicate>,
    predicate_index: BTreeMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl ResolvedSchema {
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    /// Effective schema of a kind or category.
    pub fn effective(&self, name: &str) -> Option<&EffectiveSchema> {
        self.by_name.get(name).map(|&i| &self.effective[i])
    }

    /// Every effective schema, kinds and categories, in declaration order.
    pub fn nodes(&self) -> &[EffectiveSchema] {
        &self.effective
    }

    /// Effective schemas of all instantiable kinds, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &EffectiveSchema> {
        self.effective.iter().filter(|s| s.is_kind())
    }

    /// Effective schemas of all categories, in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &EffectiveSchema> {
        self.effective.iter().filter(|s| !s.is_kind())
    }

    pub fn kind_by_tag(&self, tag: u16) -> Option<&EffectiveSchema> {
        self.by_tag.get(&tag).map(|&i| &self.effective[i])
    }

    pub fn predicate(&self, category: &str) -> Option<&CategoryPredicate> {
        self.predicate_index
            .get(category)
            .map(|&i| &self.predicates[i])
    }

    pub fn predicates(&self) -> &[CategoryPredicate] {
        &self.predicates
    }

    /// Whether `kind` has `category` anywhere in its base closure.
    pub fn is_a(&self, kind: &str, category: &str) -> bool {
        self.predicate(category)
            .is_some_and(|p| p.contains_kind(kind))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
