//! Kind schema and category layer
//!
//! This module holds the declarative description of entry kinds and of the
//! artificial categories they inherit from. Both live in a single namespace
//! and are represented by [`NodeDefinition`], tagged by [`NodeRole`].
//!
//! [`SchemaGraph::load`] only validates referential integrity and acyclicity
//! of the base graph; computing closures is the job of
//! [`crate::resolve::Resolver`].
use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use petgraph::{
    algo::{tarjan_scc, toposort},
    graph::{DiGraph, NodeIndex},
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::EnumIs;

use crate::{
    catalog::AttributeCatalog,
    utils::{Error, Result},
};

pub mod document;
pub mod standard;

/// Use of an attribute by a kind or category.
///
/// Optionality belongs to the use site: the same attribute may be mandatory
/// on one kind and optional on another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeUse {
    pub name: String,
    pub mandatory: bool,
}

impl AttributeUse {
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mandatory: false,
        }
    }

    pub fn mandatory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mandatory: true,
        }
    }
}

/// Whether a node can be instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum NodeRole {
    /// Artificial base used only for sharing structure. Never constructed and
    /// never seen as a runtime tag.
    Category,
    /// Instantiable entry kind, identified at run time by `tag`.
    Kind { tag: u16 },
}

/// A kind or category as written in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDefinition {
    pub name: String,
    pub role: NodeRole,
    /// Own attribute uses, in declaration order.
    pub attributes: Vec<AttributeUse>,
    /// Permitted child kinds, in declaration order.
    pub children: Vec<String>,
    /// Direct bases (kinds and/or categories), in declaration order.
    pub bases: SmallVec<String, 2>,
}

impl NodeDefinition {
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: NodeRole::Category,
            attributes: Vec::new(),
            children: Vec::new(),
            bases: SmallVec::new(),
        }
    }

    pub fn kind(name: impl Into<String>, tag: u16) -> Self {
        Self {
            role: NodeRole::Kind { tag },
            ..Self::category(name)
        }
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeUse>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn with_children<S: Into<String>>(mut self, children: impl IntoIterator<Item = S>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn with_bases<S: Into<String>>(mut self, bases: impl IntoIterator<Item = S>) -> Self {
        self.bases.extend(bases.into_iter().map(Into::into));
        self
    }

    /// Runtime tag if this node is an instantiable kind.
    pub fn tag(&self) -> Option<u16> {
        match self.role {
            NodeRole::Kind { tag } => Some(tag),
            NodeRole::Category => None,
        }
    }
}

/// Validated base graph of kinds and categories.
///
/// Nodes keep their declaration order; `topo_order` lists every node after
/// all of its bases.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    catalog: AttributeCatalog,
    nodes: Vec<NodeDefinition>,
    by_name: BTreeMap<String, usize>,
    topo_order: Vec<usize>,
    narrowing_category: String,
}

impl SchemaGraph {
    /// Name of the category type-constrained references narrow to by default.
    pub const DEFAULT_NARROWING_CATEGORY: &'static str = "type";

    /// Validate `nodes` against `catalog` and build the base graph.
    ///
    /// Uses [`Self::DEFAULT_NARROWING_CATEGORY`] for type-constrained
    /// references; see [`Self::load_with_narrowing`].
    pub fn load(catalog: AttributeCatalog, nodes: Vec<NodeDefinition>) -> Result<Self> {
        Self::load_with_narrowing(catalog, nodes, Self::DEFAULT_NARROWING_CATEGORY)
    }

    /// Same as [`Self::load`] with an explicit narrowing category.
    ///
    /// The narrowing category is only checked when the catalog actually
    /// contains a type-constrained attribute.
    pub fn load_with_narrowing(
        catalog: AttributeCatalog,
        nodes: Vec<NodeDefinition>,
        narrowing_category: &str,
    ) -> Result<Self> {
        // Unique names across kinds and categories
        let mut by_name = BTreeMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if by_name.insert(node.name.clone(), index).is_some() {
                return Err(Error::DuplicateKind {
                    name: node.name.clone(),
                });
            }
        }

        // Unique runtime tags
        let mut by_tag: BTreeMap<u16, &str> = BTreeMap::new();
        for node in &nodes {
            if let Some(tag) = node.tag() {
                if let Some(first) = by_tag.insert(tag, &node.name) {
                    return Err(Error::DuplicateTag {
                        tag,
                        first: first.to_string(),
                        second: node.name.clone(),
                    });
                }
            }
        }

        // Referential integrity of attributes, bases and children
        for node in &nodes {
            let mut seen = BTreeSet::new();
            for attr in &node.attributes {
                catalog.lookup_for(&node.name, &attr.name)?;
                if !seen.insert(attr.name.as_str()) {
                    return Err(Error::DuplicateAttribute {
                        node: node.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
            }

            for base in &node.bases {
                if !by_name.contains_key(base) {
                    return Err(Error::UnknownBase {
                        node: node.name.clone(),
                        base: base.clone(),
                    });
                }
            }

            for child in &node.children {
                let is_kind = by_name
                    .get(child)
                    .is_some_and(|&index| nodes[index].role.is_kind());
                if !is_kind {
                    return Err(Error::UnknownChildKind {
                        node: node.name.clone(),
                        child: child.clone(),
                    });
                }
            }
        }

        let narrows = catalog.iter().any(|attr| attr.storage.is_type_reference());
        if narrows {
            let is_category = by_name
                .get(narrowing_category)
                .is_some_and(|&index| nodes[index].role.is_category());
            if !is_category {
                return Err(Error::UnknownNarrowingCategory(
                    narrowing_category.to_string(),
                ));
            }
        }

        let topo_order = Self::check_acyclic(&nodes, &by_name)?;
        debug!(
            "Loaded schema graph: {} kinds, {} categories, {} attributes",
            nodes.iter().filter(|n| n.role.is_kind()).count(),
            nodes.iter().filter(|n| n.role.is_category()).count(),
            catalog.len()
        );

        Ok(Self {
            catalog,
            nodes,
            by_name,
            topo_order,
            narrowing_category: narrowing_category.to_string(),
        })
    }

    /// Build the base graph (edge: base -> dependent) and return a
    /// topological order, or the offending cycle.
    fn check_acyclic(
        nodes: &[NodeDefinition],
        by_name: &BTreeMap<String, usize>,
    ) -> Result<Vec<usize>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(nodes.len(), nodes.len());
        let indices: Vec<NodeIndex> = (0..nodes.len()).map(|i| graph.add_node(i)).collect();
        for (dependent, node) in nodes.iter().enumerate() {
            for base in &node.bases {
                let base = by_name[base];
                graph.add_edge(indices[base], indices[dependent], ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|ix| graph[ix]).collect()),
            Err(_) => Err(Error::CyclicInheritance {
                path: Self::find_cycle(nodes, by_name, &graph),
            }),
        }
    }

    /// Extract one cycle from the strongly connected components of `graph`,
    /// following declared bases so the path reads "X -> base of X -> ...".
    fn find_cycle(
        nodes: &[NodeDefinition],
        by_name: &BTreeMap<String, usize>,
        graph: &DiGraph<usize, ()>,
    ) -> Vec<String> {
        let component = tarjan_scc(graph)
            .into_iter()
            .map(|scc| scc.into_iter().map(|ix| graph[ix]).collect::<BTreeSet<_>>())
            .find(|scc| {
                scc.len() > 1
                    || scc
                        .iter()
                        .any(|&i| nodes[i].bases.iter().any(|b| by_name[b] == i))
            })
            .unwrap_or_default();

        // Start from the first node in declaration order and walk bases
        // inside the component until a node repeats.
        let Some(&start) = component.iter().next() else {
            return Vec::new();
        };
        let mut path = vec![start];
        let mut current = start;
        loop {
            let next = nodes[current]
                .bases
                .iter()
                .map(|b| by_name[b])
                .find(|b| component.contains(b));
            let Some(next) = next else { break };
            if let Some(pos) = path.iter().position(|&p| p == next) {
                path.drain(..pos);
                path.push(next);
                break;
            }
            path.push(next);
            current = next;
        }

        path.into_iter().map(|i| nodes[i].name.clone()).collect()
    }

    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> &[NodeDefinition] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.index_of(name).map(|i| &self.nodes[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Instantiable kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.nodes.iter().filter(|n| n.role.is_kind())
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.nodes.iter().filter(|n| n.role.is_category())
    }

    /// Node indices ordered so that every base precedes its dependents.
    pub fn topo_order(&self) -> &[usize] {
        &self.topo_order
    }

    pub fn narrowing_category(&self) -> &str {
        &self.narrowing_category
    }
}
