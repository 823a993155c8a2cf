//! TOML schema documents.
//!
//! A document supplies the attribute catalog, the categories and the kinds in
//! one file. Attribute uses may be written either as a bare name (optional
//! use) or as a table with an explicit `mandatory` flag:
//!
//! ```toml
//! attribute = [
//!     { name = "name", storage = "string" },
//!     { name = "language", storage = "unsigned" },
//! ]
//! category = [{ name = "with_named_children" }]
//! kind = [
//!     { name = "compile_unit", tag = 0x11, bases = ["with_named_children"], attributes = [
//!         { name = "language", mandatory = true }, "name",
//!     ] },
//! ]
//! ```
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{AttributeCatalog, AttributeDescriptor},
    schema::{AttributeUse, NodeDefinition, SchemaGraph},
    utils::{Error, Result},
};

/// Document-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentOptions {
    /// Category every type-constrained reference must point into.
    pub narrowing_category: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            narrowing_category: SchemaGraph::DEFAULT_NARROWING_CATEGORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeUseEntry {
    /// Bare attribute name: an optional use.
    Name(String),
    /// Attribute use with explicit optionality.
    Full {
        name: String,
        #[serde(default)]
        mandatory: bool,
    },
}

impl From<AttributeUseEntry> for AttributeUse {
    fn from(value: AttributeUseEntry) -> Self {
        match value {
            AttributeUseEntry::Name(name) => AttributeUse::optional(name),
            AttributeUseEntry::Full { name, mandatory } => AttributeUse { name, mandatory },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryEntry {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeUseEntry>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub bases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindEntry {
    pub name: String,
    pub tag: u16,
    #[serde(default)]
    pub attributes: Vec<AttributeUseEntry>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub bases: Vec<String>,
}

/// Parsed, not yet validated, schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub options: DocumentOptions,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
    #[serde(default, rename = "kind")]
    pub kinds: Vec<KindEntry>,
}

impl SchemaDocument {
    /// Parse a document from a TOML string. `file` only labels errors.
    pub fn from_toml_str(file: &str, source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::DocumentParse {
            file: file.to_string(),
            message: e.message().to_string(),
            span: e.span(),
        })
    }

    /// Read and parse a document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::DocumentRead {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_toml_str(&path.display().to_string(), &source)
    }

    /// Serialize the document back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::DocumentParse {
            file: "<serialized>".to_string(),
            message: e.to_string(),
            span: None,
        })
    }

    /// Node definitions in document order: categories first, then kinds.
    pub fn definitions(&self) -> Vec<NodeDefinition> {
        let categories = self.categories.iter().map(|c| {
            NodeDefinition::category(&c.name)
                .with_attributes(c.attributes.iter().cloned().map(AttributeUse::from))
                .with_children(c.children.iter().cloned())
                .with_bases(c.bases.iter().cloned())
        });
        let kinds = self.kinds.iter().map(|k| {
            NodeDefinition::kind(&k.name, k.tag)
                .with_attributes(k.attributes.iter().cloned().map(AttributeUse::from))
                .with_children(k.children.iter().cloned())
                .with_bases(k.bases.iter().cloned())
        });

        categories.chain(kinds).collect()
    }

    /// Validate the document into a [`SchemaGraph`].
    pub fn into_graph(self) -> Result<SchemaGraph> {
        let definitions = self.definitions();
        debug!(
            "Loading schema document: {} attributes, {} definitions",
            self.attributes.len(),
            definitions.len()
        );

        let catalog = AttributeCatalog::new(self.attributes)?;
        SchemaGraph::load_with_narrowing(catalog, definitions, &self.options.narrowing_category)
    }
}
