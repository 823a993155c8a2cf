//! The standard DWARF entry schema, embedded at compile time.
//!
//! The resolved schema is a process-wide immutable value: it is built on
//! first use and shared by reference afterwards.
use once_cell::sync::OnceCell;

use crate::{
    resolve::{ResolvedSchema, Resolver},
    schema::{SchemaGraph, document::SchemaDocument},
    utils::Result,
};

/// Source of the embedded DWARF schema document.
pub const STANDARD_SCHEMA_SOURCE: &str = include_str!("../../data/dwarf.toml");

/// File name reported in errors concerning the embedded document.
pub const STANDARD_SCHEMA_NAME: &str = "<builtin>/dwarf.toml";

static STANDARD: OnceCell<ResolvedSchema> = OnceCell::new();

/// Parse the embedded document.
pub fn standard_document() -> Result<SchemaDocument> {
    SchemaDocument::from_toml_str(STANDARD_SCHEMA_NAME, STANDARD_SCHEMA_SOURCE)
}

/// Parse and validate the embedded document.
pub fn standard_graph() -> Result<SchemaGraph> {
    standard_document()?.into_graph()
}

/// The resolved standard schema, built once per process.
pub fn standard() -> Result<&'static ResolvedSchema> {
    STANDARD.get_or_try_init(|| Ok(Resolver::new(standard_graph()?).resolve()))
}
