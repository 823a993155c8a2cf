//! Hydie: a schema compiler for DWARF debugging-information entry kinds.
//!
//! A schema names every attribute an entry can carry (with its storage kind),
//! every instantiable entry kind (with its runtime tag, own attributes and
//! permitted children) and the artificial categories kinds inherit from.
//! Hydie validates such a schema, flattens the base graph into one effective
//! schema per node and emits everything a target needs to represent entries.
//!
//! Pipeline
//!  - [`schema::SchemaGraph::load`] checks names, tags, attribute uses and
//!    acyclicity of the base graph.
//!  - [`resolve::Resolver`] closes every node, yielding a
//!    [`resolve::ResolvedSchema`] and non-fatal diagnostics.
//!  - [`emit::Emitter`] produces an [`emit::ArtifactSet`], which
//!    [`emit::render`] turns into text and [`entry::Runtime`] executes
//!    against an [`entry::EntryStore`].
//!
//! Example
//! ```
//! use hydie::{emit::Emitter, entry::{EntryStore, Runtime}, schema::standard};
//!
//! let schema = standard::standard().unwrap();
//! let artifacts = Emitter::new(schema).emit();
//!
//! let runtime = Runtime::new(&artifacts);
//! let mut store = EntryStore::new();
//! let cu = runtime.construct(&mut store, 0x11, None).unwrap();
//! assert!(runtime.is_a(&store, cu, "with_named_children").unwrap());
//! ```
pub mod catalog;
pub mod emit;
pub mod entry;
pub mod mapper;
pub mod resolve;
pub mod schema;
pub mod utils;
