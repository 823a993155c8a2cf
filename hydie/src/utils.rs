use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

/// Errors raised while loading and validating a schema.
///
/// Every variant is fatal to a generation run: a schema that fails to load
/// cannot be resolved, and nothing is emitted for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// Two kinds and/or categories share the same name.
    #[error(
        "The name `{name}` is defined more than once. Kinds and categories share a single namespace."
    )]
    DuplicateKind { name: String },

    /// Two instantiable kinds share the same runtime tag.
    #[error(
        "Kinds `{first}` and `{second}` both use the runtime tag {tag:#06x}. Runtime tags must be unique."
    )]
    DuplicateTag {
        tag: u16,
        first: String,
        second: String,
    },

    /// An attribute is listed twice in a single node's own attribute list.
    #[error("`{node}` lists the attribute `{attribute}` more than once in its own attributes.")]
    DuplicateAttribute { node: String, attribute: String },

    /// Two catalog entries share the same attribute name.
    #[error("The attribute `{0}` is declared more than once in the attribute catalog.")]
    DuplicateCatalogEntry(String),

    /// A node lists a base that is neither a kind nor a category.
    #[error("`{node}` declares `{base}` as a base, but no kind or category has that name.")]
    UnknownBase { node: String, base: String },

    /// An attribute name is absent from the attribute catalog.
    #[error(
        "The attribute `{attribute}` (used by `{node}`) is not present in the attribute catalog."
    )]
    UnknownAttribute { node: String, attribute: String },

    /// A child kind is not a defined, instantiable kind.
    #[error(
        "`{node}` permits children of kind `{child}`, but `{child}` is not a defined kind. Categories cannot be child kinds."
    )]
    UnknownChildKind { node: String, child: String },

    /// The base graph contains a cycle.
    #[error("Cyclic inheritance detected: {}.", path.join(" -> "))]
    CyclicInheritance { path: Vec<String> },

    /// The category used to narrow type-constrained references does not exist.
    #[error(
        "Type-constrained references narrow to the category `{0}`, but no category has that name."
    )]
    UnknownNarrowingCategory(String),

    /// The schema document could not be parsed.
    #[error("Failed to parse schema document `{file}`: {message}")]
    DocumentParse {
        file: String,
        message: String,
        span: Option<std::ops::Range<usize>>,
    },

    /// The schema document could not be read.
    #[error("Failed to read schema document `{file}`: {message}")]
    DocumentRead { file: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when generated accessors, child views or the dispatch table
/// are exercised against actual entries.
///
/// These are never raised during generation itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum DataError {
    /// A mandatory attribute is absent from a concrete entry.
    #[error("Entry of kind `{kind}` is missing its mandatory attribute `{attribute}`.")]
    MissingMandatoryAttribute { kind: String, attribute: String },

    /// A runtime tag matches no known kind.
    #[error("The runtime tag {0:#06x} does not match any known kind.")]
    UnrecognizedKind(u16),

    /// A type-constrained reference points at an entry outside the narrowing category.
    #[error(
        "Attribute `{attribute}` must reference an entry in category `{category}`, but it references a `{found}`."
    )]
    NarrowingFailed {
        attribute: String,
        category: String,
        found: String,
    },

    /// A setter was given a value of the wrong representation.
    #[error("Attribute `{attribute}` stores {expected} values, got {found}.")]
    StorageMismatch {
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A mandatory attribute cannot be cleared.
    #[error("Attribute `{attribute}` is mandatory on `{kind}` and cannot be cleared.")]
    ClearMandatory { kind: String, attribute: String },

    /// The kind has no accessor with the given attribute name.
    #[error("Kind `{kind}` exposes no accessor for attribute `{attribute}`.")]
    UnknownAccessor { kind: String, attribute: String },

    /// The kind does not permit children of the given kind.
    #[error("Kind `{kind}` does not permit children of kind `{child}`.")]
    UnknownChildRange { kind: String, child: String },

    /// An entry id does not refer to a live entry of the store.
    #[error("The entry id does not refer to a live entry.")]
    DanglingEntry,
}

pub type DataResult<T> = std::result::Result<T, DataError>;
