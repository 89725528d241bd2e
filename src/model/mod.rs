//! Normalized schema data model.
//!
//! [`SchemaDocument`] is the central structure: every input document is
//! normalized into it by the loader, and every later pipeline stage borrows
//! it read-only.

mod document;
mod index;
mod location;

pub use document::{
    BodyDef, EnumDef, FieldDef, HttpMethod, InlineType, ObjectDef, Operation, OperationKey,
    ParamLocation, ParameterDef, SchemaDocument, TypeDefinition, TypeKind, TypeReference,
};
pub use index::{normalize_path, SchemaIndex};
pub use location::Location;
