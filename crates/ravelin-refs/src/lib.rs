//! JSON Reference resolution for Swagger 2.0 documents.
//!
//! Produces the original document, partially and fully expanded copies of it,
//! and an inventory of every `$ref` with its resolution outcome.

pub mod error;
pub mod loader;
pub mod pointer;
pub mod reference;
pub mod resolver;

pub use error::RefError;
pub use loader::{parse_document, DocumentLoader, FileLoader};
pub use reference::{ref_uri, ReferenceKind, ReferenceOutcome};
pub use resolver::{location_to_url, JsonRefResolver, ReferenceResolver, Resolution};
