//! Schema validation for Ravelin.
//!
//! Wraps `jsonschema` with draft-04 semantics and the OpenAPI 2.0 formats,
//! and turns violations into [`Issue`]s with stable codes and messages.

pub mod error;
pub mod formats;
pub mod issue;
pub mod sample;
pub mod validator;

pub use error::SchemaError;
pub use formats::{FormatGenerator, FormatRegistry, FormatValidator};
pub use issue::{codes, Issue, ValidationResults};
pub use sample::generate;
pub use validator::{json_type, validate, CompiledSchema};
