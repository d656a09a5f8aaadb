//! Ravelin: a queryable, validating model of OpenAPI 2.0 (Swagger)
//! documents.
//!
//! A [`Definition`] is loaded once (the only asynchronous step, since remote
//! references may need fetching) and then answers synchronous questions:
//! which path and operation serve a request, whether a request or response
//! conforms to the document, and whether the document itself is sound.
//!
//! ```no_run
//! # async fn demo(document: serde_json::Value) -> Result<(), ravelin::DefinitionError> {
//! use ravelin::{Definition, HttpRequest, LoadOptions};
//!
//! let definition = Definition::load(document, LoadOptions::default()).await?;
//! let report = definition.validate();
//! assert!(report.errors.is_empty());
//!
//! let req = HttpRequest::new("GET", "/v2/pet/42");
//! if let Some(operation) = definition.operation_for_request(&req) {
//!     let results = operation.validate_request(&req);
//!     println!("{} errors", results.errors.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod coerce;
pub mod definition;
pub mod error;
pub mod media;
pub mod message;
pub mod operation;
pub mod options;
pub mod parameter;
pub mod path;
pub mod registry;
pub mod response;
mod validation;

pub use definition::{Definition, HTTP_METHODS};
pub use error::{DefinitionError, RegistryError};
pub use message::{parse_query, Body, HttpRequest, HttpResponse};
pub use operation::Operation;
pub use options::LoadOptions;
pub use parameter::{Location, Parameter, ParameterValue};
pub use path::Path;
pub use registry::{CustomValidator, ValidatorId};
pub use response::Response;

pub use ravelin_refs::{DocumentLoader, FileLoader, ReferenceKind, ReferenceOutcome, ReferenceResolver};
pub use ravelin_schema::{codes, FormatRegistry, Issue, ValidationResults};
