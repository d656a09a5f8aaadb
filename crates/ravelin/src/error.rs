use ravelin_refs::RefError;
use ravelin_router::RouterError;
use thiserror::Error;

/// Errors raised while loading a document into a [`Definition`](crate::Definition).
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error(transparent)]
    Reference(#[from] RefError),

    #[error(transparent)]
    Route(#[from] RouterError),

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Errors raised by the format and validator registries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("name is required")]
    NameRequired,
}
