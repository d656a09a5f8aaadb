use thiserror::Error;

/// Errors produced while loading documents or resolving references.
#[derive(Debug, Error)]
pub enum RefError {
    /// A JSON Pointer did not start with `/` or `#/`.
    #[error("ptr must start with a / or #/")]
    InvalidPointer(String),

    /// A reference URI could not be parsed.
    #[error("{0}")]
    InvalidUri(String),

    /// The loader does not handle this URL scheme.
    #[error("unsupported reference location: {0}")]
    UnsupportedLocation(String),

    /// A referenced document could not be read.
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// A referenced document could not be parsed.
    #[error("failed to parse {location}: {message}")]
    Parse { location: String, message: String },

    /// The document root handed to the resolver is not an object.
    #[error("document root must be an object")]
    NotAnObject,
}
