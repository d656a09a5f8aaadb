use thiserror::Error;

/// Errors raised by schema compilation and sample generation.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// The schema itself is not a valid draft-04 schema.
    #[error("invalid schema: {0}")]
    Compile(String),

    /// Sample generation hit a format with no generator.
    #[error("unknown registry key \"{0}\"")]
    UnknownRegistryKey(String),
}
