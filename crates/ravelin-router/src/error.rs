use thiserror::Error;

/// Errors produced while compiling a path template.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A `{` without a closing `}` (or the reverse).
    #[error("unbalanced braces in path template: {0}")]
    UnbalancedBraces(String),

    /// The generated pattern failed to compile.
    #[error("invalid path pattern for {template}: {message}")]
    Pattern { template: String, message: String },
}
