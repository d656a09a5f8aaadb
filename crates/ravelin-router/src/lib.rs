//! Swagger path template matching.
//!
//! Compiles `paths` templates into anchored patterns and resolves concrete
//! URLs to exactly one template, preferring literal segments over
//! parameters from left to right.

pub mod error;
pub mod matcher;
pub mod router;

pub use error::RouterError;
pub use matcher::{Part, PathMatcher, Segment};
pub use router::{RouteMatch, Router};
