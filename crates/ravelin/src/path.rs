//! Path item model.

use std::sync::Arc;

use ravelin_refs::pointer;
use ravelin_router::PathMatcher;
use serde_json::Value;

use crate::operation::Operation;
use crate::parameter::Parameter;

/// A path template and the operations declared under it.
#[derive(Debug, Clone)]
pub struct Path {
    pub(crate) template: String,
    pub(crate) path: Vec<String>,
    pub(crate) definition: Value,
    pub(crate) matcher: Arc<PathMatcher>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) operations: Vec<Operation>,
}

impl Path {
    /// The template as written, e.g. `/pet/{petId}`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Location of the path item in the document.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn ptr(&self) -> String {
        pointer::to_ptr(&self.path)
    }

    /// The resolved path item object.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Matches concrete URLs (base path included) against the template.
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Parameter names in template order.
    pub fn keys(&self) -> &[String] {
        self.matcher.keys()
    }

    /// Path-level parameters only.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// The operation for an HTTP method (case-insensitive) or an
    /// operationId.
    pub fn operation(&self, method_or_id: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.method().eq_ignore_ascii_case(method_or_id))
            .or_else(|| {
                self.operations
                    .iter()
                    .find(|op| op.operation_id() == Some(method_or_id))
            })
    }

    pub fn operations_by_tag(&self, tag: &str) -> Vec<&Operation> {
        self.operations
            .iter()
            .filter(|op| op.tags().contains(&tag))
            .collect()
    }
}
