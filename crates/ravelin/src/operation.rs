//! Operation model.

use ravelin_refs::pointer;
use ravelin_schema::{codes, Issue, ValidationResults};
use serde_json::Value;
use tracing::debug;

use crate::message::{HttpRequest, HttpResponse};
use crate::parameter::{Location, Parameter};
use crate::response::Response;

/// An HTTP method handler declared on a path item.
#[derive(Debug, Clone)]
pub struct Operation {
    pub(crate) method: String,
    pub(crate) path_template: String,
    pub(crate) path: Vec<String>,
    pub(crate) definition: Value,
    pub(crate) consumes: Vec<String>,
    pub(crate) produces: Vec<String>,
    pub(crate) security: Vec<Value>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) responses: Vec<Response>,
}

impl Operation {
    /// Lowercase method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// Location of the operation object in the document.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn ptr(&self) -> String {
        pointer::to_ptr(&self.path)
    }

    /// The resolved operation object.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.definition.get("operationId").and_then(Value::as_str)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.definition
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Consumed media types: the operation's own, else the document's.
    pub fn consumes(&self) -> &[String] {
        &self.consumes
    }

    /// Produced media types: the operation's own, else the document's.
    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    /// Security requirements: the operation's own, else the document's.
    pub fn security(&self) -> &[Value] {
        &self.security
    }

    /// Effective parameters: the operation's own, then path-level ones it
    /// does not override (same name and location).
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// The parameter called `name`, optionally restricted to one location.
    pub fn parameter(&self, name: &str, location: Option<Location>) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name() == name && location.map_or(true, |l| p.location() == l))
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// The response for `status_code`, falling back to `default`. `None`
    /// asks for `default` directly.
    pub fn response(&self, status_code: Option<&str>) -> Option<&Response> {
        let exact = status_code.and_then(|code| {
            self.responses
                .iter()
                .find(|r| r.status_code() == code)
        });
        exact.or_else(|| self.responses.iter().find(|r| r.status_code() == "default"))
    }

    /// Validate every parameter of the operation against `req`.
    pub fn validate_request(&self, req: &HttpRequest) -> ValidationResults {
        let errors: Vec<Issue> = self
            .parameters
            .iter()
            .filter_map(|p| p.value(req).error)
            .collect();
        debug!(
            method = %self.method,
            path = %self.path_template,
            errors = errors.len(),
            "validated request"
        );
        ValidationResults::from_errors(errors)
    }

    /// Validate `res` against the response declared for its status code.
    pub fn validate_response(&self, res: &HttpResponse) -> ValidationResults {
        let code = res.status_code.map(|c| c.to_string());
        let Some(response) = self.response(code.as_deref()) else {
            let code = code.as_deref().unwrap_or("default");
            return ValidationResults::from_errors(vec![Issue::new(
                codes::INVALID_RESPONSE_CODE,
                format!(
                    "This operation does not have a defined '{code}' or 'default' response code"
                ),
                Vec::new(),
            )]);
        };

        let results = response.validate_response(res);
        debug!(
            method = %self.method,
            path = %self.path_template,
            status = response.status_code(),
            errors = results.errors.len(),
            "validated response"
        );
        results
    }
}
