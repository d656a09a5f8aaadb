//! Response model and response validation.

use std::sync::Arc;

use ravelin_refs::pointer;
use ravelin_schema::{codes, generate, Issue, SchemaError, ValidationResults};
use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::coerce;
use crate::media;
use crate::message::HttpResponse;
use crate::registry::Registry;

/// Status codes whose responses never carry a body.
const BODILESS_STATUS: &[u16] = &[204, 304];

/// A declared response of an operation.
#[derive(Debug, Clone)]
pub struct Response {
    status_code: String,
    path: Vec<String>,
    definition: Value,
    produces: Vec<String>,
    registry: Arc<Registry>,
}

impl Response {
    pub(crate) fn new(
        status_code: String,
        path: Vec<String>,
        definition: Value,
        produces: Vec<String>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            status_code,
            path,
            definition,
            produces,
            registry,
        }
    }

    /// The status code key, `default` included.
    pub fn status_code(&self) -> &str {
        &self.status_code
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn ptr(&self) -> String {
        pointer::to_ptr(&self.path)
    }

    /// The resolved response object.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    pub fn schema(&self) -> Option<&Value> {
        self.definition.get("schema")
    }

    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.definition.get("headers").and_then(Value::as_object)
    }

    pub fn examples(&self) -> Option<&Map<String, Value>> {
        self.definition.get("examples").and_then(Value::as_object)
    }

    /// Media types the owning operation produces.
    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    /// True when the response declares no schema.
    pub fn is_void(&self) -> bool {
        self.schema().is_none()
    }

    /// The example for `media_type`, rendered as text. JSON media types are
    /// pretty-printed with two-space indentation and YAML media types are
    /// dumped as YAML; string examples are returned verbatim.
    pub fn example(&self, media_type: &str) -> Option<String> {
        let example = self.examples()?.get(media_type)?;
        if let Value::String(text) = example {
            return Some(text.clone());
        }

        if media::is_yaml(media_type) {
            match serde_yaml::to_string(example) {
                Ok(text) => return Some(text),
                Err(err) => debug!(media_type, error = %err, "falling back to JSON example"),
            }
        }
        serde_json::to_string_pretty(example).ok()
    }

    /// A sample body for the response schema. `None` for void responses.
    pub fn sample(&self) -> Result<Option<Value>, SchemaError> {
        self.schema()
            .map(|schema| generate(schema, &self.registry.formats()))
            .transpose()
    }

    /// Validate `res` against this response: content type, declared headers
    /// and body.
    pub fn validate_response(&self, res: &HttpResponse) -> ValidationResults {
        let mut results = ValidationResults::new();

        let negotiated = self.check_content_type(res, &mut results);
        self.check_headers(res, &mut results);
        if negotiated {
            self.check_body(res, &mut results);
        }

        results
    }

    /// Returns false when the body should not be validated.
    fn check_content_type(&self, res: &HttpResponse, results: &mut ValidationResults) -> bool {
        let bodiless = res
            .status_code
            .is_some_and(|status| BODILESS_STATUS.contains(&status));
        if self.is_void() || bodiless || res.body.is_none() || self.produces.is_empty() {
            return true;
        }

        let content_type = res.content_type().unwrap_or(media::OCTET_STREAM);
        if media::is_supported(content_type, &self.produces) {
            return true;
        }

        results.error(Issue::new(
            codes::INVALID_CONTENT_TYPE,
            format!(
                "Invalid Content-Type ({content_type}).  These are supported: {}",
                self.produces.join(", ")
            ),
            Vec::new(),
        ));
        false
    }

    fn check_headers(&self, res: &HttpResponse, results: &mut ValidationResults) {
        let Some(headers) = self.headers() else {
            return;
        };
        let formats = self.registry.formats();

        for (name, schema) in headers {
            let Some(raw) = res.header(name) else {
                continue;
            };
            let value = coerce(&Value::String(raw.to_string()), schema);
            let issue = match ravelin_schema::validate(&value, schema, &formats) {
                Ok(issues) if issues.is_empty() => continue,
                Ok(issues) => Issue::new(
                    codes::INVALID_RESPONSE_HEADER,
                    format!("Invalid header ({name}): {}", issues[0].message),
                    Vec::new(),
                )
                .with_errors(issues),
                Err(err) => Issue::new(
                    codes::INVALID_RESPONSE_HEADER,
                    format!("Invalid header ({name}): {err}"),
                    Vec::new(),
                ),
            };
            results.error(issue.with_name(name.clone()));
        }
    }

    fn check_body(&self, res: &HttpResponse, results: &mut ValidationResults) {
        let Some(schema) = self.schema() else {
            return;
        };
        if schema.get("type").and_then(Value::as_str) == Some("file") {
            return;
        }

        let issues = match &res.body {
            None => match schema.get("type").and_then(Value::as_str) {
                Some(expected) => vec![Issue::new(
                    codes::INVALID_TYPE,
                    format!("Expected type {expected} but found type undefined"),
                    Vec::new(),
                )
                .with_params(vec![Value::from(expected), Value::from("undefined")])],
                None => Vec::new(),
            },
            Some(body) => {
                let value = body.to_value(res.encoding.as_deref(), res.content_type());
                match ravelin_schema::validate(&value, schema, &self.registry.formats()) {
                    Ok(issues) => issues,
                    Err(err) => vec![Issue::new(codes::INVALID_SCHEMA, err.to_string(), Vec::new())],
                }
            }
        };

        if issues.is_empty() {
            return;
        }
        let message = match issues.as_slice() {
            [only] => format!("Invalid body: {}", only.message),
            _ => "Invalid body: Value failed JSON Schema validation".to_string(),
        };
        results.error(
            Issue::new(codes::INVALID_RESPONSE_BODY, message, Vec::new()).with_errors(issues),
        );
    }
}
