//! Parameter model and request value extraction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ravelin_refs::pointer;
use ravelin_router::PathMatcher;
use ravelin_schema::{codes, generate, Issue, SchemaError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::coerce;
use crate::message::HttpRequest;
use crate::registry::Registry;

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Location {
    Path,
    Query,
    Header,
    FormData,
    Body,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::Header => "header",
            Location::FormData => "formData",
            Location::Body => "body",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(Location::Path),
            "query" => Ok(Location::Query),
            "header" => Ok(Location::Header),
            "formData" => Ok(Location::FormData),
            "body" => Ok(Location::Body),
            other => Err(format!("unknown parameter location: {other}")),
        }
    }
}

/// Keys of a non-body parameter object that describe the parameter rather
/// than its value.
const PARAMETER_ONLY_KEYS: &[&str] = &["name", "in", "required", "allowEmptyValue"];

/// The outcome of extracting one parameter from a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    /// The value as found in the request.
    pub raw: Option<Value>,
    /// The value after type conversion or defaulting.
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Issue>,
    pub valid: bool,
}

/// A parameter of an operation or path item.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    location: Location,
    required: bool,
    path: Vec<String>,
    definition: Value,
    schema: Value,
    matcher: Arc<PathMatcher>,
    registry: Arc<Registry>,
}

impl Parameter {
    /// Build from a resolved parameter object. Returns `None` when `name` or
    /// a known `in` is missing.
    pub(crate) fn from_definition(
        definition: &Value,
        path: Vec<String>,
        matcher: Arc<PathMatcher>,
        registry: Arc<Registry>,
    ) -> Option<Self> {
        let name = definition.get("name")?.as_str()?.to_string();
        let location: Location = definition.get("in")?.as_str()?.parse().ok()?;
        let required = location == Location::Path
            || definition
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);

        let schema = match location {
            Location::Body => definition
                .get("schema")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            _ => {
                let mut view = definition.as_object().cloned().unwrap_or_default();
                for key in PARAMETER_ONLY_KEYS {
                    view.remove(*key);
                }
                Value::Object(view)
            }
        };

        Some(Self {
            name,
            location,
            required,
            path,
            definition: definition.clone(),
            schema,
            matcher,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Path parameters are always required.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Location of the parameter object in the document.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn ptr(&self) -> String {
        pointer::to_ptr(&self.path)
    }

    /// The resolved parameter object.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// The schema describing the parameter value: the body schema, or the
    /// parameter object itself minus its naming keys.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn is_file(&self) -> bool {
        self.schema.get("type").and_then(Value::as_str) == Some("file")
    }

    /// A sample value satisfying the parameter schema.
    pub fn sample(&self) -> Result<Value, SchemaError> {
        generate(&self.schema, &self.registry.formats())
    }

    /// Extract, convert and validate this parameter's value from `req`.
    pub fn value(&self, req: &HttpRequest) -> ParameterValue {
        let raw = self.raw_value(req);

        if self.is_file() {
            let error = (raw.is_none() && self.required).then(|| self.required_issue());
            return ParameterValue {
                valid: error.is_none(),
                value: raw.clone(),
                raw,
                error,
            };
        }

        let value = match &raw {
            Some(raw) => Some(self.convert(raw, req)),
            None => self.usable_default(),
        };

        let error = match &value {
            None if self.required => Some(self.required_issue()),
            None => None,
            Some(value) => self.check(value),
        };

        ParameterValue {
            raw,
            value,
            valid: error.is_none(),
            error,
        }
    }

    fn raw_value(&self, req: &HttpRequest) -> Option<Value> {
        match self.location {
            Location::Path => {
                let url = req.target_url()?;
                self.matcher
                    .captures(url)?
                    .into_iter()
                    .find(|(key, _)| *key == self.name)
                    .map(|(_, value)| Value::String(value))
            }
            Location::Query => lookup_field(&req.query, &self.name),
            Location::Header => req.header(&self.name).map(|v| Value::String(v.to_string())),
            Location::FormData if self.is_file() => req.files.get(&self.name).cloned(),
            Location::FormData => lookup_field(&req.form_fields()?, &self.name),
            Location::Body => req
                .body
                .as_ref()
                .map(|body| body.raw_value(req.encoding.as_deref())),
        }
    }

    /// The schema `default`, unless it fails the schema itself. A broken
    /// default is a document problem reported by `Definition::validate`, so
    /// an absent value falls back to nothing instead of failing the request.
    fn usable_default(&self) -> Option<Value> {
        let default = self.schema.get("default")?;
        if let Some(issue) = self.check(default) {
            debug!(parameter = %self.ptr(), code = %issue.code, "ignoring invalid default");
            return None;
        }
        Some(default.clone())
    }

    fn convert(&self, raw: &Value, req: &HttpRequest) -> Value {
        match self.location {
            Location::Body => match &req.body {
                Some(body) => body.to_value(req.encoding.as_deref(), req.content_type()),
                None => raw.clone(),
            },
            _ => coerce(raw, &self.schema),
        }
    }

    fn check(&self, value: &Value) -> Option<Issue> {
        match ravelin_schema::validate(value, &self.schema, &self.registry.formats()) {
            Ok(issues) if issues.is_empty() => None,
            Ok(issues) => Some(
                Issue::new(
                    codes::SCHEMA_VALIDATION_FAILED,
                    "Value failed JSON Schema validation",
                    self.path.clone(),
                )
                .with_errors(issues)
                .failed_validation(),
            ),
            Err(err) => Some(
                Issue::new(codes::INVALID_SCHEMA, err.to_string(), self.path.clone())
                    .failed_validation(),
            ),
        }
    }

    fn required_issue(&self) -> Issue {
        Issue::new(
            codes::REQUIRED,
            "Value is required but was not provided",
            self.path.clone(),
        )
        .failed_validation()
    }
}

/// Look a field up by its literal name, then as a bracket path
/// (`filter[status]` finds `{"filter": {"status": ..}}`).
fn lookup_field(fields: &Map<String, Value>, name: &str) -> Option<Value> {
    if let Some(value) = fields.get(name) {
        return Some(value.clone());
    }

    let open = name.find('[')?;
    if !name.ends_with(']') {
        return None;
    }
    let mut current = fields.get(&name[..open])?;
    for key in name[open + 1..name.len() - 1].split("][") {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Body;
    use serde_json::json;

    fn parameter(definition: Value, template: &str) -> Parameter {
        let matcher = Arc::new(PathMatcher::compile("/v2", template).expect("template"));
        Parameter::from_definition(
            &definition,
            vec!["paths".into(), template.into(), "get".into(), "parameters".into(), "0".into()],
            matcher,
            Arc::new(Registry::default()),
        )
        .expect("parameter")
    }

    #[test]
    fn path_parameters_are_required_and_coerced() {
        let p = parameter(
            json!({"name": "petId", "in": "path", "type": "integer", "format": "int64"}),
            "/pet/{petId}",
        );
        assert!(p.required());
        let result = p.value(&HttpRequest::new("GET", "/v2/pet/42"));
        assert_eq!(result.raw, Some(json!("42")));
        assert_eq!(result.value, Some(json!(42)));
        assert!(result.valid);
    }

    #[test]
    fn missing_required_value() {
        let p = parameter(
            json!({"name": "status", "in": "query", "required": true, "type": "string"}),
            "/pet",
        );
        let result = p.value(&HttpRequest::new("GET", "/v2/pet"));
        assert!(!result.valid);
        let error = result.error.expect("error");
        assert_eq!(error.code, codes::REQUIRED);
        assert_eq!(error.message, "Value is required but was not provided");
        assert_eq!(error.path, p.path());
    }

    #[test]
    fn optional_missing_value_takes_default() {
        let p = parameter(
            json!({"name": "limit", "in": "query", "type": "integer", "default": 10}),
            "/pet",
        );
        let result = p.value(&HttpRequest::new("GET", "/v2/pet"));
        assert_eq!(result.raw, None);
        assert_eq!(result.value, Some(json!(10)));
        assert!(result.valid);

        let p = parameter(json!({"name": "q", "in": "query", "type": "string"}), "/pet");
        let result = p.value(&HttpRequest::new("GET", "/v2/pet"));
        assert_eq!(result.value, None);
        assert!(result.valid);
    }

    #[test]
    fn invalid_default_is_ignored_for_absent_values() {
        let p = parameter(
            json!({"name": "limit", "in": "query", "type": "integer", "maximum": 5, "default": 10}),
            "/pet",
        );
        let result = p.value(&HttpRequest::new("GET", "/v2/pet"));
        assert_eq!(result.value, None);
        assert!(result.valid);
        assert!(result.error.is_none());

        let p = parameter(
            json!({"name": "limit", "in": "query", "required": true, "type": "integer", "default": "ten"}),
            "/pet",
        );
        let result = p.value(&HttpRequest::new("GET", "/v2/pet"));
        assert_eq!(result.error.expect("error").code, codes::REQUIRED);

        let result = p.value(&HttpRequest::new("GET", "/v2/pet?limit=3"));
        assert_eq!(result.value, Some(json!(3)));
        assert!(result.valid);
    }

    #[test]
    fn invalid_value_wraps_schema_issues() {
        let p = parameter(
            json!({"name": "limit", "in": "query", "type": "integer", "maximum": 5}),
            "/pet",
        );
        let result = p.value(&HttpRequest::new("GET", "/v2/pet?limit=7"));
        let error = result.error.expect("error");
        assert_eq!(error.code, codes::SCHEMA_VALIDATION_FAILED);
        assert_eq!(error.message, "Value failed JSON Schema validation");
        assert!(error.failed_validation);
        assert_eq!(error.errors[0].code, codes::MAXIMUM);

        let result = p.value(&HttpRequest::new("GET", "/v2/pet?limit=abc"));
        assert_eq!(result.error.expect("error").errors[0].code, codes::INVALID_TYPE);
    }

    #[test]
    fn headers_are_found_case_insensitively() {
        let p = parameter(json!({"name": "X-Rate", "in": "header", "type": "number"}), "/pet");
        let req = HttpRequest::new("GET", "/v2/pet").with_header("x-rate", "1.5");
        assert_eq!(p.value(&req).value, Some(json!(1.5)));
    }

    #[test]
    fn bracket_query_names() {
        let p = parameter(json!({"name": "filter[status]", "in": "query", "type": "string"}), "/pet");
        let req = HttpRequest::new("GET", "/v2/pet?filter[status]=sold");
        assert_eq!(p.value(&req).value, Some(json!("sold")));

        let literal = HttpRequest::new("GET", "/v2/pet")
            .with_query(json!({"filter[status]": "pending"}).as_object().cloned().unwrap_or_default());
        assert_eq!(p.value(&literal).value, Some(json!("pending")));
    }

    #[test]
    fn multi_collection_from_repeated_keys() {
        let p = parameter(
            json!({
                "name": "status", "in": "query", "type": "array",
                "items": {"type": "string", "enum": ["available", "sold"]},
                "collectionFormat": "multi"
            }),
            "/pet",
        );
        let ok = p.value(&HttpRequest::new("GET", "/v2/pet?status=available&status=sold"));
        assert_eq!(ok.value, Some(json!(["available", "sold"])));
        assert!(ok.valid);

        let single = p.value(&HttpRequest::new("GET", "/v2/pet?status=sold"));
        assert_eq!(single.value, Some(json!(["sold"])));

        let bad = p.value(&HttpRequest::new("GET", "/v2/pet?status=gone"));
        assert!(!bad.valid);
    }

    #[test]
    fn body_parameters() {
        let p = parameter(
            json!({
                "name": "body", "in": "body", "required": true,
                "schema": {"type": "object", "required": ["name"], "properties": {"name": {"type": "string"}}}
            }),
            "/pet",
        );
        let json_body = HttpRequest::new("POST", "/v2/pet").with_json(json!({"name": "doggie"}));
        let result = p.value(&json_body);
        assert_eq!(result.raw, result.value);
        assert!(result.valid);

        let text_body = HttpRequest::new("POST", "/v2/pet")
            .with_header("Content-Type", "application/json")
            .with_body(Body::Text("{}".to_string()));
        let result = p.value(&text_body);
        assert_eq!(result.raw, Some(json!("{}")));
        assert_eq!(result.value, Some(json!({})));
        let error = result.error.expect("error");
        assert_eq!(error.errors[0].code, codes::OBJECT_MISSING_REQUIRED_PROPERTY);
    }

    #[test]
    fn file_parameters_skip_validation() {
        let p = parameter(
            json!({"name": "file", "in": "formData", "type": "file", "required": true}),
            "/pet/{petId}/uploadImage",
        );
        let file = json!({"originalname": "dog.png", "size": 12});
        let req = HttpRequest::new("POST", "/v2/pet/1/uploadImage").with_file("file", file.clone());
        let result = p.value(&req);
        assert_eq!(result.raw, Some(file.clone()));
        assert_eq!(result.value, Some(file));
        assert!(result.valid);

        let missing = p.value(&HttpRequest::new("POST", "/v2/pet/1/uploadImage"));
        assert_eq!(missing.error.expect("error").code, codes::REQUIRED);
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        let matcher = Arc::new(PathMatcher::compile("", "/pet").expect("template"));
        let registry = Arc::new(Registry::default());
        assert!(Parameter::from_definition(&json!({"in": "query"}), vec![], matcher.clone(), registry.clone()).is_none());
        assert!(Parameter::from_definition(&json!({"name": "a", "in": "cookie"}), vec![], matcher, registry).is_none());
    }
}
