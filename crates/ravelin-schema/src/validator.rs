//! Draft-04 schema validation producing [`Issue`]s.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError};
use ravelin_refs::pointer;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::formats::FormatRegistry;
use crate::issue::{codes, Issue};

/// A compiled schema that keeps its source for issue decoration.
pub struct CompiledSchema {
    validator: jsonschema::Validator,
    schema: Value,
}

impl CompiledSchema {
    /// Compile `schema` with format assertions and the registry's formats.
    pub fn compile(schema: &Value, formats: &FormatRegistry) -> Result<Self, SchemaError> {
        let schema = sanitize(schema);
        let mut options = jsonschema::options();
        options
            .with_draft(Draft::Draft4)
            .should_validate_formats(true);
        for (name, check) in formats.validators() {
            options.with_format(name, move |value: &str| check(value));
        }
        let validator = options.build(&schema).map_err(|e| {
            debug!(error = %e, "schema failed to compile");
            SchemaError::Compile(e.to_string())
        })?;
        Ok(Self { validator, schema })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }

    /// Every violation, in evaluation order.
    pub fn validate(&self, value: &Value) -> Vec<Issue> {
        self.validator
            .iter_errors(value)
            .map(|error| to_issue(&error, value, &self.schema))
            .collect()
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Validate `value` against `schema` in one step.
pub fn validate(
    value: &Value,
    schema: &Value,
    formats: &FormatRegistry,
) -> Result<Vec<Issue>, SchemaError> {
    Ok(CompiledSchema::compile(schema, formats)?.validate(value))
}

/// JSON type name of a value, distinguishing integers from other numbers.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Drop OpenAPI-only constructs that draft-04 rejects: `type: file` is
/// treated as unconstrained.
fn sanitize(schema: &Value) -> Value {
    sanitize_node(schema, false)
}

/// `named` is set for maps keyed by property or definition names, whose keys
/// are never keywords.
fn sanitize_node(schema: &Value, named: bool) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                if named {
                    out.insert(key.clone(), sanitize_node(value, false));
                    continue;
                }
                if key == "type" && value.as_str() == Some("file") {
                    continue;
                }
                let value = match key.as_str() {
                    "default" | "example" | "enum" => value.clone(),
                    "properties" | "patternProperties" | "definitions" => sanitize_node(value, true),
                    _ => sanitize_node(value, false),
                };
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| sanitize_node(v, false)).collect()),
        other => other.clone(),
    }
}

/// Follow a schema path, jumping through local `$ref`s along the way.
fn schema_node<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        if segment == "$ref" {
            let target = current.get("$ref")?.as_str()?;
            let target_path = pointer::to_path(target).ok()?;
            current = pointer::get(root, &target_path)?;
            continue;
        }
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_issue(error: &ValidationError<'_>, instance_root: &Value, schema_root: &Value) -> Issue {
    let instance_path = pointer::to_path(&error.instance_path.to_string()).unwrap_or_default();
    let schema_path = pointer::to_path(&error.schema_path.to_string()).unwrap_or_default();
    let keyword = schema_path.last().cloned().unwrap_or_default();
    let node = schema_path
        .split_last()
        .and_then(|(_, parent)| schema_node(schema_root, parent));
    let instance = pointer::get(instance_root, &instance_path)
        .cloned()
        .unwrap_or(Value::Null);
    let keyword_value = node.and_then(|n| n.get(&keyword)).cloned();

    let (code, message, params) = describe(error, &keyword, node, keyword_value, &instance);
    let mut issue = Issue::new(code, message, instance_path).with_params(params);

    if let Some(node) = node {
        issue.description = node.get("description").and_then(Value::as_str).map(String::from);
        issue.title = node.get("title").and_then(Value::as_str).map(String::from);
        issue.schema_id = node.get("id").and_then(Value::as_str).map(String::from);
    }
    issue
}

fn describe(
    error: &ValidationError<'_>,
    keyword: &str,
    node: Option<&Value>,
    keyword_value: Option<Value>,
    instance: &Value,
) -> (&'static str, String, Vec<Value>) {
    let flag = |name: &str| node.and_then(|n| n.get(name)).and_then(Value::as_bool) == Some(true);
    let limit = keyword_value.clone().unwrap_or(Value::Null);
    let length = |v: &Value| -> usize {
        match v {
            Value::String(s) => s.chars().count(),
            Value::Array(a) => a.len(),
            Value::Object(o) => o.len(),
            _ => 0,
        }
    };

    match keyword {
        "type" => {
            let expected = match &limit {
                Value::Array(types) => types.iter().map(display).collect::<Vec<_>>().join(","),
                other => display(other),
            };
            let actual = json_type(instance);
            (
                codes::INVALID_TYPE,
                format!("Expected type {expected} but found type {actual}"),
                vec![Value::String(expected), Value::String(actual.to_string())],
            )
        }
        "required" => {
            let property = match &error.kind {
                ValidationErrorKind::Required { property } => display(property),
                _ => String::new(),
            };
            (
                codes::OBJECT_MISSING_REQUIRED_PROPERTY,
                format!("Missing required property: {property}"),
                vec![Value::String(property)],
            )
        }
        "format" => {
            let format = display(&limit);
            (
                codes::INVALID_FORMAT,
                format!("Object didn't pass validation for format {format}: {}", display(instance)),
                vec![Value::String(format), instance.clone()],
            )
        }
        "enum" => (
            codes::ENUM_MISMATCH,
            format!("No enum match for: {instance}"),
            vec![instance.clone()],
        ),
        "minLength" => (
            codes::MIN_LENGTH,
            format!("String is too short ({} chars), minimum {limit}", length(instance)),
            vec![length(instance).into(), limit],
        ),
        "maxLength" => (
            codes::MAX_LENGTH,
            format!("String is too long ({} chars), maximum {limit}", length(instance)),
            vec![length(instance).into(), limit],
        ),
        "minimum" | "exclusiveMinimum" => {
            let limit = node.and_then(|n| n.get("minimum")).cloned().unwrap_or(limit);
            if flag("exclusiveMinimum") {
                (
                    codes::MINIMUM_EXCLUSIVE,
                    format!("Value {instance} is equal or less than exclusive minimum {limit}"),
                    vec![instance.clone(), limit],
                )
            } else {
                (
                    codes::MINIMUM,
                    format!("Value {instance} is less than minimum {limit}"),
                    vec![instance.clone(), limit],
                )
            }
        }
        "maximum" | "exclusiveMaximum" => {
            let limit = node.and_then(|n| n.get("maximum")).cloned().unwrap_or(limit);
            if flag("exclusiveMaximum") {
                (
                    codes::MAXIMUM_EXCLUSIVE,
                    format!("Value {instance} is equal or greater than exclusive maximum {limit}"),
                    vec![instance.clone(), limit],
                )
            } else {
                (
                    codes::MAXIMUM,
                    format!("Value {instance} is greater than maximum {limit}"),
                    vec![instance.clone(), limit],
                )
            }
        }
        "multipleOf" => (
            codes::MULTIPLE_OF,
            format!("Value {instance} is not a multiple of {limit}"),
            vec![instance.clone(), limit],
        ),
        "pattern" => (
            codes::PATTERN,
            format!("String does not match pattern {}: {}", display(&limit), display(instance)),
            vec![limit, instance.clone()],
        ),
        "minItems" => (
            codes::ARRAY_LENGTH_SHORT,
            format!("Array is too short ({}), minimum {limit}", length(instance)),
            vec![length(instance).into(), limit],
        ),
        "maxItems" => (
            codes::ARRAY_LENGTH_LONG,
            format!("Array is too long ({}), maximum {limit}", length(instance)),
            vec![length(instance).into(), limit],
        ),
        "uniqueItems" => (codes::ARRAY_UNIQUE, "Array items are not unique".to_string(), vec![]),
        "additionalItems" => (
            codes::ARRAY_ADDITIONAL_ITEMS,
            "Additional items not allowed".to_string(),
            vec![],
        ),
        "minProperties" => (
            codes::OBJECT_PROPERTIES_MINIMUM,
            format!("Too few properties defined ({}), minimum {limit}", length(instance)),
            vec![length(instance).into(), limit],
        ),
        "maxProperties" => (
            codes::OBJECT_PROPERTIES_MAXIMUM,
            format!("Too many properties defined ({}), maximum {limit}", length(instance)),
            vec![length(instance).into(), limit],
        ),
        "additionalProperties" => {
            let unexpected = unexpected_properties(node, instance).join(", ");
            (
                codes::OBJECT_ADDITIONAL_PROPERTIES,
                format!("Additional properties not allowed: {unexpected}"),
                vec![Value::String(unexpected)],
            )
        }
        "anyOf" => (
            codes::ANY_OF_MISSING,
            "Data does not match any schemas from 'anyOf'".to_string(),
            vec![],
        ),
        "oneOf" => match &error.kind {
            ValidationErrorKind::OneOfMultipleValid { .. } => (
                codes::ONE_OF_MULTIPLE,
                "Data is valid against more than one schema from 'oneOf'".to_string(),
                vec![],
            ),
            _ => (
                codes::ONE_OF_MISSING,
                "Data does not match any schemas from 'oneOf'".to_string(),
                vec![],
            ),
        },
        "not" => (codes::NOT_PASSED, "Data matches schema from 'not'".to_string(), vec![]),
        "dependencies" => (codes::OBJECT_DEPENDENCY_KEY, error.to_string(), vec![]),
        _ => (codes::SCHEMA_VALIDATION_FAILED, error.to_string(), vec![]),
    }
}

fn unexpected_properties(node: Option<&Value>, instance: &Value) -> Vec<String> {
    let Some(object) = instance.as_object() else {
        return Vec::new();
    };
    let declared = node.and_then(|n| n.get("properties")).and_then(Value::as_object);
    let patterns: Vec<regex_lite::Regex> = node
        .and_then(|n| n.get("patternProperties"))
        .and_then(Value::as_object)
        .map(|p| p.keys().filter_map(|k| regex_lite::Regex::new(k).ok()).collect())
        .unwrap_or_default();

    object
        .keys()
        .filter(|key| !declared.is_some_and(|d| d.contains_key(*key)))
        .filter(|key| !patterns.iter().any(|re| re.is_match(key)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(value: Value, schema: Value) -> Vec<Issue> {
        validate(&value, &schema, &FormatRegistry::new()).unwrap()
    }

    #[test]
    fn valid_value_yields_no_issues() {
        let issues = check(json!({"name": "doggie"}), json!({"type": "object", "required": ["name"]}));
        assert!(issues.is_empty());
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let issues = check(json!(123), json!({"type": "string"}));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::INVALID_TYPE);
        assert_eq!(issues[0].message, "Expected type string but found type integer");
        assert_eq!(issues[0].params, vec![json!("string"), json!("integer")]);
        assert!(issues[0].path.is_empty());
    }

    #[test]
    fn missing_required_property() {
        let issues = check(json!({}), json!({"type": "object", "required": ["name"]}));
        assert_eq!(issues[0].code, codes::OBJECT_MISSING_REQUIRED_PROPERTY);
        assert_eq!(issues[0].message, "Missing required property: name");
        assert_eq!(issues[0].params, vec![json!("name")]);
    }

    #[test]
    fn nested_paths_use_instance_location() {
        let schema = json!({
            "type": "object",
            "properties": {"tags": {"type": "array", "items": {"type": "string"}}}
        });
        let issues = check(json!({"tags": ["a", 1]}), schema);
        assert_eq!(issues[0].path, vec!["tags", "1"]);
    }

    #[test]
    fn maximum_includes_description() {
        let schema = json!({"type": "integer", "maximum": 5, "description": "calls per hour allowed by the user"});
        let issues = check(json!(1000), schema);
        assert_eq!(issues[0].code, codes::MAXIMUM);
        assert_eq!(issues[0].message, "Value 1000 is greater than maximum 5");
        assert_eq!(issues[0].params, vec![json!(1000), json!(5)]);
        assert_eq!(issues[0].description.as_deref(), Some("calls per hour allowed by the user"));
    }

    #[test]
    fn min_length_counts_characters() {
        let issues = check(json!("ñé"), json!({"type": "string", "minLength": 3}));
        assert_eq!(issues[0].code, codes::MIN_LENGTH);
        assert_eq!(issues[0].message, "String is too short (2 chars), minimum 3");
    }

    #[test]
    fn custom_format_is_asserted() {
        let mut formats = FormatRegistry::new();
        formats.register_format("alwaysFails", |_| false);
        let schema = json!({"type": "object", "properties": {"customFormat": {"type": "string", "format": "alwaysFails"}}});
        let issues = validate(&json!({"customFormat": "shouldFail"}), &schema, &formats).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::INVALID_FORMAT);
        assert_eq!(issues[0].params, vec![json!("alwaysFails"), json!("shouldFail")]);
        assert_eq!(issues[0].path, vec!["customFormat"]);
    }

    #[test]
    fn unknown_format_is_ignored() {
        let issues = check(json!("anything"), json!({"type": "string", "format": "alwaysFails"}));
        assert!(issues.is_empty());
    }

    #[test]
    fn file_type_is_unconstrained() {
        let issues = check(json!({"name": "upload.png"}), json!({"type": "file"}));
        assert!(issues.is_empty());
    }

    #[test]
    fn enum_mismatch() {
        let issues = check(json!("lost"), json!({"type": "string", "enum": ["available", "sold"]}));
        assert_eq!(issues[0].code, codes::ENUM_MISMATCH);
    }

    #[test]
    fn additional_properties_are_listed() {
        let schema = json!({"type": "object", "properties": {"a": {}}, "additionalProperties": false});
        let issues = check(json!({"a": 1, "b": 2}), schema);
        assert_eq!(issues[0].code, codes::OBJECT_ADDITIONAL_PROPERTIES);
        assert_eq!(issues[0].message, "Additional properties not allowed: b");
    }

    #[test]
    fn invalid_schema_fails_to_compile() {
        let err = validate(&json!(1), &json!({"type": "wat"}), &FormatRegistry::new()).unwrap_err();
        assert!(matches!(err, SchemaError::Compile(_)));
    }

    #[test]
    fn schema_node_follows_refs() {
        let root = json!({"definitions": {"info": {"title": "Info"}}, "properties": {"info": {"$ref": "#/definitions/info"}}});
        let path: Vec<String> = ["properties", "info", "$ref"].iter().map(|s| s.to_string()).collect();
        assert_eq!(schema_node(&root, &path), Some(&json!({"title": "Info"})));
    }
}
