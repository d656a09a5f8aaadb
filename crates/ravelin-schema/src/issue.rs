//! The issue shape shared by every validation result.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

/// Issue codes.
pub mod codes {
    pub const INVALID_TYPE: &str = "INVALID_TYPE";
    pub const INVALID_FORMAT: &str = "INVALID_FORMAT";
    pub const ENUM_MISMATCH: &str = "ENUM_MISMATCH";
    pub const MIN_LENGTH: &str = "MIN_LENGTH";
    pub const MAX_LENGTH: &str = "MAX_LENGTH";
    pub const MINIMUM: &str = "MINIMUM";
    pub const MINIMUM_EXCLUSIVE: &str = "MINIMUM_EXCLUSIVE";
    pub const MAXIMUM: &str = "MAXIMUM";
    pub const MAXIMUM_EXCLUSIVE: &str = "MAXIMUM_EXCLUSIVE";
    pub const MULTIPLE_OF: &str = "MULTIPLE_OF";
    pub const PATTERN: &str = "PATTERN";
    pub const ARRAY_LENGTH_SHORT: &str = "ARRAY_LENGTH_SHORT";
    pub const ARRAY_LENGTH_LONG: &str = "ARRAY_LENGTH_LONG";
    pub const ARRAY_UNIQUE: &str = "ARRAY_UNIQUE";
    pub const ARRAY_ADDITIONAL_ITEMS: &str = "ARRAY_ADDITIONAL_ITEMS";
    pub const OBJECT_PROPERTIES_MINIMUM: &str = "OBJECT_PROPERTIES_MINIMUM";
    pub const OBJECT_PROPERTIES_MAXIMUM: &str = "OBJECT_PROPERTIES_MAXIMUM";
    pub const OBJECT_MISSING_REQUIRED_PROPERTY: &str = "OBJECT_MISSING_REQUIRED_PROPERTY";
    pub const OBJECT_ADDITIONAL_PROPERTIES: &str = "OBJECT_ADDITIONAL_PROPERTIES";
    pub const OBJECT_DEPENDENCY_KEY: &str = "OBJECT_DEPENDENCY_KEY";
    pub const ANY_OF_MISSING: &str = "ANY_OF_MISSING";
    pub const ONE_OF_MISSING: &str = "ONE_OF_MISSING";
    pub const ONE_OF_MULTIPLE: &str = "ONE_OF_MULTIPLE";
    pub const NOT_PASSED: &str = "NOT_PASSED";

    pub const SCHEMA_VALIDATION_FAILED: &str = "SCHEMA_VALIDATION_FAILED";
    pub const INVALID_SCHEMA: &str = "INVALID_SCHEMA";
    pub const REQUIRED: &str = "REQUIRED";
    pub const INVALID_CONTENT_TYPE: &str = "INVALID_CONTENT_TYPE";
    pub const INVALID_RESPONSE_CODE: &str = "INVALID_RESPONSE_CODE";
    pub const INVALID_RESPONSE_HEADER: &str = "INVALID_RESPONSE_HEADER";
    pub const INVALID_RESPONSE_BODY: &str = "INVALID_RESPONSE_BODY";

    pub const INVALID_REFERENCE: &str = "INVALID_REFERENCE";
    pub const UNRESOLVABLE_REFERENCE: &str = "UNRESOLVABLE_REFERENCE";
    pub const EXTRA_REFERENCE_PROPERTIES: &str = "EXTRA_REFERENCE_PROPERTIES";
    pub const CIRCULAR_INHERITANCE: &str = "CIRCULAR_INHERITANCE";
    pub const OBJECT_MISSING_REQUIRED_PROPERTY_DEFINITION: &str =
        "OBJECT_MISSING_REQUIRED_PROPERTY_DEFINITION";
    pub const DUPLICATE_PARAMETER: &str = "DUPLICATE_PARAMETER";
    pub const MISSING_PATH_PARAMETER_DECLARATION: &str = "MISSING_PATH_PARAMETER_DECLARATION";
    pub const MISSING_PATH_PARAMETER_DEFINITION: &str = "MISSING_PATH_PARAMETER_DEFINITION";
    pub const EMPTY_PATH_PARAMETER_DECLARATION: &str = "EMPTY_PATH_PARAMETER_DECLARATION";
    pub const EQUIVALENT_PATH: &str = "EQUIVALENT_PATH";
    pub const DUPLICATE_OPERATIONID: &str = "DUPLICATE_OPERATIONID";
    pub const MULTIPLE_BODY_PARAMETERS: &str = "MULTIPLE_BODY_PARAMETERS";
    pub const INVALID_PARAMETER_COMBINATION: &str = "INVALID_PARAMETER_COMBINATION";
    pub const UNUSED_DEFINITION: &str = "UNUSED_DEFINITION";
}

/// One validation finding.
///
/// `path` is a sequence of keys from the root of whatever was validated: the
/// document for semantic checks, the value for schema checks.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: String,
    pub message: String,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lineage: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed_validation: bool,
}

impl Issue {
    pub fn new(code: &str, message: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path,
            ..Self::default()
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_errors(mut self, errors: Vec<Issue>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_lineage(mut self, lineage: Vec<String>) -> Self {
        self.lineage = lineage;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn failed_validation(mut self) -> Self {
        self.failed_validation = true;
        self
    }

    /// Re-root the issue path under `prefix`.
    pub fn prefixed(mut self, prefix: &[String]) -> Self {
        let mut path = prefix.to_vec();
        path.append(&mut self.path);
        self.path = path;
        self
    }
}

/// Errors and warnings from one validation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationResults {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_errors(errors: Vec<Issue>) -> Self {
        Self {
            errors,
            warnings: Vec::new(),
        }
    }

    /// No errors and no warnings.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error(&mut self, issue: Issue) {
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: Issue) {
        self.warnings.push(issue);
    }

    pub fn extend(&mut self, other: ValidationResults) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Drop repeated identical issues, keeping first occurrences.
    pub fn dedup(&mut self) {
        dedup_issues(&mut self.errors);
        dedup_issues(&mut self.warnings);
    }
}

/// Issues are keyed by their serialized form, which covers every field.
fn dedup_issues(issues: &mut Vec<Issue>) {
    let mut seen = HashSet::with_capacity(issues.len());
    issues.retain(|issue| match serde_json::to_string(issue) {
        Ok(key) => seen.insert(key),
        Err(_) => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_only_populated_fields() {
        let issue = Issue::new(codes::INVALID_TYPE, "Expected type string but found type integer", vec!["default".into()])
            .with_params(vec![json!("string"), json!("integer")]);
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            value,
            json!({
                "code": "INVALID_TYPE",
                "message": "Expected type string but found type integer",
                "path": ["default"],
                "params": ["string", "integer"]
            })
        );
    }

    #[test]
    fn serializes_camel_case_fields() {
        let issue = Issue::new(codes::SCHEMA_VALIDATION_FAILED, "Value failed JSON Schema validation", vec![])
            .failed_validation();
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["failedValidation"], json!(true));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let a = Issue::new(codes::DUPLICATE_PARAMETER, "dup", vec!["paths".into()]);
        let b = Issue::new(codes::EQUIVALENT_PATH, "eq", vec![]);
        let mut results = ValidationResults::from_errors(vec![a.clone(), b.clone(), a.clone()]);
        results.dedup();
        assert_eq!(results.errors, vec![a, b]);
    }

    #[test]
    fn dedup_distinguishes_nested_fields() {
        let plain = Issue::new(codes::SCHEMA_VALIDATION_FAILED, "failed", vec!["body".into()]);
        let nested = plain
            .clone()
            .with_errors(vec![Issue::new(codes::INVALID_TYPE, "x", vec![])]);
        let mut issues: Vec<Issue> = (0..5_000)
            .map(|i| Issue::new(codes::UNUSED_DEFINITION, "unused", vec![i.to_string()]))
            .collect();
        issues.extend([plain.clone(), nested.clone(), plain.clone(), nested.clone()]);
        issues.extend(issues.clone());

        let mut results = ValidationResults::from_errors(issues);
        results.dedup();
        assert_eq!(results.errors.len(), 5_002);
        assert_eq!(results.errors[5_000], plain);
        assert_eq!(results.errors[5_001], nested);
    }

    #[test]
    fn prefixed_prepends_location() {
        let issue = Issue::new(codes::INVALID_TYPE, "x", vec!["name".into()])
            .prefixed(&["definitions".to_string(), "Pet".to_string(), "default".to_string()]);
        assert_eq!(issue.path, vec!["definitions", "Pet", "default", "name"]);
    }
}
