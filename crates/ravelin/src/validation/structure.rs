//! Structural validation against the Swagger 2.0 JSON Schema.

use std::sync::OnceLock;

use ravelin_schema::{codes, CompiledSchema, FormatRegistry, Issue, SchemaError, ValidationResults};
use serde_json::Value;

use crate::definition::Definition;

const SWAGGER_SCHEMA: &str = include_str!("../../schemas/swagger-2.0.json");

fn swagger_schema() -> &'static Result<CompiledSchema, SchemaError> {
    static COMPILED: OnceLock<Result<CompiledSchema, SchemaError>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        let schema: Value = serde_json::from_str(SWAGGER_SCHEMA)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        CompiledSchema::compile(&schema, &FormatRegistry::default())
    })
}

pub(super) fn check(definition: &Definition, results: &mut ValidationResults) {
    let schema = match swagger_schema() {
        Ok(schema) => schema,
        Err(err) => {
            results.error(Issue::new(codes::INVALID_SCHEMA, err.to_string(), Vec::new()));
            return;
        }
    };

    for issue in schema.validate(definition.resolved()) {
        results.error(readable(issue));
    }
}

/// Replace "matches none of these shapes" failures on well-known objects
/// with a single message naming the object kind.
fn readable(issue: Issue) -> Issue {
    let alternatives = [codes::ONE_OF_MISSING, codes::ONE_OF_MULTIPLE, codes::ANY_OF_MISSING];
    if !alternatives.contains(&issue.code.as_str()) {
        return issue;
    }
    match object_kind(&issue.path) {
        Some(kind) => {
            let mut readable = Issue::new(
                &issue.code,
                format!("Not a valid {kind} definition"),
                issue.path,
            );
            readable.schema_id = issue.schema_id;
            readable.title = issue.title;
            readable
        }
        None => issue,
    }
}

fn object_kind(path: &[String]) -> Option<&'static str> {
    let last = path.last().map(String::as_str);
    let parent = path.len().checked_sub(2).map(|i| path[i].as_str());

    match (parent, last) {
        (Some("parameters"), _) => Some("parameter"),
        (Some("responses"), _) => Some("response"),
        (Some("securityDefinitions"), _) if path.len() == 2 => Some("securityDefinitions"),
        (Some("definitions"), _) if path.len() == 2 => Some("schema"),
        (_, Some("additionalProperties")) => Some("schema additionalProperties"),
        (_, Some("items")) | (Some("items"), _) => Some("schema items"),
        (_, Some("schema")) => Some("schema"),
        _ => None,
    }
}
