use ravelin_schema::{codes, Issue, ValidationResults};
use serde_json::{Map, Value};

use crate::definition::Definition;

/// Every security requirement must name a declared security definition and
/// only scopes that definition declares.
pub(super) fn check(definition: &Definition, results: &mut ValidationResults) {
    let resolved = definition.resolved();
    let empty = Map::new();
    let declared = resolved
        .get("securityDefinitions")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(requirements) = resolved.get("security") {
        check_requirements(requirements, vec!["security".to_string()], declared, results);
    }
    for operation in definition.operations() {
        if let Some(requirements) = operation.definition().get("security") {
            let mut location = operation.path().to_vec();
            location.push("security".to_string());
            check_requirements(requirements, location, declared, results);
        }
    }
}

fn check_requirements(
    requirements: &Value,
    location: Vec<String>,
    declared: &Map<String, Value>,
    results: &mut ValidationResults,
) {
    let Some(requirements) = requirements.as_array() else {
        return;
    };

    for (index, requirement) in requirements.iter().enumerate() {
        let Some(requirement) = requirement.as_object() else {
            continue;
        };
        for (name, scopes) in requirement {
            let mut name_location = location.clone();
            name_location.extend([index.to_string(), name.clone()]);

            let Some(security_definition) = declared.get(name) else {
                results.error(Issue::new(
                    codes::UNRESOLVABLE_REFERENCE,
                    format!("Security definition could not be resolved: {name}"),
                    name_location,
                ));
                continue;
            };

            let known = security_definition.get("scopes").and_then(Value::as_object);
            for (scope_index, scope) in scopes.as_array().into_iter().flatten().enumerate() {
                let Some(scope) = scope.as_str() else {
                    continue;
                };
                if known.is_some_and(|known| known.contains_key(scope)) {
                    continue;
                }
                let mut scope_location = name_location.clone();
                scope_location.push(scope_index.to_string());
                results.error(Issue::new(
                    codes::UNRESOLVABLE_REFERENCE,
                    format!("Security scope definition could not be resolved: {scope}"),
                    scope_location,
                ));
            }
        }
    }
}
