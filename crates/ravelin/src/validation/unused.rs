//! Warnings for reusable definitions nothing refers to.

use std::collections::HashSet;

use ravelin_refs::pointer;
use ravelin_schema::{codes, Issue, ValidationResults};
use serde_json::Value;

use crate::definition::Definition;

const REUSABLE_SECTIONS: &[&str] = &["definitions", "parameters", "responses"];

pub(super) fn check(definition: &Definition, results: &mut ValidationResults) {
    let targets: Vec<Vec<String>> = definition
        .references()
        .iter()
        .filter_map(|outcome| outcome.local_target())
        .collect();

    let document = definition.remotes_resolved();
    for section in REUSABLE_SECTIONS {
        let Some(entries) = document.get(*section).and_then(Value::as_object) else {
            continue;
        };
        for name in entries.keys() {
            let candidate = vec![(*section).to_string(), name.clone()];
            if !targets.iter().any(|target| pointer::is_prefix(&candidate, target)) {
                results.warning(unused(candidate));
            }
        }
    }

    check_security(definition, results);
}

fn check_security(definition: &Definition, results: &mut ValidationResults) {
    let resolved = definition.resolved();
    let Some(declared) = resolved.get("securityDefinitions").and_then(Value::as_object) else {
        return;
    };

    let mut names: HashSet<&str> = HashSet::new();
    let mut scopes: HashSet<(&str, &str)> = HashSet::new();
    let requirement_lists = std::iter::once(resolved.get("security"))
        .chain(definition.operations().into_iter().map(|op| op.definition().get("security")))
        .flatten()
        .filter_map(Value::as_array);
    for requirements in requirement_lists {
        for (name, required_scopes) in requirements.iter().filter_map(Value::as_object).flatten() {
            let name = name.as_str();
            names.insert(name);
            for scope in required_scopes.as_array().into_iter().flatten().filter_map(Value::as_str) {
                scopes.insert((name, scope));
            }
        }
    }

    for (name, security_definition) in declared {
        let location = vec!["securityDefinitions".to_string(), name.clone()];
        if !names.contains(name.as_str()) {
            results.warning(unused(location));
            continue;
        }
        let Some(declared_scopes) = security_definition.get("scopes").and_then(Value::as_object) else {
            continue;
        };
        for scope in declared_scopes.keys() {
            if !scopes.contains(&(name.as_str(), scope.as_str())) {
                let mut scope_location = location.clone();
                scope_location.extend(["scopes".to_string(), scope.clone()]);
                results.warning(unused(scope_location));
            }
        }
    }
}

fn unused(location: Vec<String>) -> Issue {
    Issue::new(
        codes::UNUSED_DEFINITION,
        format!("Definition is not used: {}", pointer::to_ptr(&location)),
        location,
    )
}
