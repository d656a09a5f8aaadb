//! Path template and operation parameter checks.

use std::collections::HashSet;

use ravelin_schema::{codes, Issue, ValidationResults};

use crate::definition::Definition;
use crate::parameter::Location;

pub(super) fn check(definition: &Definition, results: &mut ValidationResults) {
    let mut shapes = HashSet::new();
    let mut operation_ids = HashSet::new();

    for path in definition.paths() {
        let template = path.template();
        let keys = path.keys();

        if keys.iter().any(String::is_empty) {
            results.error(Issue::new(
                codes::EMPTY_PATH_PARAMETER_DECLARATION,
                format!("Path parameter declaration cannot be empty: {template}"),
                path.path().to_vec(),
            ));
        }

        if !shapes.insert(path.matcher().shape()) {
            results.error(Issue::new(
                codes::EQUIVALENT_PATH,
                format!("Equivalent path already exists: {template}"),
                path.path().to_vec(),
            ));
        }

        for operation in path.operations() {
            let mut seen: Vec<(&str, Location)> = Vec::new();
            let mut bodies = 0;
            let mut form_fields = 0;

            for parameter in operation.parameters() {
                let identity = (parameter.name(), parameter.location());
                if seen.contains(&identity) {
                    results.error(Issue::new(
                        codes::DUPLICATE_PARAMETER,
                        format!("Operation cannot have duplicate parameters: {}", parameter.ptr()),
                        parameter.path().to_vec(),
                    ));
                } else {
                    seen.push(identity);
                }

                match parameter.location() {
                    Location::Body => bodies += 1,
                    Location::FormData => form_fields += 1,
                    Location::Path if !keys.iter().any(|k| k == parameter.name()) => {
                        results.error(Issue::new(
                            codes::MISSING_PATH_PARAMETER_DECLARATION,
                            format!(
                                "Path parameter is defined but is not declared: {}",
                                parameter.name()
                            ),
                            parameter.path().to_vec(),
                        ));
                    }
                    _ => {}
                }
            }

            for key in keys.iter().filter(|k| !k.is_empty()) {
                let defined = operation
                    .parameters()
                    .iter()
                    .any(|p| p.location() == Location::Path && p.name() == key);
                if !defined {
                    results.error(Issue::new(
                        codes::MISSING_PATH_PARAMETER_DEFINITION,
                        format!("Path parameter is declared but is not defined: {key}"),
                        operation.path().to_vec(),
                    ));
                }
            }

            if bodies > 1 {
                results.error(Issue::new(
                    codes::MULTIPLE_BODY_PARAMETERS,
                    "Operation cannot have multiple body parameters",
                    operation.path().to_vec(),
                ));
            }
            if bodies > 0 && form_fields > 0 {
                results.error(Issue::new(
                    codes::INVALID_PARAMETER_COMBINATION,
                    "Operation cannot have a body parameter and a formData parameter",
                    operation.path().to_vec(),
                ));
            }

            if let Some(id) = operation.operation_id() {
                if !operation_ids.insert(id) {
                    let mut location = operation.path().to_vec();
                    location.push("operationId".to_string());
                    results.error(Issue::new(
                        codes::DUPLICATE_OPERATIONID,
                        format!("Cannot have multiple operations with the same operationId: {id}"),
                        location,
                    ));
                }
            }
        }
    }
}
