use ravelin_refs::ReferenceKind;
use ravelin_schema::{codes, Issue, ValidationResults};

use crate::definition::Definition;

pub(super) fn check(definition: &Definition, results: &mut ValidationResults) {
    for outcome in definition.references() {
        let mut ref_path = outcome.path.clone();
        ref_path.push("$ref".to_string());

        if outcome.kind == ReferenceKind::Invalid {
            let message = outcome
                .error
                .clone()
                .unwrap_or_else(|| format!("Invalid JSON Reference: {}", outcome.uri));
            results.error(Issue::new(codes::INVALID_REFERENCE, message, ref_path));
        } else if outcome.missing {
            let mut issue = Issue::new(
                codes::UNRESOLVABLE_REFERENCE,
                format!("Reference could not be resolved: {}", outcome.uri),
                ref_path,
            );
            if let Some(error) = &outcome.error {
                issue = issue.with_error(error.clone());
            }
            results.error(issue);
        }

        if !outcome.extra.is_empty() {
            results.warning(Issue::new(
                codes::EXTRA_REFERENCE_PROPERTIES,
                format!(
                    "Extra JSON Reference properties will be ignored: {}",
                    outcome.extra.join(", ")
                ),
                outcome.path.clone(),
            ));
        }
    }
}
