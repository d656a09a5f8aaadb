//! Document validation.
//!
//! Runs in phases: reference problems, then structural validation against
//! the Swagger 2.0 schema, then semantic checks (only when nothing has
//! failed so far), then registered validators. Repeated findings are
//! reported once.

mod paths;
mod references;
mod schemas;
mod security;
mod structure;
mod unused;

use ravelin_schema::ValidationResults;
use tracing::debug;

use crate::definition::Definition;

pub(crate) fn validate_definition(definition: &Definition) -> ValidationResults {
    let mut results = ValidationResults::new();

    references::check(definition, &mut results);
    structure::check(definition, &mut results);

    if !results.has_errors() {
        schemas::check(definition, &mut results);
        paths::check(definition, &mut results);
        security::check(definition, &mut results);
        unused::check(definition, &mut results);
    }

    for validator in definition.custom_validators() {
        results.extend(validator(definition));
    }

    results.dedup();
    debug!(
        errors = results.errors.len(),
        warnings = results.warnings.len(),
        "validated definition"
    );
    results
}
