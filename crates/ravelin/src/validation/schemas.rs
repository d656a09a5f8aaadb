//! Checks over every schema-like object in the document.
//!
//! Schemas are walked in `remotes_resolved`, where local references are
//! still in place, so every finding points at the location that declares
//! it. Inheritance cycles are found on a graph of `allOf` edges keyed by
//! pointer.

use std::collections::HashSet;

use ravelin_refs::{pointer, ref_uri};
use ravelin_schema::{codes, FormatRegistry, Issue, ValidationResults};
use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::{Definition, HTTP_METHODS};

/// Parameter object keys that are not schema keywords.
const PARAMETER_ONLY_KEYS: &[&str] = &["name", "in", "required", "allowEmptyValue"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    /// A full schema object.
    Schema,
    /// A non-body parameter, header or primitive `items` object.
    Primitive,
}

pub(super) fn check(definition: &Definition, results: &mut ValidationResults) {
    let document = definition.remotes_resolved();
    let mut walker = Walker {
        document,
        resolved: definition.resolved(),
        formats: definition.formats(),
        results,
        inheriting: Vec::new(),
    };

    for (path, site) in roots(document) {
        walker.visit(path, site);
    }

    let inheriting = std::mem::take(&mut walker.inheriting);
    for start in &inheriting {
        if let Some(lineage) = find_cycle(document, start) {
            walker.results.error(
                Issue::new(
                    codes::CIRCULAR_INHERITANCE,
                    format!("Schema object inherits from itself: {}", pointer::to_ptr(start)),
                    start.clone(),
                )
                .with_lineage(lineage.iter().map(|p| pointer::to_ptr(p)).collect()),
            );
        }
    }
}

struct Walker<'a> {
    document: &'a Value,
    resolved: &'a Value,
    formats: FormatRegistry,
    results: &'a mut ValidationResults,
    /// Schemas declaring `allOf`, in walk order.
    inheriting: Vec<Vec<String>>,
}

impl Walker<'_> {
    fn visit(&mut self, path: Vec<String>, site: Site) {
        let document = self.document;
        let Some(fields) = pointer::get(document, &path).and_then(Value::as_object) else {
            return;
        };
        if fields.contains_key("$ref") {
            return;
        }

        self.check_node(&path, fields, site);

        if site == Site::Schema {
            if fields.get("additionalProperties").is_some_and(Value::is_object) {
                self.visit(child(&path, &["additionalProperties"]), Site::Schema);
            }
            if let Some(members) = fields.get("allOf").and_then(Value::as_array) {
                for index in 0..members.len() {
                    self.visit(child(&path, &["allOf", index.to_string().as_str()]), Site::Schema);
                }
            }
        }

        match fields.get("items") {
            Some(Value::Object(_)) => self.visit(child(&path, &["items"]), site),
            Some(Value::Array(items)) if site == Site::Schema => {
                for index in 0..items.len() {
                    self.visit(child(&path, &["items", index.to_string().as_str()]), Site::Schema);
                }
            }
            _ => {}
        }

        if site == Site::Schema {
            if let Some(properties) = fields.get("properties").and_then(Value::as_object) {
                for name in properties.keys() {
                    self.visit(child(&path, &["properties", name.as_str()]), Site::Schema);
                }
            }
        }
    }

    fn check_node(&mut self, path: &[String], fields: &Map<String, Value>, site: Site) {
        if fields.get("type").and_then(Value::as_str) == Some("array")
            && !fields.contains_key("items")
        {
            self.results.error(
                Issue::new(
                    codes::OBJECT_MISSING_REQUIRED_PROPERTY,
                    "Missing required property: items",
                    path.to_vec(),
                )
                .with_params(vec![Value::from("items")]),
            );
        }

        if site == Site::Schema {
            if fields.contains_key("allOf") {
                self.inheriting.push(path.to_vec());
            }
            self.check_required(path, fields);
        }

        if let Some(default) = fields.get("default") {
            self.check_default(path, default, site);
        }
    }

    fn check_required(&mut self, path: &[String], fields: &Map<String, Value>) {
        let Some(required) = fields.get("required").and_then(Value::as_array) else {
            return;
        };
        if matches!(
            fields.get("additionalProperties"),
            Some(Value::Object(_)) | Some(Value::Bool(true))
        ) {
            return;
        }

        let mut defined = HashSet::new();
        if let Some(node) = pointer::get(self.resolved, path) {
            collect_properties(node, &mut defined);
        }

        for name in required.iter().filter_map(Value::as_str) {
            if !defined.contains(name) {
                self.results.error(
                    Issue::new(
                        codes::OBJECT_MISSING_REQUIRED_PROPERTY_DEFINITION,
                        format!("Missing required property definition: {name}"),
                        path.to_vec(),
                    )
                    .with_params(vec![Value::from(name)]),
                );
            }
        }
    }

    /// A declared default must satisfy the fully resolved schema it sits in.
    fn check_default(&mut self, path: &[String], default: &Value, site: Site) {
        let Some(schema) = pointer::get(self.resolved, path) else {
            return;
        };
        let schema = match (site, schema) {
            (Site::Primitive, Value::Object(fields)) => {
                let mut view = fields.clone();
                for key in PARAMETER_ONLY_KEYS {
                    view.remove(*key);
                }
                Value::Object(view)
            }
            _ => schema.clone(),
        };

        match ravelin_schema::validate(default, &schema, &self.formats) {
            Ok(issues) => {
                let prefix = child(path, &["default"]);
                for issue in issues {
                    self.results.error(issue.prefixed(&prefix));
                }
            }
            Err(err) => debug!(
                schema = %pointer::to_ptr(path),
                error = %err,
                "skipping default check for uncompilable schema"
            ),
        }
    }
}

/// Property names declared directly or through `allOf`.
fn collect_properties<'a>(node: &'a Value, names: &mut HashSet<&'a str>) {
    if let Some(properties) = node.get("properties").and_then(Value::as_object) {
        names.extend(properties.keys().map(String::as_str));
    }
    if let Some(members) = node.get("allOf").and_then(Value::as_array) {
        for member in members {
            collect_properties(member, names);
        }
    }
}

/// Where schema walks start: definitions, reusable parameters and
/// responses, then every path item and operation.
fn roots(document: &Value) -> Vec<(Vec<String>, Site)> {
    let mut roots = Vec::new();

    for name in keys(document, "definitions") {
        roots.push((vec!["definitions".to_string(), name], Site::Schema));
    }
    for name in keys(document, "parameters") {
        parameter_roots(document, vec!["parameters".to_string(), name], &mut roots);
    }
    for name in keys(document, "responses") {
        response_roots(document, vec!["responses".to_string(), name], &mut roots);
    }

    for template in keys(document, "paths") {
        if template.starts_with("x-") {
            continue;
        }
        let item_path = vec!["paths".to_string(), template];
        list_roots(document, &item_path, &mut roots);
        for method in HTTP_METHODS {
            let op_path = child(&item_path, &[*method]);
            if pointer::get(document, &op_path).is_none() {
                continue;
            }
            list_roots(document, &op_path, &mut roots);
            let responses_path = child(&op_path, &["responses"]);
            let codes = pointer::get(document, &responses_path)
                .and_then(Value::as_object)
                .map(|r| r.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            for code in codes.into_iter().filter(|c| !c.starts_with("x-")) {
                response_roots(document, child(&responses_path, &[code.as_str()]), &mut roots);
            }
        }
    }

    roots
}

fn list_roots(document: &Value, owner: &[String], roots: &mut Vec<(Vec<String>, Site)>) {
    let list_path = child(owner, &["parameters"]);
    let count = pointer::get(document, &list_path)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    for index in 0..count {
        parameter_roots(document, child(&list_path, &[index.to_string().as_str()]), roots);
    }
}

fn parameter_roots(document: &Value, path: Vec<String>, roots: &mut Vec<(Vec<String>, Site)>) {
    let Some(parameter) = pointer::get(document, &path) else {
        return;
    };
    if ref_uri(parameter).is_some() {
        return;
    }
    if parameter.get("in").and_then(Value::as_str) == Some("body") {
        if parameter.get("schema").is_some() {
            roots.push((child(&path, &["schema"]), Site::Schema));
        }
    } else {
        roots.push((path, Site::Primitive));
    }
}

fn response_roots(document: &Value, path: Vec<String>, roots: &mut Vec<(Vec<String>, Site)>) {
    let Some(response) = pointer::get(document, &path) else {
        return;
    };
    if ref_uri(response).is_some() {
        return;
    }
    if response.get("schema").is_some() {
        roots.push((child(&path, &["schema"]), Site::Schema));
    }
    if let Some(headers) = response.get("headers").and_then(Value::as_object) {
        for name in headers.keys() {
            roots.push((child(&path, &["headers", name.as_str()]), Site::Primitive));
        }
    }
}

fn keys(document: &Value, section: &str) -> Vec<String> {
    document
        .get(section)
        .and_then(Value::as_object)
        .map(|entries| entries.keys().cloned().collect())
        .unwrap_or_default()
}

fn child(path: &[String], segments: &[&str]) -> Vec<String> {
    let mut child = path.to_vec();
    child.extend(segments.iter().map(|s| s.to_string()));
    child
}

/// Inheritance edges out of a schema: each `allOf` member, with local
/// references replaced by their targets. A reference-only schema has a
/// single edge to its target.
fn edges(document: &Value, path: &[String]) -> Vec<Vec<String>> {
    let Some(node) = pointer::get(document, path) else {
        return Vec::new();
    };
    if let Some(uri) = ref_uri(node) {
        return local_target(uri).into_iter().collect();
    }

    node.get("allOf")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .enumerate()
                .filter_map(|(index, member)| match ref_uri(member) {
                    Some(uri) => local_target(uri),
                    None => Some(child(path, &["allOf", index.to_string().as_str()])),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn local_target(uri: &str) -> Option<Vec<String>> {
    if !uri.starts_with('#') {
        return None;
    }
    pointer::to_path(uri).ok()
}

/// Depth-first search for a path of inheritance edges leading back to
/// `start`. Returns the nodes along it, `start` first and last.
fn find_cycle(document: &Value, start: &[String]) -> Option<Vec<Vec<String>>> {
    let mut lineage = vec![start.to_vec()];
    let mut pending = vec![edges(document, start).into_iter()];
    let mut visited: HashSet<Vec<String>> = HashSet::from([start.to_vec()]);

    while let Some(next_edges) = pending.last_mut() {
        match next_edges.next() {
            Some(next) if next == start => {
                lineage.push(next);
                return Some(lineage);
            }
            Some(next) => {
                if visited.insert(next.clone()) {
                    pending.push(edges(document, &next).into_iter());
                    lineage.push(next);
                }
            }
            None => {
                pending.pop();
                lineage.pop();
            }
        }
    }
    None
}
