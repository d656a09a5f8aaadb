//! Reference inventory types.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::pointer;

/// How a `$ref` value was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// `#/...` pointer into the same document.
    Local,
    /// Relative URI resolved against the base location.
    Relative,
    /// Absolute URI.
    Remote,
    /// Not a usable reference.
    Invalid,
}

/// Resolution outcome for one `$ref` found in the original document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceOutcome {
    /// Location of the object holding the `$ref`.
    pub path: Vec<String>,
    /// The raw `$ref` value.
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub missing: bool,
    pub circular: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Sibling keys of `$ref` that resolution ignores.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl ReferenceOutcome {
    /// Pointer to the object holding the `$ref`.
    pub fn ptr(&self) -> String {
        pointer::to_ptr(&self.path)
    }

    /// Target path for local references, `None` otherwise.
    pub fn local_target(&self) -> Option<Vec<String>> {
        match self.kind {
            ReferenceKind::Local => pointer::to_path(&self.uri).ok(),
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, ReferenceKind::Relative | ReferenceKind::Remote)
    }
}

/// A `$ref` occurrence discovered while scanning a document.
#[derive(Debug, Clone)]
pub(crate) struct RefSite {
    pub path: Vec<String>,
    pub uri: String,
    pub extra: Vec<String>,
}

/// Returns the `$ref` string when `value` is a JSON Reference object.
pub fn ref_uri(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}

/// Subtrees that hold example payloads or vendor data rather than
/// API description content.
pub(crate) fn is_opaque(parent: Option<&str>, key: &str) -> bool {
    if parent == Some("properties") {
        return false;
    }
    key == "example" || key == "examples" || key.starts_with("x-")
}

/// Collect every JSON Reference in document order.
pub(crate) fn collect_refs(value: &Value) -> Vec<RefSite> {
    let mut sites = Vec::new();
    let mut path = Vec::new();
    walk(value, &mut path, &mut sites);
    sites
}

fn walk(value: &Value, path: &mut Vec<String>, sites: &mut Vec<RefSite>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(uri)) = map.get("$ref") {
                sites.push(RefSite {
                    path: path.clone(),
                    uri: uri.clone(),
                    extra: extra_keys(map),
                });
                return;
            }
            let parent = path.last().cloned();
            for (key, child) in map {
                if is_opaque(parent.as_deref(), key) {
                    continue;
                }
                path.push(key.clone());
                walk(child, path, sites);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                path.push(i.to_string());
                walk(child, path, sites);
                path.pop();
            }
        }
        _ => {}
    }
}

fn extra_keys(map: &Map<String, Value>) -> Vec<String> {
    map.keys().filter(|k| *k != "$ref").cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_refs_in_document_order() {
        let doc = json!({
            "paths": {"/pet": {"post": {"parameters": [{"in": "body", "schema": {"$ref": "#/definitions/Pet"}}]}}},
            "definitions": {"Pet": {"properties": {"tag": {"$ref": "#/definitions/Tag", "description": "x"}}}}
        });
        let sites = collect_refs(&doc);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].path, vec!["paths", "/pet", "post", "parameters", "0", "schema"]);
        assert_eq!(sites[1].uri, "#/definitions/Tag");
        assert_eq!(sites[1].extra, vec!["description"]);
    }

    #[test]
    fn skips_examples_and_extensions() {
        let doc = json!({
            "x-internal": {"$ref": "#/nowhere"},
            "responses": {"ok": {"examples": {"application/json": {"$ref": "#/nowhere"}}}},
            "definitions": {"A": {"properties": {"example": {"$ref": "#/definitions/B"}}}}
        });
        let sites = collect_refs(&doc);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].path, vec!["definitions", "A", "properties", "example"]);
    }

    #[test]
    fn non_string_ref_is_not_a_reference() {
        let doc = json!({"definitions": {"A": {"properties": {"$ref": {"type": "string"}}}}});
        assert!(collect_refs(&doc).is_empty());
    }
}
