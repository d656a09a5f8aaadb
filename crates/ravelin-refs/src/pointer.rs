//! JSON Pointer (RFC 6901) helpers.
//!
//! Document locations are carried around as `Vec<String>` segments and only
//! rendered as `#/...` pointers for messages.

use serde_json::Value;

use crate::error::RefError;

/// Escape a single pointer segment (`~` → `~0`, `/` → `~1`).
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape a single pointer segment.
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Render document path segments as a URI fragment pointer (`#/a/b`).
pub fn to_ptr<S: AsRef<str>>(path: &[S]) -> String {
    let mut ptr = String::from("#");
    for segment in path {
        ptr.push('/');
        ptr.push_str(&escape(segment.as_ref()));
    }
    ptr
}

/// Parse a pointer (`#/a/b`, `/a/b`, `#` or empty) into path segments.
pub fn to_path(ptr: &str) -> Result<Vec<String>, RefError> {
    let raw = ptr.strip_prefix('#').unwrap_or(ptr);
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = raw.strip_prefix('/') else {
        return Err(RefError::InvalidPointer(ptr.to_string()));
    };
    Ok(rest.split('/').map(unescape).collect())
}

/// Follow path segments through a JSON value.
pub fn get<'a, S: AsRef<str>>(value: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| {
        let segment = segment.as_ref();
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Returns true if `prefix` is an ancestor of (or equal to) `path`.
pub fn is_prefix<S: AsRef<str>, T: AsRef<str>>(prefix: &[S], path: &[T]) -> bool {
    prefix.len() <= path.len()
        && prefix
            .iter()
            .zip(path)
            .all(|(a, b)| a.as_ref() == b.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ptr_escapes_slashes() {
        assert_eq!(to_ptr(&["paths", "/pet/{petId}", "get"]), "#/paths/~1pet~1{petId}/get");
        assert_eq!(to_ptr::<&str>(&[]), "#");
    }

    #[test]
    fn path_unescapes_segments() {
        let path = to_path("#/paths/~1pet~1findByStatus/get/parameters/1").unwrap();
        assert_eq!(path, vec!["paths", "/pet/findByStatus", "get", "parameters", "1"]);
        assert_eq!(to_path("#").unwrap(), Vec::<String>::new());
        assert_eq!(to_path("/a~0b").unwrap(), vec!["a~b"]);
    }

    #[test]
    fn path_rejects_relative_pointer() {
        let err = to_path("#definitions/Pet").unwrap_err();
        assert_eq!(err.to_string(), "ptr must start with a / or #/");
    }

    #[test]
    fn get_walks_objects_and_arrays() {
        let doc = json!({"paths": {"/pet": {"parameters": [{"name": "a"}]}}});
        let found = get(&doc, &["paths", "/pet", "parameters", "0", "name"]);
        assert_eq!(found, Some(&json!("a")));
        assert!(get(&doc, &["paths", "/pet", "parameters", "3"]).is_none());
        assert!(get(&doc, &["paths", "/pet", "parameters", "x"]).is_none());
    }

    #[test]
    fn prefix_matches_ancestors() {
        assert!(is_prefix(&["definitions", "A"], &["definitions", "A", "allOf", "0"]));
        assert!(is_prefix(&["definitions", "A"], &["definitions", "A"]));
        assert!(!is_prefix(&["definitions", "AB"], &["definitions", "A"]));
    }
}
