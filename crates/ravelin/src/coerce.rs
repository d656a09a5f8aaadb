//! Conversion of raw string values into their declared types.
//!
//! Parameters and response headers arrive as strings. Before schema
//! validation they are converted according to the declared `type`; a value
//! that does not convert is left as-is so validation reports it.

use serde_json::{Map, Number, Value};

/// Convert `value` to the type declared by `schema`.
pub fn coerce(value: &Value, schema: &Value) -> Value {
    let declared = schema.get("type").and_then(Value::as_str);
    match (declared, value) {
        (Some("array"), _) => coerce_array(value, schema),
        (Some("integer"), Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        (Some("number"), Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (Some("boolean"), Value::String(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        (Some("object"), Value::String(s)) => serde_json::from_str::<Map<String, Value>>(s)
            .map(Value::Object)
            .unwrap_or_else(|_| value.clone()),
        _ => value.clone(),
    }
}

fn coerce_array(value: &Value, schema: &Value) -> Value {
    let items_schema = schema
        .get("items")
        .filter(|items| items.is_object())
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let format = schema
        .get("collectionFormat")
        .and_then(Value::as_str)
        .unwrap_or("csv");

    let items: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::String(s) => split_collection(s, format)
            .into_iter()
            .map(|item| Value::String(item.to_string()))
            .collect(),
        other => vec![other.clone()],
    };

    Value::Array(items.iter().map(|item| coerce(item, &items_schema)).collect())
}

fn split_collection<'a>(value: &'a str, format: &str) -> Vec<&'a str> {
    match format {
        "ssv" => value.split(' ').collect(),
        "tsv" => value.split('\t').collect(),
        "pipes" => value.split('|').collect(),
        // One occurrence of a repeated parameter.
        "multi" => vec![value],
        _ => value.split(',').collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(coerce(&json!("42"), &json!({"type": "integer"})), json!(42));
        assert_eq!(coerce(&json!("4.5"), &json!({"type": "number"})), json!(4.5));
        assert_eq!(coerce(&json!("true"), &json!({"type": "boolean"})), json!(true));
        assert_eq!(coerce(&json!("false"), &json!({"type": "boolean"})), json!(false));
        assert_eq!(coerce(&json!("abc"), &json!({"type": "string"})), json!("abc"));
    }

    #[test]
    fn unconvertible_values_are_kept() {
        assert_eq!(coerce(&json!("1.5"), &json!({"type": "integer"})), json!("1.5"));
        assert_eq!(coerce(&json!("yes"), &json!({"type": "boolean"})), json!("yes"));
        assert_eq!(coerce(&json!("nan?"), &json!({"type": "number"})), json!("nan?"));
        assert_eq!(coerce(&json!("[1]"), &json!({"type": "object"})), json!("[1]"));
    }

    #[test]
    fn objects_parse_from_json_text() {
        assert_eq!(
            coerce(&json!("{\"a\":1}"), &json!({"type": "object"})),
            json!({"a": 1})
        );
    }

    #[test]
    fn collection_formats() {
        let schema = |format: &str| {
            json!({"type": "array", "items": {"type": "integer"}, "collectionFormat": format})
        };
        assert_eq!(coerce(&json!("1,2,3"), &schema("csv")), json!([1, 2, 3]));
        assert_eq!(coerce(&json!("1 2"), &schema("ssv")), json!([1, 2]));
        assert_eq!(coerce(&json!("1\t2"), &schema("tsv")), json!([1, 2]));
        assert_eq!(coerce(&json!("1|2"), &schema("pipes")), json!([1, 2]));
        assert_eq!(coerce(&json!("1,2"), &schema("multi")), json!(["1,2"]));
        assert_eq!(coerce(&json!(["1", "2"]), &schema("multi")), json!([1, 2]));
        assert_eq!(coerce(&json!(""), &schema("csv")), json!([]));
    }

    #[test]
    fn csv_is_the_default_collection_format() {
        let schema = json!({"type": "array", "items": {"type": "string"}});
        assert_eq!(coerce(&json!("a,b"), &schema), json!(["a", "b"]));
    }
}
