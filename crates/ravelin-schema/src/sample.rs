//! Sample value generation from schemas.

use base64::Engine;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::formats::FormatRegistry;

/// Arrays never get more sampled items than this, whatever `minItems` says.
const MAX_SAMPLE_ITEMS: u64 = 256;
const MAX_SAMPLE_LENGTH: u64 = 4096;

/// 2024-01-01T00:00:00Z, the instant behind date and date-time samples.
const SAMPLE_TIMESTAMP: i64 = 1_704_067_200;

const SAMPLE_UUID: u128 = 0x3f2b_8c1e_5d4a_4e6f_9b7c_2a1d_0e8f_6c5b;

/// Generate a value that conforms to `schema`.
///
/// Declared `enum`, `default` and `example` values win over synthesized ones.
/// A `format` without a registered generator or built-in fails with
/// [`SchemaError::UnknownRegistryKey`].
pub fn generate(schema: &Value, formats: &FormatRegistry) -> Result<Value, SchemaError> {
    let Some(map) = schema.as_object() else {
        return Ok(Value::Null);
    };

    if let Some(first) = map.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return Ok(first.clone());
    }
    if let Some(default) = map.get("default") {
        return Ok(default.clone());
    }
    if let Some(example) = map.get("example") {
        return Ok(example.clone());
    }
    if let Some(all_of) = map.get("allOf").and_then(Value::as_array) {
        return merge_all_of(map, all_of, formats);
    }

    match schema_type(map) {
        "object" => {
            let mut out = Map::new();
            if let Some(properties) = map.get("properties").and_then(Value::as_object) {
                for (name, property) in properties {
                    out.insert(name.clone(), generate(property, formats)?);
                }
            }
            Ok(Value::Object(out))
        }
        "array" => {
            let count = map.get("minItems").and_then(Value::as_u64).unwrap_or(1).max(1);
            let items = match map.get("items") {
                Some(Value::Array(tuple)) => tuple
                    .iter()
                    .map(|item| generate(item, formats))
                    .collect::<Result<Vec<_>, _>>()?,
                Some(item) => {
                    let sample = generate(item, formats)?;
                    vec![sample; count.min(MAX_SAMPLE_ITEMS) as usize]
                }
                None => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        "integer" => Ok(Value::Number(integer_sample(map).into())),
        "number" => Ok(number_sample(map)),
        "boolean" => Ok(Value::Bool(true)),
        "null" => Ok(Value::Null),
        "file" => Ok(Value::String("sample file contents".to_string())),
        _ => string_sample(map, schema, formats),
    }
}

fn schema_type(map: &Map<String, Value>) -> &str {
    match map.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(Value::Array(types)) => types.first().and_then(Value::as_str).unwrap_or("string"),
        _ if map.contains_key("properties") => "object",
        _ if map.contains_key("items") => "array",
        _ => "string",
    }
}

fn merge_all_of(
    map: &Map<String, Value>,
    all_of: &[Value],
    formats: &FormatRegistry,
) -> Result<Value, SchemaError> {
    let mut own = map.clone();
    own.remove("allOf");
    let mut merged = Map::new();
    for part in all_of.iter().chain(std::iter::once(&Value::Object(own))) {
        match generate(part, formats)? {
            Value::Object(fields) => merged.extend(fields),
            Value::Null => {}
            other if merged.is_empty() => return Ok(other),
            _ => {}
        }
    }
    Ok(Value::Object(merged))
}

fn integer_sample(map: &Map<String, Value>) -> i64 {
    let minimum = map.get("minimum").and_then(Value::as_f64);
    let maximum = map.get("maximum").and_then(Value::as_f64);
    let exclusive_min = map.get("exclusiveMinimum").and_then(Value::as_bool) == Some(true);
    match (minimum, maximum) {
        (Some(min), _) if exclusive_min => (min.floor() as i64).saturating_add(1),
        (Some(min), _) => min.ceil() as i64,
        (None, Some(max)) if max < 1.0 => (max.floor() as i64).saturating_sub(1),
        _ => 1,
    }
}

fn number_sample(map: &Map<String, Value>) -> Value {
    let minimum = map.get("minimum").and_then(Value::as_f64);
    let maximum = map.get("maximum").and_then(Value::as_f64);
    let value = match (minimum, maximum) {
        (Some(min), Some(max)) => (min + max) / 2.0,
        (Some(min), None) => min + 1.0,
        (None, Some(max)) => max - 1.0,
        (None, None) => 1.5,
    };
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn string_sample(
    map: &Map<String, Value>,
    schema: &Value,
    formats: &FormatRegistry,
) -> Result<Value, SchemaError> {
    if let Some(format) = map.get("format").and_then(Value::as_str) {
        if let Some(generator) = formats.generator(format) {
            return Ok(generator(schema));
        }
        return builtin_format(format).map(Value::String).ok_or_else(|| {
            debug!(format, "no sample generator for format");
            SchemaError::UnknownRegistryKey(format.to_string())
        });
    }

    let min = map
        .get("minLength")
        .and_then(Value::as_u64)
        .unwrap_or(0)
        .min(MAX_SAMPLE_LENGTH) as usize;
    let max = map.get("maxLength").and_then(Value::as_u64).map(|m| m as usize);
    let mut sample = String::from("sample");
    while sample.chars().count() < min {
        sample.push('x');
    }
    if let Some(max) = max {
        sample = sample.chars().take(max).collect();
    }
    Ok(Value::String(sample))
}

fn builtin_format(format: &str) -> Option<String> {
    let instant = chrono::DateTime::from_timestamp(SAMPLE_TIMESTAMP, 0).unwrap_or_default();
    let value = match format {
        "date-time" => instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        "date" => instant.format("%Y-%m-%d").to_string(),
        "email" => "user@example.com".to_string(),
        "hostname" => "example.com".to_string(),
        "ipv4" => "192.0.2.1".to_string(),
        "ipv6" => "2001:db8::1".to_string(),
        "uri" => "https://example.com/".to_string(),
        "uuid" => uuid::Uuid::from_u128(SAMPLE_UUID).to_string(),
        "byte" => base64::engine::general_purpose::STANDARD.encode("sample"),
        "binary" | "password" => "sample".to_string(),
        "int32" | "int64" => "1".to_string(),
        "float" | "double" => "1.5".to_string(),
        _ => return None,
    };
    Some(value)
}
