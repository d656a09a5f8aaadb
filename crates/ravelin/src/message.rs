//! Framework-independent HTTP request and response views.
//!
//! These carry only what validation needs. Header lookup is
//! case-insensitive; bodies are decoded lazily, according to the message
//! encoding and `Content-Type`.

use std::collections::BTreeMap;

use base64::Engine;
use serde_json::{Map, Value};

use crate::media;

/// An HTTP message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
    /// An already parsed body, used as-is.
    Json(Value),
}

impl Body {
    /// Text form of the body. Byte bodies are decoded with `encoding`
    /// (`utf-8` when absent): `latin1`, `binary` and `ascii` map bytes to
    /// characters one to one, `base64` and `hex` render the bytes in that
    /// encoding.
    pub fn to_text(&self, encoding: Option<&str>) -> String {
        match self {
            Body::Text(text) => text.clone(),
            Body::Json(value) => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            Body::Bytes(bytes) => {
                let encoding = encoding.unwrap_or("utf-8").to_ascii_lowercase();
                match encoding.as_str() {
                    "latin1" | "binary" | "ascii" => bytes.iter().map(|&b| char::from(b)).collect(),
                    "base64" => base64::engine::general_purpose::STANDARD.encode(bytes),
                    "hex" => hex::encode(bytes),
                    _ => String::from_utf8_lossy(bytes).into_owned(),
                }
            }
        }
    }

    /// The body before any parsing: JSON bodies as given, everything else
    /// as its decoded text.
    pub fn raw_value(&self, encoding: Option<&str>) -> Value {
        match self {
            Body::Json(value) => value.clone(),
            other => Value::String(other.to_text(encoding)),
        }
    }

    /// The body as a JSON value. Text is parsed only when `content_type` is
    /// a JSON media type; unparseable text stays a string.
    pub fn to_value(&self, encoding: Option<&str>, content_type: Option<&str>) -> Value {
        match self {
            Body::Json(value) => value.clone(),
            other => {
                let text = other.to_text(encoding);
                match content_type {
                    Some(ct) if media::is_json(ct) => {
                        serde_json::from_str(&text).unwrap_or(Value::String(text))
                    }
                    _ => Value::String(text),
                }
            }
        }
    }
}

/// An incoming request.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub url: Option<String>,
    /// Takes precedence over `url` when present (the URL before any
    /// framework rewriting).
    pub original_url: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query: Map<String, Value>,
    pub body: Option<Body>,
    /// Uploaded files by form field name.
    pub files: BTreeMap<String, Value>,
    pub encoding: Option<String>,
}

impl HttpRequest {
    /// A request for `url`. A query string in `url` populates `query`.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let query = url
            .split_once('?')
            .map(|(_, qs)| parse_query(qs))
            .unwrap_or_default();
        Self {
            method: method.into(),
            url: Some(url),
            query,
            ..Self::default()
        }
    }

    pub fn with_original_url(mut self, url: impl Into<String>) -> Self {
        self.original_url = Some(url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    /// Replace `query` with the parsed form of `qs`.
    pub fn with_query_string(mut self, qs: &str) -> Self {
        self.query = parse_query(qs);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json(self, value: Value) -> Self {
        self.with_body(Body::Json(value))
    }

    pub fn with_file(mut self, field: impl Into<String>, file: Value) -> Self {
        self.files.insert(field.into(), file);
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// The URL used for routing: `original_url`, else `url`.
    pub fn target_url(&self) -> Option<&str> {
        self.original_url.as_deref().or(self.url.as_deref())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Form fields: a JSON object body as-is, or an urlencoded text body
    /// parsed into fields.
    pub fn form_fields(&self) -> Option<Map<String, Value>> {
        match self.body.as_ref()? {
            Body::Json(Value::Object(fields)) => Some(fields.clone()),
            Body::Json(_) => None,
            body => {
                let urlencoded = self.content_type().map_or(true, media::is_form_urlencoded);
                urlencoded.then(|| parse_query(&body.to_text(self.encoding.as_deref())))
            }
        }
    }
}

/// An outgoing response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status_code: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Body>,
    pub encoding: Option<String>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json(self, value: Value) -> Self {
        self.with_body(Body::Json(value))
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

fn find_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Parse a query string into nested values.
///
/// Repeated keys collect into arrays, `a[b]=1` nests objects and `a[]=1`
/// appends to an array.
pub fn parse_query(qs: &str) -> Map<String, Value> {
    let mut query = Map::new();
    for (key, value) in form_urlencoded::parse(qs.trim_start_matches('?').as_bytes()) {
        let segments = key_segments(&key);
        insert_segments(&mut query, &segments, Value::String(value.into_owned()));
    }
    query
}

fn key_segments(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 || !key.ends_with(']') {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    for part in key[open + 1..key.len() - 1].split("][") {
        if part.contains('[') || part.contains(']') {
            return vec![key.to_string()];
        }
        segments.push(part.to_string());
    }
    segments
}

fn insert_segments(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    match rest.first() {
        None => match map.get_mut(first) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                map.insert(first.clone(), value);
            }
        },
        Some(next) if next.is_empty() => match map.get_mut(first) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                map.insert(first.clone(), Value::Array(vec![value]));
            }
        },
        Some(_) => {
            let entry = map
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_segments(child, rest, value);
            }
        }
    }
}
