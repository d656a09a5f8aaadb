//! Media type helpers for content negotiation and body decoding.

/// Assumed when a message carries a body but no `Content-Type`.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The media type without parameters: `application/json; charset=utf-8`
/// becomes `application/json`.
pub fn base_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

pub fn is_json(content_type: &str) -> bool {
    base_type(content_type).to_ascii_lowercase().contains("json")
}

pub fn is_yaml(content_type: &str) -> bool {
    base_type(content_type).to_ascii_lowercase().contains("yaml")
}

pub fn is_form_urlencoded(content_type: &str) -> bool {
    base_type(content_type).eq_ignore_ascii_case("application/x-www-form-urlencoded")
}

/// True when the full header value or its base type is listed.
pub fn is_supported(content_type: &str, supported: &[String]) -> bool {
    let base = base_type(content_type);
    supported
        .iter()
        .any(|s| s == content_type || s.as_str() == base)
}
