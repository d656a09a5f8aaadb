//! Compiled path templates.

use regex_lite::Regex;

use crate::error::RouterError;

/// A piece of a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    /// `{name}`; the name may be empty for a malformed `{}`.
    Param(String),
}

/// One `/`-delimited segment of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    parts: Vec<Part>,
}

impl Segment {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// True when the segment contains no parameters.
    pub fn is_literal(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Part::Literal(_)))
    }

    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Param(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }
}

/// A path template compiled against a document's base path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    segments: Vec<Segment>,
    keys: Vec<String>,
    regex: Regex,
}

impl PathMatcher {
    /// Compile `template` (e.g. `/pet/{petId}`) under `base_path`.
    ///
    /// Literal text is matched verbatim and case-sensitively; each parameter
    /// matches one or more non-`/` characters.
    pub fn compile(base_path: &str, template: &str) -> Result<Self, RouterError> {
        let segments = parse_template(template)?;
        let keys = segments
            .iter()
            .flat_map(|s| s.params().map(String::from))
            .collect();

        let mut pattern = String::from("^");
        pattern.push_str(&regex_lite::escape(normalize_base_path(base_path)));
        for segment in &segments {
            pattern.push('/');
            for part in &segment.parts {
                match part {
                    Part::Literal(text) => pattern.push_str(&regex_lite::escape(text)),
                    Part::Param(_) => pattern.push_str("([^/]+)"),
                }
            }
        }
        pattern.push_str("/?$");

        let regex = Regex::new(&pattern).map_err(|e| RouterError::Pattern {
            template: template.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            segments,
            keys,
            regex,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in template order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.regex.is_match(strip_query(url))
    }

    /// Percent-decoded parameter values when `url` matches.
    pub fn captures(&self, url: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(strip_query(url))?;
        let params = self
            .keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let raw = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                let value = urlencoding::decode(raw)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                (key.clone(), value)
            })
            .collect();
        Some(params)
    }

    /// Per-segment score: 1 for literal segments, 0 for parameterized ones.
    pub fn specificity(&self) -> Vec<u8> {
        self.segments.iter().map(|s| u8::from(s.is_literal())).collect()
    }

    /// The template with parameter names erased (`/pet/{}`). Two templates
    /// with the same shape match the same URLs.
    pub fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in &self.segments {
            shape.push('/');
            for part in &segment.parts {
                match part {
                    Part::Literal(text) => shape.push_str(text),
                    Part::Param(_) => shape.push_str("{}"),
                }
            }
        }
        shape
    }
}

/// A base path of `/` contributes nothing; a trailing slash is dropped.
fn normalize_base_path(base_path: &str) -> &str {
    base_path.trim_end_matches('/')
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn parse_template(template: &str) -> Result<Vec<Segment>, RouterError> {
    let body = template.strip_prefix('/').unwrap_or(template);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    body.split('/')
        .map(|raw| parse_segment(raw).ok_or_else(|| RouterError::UnbalancedBraces(template.to_string())))
        .collect()
}

fn parse_segment(raw: &str) -> Option<Segment> {
    let mut parts = Vec::new();
    let mut rest = raw;
    while !rest.is_empty() {
        match rest.find(['{', '}']) {
            Some(i) if rest[i..].starts_with('}') => return None,
            Some(i) => {
                if i > 0 {
                    parts.push(Part::Literal(rest[..i].to_string()));
                }
                let close = rest[i..].find('}')? + i;
                let name = &rest[i + 1..close];
                if name.contains('{') {
                    return None;
                }
                parts.push(Part::Param(name.to_string()));
                rest = &rest[close + 1..];
            }
            None => {
                parts.push(Part::Literal(rest.to_string()));
                rest = "";
            }
        }
    }
    if parts.is_empty() {
        parts.push(Part::Literal(String::new()));
    }
    Some(Segment { parts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn captures_parameters_under_base_path() {
        let matcher = PathMatcher::compile("/v2", "/pet/{petId}").unwrap();
        assert_eq!(matcher.keys(), ["petId"]);
        assert_eq!(matcher.captures("/v2/pet/1"), Some(params(&[("petId", "1")])));
        assert!(matcher.captures("/pet/1").is_none());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let matcher = PathMatcher::compile("/v2", "/pet/{petId}").unwrap();
        assert!(!matcher.is_match("/v2/Pet/1"));
    }

    #[test]
    fn ignores_query_and_trailing_slash() {
        let matcher = PathMatcher::compile("", "/pet/findByStatus").unwrap();
        assert!(matcher.is_match("/pet/findByStatus?status=available"));
        assert!(matcher.is_match("/pet/findByStatus/"));
        assert!(!matcher.is_match("/pet/findByStatus/extra"));
    }

    #[test]
    fn root_base_path_is_empty() {
        let matcher = PathMatcher::compile("/", "/pet").unwrap();
        assert!(matcher.is_match("/pet"));
    }

    #[test]
    fn escapes_regex_metacharacters() {
        let matcher = PathMatcher::compile("", "/foo/({bar})").unwrap();
        assert_eq!(matcher.captures("/foo/(baz)"), Some(params(&[("bar", "baz")])));
        assert!(!matcher.is_match("/foo/baz"));

        let matcher = PathMatcher::compile("", "/a.b").unwrap();
        assert!(!matcher.is_match("/axb"));
    }

    #[test]
    fn decodes_captured_values() {
        let matcher = PathMatcher::compile("", "/user/{username}").unwrap();
        assert_eq!(matcher.captures("/user/john%20doe"), Some(params(&[("username", "john doe")])));
    }

    #[test]
    fn specificity_scores_segments() {
        let matcher = PathMatcher::compile("", "/foo/{bar}/baz").unwrap();
        assert_eq!(matcher.specificity(), vec![1, 0, 1]);
        let mixed = PathMatcher::compile("", "/foo/({bar})").unwrap();
        assert_eq!(mixed.specificity(), vec![1, 0]);
    }

    #[test]
    fn shape_erases_parameter_names() {
        let a = PathMatcher::compile("", "/pet/{petId}").unwrap();
        let b = PathMatcher::compile("", "/pet/{notPetId}").unwrap();
        assert_eq!(a.shape(), "/pet/{}");
        assert_eq!(a.shape(), b.shape());
    }

    #[test]
    fn empty_parameter_name_compiles() {
        let matcher = PathMatcher::compile("", "/invalid/{}").unwrap();
        assert_eq!(matcher.keys(), [""]);
        assert!(matcher.is_match("/invalid/1"));
    }

    #[test]
    fn unbalanced_braces_fail() {
        assert!(matches!(
            PathMatcher::compile("", "/pet/{petId"),
            Err(RouterError::UnbalancedBraces(_))
        ));
        assert!(PathMatcher::compile("", "/pet/petId}").is_err());
    }
}
