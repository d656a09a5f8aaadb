//! Pluggable string formats and format value generators.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use serde_json::Value;

/// Returns true when the string satisfies the format.
pub type FormatValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Produces a sample value for a schema carrying the format.
pub type FormatGenerator = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// OpenAPI 2.0 formats that draft-04 does not define. Only `byte` constrains
/// string values; the rest describe numeric widths or opaque data.
const PASSTHROUGH_FORMATS: &[&str] = &["int32", "int64", "float", "double", "binary", "password"];

/// Custom formats and generators registered on top of the built-ins.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, FormatValidator>,
    generators: BTreeMap<String, FormatGenerator>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_format<F>(&mut self, name: impl Into<String>, validator: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(name.into(), Arc::new(validator));
    }

    /// Returns true if a format was removed.
    pub fn unregister_format(&mut self, name: &str) -> bool {
        self.formats.remove(name).is_some()
    }

    pub fn format(&self, name: &str) -> Option<&FormatValidator> {
        self.formats.get(name)
    }

    pub fn register_generator<F>(&mut self, name: impl Into<String>, generator: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.generators.insert(name.into(), Arc::new(generator));
    }

    /// Returns true if a generator was removed.
    pub fn unregister_generator(&mut self, name: &str) -> bool {
        self.generators.remove(name).is_some()
    }

    pub fn generator(&self, name: &str) -> Option<&FormatGenerator> {
        self.generators.get(name)
    }

    /// Built-in OpenAPI formats followed by registered ones, so registrations
    /// take precedence.
    pub(crate) fn validators(&self) -> Vec<(String, FormatValidator)> {
        let mut all: Vec<(String, FormatValidator)> = PASSTHROUGH_FORMATS
            .iter()
            .map(|name| (name.to_string(), Arc::new(|_: &str| true) as FormatValidator))
            .collect();
        all.push(("byte".to_string(), Arc::new(is_base64) as FormatValidator));
        all.extend(self.formats.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn is_base64(value: &str) -> bool {
    base64::engine::general_purpose::STANDARD.decode(value).is_ok()
}
