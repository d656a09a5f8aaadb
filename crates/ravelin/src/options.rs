use std::sync::Arc;

use ravelin_refs::{DocumentLoader, FileLoader, ReferenceResolver};
use ravelin_schema::{FormatRegistry, ValidationResults};
use serde_json::Value;

use crate::definition::Definition;
use crate::registry::CustomValidator;

/// Options for [`Definition::load`].
#[derive(Clone)]
pub struct LoadOptions {
    /// Where the document lives (file path or URL); relative references
    /// resolve against it.
    pub base_location: Option<String>,
    /// Fetches remote documents. Ignored when `resolver` is set.
    pub loader: Arc<dyn DocumentLoader>,
    /// Replaces the default JSON Reference resolver.
    pub resolver: Option<Arc<dyn ReferenceResolver>>,
    pub formats: FormatRegistry,
    pub validators: Vec<CustomValidator>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            base_location: None,
            loader: Arc::new(FileLoader),
            resolver: None,
            formats: FormatRegistry::default(),
            validators: Vec::new(),
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("base_location", &self.base_location)
            .field("custom_resolver", &self.resolver.is_some())
            .field("formats", &self.formats)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_location(mut self, location: impl Into<String>) -> Self {
        self.base_location = Some(location.into());
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_format<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.register_format(name, validator);
        self
    }

    pub fn with_format_generator<F>(mut self, name: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.formats.register_generator(name, generator);
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Definition) -> ValidationResults + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }
}
