//! Per-definition registries for formats, format generators and custom
//! validators.
//!
//! A registry is shared by a definition and every model object built from
//! it, so registrations made after loading apply to later validations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use ravelin_schema::{FormatRegistry, ValidationResults};
use serde_json::Value;

use crate::definition::Definition;
use crate::error::RegistryError;

/// A document-level check run after the built-in semantic validators.
pub type CustomValidator = Arc<dyn Fn(&Definition) -> ValidationResults + Send + Sync>;

/// Handle returned by validator registration, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatorId(u64);

#[derive(Default)]
pub(crate) struct Registry {
    formats: RwLock<FormatRegistry>,
    validators: RwLock<Vec<(ValidatorId, CustomValidator)>>,
    next_id: AtomicU64,
}

impl Registry {
    pub(crate) fn new(formats: FormatRegistry, validators: Vec<CustomValidator>) -> Self {
        let registry = Self {
            formats: RwLock::new(formats),
            ..Self::default()
        };
        for validator in validators {
            registry.add_validator(validator);
        }
        registry
    }

    /// A snapshot of the registered formats and generators.
    pub(crate) fn formats(&self) -> FormatRegistry {
        self.formats.read().clone()
    }

    pub(crate) fn register_format<F>(&self, name: &str, validator: F) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        require_name(name)?;
        self.formats.write().register_format(name, validator);
        Ok(())
    }

    pub(crate) fn unregister_format(&self, name: &str) -> Result<bool, RegistryError> {
        require_name(name)?;
        Ok(self.formats.write().unregister_format(name))
    }

    pub(crate) fn register_generator<F>(&self, name: &str, generator: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        require_name(name)?;
        self.formats.write().register_generator(name, generator);
        Ok(())
    }

    pub(crate) fn unregister_generator(&self, name: &str) -> Result<bool, RegistryError> {
        require_name(name)?;
        Ok(self.formats.write().unregister_generator(name))
    }

    pub(crate) fn add_validator(&self, validator: CustomValidator) -> ValidatorId {
        let id = ValidatorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.validators.write().push((id, validator));
        id
    }

    pub(crate) fn remove_validator(&self, id: ValidatorId) -> bool {
        let mut validators = self.validators.write();
        let before = validators.len();
        validators.retain(|(existing, _)| *existing != id);
        validators.len() != before
    }

    /// Registered validators in registration order. The lock is released
    /// before any of them runs.
    pub(crate) fn validators(&self) -> Vec<CustomValidator> {
        self.validators
            .read()
            .iter()
            .map(|(_, validator)| Arc::clone(validator))
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("formats", &*self.formats.read())
            .field("validators", &self.validators.read().len())
            .finish()
    }
}

fn require_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::NameRequired);
    }
    Ok(())
}
