//! Name-based registry of backend, platform and component implementations.
//!
//! Implementations are looked up by the name used in the configuration
//! document. Each entry is a factory producing a fresh instance holding the
//! implementation's default configuration, which the caller then decodes and
//! validates in place.
//!
//! The process-wide registries are built on first use and are read-only
//! afterwards. Tests build their own [`Registry`] values instead of touching
//! the globals.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

use crate::backend::{self, Backend};
use crate::components::{self, Component};
use crate::config::{ConfigBody, EvalContext};
use crate::diagnostics::Diagnostics;
use crate::platform::{self, Platform};

/// Base capability shared by every registered implementation.
pub trait Configurable {
    /// Decode `body` into the implementation's configuration and validate it.
    ///
    /// A `None` body keeps the defaults and returns no diagnostics.
    fn load_config(&mut self, body: Option<&ConfigBody>, ctx: &EvalContext) -> Diagnostics;
}

/// What a registry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Backend,
    Platform,
    Component,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend => write!(f, "backend"),
            Self::Platform => write!(f, "platform"),
            Self::Component => write!(f, "component"),
        }
    }
}

/// Registry lookup and registration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No implementation is registered under the name.
    #[error("{kind} {name:?} not found, must be one of: {}", known.join(", "))]
    NotFound {
        kind: CapabilityKind,
        name: String,
        known: Vec<String>,
    },

    /// An implementation is already registered under the name.
    #[error("{kind} {name:?} is already registered")]
    Duplicate { kind: CapabilityKind, name: String },
}

/// Factory producing a default-configured implementation.
pub type Factory<T> = fn() -> Box<T>;

/// Registry of implementations of one capability kind.
pub struct Registry<T: ?Sized> {
    kind: CapabilityKind,
    entries: BTreeMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Register `factory` under `name`.
    ///
    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if the name is taken.
    pub fn register(&mut self, name: &str, factory: Factory<T>) -> Result<(), RegistryError> {
        if self.entries.contains_key(name) {
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        self.entries.insert(name.to_string(), factory);
        Ok(())
    }

    /// Create a fresh instance of the implementation registered as `name`.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] listing the known names.
    pub fn get(&self, name: &str) -> Result<Box<T>, RegistryError> {
        self.entries
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::NotFound {
                kind: self.kind,
                name: name.to_string(),
                known: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Register a built-in implementation. A duplicate is a programming error.
    fn must_register(&mut self, name: &str, factory: Factory<T>) {
        if let Err(e) = self.register(name, factory) {
            panic!("registering built-in implementations: {e}");
        }
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

impl Registry<dyn Backend> {
    /// Build a registry holding every built-in backend.
    #[must_use]
    pub fn backends() -> Self {
        let mut registry = Self::new(CapabilityKind::Backend);
        registry.must_register(backend::s3::NAME, backend::s3::new);
        registry.must_register(backend::local::NAME, backend::local::new);
        registry
    }
}

impl Registry<dyn Platform> {
    /// Build a registry holding every built-in platform.
    #[must_use]
    pub fn platforms() -> Self {
        let mut registry = Self::new(CapabilityKind::Platform);
        registry.must_register(platform::tinkerbell::NAME, platform::tinkerbell::new);
        registry
    }
}

impl Registry<dyn Component> {
    /// Build a registry holding every built-in component.
    #[must_use]
    pub fn components() -> Self {
        let mut registry = Self::new(CapabilityKind::Component);
        registry.must_register(components::velero::NAME, components::velero::new);
        registry
    }
}

static BACKENDS: OnceLock<Registry<dyn Backend>> = OnceLock::new();
static PLATFORMS: OnceLock<Registry<dyn Platform>> = OnceLock::new();
static COMPONENTS: OnceLock<Registry<dyn Component>> = OnceLock::new();

/// Process-wide backend registry.
pub fn backends() -> &'static Registry<dyn Backend> {
    BACKENDS.get_or_init(Registry::<dyn Backend>::backends)
}

/// Process-wide platform registry.
pub fn platforms() -> &'static Registry<dyn Platform> {
    PLATFORMS.get_or_init(Registry::<dyn Platform>::platforms)
}

/// Process-wide component registry.
pub fn components() -> &'static Registry<dyn Component> {
    COMPONENTS.get_or_init(Registry::<dyn Component>::components)
}
