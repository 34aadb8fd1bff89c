//! Named model resolution.
//!
//! The application constructs one state root and registers named mount
//! points into it at startup. Presenters resolve their dependencies once,
//! at construction, and hold the resulting [`ModelRef`] for their full
//! lifetime; references are not re-resolved across lifecycle cycles.

use std::collections::HashMap;

use callboard_types::{PathParseError, PropertyPath};

use crate::error::ConfigurationError;

/// Registry of shared models, keyed by name (e.g. `theme-model`).
#[derive(Debug, Default)]
pub struct ModelRegistry {
    mounts: HashMap<String, PropertyPath>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under `name`, mounted at `mount` in the state root.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mount: PropertyPath,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if self.mounts.contains_key(&name) {
            return Err(ConfigurationError::DuplicateModel(name));
        }
        self.mounts.insert(name, mount);
        Ok(())
    }

    /// Resolve `name` to its shared mount point. An unresolved name is a
    /// fatal setup error naming the missing dependency.
    pub fn resolve(&self, name: &str) -> Result<ModelRef, ConfigurationError> {
        self.mounts
            .get(name)
            .cloned()
            .map(|mount| ModelRef { mount })
            .ok_or_else(|| ConfigurationError::UnresolvedDependency(name.to_string()))
    }
}

/// A resolved reference to a shared model: a mount point used to address
/// values relative to the model root. Cloning shares the same mount.
#[derive(Debug, Clone)]
pub struct ModelRef {
    mount: PropertyPath,
}

impl ModelRef {
    /// The model's mount point in the state root.
    #[must_use]
    pub fn root(&self) -> &PropertyPath {
        &self.mount
    }

    /// Absolute path of `relative` under this model.
    pub fn path(&self, relative: &str) -> Result<PropertyPath, PathParseError> {
        PropertyPath::parse(relative).map(|rel| self.mount.join(&rel))
    }
}
