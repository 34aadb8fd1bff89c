//! Nested mutable state addressed by property paths.

use serde_json::{Map, Value};

use callboard_types::PropertyPath;

use crate::error::ConfigurationError;

/// The state graph: a JSON object tree addressed by [`PropertyPath`].
///
/// The store only holds data. Change notification is coordinated by
/// [`Stage`](crate::Stage), which matches changed paths against live
/// bindings and coalesces the resulting callbacks per batch.
#[derive(Debug)]
pub struct ObservableStore {
    // Invariant: always an object.
    root: Value,
}

impl Default for ObservableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Current value at `path`, or `None` when absent.
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    /// Set the value at `path`, creating missing intermediate objects.
    ///
    /// Traversing through an existing value that is not an object fails with
    /// [`ConfigurationError::NotAContainer`] and leaves the store unmodified.
    pub fn set(&mut self, path: &PropertyPath, value: Value) -> Result<(), ConfigurationError> {
        self.check_containers(path)?;

        let mut node = &mut self.root;
        for segment in path.parent_segments() {
            let Value::Object(map) = node else {
                // check_containers already rejected this chain.
                return Err(not_a_container(path, segment));
            };
            node = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        let Value::Object(map) = node else {
            return Err(not_a_container(path, path.leaf()));
        };
        map.insert(path.leaf().to_string(), value);
        Ok(())
    }

    /// Reject traversal through existing non-object values before any
    /// mutation, so a failed set leaves the store untouched.
    fn check_containers(&self, path: &PropertyPath) -> Result<(), ConfigurationError> {
        let mut node = &self.root;
        let mut addressed = "";
        for segment in path.segments() {
            let Some(map) = node.as_object() else {
                // The root is an object by invariant, so `addressed` names
                // the segment whose value blocked the traversal.
                return Err(not_a_container(path, addressed));
            };
            match map.get(segment) {
                Some(next) => node = next,
                // Absent from here down: the write pass vivifies objects.
                None => return Ok(()),
            }
            addressed = segment;
        }
        Ok(())
    }
}

fn not_a_container(path: &PropertyPath, segment: &str) -> ConfigurationError {
    ConfigurationError::NotAContainer {
        path: path.clone(),
        segment: segment.to_string(),
    }
}
