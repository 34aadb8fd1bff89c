//! Error types for the presentation core.
//!
//! Setup-time errors ([`ConfigurationError`], [`LifecycleError`]) are fatal
//! and returned to the caller immediately. Runtime derivation problems never
//! surface here: the facts pipeline absorbs them into a degraded snapshot.
//! [`AsyncJobError`] is recoverable and delivered to the owning presenter,
//! which surfaces it as an explicit view state.

use thiserror::Error;

use callboard_types::{PathParseError, PropertyPath};

use crate::presenter::{PresenterId, SlotId};

/// Setup-time misconfiguration: bad paths, duplicate bindings, traversal
/// through non-containers, unresolved dependencies. Aborts presenter
/// construction or registration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Path(#[from] PathParseError),

    #[error("cannot set `{path}`: segment `{segment}` is not an object")]
    NotAContainer {
        path: PropertyPath,
        segment: String,
    },

    #[error("duplicate binding on `{path}` for slot {slot:?}")]
    DuplicateBinding {
        path: PropertyPath,
        slot: SlotId,
    },

    #[error("no model registered under `{0}`")]
    UnresolvedDependency(String),

    #[error("model `{0}` is already registered")]
    DuplicateModel(String),
}

/// Caller misuse of the activate/deactivate contract. Raised immediately
/// rather than silently ignored.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("presenter `{0}` is already active")]
    AlreadyActive(&'static str),

    #[error("presenter `{0}` is not active")]
    NotActive(&'static str),

    #[error("no presenter registered under {0:?}")]
    UnknownPresenter(PresenterId),
}

/// A deferred refresh job failed. Delivered to the owning presenter, which
/// replaces its view with an explicit error state rather than silently
/// keeping a stale result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsyncJobError {
    #[error("refresh job failed: {0}")]
    Failed(String),
}

/// Umbrella for stage operations that can fail on either contract.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
