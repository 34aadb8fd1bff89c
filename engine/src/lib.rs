//! Reactive presentation core for Callboard - state binding, presenter
//! lifecycle, and deferred refresh scheduling.
//!
//! This crate contains the [`Stage`] orchestrator without any terminal or
//! rendering dependencies. State lives in an [`ObservableStore`] addressed by
//! property paths; presenters declare path bindings that fire coalesced,
//! at most once per batch; expensive recomputation goes through the refresh
//! scheduler, which discards stale results by generation.

mod error;
mod injector;
mod presenter;
mod registry;
mod render;
mod scheduler;
mod stage;
mod store;

pub mod presenters;

pub use error::{AsyncJobError, ConfigurationError, LifecycleError, StageError};
pub use injector::{ModelRef, ModelRegistry};
pub use presenter::{BindingDecl, Phase, Presenter, PresenterCx, PresenterId, SlotId};
pub use registry::{BindingId, BindingRegistry};
pub use render::{BoxRenderFuture, DocumentRenderer, RenderArtifact};
pub use scheduler::JobPayload;
pub use stage::{BatchCx, Stage};
pub use store::ObservableStore;

// Re-export the domain types callers need to drive the engine.
pub use callboard_facts::{CharacterSort, Derivation, FactsOptions, LevelCutoffs};
pub use callboard_types::{
    BasicStats, CharacterRecord, DocToken, FactsSnapshot, LineKind, LocationRecord,
    ParsedDocument, PathParseError, PropertyPath, TitleEntry, TitlePage,
};

#[cfg(test)]
mod tests;
