//! The presenter contract: declared bindings, lifecycle hooks, and the
//! capability context handed to callbacks.

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;

use callboard_types::PropertyPath;

use crate::error::{AsyncJobError, ConfigurationError};
use crate::registry::BindingRegistry;
use crate::scheduler::{JobPayload, RefreshScheduler};
use crate::store::ObservableStore;

/// Identifies a presenter registered with a [`Stage`](crate::Stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresenterId(pub(crate) u32);

/// Presenter-local callback discriminator. Bindings target a slot rather
/// than a closure so per-batch dedup can key on (presenter, slot): several
/// paths bound to one slot fire it exactly once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// One declared subscription: changes at or under `path` invoke `slot`.
#[derive(Debug, Clone)]
pub struct BindingDecl {
    pub path: PropertyPath,
    pub slot: SlotId,
}

impl BindingDecl {
    #[must_use]
    pub fn new(path: PropertyPath, slot: SlotId) -> Self {
        Self { path, slot }
    }
}

/// Lifecycle phase of a registered presenter.
///
/// Invariant: live bindings exist iff the phase is `Activated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Created,
    Activated,
    Deactivated,
}

/// A stateful mediator between the store and one view.
///
/// Implementations own a typed view struct and hold their injected
/// [`ModelRef`](crate::ModelRef)s, resolved once at construction. The stage
/// drives the lifecycle: on activation it establishes the declared bindings
/// and runs [`on_activate`](Presenter::on_activate) as the initial refresh;
/// on deactivation it removes every binding and invalidates outstanding
/// refresh jobs.
pub trait Presenter {
    /// Stable name used in lifecycle errors and logs.
    fn name(&self) -> &'static str;

    /// Subscriptions to establish on every activation.
    fn bindings(&self) -> Vec<BindingDecl>;

    /// One synchronous initial refresh, run immediately after bindings are
    /// established so the view reflects current state without waiting for a
    /// mutation.
    fn on_activate(&mut self, cx: &mut PresenterCx<'_>);

    /// One or more subscribed paths changed in the last batch. Multiple
    /// changes to paths sharing `slot` arrive as a single invocation.
    fn on_change(&mut self, slot: SlotId, cx: &mut PresenterCx<'_>);

    /// A scheduled refresh job completed and its generation still matches.
    /// Superseded and post-deactivation results are discarded before this
    /// point and never arrive here.
    fn on_job_complete(
        &mut self,
        result: Result<JobPayload, AsyncJobError>,
        cx: &mut PresenterCx<'_>,
    ) {
        let _ = (result, cx);
    }

    /// Bindings are removed by the stage; most presenters need no extra
    /// teardown.
    fn on_deactivate(&mut self) {}

    /// Typed access to the concrete presenter, used to read its view.
    fn as_any(&self) -> &dyn Any;
}

/// Capabilities handed to presenter callbacks: read and write state, and
/// schedule deferred refresh jobs. Writes made here are coalesced into the
/// current batch, subject to the per-batch once-per-slot guard.
pub struct PresenterCx<'a> {
    pub(crate) owner: PresenterId,
    pub(crate) store: &'a mut ObservableStore,
    pub(crate) registry: &'a BindingRegistry,
    pub(crate) dirty: &'a mut HashSet<(PresenterId, SlotId)>,
    pub(crate) scheduler: &'a mut RefreshScheduler,
}

impl PresenterCx<'_> {
    /// Current value at `path`, or `None` when absent.
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        self.store.get(path)
    }

    /// Deserialize the value at `path`. Absent or mistyped values read as
    /// `None`; presenters treat both as "not there yet".
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, path: &PropertyPath) -> Option<T> {
        let value = self.store.get(path)?.clone();
        serde_json::from_value(value).ok()
    }

    /// Mutate state from inside a callback. Affected bindings are marked
    /// dirty and fire later in this same batch unless they already fired,
    /// which bounds re-entrant recursion to one invocation per slot.
    pub fn set(&mut self, path: &PropertyPath, value: Value) -> Result<(), ConfigurationError> {
        self.store.set(path, value)?;
        for pair in self.registry.affected(path) {
            self.dirty.insert(pair);
        }
        Ok(())
    }

    /// Defer an expensive recomputation. Supersedes any outstanding job of
    /// this presenter: if the earlier job completes later, its result is
    /// discarded and never reaches the view.
    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = anyhow::Result<JobPayload>> + Send + 'static,
    {
        self.scheduler.schedule(self.owner, job);
    }
}
