//! The stage: single-threaded coordination of store, bindings, presenter
//! lifecycle, and deferred refresh delivery.

use std::collections::HashSet;

use serde_json::Value;

use callboard_types::PropertyPath;

use crate::error::{ConfigurationError, LifecycleError, StageError};
use crate::presenter::{Phase, Presenter, PresenterCx, PresenterId, SlotId};
use crate::registry::BindingRegistry;
use crate::scheduler::RefreshScheduler;
use crate::store::ObservableStore;

struct Entry {
    name: &'static str,
    // Taken out only for the duration of one callback dispatch.
    presenter: Option<Box<dyn Presenter>>,
    phase: Phase,
}

/// Owns the state root, the binding registry, the registered presenters,
/// and the refresh scheduler. All mutation and notification runs through
/// `&mut self`, so the store needs no locking.
///
/// Ordering guarantee: within one batch, all mutations apply and all
/// affected bindings fire, in registration order, strictly before any
/// deferred job completion is delivered (jobs are delivered only by
/// [`pump_jobs`](Stage::pump_jobs)).
pub struct Stage {
    store: ObservableStore,
    registry: BindingRegistry,
    scheduler: RefreshScheduler,
    presenters: Vec<Entry>,
    dirty: HashSet<(PresenterId, SlotId)>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: ObservableStore::new(),
            registry: BindingRegistry::default(),
            scheduler: RefreshScheduler::new(),
            presenters: Vec::new(),
            dirty: HashSet::new(),
        }
    }

    /// Register a presenter in the Created phase. Dependencies were already
    /// resolved by the presenter's constructor.
    pub fn add_presenter(&mut self, presenter: Box<dyn Presenter>) -> PresenterId {
        let id = PresenterId(self.presenters.len() as u32);
        tracing::debug!("registered presenter `{}`", presenter.name());
        self.presenters.push(Entry {
            name: presenter.name(),
            presenter: Some(presenter),
            phase: Phase::Created,
        });
        id
    }

    /// Activate: establish the declared bindings, then run one synchronous
    /// initial refresh so the view reflects current state immediately.
    ///
    /// Activating an already-active presenter is a [`LifecycleError`]. A
    /// binding declaration error rolls back every binding established so
    /// far, leaving the live-binding count at zero.
    pub fn activate(&mut self, id: PresenterId) -> Result<(), StageError> {
        let entry = self
            .presenters
            .get_mut(id.0 as usize)
            .ok_or(LifecycleError::UnknownPresenter(id))?;
        if entry.phase == Phase::Activated {
            return Err(LifecycleError::AlreadyActive(entry.name).into());
        }
        let name = entry.name;
        let decls = entry
            .presenter
            .as_ref()
            .map(|p| p.bindings())
            .unwrap_or_default();

        for decl in decls {
            if let Err(err) = self.registry.bind(id, decl.path, decl.slot) {
                self.registry.remove_owner(id);
                return Err(err.into());
            }
        }

        if let Some(entry) = self.presenters.get_mut(id.0 as usize) {
            entry.phase = Phase::Activated;
        }
        tracing::debug!("activated presenter `{name}`");

        self.dispatch(id, |presenter, cx| presenter.on_activate(cx));
        self.flush();
        Ok(())
    }

    /// Deactivate: remove every binding established during the preceding
    /// activated period and invalidate outstanding refresh jobs, so their
    /// eventual results are discarded unconditionally.
    ///
    /// Deactivating an inactive presenter is a [`LifecycleError`].
    pub fn deactivate(&mut self, id: PresenterId) -> Result<(), LifecycleError> {
        let entry = self
            .presenters
            .get_mut(id.0 as usize)
            .ok_or(LifecycleError::UnknownPresenter(id))?;
        if entry.phase != Phase::Activated {
            return Err(LifecycleError::NotActive(entry.name));
        }
        entry.phase = Phase::Deactivated;
        let name = entry.name;
        if let Some(presenter) = entry.presenter.as_mut() {
            presenter.on_deactivate();
        }

        let removed = self.registry.remove_owner(id);
        debug_assert_eq!(self.registry.live_count(id), 0);
        self.scheduler.invalidate(id);
        self.dirty.retain(|(owner, _)| *owner != id);
        tracing::debug!("deactivated presenter `{name}` ({removed} bindings removed)");
        Ok(())
    }

    /// Mutate one path and flush the resulting notifications as a batch of
    /// one.
    pub fn set(&mut self, path: &PropertyPath, value: Value) -> Result<(), ConfigurationError> {
        self.batch(|cx| cx.set(path, value))
    }

    /// Apply several mutations as one batch. Affected slots fire exactly
    /// once, after all sets, in registration order. Notifications run even
    /// when the closure returns an error, covering the sets that did apply.
    pub fn batch<F>(&mut self, f: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut BatchCx<'_>) -> Result<(), ConfigurationError>,
    {
        let mut cx = BatchCx {
            store: &mut self.store,
            registry: &self.registry,
            dirty: &mut self.dirty,
        };
        let result = f(&mut cx);
        self.flush();
        result
    }

    /// Deliver completed refresh jobs to their owners. Stale and
    /// post-deactivation results were already discarded by the scheduler,
    /// so everything delivered here is current.
    pub fn pump_jobs(&mut self) {
        for job in self.scheduler.drain() {
            if self.phase_of(job.owner) != Some(Phase::Activated) {
                continue;
            }
            self.dispatch(job.owner, |presenter, cx| {
                presenter.on_job_complete(job.result, cx);
            });
        }
        self.flush();
    }

    /// Current value at `path`, or `None` when absent.
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        self.store.get(path)
    }

    #[must_use]
    pub fn store(&self) -> &ObservableStore {
        &self.store
    }

    /// Typed read access to a concrete presenter (views are read through
    /// this).
    #[must_use]
    pub fn presenter<T: 'static>(&self, id: PresenterId) -> Option<&T> {
        self.presenters
            .get(id.0 as usize)?
            .presenter
            .as_ref()?
            .as_any()
            .downcast_ref()
    }

    #[must_use]
    pub fn phase_of(&self, id: PresenterId) -> Option<Phase> {
        self.presenters.get(id.0 as usize).map(|entry| entry.phase)
    }

    /// Number of live bindings currently owned by `id`.
    #[must_use]
    pub fn live_bindings(&self, id: PresenterId) -> usize {
        self.registry.live_count(id)
    }

    /// Fire dirty (presenter, slot) pairs in registration order until the
    /// batch settles. Each pair fires at most once per batch: a callback
    /// that re-marks an already-fired pair (directly or through a cycle of
    /// presenters) is not re-entered, which bounds the recursion.
    fn flush(&mut self) {
        let mut fired: HashSet<(PresenterId, SlotId)> = HashSet::new();
        while !self.dirty.is_empty() {
            let pending: Vec<(PresenterId, SlotId)> = self
                .registry
                .ordered_pairs()
                .into_iter()
                .filter(|pair| self.dirty.contains(pair))
                .collect();
            self.dirty.clear();
            for (owner, slot) in pending {
                if !fired.insert((owner, slot)) {
                    continue;
                }
                if self.phase_of(owner) != Some(Phase::Activated) {
                    continue;
                }
                self.dispatch(owner, |presenter, cx| presenter.on_change(slot, cx));
            }
        }
    }

    fn dispatch<F>(&mut self, id: PresenterId, call: F)
    where
        F: FnOnce(&mut dyn Presenter, &mut PresenterCx<'_>),
    {
        let Some(entry) = self.presenters.get_mut(id.0 as usize) else {
            return;
        };
        let Some(mut presenter) = entry.presenter.take() else {
            return;
        };
        {
            let mut cx = PresenterCx {
                owner: id,
                store: &mut self.store,
                registry: &self.registry,
                dirty: &mut self.dirty,
                scheduler: &mut self.scheduler,
            };
            call(presenter.as_mut(), &mut cx);
        }
        if let Some(entry) = self.presenters.get_mut(id.0 as usize) {
            entry.presenter = Some(presenter);
        }
    }
}

/// Mutation surface for [`Stage::batch`]: every set applies immediately;
/// affected bindings are coalesced and fire once when the batch ends.
pub struct BatchCx<'a> {
    store: &'a mut ObservableStore,
    registry: &'a BindingRegistry,
    dirty: &'a mut HashSet<(PresenterId, SlotId)>,
}

impl BatchCx<'_> {
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        self.store.get(path)
    }

    pub fn set(&mut self, path: &PropertyPath, value: Value) -> Result<(), ConfigurationError> {
        self.store.set(path, value)?;
        for pair in self.registry.affected(path) {
            self.dirty.insert(pair);
        }
        Ok(())
    }
}
