//! Path subscriptions with registration-order notification.

use callboard_types::PropertyPath;

use crate::error::ConfigurationError;
use crate::presenter::{PresenterId, SlotId};

/// Identifies one live binding. Obtained from `bind`, consumed by `unbind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

#[derive(Debug)]
struct Binding {
    id: BindingId,
    owner: PresenterId,
    path: PropertyPath,
    slot: SlotId,
}

/// The set of live (path, slot, owner) bindings.
///
/// Bindings fire in registration order. Coalescing happens above this
/// registry: the stage keeps a per-batch dirty set keyed on
/// (presenter, slot) so each pair fires at most once per batch regardless
/// of how many of its subscribed paths changed.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
    next_id: u64,
}

impl BindingRegistry {
    /// Register `slot` against `path`. A duplicate (path, slot) pair for the
    /// same owner is a setup error.
    pub fn bind(
        &mut self,
        owner: PresenterId,
        path: PropertyPath,
        slot: SlotId,
    ) -> Result<BindingId, ConfigurationError> {
        if self
            .bindings
            .iter()
            .any(|b| b.owner == owner && b.slot == slot && b.path == path)
        {
            return Err(ConfigurationError::DuplicateBinding { path, slot });
        }
        let id = BindingId(self.next_id);
        self.next_id += 1;
        self.bindings.push(Binding {
            id,
            owner,
            path,
            slot,
        });
        Ok(id)
    }

    /// Register one slot against several paths. Any combination of those
    /// paths changing within one batch triggers exactly one invocation.
    pub fn bind_many(
        &mut self,
        owner: PresenterId,
        paths: Vec<PropertyPath>,
        slot: SlotId,
    ) -> Result<Vec<BindingId>, ConfigurationError> {
        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            ids.push(self.bind(owner, path, slot)?);
        }
        Ok(ids)
    }

    /// Remove one binding. Removing an already-removed binding is a no-op.
    pub fn unbind(&mut self, id: BindingId) {
        self.bindings.retain(|b| b.id != id);
    }

    /// Drop every binding owned by `owner`; returns how many were removed.
    pub fn remove_owner(&mut self, owner: PresenterId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.owner != owner);
        before - self.bindings.len()
    }

    /// Number of live bindings owned by `owner`.
    #[must_use]
    pub fn live_count(&self, owner: PresenterId) -> usize {
        self.bindings.iter().filter(|b| b.owner == owner).count()
    }

    /// (owner, slot) pairs whose subscribed path is a prefix of, or equal
    /// to, `changed`, in registration order.
    pub(crate) fn affected<'a>(
        &'a self,
        changed: &'a PropertyPath,
    ) -> impl Iterator<Item = (PresenterId, SlotId)> + 'a {
        self.bindings
            .iter()
            .filter(move |b| b.path.is_prefix_of(changed))
            .map(|b| (b.owner, b.slot))
    }

    /// All (owner, slot) pairs in registration order, first occurrence only.
    /// The stage intersects this with its dirty set to fire callbacks in a
    /// stable order.
    pub(crate) fn ordered_pairs(&self) -> Vec<(PresenterId, SlotId)> {
        let mut seen = Vec::new();
        for binding in &self.bindings {
            let pair = (binding.owner, binding.slot);
            if !seen.contains(&pair) {
                seen.push(pair);
            }
        }
        seen
    }
}
