//! Dependency Sets
//!
//! A dependency set holds the effects subscribed to one observed key. Sets
//! live in the tracker's arena and are addressed by [`DepId`]; effects keep
//! `DepId`s in their reverse index, never the sets themselves, so ownership
//! stays acyclic: sets hold weak handles to effects, effects hold indices.

use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::key::{Key, TargetId};
use crate::reactive::{EffectId, EffectNode};

/// Generational index of a dependency set in the tracker arena.
///
/// The generation makes a stale index (one whose slot was released and
/// reused) resolve to nothing instead of to the wrong set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// What a dependency set belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DepOwner {
    /// One key of an observed object.
    Property { target: TargetId, key: Key },
    /// The private set of a ref or computed value.
    Standalone,
}

/// The subscribers of one dependency point.
pub(crate) struct Dep {
    owner: DepOwner,
    subscribers: IndexMap<EffectId, Weak<dyn EffectNode>>,
}

impl Dep {
    pub(crate) fn new(owner: DepOwner) -> Self {
        Self {
            owner,
            subscribers: IndexMap::new(),
        }
    }

    pub(crate) fn owner(&self) -> &DepOwner {
        &self.owner
    }

    /// Add an effect. Returns `false` if it was already a member.
    pub(crate) fn insert(&mut self, effect: &Rc<dyn EffectNode>) -> bool {
        let id = effect.id();
        if self.subscribers.contains_key(&id) {
            return false;
        }
        self.subscribers.insert(id, Rc::downgrade(effect));
        true
    }

    pub(crate) fn remove(&mut self, id: EffectId) -> bool {
        self.subscribers.shift_remove(&id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: EffectId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Drop entries whose effect no longer exists.
    pub(crate) fn prune(&mut self) {
        self.subscribers.retain(|_, effect| effect.strong_count() > 0);
    }

    /// Upgrade every live subscriber, in insertion order.
    pub(crate) fn live(&self) -> impl Iterator<Item = Rc<dyn EffectNode>> + '_ {
        self.subscribers.values().filter_map(Weak::upgrade)
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("owner", &self.owner)
            .field("subscribers", &self.subscribers.keys().collect::<Vec<_>>())
            .finish()
    }
}
