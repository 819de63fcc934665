//! Dependency Tracker
//!
//! The tracker is the two-level map `target -> key -> dependency set` plus
//! the arena the sets live in.
//!
//! # Trigger Resolution
//!
//! Given a write, [`Tracker::collect`] decides which sets are affected:
//!
//! 1. Writing `length` on an array collects the `length` set and every index
//!    set whose index is at or past the new length (shrinking deletes the
//!    trailing elements).
//! 2. Otherwise the set for the written key is collected, plus:
//!    - `Add` on an object: the iterate set (the key list grew)
//!    - `Add` of an index on an array: the `length` set
//!    - `Delete` on an object: the iterate set
//!
//! [`Tracker::batch`] then merges the sets into one deduplicated list of
//! effects.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;

use super::dep::{Dep, DepId, DepOwner};
use super::key::{Key, Target, TargetId, TargetKind, TriggerOp};
use crate::reactive::{EffectId, EffectNode, Value};

/// The dependency sets of one observed object.
#[derive(Debug)]
struct TargetEntry {
    kind: TargetKind,
    keys: IndexMap<Key, DepId>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    dep: Option<Dep>,
}

/// Counters describing the tracker's current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrackerStats {
    /// Observed objects with at least one dependency set.
    pub targets: usize,
    /// Live dependency sets, including standalone ones.
    pub deps: usize,
    /// Total subscriber entries across all sets.
    pub subscriptions: usize,
}

/// The dependency graph.
#[derive(Debug, Default)]
pub(crate) struct Tracker {
    targets: HashMap<TargetId, TargetEntry>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, owner: DepOwner) -> DepId {
        let dep = Dep::new(owner);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.dep = Some(dep);
            return DepId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            dep: Some(dep),
        });
        DepId {
            index,
            generation: 0,
        }
    }

    fn free_slot(&mut self, id: DepId) -> Option<Dep> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let dep = slot.dep.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(dep)
    }

    /// Look up the set for `(target, key)`, creating it when absent.
    pub(crate) fn dep_for(&mut self, target: Target, key: &Key) -> DepId {
        if let Some(id) = self
            .targets
            .get(&target.id())
            .and_then(|entry| entry.keys.get(key))
        {
            return *id;
        }

        let id = self.allocate(DepOwner::Property {
            target: target.id(),
            key: key.clone(),
        });
        self.targets
            .entry(target.id())
            .or_insert_with(|| TargetEntry {
                kind: target.kind(),
                keys: IndexMap::new(),
            })
            .keys
            .insert(key.clone(), id);
        id
    }

    /// Look up the set for `(target, key)` without creating it.
    pub(crate) fn find(&self, target: TargetId, key: &Key) -> Option<DepId> {
        self.targets.get(&target)?.keys.get(key).copied()
    }

    /// Allocate a set that is not part of any object's key map.
    pub(crate) fn allocate_standalone(&mut self) -> DepId {
        self.allocate(DepOwner::Standalone)
    }

    /// Release a standalone set. Property sets are released with their
    /// target.
    pub(crate) fn release(&mut self, id: DepId) {
        if let Some(dep) = self.dep(id) {
            if *dep.owner() != DepOwner::Standalone {
                return;
            }
        }
        self.free_slot(id);
    }

    pub(crate) fn dep(&self, id: DepId) -> Option<&Dep> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.dep.as_ref()
    }

    fn dep_mut(&mut self, id: DepId) -> Option<&mut Dep> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.dep.as_mut()
    }

    /// Add `effect` to the set. Returns `true` only for a new membership.
    pub(crate) fn subscribe(&mut self, id: DepId, effect: &Rc<dyn EffectNode>) -> bool {
        self.dep_mut(id).is_some_and(|dep| dep.insert(effect))
    }

    pub(crate) fn unsubscribe(&mut self, id: DepId, effect: EffectId) {
        if let Some(dep) = self.dep_mut(id) {
            dep.remove(effect);
        }
    }

    pub(crate) fn subscriber_count(&self, id: DepId) -> usize {
        self.dep(id).map_or(0, Dep::len)
    }

    #[cfg(test)]
    pub(crate) fn is_subscribed(&self, id: DepId, effect: EffectId) -> bool {
        self.dep(id).is_some_and(|dep| dep.contains(effect))
    }

    /// Resolve the sets affected by a write.
    pub(crate) fn collect(
        &self,
        target: TargetId,
        op: TriggerOp,
        key: &Key,
        new_value: Option<&Value>,
    ) -> SmallVec<[DepId; 4]> {
        let mut deps = SmallVec::new();
        let Some(entry) = self.targets.get(&target) else {
            return deps;
        };
        let is_array = entry.kind == TargetKind::Array;

        if is_array && *key == Key::Length {
            let new_len = new_value.and_then(Value::as_index);
            for (key, dep) in &entry.keys {
                match key {
                    Key::Length => deps.push(*dep),
                    Key::Index(index) if new_len.is_some_and(|len| *index >= len) => {
                        deps.push(*dep)
                    }
                    _ => {}
                }
            }
            return deps;
        }

        if let Some(dep) = entry.keys.get(key) {
            deps.push(*dep);
        }

        let implied = match op {
            TriggerOp::Add if !is_array => Some(Key::Iterate),
            TriggerOp::Add if key.is_index() => Some(Key::Length),
            TriggerOp::Delete if !is_array => Some(Key::Iterate),
            _ => None,
        };
        if let Some(dep) = implied.and_then(|key| entry.keys.get(&key)) {
            deps.push(*dep);
        }

        deps
    }

    /// Merge sets into one notification batch.
    ///
    /// Each effect appears once, computed values before plain effects, each
    /// group in first-seen order.
    pub(crate) fn batch(&mut self, deps: &[DepId]) -> SmallVec<[Rc<dyn EffectNode>; 8]> {
        let mut merged: IndexMap<EffectId, Rc<dyn EffectNode>> = IndexMap::new();
        for id in deps {
            if let Some(dep) = self.dep_mut(*id) {
                dep.prune();
                for effect in dep.live() {
                    merged.entry(effect.id()).or_insert(effect);
                }
            }
        }

        let (computed, plain): (Vec<_>, Vec<_>) =
            merged.into_values().partition(|effect| effect.is_computed());
        computed.into_iter().chain(plain).collect()
    }

    /// Drop every set belonging to `target`. Returns how many were released.
    pub(crate) fn release_target(&mut self, target: TargetId) -> usize {
        let Some(entry) = self.targets.remove(&target) else {
            return 0;
        };
        let mut released = 0;
        for id in entry.keys.into_values() {
            if self.free_slot(id).is_some() {
                released += 1;
            }
        }
        released
    }

    pub(crate) fn stats(&self) -> TrackerStats {
        let mut stats = TrackerStats {
            targets: self.targets.len(),
            ..TrackerStats::default()
        };
        for dep in self.slots.iter().filter_map(|slot| slot.dep.as_ref()) {
            stats.deps += 1;
            stats.subscriptions += dep.len();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::test_support::TestNode;

    fn keys_of(tracker: &Tracker, deps: &[DepId]) -> Vec<Key> {
        deps.iter()
            .filter_map(|id| match tracker.dep(*id)?.owner() {
                DepOwner::Property { key, .. } => Some(key.clone()),
                DepOwner::Standalone => None,
            })
            .collect()
    }

    #[test]
    fn dep_for_is_idempotent() {
        let mut tracker = Tracker::new();
        let target = Target::object();

        let a = tracker.dep_for(target, &Key::from("a"));
        let again = tracker.dep_for(target, &Key::from("a"));
        let b = tracker.dep_for(target, &Key::from("b"));

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(tracker.stats().targets, 1);
        assert_eq!(tracker.stats().deps, 2);
    }

    #[test]
    fn subscribe_is_unique() {
        let mut tracker = Tracker::new();
        let node = TestNode::new();
        let dep = tracker.dep_for(Target::object(), &Key::from("a"));

        assert!(tracker.subscribe(dep, &node.erased()));
        assert!(!tracker.subscribe(dep, &node.erased()));
        assert_eq!(tracker.subscriber_count(dep), 1);
        assert!(tracker.is_subscribed(dep, node.id()));

        tracker.unsubscribe(dep, node.id());
        assert_eq!(tracker.subscriber_count(dep), 0);
        assert!(!tracker.is_subscribed(dep, node.id()));
    }

    #[test]
    fn collect_set_on_object_collects_only_the_key() {
        let mut tracker = Tracker::new();
        let target = Target::object();
        tracker.dep_for(target, &Key::from("a"));
        tracker.dep_for(target, &Key::Iterate);

        let deps = tracker.collect(target.id(), TriggerOp::Set, &Key::from("a"), None);
        assert_eq!(keys_of(&tracker, &deps), vec![Key::from("a")]);
    }

    #[test]
    fn collect_add_and_delete_on_object_include_iterate() {
        let mut tracker = Tracker::new();
        let target = Target::object();
        tracker.dep_for(target, &Key::from("a"));
        tracker.dep_for(target, &Key::Iterate);

        let added = tracker.collect(target.id(), TriggerOp::Add, &Key::from("a"), None);
        assert_eq!(
            keys_of(&tracker, &added),
            vec![Key::from("a"), Key::Iterate]
        );

        let deleted = tracker.collect(target.id(), TriggerOp::Delete, &Key::from("a"), None);
        assert_eq!(
            keys_of(&tracker, &deleted),
            vec![Key::from("a"), Key::Iterate]
        );
    }

    #[test]
    fn collect_add_index_on_array_includes_length() {
        let mut tracker = Tracker::new();
        let target = Target::array();
        tracker.dep_for(target, &Key::Length);
        tracker.dep_for(target, &Key::Iterate);

        let deps = tracker.collect(target.id(), TriggerOp::Add, &Key::Index(3), None);
        assert_eq!(keys_of(&tracker, &deps), vec![Key::Length]);

        let deleted = tracker.collect(target.id(), TriggerOp::Delete, &Key::Index(0), None);
        assert!(deleted.is_empty());
    }

    #[test]
    fn collect_length_shrink_includes_trailing_indices() {
        let mut tracker = Tracker::new();
        let target = Target::array();
        for index in 0..4 {
            tracker.dep_for(target, &Key::Index(index));
        }
        tracker.dep_for(target, &Key::Length);

        let deps = tracker.collect(
            target.id(),
            TriggerOp::Set,
            &Key::Length,
            Some(&Value::from(1)),
        );
        assert_eq!(
            keys_of(&tracker, &deps),
            vec![Key::Index(1), Key::Index(2), Key::Index(3), Key::Length]
        );
    }

    #[test]
    fn batch_deduplicates_and_puts_computed_first() {
        let mut tracker = Tracker::new();
        let target = Target::object();
        let a = tracker.dep_for(target, &Key::from("a"));
        let b = tracker.dep_for(target, &Key::from("b"));

        let plain = TestNode::new();
        let derived = TestNode::computed();
        tracker.subscribe(a, &plain.erased());
        tracker.subscribe(b, &plain.erased());
        tracker.subscribe(b, &derived.erased());

        let batch = tracker.batch(&[a, b]);
        let ids: Vec<_> = batch.iter().map(|effect| effect.id()).collect();
        assert_eq!(ids, vec![derived.id(), plain.id()]);
    }

    #[test]
    fn batch_skips_dropped_effects() {
        let mut tracker = Tracker::new();
        let dep = tracker.allocate_standalone();
        let node = TestNode::new();
        tracker.subscribe(dep, &node.erased());
        drop(node);

        assert!(tracker.batch(&[dep]).is_empty());
        assert_eq!(tracker.subscriber_count(dep), 0);
    }

    #[test]
    fn released_slots_do_not_alias() {
        let mut tracker = Tracker::new();
        let old = tracker.allocate_standalone();
        tracker.release(old);
        let new = tracker.allocate_standalone();

        assert_eq!(old.index, new.index);
        assert_ne!(old, new);
        assert!(tracker.dep(old).is_none());
        assert!(tracker.dep(new).is_some());
    }

    #[test]
    fn release_target_frees_its_sets() {
        let mut tracker = Tracker::new();
        let target = Target::object();
        let a = tracker.dep_for(target, &Key::from("a"));
        tracker.dep_for(target, &Key::from("b"));

        assert_eq!(tracker.release_target(target.id()), 2);
        assert!(tracker.dep(a).is_none());
        assert_eq!(tracker.stats(), TrackerStats::default());
        assert!(tracker
            .collect(target.id(), TriggerOp::Set, &Key::from("a"), None)
            .is_empty());
    }
}
