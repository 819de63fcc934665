//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: plain
//! effects, the effect inside a computed value, and the effect inside a
//! watcher. The graph sees all of them through [`EffectNode`].

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::effect::DebuggerEvent;
use crate::graph::DepId;

/// Unique identifier for an effect.
///
/// Dependency sets are keyed by this ID, which is what keeps membership
/// unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of an effect, as held by the graph and the context stack.
pub(crate) trait EffectNode {
    fn id(&self) -> EffectId;

    /// `false` once stopped; inactive effects are never notified.
    fn is_active(&self) -> bool;

    /// Computed effects are notified ahead of plain effects.
    fn is_computed(&self) -> bool {
        false
    }

    /// Add a set to the reverse index.
    fn record_dep(&self, dep: DepId);

    /// A dependency changed: call the scheduler, or re-run.
    fn notify(self: Rc<Self>);

    fn stop(&self);

    fn on_track(&self, _event: &DebuggerEvent) {}

    fn on_trigger(&self, _event: &DebuggerEvent) {}
}
