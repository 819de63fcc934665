//! Computed Values
//!
//! A [`Computed`] is a cached derived value that re-evaluates only when its
//! dependencies change, and only when it is read.
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs at creation. The first read of `value()` runs the getter
//!    inside the computed's own effect and caches the result.
//!
//! 2. When a source changes, the effect's scheduler marks the computed dirty
//!    and notifies whatever read the computed. It does not recompute.
//!
//! 3. The next read recomputes. Reads while clean return the cache.
//!
//! A computed is both a subscriber (of its sources) and a dependency (of the
//! effects that read it). Within one trigger batch computed effects are
//! notified first, so a plain effect that reads a source and a computed
//! derived from it sees the invalidated computed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::effect::{EffectOptions, ReactiveEffect, Scheduler};
use super::subscriber::EffectId;
use crate::graph::{track_dep, trigger_dep, DepId, Runtime};

struct ComputedState<T> {
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    dep: DepId,
}

impl<T> Drop for ComputedState<T> {
    fn drop(&mut self) {
        Runtime::release_dep(self.dep);
    }
}

/// A lazily evaluated, cached derived value.
///
/// Cloning shares the cache and the effect.
#[must_use = "dropping the last handle stops the computed value's effect"]
pub struct Computed<T: Clone + 'static> {
    state: Rc<ComputedState<T>>,
    effect: Rc<ReactiveEffect<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value. The getter does not run until the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let state = Rc::new(ComputedState {
            value: RefCell::new(None),
            dirty: Cell::new(true),
            dep: Runtime::allocate_dep(),
        });

        let weak_state = Rc::downgrade(&state);
        let effect = ReactiveEffect::new_cyclic(
            Box::new(getter),
            EffectOptions::new().lazy(true),
            true,
            move |_| {
                let scheduler: Scheduler = Rc::new(move || {
                    let Some(state) = weak_state.upgrade() else {
                        return;
                    };
                    if !state.dirty.replace(true) {
                        trigger_dep(state.dep);
                    }
                });
                Some(scheduler)
            },
        );

        Self { state, effect }
    }

    /// Get the current value, recomputing if a dependency changed since the
    /// last read.
    ///
    /// Subscribes the running effect to this computed.
    pub fn value(&self) -> T {
        track_dep(self.state.dep);

        let cached = if self.state.dirty.get() {
            None
        } else {
            self.state.value.borrow().clone()
        };
        match cached {
            Some(value) => value,
            None => {
                let value = self.effect.run();
                self.state.value.replace(Some(value.clone()));
                self.state.dirty.set(false);
                value
            }
        }
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.state.value.borrow().is_some()
    }

    /// Stop tracking sources. The last computed value stays cached.
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    pub fn id(&self) -> EffectId {
        self.effect.id()
    }

    /// Number of sources read by the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.effect.dependency_count()
    }

    /// Number of effects that read this computed.
    pub fn subscriber_count(&self) -> usize {
        Runtime::with_tracker(|tracker| tracker.subscriber_count(self.state.dep))
    }
}

impl<T: Clone + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            effect: Rc::clone(&self.effect),
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("dirty", &self.is_dirty())
            .field("value", &*self.state.value.borrow())
            .finish()
    }
}

/// Create a computed value.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
