//! Watchers
//!
//! A watcher runs a callback with the new and previous value of a source
//! whenever the source changes. It is an effect whose scheduler re-runs the
//! getter and hands both snapshots to the callback.
//!
//! Watching an observed object traverses it, so a change anywhere in the
//! object graph fires the callback.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, warn};

use super::computed::Computed;
use super::effect::{EffectOptions, ReactiveEffect, Scheduler};
use super::observed::Observed;
use super::refs::{Ref, RefValue};
use super::subscriber::{EffectId, EffectNode};
use super::value::Value;
use crate::graph::TargetId;

/// Something a watcher can observe.
pub trait WatchSource {
    type Output: Clone + 'static;

    /// The function the watcher's effect runs.
    fn into_getter(self) -> Box<dyn Fn() -> Self::Output>;
}

impl<F, T> WatchSource for F
where
    F: Fn() -> T + 'static,
    T: Clone + 'static,
{
    type Output = T;

    fn into_getter(self) -> Box<dyn Fn() -> T> {
        Box::new(self)
    }
}

impl WatchSource for Observed {
    type Output = Value;

    fn into_getter(self) -> Box<dyn Fn() -> Value> {
        let view = self.reactive();
        Box::new(move || {
            let value = Value::Object(view.clone());
            traverse(&value);
            value
        })
    }
}

impl WatchSource for Value {
    type Output = Value;

    fn into_getter(self) -> Box<dyn Fn() -> Value> {
        match self {
            Value::Object(object) => object.into_getter(),
            Value::Ref(r) => Box::new(move || r.value()),
            other => {
                warn!(kind = other.kind(), "watch source is not reactive");
                Box::new(move || other.clone())
            }
        }
    }
}

impl<T: RefValue> WatchSource for Ref<T> {
    type Output = T;

    fn into_getter(self) -> Box<dyn Fn() -> T> {
        Box::new(move || self.value())
    }
}

impl<T: Clone + 'static> WatchSource for Computed<T> {
    type Output = T;

    fn into_getter(self) -> Box<dyn Fn() -> T> {
        Box::new(move || self.value())
    }
}

/// Watcher options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Call the callback once at creation, with no previous value.
    pub immediate: bool,
}

impl WatchOptions {
    pub fn immediate() -> Self {
        Self { immediate: true }
    }
}

type Callback<T> = Box<dyn FnMut(&T, Option<&T>)>;

struct WatchState<T> {
    old: RefCell<Option<T>>,
    callback: RefCell<Callback<T>>,
}

/// Handle to a watcher. Dropping it disposes the watcher.
#[must_use = "dropping the handle stops the watcher"]
pub struct WatchHandle {
    effect: Rc<dyn EffectNode>,
}

impl WatchHandle {
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    pub fn id(&self) -> EffectId {
        self.effect.id()
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Call `callback(new, old)` whenever `source` changes.
///
/// Without `immediate`, the source is read once up front to record the
/// initial value and the callback first runs on the first change. With
/// `immediate`, the callback runs right away with `old = None`.
pub fn watch<S, C>(source: S, callback: C, options: WatchOptions) -> WatchHandle
where
    S: WatchSource,
    C: FnMut(&S::Output, Option<&S::Output>) + 'static,
{
    let state = Rc::new(WatchState {
        old: RefCell::new(None),
        callback: RefCell::new(Box::new(callback) as Callback<S::Output>),
    });

    let effect = ReactiveEffect::new_cyclic(
        source.into_getter(),
        EffectOptions::new().lazy(true),
        false,
        |weak| {
            let weak = weak.clone();
            let state = Rc::clone(&state);
            let scheduler: Scheduler = Rc::new(move || {
                if let Some(effect) = weak.upgrade() {
                    fire(&effect, &state);
                }
            });
            Some(scheduler)
        },
    );

    if options.immediate {
        fire(&effect, &state);
    } else {
        let initial = effect.run();
        state.old.replace(Some(initial));
    }

    WatchHandle { effect }
}

fn fire<T: Clone + 'static>(effect: &Rc<ReactiveEffect<T>>, state: &WatchState<T>) {
    let new = effect.run();
    let old = state.old.replace(Some(new.clone()));

    // A callback that changes its own source re-enters here.
    let Ok(mut callback) = state.callback.try_borrow_mut() else {
        debug!(effect = ?effect.id(), "watch callback already running, skipped");
        return;
    };
    (&mut *callback)(&new, old.as_ref());
}

/// Read every property reachable from `value`, so the running effect depends
/// on the whole object graph. Each object and ref is visited once.
pub fn traverse(value: &Value) {
    let mut objects = HashSet::new();
    let mut refs = HashSet::new();
    traverse_inner(value, &mut objects, &mut refs);
}

fn traverse_inner(value: &Value, objects: &mut HashSet<TargetId>, refs: &mut HashSet<usize>) {
    match value {
        Value::Object(object) => {
            if !objects.insert(object.id()) {
                return;
            }
            for item in object.values() {
                traverse_inner(&item, objects, refs);
            }
        }
        Value::Ref(r) => {
            if let Some(identity) = r.identity() {
                if !refs.insert(identity) {
                    return;
                }
            }
            traverse_inner(&r.value(), objects, refs);
        }
        _ => {}
    }
}
