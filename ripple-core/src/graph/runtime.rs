//! Reactive Runtime
//!
//! The runtime owns the tracker and the configuration for one thread, and
//! exposes the two hooks an interception layer calls: [`track`] on reads and
//! [`trigger`] on writes.
//!
//! # How It Works
//!
//! 1. A read of `(target, key)` while an effect is running calls `track`,
//!    which subscribes the running effect to that key's dependency set and
//!    records the set in the effect's reverse index.
//!
//! 2. A write calls `trigger`, which resolves the affected sets, merges them
//!    into one batch and notifies each effect once. An effect with a
//!    scheduler gets its scheduler called; any other effect re-runs.
//!
//! 3. The effect that is running when the write happens is skipped, so an
//!    effect that reads and writes the same key does not recurse into itself.
//!
//! 4. Notifications go through one queue per thread. The outermost trigger
//!    drains it; a trigger raised while it drains (a computed value marking
//!    itself dirty, an effect writing state) only enqueues. An effect already
//!    waiting in the queue is not added twice, and computed effects are always
//!    taken ahead of plain ones, so an effect that reads both a source and a
//!    value computed from it runs once per write.
//!
//! # Thread Confinement
//!
//! The runtime state is thread-local. Effects, refs and observed objects are
//! `!Send` and belong to the thread that created them; each thread is an
//! independent reactive world. Sharing reactive state across threads requires
//! one runtime per execution context and is not supported.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use tracing::{debug, trace};

use super::dep::DepId;
use super::key::{Key, Target, TargetId, TrackOp, TriggerOp};
use super::tracker::{Tracker, TrackerStats};
use crate::config::RuntimeConfig;
use crate::reactive::{DebuggerEvent, EffectId, EffectNode, ReactiveContext, Value};

struct RuntimeState {
    tracker: RefCell<Tracker>,
    config: RefCell<RuntimeConfig>,
    queue: RefCell<NotifyQueue>,
}

thread_local! {
    static STATE: RuntimeState = RuntimeState {
        tracker: RefCell::new(Tracker::new()),
        config: RefCell::new(RuntimeConfig::default()),
        queue: RefCell::new(NotifyQueue::default()),
    };
}

/// The write that caused a notification.
struct Cause {
    target: Option<TargetId>,
    key: Key,
    op: TriggerOp,
}

impl Cause {
    fn event(&self, effect: EffectId) -> DebuggerEvent {
        DebuggerEvent::trigger(effect, self.target, Some(self.key.clone()), self.op)
    }
}

type Pending = (Rc<dyn EffectNode>, Rc<Cause>);

#[derive(Default)]
struct NotifyQueue {
    draining: bool,
    computed: VecDeque<Pending>,
    plain: VecDeque<Pending>,
    queued: HashSet<EffectId>,
}

impl NotifyQueue {
    fn push(&mut self, effect: Rc<dyn EffectNode>, cause: &Rc<Cause>) {
        if !self.queued.insert(effect.id()) {
            return;
        }
        let entry = (effect, Rc::clone(cause));
        if entry.0.is_computed() {
            self.computed.push_back(entry);
        } else {
            self.plain.push_back(entry);
        }
    }

    fn pop(&mut self) -> Option<Pending> {
        let entry = self
            .computed
            .pop_front()
            .or_else(|| self.plain.pop_front())?;
        self.queued.remove(&entry.0.id());
        Some(entry)
    }
}

/// Resets the queue when the outermost drain ends, including by unwinding.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let leftover = STATE
            .try_with(|state| {
                state
                    .queue
                    .try_borrow_mut()
                    .ok()
                    .map(|mut queue| std::mem::take(&mut *queue))
            })
            .ok()
            .flatten();
        drop(leftover);
    }
}

/// The thread-local reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Replace this thread's configuration.
    pub fn configure(config: RuntimeConfig) {
        STATE.with(|state| *state.config.borrow_mut() = config);
    }

    /// Get a copy of this thread's configuration.
    pub fn config() -> RuntimeConfig {
        STATE.with(|state| state.config.borrow().clone())
    }

    /// Whether reads of `key` are excluded from tracking.
    pub fn is_reserved(key: &Key) -> bool {
        STATE.with(|state| state.config.borrow().is_reserved(key))
    }

    pub(crate) fn warns_on_readonly_write() -> bool {
        STATE.with(|state| state.config.borrow().warns_on_readonly_write())
    }

    /// Current size of the dependency graph.
    pub fn stats() -> TrackerStats {
        Self::with_tracker(|tracker| tracker.stats())
    }

    /// Number of effects subscribed to `(target, key)`.
    pub fn subscriber_count(target: TargetId, key: &Key) -> usize {
        Self::with_tracker(|tracker| {
            tracker
                .find(target, key)
                .map_or(0, |dep| tracker.subscriber_count(dep))
        })
    }

    /// Drop all dependency metadata for `target`.
    ///
    /// Observed objects do this when their last handle is dropped; an
    /// interception layer with its own object model calls it when an object
    /// is no longer tracked.
    pub fn release_target(target: TargetId) {
        let released = Self::with_tracker(|tracker| tracker.release_target(target));
        if released > 0 {
            debug!(target_id = target.raw(), released, "released target dependencies");
        }
    }

    pub(crate) fn with_tracker<R>(f: impl FnOnce(&mut Tracker) -> R) -> R {
        STATE.with(|state| f(&mut state.tracker.borrow_mut()))
    }

    /// Like [`Runtime::with_tracker`], but returns `None` instead of
    /// panicking when the tracker is unavailable (thread teardown, or an
    /// outer borrow). Used from `Drop` implementations.
    pub(crate) fn try_with_tracker<R>(f: impl FnOnce(&mut Tracker) -> R) -> Option<R> {
        STATE
            .try_with(|state| {
                state
                    .tracker
                    .try_borrow_mut()
                    .ok()
                    .map(|mut tracker| f(&mut tracker))
            })
            .ok()
            .flatten()
    }

    pub(crate) fn allocate_dep() -> DepId {
        Self::with_tracker(|tracker| tracker.allocate_standalone())
    }

    pub(crate) fn release_dep(dep: DepId) {
        Self::try_with_tracker(|tracker| tracker.release(dep));
    }
}

/// Record that the running effect read `key` on `target`.
///
/// A no-op when no effect is running or tracking is paused.
pub fn track(target: Target, op: TrackOp, key: &Key) {
    let Some(effect) = ReactiveContext::tracking_effect() else {
        return;
    };
    let dep = Runtime::with_tracker(|tracker| tracker.dep_for(target, key));
    subscribe(&effect, dep, || {
        DebuggerEvent::track(effect.id(), Some(target.id()), Some(key.clone()), op)
    });
}

/// Notify everything that depends on `key` of `target`.
///
/// `new_value` is only consulted for array `length` writes, where it is the
/// new length.
pub fn trigger(target: Target, op: TriggerOp, key: &Key, new_value: Option<&Value>) {
    let deps = Runtime::with_tracker(|tracker| tracker.collect(target.id(), op, key, new_value));
    trace!(target_id = target.id().raw(), %key, %op, deps = deps.len(), "trigger");
    if deps.is_empty() {
        return;
    }
    let cause = Cause {
        target: Some(target.id()),
        key: key.clone(),
        op,
    };
    notify(&deps, cause);
}

/// Track a read of a standalone dependency set (refs, computed values).
pub(crate) fn track_dep(dep: DepId) {
    let Some(effect) = ReactiveContext::tracking_effect() else {
        return;
    };
    subscribe(&effect, dep, || {
        DebuggerEvent::track(effect.id(), None, Some(Key::from("value")), TrackOp::Get)
    });
}

/// Trigger a standalone dependency set.
pub(crate) fn trigger_dep(dep: DepId) {
    let cause = Cause {
        target: None,
        key: Key::from("value"),
        op: TriggerOp::Set,
    };
    notify(&[dep], cause);
}

fn subscribe(
    effect: &Rc<dyn EffectNode>,
    dep: DepId,
    event: impl FnOnce() -> DebuggerEvent,
) {
    let inserted = Runtime::with_tracker(|tracker| tracker.subscribe(dep, effect));
    if inserted {
        effect.record_dep(dep);
        effect.on_track(&event());
    }
}

fn notify(deps: &[DepId], cause: Cause) {
    let batch = Runtime::with_tracker(|tracker| tracker.batch(deps));
    let running = ReactiveContext::current_subscriber();
    let cause = Rc::new(cause);

    let drain = STATE.with(|state| {
        let mut queue = state.queue.borrow_mut();
        for effect in batch {
            if Some(effect.id()) == running {
                trace!(effect = ?effect.id(), "skipping self-trigger");
                continue;
            }
            if effect.is_active() {
                queue.push(effect, &cause);
            }
        }
        !std::mem::replace(&mut queue.draining, true)
    });

    if drain {
        let _guard = DrainGuard;
        while let Some((effect, cause)) = STATE.with(|state| state.queue.borrow_mut().pop()) {
            if !effect.is_active() {
                continue;
            }
            effect.on_trigger(&cause.event(effect.id()));
            effect.notify();
        }
    }
}
