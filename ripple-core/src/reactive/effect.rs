//! Effect Implementation
//!
//! An Effect is a computation that re-runs whenever the observed state it
//! read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies (unless created lazily).
//!
//! 2. When any dependency changes, the effect either re-runs or, if it has a
//!    scheduler, hands control to the scheduler.
//!
//! 3. Before re-running, the effect leaves every dependency set in its
//!    reverse index and clears the index. The run rebuilds it from scratch,
//!    so a key the new run no longer reads stops notifying the effect.
//!
//! # Lifetime
//!
//! Dependency sets hold effects weakly. An effect lives as long as its
//! [`EffectRunner`] (or the computed value or watcher that owns it); dropping
//! the last handle disposes it. [`EffectRunner::stop`] disposes it early and
//! leaves the handle usable for untracked manual runs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::subscriber::{EffectId, EffectNode};
use crate::graph::{DepId, Key, Runtime, TargetId, TrackOp, TriggerOp};

/// Callback that receives control instead of the effect re-running.
pub type Scheduler = Rc<dyn Fn()>;

/// Callback receiving tracking/triggering events for one effect.
pub type DebuggerHook = Rc<dyn Fn(&DebuggerEvent)>;

/// Which side of the graph a [`DebuggerEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "op", rename_all = "lowercase")]
pub enum DebuggerPhase {
    Track(TrackOp),
    Trigger(TriggerOp),
}

/// A dependency being recorded, or a notification being delivered.
///
/// `target` is `None` for the private set of a ref or computed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebuggerEvent {
    pub effect: EffectId,
    pub target: Option<TargetId>,
    pub key: Option<Key>,
    #[serde(flatten)]
    pub phase: DebuggerPhase,
}

impl DebuggerEvent {
    pub(crate) fn track(
        effect: EffectId,
        target: Option<TargetId>,
        key: Option<Key>,
        op: TrackOp,
    ) -> Self {
        Self {
            effect,
            target,
            key,
            phase: DebuggerPhase::Track(op),
        }
    }

    pub(crate) fn trigger(
        effect: EffectId,
        target: Option<TargetId>,
        key: Option<Key>,
        op: TriggerOp,
    ) -> Self {
        Self {
            effect,
            target,
            key,
            phase: DebuggerPhase::Trigger(op),
        }
    }
}

/// Options accepted by [`effect_with`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    pub(crate) lazy: bool,
    pub(crate) scheduler: Option<Scheduler>,
    pub(crate) on_track: Option<DebuggerHook>,
    pub(crate) on_trigger: Option<DebuggerHook>,
    pub(crate) on_stop: Option<Rc<dyn Fn()>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the effect on creation.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Call `scheduler` on invalidation instead of re-running.
    pub fn scheduler(mut self, scheduler: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn on_track(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_track = Some(Rc::new(hook));
        self
    }

    pub fn on_trigger(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_trigger = Some(Rc::new(hook));
        self
    }

    pub fn on_stop(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_stop = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .field("on_track", &self.on_track.is_some())
            .field("on_trigger", &self.on_trigger.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// The effect itself: a function plus its dependency bookkeeping.
pub(crate) struct ReactiveEffect<T> {
    id: EffectId,
    getter: Box<dyn Fn() -> T>,

    /// Reverse index: every set this effect is currently a member of.
    deps: RefCell<SmallVec<[DepId; 4]>>,

    scheduler: Option<Scheduler>,
    active: Cell<bool>,
    computed: bool,
    run_count: Cell<usize>,
    on_track: Option<DebuggerHook>,
    on_trigger: Option<DebuggerHook>,
    on_stop: Option<Rc<dyn Fn()>>,
}

impl<T: 'static> ReactiveEffect<T> {
    pub(crate) fn new(getter: Box<dyn Fn() -> T>, options: EffectOptions) -> Rc<Self> {
        Self::new_cyclic(getter, options, false, |_| None)
    }

    /// Build an effect whose scheduler needs a handle back to the effect.
    ///
    /// `scheduler` receives a weak handle and returns the scheduler to
    /// install; it overrides any scheduler in `options`.
    pub(crate) fn new_cyclic(
        getter: Box<dyn Fn() -> T>,
        options: EffectOptions,
        computed: bool,
        scheduler: impl FnOnce(&Weak<Self>) -> Option<Scheduler>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            id: EffectId::new(),
            getter,
            deps: RefCell::new(SmallVec::new()),
            scheduler: scheduler(weak).or(options.scheduler),
            active: Cell::new(true),
            computed,
            run_count: Cell::new(0),
            on_track: options.on_track,
            on_trigger: options.on_trigger,
            on_stop: options.on_stop,
        })
    }

    /// Run the function, collecting a fresh set of dependencies.
    ///
    /// A stopped effect still runs its function, but untracked.
    pub(crate) fn run(self: &Rc<Self>) -> T {
        if !self.active.get() {
            return (self.getter)();
        }

        self.cleanup();
        self.run_count.set(self.run_count.get() + 1);
        trace!(effect = ?self.id, depth = ReactiveContext::depth(), "running effect");

        let _ctx = ReactiveContext::enter(self.clone());
        (self.getter)()
    }

    /// Leave every set in the reverse index.
    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        if deps.is_empty() {
            return;
        }
        Runtime::with_tracker(|tracker| {
            for dep in &deps {
                tracker.unsubscribe(*dep, self.id);
            }
        });
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn run_count(&self) -> usize {
        self.run_count.get()
    }

    pub(crate) fn dependency_count(&self) -> usize {
        self.deps.borrow().len()
    }

    pub(crate) fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }
        self.cleanup();
        debug!(effect = ?self.id, "effect stopped");
        if let Some(on_stop) = &self.on_stop {
            on_stop();
        }
    }
}

impl<T: 'static> EffectNode for ReactiveEffect<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn is_computed(&self) -> bool {
        self.computed
    }

    fn record_dep(&self, dep: DepId) {
        self.deps.borrow_mut().push(dep);
    }

    fn notify(self: Rc<Self>) {
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => {
                self.run();
            }
        }
    }

    fn stop(&self) {
        ReactiveEffect::stop(self);
    }

    fn on_track(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.on_track {
            hook(event);
        }
    }

    fn on_trigger(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.on_trigger {
            hook(event);
        }
    }
}

impl<T> Drop for ReactiveEffect<T> {
    fn drop(&mut self) {
        let deps = std::mem::take(self.deps.get_mut());
        if deps.is_empty() {
            return;
        }
        let id = self.id;
        Runtime::try_with_tracker(|tracker| {
            for dep in &deps {
                tracker.unsubscribe(*dep, id);
            }
        });
    }
}

/// Handle to a running effect.
///
/// Cloning shares the effect. Dropping the last handle disposes the effect.
///
/// # Example
///
/// ```rust,ignore
/// let state = Observed::object([("count", 0)]).reactive();
///
/// let runner = effect({
///     let state = state.clone();
///     move || println!("Count is: {:?}", state.get("count"))
/// });
///
/// state.set("count", 5)?;  // Prints: "Count is: Number(5.0)"
/// ```
#[must_use = "dropping the runner stops the effect"]
pub struct EffectRunner<T: 'static = ()> {
    effect: Rc<ReactiveEffect<T>>,
}

impl<T: 'static> EffectRunner<T> {
    /// Run the effect manually, returning the function's result.
    pub fn run(&self) -> T {
        self.effect.run()
    }

    /// Unsubscribe from every dependency and never be notified again.
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    pub fn id(&self) -> EffectId {
        self.effect.id()
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Number of dependency sets the effect is currently a member of.
    pub fn dependency_count(&self) -> usize {
        self.effect.dependency_count()
    }
}

impl<T: 'static> Clone for EffectRunner<T> {
    fn clone(&self) -> Self {
        Self {
            effect: Rc::clone(&self.effect),
        }
    }
}

impl<T: 'static> fmt::Debug for EffectRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRunner")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Create an effect and run it once.
pub fn effect<T, F>(f: F) -> EffectRunner<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    effect_with(f, EffectOptions::default())
}

/// Create an effect with options.
pub fn effect_with<T, F>(f: F, options: EffectOptions) -> EffectRunner<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    let lazy = options.lazy;
    let effect = ReactiveEffect::new(Box::new(f), options);
    if !lazy {
        effect.run();
    }
    EffectRunner { effect }
}

/// Stop an effect. Equivalent to [`EffectRunner::stop`].
pub fn stop<T: 'static>(runner: &EffectRunner<T>) {
    runner.stop();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
