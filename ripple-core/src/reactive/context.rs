//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when an observed key is read,
//! the runtime subscribes the current computation to it.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When an effect runs, it pushes itself onto the stack; when its function
//! returns (or panics), the guard pops it and the enclosing computation is
//! current again.
//!
//! This design supports nested computations: an effect created inside
//! another effect's run collects its own dependencies, and the outer effect
//! resumes collecting into its own set after the inner one finishes.
//!
//! A second stack records whether tracking is enabled. Pausing tracking lets
//! code read observed state inside an effect without subscribing to it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::subscriber::{EffectId, EffectNode};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Rc<dyn EffectNode>>> = RefCell::new(Vec::new());
    static SHOULD_TRACK: Cell<bool> = Cell::new(true);
    static TRACK_STACK: RefCell<Vec<bool>> = RefCell::new(Vec::new());
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber_id: EffectId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given effect.
    ///
    /// While this context is active, reads register the effect as a
    /// dependent. Tracking is enabled for the duration of the context, even
    /// if the enclosing code had paused it.
    pub(crate) fn enter(effect: Rc<dyn EffectNode>) -> Self {
        let subscriber_id = effect.id();
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(effect));
        push_tracking(true);

        Self { subscriber_id }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the ID of the innermost running effect, if any.
    pub fn current_subscriber() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|effect| effect.id()))
    }

    /// Number of nested computations currently running.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Whether a read right now would be tracked.
    pub fn is_tracking() -> bool {
        SHOULD_TRACK.with(Cell::get) && Self::is_active()
    }

    /// The effect a read should subscribe, or `None` when nothing is running
    /// or tracking is paused.
    pub(crate) fn tracking_effect() -> Option<Rc<dyn EffectNode>> {
        if !SHOULD_TRACK.with(Cell::get) {
            return None;
        }
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK
            .try_with(|stack| stack.borrow_mut().pop())
            .ok()
            .flatten();

        // Verify we're popping the right context.
        if let Some(effect) = &popped {
            debug_assert_eq!(
                effect.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                effect.id()
            );
        }
        reset_tracking();

        // Dropped outside the stack borrow: this may be the last handle.
        drop(popped);
    }
}

fn push_tracking(enabled: bool) {
    let previous = SHOULD_TRACK.with(|flag| flag.replace(enabled));
    TRACK_STACK.with(|stack| stack.borrow_mut().push(previous));
}

/// Stop tracking reads until the matching [`reset_tracking`].
pub fn pause_tracking() {
    push_tracking(false);
}

/// Resume tracking reads until the matching [`reset_tracking`].
pub fn enable_tracking() {
    push_tracking(true);
}

/// Restore the tracking state saved by the last `pause_tracking` or
/// `enable_tracking`.
pub fn reset_tracking() {
    let previous = TRACK_STACK
        .try_with(|stack| stack.borrow_mut().pop())
        .ok()
        .flatten()
        .unwrap_or(true);
    let _ = SHOULD_TRACK.try_with(|flag| flag.set(previous));
}

/// Guard that restores the tracking state when dropped.
pub(crate) struct PausedTracking(());

impl PausedTracking {
    pub(crate) fn new() -> Self {
        pause_tracking();
        Self(())
    }
}

impl Drop for PausedTracking {
    fn drop(&mut self) {
        reset_tracking();
    }
}

/// Run `f` without tracking any reads it makes.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _paused = PausedTracking::new();
    f()
}
