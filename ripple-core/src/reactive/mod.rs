//! Reactive Primitives
//!
//! This module implements the user-facing side of the reactive system:
//! effects, computed values, refs, watchers and observed objects. The
//! dependency graph they feed lives in [`crate::graph`].
//!
//! # Concepts
//!
//! ## Effects
//!
//! An effect is a computation that re-runs whenever the state it read
//! changes. Every run starts by leaving all the dependency sets it joined
//! last time, so dependencies always reflect the latest run only.
//!
//! ## Computed Values
//!
//! A computed value caches the result of a getter. A change to one of its
//! sources marks it dirty; the getter runs again on the next read, not
//! before.
//!
//! ## Refs
//!
//! A ref is a single reactive cell with its own dependency set. Property
//! refs (`to_ref`) instead forward to one property of an observed object.
//!
//! ## Observed Objects
//!
//! `Observed` handles are how object state becomes reactive: reads through a
//! reactive view are tracked, writes are triggered.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local context stack to detect
//! dependencies automatically. When state is read, the innermost running
//! effect (if any, and unless tracking is paused) is subscribed to it.

mod computed;
mod context;
mod effect;
mod observed;
mod refs;
mod subscriber;
mod value;
mod watch;

#[cfg(test)]
pub(crate) mod test_support;

pub use computed::{computed, Computed};
pub use context::{enable_tracking, pause_tracking, reset_tracking, untracked, ReactiveContext};
pub use effect::{
    effect, effect_with, stop, DebuggerEvent, DebuggerHook, DebuggerPhase, EffectOptions,
    EffectRunner, Scheduler,
};
pub use observed::{
    reactive, readonly, shallow_reactive, shallow_readonly, to_raw, Mode, Observed,
    MAX_ARRAY_LENGTH,
};
pub use refs::{
    is_ref, ref_, ref_get, ref_set, to_ref, to_refs, unref, PropertyRef, Ref, RefValue, ValueRef,
};
pub use subscriber::EffectId;
pub(crate) use subscriber::EffectNode;
pub use value::Value;
pub use watch::{traverse, watch, WatchHandle, WatchOptions, WatchSource};
