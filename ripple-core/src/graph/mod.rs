//! Dependency Graph
//!
//! This module implements the graph that records which effects read which
//! keys of which observed objects.
//!
//! # Overview
//!
//! The graph is a two-level mapping:
//!
//! - Each observed object (a [`Target`]) maps its keys to dependency sets
//! - Each dependency set holds the effects that read that key
//!
//! Refs and computed values bypass the per-object map: each owns one
//! standalone set in the same arena.
//!
//! # Design Decisions
//!
//! 1. Sets live in an arena indexed by generational [`DepId`]s. Effects keep
//!    indices into the arena (their reverse index), sets keep weak handles to
//!    effects. Nothing owns anything in a cycle.
//!
//! 2. The reverse index is what makes branch cleanup cheap: before an effect
//!    re-runs it leaves exactly the sets it is a member of, then rejoins the
//!    ones its new run reads.
//!
//! 3. Object metadata is released explicitly (by [`Runtime::release_target`],
//!    which observed objects call when dropped), never by a garbage collector.

mod dep;
mod key;
mod runtime;
mod tracker;

pub use dep::DepId;
pub(crate) use runtime::{track_dep, trigger_dep};
pub use key::{Key, Symbol, Target, TargetId, TargetKind, TrackOp, TriggerOp};
pub use runtime::{track, trigger, Runtime};
pub use tracker::TrackerStats;
