//! Ripple Core
//!
//! A fine-grained reactive dependency-tracking engine. Computations
//! ("effects") read mutable state; the engine records exactly what each one
//! read and re-runs, or schedules, exactly the affected computations when
//! that state changes.
//!
//! It implements:
//!
//! - The dependency graph and the track/trigger hooks, including array
//!   length semantics
//! - Effects with nested execution and branch cleanup
//! - Lazy cached computed values
//! - Refs, property refs and watchers
//! - An observed object model (reactive, shallow and readonly views)
//!
//! # Architecture
//!
//! - `graph`: dependency sets, the tracker and the thread-local runtime
//! - `reactive`: effects, computed values, refs, watchers and observed objects
//! - `config`: per-thread runtime configuration
//! - `error`: error types for fallible operations
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::reactive::{computed, effect, Observed};
//!
//! let state = Observed::object([("count", 0)]).reactive();
//!
//! // Create a derived value
//! let doubled = computed({
//!     let state = state.clone();
//!     move || state.get("count").as_number().unwrap_or_default() * 2.0
//! });
//!
//! // Create an effect
//! let _runner = effect({
//!     let state = state.clone();
//!     move || println!("Count: {:?}, Doubled: {}", state.get("count"), doubled.value())
//! });
//!
//! // Update the state
//! state.set("count", 5)?;
//! // Effect automatically runs, prints: "Count: Number(5.0), Doubled: 10"
//! ```
//!
//! # Threading
//!
//! Everything here is single-threaded. Each thread owns an independent
//! runtime; reactive handles are `!Send`.

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use graph::Runtime;
