//! Runtime Configuration
//!
//! Per-thread settings for the reactive runtime. Install with
//! [`Runtime::configure`](crate::graph::Runtime::configure).

use std::collections::HashSet;

use crate::graph::{Key, Symbol};

/// Settings consulted by the interception layer.
///
/// # Reserved Keys
///
/// Reads of a reserved key (via `get` or `has`) are never tracked. Which keys
/// deserve this is host-specific, so the set is configurable; the default
/// reserves the well-known symbols.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    reserved_keys: HashSet<Key>,
    warn_on_readonly_write: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            reserved_keys: Symbol::well_known_symbols()
                .into_iter()
                .map(Key::Symbol)
                .collect(),
            warn_on_readonly_write: true,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key whose reads are not tracked.
    pub fn with_reserved_key(mut self, key: impl Into<Key>) -> Self {
        self.reserved_keys.insert(key.into());
        self
    }

    /// Remove every reserved key, including the defaults.
    pub fn without_reserved_keys(mut self) -> Self {
        self.reserved_keys.clear();
        self
    }

    /// Whether rejected writes to readonly views are logged at `warn` level.
    pub fn warn_on_readonly_write(mut self, warn: bool) -> Self {
        self.warn_on_readonly_write = warn;
        self
    }

    pub fn is_reserved(&self, key: &Key) -> bool {
        self.reserved_keys.contains(key)
    }

    pub fn reserved_keys(&self) -> impl Iterator<Item = &Key> {
        self.reserved_keys.iter()
    }

    pub fn warns_on_readonly_write(&self) -> bool {
        self.warn_on_readonly_write
    }
}
