//! Error types for the reactive runtime.

use thiserror::Error;

use crate::graph::{Key, TargetKind};

/// Errors returned by fallible reactive operations.
///
/// These are caller contract violations: they fail the call, not the
/// runtime. Tracking and triggering themselves never fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactiveError {
    /// A ref accessor was used on a value that is not a ref.
    #[error("expected a ref, found {found}")]
    NotARef { found: &'static str },

    /// A write was attempted through a readonly view.
    #[error("cannot write `{key}`: target is readonly")]
    ReadonlyTarget { key: Key },

    /// An array-only operation was used on a plain object.
    #[error("`{op}` requires an array target")]
    NotAnArray { op: &'static str },

    /// The key cannot name a property on this kind of target.
    #[error("`{key}` is not a valid key for an {kind} target")]
    InvalidKey { key: Key, kind: TargetKind },

    /// An array length was not a non-negative integer.
    #[error("invalid array length: {value}")]
    InvalidLength { value: String },

    /// Serialization reached an object that is already being serialized.
    #[error("cannot serialize a cyclic object graph")]
    Cycle,
}

/// Result alias for reactive operations.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_descriptive() {
        let err = ReactiveError::NotARef { found: "number" };
        assert_eq!(err.to_string(), "expected a ref, found number");

        let err = ReactiveError::ReadonlyTarget {
            key: Key::from("foo"),
        };
        assert_eq!(err.to_string(), "cannot write `foo`: target is readonly");

        let err = ReactiveError::InvalidKey {
            key: Key::from("foo"),
            kind: TargetKind::Array,
        };
        assert_eq!(err.to_string(), "`foo` is not a valid key for an array target");
    }
}
