//! Dynamic Values
//!
//! [`Value`] is what observed objects store: primitives, nested objects and
//! arrays, and refs. Objects are handles, so equality between two object
//! values is identity, not structure.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number};

use super::observed::Observed;
use super::refs::{Ref, ValueRef};
use crate::error::{ReactiveError, Result};
use crate::graph::{Key, TargetId};

/// A value held by an observed object or a ref.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Observed),
    Ref(ValueRef),
}

/// Same-value equality for numbers: `NaN` equals `NaN`, `0.0` differs from
/// `-0.0`.
pub(crate) fn same_number(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

impl Value {
    /// Identity-or-NaN-aware equality.
    ///
    /// Primitives compare by value (with `NaN` equal to itself), objects and
    /// refs by identity. Two distinct objects with equal contents are
    /// different values.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_number(*a, *b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// A short name for the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(object) if object.is_array() => "array",
            Value::Object(_) => "object",
            Value::Ref(_) => "ref",
        }
    }

    /// Create a new plain object value.
    pub fn object<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Value::Object(Observed::object(entries))
    }

    /// Create a new array value.
    pub fn array<I, V>(items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Object(Observed::array(items))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Observed> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_value_ref(&self) -> Option<&ValueRef> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// The value as an array index or length: a finite, non-negative,
    /// integral number.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => {
                if *n <= usize::MAX as f64 {
                    Some(*n as usize)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The canonical form used for comparisons: objects as their raw handle.
    pub fn to_raw(&self) -> Value {
        match self {
            Value::Object(object) => Value::Object(object.to_raw()),
            other => other.clone(),
        }
    }

    /// Objects as their reactive view; everything else unchanged.
    pub fn to_reactive(&self) -> Value {
        match self {
            Value::Object(object) => Value::Object(object.reactive()),
            other => other.clone(),
        }
    }

    /// Build a value tree from JSON. Every object and array becomes a new
    /// raw observed object.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from_json))
            }
            serde_json::Value::Object(map) => Value::object(
                map.into_iter()
                    .map(|(key, value)| (Key::parse(&key), Value::from_json(value))),
            ),
        }
    }

    /// Convert to JSON without tracking any reads.
    ///
    /// `undefined` properties are omitted, `undefined` array slots and
    /// non-finite numbers become `null`, refs serialize as their value and
    /// symbol keys are skipped. Fails on cyclic object graphs.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.to_json_inner(&mut HashSet::new())
    }

    fn to_json_inner(&self, visiting: &mut HashSet<TargetId>) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Ref(r) => r.value_untracked().to_json_inner(visiting)?,
            Value::Object(object) => {
                if !visiting.insert(object.id()) {
                    return Err(ReactiveError::Cycle);
                }
                let json = if object.is_array() {
                    let items = object
                        .raw_values()
                        .iter()
                        .map(|item| item.to_json_inner(visiting))
                        .collect::<Result<Vec<_>>>()?;
                    serde_json::Value::Array(items)
                } else {
                    let mut map = Map::new();
                    for (key, value) in object.raw_entries() {
                        if value.is_undefined() || matches!(key, Key::Symbol(_)) {
                            continue;
                        }
                        map.insert(key.to_string(), value.to_json_inner(visiting)?);
                    }
                    serde_json::Value::Object(map)
                };
                visiting.remove(&object.id());
                json
            }
        })
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n:?})"),
            Value::String(s) => write!(f, "String({s:?})"),
            // Objects print by identity; their contents may be cyclic.
            Value::Object(object) if object.is_array() => {
                write!(f, "Array(#{})", object.id().raw())
            }
            Value::Object(object) => write!(f, "Object(#{})", object.id().raw()),
            Value::Ref(_) => f.write_str("Ref(..)"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(f64, f32, i32, i64, u32, u64, usize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Observed> for Value {
    fn from(object: Observed) -> Self {
        Value::Object(object)
    }
}

impl From<ValueRef> for Value {
    fn from(r: ValueRef) -> Self {
        Value::Ref(r)
    }
}

impl From<Ref<Value>> for Value {
    fn from(r: Ref<Value>) -> Self {
        Value::Ref(ValueRef::Boxed(r))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nan_is_same_value_as_nan() {
        assert!(Value::from(f64::NAN).same_value(&Value::from(f64::NAN)));
        assert!(!Value::from(0.0).same_value(&Value::from(-0.0)));
        assert_eq!(Value::from(1), Value::from(1.0));
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::object([("x", 1)]);
        let b = Value::object([("x", 1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn views_of_one_object_differ_until_raw() {
        let raw = Observed::object([("x", 1)]);
        let reactive = Value::Object(raw.reactive());
        assert_ne!(reactive, Value::Object(raw.clone()));
        assert_eq!(reactive.to_raw(), Value::Object(raw));
    }

    #[test]
    fn as_index_accepts_only_integral_non_negative_numbers() {
        assert_eq!(Value::from(3).as_index(), Some(3));
        assert_eq!(Value::from(-1).as_index(), None);
        assert_eq!(Value::from(1.5).as_index(), None);
        assert_eq!(Value::from(f64::NAN).as_index(), None);
        assert_eq!(Value::from("3").as_index(), None);
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let source = json!({ "name": "ripple", "tags": ["a", "b"], "nested": { "n": 1, "f": 1.5 } });
        let value = Value::from_json(source.clone());
        assert_eq!(value.kind(), "object");
        assert_eq!(value.to_json().unwrap(), source);
    }

    #[test]
    fn to_json_drops_undefined_and_nans() {
        let value = Value::object([
            ("a", Value::Undefined),
            ("b", Value::from(f64::NAN)),
            ("c", Value::array([Value::Undefined])),
        ]);
        assert_eq!(value.to_json().unwrap(), json!({ "b": null, "c": [null] }));
    }

    #[test]
    fn to_json_rejects_cycles_but_allows_sharing() {
        let shared = Observed::object([("n", 1)]);
        let value = Value::object([("a", shared.clone()), ("b", shared.clone())]);
        assert_eq!(
            value.to_json().unwrap(),
            json!({ "a": { "n": 1 }, "b": { "n": 1 } })
        );

        let cyclic = Observed::new_object();
        cyclic.set("me", cyclic.clone()).unwrap();
        assert_eq!(
            Value::Object(cyclic.clone()).to_json(),
            Err(ReactiveError::Cycle)
        );
        // Break the cycle so the test does not leak.
        cyclic.delete("me").unwrap();
    }

    #[test]
    fn serialize_goes_through_json() {
        let value = Value::array([1, 2]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[1,2]");
    }
}
