//! Refs
//!
//! A [`Ref`] is a single reactive cell: reading `value()` inside an effect
//! subscribes the effect, and `set` notifies subscribers when the value
//! actually changed.
//!
//! ```rust,ignore
//! let count = ref_(0);
//! let runner = effect({
//!     let count = count.clone();
//!     move || println!("{}", count.value())
//! });
//! count.set(1); // prints 1
//! count.set(1); // same value, nothing runs
//! ```
//!
//! [`ValueRef`] is the dynamic form stored inside observed objects. It is
//! either a boxed `Ref<Value>` or a live view of one property of an object
//! (see [`to_ref`]).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::context::untracked;
use super::observed::Observed;
use super::value::{same_number, Value};
use crate::error::{ReactiveError, Result};
use crate::graph::{track_dep, trigger_dep, DepId, Key, Runtime};

/// Types a [`Ref`] can hold.
///
/// `same_value` decides whether a write is a change. `to_raw` and
/// `to_reactive` give the stored and the presented form; they are the
/// identity for everything except observed objects.
pub trait RefValue: Clone + 'static {
    fn same_value(&self, other: &Self) -> bool;

    fn to_raw(&self) -> Self {
        self.clone()
    }

    fn to_reactive(&self) -> Self {
        self.clone()
    }
}

macro_rules! impl_ref_value_eq {
    ($($t:ty),*) => {
        $(
            impl RefValue for $t {
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_ref_value_eq!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str, ()
);

impl RefValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        same_number(*self, *other)
    }
}

impl RefValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        same_number(f64::from(*self), f64::from(*other))
    }
}

impl<T: RefValue> RefValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn to_raw(&self) -> Self {
        self.as_ref().map(T::to_raw)
    }

    fn to_reactive(&self) -> Self {
        self.as_ref().map(T::to_reactive)
    }
}

impl<T: 'static> RefValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl RefValue for Value {
    fn same_value(&self, other: &Self) -> bool {
        Value::same_value(self, other)
    }

    fn to_raw(&self) -> Self {
        Value::to_raw(self)
    }

    fn to_reactive(&self) -> Self {
        Value::to_reactive(self)
    }
}

impl RefValue for Observed {
    fn same_value(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }

    fn to_raw(&self) -> Self {
        Observed::to_raw(self)
    }

    fn to_reactive(&self) -> Self {
        self.reactive()
    }
}

struct RefInner<T> {
    /// Stored form, used for change detection.
    raw: RefCell<T>,
    /// Presented form, returned by `value()`.
    value: RefCell<T>,
    dep: DepId,
}

impl<T> Drop for RefInner<T> {
    fn drop(&mut self) {
        Runtime::release_dep(self.dep);
    }
}

/// A reactive cell holding one value.
///
/// Cloning shares the cell.
pub struct Ref<T: RefValue> {
    inner: Rc<RefInner<T>>,
}

impl<T: RefValue> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefInner {
                raw: RefCell::new(value.to_raw()),
                value: RefCell::new(value.to_reactive()),
                dep: Runtime::allocate_dep(),
            }),
        }
    }

    /// Read the value, subscribing the running effect.
    pub fn value(&self) -> T {
        track_dep(self.inner.dep);
        self.inner.value.borrow().clone()
    }

    /// Read the value without subscribing.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Write a value. Returns `false`, and notifies no one, when it is the
    /// same value as before.
    pub fn set(&self, value: T) -> bool {
        let raw = value.to_raw();
        if raw.same_value(&self.inner.raw.borrow()) {
            return false;
        }
        self.inner.raw.replace(raw);
        self.inner.value.replace(value.to_reactive());
        trigger_dep(self.inner.dep);
        true
    }

    /// Write `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.inner.value.borrow());
        self.set(next)
    }

    /// Notify subscribers without changing the value.
    pub fn trigger(&self) {
        trigger_dep(self.inner.dep);
    }

    pub fn subscriber_count(&self) -> usize {
        Runtime::with_tracker(|tracker| tracker.subscriber_count(self.inner.dep))
    }

    pub fn ptr_eq(&self, other: &Ref<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<T: RefValue> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: RefValue + fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

/// Create a ref.
pub fn ref_<T: RefValue>(value: T) -> Ref<T> {
    Ref::new(value)
}

/// A ref that reads and writes one property of an object.
#[derive(Clone, Debug)]
pub struct PropertyRef {
    object: Observed,
    key: Key,
}

impl PropertyRef {
    pub fn object(&self) -> &Observed {
        &self.object
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn value(&self) -> Value {
        self.object.get(&self.key)
    }

    pub fn set(&self, value: Value) -> Result<()> {
        self.object.set(&self.key, value)
    }
}

/// A ref as stored in a [`Value`].
#[derive(Clone)]
pub enum ValueRef {
    Boxed(Ref<Value>),
    Property(PropertyRef),
}

impl ValueRef {
    /// Wrap `value` in a new ref. An existing ref is returned as is.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Ref(r) => r,
            other => ValueRef::Boxed(Ref::new(other)),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            ValueRef::Boxed(r) => r.value(),
            ValueRef::Property(p) => p.value(),
        }
    }

    pub(crate) fn value_untracked(&self) -> Value {
        untracked(|| self.value())
    }

    pub fn set(&self, value: Value) -> Result<()> {
        match self {
            ValueRef::Boxed(r) => {
                r.set(value);
                Ok(())
            }
            ValueRef::Property(p) => p.set(value),
        }
    }

    pub fn ptr_eq(&self, other: &ValueRef) -> bool {
        match (self, other) {
            (ValueRef::Boxed(a), ValueRef::Boxed(b)) => a.ptr_eq(b),
            (ValueRef::Property(a), ValueRef::Property(b)) => {
                a.object.ptr_eq(&b.object) && a.key == b.key
            }
            _ => false,
        }
    }

    /// Address of the boxed cell, used to break cycles when traversing.
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            ValueRef::Boxed(r) => Some(r.identity()),
            ValueRef::Property(_) => None,
        }
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Boxed(_) => f.write_str("ValueRef::Boxed(..)"),
            ValueRef::Property(p) => write!(f, "ValueRef::Property({})", p.key),
        }
    }
}

pub fn is_ref(value: &Value) -> bool {
    value.is_ref()
}

/// The ref's value, or `value` itself when it is not a ref.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.value(),
        other => other.clone(),
    }
}

/// A ref bound to `object[key]`.
///
/// If the property already holds a ref, that ref is returned instead.
pub fn to_ref(object: &Observed, key: impl Into<Key>) -> ValueRef {
    let key = object.normalize(key.into());
    if let Value::Ref(existing) = object.raw_get(&key) {
        return existing;
    }
    ValueRef::Property(PropertyRef {
        object: object.clone(),
        key,
    })
}

/// A ref for every current key of `object`.
pub fn to_refs(object: &Observed) -> IndexMap<Key, ValueRef> {
    let keys = untracked(|| object.keys());
    keys.into_iter()
        .map(|key| {
            let r = to_ref(object, key.clone());
            (key, r)
        })
        .collect()
}

/// Read through a ref held in a [`Value`].
pub fn ref_get(value: &Value) -> Result<Value> {
    match value {
        Value::Ref(r) => Ok(r.value()),
        other => Err(ReactiveError::NotARef { found: other.kind() }),
    }
}

/// Write through a ref held in a [`Value`].
pub fn ref_set(target: &Value, value: impl Into<Value>) -> Result<()> {
    match target {
        Value::Ref(r) => r.set(value.into()),
        other => Err(ReactiveError::NotARef { found: other.kind() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect;
    use std::cell::Cell;

    #[test]
    fn set_reports_changes() {
        let r = ref_(1);
        assert!(!r.set(1));
        assert!(r.set(2));
        assert_eq!(r.get_untracked(), 2);
        assert!(r.update(|n| n + 1));
        assert_eq!(r.get_untracked(), 3);
    }

    #[test]
    fn nan_writes_are_not_changes() {
        let r = ref_(f64::NAN);
        let runs = Rc::new(Cell::new(0));
        let _runner = effect({
            let r = r.clone();
            let runs = runs.clone();
            move || {
                r.value();
                runs.set(runs.get() + 1);
            }
        });
        assert!(!r.set(f64::NAN));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn trigger_forces_a_notification() {
        let r = ref_(0);
        let runs = Rc::new(Cell::new(0));
        let _runner = effect({
            let r = r.clone();
            let runs = runs.clone();
            move || {
                r.value();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(r.subscriber_count(), 1);
        r.trigger();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn object_values_are_presented_reactive() {
        let raw = Observed::object([("n", 1)]);
        let r = ref_(Value::Object(raw.clone()));
        assert!(r.value().as_object().unwrap().is_reactive());
        // Writing the reactive view of the same object is not a change.
        assert!(!r.set(Value::Object(raw.reactive())));
    }

    #[test]
    fn value_ref_new_passes_refs_through() {
        let boxed = ValueRef::new(Value::from(1));
        let again = ValueRef::new(Value::Ref(boxed.clone()));
        assert!(boxed.ptr_eq(&again));
    }

    #[test]
    fn unref_and_accessors() {
        let r = Value::from(ref_(Value::from(5)));
        assert_eq!(unref(&r), Value::from(5));
        assert_eq!(unref(&Value::from(5)), Value::from(5));
        assert!(is_ref(&r));

        ref_set(&r, 6).unwrap();
        assert_eq!(ref_get(&r), Ok(Value::from(6)));
        assert_eq!(
            ref_get(&Value::from(1)),
            Err(ReactiveError::NotARef { found: "number" })
        );
    }

    #[test]
    fn to_ref_reads_and_writes_the_property() {
        let state = Observed::object([("x", 1)]).reactive();
        let x = to_ref(&state, "x");
        assert_eq!(x.value(), Value::from(1));
        x.set(Value::from(2)).unwrap();
        assert_eq!(state.get("x"), Value::from(2));
    }

    #[test]
    fn to_ref_keeps_an_existing_ref() {
        let inner = ValueRef::new(Value::from(1));
        let object = Observed::object([("x", Value::Ref(inner.clone()))]);
        assert!(to_ref(&object, "x").ptr_eq(&inner));
    }

    #[test]
    fn to_refs_covers_every_key() {
        let state = Observed::object([("a", 1), ("b", 2)]).reactive();
        let refs = to_refs(&state);
        assert_eq!(refs.len(), 2);
        refs[&Key::from("b")].set(Value::from(3)).unwrap();
        assert_eq!(state.get("b"), Value::from(3));
    }
}
