//! Observed Objects
//!
//! An [`Observed`] is a handle to a shared object or array plus a view mode.
//! Every property access goes through the handle, which is where reads are
//! tracked and writes are triggered.
//!
//! # Views
//!
//! One underlying object can be seen through several views:
//!
//! - `Raw` never tracks or triggers.
//! - `Reactive` tracks reads, triggers writes, unwraps refs stored in
//!   properties and returns nested objects as reactive views too.
//! - `ShallowReactive` tracks and triggers only at the top level.
//! - `Readonly` and `ShallowReadonly` reject every write.
//!
//! Views share identity with their object (same [`TargetId`]) but compare
//! unequal to each other; [`Observed::to_raw`] is the canonical form.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::warn;

use super::context::PausedTracking;
use super::value::Value;
use crate::error::{ReactiveError, Result};
use crate::graph::{self, Key, Runtime, Target, TargetId, TargetKind, TrackOp, TriggerOp};

/// Largest array length. Indices run up to one less.
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// How a handle intercepts access to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Raw,
    Reactive,
    ShallowReactive,
    Readonly,
    ShallowReadonly,
}

impl Mode {
    pub fn is_readonly(self) -> bool {
        matches!(self, Mode::Readonly | Mode::ShallowReadonly)
    }

    pub fn is_shallow(self) -> bool {
        matches!(self, Mode::ShallowReactive | Mode::ShallowReadonly)
    }

    fn tracks(self) -> bool {
        matches!(self, Mode::Reactive | Mode::ShallowReactive)
    }

    /// Deep views wrap nested objects and unwrap refs.
    fn is_deep(self) -> bool {
        matches!(self, Mode::Reactive | Mode::Readonly)
    }
}

enum Data {
    Object(IndexMap<Key, Value>),
    Array(Vec<Value>),
}

struct ObjectCell {
    target: Target,
    data: RefCell<Data>,
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        let id = self.target.id();
        Runtime::try_with_tracker(|tracker| tracker.release_target(id));
    }
}

/// A handle to an observable object or array.
#[derive(Clone)]
pub struct Observed {
    cell: Rc<ObjectCell>,
    mode: Mode,
}

impl Observed {
    fn from_data(kind: TargetKind, data: Data) -> Self {
        Self {
            cell: Rc::new(ObjectCell {
                target: Target::new(kind),
                data: RefCell::new(data),
            }),
            mode: Mode::Raw,
        }
    }

    /// A new empty plain object, as a raw handle.
    pub fn new_object() -> Self {
        Self::from_data(TargetKind::Object, Data::Object(IndexMap::new()))
    }

    /// A new empty array, as a raw handle.
    pub fn new_array() -> Self {
        Self::from_data(TargetKind::Array, Data::Array(Vec::new()))
    }

    /// A new plain object with the given properties, as a raw handle.
    ///
    /// Nested objects are stored as raw handles.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| {
                let key = match key.into() {
                    Key::Length => Key::from("length"),
                    key => key,
                };
                (key, value.into().to_raw())
            })
            .collect();
        Self::from_data(TargetKind::Object, Data::Object(map))
    }

    /// A new array with the given items, as a raw handle.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(|item| item.into().to_raw()).collect();
        Self::from_data(TargetKind::Array, Data::Array(items))
    }

    fn with_mode(&self, mode: Mode) -> Self {
        Self {
            cell: self.cell.clone(),
            mode,
        }
    }

    /// A deep reactive view. A readonly view stays readonly.
    pub fn reactive(&self) -> Self {
        if self.mode.is_readonly() {
            return self.clone();
        }
        self.with_mode(Mode::Reactive)
    }

    /// A view that tracks and triggers only its own properties.
    pub fn shallow_reactive(&self) -> Self {
        if self.mode.is_readonly() {
            return self.clone();
        }
        self.with_mode(Mode::ShallowReactive)
    }

    /// A deep readonly view. Readonly views never track.
    pub fn readonly(&self) -> Self {
        self.with_mode(Mode::Readonly)
    }

    pub fn shallow_readonly(&self) -> Self {
        self.with_mode(Mode::ShallowReadonly)
    }

    /// The raw handle for the same object.
    pub fn to_raw(&self) -> Self {
        self.with_mode(Mode::Raw)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_reactive(&self) -> bool {
        self.mode.tracks()
    }

    pub fn is_readonly(&self) -> bool {
        self.mode.is_readonly()
    }

    pub fn is_shallow(&self) -> bool {
        self.mode.is_shallow()
    }

    /// Whether this is any view other than the raw handle.
    pub fn is_proxy(&self) -> bool {
        self.mode != Mode::Raw
    }

    pub fn id(&self) -> TargetId {
        self.cell.target.id()
    }

    pub fn target(&self) -> Target {
        self.cell.target
    }

    pub fn is_array(&self) -> bool {
        self.cell.target.is_array()
    }

    /// Same object and same view.
    pub fn ptr_eq(&self, other: &Observed) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell) && self.mode == other.mode
    }

    /// Same object, through any view.
    pub fn same_target(&self, other: &Observed) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Map `"length"` to the virtual length key on arrays, and back to a
    /// plain name on objects.
    pub(crate) fn normalize(&self, key: Key) -> Key {
        match key {
            key if self.is_array() && key.is_name("length") => Key::Length,
            Key::Length if !self.is_array() => Key::from("length"),
            key => key,
        }
    }

    fn track(&self, op: TrackOp, key: &Key) {
        if self.mode.tracks() && !Runtime::is_reserved(key) {
            graph::track(self.target(), op, key);
        }
    }

    fn trigger(&self, op: TriggerOp, key: &Key, new_value: Option<&Value>) {
        if self.mode.tracks() {
            graph::trigger(self.target(), op, key, new_value);
        }
    }

    /// Present a stored value through this view.
    fn present(&self, value: Value) -> Value {
        if !self.mode.is_deep() {
            return value;
        }
        match value {
            Value::Ref(r) if !self.is_array() => self.present(r.value()),
            Value::Object(object) => Value::Object(object.with_mode(self.mode)),
            other => other,
        }
    }

    pub(crate) fn raw_get(&self, key: &Key) -> Value {
        match &*self.cell.data.borrow() {
            Data::Object(map) => map.get(key).cloned().unwrap_or_default(),
            Data::Array(items) => match key {
                Key::Index(index) => items.get(*index).cloned().unwrap_or_default(),
                Key::Length => Value::from(items.len()),
                _ => Value::Undefined,
            },
        }
    }

    fn raw_has(&self, key: &Key) -> bool {
        match &*self.cell.data.borrow() {
            Data::Object(map) => map.contains_key(key),
            Data::Array(items) => match key {
                Key::Index(index) => *index < items.len(),
                Key::Length => true,
                _ => false,
            },
        }
    }

    fn raw_len(&self) -> usize {
        match &*self.cell.data.borrow() {
            Data::Object(map) => map.len(),
            Data::Array(items) => items.len(),
        }
    }

    fn raw_keys(&self) -> Vec<Key> {
        match &*self.cell.data.borrow() {
            Data::Object(map) => map.keys().cloned().collect(),
            Data::Array(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    /// Stored values in key order, without tracking or wrapping.
    pub(crate) fn raw_values(&self) -> Vec<Value> {
        match &*self.cell.data.borrow() {
            Data::Object(map) => map.values().cloned().collect(),
            Data::Array(items) => items.clone(),
        }
    }

    /// Stored entries in key order, without tracking or wrapping.
    pub(crate) fn raw_entries(&self) -> Vec<(Key, Value)> {
        match &*self.cell.data.borrow() {
            Data::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Data::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| (Key::Index(index), item.clone()))
                .collect(),
        }
    }

    fn raw_insert(&self, key: Key, value: Value) -> Result<()> {
        match &mut *self.cell.data.borrow_mut() {
            Data::Object(map) => {
                map.insert(key, value);
            }
            Data::Array(items) => {
                if let Key::Index(index) = key {
                    if index >= items.len() {
                        grow(items, index + 1)?;
                    }
                    items[index] = value;
                }
            }
        }
        Ok(())
    }

    fn validate_key(&self, key: &Key) -> Result<()> {
        let valid = match key {
            Key::Iterate => false,
            Key::Index(index) => !self.is_array() || *index < MAX_ARRAY_LENGTH,
            _ => !self.is_array(),
        };
        if valid {
            Ok(())
        } else {
            Err(ReactiveError::InvalidKey {
                key: key.clone(),
                kind: self.target().kind(),
            })
        }
    }

    fn check_writable(&self, key: &Key) -> Result<()> {
        if !self.mode.is_readonly() {
            return Ok(());
        }
        if Runtime::warns_on_readonly_write() {
            warn!(target_id = self.id().raw(), %key, "write rejected: target is readonly");
        }
        Err(ReactiveError::ReadonlyTarget { key: key.clone() })
    }

    fn require_array(&self, op: &'static str) -> Result<()> {
        if self.is_array() {
            Ok(())
        } else {
            Err(ReactiveError::NotAnArray { op })
        }
    }

    /// Read a property.
    ///
    /// Tracks a `Get` on reactive views. Missing properties read as
    /// `Undefined`.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = self.normalize(key.into());
        if key == Key::Iterate {
            return Value::Undefined;
        }
        let value = self.raw_get(&key);
        self.track(TrackOp::Get, &key);
        self.present(value)
    }

    /// Check whether a property exists. Tracks a `Has`.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = self.normalize(key.into());
        if key == Key::Iterate {
            return false;
        }
        let result = self.raw_has(&key);
        self.track(TrackOp::Has, &key);
        result
    }

    /// Own keys in insertion order (indices for arrays).
    ///
    /// Depends on the key set: `Iterate` for objects, `length` for arrays.
    pub fn keys(&self) -> Vec<Key> {
        self.track_iteration();
        self.raw_keys()
    }

    /// Property values in key order, each read with [`Observed::get`].
    pub fn values(&self) -> Vec<Value> {
        self.keys().into_iter().map(|key| self.get(key)).collect()
    }

    pub fn entries(&self) -> Vec<(Key, Value)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    /// Number of properties, or the array length.
    pub fn len(&self) -> usize {
        if self.is_array() {
            self.track(TrackOp::Get, &Key::Length);
        } else {
            self.track(TrackOp::Iterate, &Key::Iterate);
        }
        self.raw_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn track_iteration(&self) {
        if self.is_array() {
            self.track(TrackOp::Iterate, &Key::Length);
        } else {
            self.track(TrackOp::Iterate, &Key::Iterate);
        }
    }

    /// Write a property.
    ///
    /// Adding a key triggers `Add`; overwriting triggers `Set` only when the
    /// value changed. On a deep reactive object, assigning a plain value to a
    /// property that holds a ref writes through the ref instead.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = self.normalize(key.into());
        let value = value.into();
        self.check_writable(&key)?;

        if self.is_array() && key == Key::Length {
            let len = value.as_index().ok_or_else(|| ReactiveError::InvalidLength {
                value: format!("{value:?}"),
            })?;
            return self.set_len(len);
        }
        self.validate_key(&key)?;

        let value = if self.mode.is_shallow() {
            value
        } else {
            value.to_raw()
        };
        let old = self.raw_get(&key);
        if self.mode == Mode::Reactive && !self.is_array() {
            if let Value::Ref(old_ref) = &old {
                if !value.is_ref() {
                    return old_ref.set(value);
                }
            }
        }

        let had_key = self.raw_has(&key);
        self.raw_insert(key.clone(), value.clone())?;
        if !had_key {
            self.trigger(TriggerOp::Add, &key, Some(&value));
        } else if !value.same_value(&old) {
            self.trigger(TriggerOp::Set, &key, Some(&value));
        }
        Ok(())
    }

    /// Remove a property. Returns whether it existed.
    ///
    /// Deleting an array index leaves an `Undefined` slot; the length does
    /// not change.
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool> {
        let key = self.normalize(key.into());
        self.check_writable(&key)?;
        self.validate_key(&key)?;
        if !self.raw_has(&key) {
            return Ok(false);
        }

        match &mut *self.cell.data.borrow_mut() {
            Data::Object(map) => {
                map.shift_remove(&key);
            }
            Data::Array(items) => {
                if let Some(slot) = key.as_index().and_then(|index| items.get_mut(index)) {
                    *slot = Value::Undefined;
                }
            }
        }
        self.trigger(TriggerOp::Delete, &key, None);
        Ok(true)
    }

    /// Set an array's length, truncating or padding with `Undefined`.
    ///
    /// Notifies dependents of `length` and of every removed index. Lengths
    /// above [`MAX_ARRAY_LENGTH`] are rejected.
    pub fn set_len(&self, len: usize) -> Result<()> {
        self.require_array("set_len")?;
        self.check_writable(&Key::Length)?;

        let old = match &mut *self.cell.data.borrow_mut() {
            Data::Array(items) => {
                let old = items.len();
                if len > old {
                    grow(items, len)?;
                } else {
                    items.truncate(len);
                }
                old
            }
            Data::Object(_) => return Err(ReactiveError::NotAnArray { op: "set_len" }),
        };
        if old != len {
            self.trigger(TriggerOp::Set, &Key::Length, Some(&Value::from(len)));
        }
        Ok(())
    }

    /// Append an item, returning the new length.
    ///
    /// Runs with tracking paused, so an effect that pushes does not depend
    /// on the length it reads to find the end.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        self.require_array("push")?;
        let _paused = PausedTracking::new();
        let len = self.raw_len();
        self.set(Key::Index(len), value)?;
        Ok(len + 1)
    }

    /// Remove and return the last item.
    pub fn pop(&self) -> Result<Value> {
        self.require_array("pop")?;
        self.check_writable(&Key::Length)?;
        let _paused = PausedTracking::new();
        let len = self.raw_len();
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let last = self.raw_get(&Key::Index(len - 1));
        self.set_len(len - 1)?;
        Ok(self.present(last))
    }

    /// Remove and return the first item, shifting the rest down.
    pub fn shift(&self) -> Result<Value> {
        self.require_array("shift")?;
        self.check_writable(&Key::Index(0))?;
        let _paused = PausedTracking::new();
        let len = self.raw_len();
        if len == 0 {
            return Ok(Value::Undefined);
        }
        let first = self.raw_get(&Key::Index(0));
        for index in 1..len {
            let item = self.raw_get(&Key::Index(index));
            self.set(Key::Index(index - 1), item)?;
        }
        self.set_len(len - 1)?;
        Ok(self.present(first))
    }

    /// Insert an item at the front, returning the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<usize> {
        self.require_array("unshift")?;
        self.check_writable(&Key::Index(0))?;
        let _paused = PausedTracking::new();
        let len = self.raw_len();
        for index in (0..len).rev() {
            let item = self.raw_get(&Key::Index(index));
            self.set(Key::Index(index + 1), item)?;
        }
        self.set(Key::Index(0), value)?;
        Ok(len + 1)
    }

    /// Remove `delete_count` items at `start` and insert `items` in their
    /// place, returning the removed items.
    ///
    /// `start` and `delete_count` are clamped to the array. Every index whose
    /// item changes is written, so dependents of those indices rerun, and a
    /// change in length notifies `length` readers. Runs with tracking paused
    /// like the other mutators.
    pub fn splice<I, V>(&self, start: usize, delete_count: usize, items: I) -> Result<Vec<Value>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.require_array("splice")?;
        self.check_writable(&Key::Length)?;
        let _paused = PausedTracking::new();

        let len = self.raw_len();
        let start = start.min(len);
        let end = start + delete_count.min(len - start);
        let inserted: Vec<Value> = items.into_iter().map(Into::into).collect();
        let new_len = len - (end - start) + inserted.len();
        if new_len > MAX_ARRAY_LENGTH {
            return Err(ReactiveError::InvalidLength {
                value: new_len.to_string(),
            });
        }

        let current = self.raw_values();
        let removed = current[start..end].to_vec();
        let tail = current[end..].to_vec();
        for (offset, item) in inserted.into_iter().chain(tail).enumerate() {
            self.set(Key::Index(start + offset), item)?;
        }
        if new_len < len {
            self.set_len(new_len)?;
        }
        Ok(removed.into_iter().map(|item| self.present(item)).collect())
    }

    /// Whether the array contains `needle`.
    ///
    /// Depends on the length and every index. A reactive view of a stored
    /// object is found as well as its raw handle.
    pub fn includes(&self, needle: &Value) -> bool {
        self.index_of(needle).is_some()
    }

    pub fn index_of(&self, needle: &Value) -> Option<usize> {
        self.search(needle, |items, needle| {
            items.iter().position(|item| item.same_value(needle))
        })
    }

    pub fn last_index_of(&self, needle: &Value) -> Option<usize> {
        self.search(needle, |items, needle| {
            items.iter().rposition(|item| item.same_value(needle))
        })
    }

    fn search(
        &self,
        needle: &Value,
        find: impl Fn(&[Value], &Value) -> Option<usize>,
    ) -> Option<usize> {
        if !self.is_array() {
            return None;
        }
        let items = self.raw_values();
        self.track(TrackOp::Get, &Key::Length);
        for index in 0..items.len() {
            self.track(TrackOp::Get, &Key::Index(index));
        }
        find(&items, needle).or_else(|| find(&items, &needle.to_raw()))
    }
}

/// Pad `items` with `Undefined` up to `len`.
fn grow(items: &mut Vec<Value>, len: usize) -> Result<()> {
    let invalid = || ReactiveError::InvalidLength {
        value: len.to_string(),
    };
    if len > MAX_ARRAY_LENGTH {
        return Err(invalid());
    }
    items.try_reserve(len - items.len()).map_err(|_| invalid())?;
    items.resize(len, Value::Undefined);
    Ok(())
}

impl PartialEq for Observed {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("id", &self.id().raw())
            .field("kind", &self.target().kind())
            .field("mode", &self.mode)
            .field("len", &self.raw_len())
            .finish()
    }
}

/// A deep reactive view of `object`.
pub fn reactive(object: &Observed) -> Observed {
    object.reactive()
}

pub fn shallow_reactive(object: &Observed) -> Observed {
    object.shallow_reactive()
}

/// A deep readonly view of `object`.
pub fn readonly(object: &Observed) -> Observed {
    object.readonly()
}

pub fn shallow_readonly(object: &Observed) -> Observed {
    object.shallow_readonly()
}

/// The raw handle behind any view.
pub fn to_raw(object: &Observed) -> Observed {
    object.to_raw()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_handles_never_register_dependencies() {
        let raw = Observed::object([("a", 1)]);
        let _runner = crate::reactive::effect({
            let raw = raw.clone();
            move || {
                raw.get("a");
            }
        });
        assert_eq!(Runtime::subscriber_count(raw.id(), &Key::from("a")), 0);
    }

    #[test]
    fn length_key_normalizes_per_kind() {
        let array = Observed::array([1, 2]);
        let object = Observed::new_object();
        assert_eq!(array.normalize(Key::from("length")), Key::Length);
        assert_eq!(object.normalize(Key::Length), Key::from("length"));
        assert_eq!(array.get("length"), Value::from(2));
    }

    #[test]
    fn nested_objects_take_the_parent_view() {
        let inner = Observed::object([("n", 1)]);
        let outer = Observed::object([("inner", inner.clone())]);

        let nested = outer.reactive().get("inner");
        let nested = nested.as_object().unwrap();
        assert!(nested.is_reactive());
        assert!(nested.same_target(&inner));

        let shallow = outer.shallow_reactive().get("inner");
        assert!(!shallow.as_object().unwrap().is_proxy());

        let ro = outer.readonly().get("inner");
        assert!(ro.as_object().unwrap().is_readonly());
    }

    #[test]
    fn stored_values_are_raw() {
        let inner = Observed::new_object();
        let outer = Observed::new_object().reactive();
        outer.set("inner", inner.reactive()).unwrap();
        let stored = outer.raw_get(&Key::from("inner"));
        assert!(!stored.as_object().unwrap().is_proxy());
    }

    #[test]
    fn writing_past_the_end_pads_with_undefined() {
        let array = Observed::array([1]);
        array.set(3usize, 4).unwrap();
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(1usize), Value::Undefined);
        assert_eq!(array.get(3usize), Value::from(4));
    }

    #[test]
    fn invalid_writes_are_rejected() {
        let array = Observed::new_array();
        assert!(matches!(
            array.set("name", 1),
            Err(ReactiveError::InvalidKey { .. })
        ));
        assert!(matches!(
            array.set("length", -1),
            Err(ReactiveError::InvalidLength { .. })
        ));
        assert_eq!(
            Observed::new_object().push(1),
            Err(ReactiveError::NotAnArray { op: "push" })
        );
    }

    #[test]
    fn readonly_rejects_writes_and_leaves_data_alone() {
        let raw = Observed::object([("a", 1)]);
        let view = raw.readonly();
        assert_eq!(
            view.set("a", 2),
            Err(ReactiveError::ReadonlyTarget { key: Key::from("a") })
        );
        assert!(view.delete("a").is_err());
        assert_eq!(raw.get("a"), Value::from(1));
        assert!(view.reactive().is_readonly());
    }

    #[test]
    fn delete_reports_whether_the_key_existed() {
        let object = Observed::object([("a", 1)]);
        assert_eq!(object.delete("a"), Ok(true));
        assert_eq!(object.delete("a"), Ok(false));
        assert!(!object.has("a"));
    }

    #[test]
    fn array_mutators() {
        let array = Observed::array([1, 2]).reactive();
        assert_eq!(array.push(3), Ok(3));
        assert_eq!(array.unshift(0), Ok(4));
        assert_eq!(array.shift(), Ok(Value::from(0)));
        assert_eq!(array.pop(), Ok(Value::from(3)));
        assert_eq!(array.values(), vec![Value::from(1), Value::from(2)]);
        assert_eq!(Observed::new_array().pop(), Ok(Value::Undefined));
    }

    #[test]
    fn oversized_indices_and_lengths_are_rejected() {
        let array = Observed::new_array().reactive();
        assert_eq!(
            array.set(usize::MAX, 1),
            Err(ReactiveError::InvalidKey {
                key: Key::Index(usize::MAX),
                kind: TargetKind::Array,
            })
        );
        assert!(matches!(
            array.set(MAX_ARRAY_LENGTH, 1),
            Err(ReactiveError::InvalidKey { .. })
        ));
        assert!(matches!(
            array.set("length", 1.8e19),
            Err(ReactiveError::InvalidLength { .. })
        ));
        assert_eq!(
            array.set_len(usize::MAX),
            Err(ReactiveError::InvalidLength {
                value: usize::MAX.to_string()
            })
        );
        assert_eq!(array.len(), 0);

        // Objects take any index as a plain key.
        let object = Observed::new_object();
        assert_eq!(object.set(usize::MAX, 1), Ok(()));
        assert_eq!(object.get(usize::MAX), Value::from(1));
    }

    #[test]
    fn splice_replaces_a_range() {
        let array = Observed::array([1, 2, 3, 4]).reactive();
        assert_eq!(
            array.splice(1, 2, [Value::from(9)]),
            Ok(vec![Value::from(2), Value::from(3)])
        );
        assert_eq!(array.values(), vec![Value::from(1), Value::from(9), Value::from(4)]);

        // Clamped to the end; nothing removed, items appended.
        assert_eq!(array.splice(10, 5, [5, 6]), Ok(Vec::new()));
        assert_eq!(array.len(), 5);

        assert_eq!(
            array.readonly().splice(0, 1, Vec::<Value>::new()),
            Err(ReactiveError::ReadonlyTarget { key: Key::Length })
        );
        assert_eq!(
            Observed::new_object().splice(0, 0, [1]),
            Err(ReactiveError::NotAnArray { op: "splice" })
        );
    }

    #[test]
    fn splice_notifies_changed_indices_and_length() {
        use std::cell::Cell;

        let array = Observed::array([1, 2, 3]).reactive();
        let first_runs = Rc::new(Cell::new(0));
        let last_runs = Rc::new(Cell::new(0));
        let len_runs = Rc::new(Cell::new(0));
        let watch_key = |key: Key, runs: &Rc<Cell<usize>>| {
            let array = array.clone();
            let runs = runs.clone();
            crate::reactive::effect(move || {
                runs.set(runs.get() + 1);
                array.get(key.clone());
            })
        };
        let _first = watch_key(Key::Index(0), &first_runs);
        let _last = watch_key(Key::Index(2), &last_runs);
        let _len = watch_key(Key::Length, &len_runs);

        // Removing the middle item shifts index 2 down and shortens the array.
        array.splice(1, 1, Vec::<Value>::new()).unwrap();
        assert_eq!(first_runs.get(), 1);
        assert_eq!(last_runs.get(), 2);
        assert_eq!(len_runs.get(), 2);

        // Same length, only index 0 changes.
        array.splice(0, 1, [7]).unwrap();
        assert_eq!(first_runs.get(), 2);
        assert_eq!(len_runs.get(), 2);
    }

    #[test]
    fn splicing_inside_an_effect_does_not_track_length() {
        let array = Observed::array([1, 2]).reactive();
        let _runner = crate::reactive::effect({
            let array = array.clone();
            move || {
                array.splice(0, 1, [0]).ok();
            }
        });
        assert_eq!(Runtime::subscriber_count(array.id(), &Key::Length), 0);
        assert_eq!(Runtime::subscriber_count(array.id(), &Key::Index(0)), 0);
    }

    #[test]
    fn has_on_the_iterate_key_is_false_and_untracked() {
        let object = Observed::object([("a", 1)]).reactive();
        let seen = Rc::new(std::cell::Cell::new(true));
        let _runner = crate::reactive::effect({
            let object = object.clone();
            let seen = seen.clone();
            move || seen.set(object.has(Key::Iterate))
        });
        assert!(!seen.get());
        assert_eq!(Runtime::subscriber_count(object.id(), &Key::Iterate), 0);
    }

    #[test]
    fn search_finds_reactive_views_of_raw_items() {
        let item = Observed::new_object();
        let array = Observed::array([Value::from(1), Value::Object(item.clone())]).reactive();

        assert_eq!(array.index_of(&Value::Object(item.reactive())), Some(1));
        assert!(array.includes(&Value::Object(item.clone())));
        assert!(!array.includes(&Value::from(2)));

        let repeated = Observed::array([1, 2, 1]);
        assert_eq!(repeated.last_index_of(&Value::from(1)), Some(2));
    }
}
