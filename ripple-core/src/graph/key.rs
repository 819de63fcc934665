//! Graph Keys
//!
//! This module defines the identities the dependency graph is indexed by:
//! which observed object a read or write happened on, which property, and
//! what kind of operation it was.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Identity token for an observed object.
///
/// Objects are keyed by identity, never by structure. Two objects with equal
/// contents still have distinct IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// The shape of an observed object.
///
/// Arrays get special trigger semantics for `length` and integer keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Object,
    Array,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Object => f.write_str("object"),
            TargetKind::Array => f.write_str("array"),
        }
    }
}

/// An observed object as the tracker sees it: an identity plus its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    id: TargetId,
    kind: TargetKind,
}

impl Target {
    /// Create a target with a freshly generated identity.
    pub fn new(kind: TargetKind) -> Self {
        Self {
            id: TargetId::new(),
            kind,
        }
    }

    /// Create a target for an existing identity.
    pub fn with_id(id: TargetId, kind: TargetKind) -> Self {
        Self { id, kind }
    }

    pub fn object() -> Self {
        Self::new(TargetKind::Object)
    }

    pub fn array() -> Self {
        Self::new(TargetKind::Array)
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn is_array(&self) -> bool {
        self.kind == TargetKind::Array
    }
}

/// IDs below this value belong to the well-known symbols.
const FIRST_USER_SYMBOL: u64 = 64;

/// An opaque, unique property token.
///
/// Symbols compare by identity; the description is only for display.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    #[serde(skip)]
    id: u64,
    description: Cow<'static, str>,
}

impl Symbol {
    pub const ITERATOR: Symbol = Symbol::well_known(0, "Symbol.iterator");
    pub const ASYNC_ITERATOR: Symbol = Symbol::well_known(1, "Symbol.asyncIterator");
    pub const HAS_INSTANCE: Symbol = Symbol::well_known(2, "Symbol.hasInstance");
    pub const TO_PRIMITIVE: Symbol = Symbol::well_known(3, "Symbol.toPrimitive");
    pub const TO_STRING_TAG: Symbol = Symbol::well_known(4, "Symbol.toStringTag");

    const fn well_known(id: u64, description: &'static str) -> Self {
        Self {
            id,
            description: Cow::Borrowed(description),
        }
    }

    /// Create a new symbol, distinct from every other symbol.
    pub fn new(description: impl Into<String>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(FIRST_USER_SYMBOL);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            description: Cow::Owned(description.into()),
        }
    }

    /// All well-known symbols, in declaration order.
    pub fn well_known_symbols() -> [Symbol; 5] {
        [
            Self::ITERATOR,
            Self::ASYNC_ITERATOR,
            Self::HAS_INSTANCE,
            Self::TO_PRIMITIVE,
            Self::TO_STRING_TAG,
        ]
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_well_known(&self) -> bool {
        self.id < FIRST_USER_SYMBOL
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A property identifier.
///
/// `Length` and `Iterate` are virtual keys: `Length` is the dependency point
/// for an array's length, `Iterate` stands for "the set of keys of this
/// object" and is what enumeration depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Name(Rc<str>),
    Index(usize),
    Symbol(Symbol),
    Length,
    Iterate,
}

impl Key {
    /// Parse a property name, normalizing integer-like strings to `Index`.
    ///
    /// A string is integer-like when it is made of ASCII digits only, has no
    /// leading zero (except `"0"` itself) and fits in a `usize`.
    pub fn parse(name: &str) -> Self {
        match parse_index(name) {
            Some(index) => Key::Index(index),
            None => Key::Name(Rc::from(name)),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            _ => None,
        }
    }

    /// Whether the key is one of the virtual keys that never names a real
    /// property.
    pub fn is_virtual(&self) -> bool {
        matches!(self, Key::Length | Key::Iterate)
    }

    pub(crate) fn is_name(&self, name: &str) -> bool {
        matches!(self, Key::Name(n) if &**n == name)
    }
}

fn parse_index(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    name.parse().ok()
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::parse(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::parse(&name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        Key::Symbol(symbol)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
            Key::Symbol(symbol) => write!(f, "Symbol({})", symbol.description()),
            Key::Length => f.write_str("length"),
            Key::Iterate => f.write_str("<iterate>"),
        }
    }
}

/// The kind of read being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackOp {
    Get,
    Has,
    Iterate,
}

/// The kind of write being triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOp {
    /// An existing key changed value.
    Set,
    /// A key that did not exist was created.
    Add,
    /// An existing key was removed.
    Delete,
}

impl fmt::Display for TrackOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackOp::Get => f.write_str("get"),
            TrackOp::Has => f.write_str("has"),
            TrackOp::Iterate => f.write_str("iterate"),
        }
    }
}

impl fmt::Display for TriggerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerOp::Set => f.write_str("set"),
            TriggerOp::Add => f.write_str("add"),
            TriggerOp::Delete => f.write_str("delete"),
        }
    }
}
