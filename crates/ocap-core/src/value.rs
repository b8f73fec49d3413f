//! Host value model
//!
//! A small dynamic object graph standing in for the host language's values.
//! Objects are shared by reference and compared by [`ObjectId`]; they start
//! out mutable and become immutable once frozen. The classifier in
//! [`crate::pass_style`] decides which graphs are passable.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::error::ValueError;
use crate::error_class::ErrorClass;
use crate::pass_style::PassStyle;
use crate::symbol::Symbol;
use crate::text::js_number_to_string;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Maximum nesting rendered by `Display` before eliding with `[Object]`.
const DISPLAY_DEPTH: usize = 3;

/// Process-unique identity of a host object. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn fresh() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Own-property key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String-named property
    String(String),
    /// Symbol-named property
    Symbol(Symbol),
}

impl PropertyKey {
    /// The key as a string, if it is string-named
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    /// Parse the key as a canonical array index (`"0"`, `"17"`, never `"07"`)
    pub fn as_index(&self) -> Option<usize> {
        let s = self.as_str()?;
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s:?}"),
            PropertyKey::Symbol(symbol) => write!(f, "[{symbol}]"),
        }
    }
}

/// Own-property descriptor
#[derive(Debug, Clone)]
pub enum Property {
    /// Plain data property
    Data {
        /// Property value
        value: Value,
        /// Whether the property shows up in enumeration
        enumerable: bool,
    },
    /// Getter/setter pair; the accessor functions themselves are not modeled
    Accessor {
        /// Whether the property shows up in enumeration
        enumerable: bool,
    },
}

impl Property {
    /// Enumerable data property
    pub fn data(value: impl Into<Value>) -> Self {
        Property::Data {
            value: value.into(),
            enumerable: true,
        }
    }

    /// Non-enumerable data property
    pub fn hidden(value: impl Into<Value>) -> Self {
        Property::Data {
            value: value.into(),
            enumerable: false,
        }
    }

    /// Enumerable accessor property
    pub fn accessor() -> Self {
        Property::Accessor { enumerable: true }
    }

    /// Whether the property is enumerable
    pub fn is_enumerable(&self) -> bool {
        match self {
            Property::Data { enumerable, .. } | Property::Accessor { enumerable } => *enumerable,
        }
    }

    /// The value of a data property
    pub fn value(&self) -> Option<&Value> {
        match self {
            Property::Data { value, .. } => Some(value),
            Property::Accessor { .. } => None,
        }
    }
}

/// Intrinsic kind of a host object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Ordinary object with the default prototype
    Plain,
    /// Array exotic object; elements live under index keys
    Array,
    /// Callable with intrinsic `name` and `length`
    Function {
        /// Intrinsic function name
        name: String,
        /// Declared parameter count
        length: usize,
    },
    /// Native future
    Promise,
    /// Error instance; `name` is the constructor name found on its prototype
    Error {
        /// Constructor name, possibly one outside [`ErrorClass`]
        name: String,
    },
}

/// Explicit pass-style declaration carried by an object.
///
/// Stands in for the host's `PASS_STYLE` / `toStringTag` property pair.
#[derive(Debug, Clone)]
pub struct StyleMarker {
    /// Declared style name, e.g. `"tagged"` or `"remotable"`
    pub style: String,
    /// The tag (tagged) or interface name (remotable)
    pub tag: Value,
}

impl StyleMarker {
    /// Marker declaring a tagged value
    pub fn tagged(tag: impl Into<String>) -> Self {
        StyleMarker {
            style: "tagged".to_string(),
            tag: Value::String(tag.into()),
        }
    }

    /// Marker declaring a remotable with the given interface
    pub fn remotable(iface: impl Into<String>) -> Self {
        StyleMarker {
            style: "remotable".to_string(),
            tag: Value::String(iface.into()),
        }
    }
}

/// Heap storage behind an [`ObjectRef`]
pub struct HostObject {
    id: ObjectId,
    shape: Shape,
    marker: Option<StyleMarker>,
    props: RwLock<IndexMap<PropertyKey, Property>>,
    length: AtomicUsize,
    frozen: AtomicBool,
    hardened: AtomicBool,
    pass_style: OnceCell<PassStyle>,
    notes: Mutex<Vec<String>>,
}

/// Shared handle to a host object. Equality and hashing are by identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<HostObject>);

impl ObjectRef {
    /// Allocate a fresh, unfrozen object
    pub fn new(shape: Shape) -> Self {
        Self::build(shape, None)
    }

    /// Allocate a fresh, unfrozen object carrying a style declaration
    pub fn with_marker(shape: Shape, marker: StyleMarker) -> Self {
        Self::build(shape, Some(marker))
    }

    fn build(shape: Shape, marker: Option<StyleMarker>) -> Self {
        ObjectRef(Arc::new(HostObject {
            id: ObjectId::fresh(),
            shape,
            marker,
            props: RwLock::new(IndexMap::new()),
            length: AtomicUsize::new(0),
            frozen: AtomicBool::new(false),
            hardened: AtomicBool::new(false),
            pass_style: OnceCell::new(),
            notes: Mutex::new(Vec::new()),
        }))
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Intrinsic kind
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    /// Explicit style declaration, if any
    pub fn marker(&self) -> Option<&StyleMarker> {
        self.0.marker.as_ref()
    }

    /// Whether this object can no longer be mutated
    pub fn is_frozen(&self) -> bool {
        self.0.frozen.load(Ordering::Acquire)
    }

    /// Shallow freeze
    pub fn freeze(&self) {
        self.0.frozen.store(true, Ordering::Release);
    }

    /// Style recorded by a previous successful classification
    pub(crate) fn memoized_style(&self) -> Option<PassStyle> {
        self.0.pass_style.get().copied()
    }

    /// Record the style of a fully validated, frozen object
    pub(crate) fn memoize_style(&self, style: PassStyle) {
        let _ = self.0.pass_style.set(style);
    }

    fn is_hardened(&self) -> bool {
        self.0.hardened.load(Ordering::Acquire)
    }

    fn ensure_mutable(&self, what: &str) -> Result<(), ValueError> {
        if self.is_frozen() {
            return Err(ValueError::frozen(format!("{what} on {}", self.id())));
        }
        Ok(())
    }

    /// Define or replace an own property
    pub fn define(&self, key: impl Into<PropertyKey>, property: Property) -> Result<(), ValueError> {
        let key = key.into();
        self.ensure_mutable(&format!("define {key}"))?;
        if self.0.shape == Shape::Array {
            if let Some(index) = key.as_index() {
                self.0.length.fetch_max(index + 1, Ordering::AcqRel);
            }
        }
        self.0.props.write().insert(key, property);
        Ok(())
    }

    /// Define an enumerable data property
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<(), ValueError> {
        self.define(key, Property::data(value))
    }

    /// Append an element to an array
    pub fn push(&self, value: impl Into<Value>) -> Result<(), ValueError> {
        let index = self.length();
        self.define(index.to_string(), Property::data(value))
    }

    /// Set an array's length, leaving holes when it grows
    pub fn set_length(&self, length: usize) -> Result<(), ValueError> {
        self.ensure_mutable("set length")?;
        self.0.length.store(length, Ordering::Release);
        Ok(())
    }

    /// Array length; zero for non-arrays
    pub fn length(&self) -> usize {
        self.0.length.load(Ordering::Acquire)
    }

    /// Own keys in insertion order
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.0.props.read().keys().cloned().collect()
    }

    /// Own properties in insertion order
    pub fn own_properties(&self) -> Vec<(PropertyKey, Property)> {
        self.0
            .props
            .read()
            .iter()
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect()
    }

    /// Own property descriptor
    pub fn own_property(&self, key: &PropertyKey) -> Option<Property> {
        self.0.props.read().get(key).cloned()
    }

    /// Value of a string-named own data property
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .props
            .read()
            .get(&PropertyKey::from(key))
            .and_then(|p| p.value().cloned())
    }

    /// Array elements, with holes read as `undefined`
    pub fn elements(&self) -> Vec<Value> {
        (0..self.length())
            .map(|i| self.get(&i.to_string()).unwrap_or(Value::Undefined))
            .collect()
    }

    /// String-named own data properties in insertion order
    pub fn string_entries(&self) -> Vec<(String, Value)> {
        self.0
            .props
            .read()
            .iter()
            .filter_map(|(key, prop)| Some((key.as_str()?.to_string(), prop.value()?.clone())))
            .collect()
    }

    /// Attach a diagnostic note; allowed even after freezing
    pub fn note(&self, note: impl Into<String>) {
        let note = note.into();
        let mut notes = self.0.notes.lock();
        if !notes.contains(&note) {
            notes.push(note);
        }
    }

    /// Diagnostic notes attached so far
    pub fn notes(&self) -> Vec<String> {
        self.0.notes.lock().clone()
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.id())?;
        write_object(f, self, 0)
    }
}

/// A host value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// IEEE-754 double
    Number(f64),
    /// Arbitrary-precision integer
    BigInt(BigInt),
    /// String
    String(String),
    /// Symbol
    Symbol(Symbol),
    /// Reference to a heap object
    Object(ObjectRef),
}

impl Value {
    /// String value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Big integer value
    pub fn bigint(n: impl Into<BigInt>) -> Self {
        Value::BigInt(n.into())
    }

    /// Hardened array of the given elements
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        let array = ObjectRef::new(Shape::Array);
        for (index, item) in items.into_iter().enumerate() {
            array
                .0
                .props
                .write()
                .insert(PropertyKey::String(index.to_string()), Property::data(item));
            array.0.length.store(index + 1, Ordering::Release);
        }
        let value = Value::Object(array);
        harden(&value);
        value
    }

    /// Hardened record with the given string-keyed entries
    pub fn record<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let record = ObjectRef::new(Shape::Plain);
        {
            let mut props = record.0.props.write();
            for (key, value) in entries {
                props.insert(PropertyKey::String(key.into()), Property::data(value));
            }
        }
        let value = Value::Object(record);
        harden(&value);
        value
    }

    /// Fresh hardened promise
    pub fn promise() -> Self {
        let promise = ObjectRef::new(Shape::Promise);
        promise.freeze();
        Value::Object(promise)
    }

    /// The object this value refers to, if any
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The string contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is an error instance, passable or not
    pub fn is_error_like(&self) -> bool {
        matches!(self, Value::Object(obj) if matches!(obj.shape(), Shape::Error { .. }))
    }

    /// Whether this is a function object
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Object(obj) if matches!(obj.shape(), Shape::Function { .. }))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

/// Deep-freeze everything reachable from `value`.
///
/// Idempotent and safe on cyclic graphs.
pub fn harden(value: &Value) {
    let mut stack = vec![value.clone()];
    let mut seen = HashSet::new();
    let mut visited = Vec::new();
    while let Some(next) = stack.pop() {
        let Value::Object(obj) = next else { continue };
        if obj.is_hardened() || !seen.insert(obj.id()) {
            continue;
        }
        obj.freeze();
        for prop in obj.0.props.read().values() {
            if let Property::Data { value, .. } = prop {
                stack.push(value.clone());
            }
        }
        if let Some(marker) = obj.marker() {
            stack.push(marker.tag.clone());
        }
        visited.push(obj);
    }
    for obj in visited {
        obj.0.hardened.store(true, Ordering::Release);
    }
}

/// Build a hardened tagged value
pub fn make_tagged(tag: impl Into<String>, payload: Value) -> Value {
    let tagged = ObjectRef::with_marker(Shape::Plain, StyleMarker::tagged(tag));
    tagged
        .0
        .props
        .write()
        .insert(PropertyKey::from("payload"), Property::data(payload));
    let value = Value::Object(tagged);
    harden(&value);
    value
}

/// Build a hardened remotable with the given interface and method names
pub fn make_remotable<'a>(iface: impl Into<String>, methods: impl IntoIterator<Item = &'a str>) -> Value {
    let remotable = ObjectRef::with_marker(Shape::Plain, StyleMarker::remotable(iface));
    {
        let mut props = remotable.0.props.write();
        for name in methods {
            let method = ObjectRef::new(Shape::Function {
                name: name.to_string(),
                length: 0,
            });
            props.insert(PropertyKey::from(name), Property::data(method));
        }
    }
    let value = Value::Object(remotable);
    harden(&value);
    value
}

/// Build a hardened remotable whose interface is `Alleged: <name>`
pub fn far<'a>(name: &str, methods: impl IntoIterator<Item = &'a str>) -> Value {
    make_remotable(format!("Alleged: {name}"), methods)
}

/// Build a hardened function that is itself a remotable
pub fn far_function(name: &str) -> Value {
    let function = ObjectRef::with_marker(
        Shape::Function {
            name: name.to_string(),
            length: 0,
        },
        StyleMarker::remotable(format!("Alleged: {name}")),
    );
    function.freeze();
    Value::Object(function)
}

/// Build a hardened error of a recognized class
pub fn make_error(class: ErrorClass, message: impl Into<String>) -> Value {
    make_error_named(class.name(), message)
}

/// Build a hardened error whose prototype claims the given constructor name
pub fn make_error_named(name: impl Into<String>, message: impl Into<String>) -> Value {
    let error = ObjectRef::new(Shape::Error { name: name.into() });
    error
        .0
        .props
        .write()
        .insert(PropertyKey::from("message"), Property::hidden(message.into()));
    error.freeze();
    Value::Object(error)
}

/// Name and message of an error-like value, read leniently.
///
/// A missing or non-string message reads as the empty string.
pub fn error_parts(value: &Value) -> Option<(String, String)> {
    let obj = value.as_object()?;
    let Shape::Error { name } = obj.shape() else {
        return None;
    };
    let message = match obj.get("message") {
        Some(Value::String(message)) => message,
        _ => String::new(),
    };
    Some((name.clone(), message))
}

/// The declared interface of a remotable, if it has one
pub fn get_interface_of(value: &Value) -> Option<String> {
    let marker = value.as_object()?.marker()?;
    if marker.style != "remotable" {
        return None;
    }
    marker.tag.as_str().map(str::to_string)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => f.write_str(&js_number_to_string(*n)),
        Value::BigInt(n) => write!(f, "{n}n"),
        Value::String(s) => write!(f, "{s:?}"),
        Value::Symbol(symbol) => write!(f, "{symbol}"),
        Value::Object(obj) => write_object(f, obj, depth),
    }
}

fn write_object(f: &mut fmt::Formatter<'_>, obj: &ObjectRef, depth: usize) -> fmt::Result {
    match obj.shape() {
        Shape::Function { name, .. } => return write!(f, "[Function {name}]"),
        Shape::Promise => return f.write_str("[Promise]"),
        Shape::Error { name } => {
            let message = obj.get("message").and_then(|m| m.as_str().map(str::to_string));
            return write!(f, "{name}: {}", message.unwrap_or_default());
        }
        Shape::Array | Shape::Plain => {}
    }
    if let Some(marker) = obj.marker() {
        if marker.style == "remotable" {
            let iface = marker.tag.as_str().unwrap_or("Remotable");
            return write!(f, "Object [{iface}] {{}}");
        }
    }
    if depth >= DISPLAY_DEPTH {
        return f.write_str(if *obj.shape() == Shape::Array {
            "[Array]"
        } else {
            "[Object]"
        });
    }
    if *obj.shape() == Shape::Array {
        f.write_str("[")?;
        for (i, element) in obj.elements().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write_value(f, element, depth + 1)?;
        }
        return f.write_str("]");
    }
    if let Some(marker) = obj.marker() {
        write!(f, "{}(", marker.style)?;
        write_value(f, &marker.tag, depth + 1)?;
        f.write_str(") ")?;
    }
    f.write_str("{")?;
    for (i, (key, prop)) in obj.own_properties().iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{key}:")?;
        match prop {
            Property::Data { value, .. } => write_value(f, value, depth + 1)?,
            Property::Accessor { .. } => f.write_str("[Getter/Setter]")?,
        }
    }
    f.write_str("}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_objects_reject_mutation() {
        let obj = ObjectRef::new(Shape::Plain);
        obj.set("a", 1.0).unwrap();
        obj.freeze();
        assert!(obj.set("b", 2.0).is_err());
        // notes are diagnostic and still attach
        obj.note("hello");
        obj.note("hello");
        assert_eq!(obj.notes(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_harden_is_deep_and_cycle_safe() {
        let outer = ObjectRef::new(Shape::Plain);
        let inner = ObjectRef::new(Shape::Array);
        inner.push(Value::Object(outer.clone())).unwrap();
        outer.set("inner", Value::Object(inner.clone())).unwrap();
        harden(&Value::Object(outer.clone()));
        assert!(outer.is_frozen());
        assert!(inner.is_frozen());
    }

    #[test]
    fn test_array_holes_and_length() {
        let array = ObjectRef::new(Shape::Array);
        array.push(1.0).unwrap();
        array.set_length(3).unwrap();
        assert_eq!(array.length(), 3);
        assert_eq!(array.own_keys().len(), 1);
        let elements = array.elements();
        assert_eq!(elements[2], Value::Undefined);
    }

    #[test]
    fn test_index_keys() {
        assert_eq!(PropertyKey::from("12").as_index(), Some(12));
        assert_eq!(PropertyKey::from("0").as_index(), Some(0));
        assert_eq!(PropertyKey::from("012").as_index(), None);
        assert_eq!(PropertyKey::from("-1").as_index(), None);
        assert_eq!(PropertyKey::from("").as_index(), None);
    }

    #[test]
    fn test_display_is_bounded() {
        let deep = Value::array([Value::array([Value::array([Value::array([])])])]);
        assert_eq!(deep.to_string(), "[[[[Array]]]]");
        let record = Value::record([("a", Value::Number(1.0)), ("b", Value::string("x"))]);
        assert_eq!(record.to_string(), "{\"a\":1,\"b\":\"x\"}");
        assert_eq!(far("foo", []).to_string(), "Object [Alleged: foo] {}");
    }

    #[test]
    fn test_interface_of() {
        assert_eq!(
            get_interface_of(&far("foo", ["bar"])).as_deref(),
            Some("Alleged: foo")
        );
        assert_eq!(get_interface_of(&Value::record(Vec::<(String, Value)>::new())), None);
    }
}
