//! Pass-style classification
//!
//! Every passable has exactly one [`PassStyle`]. Primitives are classified in
//! constant time; objects go through the identity memo, then the per-call
//! cycle check, then the structural checks in fixed priority order:
//! copyArray, copyRecord, tagged, error, and finally remotable as the
//! residual style.
//!
//! The memo lives in each object and outlives the call that filled it. It
//! only ever records objects whose entire reachable copy-structure has been
//! validated; since those objects are frozen, a memo hit can never hide a
//! cycle introduced later. Cycle detection state is per call.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{PassableError, Result};
use crate::error_class::get_error_constructor;
use crate::symbol::{assert_passable_symbol, Symbol};
use crate::value::{ObjectId, ObjectRef, Property, PropertyKey, Shape, StyleMarker, Value};

/// Own properties an error may carry without being flagged.
const ERROR_OWN_PROPERTIES: &[&str] = &["message", "stack", "cause", "errors"];

/// Scheduler bookkeeping keys a native promise may carry.
const PROMISE_BOOKKEEPING: &[&str] = &["async_id_symbol", "trigger_async_id_symbol", "destroyed"];

/// The discriminant of a passable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassStyle {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Boolean,
    /// IEEE-754 double
    Number,
    /// Arbitrary-precision integer
    Bigint,
    /// String
    String,
    /// Registered or well-known symbol
    Symbol,
    /// Pass-by-copy array
    CopyArray,
    /// Pass-by-copy string-keyed record
    CopyRecord,
    /// Named single-payload wrapper
    Tagged,
    /// Capability reference, compared by identity
    Remotable,
    /// Placeholder for an asynchronous result
    Promise,
    /// Diagnostic error value
    Error,
}

impl PassStyle {
    /// All styles
    pub const ALL: [PassStyle; 13] = [
        PassStyle::Undefined,
        PassStyle::Null,
        PassStyle::Boolean,
        PassStyle::Number,
        PassStyle::Bigint,
        PassStyle::String,
        PassStyle::Symbol,
        PassStyle::CopyArray,
        PassStyle::CopyRecord,
        PassStyle::Tagged,
        PassStyle::Remotable,
        PassStyle::Promise,
        PassStyle::Error,
    ];

    /// Canonical style name
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStyle::Undefined => "undefined",
            PassStyle::Null => "null",
            PassStyle::Boolean => "boolean",
            PassStyle::Number => "number",
            PassStyle::Bigint => "bigint",
            PassStyle::String => "string",
            PassStyle::Symbol => "symbol",
            PassStyle::CopyArray => "copyArray",
            PassStyle::CopyRecord => "copyRecord",
            PassStyle::Tagged => "tagged",
            PassStyle::Remotable => "remotable",
            PassStyle::Promise => "promise",
            PassStyle::Error => "error",
        }
    }
}

impl fmt::Display for PassStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassStyle {
    type Err = PassableError;

    fn from_str(name: &str) -> Result<Self> {
        PassStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == name)
            .ok_or_else(|| PassableError::unrecognized_style(format!("Unrecognized PassStyle: {name:?}")))
    }
}

/// Per-call classification state
#[derive(Default)]
struct Classification {
    in_progress: HashSet<ObjectId>,
}

impl Classification {
    fn classify(&mut self, value: &Value) -> Result<PassStyle> {
        match value {
            Value::Undefined => Ok(PassStyle::Undefined),
            Value::Null => Ok(PassStyle::Null),
            Value::Bool(_) => Ok(PassStyle::Boolean),
            Value::Number(_) => Ok(PassStyle::Number),
            Value::BigInt(_) => Ok(PassStyle::Bigint),
            Value::String(_) => Ok(PassStyle::String),
            Value::Symbol(symbol) => {
                assert_passable_symbol(symbol)?;
                Ok(PassStyle::Symbol)
            }
            Value::Object(obj) => self.classify_object(obj),
        }
    }

    fn classify_object(&mut self, obj: &ObjectRef) -> Result<PassStyle> {
        if let Some(style) = obj.memoized_style() {
            return Ok(style);
        }
        if !self.in_progress.insert(obj.id()) {
            return Err(PassableError::cyclic(format!(
                "{} is reachable from itself",
                Value::Object(obj.clone())
            )));
        }
        let result = self.classify_fresh(obj);
        self.in_progress.remove(&obj.id());
        let style = result?;
        trace!(id = %obj.id(), %style, "memoizing pass style");
        obj.memoize_style(style);
        Ok(style)
    }

    fn classify_fresh(&mut self, obj: &ObjectRef) -> Result<PassStyle> {
        let value = Value::Object(obj.clone());
        if !obj.is_frozen() {
            return Err(PassableError::not_passable(format!(
                "Cannot pass non-frozen objects like {value}. Use harden()"
            )));
        }
        if let Some(marker) = obj.marker() {
            return match marker.style.as_str() {
                "tagged" => self.check_tagged(obj, marker),
                "remotable" => check_remotable(obj, Some(marker)),
                other => Err(PassableError::unrecognized_style(format!(
                    "Unrecognized PassStyle: {other:?} on {value}"
                ))),
            };
        }
        match obj.shape() {
            Shape::Array => self.check_copy_array(obj),
            Shape::Plain if can_be_record(obj) => self.check_copy_record(obj),
            Shape::Error { .. } => {
                for note in error_malformations(obj) {
                    debug!(id = %obj.id(), %note, "annotating malformed error");
                    obj.note(note);
                }
                Ok(PassStyle::Error)
            }
            Shape::Promise => check_promise(obj),
            Shape::Plain | Shape::Function { .. } => check_remotable(obj, None),
        }
    }

    fn check_copy_array(&mut self, obj: &ObjectRef) -> Result<PassStyle> {
        let value = Value::Object(obj.clone());
        let length = obj.length();
        let properties = obj.own_properties();
        for (key, prop) in &properties {
            let Some(index) = key.as_index().filter(|i| *i < length) else {
                return Err(PassableError::not_passable(format!(
                    "Arrays must not have non-indexes: {key} on {value}"
                )));
            };
            match prop {
                Property::Accessor { .. } => {
                    return Err(PassableError::not_passable(format!(
                        "Arrays must not contain accessors: {index} on {value}"
                    )))
                }
                Property::Data {
                    enumerable: false, ..
                } => {
                    return Err(PassableError::not_passable(format!(
                        "Arrays must not have non-enumerable element {index} on {value}"
                    )))
                }
                Property::Data { .. } => {}
            }
        }
        if properties.len() != length {
            return Err(PassableError::not_passable(format!(
                "Arrays must not contain holes: {value}"
            )));
        }
        for element in obj.elements() {
            self.classify(&element)?;
        }
        Ok(PassStyle::CopyArray)
    }

    fn check_copy_record(&mut self, obj: &ObjectRef) -> Result<PassStyle> {
        let value = Value::Object(obj.clone());
        let mut children = Vec::new();
        for (key, prop) in obj.own_properties() {
            if matches!(key, PropertyKey::Symbol(_)) {
                return Err(PassableError::not_passable(format!(
                    "Records can only have string-named properties: {key} on {value}"
                )));
            }
            match prop {
                Property::Accessor { .. } => {
                    return Err(PassableError::not_passable(format!(
                        "{key} must not be an accessor property: {value}"
                    )))
                }
                Property::Data {
                    enumerable: false, ..
                } => {
                    return Err(PassableError::not_passable(format!(
                        "{key} must be an enumerable property: {value}"
                    )))
                }
                Property::Data { value: child, .. } => children.push(child),
            }
        }
        for child in &children {
            self.classify(child)?;
        }
        Ok(PassStyle::CopyRecord)
    }

    fn check_tagged(&mut self, obj: &ObjectRef, marker: &StyleMarker) -> Result<PassStyle> {
        let value = Value::Object(obj.clone());
        if *obj.shape() != Shape::Plain {
            return Err(PassableError::not_passable(format!(
                "Tagged values must be plain objects: {value}"
            )));
        }
        if marker.tag.as_str().is_none() {
            return Err(PassableError::not_passable(format!(
                "Tagged tag must be a string: {} on {value}",
                marker.tag
            )));
        }
        let properties = obj.own_properties();
        let unexpected: Vec<String> = properties
            .iter()
            .filter(|(key, _)| key.as_str() != Some("payload"))
            .map(|(key, _)| key.to_string())
            .collect();
        if !unexpected.is_empty() {
            return Err(PassableError::not_passable(format!(
                "Unexpected properties on tagged record [{}]: {value}",
                unexpected.join(",")
            )));
        }
        let payload = match properties.first() {
            Some((_, Property::Data {
                value: payload,
                enumerable: true,
            })) => payload.clone(),
            Some(_) => {
                return Err(PassableError::not_passable(format!(
                    "Tagged payload must be an enumerable data property: {value}"
                )))
            }
            None => {
                return Err(PassableError::not_passable(format!(
                    "Tagged values must have a payload: {value}"
                )))
            }
        };
        self.classify(&payload)?;
        Ok(PassStyle::Tagged)
    }
}

/// A function without a style marker. Far functions are passable values,
/// not methods.
fn can_be_method(value: &Value) -> bool {
    value.is_function() && value.as_object().is_some_and(|obj| obj.marker().is_none())
}

/// A plain object is a candidate record unless some value can be a method.
///
/// A function is either wholly a capability or wholly data, never a method
/// hidden inside pass-by-copy data.
fn can_be_record(obj: &ObjectRef) -> bool {
    obj.own_properties()
        .iter()
        .all(|(_, prop)| !prop.value().is_some_and(can_be_method))
}

fn check_remotable(obj: &ObjectRef, marker: Option<&StyleMarker>) -> Result<PassStyle> {
    let value = Value::Object(obj.clone());
    if let Some(marker) = marker {
        let iface = marker.tag.as_str().ok_or_else(|| {
            PassableError::not_passable(format!("Interface {} must be a string", marker.tag))
        })?;
        if !(iface == "Remotable" || iface.starts_with("Alleged: ") || iface.starts_with("DebugName: ")) {
            return Err(PassableError::not_passable(format!(
                "For now, iface {iface:?} must be \"Remotable\" or begin with \"Alleged: \" or \"DebugName: \"; unimplemented"
            )));
        }
    }
    match obj.shape() {
        Shape::Function { .. } => {
            for key in obj.own_keys() {
                if !matches!(key.as_str(), Some("name" | "length")) {
                    return Err(PassableError::not_passable(format!(
                        "For now, far functions can only have name and length properties, not {key}"
                    )));
                }
            }
        }
        Shape::Plain => {
            for (key, prop) in obj.own_properties() {
                match prop {
                    Property::Accessor { .. } => {
                        return Err(PassableError::not_passable(format!(
                            "cannot serialize Remotables with accessors like {key} in {value}"
                        )))
                    }
                    Property::Data { value: method, .. } if !can_be_method(&method) => {
                        return Err(PassableError::not_passable(format!(
                            "cannot serialize Remotables with non-methods like {key} in {value}"
                        )))
                    }
                    Property::Data { .. } => {}
                }
            }
        }
        shape => {
            return Err(PassableError::not_passable(format!(
                "A {shape:?} cannot be a pass-by-remote: {value}"
            )))
        }
    }
    Ok(PassStyle::Remotable)
}

fn check_promise(obj: &ObjectRef) -> Result<PassStyle> {
    let foreign: Vec<String> = obj
        .own_keys()
        .into_iter()
        .filter(|key| !is_promise_bookkeeping(key))
        .map(|key| key.to_string())
        .collect();
    if !foreign.is_empty() {
        return Err(PassableError::not_passable(format!(
            "{} - Must not have any own properties: [{}]",
            Value::Object(obj.clone()),
            foreign.join(",")
        )));
    }
    Ok(PassStyle::Promise)
}

fn is_promise_bookkeeping(key: &PropertyKey) -> bool {
    let PropertyKey::Symbol(symbol) = key else {
        return false;
    };
    let description = match symbol {
        Symbol::Anonymous { description, .. } => description.clone(),
        Symbol::Registered(name) => Some(name.clone()),
        Symbol::WellKnown(_) => None,
    };
    description.is_some_and(|d| PROMISE_BOOKKEEPING.contains(&d.as_str()))
}

/// Everything wrong with an error object, as diagnostic notes.
///
/// Errors are passed for their diagnostic value, so these never reject.
pub fn error_malformations(obj: &ObjectRef) -> Vec<String> {
    let mut notes = Vec::new();
    let Shape::Error { name } = obj.shape() else {
        return notes;
    };
    if get_error_constructor(name).is_none() {
        notes.push(format!(
            "Errors must inherit from an error class .prototype: {name:?}"
        ));
    }
    let extra: Vec<String> = obj
        .own_keys()
        .into_iter()
        .filter(|key| !key.as_str().is_some_and(|k| ERROR_OWN_PROPERTIES.contains(&k)))
        .map(|key| key.to_string())
        .collect();
    if !extra.is_empty() {
        notes.push(format!(
            "Passed Error has extra unpassed properties [{}]",
            extra.join(",")
        ));
    }
    match obj.own_property(&PropertyKey::from("message")) {
        None => {}
        Some(Property::Data {
            value: Value::String(message),
            enumerable,
        }) => {
            if enumerable {
                notes.push(format!(
                    "Passed Error {message:?} must not have an enumerable message"
                ));
            }
        }
        Some(Property::Data { value, .. }) => {
            notes.push(format!("Malformed error object message {value}"));
        }
        Some(Property::Accessor { .. }) => {
            notes.push("Passed Error message must not be an accessor".to_string());
        }
    }
    notes
}

/// Classify a value, failing if it is not passable
pub fn pass_style_of(value: &Value) -> Result<PassStyle> {
    Classification::default().classify(value)
}

/// Fail unless the value is passable
pub fn assert_passable(value: &Value) -> Result<()> {
    pass_style_of(value).map(|_| ())
}

/// Whether the value is passable
pub fn is_passable(value: &Value) -> bool {
    pass_style_of(value).is_ok()
}
