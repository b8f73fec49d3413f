//! Format-neutral reconstruction of passables
//!
//! Both recognizers validate their JSON into a [`Revivable`] tree first, so
//! [`revive`] never has to think about envelopes or escapes. Capability and
//! error leaves go through a [`CapabilityDecoder`].

use std::collections::HashSet;

use num_bigint::BigInt;
use ocap_core::{
    get_error_constructor, make_error, make_tagged, ErrorClass, PassableError, Result, Symbol,
    Value,
};

use crate::builder::SlotKind;

/// A validated wire tree, independent of the body format it came from
#[derive(Debug, Clone, PartialEq)]
pub enum Revivable {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// A boolean
    Bool(bool),
    /// A number, possibly NaN or infinite
    Number(f64),
    /// An exact big integer
    BigInt(BigInt),
    /// A string, already unescaped
    String(String),
    /// A passable symbol
    Symbol(Symbol),
    /// An array
    Array(Vec<Revivable>),
    /// A record, names already unescaped
    Record(Vec<(String, Revivable)>),
    /// A tagged value
    Tagged {
        /// The tag
        tag: String,
        /// The payload
        payload: Box<Revivable>,
    },
    /// A capability slot reference
    Slot {
        /// The kind the body claims, when the format says; CapData does not
        kind: Option<SlotKind>,
        /// Index into the slot table
        index: usize,
        /// Interface name, if the body carried one
        iface: Option<String>,
    },
    /// An error
    Error {
        /// Constructor name
        name: String,
        /// Message text
        message: String,
        /// Correlation id, if the sender tagged it
        error_id: Option<String>,
    },
}

impl Revivable {
    /// Largest slot index referenced anywhere in the tree
    pub fn max_slot_index(&self) -> Option<usize> {
        match self {
            Revivable::Slot { index, .. } => Some(*index),
            Revivable::Array(items) => items.iter().filter_map(Revivable::max_slot_index).max(),
            Revivable::Record(entries) => entries
                .iter()
                .filter_map(|(_, value)| value.max_slot_index())
                .max(),
            Revivable::Tagged { payload, .. } => payload.max_slot_index(),
            _ => None,
        }
    }
}

/// Resolves capability and error leaves while reviving
pub trait CapabilityDecoder {
    /// Produce the capability for a slot reference
    fn decode_slot(&mut self, kind: Option<SlotKind>, index: usize, iface: Option<&str>)
        -> Result<Value>;

    /// Produce an error from its wire parts
    fn decode_error(&mut self, name: &str, message: &str, error_id: Option<&str>) -> Result<Value>;
}

/// Rebuild errors locally and reject every slot
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalErrors;

impl CapabilityDecoder for LocalErrors {
    fn decode_slot(&mut self, _kind: Option<SlotKind>, index: usize, _iface: Option<&str>) -> Result<Value> {
        Err(PassableError::invalid(format!("slot {index} unexpected")))
    }

    fn decode_error(&mut self, name: &str, message: &str, error_id: Option<&str>) -> Result<Value> {
        Ok(remote_error(name, message, error_id))
    }
}

/// Build a local error standing in for a remote one.
///
/// Unknown constructor names fall back to `Error`. The result is noted with
/// its origin so diagnostics can trace it back to the sender.
pub fn remote_error(name: &str, message: &str, error_id: Option<&str>) -> Value {
    let class = get_error_constructor(name).unwrap_or(ErrorClass::Error);
    let error = make_error(class, message);
    if let Some(obj) = error.as_object() {
        match error_id {
            Some(id) => obj.note(format!("Remote{class}({id})")),
            None => obj.note(format!("Remote{class}")),
        }
    }
    error
}

/// Rebuild a host value from a validated tree
pub fn revive(tree: &Revivable, caps: &mut dyn CapabilityDecoder) -> Result<Value> {
    match tree {
        Revivable::Undefined => Ok(Value::Undefined),
        Revivable::Null => Ok(Value::Null),
        Revivable::Bool(b) => Ok(Value::Bool(*b)),
        Revivable::Number(n) => Ok(Value::Number(*n)),
        Revivable::BigInt(n) => Ok(Value::BigInt(n.clone())),
        Revivable::String(s) => Ok(Value::String(s.clone())),
        Revivable::Symbol(symbol) => Ok(Value::Symbol(symbol.clone())),
        Revivable::Array(items) => Ok(Value::array(
            items
                .iter()
                .map(|item| revive(item, caps))
                .collect::<Result<Vec<_>>>()?,
        )),
        Revivable::Record(entries) => {
            let mut seen = HashSet::new();
            let mut revived = Vec::with_capacity(entries.len());
            for (name, value) in entries {
                if !seen.insert(name.as_str()) {
                    return Err(PassableError::malformed(
                        name.as_str(),
                        format!("duplicate record property {name:?}"),
                    ));
                }
                revived.push((name.clone(), revive(value, caps)?));
            }
            Ok(Value::record(revived))
        }
        Revivable::Tagged { tag, payload } => Ok(make_tagged(tag.clone(), revive(payload, caps)?)),
        Revivable::Slot { kind, index, iface } => caps.decode_slot(*kind, *index, iface.as_deref()),
        Revivable::Error {
            name,
            message,
            error_id,
        } => caps.decode_error(name, message, error_id.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocap_core::{error_parts, pass_style_of, PassStyle};

    #[test]
    fn test_max_slot_index_searches_nested_values() {
        let slot = |index| Revivable::Slot {
            kind: None,
            index,
            iface: None,
        };
        let tree = Revivable::Array(vec![
            slot(1),
            Revivable::Record(vec![("a".into(), slot(4))]),
            Revivable::Tagged {
                tag: "t".into(),
                payload: Box::new(slot(2)),
            },
        ]);
        assert_eq!(tree.max_slot_index(), Some(4));
        assert_eq!(Revivable::Null.max_slot_index(), None);
    }

    #[test]
    fn test_remote_errors_fall_back_to_error() {
        let error = remote_error("NotAnError", "boom", Some("error:x#1"));
        assert_eq!(error_parts(&error), Some(("Error".into(), "boom".into())));
        let notes = error.as_object().unwrap().notes();
        assert_eq!(notes, ["RemoteError(error:x#1)"]);

        let error = remote_error("URIError", "bad uri", None);
        assert_eq!(error_parts(&error).unwrap().0, "URIError");
        assert_eq!(error.as_object().unwrap().notes(), ["RemoteURIError"]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let tree = Revivable::Record(vec![
            ("a".into(), Revivable::Null),
            ("a".into(), Revivable::Bool(true)),
        ]);
        let err = revive(&tree, &mut LocalErrors).unwrap_err();
        assert_eq!(err.field(), Some("a"));
    }

    #[test]
    fn test_revived_copy_data_is_hardened() {
        let tree = Revivable::Tagged {
            tag: "copySet".into(),
            payload: Box::new(Revivable::Array(vec![Revivable::String("a".into())])),
        };
        let value = revive(&tree, &mut LocalErrors).unwrap();
        assert_eq!(pass_style_of(&value).unwrap(), PassStyle::Tagged);
        assert!(revive(
            &Revivable::Slot {
                kind: None,
                index: 0,
                iface: None
            },
            &mut LocalErrors
        )
        .is_err());
    }
}
