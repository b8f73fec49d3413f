//! Format-neutral traversal of a passable into a JSON tree
//!
//! [`encode_tree`] classifies every node once and hands the pieces to a
//! [`WireBuilder`], which only decides how each case is spelled. Capability
//! and error leaves are resolved through a [`CapabilityEncoder`] first, so
//! builders never see slot tables or error ids being allocated.

use num_bigint::BigInt;
use ocap_core::{
    compare_utf16, error_parts, name_for_passable_symbol, pass_style_of, PassStyle,
    PassableError, Result, Value,
};
use serde_json::Value as JsonValue;

/// Which kind of capability a slot refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// A remotable object
    Remotable,
    /// A promise
    Promise,
}

/// A capability leaf after slot allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    /// Kind of capability in the slot
    pub kind: SlotKind,
    /// Index into the message's slot table
    pub index: usize,
    /// Interface name, present on the first occurrence of a remotable only
    pub iface: Option<String>,
}

/// An error leaf after diagnostics have been recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRef {
    /// Constructor name, e.g. `TypeError`
    pub name: String,
    /// Message text
    pub message: String,
    /// Correlation id, when error tagging is on
    pub error_id: Option<String>,
}

/// Resolves capability and error leaves while encoding
pub trait CapabilityEncoder {
    /// Allocate or reuse a slot for a remotable or promise
    fn encode_slot(&mut self, value: &Value, kind: SlotKind) -> Result<SlotRef>;

    /// Record an outgoing error
    fn encode_error(&mut self, value: &Value) -> Result<ErrorRef>;
}

/// Rejects every capability and error
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapabilities;

impl CapabilityEncoder for NoCapabilities {
    fn encode_slot(&mut self, value: &Value, kind: SlotKind) -> Result<SlotRef> {
        let what = match kind {
            SlotKind::Remotable => "remotable",
            SlotKind::Promise => "promise",
        };
        Err(PassableError::invalid(format!("{what} unexpected: {value}")))
    }

    fn encode_error(&mut self, value: &Value) -> Result<ErrorRef> {
        Err(PassableError::invalid(format!("error object unexpected: {value}")))
    }
}

/// Spells each case of a passable in one wire format
pub trait WireBuilder {
    /// `undefined`
    fn undefined(&self) -> Result<JsonValue>;

    /// `null`
    fn null(&self) -> Result<JsonValue> {
        Ok(JsonValue::Null)
    }

    /// A boolean
    fn boolean(&self, b: bool) -> Result<JsonValue> {
        Ok(JsonValue::Bool(b))
    }

    /// A number, possibly NaN or infinite
    fn number(&self, n: f64) -> Result<JsonValue>;

    /// A big integer
    fn bigint(&self, n: &BigInt) -> Result<JsonValue>;

    /// A string
    fn string(&self, s: &str) -> Result<JsonValue>;

    /// A passable symbol, given by its passable name
    fn symbol(&self, name: &str) -> Result<JsonValue>;

    /// An array of already-built elements
    fn array(&self, items: Vec<JsonValue>) -> Result<JsonValue> {
        Ok(JsonValue::Array(items))
    }

    /// A record, entries in ascending UTF-16 order of their raw names
    fn record(&self, entries: Vec<(String, JsonValue)>) -> Result<JsonValue>;

    /// A tagged value
    fn tagged(&self, tag: &str, payload: JsonValue) -> Result<JsonValue>;

    /// A capability slot
    fn slot(&self, slot: &SlotRef) -> Result<JsonValue>;

    /// An error
    fn error(&self, error: &ErrorRef) -> Result<JsonValue>;
}

/// Encode a passable through `builder`.
///
/// An error at the root is encoded even when it is not passable, since its
/// diagnostic content matters more than its validity.
pub fn encode_tree<B>(value: &Value, builder: &B, caps: &mut dyn CapabilityEncoder) -> Result<JsonValue>
where
    B: WireBuilder + ?Sized,
{
    if value.is_error_like() {
        let error = caps.encode_error(value)?;
        return builder.error(&error);
    }
    encode_node(value, builder, caps)
}

fn encode_node<B>(value: &Value, builder: &B, caps: &mut dyn CapabilityEncoder) -> Result<JsonValue>
where
    B: WireBuilder + ?Sized,
{
    let style = pass_style_of(value)?;
    match (style, value) {
        (PassStyle::Undefined, _) => builder.undefined(),
        (PassStyle::Null, _) => builder.null(),
        (PassStyle::Boolean, Value::Bool(b)) => builder.boolean(*b),
        (PassStyle::Number, Value::Number(n)) => builder.number(*n),
        (PassStyle::Bigint, Value::BigInt(n)) => builder.bigint(n),
        (PassStyle::String, Value::String(s)) => builder.string(s),
        (PassStyle::Symbol, Value::Symbol(symbol)) => {
            let name = name_for_passable_symbol(symbol).ok_or_else(|| {
                PassableError::not_passable(format!(
                    "Only registered symbols or well-known symbols are passable: {symbol}"
                ))
            })?;
            builder.symbol(&name)
        }
        (PassStyle::CopyArray, Value::Object(array)) => {
            let items = array
                .elements()
                .iter()
                .map(|element| encode_node(element, builder, caps))
                .collect::<Result<Vec<_>>>()?;
            builder.array(items)
        }
        (PassStyle::CopyRecord, Value::Object(record)) => {
            let mut entries = record.string_entries();
            entries.sort_by(|(a, _), (b, _)| compare_utf16(a, b));
            let entries = entries
                .into_iter()
                .map(|(name, v)| Ok((name, encode_node(&v, builder, caps)?)))
                .collect::<Result<Vec<_>>>()?;
            builder.record(entries)
        }
        (PassStyle::Tagged, Value::Object(tagged)) => {
            let tag = tagged
                .marker()
                .and_then(|marker| marker.tag.as_str().map(str::to_string))
                .ok_or_else(|| PassableError::unrecognized_style("tagged value without a string tag"))?;
            let payload = tagged.get("payload").unwrap_or(Value::Undefined);
            let payload = encode_node(&payload, builder, caps)?;
            builder.tagged(&tag, payload)
        }
        (PassStyle::Remotable, _) => builder.slot(&caps.encode_slot(value, SlotKind::Remotable)?),
        (PassStyle::Promise, _) => builder.slot(&caps.encode_slot(value, SlotKind::Promise)?),
        (PassStyle::Error, _) => builder.error(&caps.encode_error(value)?),
        (style, _) => Err(PassableError::unrecognized_style(format!(
            "unrecognized passStyle {style} for {value}"
        ))),
    }
}

/// Name and message of an error-like value for the wire
pub fn wire_error_parts(value: &Value) -> Result<(String, String)> {
    error_parts(value).ok_or_else(|| PassableError::invalid(format!("not an error: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capdata::CapDataBuilder;
    use ocap_core::{far, make_error, ErrorClass};

    #[test]
    fn test_records_visit_names_ascending() {
        let record = Value::record([("b", Value::Null), ("a", Value::Null), ("B", Value::Null)]);
        let json = encode_tree(&record, &CapDataBuilder, &mut NoCapabilities).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["B", "a", "b"]);
    }

    #[test]
    fn test_capabilities_need_an_encoder() {
        let err = encode_tree(&far("x", []), &CapDataBuilder, &mut NoCapabilities).unwrap_err();
        assert!(err.to_string().contains("remotable unexpected"));
        let err = encode_tree(&Value::promise(), &CapDataBuilder, &mut NoCapabilities).unwrap_err();
        assert!(err.to_string().contains("promise unexpected"));
        let err = encode_tree(&make_error(ErrorClass::Error, "x"), &CapDataBuilder, &mut NoCapabilities)
            .unwrap_err();
        assert!(err.to_string().contains("error object unexpected"));
    }

    #[test]
    fn test_non_passables_are_rejected() {
        let open = ocap_core::ObjectRef::new(ocap_core::Shape::Array);
        let err = encode_tree(&Value::Object(open), &CapDataBuilder, &mut NoCapabilities).unwrap_err();
        assert!(err.to_string().contains("Cannot pass non-frozen objects like"));
    }
}
