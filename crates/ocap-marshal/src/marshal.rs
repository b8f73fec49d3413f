//! The marshaller: passables to and from `{body, slots}` messages
//!
//! A [`Marshal`] owns the two slot conversion callbacks and the error id
//! counter. Slot tables and revival memos live in per-call sessions, so one
//! marshaller can serve concurrent callers.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use ocap_core::{
    assert_passable, get_interface_of, harden, pass_style_of, ObjectId, PassStyle, PassableError,
    Result, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::builder::{encode_tree, wire_error_parts, CapabilityEncoder, ErrorRef, SlotKind, SlotRef};
use crate::capdata::{recognize_capdata, CapDataBuilder};
use crate::config::{BodyFormat, ErrorTagging, MarshalOptions};
use crate::json::{parse_body_text, to_body_text};
use crate::revive::{remote_error, revive, CapabilityDecoder, Revivable};
use crate::smallcaps::{recognize_smallcaps, SmallcapsBuilder, SMALLCAPS_PREFIX};

/// An encoded message: a JSON body plus the capabilities it refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapData<S> {
    /// JSON text, `#`-prefixed for Smallcaps
    pub body: String,
    /// Slot identifiers, indexed by the body's slot references
    pub slots: Vec<S>,
}

impl CapData<JsonValue> {
    /// Parse a `{"body": ..., "slots": [...]}` JSON object
    pub fn from_json(text: &str) -> Result<Self> {
        let json = parse_body_text(text)?;
        let JsonValue::Object(mut map) = json else {
            return Err(PassableError::malformed(
                "capdata",
                "unserialize() given non-capdata (not an object)",
            ));
        };
        let body = match map.remove("body") {
            Some(JsonValue::String(body)) => body,
            _ => {
                return Err(PassableError::malformed(
                    "body",
                    "unserialize() given non-capdata (.body is not a string)",
                ))
            }
        };
        let slots = match map.remove("slots") {
            Some(JsonValue::Array(slots)) => slots,
            _ => {
                return Err(PassableError::malformed(
                    "slots",
                    "unserialize() given non-capdata (.slots are not Array)",
                ))
            }
        };
        Ok(CapData { body, slots })
    }
}

/// Converts an outgoing capability to its slot identifier
pub trait ValToSlot<S>: Send + Sync {
    /// Produce the slot for a remotable or promise
    fn val_to_slot(&self, value: &Value) -> Result<S>;
}

impl<S, F> ValToSlot<S> for F
where
    F: Fn(&Value) -> Result<S> + Send + Sync,
{
    fn val_to_slot(&self, value: &Value) -> Result<S> {
        self(value)
    }
}

/// Converts an incoming slot identifier to a capability
pub trait SlotToVal<S>: Send + Sync {
    /// Produce the capability for a slot; `iface` is the interface the body
    /// declared, if any
    fn slot_to_val(&self, slot: &S, iface: Option<&str>) -> Result<Value>;
}

impl<S, F> SlotToVal<S> for F
where
    F: Fn(&S, Option<&str>) -> Result<Value> + Send + Sync,
{
    fn slot_to_val(&self, slot: &S, iface: Option<&str>) -> Result<Value> {
        self(slot, iface)
    }
}

/// Receives each tagged outgoing error with its id
pub type ErrorSink = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// Encode a passable as body text in the given format
pub fn encode_body(value: &Value, format: BodyFormat, caps: &mut dyn CapabilityEncoder) -> Result<String> {
    match format {
        BodyFormat::Capdata => to_body_text(&encode_tree(value, &CapDataBuilder, caps)?),
        BodyFormat::Smallcaps => {
            let json = encode_tree(value, &SmallcapsBuilder, caps)?;
            Ok(format!("{SMALLCAPS_PREFIX}{}", to_body_text(&json)?))
        }
    }
}

/// Parse and validate body text of either format
pub fn recognize_body(body: &str) -> Result<Revivable> {
    match body.strip_prefix(SMALLCAPS_PREFIX) {
        Some(rest) => recognize_smallcaps(&parse_body_text(rest)?),
        None => recognize_capdata(&parse_body_text(body)?),
    }
}

/// Which body format a body is written in
pub fn body_format_of(body: &str) -> BodyFormat {
    if body.starts_with(SMALLCAPS_PREFIX) {
        BodyFormat::Smallcaps
    } else {
        BodyFormat::Capdata
    }
}

/// Converts passables to and from [`CapData`]
pub struct Marshal<S> {
    val_to_slot: Box<dyn ValToSlot<S>>,
    slot_to_val: Box<dyn SlotToVal<S>>,
    options: MarshalOptions,
    error_count: AtomicU64,
    error_sink: Option<ErrorSink>,
}

impl<S> fmt::Debug for Marshal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshal")
            .field("options", &self.options)
            .field("error_count", &self.error_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Marshal<Value> {
    /// A marshaller whose slots are the capabilities themselves
    pub fn identity(options: MarshalOptions) -> Self {
        Marshal::new(
            |value: &Value| -> Result<Value> { Ok(value.clone()) },
            |slot: &Value, _iface: Option<&str>| -> Result<Value> { Ok(slot.clone()) },
            options,
        )
    }
}

impl<S> Marshal<S> {
    /// Create a marshaller from slot conversion callbacks
    pub fn new(
        val_to_slot: impl ValToSlot<S> + 'static,
        slot_to_val: impl SlotToVal<S> + 'static,
        options: MarshalOptions,
    ) -> Self {
        let error_count = AtomicU64::new(options.error_id_num);
        Self {
            val_to_slot: Box::new(val_to_slot),
            slot_to_val: Box::new(slot_to_val),
            options,
            error_count,
            error_sink: None,
        }
    }

    /// Route tagged outgoing errors to `sink` instead of the debug log
    pub fn with_error_sink(mut self, sink: impl Fn(&str, &Value) + Send + Sync + 'static) -> Self {
        self.error_sink = Some(Box::new(sink));
        self
    }

    /// The options this marshaller was built with
    pub fn options(&self) -> &MarshalOptions {
        &self.options
    }

    /// Encode a passable.
    ///
    /// Fails if the value is not passable, or if a conversion callback fails.
    /// Each call gets a fresh slot table.
    pub fn to_capdata(&self, value: &Value) -> Result<CapData<S>> {
        let mut session = EncodeSession {
            marshal: self,
            slots: IndexMap::new(),
        };
        let body = encode_body(value, self.options.body_format, &mut session)?;
        let slots = session.slots.into_values().collect();
        Ok(CapData { body, slots })
    }

    /// Decode a message of either body format.
    ///
    /// Every slot reference is checked against the slot table before any
    /// callback runs. The result is hardened and passable.
    #[tracing::instrument(level = "trace", skip_all, fields(slots = data.slots.len()))]
    pub fn from_capdata(&self, data: &CapData<S>) -> Result<Value> {
        let tree = recognize_body(&data.body)?;
        if let Some(index) = tree.max_slot_index() {
            if index >= data.slots.len() {
                return Err(PassableError::malformed(
                    "slots",
                    format!(
                        "slot index {index} out of range for {} slots",
                        data.slots.len()
                    ),
                ));
            }
        }
        let mut session = DecodeSession {
            marshal: self,
            slots: &data.slots,
            revived: HashMap::new(),
        };
        let value = revive(&tree, &mut session)?;
        harden(&value);
        assert_passable(&value)?;
        Ok(value)
    }

    fn next_error_id(&self) -> String {
        let n = self.error_count.fetch_add(1, Ordering::Relaxed) + 1;
        format!("error:{}#{n}", self.options.marshal_name)
    }
}

struct EncodeSession<'m, S> {
    marshal: &'m Marshal<S>,
    slots: IndexMap<ObjectId, S>,
}

impl<S> CapabilityEncoder for EncodeSession<'_, S> {
    fn encode_slot(&mut self, value: &Value, kind: SlotKind) -> Result<SlotRef> {
        let obj = value.as_object().ok_or_else(|| {
            PassableError::invalid(format!("capability must be an object: {value}"))
        })?;
        if let Some(index) = self.slots.get_index_of(&obj.id()) {
            return Ok(SlotRef {
                kind,
                index,
                iface: None,
            });
        }
        let slot = self.marshal.val_to_slot.val_to_slot(value)?;
        let (index, _) = self.slots.insert_full(obj.id(), slot);
        let iface = match kind {
            SlotKind::Remotable => get_interface_of(value),
            SlotKind::Promise => None,
        };
        Ok(SlotRef { kind, index, iface })
    }

    fn encode_error(&mut self, value: &Value) -> Result<ErrorRef> {
        let (name, message) = wire_error_parts(value)?;
        let error_id = match self.marshal.options.error_tagging {
            ErrorTagging::Off => None,
            ErrorTagging::On => {
                let id = self.marshal.next_error_id();
                if let Some(obj) = value.as_object() {
                    obj.note(format!("Sent as {id}"));
                }
                match &self.marshal.error_sink {
                    Some(sink) => sink(&id, value),
                    None => tracing::debug!(error_id = %id, error = %value, "Temporary logging of sent error"),
                }
                Some(id)
            }
        };
        Ok(ErrorRef {
            name,
            message,
            error_id,
        })
    }
}

struct DecodeSession<'m, 'd, S> {
    marshal: &'m Marshal<S>,
    slots: &'d [S],
    revived: HashMap<usize, Value>,
}

impl<S> CapabilityDecoder for DecodeSession<'_, '_, S> {
    fn decode_slot(&mut self, kind: Option<SlotKind>, index: usize, iface: Option<&str>) -> Result<Value> {
        let value = match self.revived.get(&index) {
            Some(value) => value.clone(),
            None => {
                let slot = self.slots.get(index).ok_or_else(|| {
                    PassableError::malformed("slots", format!("slot index {index} out of range"))
                })?;
                let value = self.marshal.slot_to_val.slot_to_val(slot, iface)?;
                self.revived.insert(index, value.clone());
                value
            }
        };
        check_slot_kind(&value, kind, index)?;
        Ok(value)
    }

    fn decode_error(&mut self, name: &str, message: &str, error_id: Option<&str>) -> Result<Value> {
        Ok(remote_error(name, message, error_id))
    }
}

fn check_slot_kind(value: &Value, kind: Option<SlotKind>, index: usize) -> Result<()> {
    let style = pass_style_of(value)?;
    let ok = match kind {
        Some(SlotKind::Remotable) => style == PassStyle::Remotable,
        Some(SlotKind::Promise) => style == PassStyle::Promise,
        None => matches!(style, PassStyle::Remotable | PassStyle::Promise),
    };
    if ok {
        return Ok(());
    }
    let expected = match kind {
        Some(SlotKind::Remotable) => "remotable",
        Some(SlotKind::Promise) => "promise",
        None => "remotable or promise",
    };
    Err(PassableError::callback(format!(
        "slot {index} must convert to a {expected}, got {style}: {value}"
    )))
}
