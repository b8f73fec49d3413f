//! Presences for slots read from the command line
//!
//! Messages read by the CLI refer to capabilities the CLI does not have.
//! Each slot becomes a local stand-in (a presence) on the way in, and the
//! table remembers which slot it came from so it can be written back out.

use std::collections::HashMap;

use indexmap::IndexMap;
use ocap_core::{
    assert_passable, get_interface_of, harden, make_remotable, ObjectId, PassableError, Result,
    Value,
};
use ocap_marshal::{
    recognize_body, remote_error, revive, wire_error_parts, CapData, CapabilityDecoder,
    CapabilityEncoder, ErrorRef, ErrorTagging, SlotKind, SlotRef,
};
use serde_json::Value as JsonValue;

/// Interface given to presences whose slot declared none
const DEFAULT_IFACE: &str = "Remotable";

/// Maps slots of one incoming message to presences and back
#[derive(Debug, Default)]
pub struct SlotTable {
    incoming: Vec<JsonValue>,
    revived: HashMap<usize, Value>,
    slot_of: HashMap<ObjectId, usize>,
    error_ids: HashMap<ObjectId, String>,
}

impl SlotTable {
    /// Decode a message, creating a presence for each slot it references
    pub fn decode(data: &CapData<JsonValue>) -> Result<(Self, Value)> {
        let tree = recognize_body(&data.body)?;
        if let Some(index) = tree.max_slot_index() {
            if index >= data.slots.len() {
                return Err(PassableError::malformed(
                    "slots",
                    format!("slot index {index} out of range for {} slots", data.slots.len()),
                ));
            }
        }
        let mut table = SlotTable {
            incoming: data.slots.clone(),
            ..SlotTable::default()
        };
        let value = revive(&tree, &mut table)?;
        harden(&value);
        assert_passable(&value)?;
        tracing::debug!(slots = table.revived.len(), "decoded message");
        Ok((table, value))
    }

    /// Index of the incoming slot a presence stands for
    pub fn slot_index(&self, value: &Value) -> Option<usize> {
        self.slot_of.get(&value.as_object()?.id()).copied()
    }

    /// Every presence's incoming slot index
    pub fn slot_indices(&self) -> HashMap<ObjectId, usize> {
        self.slot_of.clone()
    }

    /// A fresh outgoing slot table that reuses this table's slots
    pub fn encoder(&self, error_tagging: ErrorTagging) -> OutgoingSlots<'_> {
        OutgoingSlots {
            table: self,
            slots: IndexMap::new(),
            error_tagging,
        }
    }
}

impl CapabilityDecoder for SlotTable {
    fn decode_slot(&mut self, kind: Option<SlotKind>, index: usize, iface: Option<&str>) -> Result<Value> {
        if let Some(presence) = self.revived.get(&index) {
            return Ok(presence.clone());
        }
        let presence = match kind {
            Some(SlotKind::Promise) => Value::promise(),
            _ => make_remotable(iface.unwrap_or(DEFAULT_IFACE), []),
        };
        if let Some(obj) = presence.as_object() {
            self.slot_of.insert(obj.id(), index);
        }
        self.revived.insert(index, presence.clone());
        Ok(presence)
    }

    fn decode_error(&mut self, name: &str, message: &str, error_id: Option<&str>) -> Result<Value> {
        let error = remote_error(name, message, error_id);
        if let (Some(obj), Some(id)) = (error.as_object(), error_id) {
            self.error_ids.insert(obj.id(), id.to_string());
        }
        Ok(error)
    }
}

/// Slot allocation for one outgoing message
#[derive(Debug)]
pub struct OutgoingSlots<'a> {
    table: &'a SlotTable,
    slots: IndexMap<ObjectId, JsonValue>,
    error_tagging: ErrorTagging,
}

impl OutgoingSlots<'_> {
    /// The outgoing slots in first-use order
    pub fn into_slots(self) -> Vec<JsonValue> {
        self.slots.into_values().collect()
    }
}

impl CapabilityEncoder for OutgoingSlots<'_> {
    fn encode_slot(&mut self, value: &Value, kind: SlotKind) -> Result<SlotRef> {
        let obj = value
            .as_object()
            .ok_or_else(|| PassableError::invalid(format!("capability must be an object: {value}")))?;
        if let Some(index) = self.slots.get_index_of(&obj.id()) {
            return Ok(SlotRef {
                kind,
                index,
                iface: None,
            });
        }
        let slot = self
            .table
            .slot_of
            .get(&obj.id())
            .and_then(|index| self.table.incoming.get(*index))
            .cloned()
            .ok_or_else(|| PassableError::callback(format!("no slot for {value}")))?;
        let (index, _) = self.slots.insert_full(obj.id(), slot);
        let iface = match kind {
            SlotKind::Remotable => get_interface_of(value),
            SlotKind::Promise => None,
        };
        Ok(SlotRef { kind, index, iface })
    }

    fn encode_error(&mut self, value: &Value) -> Result<ErrorRef> {
        let (name, message) = wire_error_parts(value)?;
        let error_id = match self.error_tagging {
            ErrorTagging::Off => None,
            ErrorTagging::On => value
                .as_object()
                .and_then(|obj| self.table.error_ids.get(&obj.id()))
                .cloned(),
        };
        Ok(ErrorRef {
            name,
            message,
            error_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocap_core::{pass_style_of, PassStyle};
    use ocap_marshal::{encode_body, BodyFormat};
    use serde_json::json;

    fn capdata(body: &str, slots: Vec<JsonValue>) -> CapData<JsonValue> {
        CapData {
            body: body.to_string(),
            slots,
        }
    }

    #[test]
    fn test_presences_follow_slot_kinds() {
        let data = capdata(r##"#["$0.Alleged: foo","&1","$0"]"##, vec![json!("o+1"), json!("p-2")]);
        let (table, value) = SlotTable::decode(&data).unwrap();
        let elements = value.as_object().unwrap().elements();
        assert_eq!(pass_style_of(&elements[0]).unwrap(), PassStyle::Remotable);
        assert_eq!(pass_style_of(&elements[1]).unwrap(), PassStyle::Promise);
        assert_eq!(get_interface_of(&elements[0]).as_deref(), Some("Alleged: foo"));
        assert!(elements[0].as_object().unwrap().ptr_eq(elements[2].as_object().unwrap()));
        assert_eq!(table.slot_index(&elements[1]), Some(1));
    }

    #[test]
    fn test_slots_are_written_back_in_use_order() {
        let data = capdata(r##"#["&1","$0.Alleged: foo"]"##, vec![json!("o+1"), json!("p-2")]);
        let (table, value) = SlotTable::decode(&data).unwrap();
        let mut out = table.encoder(ErrorTagging::On);
        let body = encode_body(&value, BodyFormat::Smallcaps, &mut out).unwrap();
        assert_eq!(body, r##"#["&0","$1.Alleged: foo"]"##);
        assert_eq!(out.into_slots(), [json!("p-2"), json!("o+1")]);
    }

    #[test]
    fn test_error_ids_survive_transcoding() {
        let data = capdata(
            r#"{"@qclass":"error","errorId":"error:vat#3","message":"m","name":"TypeError"}"#,
            vec![],
        );
        let (table, value) = SlotTable::decode(&data).unwrap();
        let body = encode_body(&value, BodyFormat::Smallcaps, &mut table.encoder(ErrorTagging::On)).unwrap();
        assert_eq!(body, r##"#{"#error":"m","name":"TypeError","errorId":"error:vat#3"}"##);
        let body = encode_body(&value, BodyFormat::Smallcaps, &mut table.encoder(ErrorTagging::Off)).unwrap();
        assert_eq!(body, r##"#{"#error":"m","name":"TypeError"}"##);
    }

    #[test]
    fn test_out_of_range_slot_is_rejected() {
        let err = SlotTable::decode(&capdata(r##"#"$2""##, vec![json!(1)])).unwrap_err();
        assert_eq!(err.field(), Some("slots"));
    }
}
