//! Marshalling round trips
//!
//! For every passable and both body formats:
//! - decoding an encoding yields a deeply equal value
//! - re-encoding the decoded value reproduces the body exactly
//! - capabilities keep their identity through the slot table

#![allow(clippy::disallowed_methods)]

use ocap_core::{deep_equal, far, make_error, pass_style_of, ErrorClass, PassStyle, Value};
use ocap_marshal::{BodyFormat, CapData, ConfigDefaults, ErrorTagging, Marshal, MarshalOptions};
use ocap_testkit::strategies::arb_passable;
use ocap_testkit::{assert_passable_eq, example_alice, example_bob, far_function_containers};
use proptest::prelude::*;

fn marshal(format: BodyFormat) -> Marshal<Value> {
    Marshal::identity(
        MarshalOptions::defaults()
            .with_body_format(format)
            .with_error_tagging(ErrorTagging::Off),
    )
}

fn arb_format() -> impl Strategy<Value = BodyFormat> {
    prop_oneof![Just(BodyFormat::Capdata), Just(BodyFormat::Smallcaps)]
}

proptest! {
    #[test]
    fn test_decode_inverts_encode(value in arb_passable(), format in arb_format()) {
        let m = marshal(format);
        let data = m.to_capdata(&value).unwrap();
        let decoded = m.from_capdata(&data).unwrap();
        prop_assert!(deep_equal(&decoded, &value), "{} decoded as {}", value, decoded);
    }

    #[test]
    fn test_bodies_are_canonical(value in arb_passable(), format in arb_format()) {
        let m = marshal(format);
        let data = m.to_capdata(&value).unwrap();
        let again = m.to_capdata(&m.from_capdata(&data).unwrap()).unwrap();
        prop_assert_eq!(again.body, data.body);
        prop_assert_eq!(again.slots.len(), data.slots.len());
    }

    #[test]
    fn test_either_format_decodes(value in arb_passable()) {
        let capdata = marshal(BodyFormat::Capdata);
        let smallcaps = marshal(BodyFormat::Smallcaps);
        let data = smallcaps.to_capdata(&value).unwrap();
        let decoded = capdata.from_capdata(&data).unwrap();
        prop_assert!(deep_equal(&decoded, &value));
    }
}

#[test]
fn test_simple_record_body() {
    let m = marshal(BodyFormat::Smallcaps);
    let data = m
        .to_capdata(&Value::record([("b", Value::Number(2.0)), ("a", Value::Number(1.0))]))
        .unwrap();
    assert_eq!(data.body, r##"#{"a":1,"b":2}"##);
    assert!(data.slots.is_empty());
}

#[test]
fn test_repeated_capability_uses_one_slot() {
    let slots = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let outgoing = std::sync::Arc::clone(&slots);
    let m: Marshal<String> = Marshal::new(
        move |value: &Value| -> ocap_core::Result<String> {
            let name = ocap_core::get_interface_of(value).unwrap_or_default();
            outgoing.lock().push(name.clone());
            Ok(name)
        },
        |slot: &String, _iface: Option<&str>| -> ocap_core::Result<Value> {
            Ok(far(slot.trim_start_matches("Alleged: "), []))
        },
        MarshalOptions::defaults(),
    );
    let alice = example_alice();
    let data = m
        .to_capdata(&Value::array([alice.clone(), example_bob(), alice]))
        .unwrap();
    assert_eq!(data.slots, ["Alleged: Alice", "Alleged: Bob"]);
    assert_eq!(slots.lock().len(), 2);
    assert_eq!(
        data.body,
        concat!(
            r#"[{"@qclass":"slot","iface":"Alleged: Alice","index":0},"#,
            r#"{"@qclass":"slot","iface":"Alleged: Bob","index":1},"#,
            r#"{"@qclass":"slot","index":0}]"#
        )
    );

    let decoded = m.from_capdata(&data).unwrap();
    let elements = decoded.as_object().unwrap().elements();
    assert!(elements[0].as_object().unwrap().ptr_eq(elements[2].as_object().unwrap()));
    assert!(!elements[0].as_object().unwrap().ptr_eq(elements[1].as_object().unwrap()));
}

#[test]
fn test_far_functions_travel_as_slots_inside_copy_data() {
    for format in [BodyFormat::Capdata, BodyFormat::Smallcaps] {
        let m = marshal(format);
        for (value, style) in far_function_containers() {
            let data = m.to_capdata(&value).unwrap();
            assert!(!data.slots.is_empty(), "no slots for {value}");
            for slot in &data.slots {
                assert!(slot.is_function());
                assert_eq!(pass_style_of(slot).unwrap(), PassStyle::Remotable);
            }
            let decoded = m.from_capdata(&data).unwrap();
            assert_eq!(pass_style_of(&decoded).unwrap(), style);
            assert_passable_eq!(decoded, value);
        }
    }
}

#[test]
fn test_far_function_record_bodies() {
    let value = Value::record([("f", ocap_core::far_function("f"))]);
    let data = marshal(BodyFormat::Smallcaps).to_capdata(&value).unwrap();
    assert_eq!(data.body, r##"#{"f":"$0.Alleged: f"}"##);
    let data = marshal(BodyFormat::Capdata).to_capdata(&value).unwrap();
    assert_eq!(
        data.body,
        r#"{"f":{"@qclass":"slot","iface":"Alleged: f","index":0}}"#
    );
}

#[test]
fn test_large_bigint_is_exact() {
    let n: ocap_core::BigInt = "123456789012345678901234567890".parse().unwrap();
    for format in [BodyFormat::Capdata, BodyFormat::Smallcaps] {
        let m = marshal(format);
        let data = m.to_capdata(&Value::BigInt(n.clone())).unwrap();
        assert!(data.body.contains("123456789012345678901234567890"));
        assert_eq!(m.from_capdata(&data).unwrap(), Value::BigInt(n.clone()));
    }
}

#[test]
fn test_error_ids_count_up_across_calls() {
    let m = Marshal::identity(MarshalOptions::defaults().with_error_tagging(ErrorTagging::On));
    let bodies: Vec<String> = (0..3)
        .map(|_| m.to_capdata(&make_error(ErrorClass::Error, "")).unwrap().body)
        .collect();
    for (body, n) in bodies.iter().zip(10_001..) {
        assert_eq!(
            *body,
            format!(
                r#"{{"@qclass":"error","errorId":"error:anon-marshal#{n}","message":"","name":"Error"}}"#
            )
        );
    }
    let decoded = m
        .from_capdata(&CapData {
            body: bodies[0].clone(),
            slots: vec![],
        })
        .unwrap();
    assert_passable_eq!(decoded, make_error(ErrorClass::Error, ""));
}
