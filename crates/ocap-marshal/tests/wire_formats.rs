//! Wire format conformance
//!
//! Fixed bodies for both formats, checked in both directions:
//! - each value serializes to exactly the listed body
//! - each body decodes to something deeply equal to the value
//! - decoded values are hardened

#![allow(clippy::disallowed_methods)]

use ocap_core::{
    error_parts, far, is_passable, make_error, make_tagged, ErrorClass, Symbol, Value,
};
use ocap_marshal::{CapData, ConfigDefaults, ErrorTagging, Marshal, MarshalOptions};
use ocap_testkit::assert_passable_eq;

fn untagged(options: MarshalOptions) -> Marshal<Value> {
    Marshal::identity(options.with_error_tagging(ErrorTagging::Off))
}

fn sym(key: &str) -> Value {
    Value::Symbol(Symbol::registered(key))
}

/// Values paired with their CapData bodies
fn round_trip_pairs() -> Vec<(Value, &'static str)> {
    let n = Value::Number;
    vec![
        (Value::array([n(1.0), n(2.0)]), "[1,2]"),
        (Value::record([("foo", n(1.0))]), r#"{"foo":1}"#),
        (Value::record(Vec::<(String, Value)>::new()), "{}"),
        (Value::record([("a", n(1.0)), ("b", n(2.0))]), r#"{"a":1,"b":2}"#),
        (
            Value::record([("a", n(1.0)), ("b", Value::record([("c", n(3.0))]))]),
            r#"{"a":1,"b":{"c":3}}"#,
        ),
        (Value::Bool(true), "true"),
        (n(1.0), "1"),
        (Value::string("abc"), r#""abc""#),
        (Value::Null, "null"),
        (
            Value::record([("__proto__", Value::record(Vec::<(String, Value)>::new()))]),
            r#"{"__proto__":{}}"#,
        ),
        (Value::Undefined, r#"{"@qclass":"undefined"}"#),
        (n(f64::NAN), r#"{"@qclass":"NaN"}"#),
        (n(f64::INFINITY), r#"{"@qclass":"Infinity"}"#),
        (n(f64::NEG_INFINITY), r#"{"@qclass":"-Infinity"}"#),
        (Value::bigint(4), r#"{"@qclass":"bigint","digits":"4"}"#),
        (
            Value::BigInt("9007199254740993".parse().unwrap()),
            r#"{"@qclass":"bigint","digits":"9007199254740993"}"#,
        ),
        (
            Value::Symbol(Symbol::well_known("asyncIterator").unwrap()),
            r#"{"@qclass":"symbol","name":"@@asyncIterator"}"#,
        ),
        (
            Value::Symbol(Symbol::well_known("match").unwrap()),
            r#"{"@qclass":"symbol","name":"@@match"}"#,
        ),
        (sym("foo"), r#"{"@qclass":"symbol","name":"foo"}"#),
        (sym("@@foo"), r#"{"@qclass":"symbol","name":"@@@@foo"}"#),
        (Value::array([Value::Undefined]), r#"[{"@qclass":"undefined"}]"#),
        (
            Value::record([("foo", Value::Undefined)]),
            r#"{"foo":{"@qclass":"undefined"}}"#,
        ),
        (
            make_tagged("x", n(8.0)),
            r#"{"@qclass":"tagged","tag":"x","payload":8}"#,
        ),
        (
            make_error(ErrorClass::Error, ""),
            r#"{"@qclass":"error","message":"","name":"Error"}"#,
        ),
        (
            make_error(ErrorClass::ReferenceError, "#msg"),
            r##"{"@qclass":"error","message":"#msg","name":"ReferenceError"}"##,
        ),
        (
            Value::record([("@qclass", n(8.0))]),
            r#"{"@qclass":"hilbert","original":8}"#,
        ),
        (
            Value::record([("@qclass", Value::string("@qclass"))]),
            r#"{"@qclass":"hilbert","original":"@qclass"}"#,
        ),
        (
            Value::record([("@qclass", Value::record([("@qclass", n(8.0))]))]),
            r#"{"@qclass":"hilbert","original":{"@qclass":"hilbert","original":8}}"#,
        ),
    ]
}

#[test]
fn test_capdata_round_trip_pairs() {
    let m = untagged(MarshalOptions::defaults());
    for (plain, body) in round_trip_pairs() {
        let data = m.to_capdata(&plain).unwrap();
        assert_eq!(data.body, body);
        assert!(data.slots.is_empty());
        let decoded = m.from_capdata(&data).unwrap();
        assert_passable_eq!(decoded, plain);
        if let Some(obj) = decoded.as_object() {
            assert!(obj.is_frozen());
        }
    }
}

#[test]
fn test_smallcaps_round_trips_the_same_values() {
    let m = untagged(MarshalOptions::smallcaps());
    for (plain, _) in round_trip_pairs() {
        let data = m.to_capdata(&plain).unwrap();
        assert!(data.body.starts_with('#'));
        assert_passable_eq!(m.from_capdata(&data).unwrap(), plain);
    }
}

#[test]
fn test_smallcaps_encoding_examples() {
    let m = untagged(MarshalOptions::smallcaps());
    let foo = far("foo", []);
    let promise = Value::promise();
    let cases = vec![
        (Value::Number(0.0), "#0", vec![]),
        (Value::bigint(500), r##"#"+500""##, vec![]),
        (Value::bigint(-400), r##"#"-400""##, vec![]),
        (Value::Number(f64::NAN), r##"#"#NaN""##, vec![]),
        (Value::Number(f64::INFINITY), r##"#"#Infinity""##, vec![]),
        (Value::Number(f64::NEG_INFINITY), r##"#"#-Infinity""##, vec![]),
        (Value::Undefined, r##"#"#undefined""##, vec![]),
        (Value::string("unescaped"), r##"#"unescaped""##, vec![]),
        (Value::string("#escaped"), r##"#"!#escaped""##, vec![]),
        (Value::string("+escaped"), r##"#"!+escaped""##, vec![]),
        (Value::string("-escaped"), r##"#"!-escaped""##, vec![]),
        (Value::string("%escaped"), r##"#"!%escaped""##, vec![]),
        (
            Value::Symbol(Symbol::well_known("iterator").unwrap()),
            r##"#"%@@iterator""##,
            vec![],
        ),
        (sym("foo"), r##"#"%foo""##, vec![]),
        (sym("@@foo"), r##"#"%@@@@foo""##, vec![]),
        (foo.clone(), r##"#"$0.Alleged: foo""##, vec![foo]),
        (promise.clone(), r##"#"&0""##, vec![promise]),
        (
            Value::array([Value::Number(1.0), Value::bigint(2)]),
            r##"#[1,"+2"]"##,
            vec![],
        ),
        (
            Value::record([("foo", Value::Number(1.0)), ("bar", Value::bigint(2))]),
            r##"#{"bar":"+2","foo":1}"##,
            vec![],
        ),
        (
            make_tagged("foo", Value::string("bar")),
            r##"#{"#tag":"foo","payload":"bar"}"##,
            vec![],
        ),
        (
            make_error(ErrorClass::UriError, "bad uri"),
            r##"#{"#error":"bad uri","name":"URIError"}"##,
            vec![],
        ),
        (
            make_error(ErrorClass::Error, "#NaN"),
            r##"#{"#error":"!#NaN","name":"Error"}"##,
            vec![],
        ),
    ];
    for (value, body, slots) in cases {
        let data = m.to_capdata(&value).unwrap();
        assert_eq!(data.body, body);
        assert_eq!(data.slots.len(), slots.len());
        for (got, expected) in data.slots.iter().zip(&slots) {
            assert!(got.as_object().unwrap().ptr_eq(expected.as_object().unwrap()));
        }
        let decoded = m.from_capdata(&CapData {
            body: body.to_string(),
            slots,
        })
        .unwrap();
        assert_passable_eq!(decoded, value);
        assert_eq!(m.to_capdata(&decoded).unwrap().body, body);
    }
}

#[test]
fn test_record_with_reserved_names() {
    let m = untagged(MarshalOptions::smallcaps());
    let record = Value::record([
        ("#tag", Value::string("what")),
        ("#error", Value::string("me")),
        ("#huh", Value::string("worry")),
        ("", Value::string("empty")),
        ("%sym", Value::string("not a symbol")),
    ]);
    let data = m.to_capdata(&record).unwrap();
    assert_eq!(
        data.body,
        r##"#{"":"empty","!#error":"me","!#huh":"worry","!#tag":"what","!%sym":"not a symbol"}"##
    );
    assert_passable_eq!(m.from_capdata(&data).unwrap(), record);
}

#[test]
fn test_errors_revive_by_constructor_name() {
    let m = untagged(MarshalOptions::smallcaps());
    let decode = |body: &str| {
        m.from_capdata(&CapData {
            body: body.to_string(),
            slots: vec![],
        })
        .unwrap()
    };
    let error = decode(r##"#{"#error":"msg","name":"ReferenceError"}"##);
    assert_eq!(error_parts(&error), Some(("ReferenceError".into(), "msg".into())));
    assert!(error.as_object().unwrap().is_frozen());
    let error = decode(r##"#{"#error":"msg3","name":"Unknown"}"##);
    assert_eq!(error_parts(&error), Some(("Error".into(), "msg3".into())));
    let error = decode(r##"#{"#error":"x","name":"TypeError","errorId":"error:peer#7"}"##);
    assert_eq!(error.as_object().unwrap().notes(), ["RemoteTypeError(error:peer#7)"]);
}

#[test]
fn test_malformed_bodies_are_rejected() {
    let m = untagged(MarshalOptions::smallcaps());
    let decode = |body: &str| {
        m.from_capdata(&CapData {
            body: body.to_string(),
            slots: vec![],
        })
    };
    let err = decode(r##"#{"#foo": 0}"##).unwrap_err();
    assert!(err
        .to_string()
        .contains(r##"Unrecognized record type "#foo": {"#foo":0}"##));
    let err = decode(r##"#{"#tag":"floor wax","payload":"what is it?","#error":"old joke"}"##)
        .unwrap_err();
    assert!(err
        .to_string()
        .contains(r##"#tag record unexpected properties: ["#error"]"##));
    assert!(decode("#[1,").is_err());
    assert!(decode(r#"{"@qclass":"slot","index":0}"#).is_err());
    assert!(decode(r#"{"@qclass":"ibid","index":0}"#).is_err());
}

#[test]
fn test_non_passables_fail_to_encode() {
    let m = untagged(MarshalOptions::smallcaps());
    let err = m
        .to_capdata(&Value::Symbol(Symbol::anonymous(Some("sym2"))))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Only registered symbols or well-known symbols are passable:"));
    assert!(!is_passable(&Value::Object(ocap_core::ObjectRef::new(
        ocap_core::Shape::Plain
    ))));
}
