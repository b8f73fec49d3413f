//! Reusable sample passables
//!
//! The rank sample mixes every style, including ties among errors, promises
//! and remotables, so sorting tests can check both order and stability.

use ocap_core::{far, far_function, make_error, make_tagged, ErrorClass, PassStyle, Symbol, Value};

/// A remotable named "Alice"
pub fn example_alice() -> Value {
    far("Alice", ["getName"])
}

/// A remotable named "Bob"
pub fn example_bob() -> Value {
    far("Bob", ["getName"])
}

/// A remotable named "Carol"
pub fn example_carol() -> Value {
    far("Carol", ["getName"])
}

/// Copy containers holding far functions, with the style each must get.
///
/// A far function inside copy data is a capability, not a method, so each
/// container keeps its copy style.
pub fn far_function_containers() -> Vec<(Value, PassStyle)> {
    let f = far_function("f");
    vec![
        (Value::record([("f", f.clone())]), PassStyle::CopyRecord),
        (
            Value::record([("f", f.clone()), ("n", Value::Number(1.0))]),
            PassStyle::CopyRecord,
        ),
        (Value::array([f.clone(), far_function("g")]), PassStyle::CopyArray),
        (make_tagged("t", f), PassStyle::Tagged),
    ]
}

/// An unsorted collection and its stable rank sort
#[derive(Debug, Clone)]
pub struct RankSample {
    /// Values in arbitrary order
    pub unsorted: Vec<Value>,
    /// The same values after a stable rank sort
    pub sorted: Vec<Value>,
}

fn pairs(entries: &[(&str, f64)]) -> Value {
    Value::array(
        entries
            .iter()
            .map(|(k, v)| Value::array([Value::string(*k), Value::Number(*v)])),
    )
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn five_and(rest: Value) -> Value {
    Value::array([num(5.0), rest])
}

/// Build the rank sample.
///
/// Remotables are shared between both halves since they only tie with
/// themselves under identity.
pub fn rank_sample() -> RankSample {
    let (alice, bob, carol) = (example_alice(), example_bob(), example_carol());
    let registered = |key: &str| Value::Symbol(Symbol::registered(key));
    let concat_spreadable = || Value::Symbol(Symbol::well_known("isConcatSpreadable").unwrap());
    let foo4 = || Value::record([("foo", num(4.0))]);

    let unsorted = vec![
        make_tagged("copySet", pairs(&[("b", 3.0), ("a", 4.0)])),
        Value::string("foo"),
        Value::bigint(3),
        Value::string("barr"),
        Value::Undefined,
        five_and(foo4()),
        num(2.0),
        Value::Null,
        five_and(Value::record([("foo", num(4.0)), ("bar", Value::Null)])),
        bob.clone(),
        num(0.0),
        make_tagged("copySet", pairs(&[("a", 4.0), ("b", 3.0)])),
        num(f64::NAN),
        Value::Bool(true),
        Value::Undefined,
        num(f64::NEG_INFINITY),
        Value::array([num(5.0)]),
        alice.clone(),
        Value::array([]),
        registered("foo"),
        make_error(ErrorClass::Error, "not erroneous"),
        registered("@@foo"),
        five_and(Value::record([("bar", num(5.0))])),
        registered(""),
        Value::Bool(false),
        carol.clone(),
        num(-0.0),
        Value::record(Vec::<(String, Value)>::new()),
        five_and(Value::Undefined),
        num(-3.0),
        make_tagged("copyMap", pairs(&[("a", 4.0), ("b", 3.0)])),
        Value::Bool(true),
        Value::string("bar"),
        five_and(Value::Null),
        Value::promise(),
        make_tagged("nonsense", pairs(&[("a", 4.0), ("b", 3.0)])),
        num(f64::INFINITY),
        concat_spreadable(),
        five_and(Value::record([("foo", num(4.0)), ("bar", Value::Undefined)])),
        Value::promise(),
        five_and(foo4()),
        Value::array([Value::promise(), Value::string("x")]),
        Value::array([Value::promise()]),
    ];

    let sorted = vec![
        make_error(ErrorClass::Error, "different"),
        Value::record(Vec::<(String, Value)>::new()),
        make_tagged("copyMap", pairs(&[("a", 4.0), ("b", 3.0)])),
        make_tagged("copySet", pairs(&[("a", 4.0), ("b", 3.0)])),
        make_tagged("copySet", pairs(&[("b", 3.0), ("a", 4.0)])),
        make_tagged("nonsense", pairs(&[("a", 4.0), ("b", 3.0)])),
        Value::promise(),
        Value::promise(),
        Value::array([]),
        Value::array([Value::promise()]),
        Value::array([Value::promise(), Value::string("x")]),
        Value::array([num(5.0)]),
        five_and(Value::record([("bar", num(5.0))])),
        five_and(foo4()),
        five_and(foo4()),
        five_and(Value::record([("foo", num(4.0)), ("bar", Value::Null)])),
        five_and(Value::record([("foo", num(4.0)), ("bar", Value::Undefined)])),
        five_and(Value::Null),
        five_and(Value::Undefined),
        Value::Bool(false),
        Value::Bool(true),
        Value::Bool(true),
        num(f64::NEG_INFINITY),
        num(-3.0),
        num(-0.0),
        num(0.0),
        num(2.0),
        num(f64::INFINITY),
        num(f64::NAN),
        Value::bigint(3),
        bob,
        alice,
        carol,
        Value::string("bar"),
        Value::string("barr"),
        Value::string("foo"),
        Value::Null,
        registered(""),
        registered("@@foo"),
        concat_spreadable(),
        registered("foo"),
        Value::Undefined,
        Value::Undefined,
    ];

    RankSample { unsorted, sorted }
}
