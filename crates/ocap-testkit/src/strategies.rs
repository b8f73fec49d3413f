//! Property test strategies for passables
//!
//! Strategies produce hardened values only. The copy-data strategies never
//! generate remotables, promises or errors, so their output encodes and
//! decodes without any hooks.

use num_bigint::BigInt;
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use ocap_core::{far, harden, make_error, make_tagged, ErrorClass, Symbol, Value};

/// Strategy for numbers, weighted towards the awkward ones
///
/// # Example
///
/// ```rust
/// use ocap_testkit::strategies::arb_number;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_number_property(n in arb_number()) {
///         prop_assert!(n.is_nan() || n == n);
///     }
/// }
/// ```
pub fn arb_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        3 => any::<f64>(),
        1 => Just(0.0),
        1 => Just(-0.0),
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
        2 => (-1000i32..1000).prop_map(f64::from),
    ]
}

/// Strategy for big integers, including ones far outside `i64`
pub fn arb_bigint() -> impl Strategy<Value = BigInt> {
    prop_oneof![
        any::<i64>().prop_map(BigInt::from),
        (-100i64..100).prop_map(BigInt::from),
        (any::<bool>(), "[1-9][0-9]{18,40}").prop_map(|(negative, digits)| {
            let n: BigInt = digits.parse().unwrap();
            if negative {
                -n
            } else {
                n
            }
        }),
    ]
}

/// Strategy for strings, including escape and reserved characters
pub fn arb_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,8}",
        "[\\x00\\x01!#$%&+\\-@a-c]{0,5}",
        Just(String::new()),
    ]
}

/// Strategy for passable symbols
pub fn arb_symbol() -> impl Strategy<Value = Symbol> {
    prop_oneof![
        "[a-z@]{0,6}".prop_map(Symbol::registered),
        prop::sample::select(vec!["iterator", "asyncIterator", "toPrimitive"])
            .prop_map(|name| Symbol::well_known(name).unwrap()),
    ]
}

/// Strategy for every primitive passable
pub fn arb_primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        arb_number().prop_map(Value::Number),
        arb_bigint().prop_map(Value::BigInt),
        arb_string().prop_map(Value::String),
        arb_symbol().prop_map(Value::Symbol),
    ]
}

fn arb_composite(inner: impl Strategy<Value = Value> + Clone) -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
        prop::collection::btree_map(arb_string(), inner.clone(), 0..4).prop_map(Value::record),
        ("[a-zA-Z]{0,8}", inner).prop_map(|(tag, payload)| make_tagged(tag, payload)),
    ]
}

/// Strategy for copy data: primitives, arrays, records and tagged values
///
/// # Example
///
/// ```rust
/// use ocap_core::is_passable;
/// use ocap_testkit::strategies::arb_copy_data;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_copy_data_is_passable(v in arb_copy_data()) {
///         prop_assert!(is_passable(&v));
///     }
/// }
/// ```
pub fn arb_copy_data() -> impl Strategy<Value = Value> {
    arb_primitive().prop_recursive(3, 24, 4, arb_composite)
}

/// Strategy for capability and error leaves
///
/// Remotables are drawn from a small pool created once per strategy, so
/// generated values can share them.
pub fn arb_opaque() -> impl Strategy<Value = Value> {
    let pool = vec![far("Alice", []), far("Bob", []), far("Carol", [])];
    prop_oneof![
        prop::sample::select(pool),
        Just(()).prop_map(|_| Value::promise()),
        (prop::sample::select(ErrorClass::ALL.to_vec()), "[a-z ]{0,10}")
            .prop_map(|(class, message)| make_error(class, message)),
    ]
}

/// Strategy for arbitrary passables, capabilities and errors included
pub fn arb_passable() -> impl Strategy<Value = Value> {
    prop_oneof![4 => arb_primitive(), 1 => arb_opaque()]
        .prop_recursive(3, 24, 4, arb_composite)
        .prop_map(|value| {
            harden(&value);
            value
        })
}
