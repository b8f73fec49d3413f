//! Structural equality over passables.

use crate::value::{error_parts, ObjectRef, Shape, Value};

/// `SameValueZero`: like `==` on numbers except `NaN` equals itself.
pub fn same_value_zero(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
        (Value::Object(a), Value::Object(b)) => a == b,
        _ => left == right,
    }
}

/// Deep equality of two passables.
///
/// Copy data compares by content (record keys in any order), remotables and
/// promises by identity, errors by name and message.
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    if same_value_zero(left, right) {
        return true;
    }
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => objects_equal(a, b),
        _ => false,
    }
}

fn objects_equal(left: &ObjectRef, right: &ObjectRef) -> bool {
    match (left.shape(), right.shape()) {
        (Shape::Array, Shape::Array) => {
            let (a, b) = (left.elements(), right.elements());
            a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| deep_equal(x, y))
        }
        (Shape::Error { .. }, Shape::Error { .. }) => {
            error_parts(&Value::Object(left.clone())) == error_parts(&Value::Object(right.clone()))
        }
        (Shape::Plain, Shape::Plain) => match (left.marker(), right.marker()) {
            (None, None) => records_equal(left, right),
            (Some(a), Some(b)) if a.style == "tagged" && b.style == "tagged" => {
                same_value_zero(&a.tag, &b.tag)
                    && match (left.get("payload"), right.get("payload")) {
                        (Some(x), Some(y)) => deep_equal(&x, &y),
                        _ => false,
                    }
            }
            _ => false,
        },
        _ => false,
    }
}

fn records_equal(left: &ObjectRef, right: &ObjectRef) -> bool {
    let a = left.string_entries();
    let b = right.string_entries();
    a.len() == b.len()
        && a.iter().all(|(key, value)| {
            b.iter()
                .find(|(other, _)| other == key)
                .is_some_and(|(_, other)| deep_equal(value, other))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_class::ErrorClass;
    use crate::value::{far, make_error, make_tagged};

    #[test]
    fn test_numbers_use_same_value_zero() {
        assert!(deep_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(deep_equal(&Value::Number(-0.0), &Value::Number(0.0)));
        assert!(!deep_equal(&Value::Number(1.0), &Value::string("1")));
    }

    #[test]
    fn test_copy_data_by_content() {
        let a = Value::record([("x", Value::Number(1.0)), ("y", Value::array([Value::Null]))]);
        let b = Value::record([("y", Value::array([Value::Null])), ("x", Value::Number(1.0))]);
        assert!(deep_equal(&a, &b));
        let c = Value::record([("x", Value::Number(1.0))]);
        assert!(!deep_equal(&a, &c));
        assert!(deep_equal(
            &make_tagged("t", Value::Bool(true)),
            &make_tagged("t", Value::Bool(true))
        ));
    }

    #[test]
    fn test_remotables_by_identity() {
        let alice = far("Alice", []);
        let other = far("Alice", []);
        assert!(deep_equal(&alice, &alice.clone()));
        assert!(!deep_equal(&alice, &other));
    }

    #[test]
    fn test_errors_by_name_and_message() {
        let a = make_error(ErrorClass::TypeError, "boom");
        let b = make_error(ErrorClass::TypeError, "boom");
        let c = make_error(ErrorClass::RangeError, "boom");
        assert!(deep_equal(&a, &b));
        assert!(!deep_equal(&a, &c));
    }
}
