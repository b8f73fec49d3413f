//! Standard assertion helpers for tests
//!
//! Passables compare by content for copy data and by identity for
//! capabilities, which `assert_eq!` on [`Value`] does not capture.

use ocap_core::{deep_equal, is_passable, pass_style_of, Value};

/// Assert that two passables are deeply equal
#[macro_export]
macro_rules! assert_passable_eq {
    ($left:expr, $right:expr) => {
        assert!(
            ocap_core::deep_equal(&$left, &$right),
            "Expected {} to deeply equal {}",
            $left,
            $right
        )
    };
}

/// Assert that a value is rejected by the classifier with a message
/// containing `fragment`
pub fn assert_not_passable(value: &Value, fragment: &str) {
    assert!(!is_passable(value), "{value} should not be passable");
    let message = pass_style_of(value).unwrap_err().to_string();
    assert!(
        message.contains(fragment),
        "Expected rejection mentioning {fragment:?}, got {message:?}"
    );
}

/// Assert that two sequences of passables are pairwise deeply equal
pub fn assert_all_passable_eq(left: &[Value], right: &[Value]) {
    assert_eq!(left.len(), right.len(), "length mismatch");
    for (i, (a, b)) in left.iter().zip(right).enumerate() {
        assert!(deep_equal(a, b), "element {i}: {a} is not {b}");
    }
}
