//! String and number text conventions shared by every layer.
//!
//! Peers on the other side of the wire order strings by UTF-16 code unit and
//! print numbers with the ECMAScript `Number::toString` algorithm, so both
//! the rank order and the wire bodies follow those rules rather than Rust's.

use std::cmp::Ordering;

/// Compare two strings by UTF-16 code unit sequence.
///
/// Differs from `str::cmp` only when a supplementary-plane character meets a
/// BMP character in `U+E000..=U+FFFF`.
pub fn compare_utf16(left: &str, right: &str) -> Ordering {
    left.encode_utf16().cmp(right.encode_utf16())
}

/// Render an `f64` the way ECMAScript `Number.prototype.toString()` does.
pub fn js_number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e3".
    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => (sci.as_str(), "0"),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exp: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exp + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{int_part}.{frac_part}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{e_sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{e_sign}{}", e.abs())
        }
    };
    format!("{sign}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_numbers_have_no_fraction() {
        assert_eq!(js_number_to_string(1.0), "1");
        assert_eq!(js_number_to_string(-42.0), "-42");
        assert_eq!(js_number_to_string(-0.0), "0");
        assert_eq!(js_number_to_string(1e20), "100000000000000000000");
    }

    #[test]
    fn test_exponent_thresholds() {
        assert_eq!(js_number_to_string(1e21), "1e+21");
        assert_eq!(js_number_to_string(1.5e21), "1.5e+21");
        assert_eq!(js_number_to_string(0.000001), "0.000001");
        assert_eq!(js_number_to_string(1e-7), "1e-7");
        assert_eq!(js_number_to_string(1.25e-7), "1.25e-7");
    }

    #[test]
    fn test_fractions_and_specials() {
        assert_eq!(js_number_to_string(3.5), "3.5");
        assert_eq!(js_number_to_string(0.1), "0.1");
        assert_eq!(js_number_to_string(123.456), "123.456");
        assert_eq!(js_number_to_string(f64::NAN), "NaN");
        assert_eq!(js_number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(js_number_to_string(5e-324), "5e-324");
        assert_eq!(js_number_to_string(f64::MAX), "1.7976931348623157e+308");
    }

    #[test]
    fn test_utf16_order_differs_from_utf8_order() {
        // U+FF61 is a single BMP unit; U+1F600 starts with a high surrogate 0xD83D.
        let bmp = "\u{FF61}";
        let astral = "\u{1F600}";
        assert_eq!(bmp.cmp(astral), Ordering::Less);
        assert_eq!(compare_utf16(bmp, astral), Ordering::Greater);
        assert_eq!(compare_utf16("a", "ab"), Ordering::Less);
    }
}
