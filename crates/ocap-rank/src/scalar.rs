//! Order-preserving text encodings for numbers and big integers.

use num_bigint::BigInt;
use num_traits::Signed;
use ocap_core::{PassableError, Result};

/// Bit pattern every NaN is encoded as.
const CANONICAL_NAN_BITS: &str = "fff8000000000000";

const SIGN_BIT: u64 = 1 << 63;

/// Left-pad a rendered value with zeros to exactly `size` characters
pub fn zero_pad(n: impl std::fmt::Display, size: usize) -> Result<String> {
    let rendered = n.to_string();
    if rendered.len() > size {
        return Err(PassableError::invalid(format!(
            "{rendered} does not fit in {size} digits"
        )));
    }
    Ok(format!("{rendered:0>size$}"))
}

/// Encode a double so that string order matches numeric order.
///
/// Negative numbers have every bit flipped, non-negative numbers only the
/// sign bit. `-0` encodes as `0` and every NaN as one canonical pattern.
pub fn encode_binary64(n: f64) -> String {
    if n.is_nan() {
        return format!("f{CANONICAL_NAN_BITS}");
    }
    let n = if n == 0.0 { 0.0 } else { n };
    let bits = n.to_bits();
    let flipped = if n < 0.0 { !bits } else { bits ^ SIGN_BIT };
    format!("f{flipped:016x}")
}

/// Inverse of [`encode_binary64`]
pub fn decode_binary64(encoded: &str) -> Result<f64> {
    let malformed = |message: &str| {
        PassableError::malformed("binary64", format!("{message}: {encoded:?}"))
    };
    let hex = encoded
        .strip_prefix('f')
        .ok_or_else(|| malformed("Encoded number expected"))?;
    if hex.len() != 16 || !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(malformed("Sixteen lowercase hex digits expected"));
    }
    let bits = u64::from_str_radix(hex, 16).map_err(|_| malformed("Hex digits expected"))?;
    let bits = if hex.as_bytes()[0] < b'8' { !bits } else { bits ^ SIGN_BIT };
    let result = f64::from_bits(bits);
    if result == 0.0 && result.is_sign_negative() {
        return Err(malformed("Unexpected negative zero"));
    }
    Ok(result)
}

/// Encode a big integer so that string order matches numeric order.
///
/// The digit count is itself prefixed by a unary run giving its length, so
/// longer magnitudes sort after shorter ones without a fixed width. Negative
/// values store the ten's complement of both the count and the digits.
pub fn encode_bigint(n: &BigInt) -> String {
    let abs = n.magnitude().to_string();
    let n_digits = abs.len();
    let count = n_digits.to_string();
    let l_digits = count.len();
    if n.is_negative() {
        let count_complement = 10u128.pow(l_digits as u32) - n_digits as u128;
        let complement = (BigInt::from(10u32).pow(n_digits as u32) + n).to_string();
        format!(
            "n{}{count_complement:0>l_digits$}:{complement:0>n_digits$}",
            "#".repeat(l_digits - 1)
        )
    } else {
        format!("p{}{count}:{abs}", "~".repeat(l_digits - 1))
    }
}

/// Inverse of [`encode_bigint`]
pub fn decode_bigint(encoded: &str) -> Result<BigInt> {
    let malformed =
        |message: &str| PassableError::malformed("bigint", format!("{message}: {encoded:?}"));
    let (negative, rem) = if let Some(rem) = encoded.strip_prefix('n') {
        (true, rem)
    } else if let Some(rem) = encoded.strip_prefix('p') {
        (false, rem)
    } else {
        return Err(malformed("Encoded bigint expected"));
    };

    let run = if negative { '#' } else { '~' };
    let first_digit = rem
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| malformed("Digit count expected"))?;
    if !rem[..first_digit].chars().all(|c| c == run) {
        return Err(malformed("Digit count length run expected"));
    }
    let l_digits = first_digit + 1;
    let rem = &rem[first_digit..];
    let count = rem
        .get(..l_digits)
        .ok_or_else(|| malformed("Complete digit count expected"))?;
    if !count.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("Decimal digit count expected"));
    }
    let count: u128 = count.parse().map_err(|_| malformed("Decimal digit count expected"))?;
    let n_digits = if negative {
        10u128
            .checked_pow(l_digits as u32)
            .and_then(|limit| limit.checked_sub(count))
            .ok_or_else(|| malformed("Digit count out of range"))?
    } else {
        count
    };

    let digits = rem[l_digits..]
        .strip_prefix(':')
        .ok_or_else(|| malformed("Separator expected"))?;
    if digits.len() as u128 != n_digits || digits.is_empty() {
        return Err(malformed("Fixed-length digit sequence expected"));
    }
    let n = BigInt::parse_bytes(digits.as_bytes(), 10)
        .filter(|_| digits.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| malformed("Decimal digits expected"))?;
    let result = if negative {
        let n_digits = u32::try_from(n_digits).map_err(|_| malformed("Digit count out of range"))?;
        n - BigInt::from(10u32).pow(n_digits)
    } else {
        n
    };
    if encode_bigint(&result) != encoded {
        return Err(malformed("Canonical encoding expected"));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary64_examples() {
        assert_eq!(encode_binary64(0.0), "f8000000000000000");
        assert_eq!(encode_binary64(-0.0), encode_binary64(0.0));
        assert_eq!(encode_binary64(f64::NAN), "ffff8000000000000");
        assert_eq!(encode_binary64(-f64::NAN), encode_binary64(f64::NAN));
        assert_eq!(encode_binary64(1.0), "fbff0000000000000");
        assert_eq!(encode_binary64(-1.0), "f400fffffffffffff");
    }

    #[test]
    fn test_binary64_decode() {
        for n in [0.0, 1.0, -1.0, f64::MIN_POSITIVE, f64::MAX, f64::NEG_INFINITY, -2.5e-300] {
            assert_eq!(decode_binary64(&encode_binary64(n)).unwrap(), n);
        }
        assert!(decode_binary64(&encode_binary64(f64::NAN)).unwrap().is_nan());
        assert!(decode_binary64("f7fffffffffffffff").is_err());
        assert!(decode_binary64("f123").is_err());
        assert!(decode_binary64("sabc").is_err());
    }

    #[test]
    fn test_bigint_examples() {
        assert_eq!(encode_bigint(&BigInt::from(0)), "p1:0");
        assert_eq!(encode_bigint(&BigInt::from(7)), "p1:7");
        assert_eq!(encode_bigint(&BigInt::from(1234567890)), "p~10:1234567890");
        assert_eq!(encode_bigint(&BigInt::from(-7)), "n9:3");
        assert_eq!(encode_bigint(&BigInt::from(-10)), "n8:90");
        assert_eq!(encode_bigint(&BigInt::from(-1234567890i64)), "n#90:8765432110");
    }

    #[test]
    fn test_bigint_decode() {
        for n in [0i64, 1, -1, 9, -9, 10, -10, 99, -100, i64::MAX, i64::MIN] {
            let n = BigInt::from(n);
            assert_eq!(decode_bigint(&encode_bigint(&n)).unwrap(), n);
        }
        let huge: BigInt = "-123456789012345678901234567890".parse().unwrap();
        assert_eq!(decode_bigint(&encode_bigint(&huge)).unwrap(), huge);
    }

    #[test]
    fn test_bigint_decode_rejects_garbage() {
        for bad in ["p", "p1", "p1:", "p1:12", "p2:1", "x1:1", "p~1:1", "n#", "p1:a", "n9:0", "p2:05"] {
            assert!(decode_bigint(bad).is_err(), "{bad} should not decode");
        }
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad(42, 5).unwrap(), "00042");
        assert!(zero_pad(123456, 5).is_err());
    }
}
