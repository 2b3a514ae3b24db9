use num::BigInt;
use num::BigRational;
use num::Zero;

/// Parses a decimal literal such as `0.833`, `-2`, `.2` or `1e-3` into an
/// exact rational number. Returns `None` when the text is not a decimal.
pub fn parse_decimal(text: &str) -> Option<BigRational> {
    let text = text.trim();
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(position) => (&text[..position], text[position + 1..].parse::<i32>().ok()?),
        None => (text, 0),
    };

    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };

    let (integral, fractional) = match mantissa.split_once('.') {
        Some((integral, fractional)) => (integral, fractional),
        None => (mantissa, ""),
    };

    if integral.is_empty() && fractional.is_empty() {
        return None;
    }

    if !integral.chars().chain(fractional.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{integral}{fractional}");
    let mut numerator: BigInt = if digits.is_empty() {
        BigInt::zero()
    } else {
        digits.parse().ok()?
    };

    if negative {
        numerator = -numerator;
    }

    let shift = exponent - fractional.len() as i32;
    let power = num::pow(BigInt::from(10), shift.unsigned_abs() as usize);
    if shift >= 0 {
        Some(BigRational::from_integer(numerator * power))
    } else {
        Some(BigRational::new(numerator, power))
    }
}

/// Returns `numerator/denominator` as a rational number, the denominator must be non-zero.
pub fn rational(numerator: i64, denominator: i64) -> BigRational {
    debug_assert!(denominator != 0, "The denominator cannot be zero");
    BigRational::new(BigInt::from(numerator), BigInt::from(denominator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0.833"), Some(rational(833, 1000)));
        assert_eq!(parse_decimal(".2"), Some(rational(1, 5)));
        assert_eq!(parse_decimal("-2"), Some(rational(-2, 1)));
        assert_eq!(parse_decimal("1e-3"), Some(rational(1, 1000)));
        assert_eq!(parse_decimal("2.5E2"), Some(rational(250, 1)));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("."), None);
    }
}
