use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use num::BigRational;
use num::ToPrimitive;

use crate::Parameter;
use crate::RationalFunction;

/// The numeric domain of transition probabilities, rewards and model checking
/// results. Implemented by `f64` for ordinary models and by [RationalFunction]
/// for parametric models.
///
/// The arithmetic methods are named after the operators, generic code must not
/// import the `std::ops` traits to avoid ambiguity for `f64`.
pub trait Value: Clone + PartialEq + fmt::Debug + fmt::Display + 'static {
    /// A hashable key such that equal keys correspond to equal values.
    type Key: Clone + Eq + Hash + fmt::Debug;

    /// Whether values can depend on parameters.
    const SUPPORTS_PARAMETERS: bool;

    fn zero() -> Self;

    fn one() -> Self;

    fn from_integer(value: i64) -> Self;

    fn from_rational(value: &BigRational) -> Self;

    /// Returns the value of an undefined constant, `None` when the domain does not support parameters.
    fn parameter(parameter: &Parameter) -> Option<Self>;

    fn add(&self, other: &Self) -> Self;

    fn sub(&self, other: &Self) -> Self;

    fn mul(&self, other: &Self) -> Self;

    /// Division, the divisor must be non-zero.
    fn div(&self, other: &Self) -> Self;

    fn is_zero(&self) -> bool;

    fn is_one(&self) -> bool;

    /// Returns true iff both values are equal up to the relative tolerance,
    /// exact domains ignore the tolerance.
    fn is_close(&self, other: &Self, tolerance: f64) -> bool;

    /// Returns true iff the value does not depend on any parameter.
    fn is_constant(&self) -> bool;

    /// Returns the value as a floating point number when it is constant.
    fn to_f64(&self) -> Option<f64>;

    /// Returns an infinite value, if the domain has one.
    fn infinity() -> Option<Self>;

    fn key(&self) -> Self::Key;

    /// A total order used to make summation orders deterministic.
    fn canonical_cmp(&self, other: &Self) -> Ordering;

    /// Sums the values in canonical order, so that the result for floating
    /// point values does not depend on the order of the input.
    fn sum_canonical(mut values: Vec<Self>) -> Self {
        values.sort_unstable_by(|left, right| left.canonical_cmp(right));
        values.iter().fold(Self::zero(), |acc, value| acc.add(value))
    }
}

impl Value for f64 {
    type Key = u64;

    const SUPPORTS_PARAMETERS: bool = false;

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn from_integer(value: i64) -> Self {
        value as f64
    }

    fn from_rational(value: &BigRational) -> Self {
        value.to_f64().unwrap_or(f64::NAN)
    }

    fn parameter(_parameter: &Parameter) -> Option<Self> {
        None
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    fn mul(&self, other: &Self) -> Self {
        self * other
    }

    fn div(&self, other: &Self) -> Self {
        self / other
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn is_one(&self) -> bool {
        *self == 1.0
    }

    fn is_close(&self, other: &Self, tolerance: f64) -> bool {
        if self == other {
            return true;
        }

        (self - other).abs() <= tolerance * self.abs().max(other.abs())
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }

    fn infinity() -> Option<Self> {
        Some(f64::INFINITY)
    }

    fn key(&self) -> u64 {
        if *self == 0.0 {
            // Identifies 0.0 and -0.0.
            0
        } else {
            self.to_bits()
        }
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl Value for RationalFunction {
    type Key = RationalFunction;

    const SUPPORTS_PARAMETERS: bool = true;

    fn zero() -> Self {
        RationalFunction::zero()
    }

    fn one() -> Self {
        RationalFunction::one()
    }

    fn from_integer(value: i64) -> Self {
        RationalFunction::from_integer(value)
    }

    fn from_rational(value: &BigRational) -> Self {
        RationalFunction::constant(value.clone())
    }

    fn parameter(parameter: &Parameter) -> Option<Self> {
        Some(RationalFunction::parameter(parameter.clone()))
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    fn mul(&self, other: &Self) -> Self {
        self * other
    }

    fn div(&self, other: &Self) -> Self {
        self / other
    }

    fn is_zero(&self) -> bool {
        RationalFunction::is_zero(self)
    }

    fn is_one(&self) -> bool {
        RationalFunction::is_one(self)
    }

    fn is_close(&self, other: &Self, _tolerance: f64) -> bool {
        self == other
    }

    fn is_constant(&self) -> bool {
        RationalFunction::is_constant(self)
    }

    fn to_f64(&self) -> Option<f64> {
        self.as_constant().and_then(|value| value.to_f64())
    }

    fn infinity() -> Option<Self> {
        None
    }

    fn key(&self) -> RationalFunction {
        self.clone()
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rational;

    fn sum_of_thirds<V: Value>() -> V {
        let third = V::one().div(&V::from_integer(3));
        V::sum_canonical(vec![third.clone(), third.clone(), third])
    }

    #[test]
    fn test_value_float() {
        assert!(sum_of_thirds::<f64>().is_close(&1.0, 1e-12));
        assert_eq!(Value::key(&0.0f64), Value::key(&-0.0f64));
        assert_eq!(<f64 as Value>::from_rational(&rational(1, 4)), 0.25);
        assert!(<f64 as Value>::parameter(&Parameter::new("p")).is_none());
        assert!(!1.0f64.is_close(&1.1, 1e-6));
    }

    #[test]
    fn test_value_rational_function() {
        assert!(Value::is_one(&sum_of_thirds::<RationalFunction>()));

        let p = <RationalFunction as Value>::parameter(&Parameter::new("p")).unwrap();
        let complement = Value::sub(&RationalFunction::one(), &p);
        assert!(Value::is_one(&Value::add(&p, &complement)));
        assert!(!Value::is_constant(&p));
        assert_eq!(Value::to_f64(&p), None);
        assert_eq!(Value::to_f64(&RationalFunction::constant(rational(1, 2))), Some(0.5));
    }
}
