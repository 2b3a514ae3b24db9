use std::collections::BTreeSet;
use std::fmt;
use std::ops::Add;
use std::ops::Div;
use std::ops::Mul;
use std::ops::Neg;
use std::ops::Sub;

use num::BigRational;
use num::One;
use num::Zero;

use crate::NumberError;
use crate::Parameter;
use crate::ParameterValuation;
use crate::Polynomial;
use crate::gcd;

/// A quotient of two polynomials over the parameters.
///
/// Invariant: the function is kept in canonical form, the numerator and the
/// denominator are coprime, the denominator is monic and zero is represented
/// as `0/1`. As a consequence two rational functions are mathematically equal
/// iff they are structurally equal, which makes them usable as hash keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RationalFunction {
    numerator: Polynomial,
    denominator: Polynomial,
}

impl RationalFunction {
    /// Returns `numerator / denominator` in canonical form.
    pub fn new(numerator: Polynomial, denominator: Polynomial) -> Result<RationalFunction, NumberError> {
        if denominator.is_zero() {
            return Err(NumberError::DivisionByZero(format!("({numerator})/(0)")));
        }

        let divisor = gcd(&numerator, &denominator);
        let numerator = numerator
            .div_exact(&divisor)
            .expect("The gcd divides the numerator");
        let denominator = denominator
            .div_exact(&divisor)
            .expect("The gcd divides the denominator");

        Ok(RationalFunction::from_coprime(numerator, denominator))
    }

    pub fn zero() -> RationalFunction {
        RationalFunction::from_polynomial(Polynomial::zero())
    }

    pub fn one() -> RationalFunction {
        RationalFunction::from_polynomial(Polynomial::one())
    }

    pub fn from_polynomial(numerator: Polynomial) -> RationalFunction {
        RationalFunction {
            numerator,
            denominator: Polynomial::one(),
        }
    }

    pub fn constant(value: BigRational) -> RationalFunction {
        RationalFunction::from_polynomial(Polynomial::constant(value))
    }

    pub fn from_integer(value: i64) -> RationalFunction {
        RationalFunction::from_polynomial(Polynomial::from_integer(value))
    }

    pub fn parameter(parameter: Parameter) -> RationalFunction {
        RationalFunction::from_polynomial(Polynomial::parameter(parameter))
    }

    pub fn numerator(&self) -> &Polynomial {
        &self.numerator
    }

    pub fn denominator(&self) -> &Polynomial {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.numerator.is_one() && self.denominator.is_one()
    }

    /// Returns the value if the function does not depend on any parameter.
    pub fn as_constant(&self) -> Option<BigRational> {
        if self.denominator.is_one() {
            self.numerator.as_constant()
        } else {
            None
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    /// Returns the parameters occurring in the numerator or the denominator.
    pub fn parameters(&self) -> BTreeSet<Parameter> {
        let mut result = self.numerator.parameters();
        result.extend(self.denominator.parameters());
        result
    }

    /// Returns `self / other`, or an error when `other` is zero.
    pub fn checked_div(&self, other: &RationalFunction) -> Result<RationalFunction, NumberError> {
        if other.is_zero() {
            return Err(NumberError::DivisionByZero(format!("{self} / {other}")));
        }

        Ok(self.mul_coprime(&other.denominator, &other.numerator))
    }

    /// Evaluates the function for the given parameter values.
    pub fn evaluate(&self, valuation: &ParameterValuation) -> Result<BigRational, NumberError> {
        let denominator = self.denominator.evaluate(valuation)?;
        if denominator.is_zero() {
            return Err(NumberError::DivisionByZero(self.to_string()));
        }

        Ok(self.numerator.evaluate(valuation)? / denominator)
    }

    /// Multiplies with `numerator/denominator`, which must be coprime.
    fn mul_coprime(&self, numerator: &Polynomial, denominator: &Polynomial) -> RationalFunction {
        // Cancel crosswise, the results are coprime since both inputs are.
        let left = gcd(&self.numerator, denominator);
        let right = gcd(numerator, &self.denominator);

        let result_numerator = &divide(&self.numerator, &left) * &divide(numerator, &right);
        let result_denominator = &divide(&self.denominator, &right) * &divide(denominator, &left);
        RationalFunction::from_coprime(result_numerator, result_denominator)
    }

    /// Normalises the leading coefficient of the denominator.
    fn from_coprime(numerator: Polynomial, denominator: Polynomial) -> RationalFunction {
        if numerator.is_zero() {
            return RationalFunction::zero();
        }

        let leading = denominator.leading_coefficient();
        if leading.is_one() {
            RationalFunction { numerator, denominator }
        } else {
            let factor = leading.recip();
            RationalFunction {
                numerator: numerator.scale(&factor),
                denominator: denominator.scale(&factor),
            }
        }
    }
}

/// Divides by a gcd, which is non-zero whenever the dividend is non-zero.
fn divide(dividend: &Polynomial, divisor: &Polynomial) -> Polynomial {
    if dividend.is_zero() {
        return Polynomial::zero();
    }

    dividend.div_exact(divisor).expect("A gcd divides its arguments")
}

impl Add for &RationalFunction {
    type Output = RationalFunction;

    fn add(self, other: &RationalFunction) -> RationalFunction {
        if self.denominator == other.denominator {
            if self.denominator.is_one() {
                return RationalFunction::from_polynomial(&self.numerator + &other.numerator);
            }

            return RationalFunction::new(&self.numerator + &other.numerator, self.denominator.clone())
                .expect("The denominator is non-zero");
        }

        RationalFunction::new(
            &(&self.numerator * &other.denominator) + &(&other.numerator * &self.denominator),
            &self.denominator * &other.denominator,
        )
        .expect("The product of non-zero denominators is non-zero")
    }
}

impl Sub for &RationalFunction {
    type Output = RationalFunction;

    fn sub(self, other: &RationalFunction) -> RationalFunction {
        self + &(-other)
    }
}

impl Mul for &RationalFunction {
    type Output = RationalFunction;

    fn mul(self, other: &RationalFunction) -> RationalFunction {
        self.mul_coprime(&other.numerator, &other.denominator)
    }
}

impl Div for &RationalFunction {
    type Output = RationalFunction;

    /// Panics when dividing by zero, see [RationalFunction::checked_div].
    fn div(self, other: &RationalFunction) -> RationalFunction {
        match self.checked_div(other) {
            Ok(result) => result,
            Err(error) => panic!("{error}"),
        }
    }
}

impl Neg for &RationalFunction {
    type Output = RationalFunction;

    fn neg(self) -> RationalFunction {
        RationalFunction {
            numerator: -&self.numerator,
            denominator: self.denominator.clone(),
        }
    }
}

impl fmt::Display for RationalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator.is_one() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "({})/({})", self.numerator, self.denominator)
        }
    }
}

impl fmt::Debug for RationalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rational;

    fn p(name: &str) -> RationalFunction {
        RationalFunction::parameter(Parameter::new(name))
    }

    fn c(value: i64) -> RationalFunction {
        RationalFunction::from_integer(value)
    }

    #[test]
    fn test_rational_function_canonical_form() {
        // (p - p^2) / (2p) = (1 - p) / 2 = -1/2 p + 1/2
        let x = Polynomial::parameter(Parameter::new("p"));
        let function = RationalFunction::new(&x - &(&x * &x), &Polynomial::from_integer(2) * &x).unwrap();

        assert!(function.denominator().is_one());
        assert_eq!(function, &(&c(1) - &p("p")) / &c(2));
        assert_eq!(function.to_string(), "-1/2*p + 1/2");

        assert!(RationalFunction::new(x.clone(), Polynomial::zero()).is_err());
        assert_eq!(RationalFunction::new(Polynomial::zero(), x.clone()).unwrap(), RationalFunction::zero());
    }

    #[test]
    fn test_rational_function_arithmetic() {
        // p/(p+q) + q/(p+q) = 1
        let sum = &p("p") + &p("q");
        let left = &p("p") / &sum;
        let right = &p("q") / &sum;
        assert!((&left + &right).is_one());

        // (1 - p) * 1/(1 - p) = 1
        let complement = &c(1) - &p("p");
        assert!((&complement * &(&c(1) / &complement)).is_one());

        // 1/p - 1/q = (q - p)/(pq)
        let difference = &(&c(1) / &p("p")) - &(&c(1) / &p("q"));
        assert_eq!(difference, &(&p("q") - &p("p")) / &(&p("p") * &p("q")));
        assert_eq!(difference.parameters().len(), 2);

        assert!(p("p").checked_div(&RationalFunction::zero()).is_err());
        assert!((&left - &left).is_zero());
    }

    #[test]
    fn test_rational_function_evaluate() {
        let function = &c(1) / &(&c(1) - &p("p"));
        let valuation = ParameterValuation::from([(Parameter::new("p"), rational(1, 4))]);
        assert_eq!(function.evaluate(&valuation), Ok(rational(4, 3)));

        let singular = ParameterValuation::from([(Parameter::new("p"), rational(1, 1))]);
        assert!(function.evaluate(&singular).is_err());
        assert_eq!(c(3).as_constant(), Some(rational(3, 1)));
        assert_eq!(function.as_constant(), None);
    }
}
