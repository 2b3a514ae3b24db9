use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Add;
use std::ops::Mul;
use std::ops::Neg;
use std::ops::Sub;

use num::BigRational;
use num::One;
use num::Signed;
use num::Zero;

use crate::Monomial;
use crate::NumberError;
use crate::Parameter;
use crate::ParameterValuation;

/// A multivariate polynomial with rational coefficients over named parameters.
///
/// Invariant: no coefficient is zero, so the zero polynomial has no terms and
/// two polynomials are equal iff their term maps are equal. The terms are
/// ordered by the lexicographic term order of [Monomial], the last term is
/// the leading term.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Polynomial {
    pub fn zero() -> Polynomial {
        Polynomial::default()
    }

    pub fn one() -> Polynomial {
        Polynomial::constant(BigRational::one())
    }

    pub fn constant(value: BigRational) -> Polynomial {
        Polynomial::term(Monomial::one(), value)
    }

    pub fn from_integer(value: i64) -> Polynomial {
        Polynomial::constant(BigRational::from_integer(value.into()))
    }

    /// Returns the polynomial consisting of the single parameter.
    pub fn parameter(parameter: Parameter) -> Polynomial {
        Polynomial::term(Monomial::parameter(parameter, 1), BigRational::one())
    }

    /// Returns `coefficient * monomial`.
    pub fn term(monomial: Monomial, coefficient: BigRational) -> Polynomial {
        let mut terms = BTreeMap::new();
        if !coefficient.is_zero() {
            terms.insert(monomial, coefficient);
        }

        Polynomial { terms }
    }

    /// Sums the given terms, monomials may occur more than once.
    pub fn from_terms(terms: impl IntoIterator<Item = (Monomial, BigRational)>) -> Polynomial {
        let mut result = Polynomial::zero();
        for (monomial, coefficient) in terms {
            result.add_term(monomial, coefficient);
        }

        result
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|value| value.is_one())
    }

    /// Returns the value of a constant polynomial.
    pub fn as_constant(&self) -> Option<BigRational> {
        match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self.terms.get(&Monomial::one()).cloned(),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    pub fn num_of_terms(&self) -> usize {
        self.terms.len()
    }

    /// Iterates over the terms in ascending term order.
    pub fn terms(&self) -> impl DoubleEndedIterator<Item = (&Monomial, &BigRational)> + ExactSizeIterator {
        self.terms.iter()
    }

    pub fn leading_term(&self) -> Option<(&Monomial, &BigRational)> {
        self.terms.last_key_value()
    }

    /// Returns the coefficient of the leading term, zero for the zero polynomial.
    pub fn leading_coefficient(&self) -> BigRational {
        self.leading_term()
            .map_or_else(BigRational::zero, |(_, coefficient)| coefficient.clone())
    }

    /// Returns the most significant parameter occurring in the polynomial.
    pub fn main_parameter(&self) -> Option<&Parameter> {
        self.leading_term()
            .and_then(|(monomial, _)| monomial.factors().first())
            .map(|(parameter, _)| parameter)
    }

    /// Returns all parameters occurring in the polynomial.
    pub fn parameters(&self) -> BTreeSet<Parameter> {
        self.terms
            .keys()
            .flat_map(|monomial| monomial.factors().iter().map(|(parameter, _)| parameter.clone()))
            .collect()
    }

    /// Returns the degree of the polynomial in the given parameter.
    pub fn degree_in(&self, parameter: &Parameter) -> u32 {
        self.terms
            .keys()
            .map(|monomial| monomial.exponent(parameter))
            .max()
            .unwrap_or(0)
    }

    /// Views the polynomial as a univariate polynomial in the given parameter
    /// and returns its non-zero coefficients indexed by exponent.
    pub fn coefficients_in(&self, parameter: &Parameter) -> BTreeMap<u32, Polynomial> {
        let mut result: BTreeMap<u32, Polynomial> = BTreeMap::new();
        for (monomial, coefficient) in &self.terms {
            let (exponent, rest) = monomial.split_off(parameter);
            result
                .entry(exponent)
                .or_default()
                .terms
                .insert(rest, coefficient.clone());
        }

        result
    }

    /// Returns the coefficient of the highest power of the given parameter.
    pub fn leading_coefficient_in(&self, parameter: &Parameter) -> Polynomial {
        self.coefficients_in(parameter)
            .pop_last()
            .map_or_else(Polynomial::zero, |(_, coefficient)| coefficient)
    }

    /// The inverse of [Polynomial::coefficients_in].
    pub fn from_coefficients(parameter: &Parameter, coefficients: BTreeMap<u32, Polynomial>) -> Polynomial {
        let mut result = Polynomial::zero();
        for (exponent, coefficient) in coefficients {
            let power = Monomial::parameter(parameter.clone(), exponent);
            for (monomial, value) in coefficient.terms {
                result.add_term(monomial.mul(&power), value);
            }
        }

        result
    }

    /// Multiplies every coefficient by the given factor.
    pub fn scale(&self, factor: &BigRational) -> Polynomial {
        if factor.is_zero() {
            return Polynomial::zero();
        }

        Polynomial {
            terms: self
                .terms
                .iter()
                .map(|(monomial, coefficient)| (monomial.clone(), coefficient * factor))
                .collect(),
        }
    }

    pub fn mul_monomial(&self, factor: &Monomial) -> Polynomial {
        Polynomial {
            terms: self
                .terms
                .iter()
                .map(|(monomial, coefficient)| (monomial.mul(factor), coefficient.clone()))
                .collect(),
        }
    }

    /// Returns the polynomial divided by its leading coefficient, the zero polynomial stays zero.
    pub fn monic(&self) -> Polynomial {
        let leading = self.leading_coefficient();
        if leading.is_zero() || leading.is_one() {
            self.clone()
        } else {
            self.scale(&leading.recip())
        }
    }

    /// Returns the quotient if `divisor` divides the polynomial exactly.
    pub fn div_exact(&self, divisor: &Polynomial) -> Option<Polynomial> {
        let (divisor_monomial, divisor_coefficient) = divisor.leading_term()?;

        if let Some(constant) = divisor.as_constant() {
            return Some(self.scale(&constant.recip()));
        }

        let mut quotient = Polynomial::zero();
        let mut remainder = self.clone();
        while let Some((monomial, coefficient)) = remainder.leading_term() {
            // In a monomial order the leading term of a multiple is divisible by the leading term of the divisor.
            let factor_monomial = monomial.checked_div(divisor_monomial)?;
            let factor_coefficient = coefficient / divisor_coefficient;

            remainder = &remainder
                - &divisor
                    .mul_monomial(&factor_monomial)
                    .scale(&factor_coefficient);
            quotient.add_term(factor_monomial, factor_coefficient);
        }

        Some(quotient)
    }

    /// Evaluates the polynomial for the given parameter values.
    pub fn evaluate(&self, valuation: &ParameterValuation) -> Result<BigRational, NumberError> {
        let mut result = BigRational::zero();
        for (monomial, coefficient) in &self.terms {
            result += coefficient * monomial.evaluate(valuation)?;
        }

        Ok(result)
    }

    fn add_term(&mut self, monomial: Monomial, coefficient: BigRational) {
        if coefficient.is_zero() {
            return;
        }

        match self.terms.entry(monomial) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(coefficient);
            }
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                *entry.get_mut() += coefficient;
                if entry.get().is_zero() {
                    entry.remove();
                }
            }
        }
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, other: &Polynomial) -> Polynomial {
        let mut result = self.clone();
        for (monomial, coefficient) in &other.terms {
            result.add_term(monomial.clone(), coefficient.clone());
        }

        result
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, other: &Polynomial) -> Polynomial {
        let mut result = self.clone();
        for (monomial, coefficient) in &other.terms {
            result.add_term(monomial.clone(), -coefficient);
        }

        result
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, other: &Polynomial) -> Polynomial {
        let mut result = Polynomial::zero();
        for (left_monomial, left_coefficient) in &self.terms {
            for (right_monomial, right_coefficient) in &other.terms {
                result.add_term(left_monomial.mul(right_monomial), left_coefficient * right_coefficient);
            }
        }

        result
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        Polynomial {
            terms: self
                .terms
                .iter()
                .map(|(monomial, coefficient)| (monomial.clone(), -coefficient))
                .collect(),
        }
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }

        for (index, (monomial, coefficient)) in self.terms.iter().rev().enumerate() {
            let magnitude = coefficient.abs();
            if index == 0 {
                if coefficient.is_negative() {
                    write!(f, "-")?;
                }
            } else if coefficient.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }

            if monomial.is_one() {
                write!(f, "{magnitude}")?;
            } else if magnitude.is_one() {
                write!(f, "{monomial}")?;
            } else {
                write!(f, "{magnitude}*{monomial}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
