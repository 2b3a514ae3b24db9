use std::cmp::Ordering;
use std::fmt;

use itertools::EitherOrBoth;
use itertools::Itertools;
use num::BigRational;
use num::One;

use crate::NumberError;
use crate::Parameter;
use crate::ParameterValuation;

/// A power product `p1^e1 * ... * pn^en` of parameters.
///
/// Invariant: the factors are sorted by parameter and every exponent is positive.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Monomial {
    factors: Vec<(Parameter, u32)>,
}

impl Monomial {
    /// The empty product.
    pub fn one() -> Monomial {
        Monomial::default()
    }

    /// Returns `parameter^exponent`.
    pub fn parameter(parameter: Parameter, exponent: u32) -> Monomial {
        if exponent == 0 {
            Monomial::one()
        } else {
            Monomial {
                factors: vec![(parameter, exponent)],
            }
        }
    }

    pub fn is_one(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn factors(&self) -> &[(Parameter, u32)] {
        &self.factors
    }

    /// Returns the total degree.
    pub fn degree(&self) -> u32 {
        self.factors.iter().map(|(_, exponent)| exponent).sum()
    }

    /// Returns the exponent of the given parameter, zero if it does not occur.
    pub fn exponent(&self, parameter: &Parameter) -> u32 {
        self.factors
            .binary_search_by(|(p, _)| p.cmp(parameter))
            .map_or(0, |index| self.factors[index].1)
    }

    /// Splits the monomial into the exponent of the given parameter and the remaining factors.
    pub fn split_off(&self, parameter: &Parameter) -> (u32, Monomial) {
        match self.factors.binary_search_by(|(p, _)| p.cmp(parameter)) {
            Ok(index) => {
                let mut factors = self.factors.clone();
                let (_, exponent) = factors.remove(index);
                (exponent, Monomial { factors })
            }
            Err(_) => (0, self.clone()),
        }
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let factors = self
            .factors
            .iter()
            .merge_join_by(other.factors.iter(), |(left, _), (right, _)| left.cmp(right))
            .map(|entry| match entry {
                EitherOrBoth::Both((parameter, left), (_, right)) => (parameter.clone(), left + right),
                EitherOrBoth::Left(factor) | EitherOrBoth::Right(factor) => factor.clone(),
            })
            .collect();

        Monomial { factors }
    }

    /// Returns `self / other` if `other` divides `self`.
    pub fn checked_div(&self, other: &Monomial) -> Option<Monomial> {
        let mut factors = Vec::with_capacity(self.factors.len());

        for entry in self
            .factors
            .iter()
            .merge_join_by(other.factors.iter(), |(left, _), (right, _)| left.cmp(right))
        {
            match entry {
                EitherOrBoth::Both((parameter, left), (_, right)) => {
                    if left < right {
                        return None;
                    }

                    if left > right {
                        factors.push((parameter.clone(), left - right));
                    }
                }
                EitherOrBoth::Left(factor) => factors.push(factor.clone()),
                EitherOrBoth::Right(_) => return None,
            }
        }

        Some(Monomial { factors })
    }

    /// Evaluates the monomial for the given parameter values.
    pub fn evaluate(&self, valuation: &ParameterValuation) -> Result<BigRational, NumberError> {
        let mut result = BigRational::one();
        for (parameter, exponent) in &self.factors {
            let value = valuation
                .get(parameter)
                .ok_or_else(|| NumberError::UndefinedConstant(parameter.name().to_string()))?;
            result *= num::pow(value.clone(), *exponent as usize);
        }

        Ok(result)
    }
}

/// The lexicographic term order, the smallest parameter is the most significant.
impl Ord for Monomial {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.factors.iter();
        let mut right = other.factors.iter();

        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some((left_parameter, left_exponent)), Some((right_parameter, right_exponent))) => {
                    match left_parameter.cmp(right_parameter) {
                        Ordering::Equal => match left_exponent.cmp(right_exponent) {
                            Ordering::Equal => continue,
                            ordering => return ordering,
                        },
                        // The left monomial has a positive exponent for a more significant parameter.
                        Ordering::Less => return Ordering::Greater,
                        Ordering::Greater => return Ordering::Less,
                    }
                }
            }
        }
    }
}

impl PartialOrd for Monomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return write!(f, "1");
        }

        let factors = self.factors.iter().format_with("*", |(parameter, exponent), f| {
            if *exponent == 1 {
                f(&format_args!("{parameter}"))
            } else {
                f(&format_args!("{parameter}^{exponent}"))
            }
        });

        write!(f, "{factors}")
    }
}

impl fmt::Debug for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
