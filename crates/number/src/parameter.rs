use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use num::BigRational;

/// A named indeterminate of a parametric model, i.e. an undefined constant of
/// the program. Parameters are ordered by name, the smallest name is the most
/// significant variable in the term order of polynomials.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Parameter(Arc<str>);

impl Parameter {
    pub fn new(name: &str) -> Parameter {
        Parameter(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assigns a value to (some of) the parameters.
pub type ParameterValuation = BTreeMap<Parameter, BigRational>;
