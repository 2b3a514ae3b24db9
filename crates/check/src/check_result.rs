use std::fmt;

use pmc_model::StateIndex;
use pmc_number::Value;

/// The value of a property for every state of the checked model.
#[derive(Clone, PartialEq)]
pub struct CheckResult<V> {
    values: Vec<V>,
}

impl<V: Value> CheckResult<V> {
    pub fn new(values: Vec<V>) -> CheckResult<V> {
        CheckResult { values }
    }

    /// Returns the value of the given state.
    pub fn at(&self, state_index: StateIndex) -> &V {
        &self.values[state_index]
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<V: Value> fmt::Debug for CheckResult<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().enumerate().map(|(state, value)| (state, value.to_string())))
            .finish()
    }
}
