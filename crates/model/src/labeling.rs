use std::fmt;

use bitvec::bitvec;
use bitvec::order::Lsb0;
use bitvec::vec::BitVec;

use crate::StateIndex;

/// A set of states, indexed by state index.
pub type StateSet = BitVec<usize, Lsb0>;

/// Returns the empty set over the given number of states.
pub fn empty_state_set(num_of_states: usize) -> StateSet {
    bitvec![usize, Lsb0; 0; num_of_states]
}

/// Assigns a set of atomic propositions (labels) to every state.
///
/// Stored per label as the set of states carrying it, in the order in which the
/// labels were added.
#[derive(Clone, PartialEq, Eq)]
pub struct StateLabeling {
    num_of_states: usize,
    names: Vec<String>,
    states: Vec<StateSet>,
}

impl StateLabeling {
    /// Creates a labeling without labels for the given number of states.
    pub fn new(num_of_states: usize) -> StateLabeling {
        StateLabeling {
            num_of_states,
            names: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Adds the label with the given states, replacing the states of an existing label with that name.
    pub fn add_label(&mut self, name: &str, states: StateSet) {
        debug_assert_eq!(
            states.len(),
            self.num_of_states,
            "The label {name} must assign a value to every state"
        );

        match self.position(name) {
            Some(index) => self.states[index] = states,
            None => {
                self.names.push(name.to_string());
                self.states.push(states);
            }
        }
    }

    /// Adds the given label to a single state, introducing the label if necessary.
    pub fn add_label_to_state(&mut self, name: &str, state: StateIndex) {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.states.push(empty_state_set(self.num_of_states));
                self.names.len() - 1
            }
        };

        self.states[index].set(*state, true);
    }

    pub fn contains_label(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns true iff the state carries the given label, false for unknown labels.
    pub fn has_label(&self, state: StateIndex, name: &str) -> bool {
        self.position(name).is_some_and(|index| self.states[index][*state])
    }

    /// Returns the states carrying the given label.
    pub fn states_with_label(&self, name: &str) -> Option<&StateSet> {
        self.position(name).map(|index| &self.states[index])
    }

    /// Returns the labels of the given state.
    pub fn labels_of_state(&self, state: StateIndex) -> impl Iterator<Item = &str> + '_ {
        self.names
            .iter()
            .zip(self.states.iter())
            .filter(move |(_, states)| states[*state])
            .map(|(name, _)| name.as_str())
    }

    /// Returns the names of all labels in insertion order.
    pub fn label_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.names.iter().map(|name| name.as_str())
    }

    pub fn num_of_labels(&self) -> usize {
        self.names.len()
    }

    pub fn num_of_states(&self) -> usize {
        self.num_of_states
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|label| label == name)
    }
}

impl fmt::Debug for StateLabeling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, states) in self.names.iter().zip(self.states.iter()) {
            writeln!(f, "{name}: {} states", states.count_ones())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labeling() {
        let mut labeling = StateLabeling::new(3);
        labeling.add_label_to_state("goal", StateIndex::new(2));
        labeling.add_label_to_state("init", StateIndex::new(0));
        labeling.add_label_to_state("goal", StateIndex::new(1));

        assert!(labeling.has_label(StateIndex::new(1), "goal"));
        assert!(!labeling.has_label(StateIndex::new(0), "goal"));
        assert!(!labeling.has_label(StateIndex::new(0), "unknown"));
        assert_eq!(labeling.label_names().collect::<Vec<_>>(), vec!["goal", "init"]);
        assert_eq!(labeling.labels_of_state(StateIndex::new(0)).collect::<Vec<_>>(), vec!["init"]);
        assert_eq!(labeling.states_with_label("goal").map(|states| states.count_ones()), Some(2));

        labeling.add_label("goal", empty_state_set(3));
        assert_eq!(labeling.num_of_labels(), 2);
        assert!(!labeling.has_label(StateIndex::new(1), "goal"));
    }
}
