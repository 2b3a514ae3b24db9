#![forbid(unsafe_code)]

use pmc_number::Value;

use crate::Model;
use crate::StateIndex;

/// Stores the source states of the incoming transitions for a given model.
pub struct IncomingTransitions {
    transition_from: Vec<StateIndex>,
    state2incoming: Vec<usize>,
}

impl IncomingTransitions {
    pub fn new<V: Value>(model: &Model<V>) -> Self {
        let mut transition_from = vec![StateIndex::new(0); model.num_of_transitions()];
        let mut state2incoming = vec![0usize; model.num_of_states()];

        // Count the number of incoming transitions for each state
        for state_index in model.iter_states() {
            for transition in model.outgoing_transitions(state_index) {
                state2incoming[transition.to] += 1;
            }
        }

        // Compute the start offsets (prefix sum)
        let mut offset = 0;
        for start in state2incoming.iter_mut() {
            let count = *start;
            *start = offset;
            offset += count;
        }

        // Place the transitions, which are sorted by source state since the states are visited in order.
        for state_index in model.iter_states() {
            for transition in model.outgoing_transitions(state_index) {
                transition_from[state2incoming[transition.to]] = state_index;
                state2incoming[transition.to] += 1;
            }
        }

        // Reset the offsets, every entry now contains the start of the next state.
        let mut previous = 0;
        for start in state2incoming.iter_mut() {
            let end = *start;
            *start = previous;
            previous = end;
        }

        // Add sentinel state
        state2incoming.push(transition_from.len());

        Self {
            transition_from,
            state2incoming,
        }
    }

    /// Returns the source states of the incoming transitions of the given
    /// state in ascending order.
    pub fn predecessors(&self, state_index: StateIndex) -> impl ExactSizeIterator<Item = StateIndex> + '_ {
        let start = self.state2incoming[*state_index];
        let end = self.state2incoming[*state_index + 1];
        self.transition_from[start..end].iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_utilities::random_test;

    use crate::random_dtmc;

    #[test]
    fn test_random_incoming_transitions() {
        random_test(100, |rng| {
            let model = random_dtmc::<f64>(rng, 10, 3, 3);
            let incoming = IncomingTransitions::new(&model);

            // Check that for every outgoing transition there is an incoming transition.
            for state_index in model.iter_states() {
                for transition in model.outgoing_transitions(state_index) {
                    assert!(
                        incoming.predecessors(transition.to).any(|from| from == state_index),
                        "Outgoing transition ({state_index}, {transition:?}) should have an incoming transition"
                    );
                }
            }

            // Check that all incoming transitions belong to some outgoing transition.
            let mut num_of_incoming = 0;
            for state_index in model.iter_states() {
                for from in incoming.predecessors(state_index) {
                    assert!(
                        model.outgoing_transitions(from).any(|outgoing| outgoing.to == state_index),
                        "Incoming transition ({from}, {state_index}) should have an outgoing transition"
                    );
                    num_of_incoming += 1;
                }
            }

            assert_eq!(num_of_incoming, model.num_of_transitions());
        });
    }
}
