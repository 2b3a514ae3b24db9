//! Graph based precomputations that determine the states that satisfy an
//! until formula with probability zero or one, independently of the actual
//! probabilities.

use log::debug;

use pmc_model::IncomingTransitions;
use pmc_model::StateIndex;
use pmc_model::StateSet;

/// Returns the states from which the `psi` states cannot be reached by only
/// visiting `phi` states in between, i.e. the states where `phi U psi` holds
/// with probability zero.
pub fn prob0(incoming: &IncomingTransitions, phi: &StateSet, psi: &StateSet) -> StateSet {
    // The states that reach psi with positive probability.
    let reach = backward_reachable(incoming, psi.clone(), phi);

    let result = !reach;
    debug!("Found {} states with probability zero", result.count_ones());
    result
}

/// Returns the states where `phi U psi` holds with probability one, given the
/// states where it holds with probability zero. These are the states that
/// cannot reach a probability zero state by only visiting `phi` states that
/// are not `psi` states.
pub fn prob1(incoming: &IncomingTransitions, phi: &StateSet, psi: &StateSet, no: &StateSet) -> StateSet {
    let between = phi.clone() & !psi.clone();
    let reach_no = backward_reachable(incoming, no.clone(), &between);

    let result = !reach_no;
    debug!("Found {} states with probability one", result.count_ones());
    result
}

/// Extends the given set with all states that can reach it by a path whose
/// states, except the last one, are in `through`.
fn backward_reachable(incoming: &IncomingTransitions, mut result: StateSet, through: &StateSet) -> StateSet {
    let mut queue: Vec<StateIndex> = result.iter_ones().map(StateIndex::new).collect();

    while let Some(state_index) = queue.pop() {
        for predecessor in incoming.predecessors(state_index) {
            if through[*predecessor] && !result[*predecessor] {
                result.set(*predecessor, true);
                queue.push(predecessor);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_model::ModelBuilder;
    use pmc_model::ModelType;
    use pmc_model::empty_state_set;

    #[test]
    fn test_prob0_prob1() {
        // 0 -> {1, 2}, 1 is the goal and 2 is a sink, 3 always reaches the goal.
        let mut builder = ModelBuilder::<f64>::new();
        builder.add_initial_state(StateIndex::new(0));
        builder.add_transition(StateIndex::new(0), StateIndex::new(1), 0.5);
        builder.add_transition(StateIndex::new(0), StateIndex::new(2), 0.5);
        builder.add_transition(StateIndex::new(1), StateIndex::new(1), 1.0);
        builder.add_transition(StateIndex::new(2), StateIndex::new(2), 1.0);
        builder.add_transition(StateIndex::new(3), StateIndex::new(1), 1.0);
        let model = builder.finish(ModelType::Dtmc).unwrap();
        let incoming = IncomingTransitions::new(&model);

        let mut phi = empty_state_set(4);
        phi.fill(true);
        let mut psi = empty_state_set(4);
        psi.set(1, true);

        let no = prob0(&incoming, &phi, &psi);
        assert_eq!(no.iter_ones().collect::<Vec<_>>(), vec![2]);

        let yes = prob1(&incoming, &phi, &psi, &no);
        assert_eq!(yes.iter_ones().collect::<Vec<_>>(), vec![1, 3]);
    }
}
