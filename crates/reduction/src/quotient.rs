#![forbid(unsafe_code)]

use itertools::Itertools;
use log::debug;

use pmc_model::Model;
use pmc_model::ModelBuilder;
use pmc_model::StateIndex;
use pmc_number::Value;
use pmc_utilities::TagIndex;

use crate::Preserved;
use crate::ReductionError;
use crate::canonical_partition;

/// A zero sized tag for the block.
pub struct BlockTag {}

/// The index for blocks.
pub type BlockIndex = TagIndex<BlockTag>;

/// A trait for partition refinement algorithms that expose the block number for
/// every state. Can be used to compute the quotient model.
///
/// The invariants are that the union of all blocks is the original set, and
/// that each block contains distinct states.
pub trait Partition {
    /// Returns the block number for the given state.
    fn block_number(&self, state_index: StateIndex) -> BlockIndex;

    /// Returns the number of blocks in the partition.
    fn num_of_blocks(&self) -> usize;

    /// Returns the number of states in the partition.
    fn len(&self) -> usize;

    /// Returns whether the partition is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The minimised model together with the state that every original state is
/// mapped to, which is used to translate results back to the original model.
#[derive(Clone)]
pub struct Quotient<V> {
    model: Model<V>,
    state_map: Vec<StateIndex>,
}

impl<V: Value> Quotient<V> {
    pub fn model(&self) -> &Model<V> {
        &self.model
    }

    pub fn into_model(self) -> Model<V> {
        self.model
    }

    /// Returns the quotient state of every original state.
    pub fn state_map(&self) -> &[StateIndex] {
        &self.state_map
    }

    /// Returns the quotient state of the given original state.
    pub fn quotient_state(&self, state_index: StateIndex) -> StateIndex {
        self.state_map[state_index]
    }
}

/// Returns the quotient of the given model, with one state per block of the
/// partition.
///
/// The quotient states are numbered in the order of the smallest original
/// state in every block. The transitions of a quotient state are the summed
/// transitions of the states in its block, which must all agree, and so must
/// their preserved labels and rewards. Otherwise the partition is not a
/// bisimulation and [ReductionError::InconsistentBlock] is returned.
pub fn quotient_model<V: Value>(
    model: &Model<V>,
    partition: &impl Partition,
    preserved: &Preserved,
) -> Result<Quotient<V>, ReductionError> {
    let partition = canonical_partition(partition);
    let state_map: Vec<StateIndex> = partition.iter().map(|block| StateIndex::new(*block)).collect();

    let labels = preserved
        .labels
        .iter()
        .map(|name| {
            model
                .labeling()
                .states_with_label(name)
                .map(|states| (name.as_str(), states))
                .ok_or_else(|| ReductionError::UnknownLabel(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let reward_models = preserved
        .reward_models
        .iter()
        .map(|name| {
            model
                .reward_model(name)
                .ok_or_else(|| ReductionError::UnknownRewardModel(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // The representative of every block is its smallest state, which is visited first.
    let mut representatives: Vec<Option<(StateIndex, Vec<(StateIndex, V)>)>> = vec![None; partition.num_of_blocks()];

    let mut builder = ModelBuilder::with_capacity(model.num_of_transitions());
    builder.require_num_of_states(partition.num_of_blocks());
    for (name, _) in &labels {
        builder.add_label(name);
    }
    for reward_model in &reward_models {
        builder.add_reward_model(reward_model.name());
    }

    for state_index in model.iter_states() {
        let block = state_map[state_index];
        let distribution = block_distribution(model, state_index, &state_map);

        let Some((representative, expected)) = &representatives[block] else {
            for (to, value) in &distribution {
                builder.add_transition(block, *to, value.clone());
            }

            for (name, states) in &labels {
                if states[*state_index] {
                    builder.add_state_label(block, name);
                }
            }

            for reward_model in &reward_models {
                builder.add_state_reward(
                    reward_model.name(),
                    block,
                    reward_model.state_reward(state_index).clone(),
                );
            }

            representatives[block] = Some((state_index, distribution));
            continue;
        };

        let inconsistent = |reason: String| ReductionError::InconsistentBlock {
            block,
            state: state_index,
            representative: *representative,
            reason,
        };

        if distribution != *expected {
            return Err(inconsistent("the probabilities into the blocks".to_string()));
        }

        for (name, states) in &labels {
            if states[*state_index] != states[**representative] {
                return Err(inconsistent(format!("label \"{name}\"")));
            }
        }

        for reward_model in &reward_models {
            if reward_model.state_reward(state_index) != reward_model.state_reward(*representative) {
                return Err(inconsistent(format!("reward model \"{}\"", reward_model.name())));
            }
        }
    }

    for state_index in model.initial_states() {
        builder.add_initial_state(state_map[*state_index]);
    }

    let quotient = builder.finish(model.model_type())?;
    debug!(
        "Quotient has {} states and {} transitions",
        quotient.num_of_states(),
        quotient.num_of_transitions()
    );

    Ok(Quotient {
        model: quotient,
        state_map,
    })
}

/// Returns the probabilities of moving from the given state into every
/// quotient state, sorted by quotient state.
fn block_distribution<V: Value>(
    model: &Model<V>,
    state_index: StateIndex,
    state_map: &[StateIndex],
) -> Vec<(StateIndex, V)> {
    let mut successors: Vec<(StateIndex, &V)> = model
        .outgoing_transitions(state_index)
        .map(|transition| (state_map[transition.to], transition.value))
        .collect();
    successors.sort_by_key(|(to, _)| *to);

    successors
        .into_iter()
        .chunk_by(|(to, _)| *to)
        .into_iter()
        .map(|(to, values)| (to, V::sum_canonical(values.map(|(_, value)| value.clone()).collect())))
        .filter(|(_, value)| !value.is_zero())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_model::ModelType;

    use crate::IndexedPartition;

    /// State 0 moves to 1 and 2 with probability one half, which both move to
    /// the absorbing state 3 labelled `done`.
    fn diamond() -> Model<f64> {
        let mut builder = ModelBuilder::new();
        builder.add_initial_state(StateIndex::new(0));
        builder.add_transition(StateIndex::new(0), StateIndex::new(1), 0.5);
        builder.add_transition(StateIndex::new(0), StateIndex::new(2), 0.5);
        builder.add_transition(StateIndex::new(1), StateIndex::new(3), 1.0);
        builder.add_transition(StateIndex::new(2), StateIndex::new(3), 1.0);
        builder.add_transition(StateIndex::new(3), StateIndex::new(3), 1.0);
        builder.add_state_label(StateIndex::new(3), "done");
        builder.add_state_label(StateIndex::new(1), "left");
        builder.finish(ModelType::Dtmc).unwrap()
    }

    fn partition(numbers: &[usize]) -> IndexedPartition {
        IndexedPartition::with_partition(
            numbers.iter().map(|number| BlockIndex::new(*number)).collect(),
            numbers.iter().max().map_or(0, |max| max + 1),
        )
    }

    #[test]
    fn test_quotient_model() {
        let model = diamond();
        let quotient = quotient_model(&model, &partition(&[2, 1, 1, 0]), &Preserved::with_labels(["done"])).unwrap();

        assert_eq!(
            quotient.state_map(),
            &[StateIndex::new(0), StateIndex::new(1), StateIndex::new(1), StateIndex::new(2)]
        );

        let result = quotient.model();
        assert_eq!(result.num_of_states(), 3);
        assert_eq!(result.num_of_transitions(), 3);
        assert_eq!(result.initial_states(), &[StateIndex::new(0)]);
        assert!(result.labeling().has_label(StateIndex::new(2), "done"));
        assert!(!result.labeling().contains_label("left"));

        let transitions: Vec<_> = result
            .outgoing_transitions(StateIndex::new(0))
            .map(|transition| (transition.to, *transition.value))
            .collect();
        assert_eq!(transitions, vec![(StateIndex::new(1), 1.0)]);
        result.validate(1e-9).unwrap();
    }

    #[test]
    fn test_quotient_inconsistent_block() {
        let model = diamond();

        // State 0 and 3 have different successors.
        let result = quotient_model(&model, &partition(&[0, 1, 1, 0]), &Preserved::default());
        assert!(matches!(result, Err(ReductionError::InconsistentBlock { .. })));

        // State 1 and 2 differ on the preserved label.
        let result = quotient_model(&model, &partition(&[0, 1, 1, 2]), &Preserved::with_labels(["left"]));
        assert!(matches!(result, Err(ReductionError::InconsistentBlock { .. })));
    }
}
