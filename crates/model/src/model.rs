#![forbid(unsafe_code)]

//! The explicit model type and associated types.

use std::fmt;

use pmc_io::LargeFormatter;
use pmc_number::Value;
use pmc_utilities::TagIndex;

use crate::ModelError;
use crate::RewardModel;
use crate::StateLabeling;

/// A unique type for the states.
pub struct StateTag;

/// The index for a state.
pub type StateIndex = TagIndex<StateTag>;

/// The kind of stochastic model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Discrete-time Markov chain.
    Dtmc,
    /// Continuous-time Markov chain.
    Ctmc,
    /// Markov decision process.
    Mdp,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Dtmc => write!(f, "DTMC"),
            ModelType::Ctmc => write!(f, "CTMC"),
            ModelType::Mdp => write!(f, "MDP"),
        }
    }
}

/// An outgoing transition of a state.
#[derive(Debug, PartialEq)]
pub struct Transition<'a, V> {
    pub to: StateIndex,
    pub value: &'a V,
}

/// An explicit probabilistic model, consisting of states with a single
/// probability distribution over successor states each.
///
/// # Details
///
/// The transitions are stored in a compressed sparse row format: the outgoing
/// transitions of state `s` are the entries `states[s]..states[s + 1]` of
/// `transition_to` and `transition_values`, sorted by target state. There is
/// at most one transition for every pair of states and no transition has
/// value zero.
#[derive(Clone, PartialEq)]
pub struct Model<V> {
    model_type: ModelType,

    /// The offsets into the transition vectors, with a sentinel at the end.
    states: Vec<usize>,
    transition_to: Vec<StateIndex>,
    transition_values: Vec<V>,

    /// Sorted and without duplicates.
    initial_states: Vec<StateIndex>,
    labeling: StateLabeling,
    reward_models: Vec<RewardModel<V>>,
}

impl<V: Value> Model<V> {
    /// Constructs a model from its compressed representation, see [crate::ModelBuilder] for
    /// the convenient way to construct models.
    pub(crate) fn from_parts(
        model_type: ModelType,
        states: Vec<usize>,
        transition_to: Vec<StateIndex>,
        transition_values: Vec<V>,
        initial_states: Vec<StateIndex>,
        labeling: StateLabeling,
        reward_models: Vec<RewardModel<V>>,
    ) -> Model<V> {
        debug_assert_eq!(states.last(), Some(&transition_to.len()), "The sentinel must be present");
        debug_assert_eq!(transition_to.len(), transition_values.len());
        debug_assert!(
            initial_states.windows(2).all(|pair| pair[0] < pair[1]),
            "The initial states must be sorted"
        );
        debug_assert_eq!(labeling.num_of_states(), states.len() - 1);

        Model {
            model_type,
            states,
            transition_to,
            transition_values,
            initial_states,
            labeling,
            reward_models,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn num_of_states(&self) -> usize {
        // Remove the sentinel state.
        self.states.len() - 1
    }

    pub fn num_of_transitions(&self) -> usize {
        self.transition_to.len()
    }

    /// Returns true iff the values of this model can depend on parameters.
    pub fn supports_parameters(&self) -> bool {
        V::SUPPORTS_PARAMETERS
    }

    /// Returns true iff some transition probability or reward depends on a parameter.
    pub fn has_parameters(&self) -> bool {
        V::SUPPORTS_PARAMETERS
            && (self.transition_values.iter().any(|value| !value.is_constant())
                || self
                    .reward_models
                    .iter()
                    .any(|reward_model| reward_model.state_rewards().iter().any(|value| !value.is_constant())))
    }

    /// Returns the initial states in ascending order.
    pub fn initial_states(&self) -> &[StateIndex] {
        &self.initial_states
    }

    pub fn is_initial_state(&self, state_index: StateIndex) -> bool {
        self.initial_states.binary_search(&state_index).is_ok()
    }

    pub fn labeling(&self) -> &StateLabeling {
        &self.labeling
    }

    pub fn reward_models(&self) -> &[RewardModel<V>] {
        &self.reward_models
    }

    /// Returns the reward model with the given name.
    pub fn reward_model(&self, name: &str) -> Option<&RewardModel<V>> {
        self.reward_models
            .iter()
            .find(|reward_model| reward_model.name() == name)
    }

    /// Returns the outgoing transitions of the given state, sorted by target state.
    pub fn outgoing_transitions(&self, state_index: StateIndex) -> impl ExactSizeIterator<Item = Transition<'_, V>> + '_ {
        let start = self.states[*state_index];
        let end = self.states[*state_index + 1];

        (start..end).map(move |i| Transition {
            to: self.transition_to[i],
            value: &self.transition_values[i],
        })
    }

    /// Iterate over all state indices of the model.
    pub fn iter_states(&self) -> impl DoubleEndedIterator<Item = StateIndex> + ExactSizeIterator + '_ {
        StateIndex::range(self.num_of_states())
    }

    /// Iterates over all transition values of the model.
    pub fn transition_values(&self) -> &[V] {
        &self.transition_values
    }

    /// Checks that every state has a probability distribution as outgoing
    /// transitions, i.e. a non-empty support and a total mass of one. Floating
    /// point sums are compared with the given relative tolerance, rational
    /// functions are compared exactly.
    pub fn validate(&self, tolerance: f64) -> Result<(), ModelError> {
        for state_index in self.iter_states() {
            let values: Vec<V> = self
                .outgoing_transitions(state_index)
                .map(|transition| transition.value.clone())
                .collect();

            if values.is_empty() {
                return Err(ModelError::MalformedDistribution {
                    state: state_index,
                    sum: "0 (no outgoing transitions)".to_string(),
                });
            }

            let sum = V::sum_canonical(values);
            if !sum.is_close(&V::one(), tolerance) {
                return Err(ModelError::MalformedDistribution {
                    state: state_index,
                    sum: sum.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Combines this model with another one into a single model, where the
    /// states of the other model are offset by the number of states of this
    /// model. The offset is returned. The initial states, labels and reward
    /// models are combined, reward models only present in one of the models
    /// are dropped.
    pub fn merge_disjoint(&self, other: &Model<V>) -> (Model<V>, usize) {
        let offset = self.num_of_states();
        let num_of_states = offset + other.num_of_states();

        let mut states = self.states.clone();
        states.pop();
        let mut transition_to = self.transition_to.clone();
        let mut transition_values = self.transition_values.clone();
        for state_index in other.iter_states() {
            states.push(transition_to.len());
            for transition in other.outgoing_transitions(state_index) {
                transition_to.push(StateIndex::new(*transition.to + offset));
                transition_values.push(transition.value.clone());
            }
        }

        // Add back the sentinel state.
        states.push(transition_to.len());

        let mut initial_states = self.initial_states.clone();
        initial_states.extend(
            other
                .initial_states
                .iter()
                .map(|state_index| StateIndex::new(**state_index + offset)),
        );

        let mut labeling = StateLabeling::new(num_of_states);
        for name in self.labeling.label_names().chain(other.labeling.label_names()) {
            if labeling.contains_label(name) {
                continue;
            }

            for state_index in self.iter_states() {
                if self.labeling.has_label(state_index, name) {
                    labeling.add_label_to_state(name, state_index);
                }
            }

            for state_index in other.iter_states() {
                if other.labeling.has_label(state_index, name) {
                    labeling.add_label_to_state(name, StateIndex::new(*state_index + offset));
                }
            }

            if !labeling.contains_label(name) {
                // Keep labels that no state carries.
                labeling.add_label(name, crate::empty_state_set(num_of_states));
            }
        }

        let reward_models = self
            .reward_models
            .iter()
            .filter_map(|reward_model| {
                let right = other.reward_model(reward_model.name())?;
                let mut state_rewards = reward_model.state_rewards().to_vec();
                state_rewards.extend(right.state_rewards().iter().cloned());
                Some(RewardModel::new(reward_model.name().to_string(), state_rewards))
            })
            .collect();

        (
            Model::from_parts(
                self.model_type,
                states,
                transition_to,
                transition_values,
                initial_states,
                labeling,
                reward_models,
            ),
            offset,
        )
    }

    /// Returns metrics about the model.
    pub fn metrics(&self) -> ModelMetrics {
        ModelMetrics {
            model_type: self.model_type,
            num_of_states: self.num_of_states(),
            num_of_transitions: self.num_of_transitions(),
            num_of_initial_states: self.initial_states.len(),
            labels: self
                .labeling
                .label_names()
                .map(|name| {
                    let count = self.labeling.states_with_label(name).map_or(0, |states| states.count_ones());
                    (name.to_string(), count)
                })
                .collect(),
            reward_models: self
                .reward_models
                .iter()
                .map(|reward_model| reward_model.name().to_string())
                .collect(),
            has_parameters: self.has_parameters(),
        }
    }
}

impl<V: Value> fmt::Debug for Model<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} with initial states {:?}", self.model_type, self.initial_states)?;
        for state_index in self.iter_states() {
            for transition in self.outgoing_transitions(state_index) {
                writeln!(f, "    {state_index} --[{}]-> {}", transition.value, transition.to)?;
            }
        }

        Ok(())
    }
}

/// Metrics for a model.
#[derive(Debug, Clone)]
pub struct ModelMetrics {
    pub model_type: ModelType,
    pub num_of_states: usize,
    pub num_of_transitions: usize,
    pub num_of_initial_states: usize,
    /// The labels with the number of states carrying them.
    pub labels: Vec<(String, usize)>,
    pub reward_models: Vec<String>,
    pub has_parameters: bool,
}

impl fmt::Display for ModelMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model type: {}", self.model_type)?;
        writeln!(f, "Number of states: {}", LargeFormatter(self.num_of_states))?;
        writeln!(f, "Number of transitions: {}", LargeFormatter(self.num_of_transitions))?;
        writeln!(f, "Number of initial states: {}", LargeFormatter(self.num_of_initial_states))?;
        writeln!(f, "Parametric: {}", if self.has_parameters { "yes" } else { "no" })?;
        writeln!(f, "Labels:")?;
        for (name, count) in &self.labels {
            writeln!(f, "    {name}: {} states", LargeFormatter(*count))?;
        }
        write!(f, "Reward models: {}", self.reward_models.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_utilities::random_test;

    use crate::random_dtmc;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_model_merge_disjoint() {
        random_test(100, |rng| {
            let left = random_dtmc::<f64>(rng, 10, 3, 3);
            let right = random_dtmc::<f64>(rng, 5, 2, 3);

            let (merged, offset) = left.merge_disjoint(&right);
            assert_eq!(offset, left.num_of_states());
            assert_eq!(merged.num_of_states(), left.num_of_states() + right.num_of_states());
            assert_eq!(merged.num_of_transitions(), left.num_of_transitions() + right.num_of_transitions());
            assert_eq!(
                merged.initial_states().len(),
                left.initial_states().len() + right.initial_states().len()
            );
            merged.validate(1e-6).unwrap();

            for state_index in right.iter_states() {
                let merged_state = StateIndex::new(*state_index + offset);
                for (transition, merged_transition) in right
                    .outgoing_transitions(state_index)
                    .zip(merged.outgoing_transitions(merged_state))
                {
                    assert_eq!(*transition.to + offset, *merged_transition.to);
                    assert_eq!(transition.value, merged_transition.value);
                }

                for label in right.labeling().labels_of_state(state_index) {
                    assert!(merged.labeling().has_label(merged_state, label));
                }
            }
        })
    }
}
