#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;
use rustc_hash::FxHashMap;

use pmc_number::Value;

use crate::Model;
use crate::ModelError;
use crate::ModelType;
use crate::RewardModel;
use crate::StateIndex;
use crate::StateLabeling;

/// Collects the transitions, labels and rewards of a model in arbitrary order
/// and constructs the compressed [Model] from them.
///
/// Transitions between the same pair of states are summed and transitions with
/// value zero are removed when finishing.
pub struct ModelBuilder<V> {
    transitions: Vec<(StateIndex, StateIndex, V)>,
    initial_states: Vec<StateIndex>,

    /// The states of every label, in the order in which the labels were added.
    labels: Vec<(String, Vec<StateIndex>)>,
    labels_index: FxHashMap<String, usize>,

    /// The (non-zero) state rewards of every reward model.
    reward_models: Vec<(String, Vec<(StateIndex, V)>)>,

    /// The number of states (derived from the transitions).
    num_of_states: usize,
}

impl<V: Value> ModelBuilder<V> {
    /// Initializes a new empty builder.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Initializes the builder with pre-allocated capacity for the transitions.
    pub fn with_capacity(num_of_transitions: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(num_of_transitions),
            initial_states: Vec::new(),
            labels: Vec::new(),
            labels_index: FxHashMap::default(),
            reward_models: Vec::new(),
            num_of_states: 0,
        }
    }

    /// Adds a transition to the builder.
    pub fn add_transition(&mut self, from: StateIndex, to: StateIndex, value: V) {
        self.transitions.push((from, to, value));
        self.require_num_of_states(from.value().max(to.value()) + 1);
    }

    pub fn add_initial_state(&mut self, state_index: StateIndex) {
        self.initial_states.push(state_index);
        self.require_num_of_states(state_index.value() + 1);
    }

    /// Declares a label, such that it is present even when no state carries it.
    pub fn add_label(&mut self, name: &str) {
        self.label_position(name);
    }

    /// Adds the given label to the given state.
    pub fn add_state_label(&mut self, state_index: StateIndex, name: &str) {
        let index = self.label_position(name);
        self.labels[index].1.push(state_index);
        self.require_num_of_states(state_index.value() + 1);
    }

    /// Declares a reward model, states without an explicit reward obtain reward zero.
    pub fn add_reward_model(&mut self, name: &str) {
        self.reward_model_position(name);
    }

    /// Sets the reward of a state in the given reward model.
    pub fn add_state_reward(&mut self, name: &str, state_index: StateIndex, value: V) {
        let index = self.reward_model_position(name);
        self.reward_models[index].1.push((state_index, value));
        self.require_num_of_states(state_index.value() + 1);
    }

    /// Returns the number of transitions added to the builder.
    pub fn num_of_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Returns the number of states that the builder currently found.
    pub fn num_of_states(&self) -> usize {
        self.num_of_states
    }

    /// Sets the number of states to at least the given number. All states without transitions
    /// will simply become deadlock states.
    pub fn require_num_of_states(&mut self, num_states: usize) {
        if num_states > self.num_of_states {
            self.num_of_states = num_states;
        }
    }

    /// Finalizes the builder and returns the constructed model.
    pub fn finish(mut self, model_type: ModelType) -> Result<Model<V>, ModelError> {
        if self.initial_states.is_empty() {
            return Err(ModelError::NoInitialStates);
        }

        self.initial_states.sort_unstable();
        self.initial_states.dedup();

        // Group the transitions by source and target, the values are summed in canonical order.
        self.transitions
            .sort_by(|(from, to, left), (other_from, other_to, right)| {
                (from, to)
                    .cmp(&(other_from, other_to))
                    .then_with(|| left.canonical_cmp(right))
            });

        let mut states = Vec::with_capacity(self.num_of_states + 1);
        let mut transition_to = Vec::with_capacity(self.transitions.len());
        let mut transition_values = Vec::with_capacity(self.transitions.len());
        for ((from, to), group) in &self.transitions.into_iter().chunk_by(|(from, to, _)| (*from, *to)) {
            let value = group.fold(V::zero(), |acc, (_, _, value)| acc.add(&value));
            if value.is_zero() {
                continue;
            }

            // Start the states up to and including the source state.
            while states.len() <= from.value() {
                states.push(transition_to.len());
            }

            transition_to.push(to);
            transition_values.push(value);
        }

        // The remaining states and the sentinel.
        while states.len() <= self.num_of_states {
            states.push(transition_to.len());
        }

        let mut labeling = StateLabeling::new(self.num_of_states);
        for (name, label_states) in &self.labels {
            let mut set = crate::empty_state_set(self.num_of_states);
            for state_index in label_states {
                set.set(state_index.value(), true);
            }

            labeling.add_label(name, set);
        }

        let reward_models = self
            .reward_models
            .into_iter()
            .map(|(name, rewards)| {
                let mut state_rewards = vec![V::zero(); self.num_of_states];
                for (state_index, value) in rewards {
                    state_rewards[state_index] = value;
                }

                RewardModel::new(name, state_rewards)
            })
            .collect();

        Ok(Model::from_parts(
            model_type,
            states,
            transition_to,
            transition_values,
            self.initial_states,
            labeling,
            reward_models,
        ))
    }

    fn label_position(&mut self, name: &str) -> usize {
        if let Some(index) = self.labels_index.get(name) {
            return *index;
        }

        self.labels.push((name.to_string(), Vec::new()));
        self.labels_index.insert(name.to_string(), self.labels.len() - 1);
        self.labels.len() - 1
    }

    fn reward_model_position(&mut self, name: &str) -> usize {
        if let Some(index) = self.reward_models.iter().position(|(existing, _)| existing == name) {
            return index;
        }

        self.reward_models.push((name.to_string(), Vec::new()));
        self.reward_models.len() - 1
    }
}

impl<V: Value> Default for ModelBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Value> fmt::Debug for ModelBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transitions:")?;
        for (from, to, value) in &self.transitions {
            writeln!(f, "    {from} --[{value}]-> {to}")?;
        }
        Ok(())
    }
}
