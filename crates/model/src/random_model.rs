#![forbid(unsafe_code)]

use rand::Rng;

use pmc_number::Parameter;
use pmc_number::RationalFunction;
use pmc_number::Value;

use crate::Model;
use crate::ModelBuilder;
use crate::ModelType;
use crate::StateIndex;

/// The name of the reward model of the random models.
pub const RANDOM_REWARD_MODEL: &str = "steps";

/// Generates a random DTMC with the desired number of states, labels and out
/// degree. Every state has at least one successor, the probabilities are
/// fractions of small integer weights. The labels are `a`, `b`, ... and every
/// state carries every label with probability one half. Additionally the
/// model has a reward model with small integer state rewards.
pub fn random_dtmc<V: Value>(
    rng: &mut impl Rng,
    num_of_states: usize,
    num_of_labels: u32,
    outdegree: usize,
) -> Model<V> {
    let mut builder = random_builder(rng, num_of_states, num_of_labels);

    for state_index in StateIndex::range(num_of_states) {
        add_random_distribution(rng, &mut builder, state_index, num_of_states, outdegree);
    }

    builder
        .finish(ModelType::Dtmc)
        .expect("The random model has an initial state")
}

/// Same as [random_dtmc], but roughly half of the states choose between two
/// successors with probabilities `p` and `1 - p` for a random parameter `p`.
pub fn random_parametric_dtmc(
    rng: &mut impl Rng,
    num_of_states: usize,
    num_of_labels: u32,
    outdegree: usize,
    parameters: &[Parameter],
) -> Model<RationalFunction> {
    assert!(!parameters.is_empty(), "At least one parameter is required");
    let mut builder = random_builder(rng, num_of_states, num_of_labels);

    for state_index in StateIndex::range(num_of_states) {
        if rng.random_bool(0.5) {
            let parameter = RationalFunction::parameter(parameters[rng.random_range(0..parameters.len())].clone());
            let complement = &RationalFunction::one() - &parameter;

            builder.add_transition(
                state_index,
                StateIndex::new(rng.random_range(0..num_of_states)),
                parameter,
            );
            builder.add_transition(
                state_index,
                StateIndex::new(rng.random_range(0..num_of_states)),
                complement,
            );
        } else {
            add_random_distribution(rng, &mut builder, state_index, num_of_states, outdegree);
        }
    }

    builder
        .finish(ModelType::Dtmc)
        .expect("The random model has an initial state")
}

/// Creates a builder with the initial state, the labels and the rewards of a random model.
fn random_builder<V: Value>(rng: &mut impl Rng, num_of_states: usize, num_of_labels: u32) -> ModelBuilder<V> {
    assert!(num_of_states > 0, "A model needs at least one state");
    assert!(
        num_of_labels <= 26,
        "Too many labels requested, we only support alphabetic labels."
    );

    let mut builder = ModelBuilder::with_capacity(num_of_states);
    builder.add_initial_state(StateIndex::new(0));
    builder.require_num_of_states(num_of_states);
    builder.add_reward_model(RANDOM_REWARD_MODEL);

    let labels: Vec<String> = (0..num_of_labels)
        .map(|i| char::from(b'a' + i as u8).to_string())
        .collect();
    for label in &labels {
        builder.add_label(label);
    }

    for state_index in StateIndex::range(num_of_states) {
        for label in &labels {
            if rng.random_bool(0.5) {
                builder.add_state_label(state_index, label);
            }
        }

        builder.add_state_reward(
            RANDOM_REWARD_MODEL,
            state_index,
            V::from_integer(rng.random_range(0..3)),
        );
    }

    builder
}

/// Adds between one and `outdegree` successors with random integer weights.
fn add_random_distribution<V: Value>(
    rng: &mut impl Rng,
    builder: &mut ModelBuilder<V>,
    state_index: StateIndex,
    num_of_states: usize,
    outdegree: usize,
) {
    let successors: Vec<(StateIndex, i64)> = (0..rng.random_range(1..=outdegree.max(1)))
        .map(|_| {
            (
                StateIndex::new(rng.random_range(0..num_of_states)),
                rng.random_range(1..4),
            )
        })
        .collect();

    let total = V::from_integer(successors.iter().map(|(_, weight)| weight).sum());
    for (to, weight) in successors {
        builder.add_transition(state_index, to, V::from_integer(weight).div(&total));
    }
}
