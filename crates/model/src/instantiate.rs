use pmc_number::NumberError;
use pmc_number::ParameterValuation;
use pmc_number::RationalFunction;
use pmc_number::Value;

use crate::Model;
use crate::ModelBuilder;

/// Instantiates a parametric model with the given parameter values, which
/// results in an ordinary model with the same states, labels and reward models.
/// Transitions whose probability becomes zero are removed.
pub fn instantiate(model: &Model<RationalFunction>, valuation: &ParameterValuation) -> Result<Model<f64>, NumberError> {
    let mut builder = ModelBuilder::with_capacity(model.num_of_transitions());
    builder.require_num_of_states(model.num_of_states());

    for state_index in model.iter_states() {
        for transition in model.outgoing_transitions(state_index) {
            let value = transition.value.evaluate(valuation)?;
            builder.add_transition(state_index, transition.to, f64::from_rational(&value));
        }
    }

    for state_index in model.initial_states() {
        builder.add_initial_state(*state_index);
    }

    for name in model.labeling().label_names() {
        builder.add_label(name);
        for state_index in model.iter_states() {
            if model.labeling().has_label(state_index, name) {
                builder.add_state_label(state_index, name);
            }
        }
    }

    for reward_model in model.reward_models() {
        builder.add_reward_model(reward_model.name());
        for state_index in model.iter_states() {
            let value = reward_model.state_reward(state_index).evaluate(valuation)?;
            builder.add_state_reward(reward_model.name(), state_index, f64::from_rational(&value));
        }
    }

    Ok(builder
        .finish(model.model_type())
        .expect("The initial states are copied from a valid model"))
}
