use log::debug;
use log::info;

use pmc_model::IncomingTransitions;
use pmc_model::Model;
use pmc_model::ModelError;
use pmc_model::StateIndex;
use pmc_model::StateSet;
use pmc_model::empty_state_set;
use pmc_model::formula::PathFormula;
use pmc_model::formula::Property;
use pmc_number::Value;

use crate::CheckError;
use crate::CheckResult;
use crate::prob0;
use crate::prob1;
use crate::state_elimination;

/// Computes the value of the property for every state of the model.
pub fn model_checking<V: Value>(model: &Model<V>, property: &Property) -> Result<CheckResult<V>, CheckError> {
    info!("Checking {property}...");
    let labeling = model.labeling();

    match property {
        Property::Probability(path) => match path {
            PathFormula::Next(phi) => Ok(next_probabilities(model, &phi.evaluate(labeling)?)),
            PathFormula::Until(phi, psi) => Ok(until_probabilities(
                model,
                &phi.evaluate(labeling)?,
                &psi.evaluate(labeling)?,
            )),
            PathFormula::BoundedUntil(phi, psi, bound) => Ok(bounded_until_probabilities(
                model,
                &phi.evaluate(labeling)?,
                &psi.evaluate(labeling)?,
                *bound,
            )),
            PathFormula::Eventually(psi) => Ok(until_probabilities(
                model,
                &all_states(model),
                &psi.evaluate(labeling)?,
            )),
            PathFormula::Globally(phi) => {
                // G phi holds iff F !phi does not.
                let violated = until_probabilities(model, &all_states(model), &!phi.evaluate(labeling)?);
                Ok(CheckResult::new(
                    violated.values().iter().map(|value| V::one().sub(value)).collect(),
                ))
            }
        },
        Property::Reward { reward_model, target } => {
            let reward_model = match reward_model {
                Some(name) => model
                    .reward_model(name)
                    .ok_or_else(|| ModelError::UnknownRewardModel(name.clone()))?,
                None => match model.reward_models() {
                    [reward_model] => reward_model,
                    reward_models => return Err(CheckError::AmbiguousRewardModel(reward_models.len())),
                },
            };

            reachability_rewards(model, reward_model.state_rewards(), &target.evaluate(labeling)?)
        }
    }
}

/// Returns the probability of moving to a `phi` state in one step.
pub fn next_probabilities<V: Value>(model: &Model<V>, phi: &StateSet) -> CheckResult<V> {
    CheckResult::new(
        model
            .iter_states()
            .map(|state_index| {
                V::sum_canonical(
                    model
                        .outgoing_transitions(state_index)
                        .filter(|transition| phi[*transition.to])
                        .map(|transition| transition.value.clone())
                        .collect(),
                )
            })
            .collect(),
    )
}

/// Returns the probability of reaching a `psi` state while only visiting `phi` states before.
pub fn until_probabilities<V: Value>(model: &Model<V>, phi: &StateSet, psi: &StateSet) -> CheckResult<V> {
    let incoming = IncomingTransitions::new(model);
    let no = prob0(&incoming, phi, psi);
    let yes = prob1(&incoming, phi, psi, &no);

    let maybe: Vec<StateIndex> = model
        .iter_states()
        .filter(|state_index| !no[**state_index] && !yes[**state_index])
        .collect();
    debug!("Solving the probabilities of {} states", maybe.len());

    let solution = solve_maybe_states(model, &maybe, |state_index| {
        V::sum_canonical(
            model
                .outgoing_transitions(state_index)
                .filter(|transition| yes[*transition.to])
                .map(|transition| transition.value.clone())
                .collect(),
        )
    });

    let mut values: Vec<V> = model
        .iter_states()
        .map(|state_index| if yes[*state_index] { V::one() } else { V::zero() })
        .collect();
    for (state_index, value) in maybe.iter().zip(solution) {
        values[*state_index] = value;
    }

    CheckResult::new(values)
}

/// Returns the probability of reaching a `psi` state within `bound` steps while only visiting `phi` states before.
pub fn bounded_until_probabilities<V: Value>(
    model: &Model<V>,
    phi: &StateSet,
    psi: &StateSet,
    bound: usize,
) -> CheckResult<V> {
    let mut values: Vec<V> = model
        .iter_states()
        .map(|state_index| if psi[*state_index] { V::one() } else { V::zero() })
        .collect();

    for _ in 0..bound {
        values = model
            .iter_states()
            .map(|state_index| {
                if psi[*state_index] {
                    V::one()
                } else if !phi[*state_index] {
                    V::zero()
                } else {
                    V::sum_canonical(
                        model
                            .outgoing_transitions(state_index)
                            .map(|transition| transition.value.mul(&values[transition.to]))
                            .collect(),
                    )
                }
            })
            .collect();
    }

    CheckResult::new(values)
}

/// Returns the expected reward accumulated before reaching a `target` state,
/// where every visited state that is not a target state earns its state
/// reward. The target states themselves earn nothing.
///
/// States that do not reach the target with probability one have an infinite
/// expected reward, for domains without infinity this results in
/// [CheckError::InfiniteReward].
pub fn reachability_rewards<V: Value>(
    model: &Model<V>,
    state_rewards: &[V],
    target: &StateSet,
) -> Result<CheckResult<V>, CheckError> {
    let incoming = IncomingTransitions::new(model);
    let all = all_states(model);
    let no = prob0(&incoming, &all, target);
    let yes = prob1(&incoming, &all, target, &no);

    let infinity = match model.iter_states().find(|state_index| !yes[**state_index]) {
        Some(state_index) => Some(V::infinity().ok_or(CheckError::InfiniteReward(state_index))?),
        None => None,
    };

    // The successors of these states all reach the target with probability one as well.
    let maybe: Vec<StateIndex> = model
        .iter_states()
        .filter(|state_index| yes[**state_index] && !target[**state_index])
        .collect();
    debug!("Solving the expected rewards of {} states", maybe.len());

    let solution = solve_maybe_states(model, &maybe, |state_index| state_rewards[state_index].clone());

    let mut values: Vec<V> = model
        .iter_states()
        .map(|state_index| match &infinity {
            Some(infinity) if !yes[*state_index] => infinity.clone(),
            _ => V::zero(),
        })
        .collect();
    for (state_index, value) in maybe.iter().zip(solution) {
        values[*state_index] = value;
    }

    Ok(CheckResult::new(values))
}

/// Solves `x_s = constant(s) + sum_t P(s, t) x_t` for the given states, where
/// transitions to other states are left out.
fn solve_maybe_states<V: Value>(
    model: &Model<V>,
    maybe: &[StateIndex],
    constant: impl Fn(StateIndex) -> V,
) -> Vec<V> {
    let mut variables: Vec<Option<usize>> = vec![None; model.num_of_states()];
    for (variable, state_index) in maybe.iter().enumerate() {
        variables[*state_index] = Some(variable);
    }

    let coefficients = maybe
        .iter()
        .map(|state_index| {
            model
                .outgoing_transitions(*state_index)
                .filter_map(|transition| variables[transition.to].map(|column| (column, transition.value.clone())))
                .collect()
        })
        .collect();
    let constants = maybe.iter().map(|state_index| constant(*state_index)).collect();

    state_elimination(coefficients, constants)
}

fn all_states<V: Value>(model: &Model<V>) -> StateSet {
    let mut result = empty_state_set(model.num_of_states());
    result.fill(true);
    result
}
