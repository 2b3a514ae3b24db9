//! Abstract syntax for the reachability properties of a DTMC, in the style of
//! the PRISM property language: `P=? [F "goal"]`, `R{"time"}=? [F "done"]`.

use std::collections::BTreeSet;
use std::fmt;

use crate::ModelError;
use crate::StateLabeling;
use crate::StateSet;
use crate::empty_state_set;

/// A formula over the labels of a single state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StateFormula {
    True,
    False,
    Label(String),
    Not(Box<StateFormula>),
    And(Box<StateFormula>, Box<StateFormula>),
    Or(Box<StateFormula>, Box<StateFormula>),
}

/// A formula over the paths of the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathFormula {
    /// `X φ`
    Next(StateFormula),
    /// `φ U ψ`
    Until(StateFormula, StateFormula),
    /// `φ U<=k ψ`
    BoundedUntil(StateFormula, StateFormula, usize),
    /// `F ψ`
    Eventually(StateFormula),
    /// `G φ`
    Globally(StateFormula),
}

/// A quantitative query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// `P=? [path]`
    Probability(PathFormula),
    /// `R{"name"}=? [F target]`, when no name is given the model must have exactly one reward model.
    Reward {
        reward_model: Option<String>,
        target: StateFormula,
    },
}

impl StateFormula {
    pub fn label(name: &str) -> StateFormula {
        StateFormula::Label(name.to_string())
    }

    pub fn not(self) -> StateFormula {
        StateFormula::Not(Box::new(self))
    }

    pub fn and(self, other: StateFormula) -> StateFormula {
        StateFormula::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: StateFormula) -> StateFormula {
        StateFormula::Or(Box::new(self), Box::new(other))
    }

    /// Adds the labels occurring in the formula to the given set.
    fn collect_labels(&self, labels: &mut BTreeSet<String>) {
        match self {
            StateFormula::True | StateFormula::False => {}
            StateFormula::Label(name) => {
                labels.insert(name.clone());
            }
            StateFormula::Not(formula) => formula.collect_labels(labels),
            StateFormula::And(left, right) | StateFormula::Or(left, right) => {
                left.collect_labels(labels);
                right.collect_labels(labels);
            }
        }
    }

    /// Computes the set of states satisfying the formula.
    pub fn evaluate(&self, labeling: &StateLabeling) -> Result<StateSet, ModelError> {
        let num_of_states = labeling.num_of_states();
        match self {
            StateFormula::True => {
                let mut result = empty_state_set(num_of_states);
                result.fill(true);
                Ok(result)
            }
            StateFormula::False => Ok(empty_state_set(num_of_states)),
            StateFormula::Label(name) => labeling
                .states_with_label(name)
                .cloned()
                .ok_or_else(|| ModelError::UnknownLabel(name.clone())),
            StateFormula::Not(formula) => Ok(!formula.evaluate(labeling)?),
            StateFormula::And(left, right) => Ok(left.evaluate(labeling)? & right.evaluate(labeling)?),
            StateFormula::Or(left, right) => Ok(left.evaluate(labeling)? | right.evaluate(labeling)?),
        }
    }
}

impl PathFormula {
    fn collect_labels(&self, labels: &mut BTreeSet<String>) {
        match self {
            PathFormula::Next(formula) | PathFormula::Eventually(formula) | PathFormula::Globally(formula) => {
                formula.collect_labels(labels)
            }
            PathFormula::Until(left, right) | PathFormula::BoundedUntil(left, right, _) => {
                left.collect_labels(labels);
                right.collect_labels(labels);
            }
        }
    }
}

impl Property {
    /// Returns `P=? [F target]`.
    pub fn eventually(target: StateFormula) -> Property {
        Property::Probability(PathFormula::Eventually(target))
    }

    /// Returns `R{"name"}=? [F target]`.
    pub fn reward(reward_model: &str, target: StateFormula) -> Property {
        Property::Reward {
            reward_model: Some(reward_model.to_string()),
            target,
        }
    }

    /// Returns the labels that the property refers to.
    pub fn atomic_labels(&self) -> BTreeSet<String> {
        let mut labels = BTreeSet::new();
        match self {
            Property::Probability(path) => path.collect_labels(&mut labels),
            Property::Reward { target, .. } => target.collect_labels(&mut labels),
        }

        labels
    }

    /// Returns the reward models that the property refers to by name.
    pub fn reward_models(&self) -> BTreeSet<String> {
        match self {
            Property::Reward {
                reward_model: Some(name),
                ..
            } => BTreeSet::from([name.clone()]),
            _ => BTreeSet::new(),
        }
    }
}

impl fmt::Display for StateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFormula::True => write!(f, "true"),
            StateFormula::False => write!(f, "false"),
            StateFormula::Label(name) => write!(f, "\"{name}\""),
            StateFormula::Not(formula) => write!(f, "!({formula})"),
            StateFormula::And(left, right) => write!(f, "({left} & {right})"),
            StateFormula::Or(left, right) => write!(f, "({left} | {right})"),
        }
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFormula::Next(formula) => write!(f, "X {formula}"),
            PathFormula::Until(left, right) => write!(f, "{left} U {right}"),
            PathFormula::BoundedUntil(left, right, bound) => write!(f, "{left} U<={bound} {right}"),
            PathFormula::Eventually(formula) => write!(f, "F {formula}"),
            PathFormula::Globally(formula) => write!(f, "G {formula}"),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Probability(path) => write!(f, "P=? [{path}]"),
            Property::Reward {
                reward_model: Some(name),
                target,
            } => write!(f, "R{{\"{name}\"}}=? [F {target}]"),
            Property::Reward {
                reward_model: None,
                target,
            } => write!(f, "R=? [F {target}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::StateIndex;

    #[test]
    fn test_property_atomic_labels() {
        let property = Property::Probability(PathFormula::Until(
            StateFormula::label("safe").and(StateFormula::label("alive").not()),
            StateFormula::label("goal"),
        ));

        assert_eq!(
            property.atomic_labels().into_iter().collect::<Vec<_>>(),
            vec!["alive", "goal", "safe"]
        );
        assert!(property.reward_models().is_empty());
        assert_eq!(property.to_string(), "P=? [(\"safe\" & !(\"alive\")) U \"goal\"]");

        let reward = Property::reward("time", StateFormula::label("done"));
        assert_eq!(reward.reward_models(), BTreeSet::from(["time".to_string()]));
        assert_eq!(reward.to_string(), "R{\"time\"}=? [F \"done\"]");
    }

    #[test]
    fn test_state_formula_evaluate() {
        let mut labeling = StateLabeling::new(3);
        labeling.add_label_to_state("a", StateIndex::new(0));
        labeling.add_label_to_state("a", StateIndex::new(1));
        labeling.add_label_to_state("b", StateIndex::new(1));

        let formula = StateFormula::label("a").and(StateFormula::label("b").not());
        let states = formula.evaluate(&labeling).unwrap();
        assert_eq!(states.iter_ones().collect::<Vec<_>>(), vec![0]);

        let states = StateFormula::True.evaluate(&labeling).unwrap();
        assert_eq!(states.count_ones(), 3);
        assert!(StateFormula::label("c").evaluate(&labeling).is_err());
    }
}
