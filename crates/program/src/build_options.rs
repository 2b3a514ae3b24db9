use std::collections::BTreeMap;
use std::collections::BTreeSet;

use pmc_model::formula::Property;

use crate::Scalar;

/// Determines which parts of a program are built into the model.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Values for constants of the program, these take precedence over the definitions in the program.
    pub constants: BTreeMap<String, Scalar>,

    /// The labels to build, all labels of the program when `None`.
    pub labels: Option<BTreeSet<String>>,

    /// The reward structures to build, all reward structures of the program when `None`.
    pub reward_structures: Option<BTreeSet<String>>,

    /// Adds a self-loop to states without enabled commands, instead of failing.
    pub fix_deadlocks: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            constants: BTreeMap::new(),
            labels: None,
            reward_structures: None,
            fix_deadlocks: true,
        }
    }
}

impl BuildOptions {
    /// Builds only the labels and reward structures that the properties refer
    /// to. A reward property without a name requires all reward structures.
    pub fn from_properties(properties: &[Property]) -> BuildOptions {
        let labels = properties.iter().flat_map(Property::atomic_labels).collect();

        let unnamed_reward = properties.iter().any(|property| {
            matches!(
                property,
                Property::Reward {
                    reward_model: None,
                    ..
                }
            )
        });
        let reward_structures =
            (!unnamed_reward).then(|| properties.iter().flat_map(Property::reward_models).collect());

        BuildOptions {
            labels: Some(labels),
            reward_structures,
            ..BuildOptions::default()
        }
    }

    /// Sets the value of a constant.
    pub fn with_constant(mut self, name: &str, value: impl Into<Scalar>) -> BuildOptions {
        self.constants.insert(name.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_model::formula::StateFormula;

    #[test]
    fn test_build_options_from_properties() {
        let properties = [
            Property::eventually(StateFormula::label("goal").or(StateFormula::label("bad"))),
            Property::reward("time", StateFormula::label("goal")),
        ];

        let options = BuildOptions::from_properties(&properties);
        assert_eq!(
            options.labels,
            Some(BTreeSet::from(["bad".to_string(), "goal".to_string()]))
        );
        assert_eq!(options.reward_structures, Some(BTreeSet::from(["time".to_string()])));
        assert!(options.fix_deadlocks);

        let unnamed = [Property::Reward {
            reward_model: None,
            target: StateFormula::label("goal"),
        }];
        assert_eq!(BuildOptions::from_properties(&unnamed).reward_structures, None);
    }
}
