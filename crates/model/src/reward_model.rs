use pmc_number::Value;

use crate::StateIndex;

/// A named reward structure that assigns a reward to every state.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardModel<V> {
    name: String,
    state_rewards: Vec<V>,
}

impl<V: Value> RewardModel<V> {
    pub fn new(name: String, state_rewards: Vec<V>) -> RewardModel<V> {
        RewardModel { name, state_rewards }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_reward(&self, state_index: StateIndex) -> &V {
        &self.state_rewards[state_index]
    }

    pub fn state_rewards(&self) -> &[V] {
        &self.state_rewards
    }
}
