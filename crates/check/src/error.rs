use thiserror::Error;

use pmc_model::ModelError;
use pmc_model::StateIndex;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("The property does not name a reward model, but the model has {0} reward models")]
    AmbiguousRewardModel(usize),

    #[error("The expected reward of state {0} is infinite, since it does not reach the target with probability one")]
    InfiniteReward(StateIndex),

    /// Unknown labels and reward models.
    #[error(transparent)]
    Model(#[from] ModelError),
}
