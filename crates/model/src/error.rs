use thiserror::Error;

use crate::StateIndex;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Malformed model: the outgoing probabilities of state {state} sum to {sum} instead of one")]
    MalformedDistribution { state: StateIndex, sum: String },

    #[error("Malformed model: there are no initial states")]
    NoInitialStates,

    #[error("Unknown label \"{0}\"")]
    UnknownLabel(String),

    #[error("Unknown reward model \"{0}\"")]
    UnknownRewardModel(String),
}
