use thiserror::Error;

use pmc_model::ModelError;
use pmc_model::StateIndex;

use crate::BisimulationType;

#[derive(Error, Debug)]
pub enum ReductionError {
    #[error("{0} bisimulation is not supported, only strong bisimulation is implemented")]
    UnsupportedBisimulationType(BisimulationType),

    #[error("Inconsistent block: state {state} and state {representative} of quotient state {block} differ on {reason}")]
    InconsistentBlock {
        block: StateIndex,
        state: StateIndex,
        representative: StateIndex,
        reason: String,
    },

    #[error("Cannot preserve unknown label \"{0}\"")]
    UnknownLabel(String),

    #[error("Cannot preserve unknown reward model \"{0}\"")]
    UnknownRewardModel(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
