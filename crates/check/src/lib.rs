//! A small probabilistic model checker for discrete-time Markov chains, that
//! computes reachability probabilities and expected rewards for every state.
//! It is generic over the [pmc_number::Value] representation, so the same
//! algorithms compute numbers for ordinary models and rational functions for
//! parametric models.

#![forbid(unsafe_code)]

mod check_result;
mod elimination;
mod error;
mod model_checking;
mod precomputation;

pub use check_result::*;
pub use elimination::*;
pub use error::*;
pub use model_checking::*;
pub use precomputation::*;
