//! Construction of explicit models from probabilistic programs, in the style
//! of the PRISM language: modules with bounded variables and guarded
//! commands, labels and reward structures. The reachable state space is
//! explored breadth first into a [pmc_model::Model], either with numeric
//! probabilities or with rational functions over the undefined constants.

#![forbid(unsafe_code)]

mod build_options;
pub mod case_studies;
mod constants;
mod error;
mod explore;
mod expression;
mod program;
mod variables;

pub use build_options::*;
pub use error::*;
pub use explore::*;
pub use expression::*;
pub use program::*;
