//! Explicit probabilistic models: the compressed [Model] representation of a
//! DTMC with its [StateLabeling] and [RewardModel]s, the [ModelBuilder] to
//! construct them, the property syntax of [formula], and the explicit text
//! formats.

#![forbid(unsafe_code)]

mod error;
pub mod formula;
mod incoming_transitions;
mod instantiate;
mod io_explicit;
mod labeling;
mod model;
mod model_builder;
mod random_model;
mod reward_model;

pub use error::*;
pub use incoming_transitions::*;
pub use instantiate::*;
pub use io_explicit::*;
pub use labeling::*;
pub use model::*;
pub use model_builder::*;
pub use random_model::*;
pub use reward_model::*;
