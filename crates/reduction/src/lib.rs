//! Minimisation of discrete-time Markov chains modulo strong (probabilistic)
//! bisimulation. The coarsest bisimulation is computed by signature refinement
//! of the partition induced by the preserved labels and rewards, after which
//! the quotient model is assembled with one state per block.

#![forbid(unsafe_code)]

mod block_partition;
mod compare;
mod error;
mod indexed_partition;
mod label_partition;
mod quotient;
mod reduce;
mod signature_refinement;
mod signatures;

pub use block_partition::*;
pub use compare::*;
pub use error::*;
pub use indexed_partition::*;
pub use label_partition::*;
pub use quotient::*;
pub use reduce::*;
pub use signature_refinement::*;
pub use signatures::*;
