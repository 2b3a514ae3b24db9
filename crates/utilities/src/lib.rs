//! Internal utilities shared by all the PMC crates: strongly typed indices, a
//! catch-all error type, timing of the individual phases of a tool and helpers
//! for (randomised) tests.

#![forbid(unsafe_code)]

mod error;
mod random_test;
mod tagged_index;
mod test_logger;
mod timing;

pub use error::*;
pub use random_test::*;
pub use tagged_index::*;
pub use test_logger::*;
pub use timing::*;
