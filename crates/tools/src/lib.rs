//! Command line flags that are shared by the pmc tools.

#![forbid(unsafe_code)]

pub mod verbosity;
pub mod version;

pub use verbosity::*;
pub use version::*;
