//! The numeric backend of the model builder, the bisimulation minimisation and
//! the checker. Everything is written against the [Value] trait, which is
//! implemented by `f64` for ordinary models and by [RationalFunction] for
//! parametric models. Rational functions are kept in a canonical form, so that
//! structural equality coincides with mathematical equality.

#![forbid(unsafe_code)]

mod error;
mod gcd;
mod monomial;
mod parameter;
mod polynomial;
mod rational;
mod rational_function;
mod value;
mod value_cache;

pub use error::*;
pub use gcd::*;
pub use monomial::*;
pub use parameter::*;
pub use polynomial::*;
pub use rational::*;
pub use rational_function::*;
pub use value::*;
pub use value_cache::*;
