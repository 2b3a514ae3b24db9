use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use log::warn;
use num::BigInt;
use num::BigRational;
use rustc_hash::FxHashMap;

use pmc_number::Parameter;
use pmc_number::Value;

use crate::BuildError;
use crate::ConstantDeclaration;
use crate::ConstantType;
use crate::Program;
use crate::Scalar;
use crate::expression::Environment;
use crate::variables::VariableTable;

/// The value of a constant, which is symbolic for the undefined `double`
/// constants of a parametric model and the constants derived from them.
pub(crate) enum ConstantValue<V> {
    Scalar(Scalar),
    Symbolic(V),
}

pub(crate) type Constants<V> = FxHashMap<String, ConstantValue<V>>;

impl<V: Value> fmt::Display for ConstantValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Scalar(value) => write!(f, "{value}"),
            ConstantValue::Symbolic(value) => write!(f, "{value}"),
        }
    }
}

/// Determines the values of the constants of the program in order of
/// declaration. The given definitions take precedence over the program.
///
/// Undefined `double` constants become parameters when the value domain
/// supports them, any other undefined constant is an error.
pub(crate) fn resolve_constants<V: Value>(
    program: &Program,
    definitions: &BTreeMap<String, Scalar>,
) -> Result<Constants<V>, BuildError> {
    for name in definitions.keys() {
        if program.constant(name).is_none() {
            warn!("Ignoring the value given for {name}, which is not a constant of the program");
        }
    }

    let variables = VariableTable::default();
    let mut constants: Constants<V> = FxHashMap::default();

    for declaration in program.constants() {
        let name = declaration.name();
        let value = match (definitions.get(name), declaration.definition()) {
            (Some(value), _) => ConstantValue::Scalar(value.clone()),
            (None, Some(expression)) => {
                let env = Environment {
                    constants: &constants,
                    variables: &variables,
                    state: &[],
                };

                match expression.evaluate(&env) {
                    Ok(value) => ConstantValue::Scalar(value),
                    Err(BuildError::UndefinedConstant(_)) if declaration.constant_type() == ConstantType::Double => {
                        ConstantValue::Symbolic(expression.evaluate_value(&env)?)
                    }
                    Err(error) => return Err(error),
                }
            }
            (None, None) => match declaration.constant_type() {
                ConstantType::Double => ConstantValue::Symbolic(
                    V::parameter(&Parameter::new(name)).ok_or_else(|| BuildError::UndefinedConstant(name.to_string()))?,
                ),
                _ => return Err(BuildError::UndefinedConstant(name.to_string())),
            },
        };

        let value = coerce(declaration, value)?;
        debug!("Constant {name} = {value}");
        constants.insert(name.to_string(), value);
    }

    Ok(constants)
}

/// Checks that the value fits the declared type, integers are promoted for `double` constants.
fn coerce<V>(declaration: &ConstantDeclaration, value: ConstantValue<V>) -> Result<ConstantValue<V>, BuildError> {
    match (declaration.constant_type(), value) {
        (ConstantType::Bool, value @ ConstantValue::Scalar(Scalar::Bool(_))) => Ok(value),
        (ConstantType::Int, value @ ConstantValue::Scalar(Scalar::Int(_))) => Ok(value),
        (ConstantType::Double, ConstantValue::Scalar(Scalar::Int(value))) => Ok(ConstantValue::Scalar(
            Scalar::Rational(BigRational::from_integer(BigInt::from(value))),
        )),
        (ConstantType::Double, value @ ConstantValue::Scalar(Scalar::Rational(_))) => Ok(value),
        (ConstantType::Double, value @ ConstantValue::Symbolic(_)) => Ok(value),
        (constant_type, ConstantValue::Scalar(value)) => Err(BuildError::InvalidExpression {
            expression: value.to_string(),
            reason: format!("constant {} of type {constant_type} cannot have this value", declaration.name()),
        }),
        (_, ConstantValue::Symbolic(_)) => Err(BuildError::UndefinedConstant(declaration.name().to_string())),
    }
}
