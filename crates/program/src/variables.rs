use itertools::Itertools;
use rustc_hash::FxHashMap;

use pmc_number::Value;

use crate::BuildError;
use crate::Program;
use crate::Scalar;
use crate::VariableType;
use crate::constants::Constants;
use crate::expression::Environment;

/// A variable of the program with its evaluated range, booleans have the range `[0..1]`.
#[derive(Clone, Debug)]
pub(crate) struct VariableInfo {
    name: String,
    lower: i64,
    upper: i64,
    is_bool: bool,
    initial: i64,
}

/// The variables of all modules, a state is a valuation that stores the
/// value of every variable at its position in this table.
#[derive(Clone, Debug, Default)]
pub(crate) struct VariableTable {
    variables: Vec<VariableInfo>,
    positions: FxHashMap<String, usize>,
}

impl VariableTable {
    /// Evaluates the ranges and initial values of the variables of all modules.
    pub fn new<V: Value>(program: &Program, constants: &Constants<V>) -> Result<VariableTable, BuildError> {
        let empty = VariableTable::default();
        let env = Environment {
            constants,
            variables: &empty,
            state: &[],
        };

        let mut table = VariableTable::default();
        for declaration in program.modules().iter().flat_map(|module| module.variables()) {
            let name = declaration.name();
            let (lower, upper, is_bool) = match declaration.variable_type() {
                VariableType::Bool => (0, 1, true),
                VariableType::Int { lower, upper } => (lower.evaluate_int(&env)?, upper.evaluate_int(&env)?, false),
            };

            if lower > upper {
                return Err(BuildError::MalformedModel(format!(
                    "the range [{lower}..{upper}] of variable {name} is empty"
                )));
            }

            let position = table.variables.len();
            if table.positions.insert(name.to_string(), position).is_some() {
                return Err(BuildError::MalformedModel(format!("variable {name} is declared twice")));
            }

            table.variables.push(VariableInfo {
                name: name.to_string(),
                lower,
                upper,
                is_bool,
                initial: lower,
            });

            if let Some(initial) = declaration.initial() {
                table.variables[position].initial = table.convert(position, initial.evaluate(&env)?)?;
            }
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns the position of the variable with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Returns the value of the variable at the given position as a scalar.
    pub fn scalar(&self, position: usize, value: i64) -> Scalar {
        if self.variables[position].is_bool {
            Scalar::Bool(value != 0)
        } else {
            Scalar::Int(value)
        }
    }

    /// Converts the value assigned to the variable at the given position, which must fit its type and range.
    pub fn convert(&self, position: usize, value: Scalar) -> Result<i64, BuildError> {
        let variable = &self.variables[position];
        match (variable.is_bool, value) {
            (true, Scalar::Bool(value)) => Ok(i64::from(value)),
            (false, Scalar::Int(value)) => {
                if value < variable.lower || value > variable.upper {
                    Err(BuildError::VariableOutOfBounds {
                        variable: variable.name.clone(),
                        value,
                        lower: variable.lower,
                        upper: variable.upper,
                    })
                } else {
                    Ok(value)
                }
            }
            (_, value) => Err(BuildError::InvalidExpression {
                expression: value.to_string(),
                reason: format!("cannot be assigned to variable {}", variable.name),
            }),
        }
    }

    /// The valuation that assigns every variable its initial value.
    pub fn initial_valuation(&self) -> Vec<i64> {
        self.variables.iter().map(|variable| variable.initial).collect()
    }

    /// All valuations within the ranges of the variables, in lexicographical order.
    pub fn all_valuations(&self) -> Vec<Vec<i64>> {
        if self.variables.is_empty() {
            return vec![Vec::new()];
        }

        self.variables
            .iter()
            .map(|variable| variable.lower..=variable.upper)
            .multi_cartesian_product()
            .collect()
    }

    /// Formats a valuation as `(x=1, b=true)`.
    pub fn format(&self, state: &[i64]) -> String {
        format!(
            "({})",
            self.variables
                .iter()
                .enumerate()
                .format_with(", ", |(position, variable), f| f(&format_args!(
                    "{}={}",
                    variable.name,
                    self.scalar(position, state[position])
                )))
        )
    }
}
