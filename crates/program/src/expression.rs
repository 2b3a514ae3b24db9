use std::cmp::Ordering;
use std::fmt;

use num::BigInt;
use num::BigRational;
use num::Zero;

use pmc_number::Value;
use pmc_number::rational;

use crate::BuildError;
use crate::constants::ConstantValue;
use crate::constants::Constants;
use crate::variables::VariableTable;

/// The value of an expression that does not depend on parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Rational(BigRational),
}

impl Scalar {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the numeric value, integers are promoted to rationals.
    pub fn as_rational(&self) -> Option<BigRational> {
        match self {
            Scalar::Bool(_) => None,
            Scalar::Int(value) => Some(BigRational::from_integer(BigInt::from(*value))),
            Scalar::Rational(value) => Some(value.clone()),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<BigRational> for Scalar {
    fn from(value: BigRational) -> Self {
        Scalar::Rational(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Rational(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
    Implies,
    Iff,
    Plus,
    Minus,
    Times,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Min,
    Max,
}

/// The expressions of guards, probabilities, assignments, labels and rewards.
///
/// Expressions are constructed with the operators of [std::ops] and the
/// methods below, for example `Expression::identifier("x").less(Expression::from(3))`
/// corresponds to `x < 3`. Division always results in a rational number, and
/// decimal literals are exact rationals.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Literal(Scalar),
    Identifier(String),
    Unary(UnaryOperator, Box<Expression>),
    Binary(BinaryOperator, Box<Expression>, Box<Expression>),
    IfThenElse(Box<Expression>, Box<Expression>, Box<Expression>),
}

impl Expression {
    /// A variable or a constant.
    pub fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    /// The rational literal `numerator/denominator`.
    pub fn fraction(numerator: i64, denominator: i64) -> Expression {
        Expression::Literal(Scalar::Rational(rational(numerator, denominator)))
    }

    /// `condition ? then : otherwise`
    pub fn if_then_else(condition: Expression, then: Expression, otherwise: Expression) -> Expression {
        Expression::IfThenElse(Box::new(condition), Box::new(then), Box::new(otherwise))
    }

    pub fn and(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::And, other)
    }

    pub fn or(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Or, other)
    }

    pub fn implies(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Implies, other)
    }

    pub fn iff(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Iff, other)
    }

    pub fn equals(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Equal, other)
    }

    pub fn not_equals(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::NotEqual, other)
    }

    pub fn less(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Less, other)
    }

    pub fn less_equal(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::LessEqual, other)
    }

    pub fn greater(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Greater, other)
    }

    pub fn greater_equal(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::GreaterEqual, other)
    }

    pub fn min(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Min, other)
    }

    pub fn max(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Max, other)
    }

    /// The conjunction of the given expressions, `true` when there are none.
    pub fn all(expressions: impl IntoIterator<Item = Expression>) -> Expression {
        expressions
            .into_iter()
            .reduce(Expression::and)
            .unwrap_or(Expression::from(true))
    }

    /// The disjunction of the given expressions, `false` when there are none.
    pub fn any(expressions: impl IntoIterator<Item = Expression>) -> Expression {
        expressions
            .into_iter()
            .reduce(Expression::or)
            .unwrap_or(Expression::from(false))
    }

    fn binary(self, operator: BinaryOperator, other: Expression) -> Expression {
        Expression::Binary(operator, Box::new(self), Box::new(other))
    }

    /// Evaluates the expression to a scalar, fails for identifiers that are parameters.
    pub(crate) fn evaluate<V: Value>(&self, env: &Environment<'_, V>) -> Result<Scalar, BuildError> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Identifier(name) => {
                if let Some(position) = env.variables.position(name) {
                    return Ok(env.variables.scalar(position, env.state[position]));
                }

                match env.constants.get(name) {
                    Some(ConstantValue::Scalar(value)) => Ok(value.clone()),
                    Some(ConstantValue::Symbolic(_)) => Err(BuildError::UndefinedConstant(name.clone())),
                    None => Err(self.invalid(format!("unknown identifier {name}"))),
                }
            }
            Expression::Unary(operator, operand) => match (operator, operand.evaluate(env)?) {
                (UnaryOperator::Not, Scalar::Bool(value)) => Ok(Scalar::Bool(!value)),
                (UnaryOperator::Minus, Scalar::Int(value)) => value
                    .checked_neg()
                    .map(Scalar::Int)
                    .ok_or_else(|| self.invalid("integer overflow")),
                (UnaryOperator::Minus, Scalar::Rational(value)) => Ok(Scalar::Rational(-value)),
                (_, value) => Err(self.invalid(format!("cannot apply {operator} to {value}"))),
            },
            Expression::Binary(operator, left, right) => self.evaluate_binary(*operator, left, right, env),
            Expression::IfThenElse(condition, then, otherwise) => {
                if condition.evaluate_bool(env)? {
                    then.evaluate(env)
                } else {
                    otherwise.evaluate(env)
                }
            }
        }
    }

    pub(crate) fn evaluate_bool<V: Value>(&self, env: &Environment<'_, V>) -> Result<bool, BuildError> {
        let value = self.evaluate(env)?;
        value
            .as_bool()
            .ok_or_else(|| self.invalid(format!("expected a boolean, found {value}")))
    }

    pub(crate) fn evaluate_int<V: Value>(&self, env: &Environment<'_, V>) -> Result<i64, BuildError> {
        let value = self.evaluate(env)?;
        value
            .as_int()
            .ok_or_else(|| self.invalid(format!("expected an integer, found {value}")))
    }

    /// Evaluates a numeric expression in the value domain, where the
    /// parameters stay symbolic. The conditions of if-then-else and the
    /// operands of the other operators must not depend on parameters.
    pub(crate) fn evaluate_value<V: Value>(&self, env: &Environment<'_, V>) -> Result<V, BuildError> {
        match self {
            Expression::Identifier(name) if env.variables.position(name).is_none() => match env.constants.get(name) {
                Some(ConstantValue::Symbolic(value)) => Ok(value.clone()),
                _ => self.scalar_to_value(&self.evaluate(env)?),
            },
            Expression::Unary(UnaryOperator::Minus, operand) => Ok(V::zero().sub(&operand.evaluate_value(env)?)),
            Expression::Binary(BinaryOperator::Plus, left, right) => {
                Ok(left.evaluate_value(env)?.add(&right.evaluate_value(env)?))
            }
            Expression::Binary(BinaryOperator::Minus, left, right) => {
                Ok(left.evaluate_value(env)?.sub(&right.evaluate_value(env)?))
            }
            Expression::Binary(BinaryOperator::Times, left, right) => {
                Ok(left.evaluate_value(env)?.mul(&right.evaluate_value(env)?))
            }
            Expression::Binary(BinaryOperator::Divide, left, right) => {
                let denominator: V = right.evaluate_value(env)?;
                if denominator.is_zero() {
                    return Err(self.invalid("division by zero"));
                }

                Ok(left.evaluate_value(env)?.div(&denominator))
            }
            Expression::IfThenElse(condition, then, otherwise) => {
                if condition.evaluate_bool(env)? {
                    then.evaluate_value(env)
                } else {
                    otherwise.evaluate_value(env)
                }
            }
            _ => self.scalar_to_value(&self.evaluate(env)?),
        }
    }

    fn evaluate_binary<V: Value>(
        &self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
        env: &Environment<'_, V>,
    ) -> Result<Scalar, BuildError> {
        match operator {
            BinaryOperator::And => Ok(Scalar::Bool(left.evaluate_bool(env)? && right.evaluate_bool(env)?)),
            BinaryOperator::Or => Ok(Scalar::Bool(left.evaluate_bool(env)? || right.evaluate_bool(env)?)),
            BinaryOperator::Implies => Ok(Scalar::Bool(!left.evaluate_bool(env)? || right.evaluate_bool(env)?)),
            BinaryOperator::Iff => Ok(Scalar::Bool(left.evaluate_bool(env)? == right.evaluate_bool(env)?)),
            BinaryOperator::Equal => Ok(Scalar::Bool(self.equal(&left.evaluate(env)?, &right.evaluate(env)?)?)),
            BinaryOperator::NotEqual => Ok(Scalar::Bool(!self.equal(&left.evaluate(env)?, &right.evaluate(env)?)?)),
            BinaryOperator::Less => Ok(Scalar::Bool(
                self.compare(&left.evaluate(env)?, &right.evaluate(env)?)?.is_lt(),
            )),
            BinaryOperator::LessEqual => Ok(Scalar::Bool(
                self.compare(&left.evaluate(env)?, &right.evaluate(env)?)?.is_le(),
            )),
            BinaryOperator::Greater => Ok(Scalar::Bool(
                self.compare(&left.evaluate(env)?, &right.evaluate(env)?)?.is_gt(),
            )),
            BinaryOperator::GreaterEqual => Ok(Scalar::Bool(
                self.compare(&left.evaluate(env)?, &right.evaluate(env)?)?.is_ge(),
            )),
            BinaryOperator::Divide => {
                let numerator = self.number(&left.evaluate(env)?)?;
                let denominator = self.number(&right.evaluate(env)?)?;
                if denominator.is_zero() {
                    return Err(self.invalid("division by zero"));
                }

                Ok(Scalar::Rational(numerator / denominator))
            }
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Times | BinaryOperator::Min | BinaryOperator::Max => {
                self.arithmetic(operator, &left.evaluate(env)?, &right.evaluate(env)?)
            }
        }
    }

    /// Integer arithmetic stays integer, otherwise the operands are promoted to rationals.
    fn arithmetic(&self, operator: BinaryOperator, left: &Scalar, right: &Scalar) -> Result<Scalar, BuildError> {
        if let (Scalar::Int(left), Scalar::Int(right)) = (left, right) {
            let result = match operator {
                BinaryOperator::Plus => left.checked_add(*right),
                BinaryOperator::Minus => left.checked_sub(*right),
                BinaryOperator::Times => left.checked_mul(*right),
                BinaryOperator::Min => Some(*left.min(right)),
                BinaryOperator::Max => Some(*left.max(right)),
                _ => return Err(self.invalid(format!("{operator} is not an arithmetic operator"))),
            };

            return result.map(Scalar::Int).ok_or_else(|| self.invalid("integer overflow"));
        }

        let (left, right) = (self.number(left)?, self.number(right)?);
        let result = match operator {
            BinaryOperator::Plus => left + right,
            BinaryOperator::Minus => left - right,
            BinaryOperator::Times => left * right,
            BinaryOperator::Min => left.min(right),
            BinaryOperator::Max => left.max(right),
            _ => return Err(self.invalid(format!("{operator} is not an arithmetic operator"))),
        };

        Ok(Scalar::Rational(result))
    }

    fn equal(&self, left: &Scalar, right: &Scalar) -> Result<bool, BuildError> {
        match (left, right) {
            (Scalar::Bool(left), Scalar::Bool(right)) => Ok(left == right),
            _ => Ok(self.compare(left, right)?.is_eq()),
        }
    }

    fn compare(&self, left: &Scalar, right: &Scalar) -> Result<Ordering, BuildError> {
        if let (Scalar::Int(left), Scalar::Int(right)) = (left, right) {
            return Ok(left.cmp(right));
        }

        Ok(self.number(left)?.cmp(&self.number(right)?))
    }

    fn number(&self, value: &Scalar) -> Result<BigRational, BuildError> {
        value
            .as_rational()
            .ok_or_else(|| self.invalid(format!("expected a number, found {value}")))
    }

    fn scalar_to_value<V: Value>(&self, value: &Scalar) -> Result<V, BuildError> {
        match value {
            Scalar::Int(value) => Ok(V::from_integer(*value)),
            Scalar::Rational(value) => Ok(V::from_rational(value)),
            Scalar::Bool(_) => Err(self.invalid(format!("expected a number, found {value}"))),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidExpression {
            expression: self.to_string(),
            reason: reason.into(),
        }
    }
}

/// The values of the identifiers while evaluating an expression.
pub(crate) struct Environment<'a, V> {
    pub constants: &'a Constants<V>,
    pub variables: &'a VariableTable,
    pub state: &'a [i64],
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Literal(Scalar::Bool(value))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Literal(Scalar::Int(value))
    }
}

impl std::ops::Add for Expression {
    type Output = Expression;

    fn add(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Plus, other)
    }
}

impl std::ops::Sub for Expression {
    type Output = Expression;

    fn sub(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Minus, other)
    }
}

impl std::ops::Mul for Expression {
    type Output = Expression;

    fn mul(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Times, other)
    }
}

impl std::ops::Div for Expression {
    type Output = Expression;

    fn div(self, other: Expression) -> Expression {
        self.binary(BinaryOperator::Divide, other)
    }
}

impl std::ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::Unary(UnaryOperator::Minus, Box::new(self))
    }
}

impl std::ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        Expression::Unary(UnaryOperator::Not, Box::new(self))
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "!"),
            UnaryOperator::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::Implies => "=>",
            BinaryOperator::Iff => "<=>",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Times => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Min => "min",
            BinaryOperator::Max => "max",
        };

        write!(f, "{symbol}")
    }
}

/// Prints the expression in the syntax of the PRISM language, compound operands are parenthesised.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Identifier(name) => write!(f, "{name}"),
            Expression::Unary(operator, operand) => write!(f, "{operator}{}", Operand(operand)),
            Expression::Binary(operator @ (BinaryOperator::Min | BinaryOperator::Max), left, right) => {
                write!(f, "{operator}({left}, {right})")
            }
            Expression::Binary(operator, left, right) => {
                write!(f, "{} {operator} {}", Operand(left), Operand(right))
            }
            Expression::IfThenElse(condition, then, otherwise) => {
                write!(f, "{} ? {} : {}", Operand(condition), Operand(then), Operand(otherwise))
            }
        }
    }
}

struct Operand<'a>(&'a Expression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expression::Binary(BinaryOperator::Min | BinaryOperator::Max, _, _) => write!(f, "{}", self.0),
            Expression::Binary(..) | Expression::IfThenElse(..) => write!(f, "({})", self.0),
            _ => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_number::Parameter;
    use pmc_number::RationalFunction;
    use rustc_hash::FxHashMap;

    fn x() -> Expression {
        Expression::identifier("x")
    }

    fn evaluate(expression: &Expression, constants: &Constants<f64>) -> Result<Scalar, BuildError> {
        let variables = VariableTable::default();
        expression.evaluate(&Environment {
            constants,
            variables: &variables,
            state: &[],
        })
    }

    #[test]
    fn test_expression_display() {
        let expression = (x() + Expression::from(1)).less(Expression::fraction(1, 2)).and(!x().equals(Expression::from(2)));
        assert_eq!(expression.to_string(), "((x + 1) < 1/2) & !(x = 2)");
        assert_eq!(x().max(Expression::from(3)).to_string(), "max(x, 3)");
    }

    #[test]
    fn test_expression_evaluate() {
        let mut constants: Constants<f64> = FxHashMap::default();
        constants.insert("x".to_string(), ConstantValue::Scalar(Scalar::Int(4)));

        assert_eq!(evaluate(&(x() * Expression::from(3) - Expression::from(2)), &constants).unwrap(), Scalar::Int(10));
        assert_eq!(
            evaluate(&(x() / Expression::from(8)), &constants).unwrap(),
            Scalar::Rational(rational(1, 2))
        );
        assert_eq!(
            evaluate(&Expression::fraction(1, 3).min(x()), &constants).unwrap(),
            Scalar::Rational(rational(1, 3))
        );
        assert_eq!(
            evaluate(&Expression::if_then_else(x().greater_equal(Expression::from(4)), Expression::from(true), Expression::from(false)), &constants).unwrap(),
            Scalar::Bool(true)
        );

        // Short circuiting does not evaluate the unknown identifier.
        let guarded = Expression::from(false).and(Expression::identifier("y"));
        assert_eq!(evaluate(&guarded, &constants).unwrap(), Scalar::Bool(false));
    }

    #[test]
    fn test_expression_errors() {
        let constants: Constants<f64> = FxHashMap::default();

        assert!(matches!(
            evaluate(&(Expression::from(1) / Expression::from(0)), &constants),
            Err(BuildError::InvalidExpression { .. })
        ));
        assert!(matches!(
            evaluate(&(Expression::from(true) + Expression::from(1)), &constants),
            Err(BuildError::InvalidExpression { .. })
        ));
        assert!(matches!(
            evaluate(&Expression::identifier("y"), &constants),
            Err(BuildError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_evaluate_value_parametric() {
        let p = RationalFunction::parameter(Parameter::new("p"));
        let mut constants: Constants<RationalFunction> = FxHashMap::default();
        constants.insert("p".to_string(), ConstantValue::Symbolic(p.clone()));

        let variables = VariableTable::default();
        let env = Environment {
            constants: &constants,
            variables: &variables,
            state: &[],
        };

        let complement = Expression::from(1) - Expression::identifier("p");
        assert_eq!(complement.evaluate_value(&env).unwrap(), &RationalFunction::one() - &p);

        // Parameters cannot occur in guards.
        assert!(matches!(
            Expression::identifier("p").less(Expression::from(1)).evaluate(&env),
            Err(BuildError::UndefinedConstant(_))
        ));
    }
}
