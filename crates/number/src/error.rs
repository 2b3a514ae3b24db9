use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    #[error("No value was given for the undefined constant {0}")]
    UndefinedConstant(String),

    #[error("Division by zero while evaluating {0}")]
    DivisionByZero(String),
}
