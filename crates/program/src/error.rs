use thiserror::Error;

use pmc_model::ModelError;
use pmc_model::ModelType;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Malformed model: {0}")]
    MalformedModel(String),

    #[error("The constant {0} is undefined")]
    UndefinedConstant(String),

    #[error("Cannot build a {0}, only DTMCs are supported")]
    UnsupportedModelType(ModelType),

    #[error("Invalid expression {expression}: {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("The value {value} of variable {variable} is outside of its range [{lower}..{upper}]")]
    VariableOutOfBounds {
        variable: String,
        value: i64,
        lower: i64,
        upper: i64,
    },

    #[error("Unknown label \"{0}\"")]
    UnknownLabel(String),

    #[error("Unknown reward structure \"{0}\"")]
    UnknownRewardStructure(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
