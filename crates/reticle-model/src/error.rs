use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0}")]
    Decode(String),

    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
