use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    #[error("at least one destination must be configured")]
    NoDestinations,
    #[error("destination `{0}` declares no fields")]
    EmptyDestination(String),
    #[error("destination `{0}` is configured more than once")]
    DuplicateDestination(String),
    #[error("dead letter path collides with the output file of destination `{0}`")]
    DeadLetterPathCollision(String),
}
