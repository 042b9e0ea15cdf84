use thiserror::Error;

/// Common error type shared by every classdraft crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    #[error("Validation error: {0}")]
    Validation(String),
}
