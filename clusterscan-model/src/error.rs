use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidName { kind: &'static str, value: String },
    InvalidKey(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidName { kind, value } => {
                write!(f, "invalid {kind} name: {value:?}")
            }
            ModelError::InvalidKey(raw) => {
                write!(f, "invalid object key {raw:?}; expected namespace/name")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
