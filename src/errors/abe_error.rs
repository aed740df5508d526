use thiserror::Error;

use crate::abe_attribute::AbeAttribute;
use crate::errors::parse_error::ParseError;

/// Errors returned by the scheme and by the key-value persistence layer.
#[derive(Debug, Error)]
pub enum AbeError {
    /// Malformed access tree or scheme parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A tree leaf or ciphertext attribute has no counterpart in the key material.
    #[error("Unknown attribute {0}")]
    UnknownAttribute(AbeAttribute),
    /// A message does not fit into a target group element, or persisted bytes are invalid.
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// The ciphertext's attribute set does not satisfy the access tree.
    #[error("The ciphertext attributes do not satisfy the access tree")]
    UnsatisfiedPolicy,
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AbeError {
    pub fn configuration(message: impl Into<String>) -> AbeError {
        AbeError::Configuration(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> AbeError {
        AbeError::Encoding(message.into())
    }
}
