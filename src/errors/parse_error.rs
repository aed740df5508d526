use thiserror::Error;

/// A syntax error in a policy expression or a key-value file.
///
/// `position` is the byte offset for policy expressions and the 1-based line number for
/// key-value files.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: &str, position: usize) -> ParseError {
        ParseError {
            message: message.to_string(),
            position,
        }
    }
}
