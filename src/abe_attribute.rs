use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::parse_error::ParseError;

/// Identifier of an attribute in the universe `1..=U` created at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbeAttribute(u32);

impl AbeAttribute {
    pub const fn new(id: u32) -> AbeAttribute {
        AbeAttribute(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AbeAttribute {
    fn from(value: u32) -> Self {
        AbeAttribute(value)
    }
}

impl Display for AbeAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AbeAttribute {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseError::new(
                format!("Invalid attribute '{}'", s).as_str(),
                0,
            ));
        }
        trimmed
            .parse::<u32>()
            .map(AbeAttribute)
            .map_err(|e| ParseError::new(format!("Invalid attribute '{}': {}", s, e).as_str(), 0))
    }
}
