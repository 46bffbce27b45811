// ABOUTME: Validated CNAME prefix for the canonical alias of a logical environment.
// ABOUTME: Ensures prefixes are usable as a single DNS label.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CnamePrefixError {
    #[error("CNAME prefix cannot be empty")]
    Empty,

    #[error("CNAME prefix exceeds maximum length of 63 characters")]
    TooLong,

    #[error("CNAME prefix cannot start or end with a hyphen")]
    EdgeHyphen,

    #[error("invalid character in CNAME prefix: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CnamePrefix(String);

impl CnamePrefix {
    pub fn new(value: &str) -> Result<Self, CnamePrefixError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CnamePrefixError::Empty);
        }

        if trimmed.len() > 63 {
            return Err(CnamePrefixError::TooLong);
        }

        if trimmed.starts_with('-') || trimmed.ends_with('-') {
            return Err(CnamePrefixError::EdgeHyphen);
        }

        for c in trimmed.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' {
                return Err(CnamePrefixError::InvalidChar(c));
            }
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a fully qualified CNAME was issued for this prefix.
    pub fn matches(&self, cname: &str) -> bool {
        cname
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for CnamePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
