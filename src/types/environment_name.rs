// ABOUTME: Validated logical environment names and physical name generation.
// ABOUTME: Physical names are `<logical>-<token>` with a strictly increasing millisecond token.

use super::id::PhysicalName;
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

/// Maximum length of a logical environment name. Leaves room for the
/// `-<token>` suffix of generated physical names.
pub const MAX_LOGICAL_LEN: usize = 40;

/// Minimum digit count of a generated token (millisecond timestamps).
const MIN_TOKEN_DIGITS: usize = 13;

static LAST_TOKEN: AtomicI64 = AtomicI64::new(0);

#[derive(Debug, Error)]
pub enum EnvironmentNameError {
    #[error("environment name cannot be empty")]
    Empty,

    #[error("environment name exceeds maximum length of {MAX_LOGICAL_LEN} characters")]
    TooLong,

    #[error("environment name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("environment name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("invalid character in environment name: '{0}'")]
    InvalidChar(char),
}

/// Name of a logical environment: the stable slot that rotates between
/// physical environments across deploys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    pub fn new(value: &str) -> Result<Self, EnvironmentNameError> {
        if value.is_empty() {
            return Err(EnvironmentNameError::Empty);
        }

        if value.len() > MAX_LOGICAL_LEN {
            return Err(EnvironmentNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(EnvironmentNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(EnvironmentNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' {
                return Err(EnvironmentNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a fresh physical environment name for this slot.
    pub fn generate_physical(&self) -> PhysicalName {
        PhysicalName::new(format!("{}-{}", self.0, next_token()))
    }

    /// Whether `physical` belongs to this logical slot: either the bare
    /// logical name or a generated `<logical>-<token>` name.
    pub fn owns(&self, physical: &PhysicalName) -> bool {
        logical_part(physical.as_str()) == self.0
    }

    /// Recover the logical name a physical environment belongs to.
    pub fn of_physical(physical: &PhysicalName) -> Result<Self, EnvironmentNameError> {
        Self::new(logical_part(physical.as_str()))
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn logical_part(physical: &str) -> &str {
    match physical.rsplit_once('-') {
        Some((logical, token))
            if token.len() >= MIN_TOKEN_DIGITS && token.bytes().all(|b| b.is_ascii_digit()) =>
        {
            logical
        }
        _ => physical,
    }
}

/// Millisecond timestamp, bumped past the last issued token so two names
/// generated within the same millisecond still differ.
fn next_token() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_TOKEN.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_TOKEN.compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}
