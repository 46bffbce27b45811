// ABOUTME: Error type surfaced by platform control plane operations.
// ABOUTME: Remote failures are propagated to callers unmodified.

/// Errors returned by a platform client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("request rejected: {0}")]
    Validation(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("platform service error: {0}")]
    Service(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, PlatformError::AlreadyExists(_))
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::Throttled(_) | PlatformError::Service(_))
    }
}
