// ABOUTME: Application-wide error types for greenswap.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::platform::PlatformError;
use crate::poll::WaitError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("manifest not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("environment {0}: solution stack and template cannot both be set")]
    ConfigConflict(String),

    #[error("environment {0} has no physical environment")]
    NotProvisioned(String),

    #[error("unknown environment {environment} in application {application}")]
    UnknownEnvironment {
        application: String,
        environment: String,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
