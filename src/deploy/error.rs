// ABOUTME: Error types for deployment operations.
// ABOUTME: Covers provisioning, health check, swap, verification and rollback failures.

use std::time::Duration;

use crate::platform::{Health, PlatformError};
use crate::poll::WaitError;
use crate::types::PhysicalName;

use super::gate::GateInfo;

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Another deploy holds the slot.
    #[error(
        "deploy of {slot} already in progress (held by {} pid {} since {})",
        .holder.holder,
        .holder.pid,
        .holder.started_at
    )]
    Busy { slot: String, holder: GateInfo },

    /// Creating the new physical environment failed.
    #[error("failed to create environment {environment}: {source}")]
    Provision {
        environment: PhysicalName,
        source: PlatformError,
    },

    /// The new environment never turned Green.
    #[error("environment {environment} did not become healthy: {source}")]
    HealthCheck {
        environment: PhysicalName,
        source: WaitError,
    },

    /// The alias swap was rejected.
    #[error("failed to swap CNAMEs of {old} and {new}: {source}")]
    Swap {
        old: PhysicalName,
        new: PhysicalName,
        source: PlatformError,
    },

    /// The new environment lost Green health after taking traffic.
    #[error("environment {environment} has {health} health after switching CNAMEs")]
    Degraded {
        environment: PhysicalName,
        health: Health,
    },

    /// Re-querying the new environment after the swap failed.
    #[error("failed to verify environment {environment}: {source}")]
    Verify {
        environment: PhysicalName,
        source: PlatformError,
    },

    #[error("environment {environment} could not be verified within {waited:?}")]
    VerifyTimeout {
        environment: PhysicalName,
        waited: Duration,
    },

    #[error("environment {environment} disappeared after switching CNAMEs")]
    Vanished { environment: PhysicalName },

    /// The deploy failed and production stayed on `live`.
    #[error("deploy rolled back, {live} still serves traffic: {cause}")]
    RolledBack {
        live: PhysicalName,
        abandoned: PhysicalName,
        #[source]
        cause: Box<DeployError>,
    },

    /// Swapping the alias back failed; `live` keeps serving.
    #[error("rollback failed, {live} kept the alias from {previous} ({cause}): {source}")]
    RollbackFailed {
        live: PhysicalName,
        previous: PhysicalName,
        cause: Box<DeployError>,
        source: PlatformError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Another deploy of the slot is running.
    Busy,
    /// The new environment could not be created.
    ProvisionFailed,
    /// The new environment did not become healthy in time.
    HealthCheckFailed,
    /// The alias swap failed.
    SwapFailed,
    /// Post-swap verification failed.
    VerifyFailed,
    /// The deploy was undone; production is unchanged.
    RolledBack,
    /// The deploy could not be undone.
    RollbackFailed,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Busy { .. } => DeployErrorKind::Busy,
            DeployError::Provision { .. } => DeployErrorKind::ProvisionFailed,
            DeployError::HealthCheck { .. } => DeployErrorKind::HealthCheckFailed,
            DeployError::Swap { .. } => DeployErrorKind::SwapFailed,
            DeployError::Degraded { .. }
            | DeployError::Verify { .. }
            | DeployError::VerifyTimeout { .. }
            | DeployError::Vanished { .. } => DeployErrorKind::VerifyFailed,
            DeployError::RolledBack { .. } => DeployErrorKind::RolledBack,
            DeployError::RollbackFailed { .. } => DeployErrorKind::RollbackFailed,
        }
    }

    /// Whether production traffic is still served by the environment that
    /// served it before the deploy started.
    pub fn production_unchanged(&self) -> bool {
        match self {
            DeployError::Busy { .. }
            | DeployError::Provision { .. }
            | DeployError::HealthCheck { .. }
            | DeployError::Swap { .. }
            | DeployError::RolledBack { .. } => true,
            DeployError::Degraded { .. }
            | DeployError::Verify { .. }
            | DeployError::VerifyTimeout { .. }
            | DeployError::Vanished { .. }
            | DeployError::RollbackFailed { .. } => false,
        }
    }

    /// The failure that triggered a rollback, or the error itself.
    pub fn root_cause(&self) -> &DeployError {
        match self {
            DeployError::RolledBack { cause, .. } | DeployError::RollbackFailed { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }

    /// Returns the current holder if this is a busy error.
    pub fn gate_holder(&self) -> Option<&GateInfo> {
        match self {
            DeployError::Busy { holder, .. } => Some(holder),
            _ => None,
        }
    }
}
