// ABOUTME: Lifecycle notifications published by a logical environment.
// ABOUTME: Delivered over a tokio broadcast channel to any number of subscribers.

use crate::deploy::{CleanupReason, DeployOutcome};
use crate::types::{PhysicalName, VersionLabel};

/// Buffered events per subscriber before the oldest are dropped.
pub(crate) const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentEvent {
    /// A created or updated physical environment reached `Ready`.
    Ready { environment: PhysicalName },
    /// A deploy finished and `outcome.current()` serves traffic.
    Deployed {
        version: VersionLabel,
        outcome: DeployOutcome,
    },
    /// A deploy failed and traffic stayed on `live`.
    RolledBack {
        live: PhysicalName,
        abandoned: PhysicalName,
    },
    /// Termination of a physical environment was queued.
    CleanupQueued {
        environment: PhysicalName,
        reason: CleanupReason,
    },
}
