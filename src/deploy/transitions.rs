// ABOUTME: State transition methods for blue-green deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::time::Duration;

use crate::platform::{Health, PlatformClient, PlatformError, SwapEnvironmentCnamesRequest};
use crate::poll::{Goal, PollOptions, wait_for_state};
use crate::types::PhysicalName;

use super::Deployment;
use super::cleanup::{CleanupIntent, CleanupQueue, CleanupReason};
use super::error::DeployError;
use super::state::{
    Completed, CutOver, HealthChecked, Initialized, Launched, Provisioned, Replacing, Staged,
};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

/// What a finished deployment changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// First deploy into an empty slot; no swap happened.
    Created { environment: PhysicalName },
    /// Traffic moved from `previous` to `current`; `previous` is queued for termination.
    Swapped {
        previous: PhysicalName,
        current: PhysicalName,
    },
}

impl DeployOutcome {
    /// The environment serving traffic after the deploy.
    pub fn current(&self) -> &PhysicalName {
        match self {
            DeployOutcome::Created { environment } => environment,
            DeployOutcome::Swapped { current, .. } => current,
        }
    }
}

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            application: self.application,
            slot: self.slot,
            version: self.version,
            options: self.options,
            state,
        }
    }
}

impl<S> Deployment<S> {
    /// Create a new physical environment bound to the version.
    async fn launch<P>(&self, platform: &P, claim_alias: bool) -> Result<PhysicalName, DeployError>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.slot.generate_physical();
        let request = self.options.create_request(
            &self.application,
            environment.clone(),
            Some(self.version.clone()),
            claim_alias,
        );

        tracing::info!(
            application = %self.application,
            environment = %environment,
            version = %self.version,
            "creating environment"
        );
        platform
            .create_environment(&request)
            .await
            .map_err(|source| DeployError::Provision {
                environment: environment.clone(),
                source,
            })?;
        Ok(environment)
    }
}

impl<S: Launched> Deployment<S> {
    /// Give up on the new environment: queue its termination.
    ///
    /// Returns the name of the abandoned environment.
    pub fn abandon(self, cleanup: &CleanupQueue) -> PhysicalName {
        let abandoned = self.state.environment().clone();
        cleanup.enqueue(CleanupIntent::new(
            self.application,
            abandoned.clone(),
            CleanupReason::Abandoned,
        ));
        abandoned
    }
}

// =============================================================================
// Initialized -> Provisioned -> Completed
// =============================================================================

impl Deployment<Initialized> {
    /// Create the slot's first environment, claiming the CNAME prefix.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Provision` if the platform rejects the request.
    /// Nothing was created in that case.
    #[must_use = "deployment state must be used"]
    pub async fn provision<P>(self, platform: &P) -> Result<Deployment<Provisioned>, DeployError>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.launch(platform, true).await?;
        Ok(self.transition(Provisioned { environment }))
    }
}

impl Deployment<Provisioned> {
    /// Accept the first environment as is; it was created holding the alias.
    pub fn adopt(self) -> Deployment<Completed> {
        let environment = self.state.environment.clone();
        self.transition(Completed {
            environment,
            previous: None,
        })
    }
}

// =============================================================================
// Replacing -> Staged -> HealthChecked
// =============================================================================

impl Deployment<Replacing> {
    /// Create a sibling of the live environment. It launches without the
    /// CNAME prefix and only gets the alias through a swap.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Provision` if the platform rejects the request.
    /// Nothing was created in that case.
    #[must_use = "deployment state must be used"]
    pub async fn provision<P>(self, platform: &P) -> Result<Deployment<Staged>, DeployError>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.launch(platform, false).await?;
        let old = self.state.old.clone();
        Ok(self.transition(Staged { environment, old }))
    }
}

impl Deployment<Staged> {
    /// Wait for the sibling to report Green health.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure to allow abandoning the environment.
    #[must_use = "deployment state must be used"]
    pub async fn health_check<P>(
        self,
        platform: &P,
        options: &PollOptions,
    ) -> TransitionResult<HealthChecked, Staged>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.state.environment.clone();
        match wait_for_state(
            platform,
            &self.application,
            &environment,
            Goal::Health(Health::Green),
            options,
        )
        .await
        {
            Ok(_) => {
                tracing::info!(environment = %environment, "new environment is healthy");
                let old = self.state.old.clone();
                Ok(self.transition(HealthChecked { environment, old }))
            }
            Err(source) => Err((
                self,
                DeployError::HealthCheck {
                    environment,
                    source,
                },
            )),
        }
    }
}

// =============================================================================
// HealthChecked -> CutOver
// =============================================================================

impl Deployment<HealthChecked> {
    /// Move the alias to the new environment with one swap call.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure; the alias did not move.
    #[must_use = "deployment state must be used"]
    pub async fn swap<P>(self, platform: &P) -> TransitionResult<CutOver, HealthChecked>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.state.environment.clone();
        let old = self.state.old.clone();

        let request = SwapEnvironmentCnamesRequest {
            source_environment_name: old.clone(),
            destination_environment_name: environment.clone(),
        };
        tracing::info!(old = %old, new = %environment, "swapping CNAMEs");

        match platform.swap_environment_cnames(&request).await {
            Ok(()) => Ok(self.transition(CutOver { environment, old })),
            Err(source) => Err((
                self,
                DeployError::Swap {
                    old,
                    new: environment,
                    source,
                },
            )),
        }
    }
}

// =============================================================================
// CutOver -> Completed
// =============================================================================

impl Deployment<CutOver> {
    /// Re-query the new environment once, bounded by `timeout`. It must
    /// still be Green while serving traffic.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure so the swap can be reverted.
    #[must_use = "deployment state must be used"]
    pub async fn verify<P>(self, platform: &P, timeout: Duration) -> TransitionResult<Completed, CutOver>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.state.environment.clone();
        let described = tokio::time::timeout(
            timeout,
            platform.describe_environment(&self.application, &environment),
        )
        .await;

        let failure = match described {
            Ok(Ok(Some(env))) if env.health == Health::Green && !env.status.is_gone() => {
                let previous = Some(self.state.old.clone());
                return Ok(self.transition(Completed {
                    environment,
                    previous,
                }));
            }
            Ok(Ok(Some(env))) if env.status.is_gone() => DeployError::Vanished {
                environment: environment.clone(),
            },
            Ok(Ok(Some(env))) => DeployError::Degraded {
                environment: environment.clone(),
                health: env.health,
            },
            Ok(Ok(None)) => DeployError::Vanished {
                environment: environment.clone(),
            },
            Ok(Err(source)) => DeployError::Verify {
                environment: environment.clone(),
                source,
            },
            Err(_) => DeployError::VerifyTimeout {
                environment: environment.clone(),
                waited: timeout,
            },
        };

        tracing::warn!(environment = %environment, "post-swap verification failed: {failure}");
        Err((self, failure))
    }

    /// Swap the alias back to the old environment.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` if the swap back fails; the new environment
    /// still holds the alias.
    #[must_use = "deployment state must be used"]
    pub async fn revert<P>(
        self,
        platform: &P,
    ) -> Result<Deployment<HealthChecked>, (Deployment<CutOver>, PlatformError)>
    where
        P: PlatformClient + ?Sized,
    {
        let environment = self.state.environment.clone();
        let old = self.state.old.clone();

        let request = SwapEnvironmentCnamesRequest {
            source_environment_name: environment.clone(),
            destination_environment_name: old.clone(),
        };
        tracing::warn!(old = %old, new = %environment, "swapping CNAMEs back");

        match platform.swap_environment_cnames(&request).await {
            Ok(()) => Ok(self.transition(HealthChecked { environment, old })),
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// Completed - Terminal State
// =============================================================================

impl Deployment<Completed> {
    /// Queue termination of the old environment and report the outcome.
    pub fn finish(self, cleanup: &CleanupQueue) -> DeployOutcome {
        let current = self.state.environment;
        match self.state.previous {
            Some(previous) => {
                cleanup.enqueue(CleanupIntent::new(
                    self.application,
                    previous.clone(),
                    CleanupReason::Superseded,
                ));
                DeployOutcome::Swapped { previous, current }
            }
            None => DeployOutcome::Created {
                environment: current,
            },
        }
    }
}
