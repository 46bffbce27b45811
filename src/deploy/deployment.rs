// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: State types carry their own data for compile-time guarantees.

use crate::environment::EnvironmentOptions;
use crate::types::{ApplicationName, EnvironmentName, PhysicalName, VersionLabel};

use super::state::{Initialized, Launched, Replacement, Replacing};

/// A blue-green deployment of one version into one logical slot,
/// parameterized by its current state.
///
/// The state type parameter `S` carries the name of the new physical
/// environment once it exists, and the environment being replaced on a
/// replacing deploy, so later transitions cannot run without them.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) application: ApplicationName,
    pub(crate) slot: EnvironmentName,
    pub(crate) version: VersionLabel,
    pub(crate) options: EnvironmentOptions,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    /// First deployment into an empty slot.
    pub fn new(
        application: ApplicationName,
        slot: EnvironmentName,
        version: VersionLabel,
        options: EnvironmentOptions,
    ) -> Self {
        Deployment {
            application,
            slot,
            version,
            options,
            state: Initialized,
        }
    }
}

impl Deployment<Replacing> {
    /// Deployment replacing the live environment `old`.
    pub fn new_update(
        application: ApplicationName,
        slot: EnvironmentName,
        version: VersionLabel,
        options: EnvironmentOptions,
        old: PhysicalName,
    ) -> Self {
        Deployment {
            application,
            slot,
            version,
            options,
            state: Replacing { old },
        }
    }
}

impl<S> Deployment<S> {
    pub fn application(&self) -> &ApplicationName {
        &self.application
    }

    pub fn slot(&self) -> &EnvironmentName {
        &self.slot
    }

    pub fn version(&self) -> &VersionLabel {
        &self.version
    }
}

impl<S: Launched> Deployment<S> {
    /// The physical environment this deployment created.
    pub fn new_environment(&self) -> &PhysicalName {
        self.state.environment()
    }
}

impl<S: Replacement> Deployment<S> {
    /// The environment serving traffic before this deployment.
    pub fn old_environment(&self) -> &PhysicalName {
        self.state.old()
    }
}
