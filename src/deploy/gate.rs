// ABOUTME: Deploy gate to prevent concurrent deployments to the same slot.
// ABOUTME: In-process map from slot to holder info, released when the guard drops.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{ApplicationName, EnvironmentName};

use super::DeployError;

/// Information about who holds a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateInfo {
    /// Hostname of the machine running the deploy.
    pub holder: String,
    /// Process ID of the holder.
    pub pid: u32,
    /// When the gate was taken.
    pub started_at: DateTime<Utc>,
    /// What is being done, e.g. the version being deployed.
    pub purpose: String,
}

impl GateInfo {
    /// Holder info for the current process.
    pub fn new(purpose: impl Into<String>) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            purpose: purpose.into(),
        }
    }
}

type SlotKey = (ApplicationName, EnvironmentName);

/// Serializes deploys per logical slot. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct DeployGate {
    held: Arc<Mutex<HashMap<SlotKey, GateInfo>>>,
}

impl DeployGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, or fail fast with `DeployError::Busy` naming the holder.
    pub fn acquire(
        &self,
        application: &ApplicationName,
        slot: &EnvironmentName,
        purpose: impl Into<String>,
    ) -> Result<GateGuard, DeployError> {
        let key = (application.clone(), slot.clone());
        let mut held = self.held.lock();

        if let Some(existing) = held.get(&key) {
            return Err(DeployError::Busy {
                slot: format!("{application}/{slot}"),
                holder: existing.clone(),
            });
        }

        let info = GateInfo::new(purpose);
        tracing::debug!(
            application = %application,
            slot = %slot,
            purpose = %info.purpose,
            "acquired deploy gate"
        );
        held.insert(key.clone(), info);

        Ok(GateGuard {
            gate: self.clone(),
            key,
        })
    }

    /// Current holder of a slot, if any.
    pub fn holder(&self, application: &ApplicationName, slot: &EnvironmentName) -> Option<GateInfo> {
        self.held
            .lock()
            .get(&(application.clone(), slot.clone()))
            .cloned()
    }
}

/// A held slot that releases on drop.
pub struct GateGuard {
    gate: DeployGate,
    key: SlotKey,
}

impl std::fmt::Debug for GateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateGuard")
            .field("application", &self.key.0)
            .field("slot", &self.key.1)
            .finish()
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.held.lock().remove(&self.key);
        tracing::debug!(application = %self.key.0, slot = %self.key.1, "released deploy gate");
    }
}
