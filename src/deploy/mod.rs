// ABOUTME: Blue-green deployment orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Deployment struct, the slot gate and the cleanup queue.

mod cleanup;
mod deployment;
mod error;
mod gate;
mod state;
mod transitions;

pub use cleanup::{
    CleanupIntent, CleanupQueue, CleanupReason, CleanupRecord, CleanupState, detect_orphans,
    pending_from_journal,
};
pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind};
pub use gate::{DeployGate, GateGuard, GateInfo};
pub use state::{
    Completed, CutOver, HealthChecked, Initialized, Launched, Provisioned, Replacement, Replacing,
    Staged,
};
pub use transitions::{DeployOutcome, TransitionResult};
