// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: First deploys and replacing deploys follow separate state paths.

use crate::types::PhysicalName;

/// First deploy into an empty slot: gate held, nothing created yet.
/// Available actions: `provision()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Deploy replacing the live environment `old`: gate held, nothing created yet.
/// Available actions: `provision()`
#[derive(Debug, Clone)]
pub struct Replacing {
    pub(crate) old: PhysicalName,
}

/// Provisioned: the slot's first environment exists and holds the alias.
/// Available actions: `adopt()`, `abandon()`
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub(crate) environment: PhysicalName,
}

/// Staged: a sibling of `old` exists without the alias, not yet proven healthy.
/// Available actions: `health_check()`, `abandon()`
#[derive(Debug, Clone)]
pub struct Staged {
    pub(crate) environment: PhysicalName,
    pub(crate) old: PhysicalName,
}

/// Health checked: the sibling reported Green.
/// Available actions: `swap()`, `abandon()`
#[derive(Debug, Clone)]
pub struct HealthChecked {
    pub(crate) environment: PhysicalName,
    pub(crate) old: PhysicalName,
}

/// Cut over: the alias points at the new environment.
/// Available actions: `verify()`, `revert()`
#[derive(Debug, Clone)]
pub struct CutOver {
    pub(crate) environment: PhysicalName,
    pub(crate) old: PhysicalName,
}

/// Completed: the new environment serves traffic. `previous` is the
/// environment it replaced, if any.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) environment: PhysicalName,
    pub(crate) previous: Option<PhysicalName>,
}

/// States in which a new physical environment exists.
pub trait Launched {
    fn environment(&self) -> &PhysicalName;
}

/// States of a deploy that replaces a live environment.
pub trait Replacement {
    fn old(&self) -> &PhysicalName;
}

macro_rules! launched {
    ($($state:ty),*) => {
        $(impl Launched for $state {
            fn environment(&self) -> &PhysicalName {
                &self.environment
            }
        })*
    };
}

macro_rules! replacement {
    ($($state:ty),*) => {
        $(impl Replacement for $state {
            fn old(&self) -> &PhysicalName {
                &self.old
            }
        })*
    };
}

launched!(Provisioned, Staged, HealthChecked, CutOver, Completed);
replacement!(Replacing, Staged, HealthChecked, CutOver);
