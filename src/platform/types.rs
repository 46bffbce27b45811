// ABOUTME: Request and description types exchanged with the platform control plane.
// ABOUTME: Field names serialize to the platform's PascalCase wire names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::{ApplicationName, BundleRef, PhysicalName, VersionLabel};

// =============================================================================
// Status and health
// =============================================================================

/// Lifecycle phase of a physical environment as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    Launching,
    Updating,
    Ready,
    Terminating,
    Terminated,
    Aborting,
}

impl EnvironmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentStatus::Launching => "Launching",
            EnvironmentStatus::Updating => "Updating",
            EnvironmentStatus::Ready => "Ready",
            EnvironmentStatus::Terminating => "Terminating",
            EnvironmentStatus::Terminated => "Terminated",
            EnvironmentStatus::Aborting => "Aborting",
        }
    }

    /// Terminating or terminated environments no longer count as live.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            EnvironmentStatus::Terminating | EnvironmentStatus::Terminated
        )
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Launching" => Ok(EnvironmentStatus::Launching),
            "Updating" => Ok(EnvironmentStatus::Updating),
            "Ready" => Ok(EnvironmentStatus::Ready),
            "Terminating" => Ok(EnvironmentStatus::Terminating),
            "Terminated" => Ok(EnvironmentStatus::Terminated),
            "Aborting" => Ok(EnvironmentStatus::Aborting),
            other => Err(format!("unknown environment status: {other}")),
        }
    }
}

/// Coarse health signal. Green is the only fully healthy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Health {
    Green,
    Yellow,
    Red,
    Grey,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Green => "Green",
            Health::Yellow => "Yellow",
            Health::Red => "Red",
            Health::Grey => "Grey",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Health {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Green" => Ok(Health::Green),
            "Yellow" => Ok(Health::Yellow),
            "Red" => Ok(Health::Red),
            "Grey" => Ok(Health::Grey),
            other => Err(format!("unknown health: {other}")),
        }
    }
}

// =============================================================================
// Shared value types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSetting {
    pub namespace: String,
    pub option_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSpecifier {
    pub namespace: String,
    pub option_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tier {
    pub name: String,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub tier_type: Option<String>,
}

impl Tier {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier_type: None,
        }
    }
}

// =============================================================================
// Descriptions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationDescription {
    pub application_name: ApplicationName,
    #[serde(default)]
    pub description: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    #[serde(default)]
    pub versions: Vec<VersionLabel>,
    #[serde(default)]
    pub configuration_templates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationVersionDescription {
    pub application_name: ApplicationName,
    pub version_label: VersionLabel,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_bundle: Option<BundleRef>,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentDescription {
    pub environment_name: PhysicalName,
    pub environment_id: String,
    pub application_name: ApplicationName,
    #[serde(default)]
    pub version_label: Option<VersionLabel>,
    #[serde(default)]
    pub solution_stack_name: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "CNAME", default)]
    pub cname: Option<String>,
    pub status: EnvironmentStatus,
    pub health: Health,
    #[serde(default)]
    pub tier: Option<Tier>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateApplicationRequest {
    pub application_name: ApplicationName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An empty name list describes every application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeApplicationsRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_names: Vec<ApplicationName>,
}

impl DescribeApplicationsRequest {
    pub fn named(name: &ApplicationName) -> Self {
        Self {
            application_names: vec![name.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateApplicationRequest {
    pub application_name: ApplicationName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteApplicationRequest {
    pub application_name: ApplicationName,
    #[serde(default)]
    pub terminate_env_by_force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateApplicationVersionRequest {
    pub application_name: ApplicationName,
    pub version_label: VersionLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_bundle: Option<BundleRef>,
    #[serde(default)]
    pub auto_create_application: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEnvironmentRequest {
    pub application_name: ApplicationName,
    pub environment_name: PhysicalName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_label: Option<VersionLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_stack_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(rename = "CNAMEPrefix", default, skip_serializing_if = "Option::is_none")]
    pub cname_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_settings: Vec<OptionSetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options_to_remove: Vec<OptionSpecifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Manifest keys forwarded verbatim as top-level request fields.
    #[serde(flatten)]
    pub extra_fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeEnvironmentsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<ApplicationName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_names: Vec<PhysicalName>,
    #[serde(default)]
    pub include_deleted: bool,
}

impl DescribeEnvironmentsRequest {
    /// Every non-terminated environment of an application.
    pub fn for_application(application: &ApplicationName) -> Self {
        Self {
            application_name: Some(application.clone()),
            ..Default::default()
        }
    }

    /// A single environment, including it once terminated.
    pub fn named(application: &ApplicationName, name: &PhysicalName) -> Self {
        Self {
            application_name: Some(application.clone()),
            environment_names: vec![name.clone()],
            include_deleted: true,
        }
    }
}

/// Fields accepted when updating an existing environment. Creation-only
/// fields (application, solution stack, CNAME prefix) have no place here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateEnvironmentRequest {
    pub environment_name: PhysicalName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_label: Option<VersionLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_settings: Vec<OptionSetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options_to_remove: Vec<OptionSpecifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    /// Manifest keys forwarded verbatim as top-level request fields.
    #[serde(flatten)]
    pub extra_fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminateEnvironmentRequest {
    pub environment_name: PhysicalName,
    #[serde(default)]
    pub terminate_resources: bool,
}

impl TerminateEnvironmentRequest {
    pub fn new(environment_name: PhysicalName) -> Self {
        Self {
            environment_name,
            terminate_resources: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwapEnvironmentCnamesRequest {
    pub source_environment_name: PhysicalName,
    pub destination_environment_name: PhysicalName,
}
