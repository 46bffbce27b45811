// ABOUTME: Manifest types and parsing for greenswap.yml.
// ABOUTME: Handles YAML parsing, manifest discovery, and deploy timing settings.

mod deserialize;
mod env_value;
mod environment;
mod init;

pub use env_value::{EnvValue, resolve_env_map};
pub use environment::{EnvironmentManifest, OPTION_NAMESPACE_PREFIX};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::poll::PollOptions;
use crate::types::{ApplicationName, EnvironmentName};
use deserialize::deserialize_application_name;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "greenswap.yml";
pub const CONFIG_FILENAME_ALT: &str = "greenswap.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".greenswap/config.yml";

/// Declared application and its environments.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(deserialize_with = "deserialize_application_name")]
    pub name: ApplicationName,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub environments: Vec<EnvironmentManifest>,

    #[serde(default)]
    pub deploy: DeploySettings,
}

/// Timing of deploys, waits and cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploySettings {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Bound on waiting for a new environment to turn Green.
    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub health_timeout: Duration,

    /// Fallback bound for status and health waits.
    #[serde(default = "default_status_timeout", with = "humantime_serde")]
    pub status_timeout: Duration,

    /// Bound on the post-swap health re-check.
    #[serde(default = "default_verify_timeout", with = "humantime_serde")]
    pub verify_timeout: Duration,

    /// JSON lines file recording cleanup intents.
    #[serde(default)]
    pub cleanup_journal: Option<PathBuf>,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_status_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_verify_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            health_timeout: default_health_timeout(),
            status_timeout: default_status_timeout(),
            verify_timeout: default_verify_timeout(),
            cleanup_journal: None,
        }
    }
}

impl DeploySettings {
    /// Poll options bounded by `timeout`, or by the status timeout.
    pub fn poll(&self, timeout: Option<Duration>) -> PollOptions {
        PollOptions::new(self.poll_interval, Some(timeout.unwrap_or(self.status_timeout)))
    }

    pub fn health_poll(&self) -> PollOptions {
        PollOptions::new(self.poll_interval, Some(self.health_timeout))
    }
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Path of the first manifest found in `dir`.
    pub fn locate(dir: &Path) -> Result<PathBuf> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        candidates
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        Self::load(&Self::locate(dir)?)
    }

    pub fn environment(&self, name: &EnvironmentName) -> Option<&EnvironmentManifest> {
        self.environments.iter().find(|env| &env.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for env in &self.environments {
            if !seen.insert(env.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "environment {} is declared more than once",
                    env.name
                )));
            }
            if env.solution_stack_name.is_some() && env.template_name.is_some() {
                return Err(Error::ConfigConflict(env.name.to_string()));
            }
        }

        if self.deploy.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "deploy.poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
