// ABOUTME: Manifest entry for one logical environment.
// ABOUTME: Flattens `aws:` namespace keys into sorted option settings and passes other keys through.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::deserialize::{
    deserialize_cname_prefix_option, deserialize_environment_name, deserialize_tags,
    deserialize_tier_option,
};
use super::env_value::{EnvValue, resolve_env_map};
use crate::environment::EnvironmentOptions;
use crate::error::Result;
use crate::platform::{OptionSetting, OptionSpecifier, Tag, Tier};
use crate::types::{CnamePrefix, EnvironmentName, VersionLabel};

/// Prefix of keys that name a platform option namespace.
pub const OPTION_NAMESPACE_PREFIX: &str = "aws:";

/// Request fields greenswap fills in itself.
const MANAGED_FIELDS: &[&str] = &["ApplicationName", "EnvironmentName"];

/// A declared logical environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawEnvironment")]
pub struct EnvironmentManifest {
    pub name: EnvironmentName,
    pub cname_prefix: Option<CnamePrefix>,
    pub description: Option<String>,
    pub tier: Option<Tier>,
    pub tags: BTreeMap<String, String>,
    pub solution_stack_name: Option<String>,
    pub template_name: Option<String>,
    pub version_label: Option<VersionLabel>,
    pub options_to_remove: Vec<OptionSpecifier>,
    /// Namespace to option name to value.
    pub options: BTreeMap<String, BTreeMap<String, EnvValue>>,
    /// Settings given directly in the platform's `OptionSettings` form.
    pub option_settings: Vec<OptionSetting>,
    /// Remaining keys, forwarded as top-level request fields.
    pub extra_fields: BTreeMap<String, serde_json::Value>,
}

impl EnvironmentManifest {
    /// Resolve env references and build the declared configuration.
    pub fn resolve(&self) -> Result<EnvironmentOptions> {
        let mut option_settings = self.option_settings.clone();
        for (namespace, values) in &self.options {
            for (option_name, value) in resolve_env_map(values)? {
                option_settings.push(OptionSetting {
                    namespace: namespace.clone(),
                    option_name,
                    value,
                });
            }
        }
        option_settings.sort_by(|a, b| {
            (a.namespace.as_str(), a.option_name.as_str())
                .cmp(&(b.namespace.as_str(), b.option_name.as_str()))
        });

        let tags = self
            .tags
            .iter()
            .map(|(key, value)| Tag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        Ok(EnvironmentOptions {
            cname_prefix: self.cname_prefix.clone(),
            description: self.description.clone(),
            solution_stack_name: self.solution_stack_name.clone(),
            template_name: self.template_name.clone(),
            tier: self.tier.clone(),
            tags,
            option_settings,
            options_to_remove: self.options_to_remove.clone(),
            version_label: self.version_label.clone(),
            extra_fields: self.extra_fields.clone(),
        })
    }
}

#[derive(Deserialize)]
struct RawEnvironment {
    #[serde(deserialize_with = "deserialize_environment_name")]
    name: EnvironmentName,

    #[serde(
        rename = "CNAMEPrefix",
        default,
        deserialize_with = "deserialize_cname_prefix_option"
    )]
    cname_prefix: Option<CnamePrefix>,

    #[serde(alias = "Description", default)]
    description: Option<String>,

    #[serde(alias = "Tier", default, deserialize_with = "deserialize_tier_option")]
    tier: Option<Tier>,

    #[serde(alias = "Tags", default, deserialize_with = "deserialize_tags")]
    tags: BTreeMap<String, String>,

    #[serde(rename = "solutionStackName", alias = "SolutionStackName", default)]
    solution_stack_name: Option<String>,

    #[serde(rename = "templateName", alias = "TemplateName", default)]
    template_name: Option<String>,

    #[serde(rename = "versionLabel", alias = "VersionLabel", default)]
    version_label: Option<String>,

    #[serde(rename = "optionsToRemove", alias = "OptionsToRemove", default)]
    options_to_remove: Vec<OptionSpecifier>,

    #[serde(rename = "optionSettings", alias = "OptionSettings", default)]
    option_settings: Vec<OptionSetting>,

    #[serde(flatten)]
    rest: BTreeMap<String, serde_yaml::Value>,
}

impl TryFrom<RawEnvironment> for EnvironmentManifest {
    type Error = String;

    fn try_from(raw: RawEnvironment) -> std::result::Result<Self, Self::Error> {
        let version_label = raw
            .version_label
            .map(|label| {
                VersionLabel::parse(&label)
                    .ok_or_else(|| format!("empty VersionLabel in environment {}", raw.name))
            })
            .transpose()?;

        let mut options = BTreeMap::new();
        let mut extra_fields = BTreeMap::new();
        for (key, value) in raw.rest {
            if key.starts_with(OPTION_NAMESPACE_PREFIX) {
                let values: BTreeMap<String, EnvValue> = serde_yaml::from_value(value)
                    .map_err(|e| format!("invalid options in `{key}`: {e}"))?;
                options.insert(key, values);
            } else if MANAGED_FIELDS.contains(&key.as_str()) {
                return Err(format!(
                    "`{key}` is set by greenswap and cannot be declared in environment {}",
                    raw.name
                ));
            } else {
                let value = serde_json::to_value(&value)
                    .map_err(|e| format!("invalid value for `{key}`: {e}"))?;
                extra_fields.insert(key, value);
            }
        }

        Ok(EnvironmentManifest {
            name: raw.name,
            cname_prefix: raw.cname_prefix,
            description: raw.description,
            tier: raw.tier,
            tags: raw.tags,
            solution_stack_name: raw.solution_stack_name,
            template_name: raw.template_name,
            version_label,
            options_to_remove: raw.options_to_remove,
            options,
            option_settings: raw.option_settings,
            extra_fields,
        })
    }
}
