// ABOUTME: Declared configuration of a logical environment.
// ABOUTME: Builds create and update requests, stripping creation-only fields on update.

use crate::platform::{
    CreateEnvironmentRequest, EnvironmentDescription, OptionSetting, OptionSpecifier, Tag, Tier,
    UpdateEnvironmentRequest,
};
use crate::types::{ApplicationName, CnamePrefix, PhysicalName, VersionLabel};
use std::collections::BTreeMap;

/// What a logical environment should look like on the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentOptions {
    pub cname_prefix: Option<CnamePrefix>,
    pub description: Option<String>,
    pub solution_stack_name: Option<String>,
    pub template_name: Option<String>,
    pub tier: Option<Tier>,
    pub tags: Vec<Tag>,
    pub option_settings: Vec<OptionSetting>,
    pub options_to_remove: Vec<OptionSpecifier>,
    /// Version a fresh environment starts with before any deploy.
    pub version_label: Option<VersionLabel>,
    /// Platform request fields greenswap does not model, sent as given.
    pub extra_fields: BTreeMap<String, serde_json::Value>,
}

impl EnvironmentOptions {
    pub fn with_stack(stack: impl Into<String>) -> Self {
        Self {
            solution_stack_name: Some(stack.into()),
            ..Default::default()
        }
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template_name: Some(template.into()),
            ..Default::default()
        }
    }

    pub fn cname_prefix(mut self, prefix: CnamePrefix) -> Self {
        self.cname_prefix = Some(prefix);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn option(
        mut self,
        namespace: impl Into<String>,
        option_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.option_settings.push(OptionSetting {
            namespace: namespace.into(),
            option_name: option_name.into(),
            value: value.into(),
        });
        self
    }

    /// Solution stack and template are mutually exclusive.
    pub fn is_conflicting(&self) -> bool {
        self.solution_stack_name.is_some() && self.template_name.is_some()
    }

    /// Best-effort configuration read back from a running environment.
    pub(crate) fn observed(env: &EnvironmentDescription) -> Self {
        Self {
            description: env.description.clone(),
            solution_stack_name: env.solution_stack_name.clone(),
            template_name: if env.solution_stack_name.is_some() {
                None
            } else {
                env.template_name.clone()
            },
            tier: env.tier.clone(),
            ..Default::default()
        }
    }

    /// Request creating `name`. The CNAME prefix is only claimed when
    /// `claim_alias` is set; a blue-green sibling launches without it.
    pub(crate) fn create_request(
        &self,
        application: &ApplicationName,
        name: PhysicalName,
        version: Option<VersionLabel>,
        claim_alias: bool,
    ) -> CreateEnvironmentRequest {
        CreateEnvironmentRequest {
            application_name: application.clone(),
            environment_name: name,
            version_label: version,
            description: self.description.clone(),
            solution_stack_name: self.solution_stack_name.clone(),
            template_name: self.template_name.clone(),
            cname_prefix: if claim_alias {
                self.cname_prefix.as_ref().map(|p| p.as_str().to_string())
            } else {
                None
            },
            tags: self.tags.clone(),
            option_settings: self.option_settings.clone(),
            options_to_remove: self.options_to_remove.clone(),
            tier: self.tier.clone(),
            extra_fields: self.extra_fields.clone(),
        }
    }

    pub(crate) fn update_request(
        &self,
        name: PhysicalName,
        version: Option<VersionLabel>,
    ) -> UpdateEnvironmentRequest {
        UpdateEnvironmentRequest {
            environment_name: name,
            version_label: version,
            description: self.description.clone(),
            template_name: self.template_name.clone(),
            tags: self.tags.clone(),
            option_settings: self.option_settings.clone(),
            options_to_remove: self.options_to_remove.clone(),
            tier: self.tier.clone(),
            extra_fields: self.extra_fields.clone(),
        }
    }
}
