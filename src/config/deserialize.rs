// ABOUTME: Custom serde deserializers for manifest types.
// ABOUTME: Handles application names, environment names, CNAME prefixes, tiers and tags.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::platform::{Tag, Tier};
use crate::types::{ApplicationName, CnamePrefix, EnvironmentName};

pub fn deserialize_application_name<'de, D>(deserializer: D) -> Result<ApplicationName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ApplicationName::parse(&s)
        .ok_or_else(|| serde::de::Error::custom("application name cannot be empty"))
}

pub fn deserialize_environment_name<'de, D>(deserializer: D) -> Result<EnvironmentName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    EnvironmentName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_cname_prefix_option<'de, D>(
    deserializer: D,
) -> Result<Option<CnamePrefix>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| CnamePrefix::new(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_tier_option<'de, D>(deserializer: D) -> Result<Option<Tier>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<TierEntry> = Option::deserialize(deserializer)?;
    Ok(opt.map(TierEntry::into_tier))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TierEntry {
    Simple(String),
    Detailed(Tier),
}

impl TierEntry {
    fn into_tier(self) -> Tier {
        match self {
            TierEntry::Simple(name) => Tier::named(name),
            TierEntry::Detailed(tier) => tier,
        }
    }
}

/// Tags as a `key: value` map or as the platform's `[{Key, Value}]` list.
pub fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match TagsEntry::deserialize(deserializer)? {
        TagsEntry::Map(tags) => tags,
        TagsEntry::List(tags) => tags.into_iter().map(|tag| (tag.key, tag.value)).collect(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsEntry {
    Map(BTreeMap<String, String>),
    List(Vec<Tag>),
}
