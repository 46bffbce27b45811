// ABOUTME: Option values with environment variable interpolation.
// ABOUTME: Handles scalar literals and references to environment variables.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A manifest option value: a literal or a reference to a process
/// environment variable with an optional fallback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEnvValue")]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        var: String,
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn literal(value: impl Into<String>) -> Self {
        EnvValue::Literal(value.into())
    }

    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

pub fn resolve_env_map(map: &BTreeMap<String, EnvValue>) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}

// YAML option values are often bare numbers or booleans (`MinSize: 1`).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnvValue {
    Text(String),
    Number(serde_yaml::Number),
    Flag(bool),
    FromEnv {
        env: String,
        #[serde(default)]
        default: Option<Scalar>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_yaml::Number),
    Flag(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

impl From<RawEnvValue> for EnvValue {
    fn from(raw: RawEnvValue) -> Self {
        match raw {
            RawEnvValue::Text(s) => EnvValue::Literal(s),
            RawEnvValue::Number(n) => EnvValue::Literal(n.to_string()),
            RawEnvValue::Flag(b) => EnvValue::Literal(b.to_string()),
            RawEnvValue::FromEnv { env, default } => EnvValue::FromEnv {
                var: env,
                default: default.map(Scalar::into_string),
            },
        }
    }
}
