// ABOUTME: Source bundle reference parsing and validation.
// ABOUTME: Handles formats like bucket/key.zip and s3://bucket/path/key.zip.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseBundleRefError {
    #[error("bundle reference cannot be empty")]
    Empty,

    #[error("bundle reference is missing an object key: {0}")]
    MissingKey(String),

    #[error("invalid character in bundle bucket: {0}")]
    InvalidChar(char),
}

/// Location of a deployable artifact in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleRef {
    #[serde(rename = "S3Bucket")]
    bucket: String,
    #[serde(rename = "S3Key")]
    key: String,
}

impl BundleRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, ParseBundleRefError> {
        let input = input.trim();
        let input = input.strip_prefix("s3://").unwrap_or(input);
        if input.is_empty() {
            return Err(ParseBundleRefError::Empty);
        }

        let (bucket, key) = input
            .split_once('/')
            .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
            .ok_or_else(|| ParseBundleRefError::MissingKey(input.to_string()))?;

        // Bucket names: lowercase letters, digits, dots, hyphens
        for c in bucket.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '.' && c != '-' {
                return Err(ParseBundleRefError::InvalidChar(c));
            }
        }

        Ok(Self::new(bucket, key))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for BundleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
