// ABOUTME: Manifest scaffolding for new projects.
// ABOUTME: Creates greenswap.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ApplicationName, CnamePrefix};

use super::CONFIG_FILENAME;

const DEFAULT_APPLICATION: &str = "my-app";
const DEFAULT_STACK: &str = "64bit Amazon Linux 2023 v6.1.0 running Node.js 20";

pub fn init_config(dir: &Path, application: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let name = application.unwrap_or(DEFAULT_APPLICATION);
    let application = ApplicationName::parse(name)
        .ok_or_else(|| Error::InvalidConfig("application name cannot be empty".to_string()))?;
    let prefix = CnamePrefix::new(&format!("{application}-web"))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, generate_template_yaml(&application, &prefix))?;

    Ok(())
}

fn generate_template_yaml(application: &ApplicationName, prefix: &CnamePrefix) -> String {
    format!(
        r#"name: {application}
description: {application} application
environments:
  - name: web
    CNAMEPrefix: {prefix}
    solutionStackName: {DEFAULT_STACK}
    tier: WebServer
    aws:autoscaling:asg:
      MinSize: 1
      MaxSize: 2
    # Values can come from the environment:
    # aws:elasticbeanstalk:application:environment:
    #   DATABASE_URL: {{ env: DATABASE_URL }}
deploy:
  poll_interval: 10s
  health_timeout: 10m
  verify_timeout: 30s
  # cleanup_journal: .greenswap/cleanup.jsonl
"#
    )
}
