// ABOUTME: Validate command implementation.
// ABOUTME: Resolves every declared environment and prints what would be sent.

use greenswap::error::Result;
use greenswap::output::Output;
use std::path::Path;

use super::load_manifest;

pub fn validate(file: Option<&Path>, output: &Output) -> Result<()> {
    let (path, manifest) = load_manifest(file)?;
    output.progress(&format!("Manifest: {}", path.display()));
    output.progress(&format!("Application: {}", manifest.name));

    for env in &manifest.environments {
        let options = env.resolve()?;
        let platform = options
            .solution_stack_name
            .as_deref()
            .map(|stack| format!("stack {stack}"))
            .or_else(|| {
                options
                    .template_name
                    .as_deref()
                    .map(|template| format!("template {template}"))
            })
            .unwrap_or_else(|| "no stack or template".to_string());
        let alias = options
            .cname_prefix
            .as_ref()
            .map_or_else(|| "no CNAME prefix".to_string(), |p| format!("CNAME prefix {p}"));

        output.progress(&format!(
            "  {}: {platform}, {alias}, {} option(s), {} tag(s)",
            env.name,
            options.option_settings.len(),
            options.tags.len()
        ));
        if !options.extra_fields.is_empty() {
            let keys: Vec<&str> = options.extra_fields.keys().map(String::as_str).collect();
            output.progress(&format!("    passed through: {}", keys.join(", ")));
        }
        if options.solution_stack_name.is_none() && options.template_name.is_none() {
            output.warning(&format!(
                "environment {} declares neither solutionStackName nor templateName",
                env.name
            ));
        }
    }

    let settings = &manifest.deploy;
    output.progress(&format!(
        "Deploy: poll every {}, health timeout {}, verify timeout {}",
        humantime_serde::re::humantime::format_duration(settings.poll_interval),
        humantime_serde::re::humantime::format_duration(settings.health_timeout),
        humantime_serde::re::humantime::format_duration(settings.verify_timeout),
    ));

    output.success(&format!(
        "{} is valid ({} environment(s))",
        path.display(),
        manifest.environments.len()
    ));
    Ok(())
}
