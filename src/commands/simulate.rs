// ABOUTME: Simulate command implementation.
// ABOUTME: Drives a sequence of blue-green deploys against the in-memory platform.

use greenswap::config::EnvironmentManifest;
use greenswap::deploy::DeployOutcome;
use greenswap::environment::EnvironmentEvent;
use greenswap::error::{Error, Result};
use greenswap::output::Output;
use greenswap::platform::{Health, LaunchScript, MemoryPlatform};
use greenswap::types::{EnvironmentName, VersionLabel};
use greenswap::{Deployer, Manifest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::load_manifest;

pub struct SimulateArgs {
    pub file: Option<PathBuf>,
    pub environment: Option<String>,
    pub versions: Vec<String>,
    pub fail_health: bool,
    pub interval: Duration,
    pub health_timeout: Duration,
    pub keep: bool,
}

pub async fn simulate(args: SimulateArgs, mut output: Output) -> Result<()> {
    let (_, manifest) = load_manifest(args.file.as_deref())?;
    let declared = select_environment(&manifest, args.environment.as_deref())?;
    let versions = args
        .versions
        .iter()
        .map(|label| {
            VersionLabel::parse(label)
                .ok_or_else(|| Error::InvalidConfig("version label cannot be empty".to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut settings = manifest.deploy.clone();
    settings.poll_interval = args.interval;
    settings.health_timeout = args.health_timeout;

    output.start_timer();
    let platform = Arc::new(MemoryPlatform::new());
    let deployer = Deployer::new(platform.clone(), settings);

    let application = deployer.application_from(&manifest);
    application.initialize().await?;
    output.progress(&format!("Application {} ready", application.name()));

    let environment = application.environment_from(declared)?;
    let mut events = environment.subscribe();

    let mut rolled_back = 0;
    for (index, version) in versions.iter().enumerate() {
        application
            .publish_version(version.clone(), None, None)
            .await?;

        let last = index + 1 == versions.len();
        if args.fail_health && last && index > 0 {
            platform.script_next_launch(LaunchScript::unhealthy(Health::Red));
        }

        output.progress(&format!("Deploying {version} to {}...", environment.name()));
        match environment.deploy(version).await {
            Ok(DeployOutcome::Created { environment }) => {
                output.progress(&format!("  created {environment}"));
            }
            Ok(DeployOutcome::Swapped { previous, current }) => {
                output.progress(&format!("  swapped {previous} -> {current}"));
            }
            Err(Error::Deploy(e)) if e.production_unchanged() => {
                rolled_back += 1;
                output.warning(&e.to_string());
            }
            Err(e) => return Err(e),
        }
        report_events(&mut events, &output);
    }

    deployer.flush().await;
    if let Some(current) = environment.info().await? {
        output.progress(&format!(
            "{} serves {} as {}",
            current.environment_name,
            current
                .version_label
                .as_ref()
                .map_or("no version", |label| label.as_str()),
            current.cname.as_deref().unwrap_or("no CNAME"),
        ));
    }

    if !args.keep {
        environment.remove().await?;
        application.remove().await?;
        output.progress(&format!("Removed {}", application.name()));
    }

    let deployed = versions.len() - rolled_back;
    output.success(&format!(
        "Simulated {} deploy(s) of {}/{}, {rolled_back} rolled back",
        deployed,
        application.name(),
        environment.name()
    ));
    Ok(())
}

fn select_environment<'a>(
    manifest: &'a Manifest,
    requested: Option<&str>,
) -> Result<&'a EnvironmentManifest> {
    let Some(requested) = requested else {
        return manifest
            .environments
            .first()
            .ok_or_else(|| Error::InvalidConfig("manifest declares no environments".to_string()));
    };

    let unknown = || Error::UnknownEnvironment {
        application: manifest.name.to_string(),
        environment: requested.to_string(),
    };
    let name = EnvironmentName::new(requested).map_err(|_| unknown())?;
    manifest.environment(&name).ok_or_else(unknown)
}

fn report_events(events: &mut broadcast::Receiver<EnvironmentEvent>, output: &Output) {
    while let Ok(event) = events.try_recv() {
        match event {
            EnvironmentEvent::Ready { environment } => {
                output.progress(&format!("  {environment} is ready"));
            }
            EnvironmentEvent::CleanupQueued {
                environment,
                reason,
            } => {
                output.progress(&format!("  terminating {environment} ({reason:?})"));
            }
            EnvironmentEvent::RolledBack { live, abandoned } => {
                output.progress(&format!("  kept {live}, abandoned {abandoned}"));
            }
            EnvironmentEvent::Deployed { .. } => {}
        }
    }
}
