// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup and a deployer wired to the in-memory platform.

use greenswap::platform::MemoryPlatform;
use greenswap::types::{ApplicationName, CnamePrefix, EnvironmentName};
use greenswap::{Application, DeploySettings, Deployer, Environment, EnvironmentOptions};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

pub const STACK: &str = "64bit Amazon Linux 2023 v6.1.0 running Node.js 20";

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("greenswap=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Short timings so paused-time tests advance quickly.
#[allow(dead_code)]
pub fn settings() -> DeploySettings {
    DeploySettings {
        poll_interval: Duration::from_secs(1),
        health_timeout: Duration::from_secs(60),
        status_timeout: Duration::from_secs(60),
        verify_timeout: Duration::from_secs(5),
        cleanup_journal: None,
    }
}

#[allow(dead_code)]
pub fn deployer() -> (Arc<MemoryPlatform>, Deployer<MemoryPlatform>) {
    deployer_with(settings())
}

#[allow(dead_code)]
pub fn deployer_with(settings: DeploySettings) -> (Arc<MemoryPlatform>, Deployer<MemoryPlatform>) {
    init_tracing();
    let platform = Arc::new(MemoryPlatform::new());
    let deployer = Deployer::new(platform.clone(), settings);
    (platform, deployer)
}

#[allow(dead_code)]
pub fn web_options() -> EnvironmentOptions {
    EnvironmentOptions::with_stack(STACK)
        .cname_prefix(CnamePrefix::new("demo-web").unwrap())
        .option("aws:autoscaling:asg", "MinSize", "1")
}

/// Created application with a `web` environment handle.
#[allow(dead_code)]
pub async fn demo_app(
    deployer: &Deployer<MemoryPlatform>,
) -> (Application<MemoryPlatform>, Environment<MemoryPlatform>) {
    let application = deployer
        .create_application(ApplicationName::new("demo"), Some("demo app".to_string()))
        .await
        .unwrap();
    let environment = application.environment(EnvironmentName::new("web").unwrap(), web_options());
    (application, environment)
}
