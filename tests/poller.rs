// ABOUTME: Integration tests for waiting on environment state.
// ABOUTME: Exercises convergence, timeouts, query failures and cancellation.

mod support;

use greenswap::platform::*;
use greenswap::poll::{Goal, PollOptions, WaitErrorKind, wait_for_state};
use greenswap::types::{ApplicationName, PhysicalName};
use std::time::Duration;

async fn launched(platform: &MemoryPlatform, script: LaunchScript) -> PhysicalName {
    support::init_tracing();
    platform
        .create_application(&CreateApplicationRequest {
            application_name: ApplicationName::new("demo"),
            description: None,
        })
        .await
        .unwrap();
    platform.script_next_launch(script);
    let name = PhysicalName::new("web-1700000000000");
    platform
        .create_environment(&CreateEnvironmentRequest {
            application_name: ApplicationName::new("demo"),
            environment_name: name.clone(),
            version_label: None,
            description: None,
            solution_stack_name: Some(support::STACK.to_string()),
            template_name: None,
            cname_prefix: None,
            tags: vec![],
            option_settings: vec![],
            options_to_remove: vec![],
            tier: None,
            extra_fields: Default::default(),
        })
        .await
        .unwrap();
    name
}

fn options(timeout: Option<Duration>) -> PollOptions {
    PollOptions::new(Duration::from_secs(10), timeout)
}

#[tokio::test(start_paused = true)]
async fn waits_until_environment_is_ready() {
    let platform = MemoryPlatform::new();
    let name = launched(&platform, LaunchScript::healthy().settle_after(3)).await;
    let started = tokio::time::Instant::now();

    let env = wait_for_state(
        &platform,
        &ApplicationName::new("demo"),
        &name,
        Goal::Status(EnvironmentStatus::Ready),
        &options(Some(Duration::from_secs(600))),
    )
    .await
    .unwrap();

    assert_eq!(env.status, EnvironmentStatus::Ready);
    assert_eq!(env.health, Health::Green);
    // Immediate first query, then two intervals
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert_eq!(platform.count(Operation::DescribeEnvironments), 3);
}

#[tokio::test(start_paused = true)]
async fn health_that_never_turns_green_times_out() {
    let platform = MemoryPlatform::new();
    let name = launched(&platform, LaunchScript::unhealthy(Health::Yellow)).await;

    let err = wait_for_state(
        &platform,
        &ApplicationName::new("demo"),
        &name,
        Goal::Health(Health::Green),
        &options(Some(Duration::from_secs(60))),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), WaitErrorKind::Timeout);
    let message = err.to_string();
    assert!(message.contains("health"));
    assert!(message.contains("Green"));
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_waits_indefinitely() {
    let platform = MemoryPlatform::new();
    let name = launched(&platform, LaunchScript::healthy().settle_after(50)).await;

    let env = wait_for_state(
        &platform,
        &ApplicationName::new("demo"),
        &name,
        Goal::Status(EnvironmentStatus::Ready),
        &options(Some(Duration::ZERO)),
    )
    .await
    .unwrap();

    assert_eq!(env.status, EnvironmentStatus::Ready);
}

#[tokio::test(start_paused = true)]
async fn failing_query_surfaces_immediately() {
    let platform = MemoryPlatform::new();
    let name = launched(&platform, LaunchScript::healthy()).await;
    platform.fail_next(
        Operation::DescribeEnvironments,
        PlatformError::AccessDenied("no describe".to_string()),
    );

    let err = wait_for_state(
        &platform,
        &ApplicationName::new("demo"),
        &name,
        Goal::Status(EnvironmentStatus::Ready),
        &options(None),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), WaitErrorKind::QueryFailed);
    assert_eq!(platform.count(Operation::DescribeEnvironments), 1);
}

#[tokio::test(start_paused = true)]
async fn absent_environment_keeps_polling_until_timeout() {
    let platform = MemoryPlatform::new();
    launched(&platform, LaunchScript::healthy()).await;

    let err = wait_for_state(
        &platform,
        &ApplicationName::new("demo"),
        &PhysicalName::new("web-not-there"),
        Goal::Status(EnvironmentStatus::Ready),
        &options(Some(Duration::from_secs(35))),
    )
    .await
    .unwrap_err();

    assert!(err.is_timeout());
    // Queries at 0, 10, 20 and 30 seconds
    assert_eq!(platform.count(Operation::DescribeEnvironments), 4);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_wait_stops_polling() {
    let platform = MemoryPlatform::new();
    let name = launched(&platform, LaunchScript::unhealthy(Health::Red)).await;
    let application = ApplicationName::new("demo");
    let goal = Goal::Health(Health::Green);
    let options = options(None);

    let wait = wait_for_state(&platform, &application, &name, goal, &options);
    assert!(
        tokio::time::timeout(Duration::from_secs(25), wait)
            .await
            .is_err()
    );
    let polled = platform.count(Operation::DescribeEnvironments);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(platform.count(Operation::DescribeEnvironments), polled);
}
