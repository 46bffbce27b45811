// ABOUTME: Polls remote environment state until a field reaches a goal value.
// ABOUTME: Bounded by an optional timeout; dropping the future stops polling.

use snafu::{ResultExt, Snafu};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::platform::{
    EnvironmentDescription, EnvironmentStatus, Health, PlatformClient, PlatformError,
};
use crate::types::{ApplicationName, PhysicalName};

/// Default interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Timing of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// `None` or zero waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn limit(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }
}

/// Target value for one observed field of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Status(EnvironmentStatus),
    Health(Health),
}

impl Goal {
    /// Name of the watched field.
    pub fn field(&self) -> &'static str {
        match self {
            Goal::Status(_) => "status",
            Goal::Health(_) => "health",
        }
    }

    pub fn is_met(&self, env: &EnvironmentDescription) -> bool {
        match self {
            Goal::Status(status) => env.status == *status,
            Goal::Health(health) => env.health == *health,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Status(status) => write!(f, "{status}"),
            Goal::Health(health) => write!(f, "{health}"),
        }
    }
}

/// Polling failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WaitError {
    #[snafu(display("timed out after {waited:?} waiting for {field} to become {goal}"))]
    Timeout {
        field: &'static str,
        goal: String,
        waited: Duration,
    },

    #[snafu(display("state query failed: {source}"))]
    Query { source: PlatformError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitErrorKind {
    /// The goal was not reached in time.
    Timeout,
    /// The platform rejected a describe call.
    QueryFailed,
}

impl WaitError {
    pub fn kind(&self) -> WaitErrorKind {
        match self {
            WaitError::Timeout { .. } => WaitErrorKind::Timeout,
            WaitError::Query { .. } => WaitErrorKind::QueryFailed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == WaitErrorKind::Timeout
    }
}

/// Query repeatedly until `done` accepts a result.
///
/// The first query runs immediately, later ones every `options.interval`.
/// A query yielding `None` (resource not visible yet) keeps polling; a query
/// error ends polling at once. `field` and `goal` only label the timeout
/// error.
pub async fn poll_until<T, Q, Fut, P>(
    options: &PollOptions,
    field: &'static str,
    goal: &str,
    mut query: Q,
    mut done: P,
) -> Result<T, WaitError>
where
    Q: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PlatformError>>,
    P: FnMut(&T) -> bool,
{
    let interval = options.interval;
    let attempt = async move {
        loop {
            match query().await {
                Ok(Some(value)) if done(&value) => return Ok(value),
                Ok(_) => {}
                Err(err) => return Err(err),
            }
            tokio::time::sleep(interval).await;
        }
    };

    let outcome = match options.limit() {
        None => attempt.await,
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return TimeoutSnafu {
                    field,
                    goal,
                    waited: limit,
                }
                .fail();
            }
        },
    };
    outcome.context(QuerySnafu)
}

/// Wait until the named field of a physical environment equals `goal`.
pub async fn wait_for_state<P>(
    platform: &P,
    application: &ApplicationName,
    environment: &PhysicalName,
    goal: Goal,
    options: &PollOptions,
) -> Result<EnvironmentDescription, WaitError>
where
    P: PlatformClient + ?Sized,
{
    tracing::debug!(
        application = %application,
        environment = %environment,
        field = goal.field(),
        goal = %goal,
        "waiting for environment state"
    );

    let goal_label = goal.to_string();
    let described = poll_until(
        options,
        goal.field(),
        &goal_label,
        || async {
            let described = platform.describe_environment(application, environment).await?;
            if let Some(env) = &described {
                tracing::debug!(
                    environment = %environment,
                    status = %env.status,
                    health = %env.health,
                    "polled environment"
                );
            }
            Ok::<_, PlatformError>(described)
        },
        |env| goal.is_met(env),
    )
    .await?;

    tracing::debug!(environment = %environment, goal = %goal, "environment reached goal");
    Ok(described)
}
