// ABOUTME: A logical environment bound to a rotating physical environment.
// ABOUTME: Creation, update, blue-green deploy, teardown and state waits.

mod events;
mod options;

pub use events::EnvironmentEvent;
pub use options::EnvironmentOptions;

use parking_lot::{Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::deploy::{
    CleanupIntent, CleanupReason, DeployError, DeployOutcome, Deployment, detect_orphans,
};
use crate::deployer::Shared;
use crate::error::{Error, Result};
use crate::platform::{
    DescribeEnvironmentsRequest, EnvironmentDescription, EnvironmentStatus, Health,
    PlatformClient, TerminateEnvironmentRequest,
};
use crate::poll::{Goal, wait_for_state};
use crate::types::{ApplicationName, CnamePrefix, EnvironmentName, PhysicalName, VersionLabel};

/// Handle on one logical environment of an application.
///
/// The logical name is stable while the physical environment behind it is
/// replaced on every blue-green deploy. The handle tracks the current
/// physical name; when it has none it discovers it from the platform.
pub struct Environment<P: ?Sized> {
    shared: Shared<P>,
    application: ApplicationName,
    name: EnvironmentName,
    options: RwLock<EnvironmentOptions>,
    current: Mutex<Option<PhysicalName>>,
    events: broadcast::Sender<EnvironmentEvent>,
}

impl<P: ?Sized> std::fmt::Debug for Environment<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("application", &self.application)
            .field("name", &self.name)
            .field("current", &*self.current.lock())
            .finish()
    }
}

impl<P> Environment<P>
where
    P: PlatformClient + ?Sized + 'static,
{
    pub(crate) fn new(
        shared: Shared<P>,
        application: ApplicationName,
        name: EnvironmentName,
        options: EnvironmentOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(events::EVENT_CAPACITY);
        Self {
            shared,
            application,
            name,
            options: RwLock::new(options),
            current: Mutex::new(None),
            events,
        }
    }

    pub fn name(&self) -> &EnvironmentName {
        &self.name
    }

    pub fn application(&self) -> &ApplicationName {
        &self.application
    }

    /// The declared configuration.
    pub fn options(&self) -> EnvironmentOptions {
        self.options.read().clone()
    }

    /// The tracked current physical name, without asking the platform.
    pub fn current_name(&self) -> Option<PhysicalName> {
        self.current.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EnvironmentEvent> {
        self.events.subscribe()
    }

    pub(crate) fn set_current(&self, name: PhysicalName) {
        *self.current.lock() = Some(name);
    }

    fn clear_current(&self) {
        *self.current.lock() = None;
    }

    fn emit(&self, event: EnvironmentEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Non-terminated physical environments of this slot.
    async fn slot_environments(&self) -> Result<Vec<EnvironmentDescription>> {
        let request = DescribeEnvironmentsRequest::for_application(&self.application);
        let environments = self.shared.platform.describe_environments(&request).await?;
        Ok(environments
            .into_iter()
            .filter(|env| self.name.owns(&env.environment_name) && !env.status.is_gone())
            .collect())
    }

    /// The current physical name, discovering it when none is tracked.
    pub async fn discover(&self) -> Result<Option<PhysicalName>> {
        let prefix = self.options.read().cname_prefix.clone();
        self.discover_by(prefix.as_ref()).await
    }

    async fn discover_by(&self, prefix: Option<&CnamePrefix>) -> Result<Option<PhysicalName>> {
        let tracked = self.current_name();
        if tracked.is_some() {
            return Ok(tracked);
        }

        let live = self.slot_environments().await?;
        let found = pick_current(prefix, &live).map(|env| env.environment_name.clone());

        if let Some(name) = &found {
            tracing::debug!(
                application = %self.application,
                environment = %self.name,
                physical = %name,
                "discovered current environment"
            );
            self.set_current(name.clone());
        }
        Ok(found)
    }

    /// Current physical name, dropping it if the platform reports it gone.
    async fn live_current(&self) -> Result<Option<PhysicalName>> {
        let prefix = self.options.read().cname_prefix.clone();
        self.live_current_by(prefix.as_ref()).await
    }

    async fn live_current_by(&self, prefix: Option<&CnamePrefix>) -> Result<Option<PhysicalName>> {
        let Some(name) = self.discover_by(prefix).await? else {
            return Ok(None);
        };

        let described = self
            .shared
            .platform
            .describe_environment(&self.application, &name)
            .await?;
        match described {
            Some(env) if env.status.is_gone() => {
                tracing::debug!(physical = %name, status = %env.status, "tracked environment is gone");
                self.clear_current();
                self.discover_by(prefix).await
            }
            // Absence may just be eventual consistency
            _ => Ok(Some(name)),
        }
    }

    fn watch_ready(&self, environment: PhysicalName) {
        let platform = self.shared.platform.clone();
        let application = self.application.clone();
        let events = self.events.clone();
        let options = self.shared.settings.poll(None);

        tokio::spawn(async move {
            let goal = Goal::Status(EnvironmentStatus::Ready);
            match wait_for_state(&*platform, &application, &environment, goal, &options).await {
                Ok(_) => {
                    tracing::info!(physical = %environment, "environment is ready");
                    let _ = events.send(EnvironmentEvent::Ready { environment });
                }
                Err(e) => {
                    tracing::debug!(physical = %environment, "stopped waiting for ready: {e}");
                }
            }
        });
    }

    /// Description of the current physical environment.
    pub async fn info(&self) -> Result<Option<EnvironmentDescription>> {
        let Some(current) = self.discover().await? else {
            return Ok(None);
        };
        Ok(self
            .shared
            .platform
            .describe_environment(&self.application, &current)
            .await?)
    }

    /// Apply `options` and store them as the declared configuration.
    ///
    /// Creates a physical environment claiming the CNAME prefix when none
    /// exists, otherwise updates the current one. Updates never carry the
    /// application, solution stack or CNAME prefix. The declared
    /// configuration only changes once the platform accepted it.
    pub async fn initialize(&self, options: EnvironmentOptions) -> Result<EnvironmentDescription> {
        if options.is_conflicting() {
            return Err(Error::ConfigConflict(self.name.to_string()));
        }

        let _gate = self
            .shared
            .gate
            .acquire(&self.application, &self.name, "initialize")?;
        let platform = &*self.shared.platform;
        let version = options.version_label.clone();

        let description = match self.live_current_by(options.cname_prefix.as_ref()).await? {
            None => {
                let physical = self.name.generate_physical();
                let request =
                    options.create_request(&self.application, physical.clone(), version, true);
                tracing::info!(
                    application = %self.application,
                    physical = %physical,
                    "creating environment"
                );
                let created = platform.create_environment(&request).await?;
                self.set_current(physical);
                created
            }
            Some(current) => {
                let request = options.update_request(current.clone(), version);
                tracing::info!(
                    application = %self.application,
                    physical = %current,
                    "updating environment"
                );
                platform.update_environment(&request).await?
            }
        };

        *self.options.write() = options;
        self.watch_ready(description.environment_name.clone());
        Ok(description)
    }

    /// Deploy `version` into this slot.
    ///
    /// An empty slot gets one new environment holding the alias. Otherwise a
    /// sibling is created, health-checked, swapped in and verified; the old
    /// environment is queued for termination. Any failure after the sibling
    /// exists queues the sibling for termination and leaves production on
    /// the old environment.
    pub async fn deploy(&self, version: &VersionLabel) -> Result<DeployOutcome> {
        let options = self.options();
        if options.is_conflicting() {
            return Err(Error::ConfigConflict(self.name.to_string()));
        }

        let _gate = self
            .shared
            .gate
            .acquire(&self.application, &self.name, version.as_str())?;
        let platform = &*self.shared.platform;
        let settings = &self.shared.settings;
        let cleanup = &self.shared.cleanup;

        let Some(old) = self.live_current().await? else {
            let deployment = Deployment::new(
                self.application.clone(),
                self.name.clone(),
                version.clone(),
                options,
            );
            let outcome = deployment.provision(platform).await?.adopt().finish(cleanup);
            self.set_current(outcome.current().clone());
            self.watch_ready(outcome.current().clone());
            self.emit(EnvironmentEvent::Deployed {
                version: version.clone(),
                outcome: outcome.clone(),
            });
            return Ok(outcome);
        };

        let deployment = Deployment::new_update(
            self.application.clone(),
            self.name.clone(),
            version.clone(),
            options,
            old.clone(),
        );
        let staged = deployment.provision(platform).await?;

        let checked = match staged
            .health_check(platform, &settings.health_poll())
            .await
        {
            Ok(checked) => checked,
            Err((staged, cause)) => {
                return Err(self.rolled_back(old, staged.abandon(cleanup), cause));
            }
        };

        let cut = match checked.swap(platform).await {
            Ok(cut) => cut,
            Err((checked, cause)) => {
                return Err(self.rolled_back(old, checked.abandon(cleanup), cause));
            }
        };

        let completed = match cut.verify(platform, settings.verify_timeout).await {
            Ok(completed) => completed,
            Err((cut, cause)) => match cut.revert(platform).await {
                Ok(reverted) => {
                    return Err(self.rolled_back(old, reverted.abandon(cleanup), cause));
                }
                Err((cut, source)) => {
                    let live = cut.new_environment().clone();
                    tracing::error!(
                        application = %self.application,
                        live = %live,
                        previous = %old,
                        "failed to swap CNAMEs back: {source}"
                    );
                    self.set_current(live.clone());
                    return Err(DeployError::RollbackFailed {
                        live,
                        previous: old,
                        cause: Box::new(cause),
                        source,
                    }
                    .into());
                }
            },
        };

        let outcome = completed.finish(cleanup);
        self.set_current(outcome.current().clone());
        tracing::info!(
            application = %self.application,
            environment = %self.name,
            physical = %outcome.current(),
            version = %version,
            "deploy complete"
        );
        self.emit(EnvironmentEvent::CleanupQueued {
            environment: old,
            reason: CleanupReason::Superseded,
        });
        self.emit(EnvironmentEvent::Deployed {
            version: version.clone(),
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    fn rolled_back(&self, live: PhysicalName, abandoned: PhysicalName, cause: DeployError) -> Error {
        tracing::warn!(
            application = %self.application,
            live = %live,
            abandoned = %abandoned,
            "deploy failed, rolled back: {cause}"
        );
        self.emit(EnvironmentEvent::CleanupQueued {
            environment: abandoned.clone(),
            reason: CleanupReason::Abandoned,
        });
        self.emit(EnvironmentEvent::RolledBack {
            live: live.clone(),
            abandoned: abandoned.clone(),
        });
        DeployError::RolledBack {
            live,
            abandoned,
            cause: Box::new(cause),
        }
        .into()
    }

    /// Terminate the current physical environment and wait until it is
    /// `Terminated`. `None` when nothing was live.
    pub async fn remove(&self) -> Result<Option<EnvironmentDescription>> {
        let _gate = self
            .shared
            .gate
            .acquire(&self.application, &self.name, "remove")?;

        let Some(current) = self.live_current().await? else {
            return Ok(None);
        };

        tracing::info!(application = %self.application, physical = %current, "terminating environment");
        let request = TerminateEnvironmentRequest::new(current.clone());
        match self.shared.platform.terminate_environment(&request).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                self.clear_current();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let terminated = wait_for_state(
            &*self.shared.platform,
            &self.application,
            &current,
            Goal::Status(EnvironmentStatus::Terminated),
            &self.shared.settings.poll(None),
        )
        .await?;
        self.clear_current();
        Ok(Some(terminated))
    }

    /// Wait until the current physical environment has status `goal`.
    /// `None` falls back to the configured status timeout.
    pub async fn wait_until_status(
        &self,
        goal: EnvironmentStatus,
        timeout: Option<Duration>,
    ) -> Result<EnvironmentDescription> {
        self.wait_until(Goal::Status(goal), timeout).await
    }

    /// Wait until the current physical environment has health `goal`.
    pub async fn wait_until_health(
        &self,
        goal: Health,
        timeout: Option<Duration>,
    ) -> Result<EnvironmentDescription> {
        self.wait_until(Goal::Health(goal), timeout).await
    }

    async fn wait_until(&self, goal: Goal, timeout: Option<Duration>) -> Result<EnvironmentDescription> {
        let current = self
            .discover()
            .await?
            .ok_or_else(|| Error::NotProvisioned(self.name.to_string()))?;

        Ok(wait_for_state(
            &*self.shared.platform,
            &self.application,
            &current,
            goal,
            &self.shared.settings.poll(timeout),
        )
        .await?)
    }

    /// Live physical environments of this slot other than the current one.
    pub async fn orphans(&self) -> Result<Vec<EnvironmentDescription>> {
        let current = self.discover().await?;
        let live = self.slot_environments().await?;
        Ok(detect_orphans(&self.name, current.as_ref(), &live))
    }

    /// Queue termination of every orphan. Returns their names.
    pub async fn reconcile(&self) -> Result<Vec<PhysicalName>> {
        let _gate = self
            .shared
            .gate
            .acquire(&self.application, &self.name, "reconcile")?;

        let orphans = self.orphans().await?;
        let mut queued = Vec::with_capacity(orphans.len());
        for orphan in orphans {
            let name = orphan.environment_name;
            self.shared.cleanup.enqueue(CleanupIntent::new(
                self.application.clone(),
                name.clone(),
                CleanupReason::Orphaned,
            ));
            self.emit(EnvironmentEvent::CleanupQueued {
                environment: name.clone(),
                reason: CleanupReason::Orphaned,
            });
            queued.push(name);
        }
        Ok(queued)
    }
}

/// Pick the physical environment holding traffic among a slot's live ones.
///
/// With a declared prefix, the one answering on it. Otherwise, or when none
/// does, the oldest: an in-flight sibling is always newer.
pub(crate) fn pick_current<'a>(
    prefix: Option<&CnamePrefix>,
    live: &'a [EnvironmentDescription],
) -> Option<&'a EnvironmentDescription> {
    prefix
        .and_then(|prefix| {
            live.iter()
                .find(|env| env.cname.as_deref().is_some_and(|cname| prefix.matches(cname)))
        })
        .or_else(|| live.iter().min_by_key(|env| env.date_created))
}

/// The alias a slot answers on, read back from its live environments.
///
/// Every physical environment gets a CNAME of its own name unless it holds
/// the alias, so the one label that names no live environment is the alias.
pub(crate) fn observed_prefix(live: &[EnvironmentDescription]) -> Option<CnamePrefix> {
    live.iter()
        .filter_map(|env| env.cname.as_deref()?.split('.').next())
        .find(|label| {
            !live
                .iter()
                .any(|env| label.eq_ignore_ascii_case(env.environment_name.as_str()))
        })
        .and_then(|label| CnamePrefix::new(label).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn described(name: &str, cname: &str, created_secs: i64) -> EnvironmentDescription {
        let at = Utc.timestamp_opt(created_secs, 0).unwrap();
        EnvironmentDescription {
            environment_name: PhysicalName::new(name),
            environment_id: format!("e-{name}"),
            application_name: ApplicationName::new("demo"),
            version_label: None,
            solution_stack_name: None,
            template_name: None,
            description: None,
            cname: Some(cname.to_string()),
            status: EnvironmentStatus::Ready,
            health: Health::Green,
            tier: None,
            date_created: at,
            date_updated: at,
        }
    }

    #[test]
    fn prefix_match_wins_over_age() {
        let live = vec![
            described("web-1700000000001", "web-1700000000001.example.com", 1),
            described("web-1700000000002", "shop.example.com", 2),
        ];
        let prefix = CnamePrefix::new("shop").unwrap();

        let picked = pick_current(Some(&prefix), &live).unwrap();
        assert_eq!(picked.environment_name.as_str(), "web-1700000000002");
    }

    #[test]
    fn oldest_without_prefix() {
        let live = vec![
            described("web-1700000000002", "b.example.com", 2),
            described("web-1700000000001", "a.example.com", 1),
        ];

        let picked = pick_current(None, &live).unwrap();
        assert_eq!(picked.environment_name.as_str(), "web-1700000000001");
    }

    #[test]
    fn alias_is_the_label_naming_no_live_environment() {
        let live = vec![
            described("web-1700000000001", "web-1700000000002.example.com", 1),
            described("web-1700000000002", "shop.example.com", 2),
        ];
        assert_eq!(observed_prefix(&live).unwrap().as_str(), "shop");

        let unaliased = vec![described("web-1700000000001", "web-1700000000001.example.com", 1)];
        assert!(observed_prefix(&unaliased).is_none());
    }
}
