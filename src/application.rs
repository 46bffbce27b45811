// ABOUTME: Named application on the platform: identity, versions and environment handles.
// ABOUTME: Groups physical environments into the logical slots they belong to.

use futures::future::try_join_all;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::config::EnvironmentManifest;
use crate::deployer::Shared;
use crate::environment::{Environment, EnvironmentOptions, observed_prefix, pick_current};
use crate::error::{Error, Result};
use crate::platform::{
    ApplicationDescription, ApplicationVersionDescription, CreateApplicationRequest,
    CreateApplicationVersionRequest, DeleteApplicationRequest, DescribeApplicationsRequest,
    DescribeEnvironmentsRequest, EnvironmentDescription, PlatformClient, UpdateApplicationRequest,
};
use crate::types::{ApplicationName, BundleRef, EnvironmentName, PhysicalName, VersionLabel};

/// Handle on a named application.
pub struct Application<P: ?Sized> {
    shared: Shared<P>,
    name: ApplicationName,
    description: Option<String>,
    cache: Mutex<Option<ApplicationDescription>>,
}

impl<P: ?Sized> std::fmt::Debug for Application<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

impl<P> Application<P>
where
    P: PlatformClient + ?Sized + 'static,
{
    pub(crate) fn new(shared: Shared<P>, name: ApplicationName, description: Option<String>) -> Self {
        Self {
            shared,
            name,
            description,
            cache: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &ApplicationName {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn cache(&self, description: ApplicationDescription) {
        *self.cache.lock() = Some(description);
    }

    async fn describe(&self) -> Result<Option<ApplicationDescription>> {
        let request = DescribeApplicationsRequest::named(&self.name);
        let found = self
            .shared
            .platform
            .describe_applications(&request)
            .await?
            .into_iter()
            .find(|app| app.application_name == self.name);
        Ok(found)
    }

    /// Make the application exist with the declared description.
    ///
    /// Repeated calls with the same description make no mutating call. An
    /// undeclared description leaves the remote one alone.
    pub async fn initialize(&self) -> Result<ApplicationDescription> {
        let platform = &*self.shared.platform;

        let existing = match self.describe().await? {
            Some(existing) => existing,
            None => {
                let request = CreateApplicationRequest {
                    application_name: self.name.clone(),
                    description: self.description.clone(),
                };
                tracing::info!(application = %self.name, "creating application");
                match platform.create_application(&request).await {
                    Ok(created) => {
                        self.cache(created.clone());
                        return Ok(created);
                    }
                    Err(e) if e.is_already_exists() => {
                        tracing::debug!(application = %self.name, "application created concurrently");
                        self.describe()
                            .await?
                            .ok_or_else(|| Error::Platform(e))?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let described = match &self.description {
            Some(wanted) if existing.description.as_deref() != Some(wanted.as_str()) => {
                tracing::info!(application = %self.name, "updating application description");
                let request = UpdateApplicationRequest {
                    application_name: self.name.clone(),
                    description: Some(wanted.clone()),
                };
                platform.update_application(&request).await?
            }
            _ => existing,
        };

        self.cache(described.clone());
        Ok(described)
    }

    /// The remote description, `None` when the application does not exist.
    pub async fn info(&self, use_cache: bool) -> Result<Option<ApplicationDescription>> {
        let cached = if use_cache { self.cache.lock().clone() } else { None };
        if cached.is_some() {
            return Ok(cached);
        }

        let described = self.describe().await?;
        *self.cache.lock() = described.clone();
        Ok(described)
    }

    /// Register a version. Duplicate labels are rejected by the platform.
    pub async fn publish_version(
        &self,
        label: VersionLabel,
        description: Option<String>,
        bundle: Option<BundleRef>,
    ) -> Result<ApplicationVersionDescription> {
        let request = CreateApplicationVersionRequest {
            application_name: self.name.clone(),
            version_label: label,
            description,
            source_bundle: bundle,
            auto_create_application: false,
        };
        tracing::info!(application = %self.name, version = %request.version_label, "publishing version");
        Ok(self
            .shared
            .platform
            .create_application_version(&request)
            .await?)
    }

    /// Version labels the platform knows for this application.
    pub async fn versions(&self) -> Result<Vec<VersionLabel>> {
        Ok(self
            .info(false)
            .await?
            .map(|app| app.versions)
            .unwrap_or_default())
    }

    /// Delete the application and terminate all its environments.
    /// Nothing happens when it does not exist.
    pub async fn remove(&self) -> Result<()> {
        if self.describe().await?.is_none() {
            tracing::debug!(application = %self.name, "application already absent");
            *self.cache.lock() = None;
            return Ok(());
        }

        let request = DeleteApplicationRequest {
            application_name: self.name.clone(),
            terminate_env_by_force: true,
        };
        tracing::info!(application = %self.name, "deleting application");
        match self.shared.platform.delete_application(&request).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        *self.cache.lock() = None;
        Ok(())
    }

    /// A handle on the logical environment `name` with `options` as its
    /// declared configuration.
    pub fn environment(&self, name: EnvironmentName, options: EnvironmentOptions) -> Environment<P> {
        Environment::new(self.shared.clone(), self.name.clone(), name, options)
    }

    /// A handle on an environment declared in a manifest.
    pub fn environment_from(&self, manifest: &EnvironmentManifest) -> Result<Environment<P>> {
        Ok(self.environment(manifest.name.clone(), manifest.resolve()?))
    }

    async fn live_environments(&self) -> Result<Vec<EnvironmentDescription>> {
        let request = DescribeEnvironmentsRequest::for_application(&self.name);
        let environments = self.shared.platform.describe_environments(&request).await?;
        Ok(environments
            .into_iter()
            .filter(|env| !env.status.is_gone())
            .collect())
    }

    /// Handles on every logical environment with a live physical one.
    pub async fn get_environments(&self) -> Result<Vec<Environment<P>>> {
        let mut slots: BTreeMap<EnvironmentName, Vec<EnvironmentDescription>> = BTreeMap::new();
        for env in self.live_environments().await? {
            match EnvironmentName::of_physical(&env.environment_name) {
                Ok(slot) => slots.entry(slot).or_default().push(env),
                Err(_) => {
                    tracing::debug!(physical = %env.environment_name, "ignoring unmanaged environment");
                }
            }
        }

        Ok(slots
            .into_iter()
            .filter_map(|(slot, live)| self.discovered(slot, &live))
            .collect())
    }

    /// Handle on the logical environment `name`, `None` when nothing of it
    /// is live.
    pub async fn get_environment(&self, name: &EnvironmentName) -> Result<Option<Environment<P>>> {
        let live: Vec<EnvironmentDescription> = self
            .live_environments()
            .await?
            .into_iter()
            .filter(|env| name.owns(&env.environment_name))
            .collect();
        Ok(self.discovered(name.clone(), &live))
    }

    /// Handle whose options are read back from the platform and whose
    /// current name is already discovered.
    fn discovered(&self, slot: EnvironmentName, live: &[EnvironmentDescription]) -> Option<Environment<P>> {
        let prefix = observed_prefix(live);
        let current = pick_current(prefix.as_ref(), live)?;

        let mut options = EnvironmentOptions::observed(current);
        options.cname_prefix = prefix;

        let environment = self.environment(slot, options);
        environment.set_current(current.environment_name.clone());
        Some(environment)
    }

    /// Queue termination of orphans in every slot. Returns their names.
    pub async fn reconcile(&self) -> Result<Vec<PhysicalName>> {
        let environments = self.get_environments().await?;
        let queued = try_join_all(environments.iter().map(|env| env.reconcile())).await?;
        Ok(queued.into_iter().flatten().collect())
    }
}
