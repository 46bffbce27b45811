// ABOUTME: Entry point owning the platform client, deploy gate and cleanup queue.
// ABOUTME: Hands out application handles and recovers cleanup left by earlier runs.

use std::sync::Arc;

use crate::application::Application;
use crate::config::{DeploySettings, Manifest};
use crate::deploy::{CleanupIntent, CleanupQueue, CleanupReason, DeployGate, pending_from_journal};
use crate::error::Result;
use crate::platform::{ApplicationDescription, DescribeApplicationsRequest, PlatformClient};
use crate::types::ApplicationName;

/// State shared by every handle created from one deployer.
pub(crate) struct Shared<P: ?Sized> {
    pub(crate) platform: Arc<P>,
    pub(crate) settings: DeploySettings,
    pub(crate) gate: DeployGate,
    pub(crate) cleanup: CleanupQueue,
}

impl<P: ?Sized> Clone for Shared<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            settings: self.settings.clone(),
            gate: self.gate.clone(),
            cleanup: self.cleanup.clone(),
        }
    }
}

/// Orchestrates applications and blue-green deploys against one platform.
///
/// Must be created inside a tokio runtime: it starts the cleanup worker.
pub struct Deployer<P: ?Sized> {
    shared: Shared<P>,
}

impl<P> Deployer<P>
where
    P: PlatformClient + ?Sized + 'static,
{
    pub fn new(platform: Arc<P>, settings: DeploySettings) -> Self {
        let cleanup = CleanupQueue::spawn(platform.clone(), settings.cleanup_journal.clone());
        Self {
            shared: Shared {
                platform,
                settings,
                gate: DeployGate::new(),
                cleanup,
            },
        }
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.shared.platform
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.shared.settings
    }

    pub fn gate(&self) -> &DeployGate {
        &self.shared.gate
    }

    pub fn cleanup(&self) -> &CleanupQueue {
        &self.shared.cleanup
    }

    /// A handle on `name`. Nothing is sent to the platform.
    pub fn application(&self, name: ApplicationName, description: Option<String>) -> Application<P> {
        Application::new(self.shared.clone(), name, description)
    }

    /// A handle on the application a manifest declares.
    pub fn application_from(&self, manifest: &Manifest) -> Application<P> {
        self.application(manifest.name.clone(), manifest.description.clone())
    }

    /// Idempotently create `name` and return its handle.
    pub async fn create_application(
        &self,
        name: ApplicationName,
        description: Option<String>,
    ) -> Result<Application<P>> {
        let application = self.application(name, description);
        application.initialize().await?;
        Ok(application)
    }

    /// Delete `name` and everything in it. Absent applications are fine.
    pub async fn remove_application(&self, name: ApplicationName) -> Result<()> {
        self.application(name, None).remove().await
    }

    pub async fn applications(&self) -> Result<Vec<ApplicationDescription>> {
        let request = DescribeApplicationsRequest::default();
        Ok(self.shared.platform.describe_applications(&request).await?)
    }

    /// A handle on an existing application, `None` when absent.
    pub async fn get_application(&self, name: ApplicationName) -> Result<Option<Application<P>>> {
        let request = DescribeApplicationsRequest::named(&name);
        let found = self
            .shared
            .platform
            .describe_applications(&request)
            .await?
            .into_iter()
            .find(|app| app.application_name == name);

        Ok(found.map(|description| {
            let application = self.application(name, description.description.clone());
            application.cache(description);
            application
        }))
    }

    pub async fn list_solution_stacks(&self) -> Result<Vec<String>> {
        Ok(self.shared.platform.list_available_solution_stacks().await?)
    }

    /// Re-queue terminations that an earlier run journaled but never
    /// finished. Returns what was queued.
    pub fn reconcile(&self) -> Result<Vec<CleanupIntent>> {
        let Some(path) = self.shared.settings.cleanup_journal.as_deref() else {
            return Ok(vec![]);
        };

        let cleanup = &self.shared.cleanup;
        let recovered: Vec<CleanupIntent> = pending_from_journal(path)?
            .into_iter()
            .filter(|intent| !cleanup.is_pending(&intent.application, &intent.environment))
            .map(|intent| {
                CleanupIntent::new(intent.application, intent.environment, CleanupReason::Recovered)
            })
            .collect();

        if !recovered.is_empty() {
            tracing::info!(count = recovered.len(), path = %path.display(), "recovering pending cleanup");
        }
        for intent in &recovered {
            self.shared.cleanup.enqueue(intent.clone());
        }
        Ok(recovered)
    }

    /// Wait for queued terminations to be processed.
    pub async fn flush(&self) {
        self.shared.cleanup.flush().await;
    }
}
