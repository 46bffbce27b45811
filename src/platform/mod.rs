// ABOUTME: Platform control plane client interface and implementations.
// ABOUTME: Defines PlatformClient plus the in-memory simulated control plane.

mod error;
mod memory;
mod types;

pub use error::PlatformError;
pub use memory::{LaunchScript, MEMORY_DOMAIN, MemoryPlatform, Operation};
pub use types::*;

use async_trait::async_trait;

use crate::types::{ApplicationName, PhysicalName};

/// Asynchronous control plane operations for applications, versions and
/// environments.
///
/// Every call may be slow and may fail independently of earlier calls. No
/// read-after-write consistency is assumed: a describe right after a create
/// may not show the new resource yet.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn create_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> Result<ApplicationDescription, PlatformError>;

    async fn describe_applications(
        &self,
        request: &DescribeApplicationsRequest,
    ) -> Result<Vec<ApplicationDescription>, PlatformError>;

    async fn update_application(
        &self,
        request: &UpdateApplicationRequest,
    ) -> Result<ApplicationDescription, PlatformError>;

    async fn delete_application(
        &self,
        request: &DeleteApplicationRequest,
    ) -> Result<(), PlatformError>;

    async fn create_application_version(
        &self,
        request: &CreateApplicationVersionRequest,
    ) -> Result<ApplicationVersionDescription, PlatformError>;

    async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
    ) -> Result<EnvironmentDescription, PlatformError>;

    async fn describe_environments(
        &self,
        request: &DescribeEnvironmentsRequest,
    ) -> Result<Vec<EnvironmentDescription>, PlatformError>;

    async fn update_environment(
        &self,
        request: &UpdateEnvironmentRequest,
    ) -> Result<EnvironmentDescription, PlatformError>;

    async fn terminate_environment(
        &self,
        request: &TerminateEnvironmentRequest,
    ) -> Result<EnvironmentDescription, PlatformError>;

    /// Swap the CNAMEs of two environments in a single call.
    async fn swap_environment_cnames(
        &self,
        request: &SwapEnvironmentCnamesRequest,
    ) -> Result<(), PlatformError>;

    async fn list_available_solution_stacks(&self) -> Result<Vec<String>, PlatformError>;

    /// Describe a single physical environment, terminated ones included.
    /// Absence is `None`, not an error.
    async fn describe_environment(
        &self,
        application: &ApplicationName,
        name: &PhysicalName,
    ) -> Result<Option<EnvironmentDescription>, PlatformError> {
        let request = DescribeEnvironmentsRequest::named(application, name);
        let environments = self.describe_environments(&request).await?;
        // A terminated environment may linger next to a newer one of the same name
        Ok(environments
            .into_iter()
            .filter(|env| &env.environment_name == name)
            .max_by_key(|env| env.date_created))
    }
}
