// ABOUTME: In-memory simulated platform control plane.
// ABOUTME: Environments converge asynchronously, observed through describe calls.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::error::PlatformError;
use super::types::*;
use super::PlatformClient;
use crate::types::PhysicalName;

/// Domain under which simulated CNAMEs are issued.
pub const MEMORY_DOMAIN: &str = "memory.greenswap.internal";

const DEFAULT_SETTLE_AFTER: u32 = 2;

/// Control plane operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateApplication,
    DescribeApplications,
    UpdateApplication,
    DeleteApplication,
    CreateApplicationVersion,
    CreateEnvironment,
    DescribeEnvironments,
    UpdateEnvironment,
    TerminateEnvironment,
    SwapEnvironmentCnames,
    ListSolutionStacks,
}

impl Operation {
    /// Whether the operation changes remote state.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Operation::DescribeApplications
                | Operation::DescribeEnvironments
                | Operation::ListSolutionStacks
        )
    }
}

/// How the next created environment behaves while launching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchScript {
    /// Describe observations before the launch settles.
    pub settle_after: u32,
    /// Health once settled.
    pub health: Health,
    /// Health taken on the first time the environment takes part in a swap.
    pub health_after_swap: Option<Health>,
}

impl LaunchScript {
    pub fn healthy() -> Self {
        Self {
            settle_after: DEFAULT_SETTLE_AFTER,
            health: Health::Green,
            health_after_swap: None,
        }
    }

    /// Settles as Ready but never reaches Green.
    pub fn unhealthy(health: Health) -> Self {
        Self {
            health,
            ..Self::healthy()
        }
    }

    pub fn degrades_after_swap(mut self, health: Health) -> Self {
        self.health_after_swap = Some(health);
        self
    }

    pub fn settle_after(mut self, observations: u32) -> Self {
        self.settle_after = observations;
        self
    }
}

impl Default for LaunchScript {
    fn default() -> Self {
        Self::healthy()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Launching,
    Updating,
    Terminating,
    Settled,
}

#[derive(Debug)]
struct EnvironmentRecord {
    description: EnvironmentDescription,
    phase: Phase,
    observations: u32,
    settle_after: u32,
    target_health: Health,
    health_after_swap: Option<Health>,
}

impl EnvironmentRecord {
    fn is_live(&self) -> bool {
        !self.description.status.is_gone()
    }

    fn enter(&mut self, phase: Phase, status: EnvironmentStatus, settle_after: u32) {
        self.phase = phase;
        self.observations = 0;
        self.settle_after = settle_after;
        self.description.status = status;
        self.description.date_updated = Utc::now();
        self.settle_if_due();
    }

    /// One describe call saw this environment.
    fn observe(&mut self) {
        if self.phase != Phase::Settled {
            self.observations += 1;
            self.settle_if_due();
        }
    }

    fn settle_if_due(&mut self) {
        if self.phase == Phase::Settled || self.observations < self.settle_after {
            return;
        }
        match self.phase {
            Phase::Launching | Phase::Updating => {
                self.description.status = EnvironmentStatus::Ready;
                self.description.health = self.target_health;
            }
            Phase::Terminating => {
                self.description.status = EnvironmentStatus::Terminated;
                self.description.health = Health::Grey;
            }
            Phase::Settled => {}
        }
        self.phase = Phase::Settled;
        self.description.date_updated = Utc::now();
    }
}

#[derive(Debug, Default)]
struct State {
    applications: Vec<ApplicationDescription>,
    versions: Vec<ApplicationVersionDescription>,
    environments: Vec<EnvironmentRecord>,
    scripts: VecDeque<LaunchScript>,
    failures: HashMap<Operation, PlatformError>,
    calls: Vec<Operation>,
    next_environment_id: u64,
}

impl State {
    /// Log the call and consume an injected failure, if any.
    fn begin(&mut self, op: Operation) -> Result<(), PlatformError> {
        self.calls.push(op);
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn application_exists(&self, name: &crate::types::ApplicationName) -> bool {
        self.applications
            .iter()
            .any(|app| &app.application_name == name)
    }

    fn live_environment_mut(&mut self, name: &PhysicalName) -> Option<&mut EnvironmentRecord> {
        self.environments
            .iter_mut()
            .find(|rec| &rec.description.environment_name == name && rec.is_live())
    }

    fn cname_taken(&self, cname: &str) -> bool {
        self.environments
            .iter()
            .any(|rec| rec.is_live() && rec.description.cname.as_deref() == Some(cname))
    }
}

/// A simulated control plane that keeps all state in memory.
///
/// Environments start `Launching` with `Grey` health and settle to `Ready`
/// after a number of describe observations, the way a real control plane
/// converges asynchronously. Updates pass through `Updating`, terminations
/// through `Terminating`. Launch behaviour can be scripted per environment
/// and single failures injected per operation.
#[derive(Debug)]
pub struct MemoryPlatform {
    state: Mutex<State>,
    settle_after: u32,
    solution_stacks: Vec<String>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            settle_after: DEFAULT_SETTLE_AFTER,
            solution_stacks: vec![
                "64bit Amazon Linux 2023 v6.1.0 running Node.js 20".to_string(),
                "64bit Amazon Linux 2023 v4.3.0 running Python 3.12".to_string(),
                "64bit Amazon Linux 2023 v4.2.0 running Docker".to_string(),
            ],
        }
    }

    /// Observations needed for unscripted launches, updates and terminations.
    pub fn with_settle_after(mut self, observations: u32) -> Self {
        self.settle_after = observations;
        self
    }

    /// Script the behaviour of the next created environment.
    pub fn script_next_launch(&self, script: LaunchScript) {
        self.state.lock().scripts.push_back(script);
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: PlatformError) {
        self.state.lock().failures.insert(op, error);
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, op: Operation) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn mutating_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .count()
    }

    /// Snapshot of every environment ever created, without observing them.
    pub fn environments(&self) -> Vec<EnvironmentDescription> {
        self.state
            .lock()
            .environments
            .iter()
            .map(|rec| rec.description.clone())
            .collect()
    }

    /// Snapshot of environments that are neither terminating nor terminated.
    pub fn live_environments(&self) -> Vec<EnvironmentDescription> {
        self.state
            .lock()
            .environments
            .iter()
            .filter(|rec| rec.is_live())
            .map(|rec| rec.description.clone())
            .collect()
    }

    pub fn environment(&self, name: &PhysicalName) -> Option<EnvironmentDescription> {
        self.state
            .lock()
            .environments
            .iter()
            .rev()
            .find(|rec| &rec.description.environment_name == name)
            .map(|rec| rec.description.clone())
    }

    pub fn applications(&self) -> Vec<ApplicationDescription> {
        self.state.lock().applications.clone()
    }

    /// Live environment currently answering on `<prefix>.<domain>`.
    pub fn cname_holder(&self, prefix: &str) -> Option<PhysicalName> {
        let cname = format!("{prefix}.{MEMORY_DOMAIN}");
        self.state
            .lock()
            .environments
            .iter()
            .find(|rec| rec.is_live() && rec.description.cname.as_deref() == Some(&cname))
            .map(|rec| rec.description.environment_name.clone())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), PlatformError> {
    if value.trim().is_empty() {
        return Err(PlatformError::Validation(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(())
}

fn validate_options(settings: &[OptionSetting]) -> Result<(), PlatformError> {
    for option in settings {
        require_non_empty("Namespace", &option.namespace)?;
        require_non_empty("OptionName", &option.option_name)?;
    }
    Ok(())
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn create_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> Result<ApplicationDescription, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::CreateApplication)?;
        require_non_empty("ApplicationName", request.application_name.as_str())?;

        if state.application_exists(&request.application_name) {
            return Err(PlatformError::AlreadyExists(format!(
                "application {}",
                request.application_name
            )));
        }

        let now = Utc::now();
        let app = ApplicationDescription {
            application_name: request.application_name.clone(),
            description: request.description.clone(),
            date_created: now,
            date_updated: now,
            versions: vec![],
            configuration_templates: vec![],
        };
        state.applications.push(app.clone());
        Ok(app)
    }

    async fn describe_applications(
        &self,
        request: &DescribeApplicationsRequest,
    ) -> Result<Vec<ApplicationDescription>, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::DescribeApplications)?;

        Ok(state
            .applications
            .iter()
            .filter(|app| {
                request.application_names.is_empty()
                    || request.application_names.contains(&app.application_name)
            })
            .cloned()
            .collect())
    }

    async fn update_application(
        &self,
        request: &UpdateApplicationRequest,
    ) -> Result<ApplicationDescription, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::UpdateApplication)?;

        let app = state
            .applications
            .iter_mut()
            .find(|app| app.application_name == request.application_name)
            .ok_or_else(|| {
                PlatformError::NotFound(format!("application {}", request.application_name))
            })?;
        app.description = request.description.clone();
        app.date_updated = Utc::now();
        Ok(app.clone())
    }

    async fn delete_application(
        &self,
        request: &DeleteApplicationRequest,
    ) -> Result<(), PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::DeleteApplication)?;

        if !state.application_exists(&request.application_name) {
            return Err(PlatformError::NotFound(format!(
                "application {}",
                request.application_name
            )));
        }

        let has_live = state.environments.iter().any(|rec| {
            rec.description.application_name == request.application_name && rec.is_live()
        });
        if has_live && !request.terminate_env_by_force {
            return Err(PlatformError::Validation(format!(
                "application {} has running environments",
                request.application_name
            )));
        }

        let now = Utc::now();
        for rec in state
            .environments
            .iter_mut()
            .filter(|rec| rec.description.application_name == request.application_name)
        {
            rec.phase = Phase::Settled;
            rec.description.status = EnvironmentStatus::Terminated;
            rec.description.health = Health::Grey;
            rec.description.date_updated = now;
        }
        state
            .applications
            .retain(|app| app.application_name != request.application_name);
        state
            .versions
            .retain(|v| v.application_name != request.application_name);
        Ok(())
    }

    async fn create_application_version(
        &self,
        request: &CreateApplicationVersionRequest,
    ) -> Result<ApplicationVersionDescription, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::CreateApplicationVersion)?;
        require_non_empty("VersionLabel", request.version_label.as_str())?;

        if !state.application_exists(&request.application_name) {
            return Err(PlatformError::NotFound(format!(
                "application {}",
                request.application_name
            )));
        }

        let duplicate = state.versions.iter().any(|v| {
            v.application_name == request.application_name
                && v.version_label == request.version_label
        });
        if duplicate {
            return Err(PlatformError::AlreadyExists(format!(
                "application version {} of {}",
                request.version_label, request.application_name
            )));
        }

        let version = ApplicationVersionDescription {
            application_name: request.application_name.clone(),
            version_label: request.version_label.clone(),
            description: request.description.clone(),
            source_bundle: request.source_bundle.clone(),
            date_created: Utc::now(),
        };
        state.versions.push(version.clone());
        if let Some(app) = state
            .applications
            .iter_mut()
            .find(|app| app.application_name == request.application_name)
        {
            app.versions.push(request.version_label.clone());
        }
        Ok(version)
    }

    async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
    ) -> Result<EnvironmentDescription, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::CreateEnvironment)?;
        require_non_empty("EnvironmentName", request.environment_name.as_str())?;
        validate_options(&request.option_settings)?;

        match (&request.solution_stack_name, &request.template_name) {
            (Some(_), Some(_)) => {
                return Err(PlatformError::Validation(
                    "Cannot specify both SolutionStackName and TemplateName".to_string(),
                ));
            }
            (None, None) => {
                return Err(PlatformError::Validation(
                    "Either SolutionStackName or TemplateName is required".to_string(),
                ));
            }
            _ => {}
        }

        if !state.application_exists(&request.application_name) {
            return Err(PlatformError::NotFound(format!(
                "application {}",
                request.application_name
            )));
        }

        if let Some(label) = &request.version_label {
            let known = state.versions.iter().any(|v| {
                v.application_name == request.application_name && &v.version_label == label
            });
            if !known {
                return Err(PlatformError::NotFound(format!(
                    "application version {label} of {}",
                    request.application_name
                )));
            }
        }

        let name_taken = state.environments.iter().any(|rec| {
            rec.is_live() && rec.description.environment_name == request.environment_name
        });
        if name_taken {
            return Err(PlatformError::AlreadyExists(format!(
                "environment {}",
                request.environment_name
            )));
        }

        let cname = match &request.cname_prefix {
            Some(prefix) => format!("{}.{MEMORY_DOMAIN}", prefix.to_ascii_lowercase()),
            None => format!(
                "{}.{MEMORY_DOMAIN}",
                request.environment_name.as_str().to_ascii_lowercase()
            ),
        };
        if state.cname_taken(&cname) {
            return Err(PlatformError::Validation(format!(
                "DNS name {cname} is not available"
            )));
        }

        let script = state.scripts.pop_front().unwrap_or(LaunchScript {
            settle_after: self.settle_after,
            ..LaunchScript::healthy()
        });

        state.next_environment_id += 1;
        let now = Utc::now();
        let description = EnvironmentDescription {
            environment_name: request.environment_name.clone(),
            environment_id: format!("e-{:010}", state.next_environment_id),
            application_name: request.application_name.clone(),
            version_label: request.version_label.clone(),
            solution_stack_name: request.solution_stack_name.clone(),
            template_name: request.template_name.clone(),
            description: request.description.clone(),
            cname: Some(cname),
            status: EnvironmentStatus::Launching,
            health: Health::Grey,
            tier: request.tier.clone(),
            date_created: now,
            date_updated: now,
        };

        let mut record = EnvironmentRecord {
            description,
            phase: Phase::Launching,
            observations: 0,
            settle_after: script.settle_after,
            target_health: script.health,
            health_after_swap: script.health_after_swap,
        };
        record.settle_if_due();

        // Creation answers before convergence, like the real control plane
        let mut accepted = record.description.clone();
        accepted.status = EnvironmentStatus::Launching;
        accepted.health = Health::Grey;

        state.environments.push(record);
        Ok(accepted)
    }

    async fn describe_environments(
        &self,
        request: &DescribeEnvironmentsRequest,
    ) -> Result<Vec<EnvironmentDescription>, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::DescribeEnvironments)?;

        let mut described = Vec::new();
        for rec in state.environments.iter_mut() {
            let in_application = request
                .application_name
                .as_ref()
                .is_none_or(|app| &rec.description.application_name == app);
            let named = request.environment_names.is_empty()
                || request
                    .environment_names
                    .contains(&rec.description.environment_name);
            let visible = request.include_deleted
                || rec.description.status != EnvironmentStatus::Terminated;

            if in_application && named && visible {
                rec.observe();
                described.push(rec.description.clone());
            }
        }
        Ok(described)
    }

    async fn update_environment(
        &self,
        request: &UpdateEnvironmentRequest,
    ) -> Result<EnvironmentDescription, PlatformError> {
        tokio::task::yield_now().await;
        let settle_after = self.settle_after;
        let mut state = self.state.lock();
        state.begin(Operation::UpdateEnvironment)?;
        validate_options(&request.option_settings)?;

        let record = state
            .live_environment_mut(&request.environment_name)
            .ok_or_else(|| {
                PlatformError::NotFound(format!("environment {}", request.environment_name))
            })?;

        if let Some(label) = &request.version_label {
            record.description.version_label = Some(label.clone());
        }
        if let Some(description) = &request.description {
            record.description.description = Some(description.clone());
        }
        if let Some(template) = &request.template_name {
            record.description.template_name = Some(template.clone());
        }
        if let Some(tier) = &request.tier {
            record.description.tier = Some(tier.clone());
        }
        record.enter(Phase::Updating, EnvironmentStatus::Updating, settle_after);

        let mut accepted = record.description.clone();
        accepted.status = EnvironmentStatus::Updating;
        Ok(accepted)
    }

    async fn terminate_environment(
        &self,
        request: &TerminateEnvironmentRequest,
    ) -> Result<EnvironmentDescription, PlatformError> {
        tokio::task::yield_now().await;
        let settle_after = self.settle_after;
        let mut state = self.state.lock();
        state.begin(Operation::TerminateEnvironment)?;

        let record = state
            .environments
            .iter_mut()
            .find(|rec| {
                rec.description.environment_name == request.environment_name
                    && rec.description.status != EnvironmentStatus::Terminated
            })
            .ok_or_else(|| {
                PlatformError::NotFound(format!("environment {}", request.environment_name))
            })?;

        if record.phase != Phase::Terminating {
            record.enter(
                Phase::Terminating,
                EnvironmentStatus::Terminating,
                settle_after,
            );
        }

        let mut accepted = record.description.clone();
        accepted.status = EnvironmentStatus::Terminating;
        Ok(accepted)
    }

    async fn swap_environment_cnames(
        &self,
        request: &SwapEnvironmentCnamesRequest,
    ) -> Result<(), PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::SwapEnvironmentCnames)?;

        let find = |name: &PhysicalName, state: &State| {
            state
                .environments
                .iter()
                .position(|rec| &rec.description.environment_name == name && rec.is_live())
                .ok_or_else(|| PlatformError::NotFound(format!("environment {name}")))
        };
        let source = find(&request.source_environment_name, &state)?;
        let destination = find(&request.destination_environment_name, &state)?;
        if source == destination {
            return Err(PlatformError::Validation(
                "cannot swap an environment with itself".to_string(),
            ));
        }

        let source_cname = state.environments[source].description.cname.take();
        let destination_cname = state.environments[destination].description.cname.take();
        state.environments[source].description.cname = destination_cname;
        state.environments[destination].description.cname = source_cname;

        let now = Utc::now();
        for index in [source, destination] {
            let rec = &mut state.environments[index];
            if let Some(health) = rec.health_after_swap.take() {
                rec.target_health = health;
                rec.description.health = health;
            }
            rec.description.date_updated = now;
        }
        Ok(())
    }

    async fn list_available_solution_stacks(&self) -> Result<Vec<String>, PlatformError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.begin(Operation::ListSolutionStacks)?;
        Ok(self.solution_stacks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApplicationName, VersionLabel};

    const STACK: &str = "64bit Amazon Linux 2023 v6.1.0 running Node.js 20";

    async fn platform_with_app() -> MemoryPlatform {
        let platform = MemoryPlatform::new();
        platform
            .create_application(&CreateApplicationRequest {
                application_name: ApplicationName::new("demo"),
                description: None,
            })
            .await
            .unwrap();
        platform
    }

    fn create_request(name: &str) -> CreateEnvironmentRequest {
        CreateEnvironmentRequest {
            application_name: ApplicationName::new("demo"),
            environment_name: PhysicalName::new(name),
            version_label: None,
            description: None,
            solution_stack_name: Some(STACK.to_string()),
            template_name: None,
            cname_prefix: Some("demo".to_string()),
            tags: vec![],
            option_settings: vec![],
            options_to_remove: vec![],
            tier: None,
            extra_fields: Default::default(),
        }
    }

    #[tokio::test]
    async fn environment_converges_after_observations() {
        let platform = platform_with_app().await;
        let created = platform.create_environment(&create_request("web")).await.unwrap();
        assert_eq!(created.status, EnvironmentStatus::Launching);

        let app = ApplicationName::new("demo");
        let name = PhysicalName::new("web");
        let first = platform.describe_environment(&app, &name).await.unwrap().unwrap();
        assert_eq!(first.status, EnvironmentStatus::Launching);
        let second = platform.describe_environment(&app, &name).await.unwrap().unwrap();
        assert_eq!(second.status, EnvironmentStatus::Ready);
        assert_eq!(second.health, Health::Green);
    }

    #[tokio::test]
    async fn stack_and_template_are_exclusive() {
        let platform = platform_with_app().await;
        let mut request = create_request("web");
        request.template_name = Some("base".to_string());

        let err = platform.create_environment(&request).await.unwrap_err();
        assert!(matches!(err, PlatformError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_version_label_is_rejected() {
        let platform = platform_with_app().await;
        let request = CreateApplicationVersionRequest {
            application_name: ApplicationName::new("demo"),
            version_label: VersionLabel::new("1.0.0"),
            description: None,
            source_bundle: None,
            auto_create_application: false,
        };
        platform.create_application_version(&request).await.unwrap();
        let err = platform.create_application_version(&request).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn cname_prefix_must_be_available() {
        let platform = platform_with_app().await;
        platform.create_environment(&create_request("web-a")).await.unwrap();
        let err = platform
            .create_environment(&create_request("web-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Validation(_)));
    }

    #[tokio::test]
    async fn swap_exchanges_cnames() {
        let platform = platform_with_app().await;
        platform.create_environment(&create_request("blue")).await.unwrap();
        let mut green = create_request("green");
        green.cname_prefix = None;
        platform.create_environment(&green).await.unwrap();

        platform
            .swap_environment_cnames(&SwapEnvironmentCnamesRequest {
                source_environment_name: PhysicalName::new("blue"),
                destination_environment_name: PhysicalName::new("green"),
            })
            .await
            .unwrap();

        assert_eq!(platform.cname_holder("demo"), Some(PhysicalName::new("green")));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let platform = platform_with_app().await;
        platform.fail_next(
            Operation::DescribeApplications,
            PlatformError::Throttled("slow down".to_string()),
        );

        let request = DescribeApplicationsRequest::default();
        assert!(platform.describe_applications(&request).await.is_err());
        assert_eq!(platform.describe_applications(&request).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn terminated_environments_hidden_unless_requested() {
        let platform = platform_with_app().await.with_settle_after(0);
        platform.create_environment(&create_request("web")).await.unwrap();
        platform
            .terminate_environment(&TerminateEnvironmentRequest::new(PhysicalName::new("web")))
            .await
            .unwrap();

        let app = ApplicationName::new("demo");
        let listed = platform
            .describe_environments(&DescribeEnvironmentsRequest::for_application(&app))
            .await
            .unwrap();
        assert!(listed.is_empty());

        let named = platform
            .describe_environment(&app, &PhysicalName::new("web"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(named.status, EnvironmentStatus::Terminated);
    }
}
