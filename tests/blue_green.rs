// ABOUTME: Integration tests for blue-green deploys against the in-memory platform.
// ABOUTME: Covers first deploy, swap, rollback paths, the slot gate and events.

mod support;

use async_trait::async_trait;
use greenswap::deploy::{DeployError, DeployErrorKind, DeployOutcome};
use greenswap::error::Error;
use greenswap::platform::*;
use greenswap::types::{ApplicationName, EnvironmentName, PhysicalName, VersionLabel};
use greenswap::{Deployer, EnvironmentEvent, EnvironmentOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn v(label: &str) -> VersionLabel {
    VersionLabel::new(label)
}

fn deploy_error(err: Error) -> DeployError {
    match err {
        Error::Deploy(e) => e,
        other => panic!("expected a deploy error, got {other:?}"),
    }
}

mod first_deploy {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn creates_one_environment_holding_the_alias() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();

        let outcome = environment.deploy(&v("1.0.0")).await.unwrap();

        let DeployOutcome::Created { environment: created } = outcome else {
            panic!("first deploy should not swap: {outcome:?}");
        };
        assert_eq!(platform.count(Operation::CreateEnvironment), 1);
        assert_eq!(platform.count(Operation::SwapEnvironmentCnames), 0);
        assert_eq!(environment.current_name(), Some(created.clone()));
        assert!(EnvironmentName::new("web").unwrap().owns(&created));

        let described = platform.environment(&created).unwrap();
        assert_eq!(described.version_label, Some(v("1.0.0")));
        assert_eq!(platform.cname_holder("demo-web"), Some(created));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_version_fails_without_creating_anything() {
        let (platform, deployer) = support::deployer();
        let (_application, environment) = support::demo_app(&deployer).await;

        let err = deploy_error(environment.deploy(&v("9.9.9")).await.unwrap_err());

        assert_eq!(err.kind(), DeployErrorKind::ProvisionFailed);
        assert!(platform.live_environments().is_empty());
        assert_eq!(environment.current_name(), None);
    }
}

mod swap {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_deploy_moves_alias_and_terminates_old() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        let first = environment.deploy(&v("1.0.0")).await.unwrap();

        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        let outcome = environment.deploy(&v("2.0.0")).await.unwrap();
        deployer.flush().await;

        let DeployOutcome::Swapped { previous, current } = outcome else {
            panic!("second deploy should swap: {outcome:?}");
        };
        assert_eq!(&previous, first.current());
        assert_ne!(previous, current);
        assert_eq!(platform.count(Operation::SwapEnvironmentCnames), 1);
        assert_eq!(platform.count(Operation::TerminateEnvironment), 1);
        assert!(platform.environment(&previous).unwrap().status.is_gone());

        assert_eq!(platform.cname_holder("demo-web"), Some(current.clone()));
        assert_eq!(environment.current_name(), Some(current.clone()));
        assert_eq!(
            platform.environment(&current).unwrap().version_label,
            Some(v("2.0.0"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sibling_launches_without_the_cname_prefix() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        environment.deploy(&v("1.0.0")).await.unwrap();

        // The prefix is held by the live environment; a sibling claiming it
        // would be rejected by the platform.
        environment.deploy(&v("2.0.0")).await.unwrap();
        assert_eq!(platform.count(Operation::CreateEnvironment), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deploy_after_the_old_environment_is_gone_creates_again() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        let first = environment.deploy(&v("1.0.0")).await.unwrap();

        platform
            .terminate_environment(&TerminateEnvironmentRequest::new(first.current().clone()))
            .await
            .unwrap();

        let outcome = environment.deploy(&v("1.0.0")).await.unwrap();
        assert!(matches!(outcome, DeployOutcome::Created { .. }));
        assert_ne!(outcome.current(), first.current());
    }
}

mod rollback {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn never_healthy_environment_is_abandoned() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        let first = environment.deploy(&v("1.0.0")).await.unwrap();

        platform.script_next_launch(LaunchScript::unhealthy(Health::Red));
        let err = deploy_error(environment.deploy(&v("2.0.0")).await.unwrap_err());
        deployer.flush().await;

        assert_eq!(err.kind(), DeployErrorKind::RolledBack);
        assert_eq!(err.root_cause().kind(), DeployErrorKind::HealthCheckFailed);
        assert!(err.production_unchanged());

        let DeployError::RolledBack { live, abandoned, .. } = &err else {
            panic!("expected RolledBack, got {err:?}");
        };
        assert_eq!(live, first.current());
        assert!(platform.environment(abandoned).unwrap().status.is_gone());
        assert_eq!(platform.count(Operation::SwapEnvironmentCnames), 0);
        assert_eq!(platform.cname_holder("demo-web"), Some(live.clone()));
        assert_eq!(environment.current_name(), Some(live.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_after_swap_swaps_back() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        let first = environment.deploy(&v("1.0.0")).await.unwrap();

        platform.script_next_launch(LaunchScript::healthy().degrades_after_swap(Health::Red));
        let err = deploy_error(environment.deploy(&v("2.0.0")).await.unwrap_err());
        deployer.flush().await;

        assert_eq!(err.kind(), DeployErrorKind::RolledBack);
        assert!(matches!(
            err.root_cause(),
            DeployError::Degraded {
                health: Health::Red,
                ..
            }
        ));

        let DeployError::RolledBack { live, abandoned, .. } = &err else {
            panic!("expected RolledBack, got {err:?}");
        };
        assert_eq!(live, first.current());
        assert_eq!(platform.count(Operation::SwapEnvironmentCnames), 2);
        assert_eq!(platform.cname_holder("demo-web"), Some(live.clone()));
        assert!(platform.environment(abandoned).unwrap().status.is_gone());
        assert_eq!(environment.current_name(), Some(live.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_swap_leaves_production_alone() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        let first = environment.deploy(&v("1.0.0")).await.unwrap();

        platform.fail_next(
            Operation::SwapEnvironmentCnames,
            PlatformError::Throttled("rate exceeded".to_string()),
        );
        let err = deploy_error(environment.deploy(&v("2.0.0")).await.unwrap_err());
        deployer.flush().await;

        assert_eq!(err.root_cause().kind(), DeployErrorKind::SwapFailed);
        assert_eq!(platform.cname_holder("demo-web"), Some(first.current().clone()));
        assert_eq!(platform.live_environments().len(), 1);
    }

    /// Delegates to the in-memory platform but rejects every swap after the first.
    struct OneSwapOnly {
        inner: MemoryPlatform,
        swaps: AtomicUsize,
    }

    #[async_trait]
    impl PlatformClient for OneSwapOnly {
        async fn create_application(
            &self,
            request: &CreateApplicationRequest,
        ) -> Result<ApplicationDescription, PlatformError> {
            self.inner.create_application(request).await
        }

        async fn describe_applications(
            &self,
            request: &DescribeApplicationsRequest,
        ) -> Result<Vec<ApplicationDescription>, PlatformError> {
            self.inner.describe_applications(request).await
        }

        async fn update_application(
            &self,
            request: &UpdateApplicationRequest,
        ) -> Result<ApplicationDescription, PlatformError> {
            self.inner.update_application(request).await
        }

        async fn delete_application(
            &self,
            request: &DeleteApplicationRequest,
        ) -> Result<(), PlatformError> {
            self.inner.delete_application(request).await
        }

        async fn create_application_version(
            &self,
            request: &CreateApplicationVersionRequest,
        ) -> Result<ApplicationVersionDescription, PlatformError> {
            self.inner.create_application_version(request).await
        }

        async fn create_environment(
            &self,
            request: &CreateEnvironmentRequest,
        ) -> Result<EnvironmentDescription, PlatformError> {
            self.inner.create_environment(request).await
        }

        async fn describe_environments(
            &self,
            request: &DescribeEnvironmentsRequest,
        ) -> Result<Vec<EnvironmentDescription>, PlatformError> {
            self.inner.describe_environments(request).await
        }

        async fn update_environment(
            &self,
            request: &UpdateEnvironmentRequest,
        ) -> Result<EnvironmentDescription, PlatformError> {
            self.inner.update_environment(request).await
        }

        async fn terminate_environment(
            &self,
            request: &TerminateEnvironmentRequest,
        ) -> Result<EnvironmentDescription, PlatformError> {
            self.inner.terminate_environment(request).await
        }

        async fn swap_environment_cnames(
            &self,
            request: &SwapEnvironmentCnamesRequest,
        ) -> Result<(), PlatformError> {
            if self.swaps.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(PlatformError::Service("swap unavailable".to_string()));
            }
            self.inner.swap_environment_cnames(request).await
        }

        async fn list_available_solution_stacks(&self) -> Result<Vec<String>, PlatformError> {
            self.inner.list_available_solution_stacks().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_swap_back_reports_both_environments() {
        support::init_tracing();
        let platform = Arc::new(OneSwapOnly {
            inner: MemoryPlatform::new(),
            swaps: AtomicUsize::new(0),
        });
        let deployer = Deployer::new(platform.clone(), support::settings());
        let application = deployer
            .create_application(ApplicationName::new("demo"), None)
            .await
            .unwrap();
        let environment =
            application.environment(EnvironmentName::new("web").unwrap(), support::web_options());
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        let first = environment.deploy(&v("1.0.0")).await.unwrap();

        platform
            .inner
            .script_next_launch(LaunchScript::healthy().degrades_after_swap(Health::Yellow));
        let err = deploy_error(environment.deploy(&v("2.0.0")).await.unwrap_err());
        deployer.flush().await;

        assert_eq!(err.kind(), DeployErrorKind::RollbackFailed);
        assert!(!err.production_unchanged());
        let DeployError::RollbackFailed { live, previous, .. } = &err else {
            panic!("expected RollbackFailed, got {err:?}");
        };
        assert_eq!(previous, first.current());
        assert_eq!(environment.current_name(), Some(live.clone()));
        assert_eq!(platform.inner.cname_holder("demo-web"), Some(live.clone()));
        // Nothing was queued for termination: both stay up for an operator
        assert_eq!(platform.inner.count(Operation::TerminateEnvironment), 0);
    }
}

mod gate {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn concurrent_deploys_of_one_slot_fail_fast() {
        let (_platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();

        let version = v("1.0.0");
        let (a, b) = tokio::join!(environment.deploy(&version), environment.deploy(&version));

        let busy = match (a, b) {
            (Ok(_), Err(e)) | (Err(e), Ok(_)) => deploy_error(e),
            other => panic!("expected exactly one deploy to run: {other:?}"),
        };
        assert_eq!(busy.kind(), DeployErrorKind::Busy);
        let holder = busy.gate_holder().unwrap();
        assert_eq!(holder.purpose, "1.0.0");
        assert_eq!(holder.pid, std::process::id());
    }

    #[tokio::test(start_paused = true)]
    async fn different_slots_deploy_independently() {
        let (platform, deployer) = support::deployer();
        let (application, web) = support::demo_app(&deployer).await;
        let worker = application.environment(
            EnvironmentName::new("worker").unwrap(),
            EnvironmentOptions::with_stack(support::STACK),
        );
        application.publish_version(v("1.0.0"), None, None).await.unwrap();

        let version = v("1.0.0");
        let (a, b) = tokio::join!(web.deploy(&version), worker.deploy(&version));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(platform.live_environments().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_is_released_after_a_failed_deploy() {
        let (_platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;

        assert!(environment.deploy(&v("1.0.0")).await.is_err());
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        assert!(environment.deploy(&v("1.0.0")).await.is_ok());
        assert!(
            deployer
                .gate()
                .holder(application.name(), environment.name())
                .is_none()
        );
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn initialize_creates_then_updates() {
        let (platform, deployer) = support::deployer();
        let (_application, environment) = support::demo_app(&deployer).await;

        let created = environment.initialize(support::web_options()).await.unwrap();
        assert_eq!(environment.current_name(), Some(created.environment_name.clone()));
        assert_eq!(platform.cname_holder("demo-web"), Some(created.environment_name.clone()));

        let updated = environment
            .initialize(support::web_options().description("second pass"))
            .await
            .unwrap();
        assert_eq!(updated.environment_name, created.environment_name);
        assert_eq!(platform.count(Operation::CreateEnvironment), 1);
        assert_eq!(platform.count(Operation::UpdateEnvironment), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn conflicting_options_fail_before_any_remote_call() {
        let (platform, deployer) = support::deployer();
        let (_application, environment) = support::demo_app(&deployer).await;
        let before = platform.calls().len();

        let mut options = support::web_options();
        options.template_name = Some("base".to_string());
        let err = environment.initialize(options).await.unwrap_err();

        assert!(matches!(err, Error::ConfigConflict(_)));
        assert_eq!(platform.calls().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_rejected_by_the_gate_keeps_declared_options() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        let declared = environment.options();

        let version = v("1.0.0");
        let changed = support::web_options().description("rejected change");
        let (deployed, initialized) =
            tokio::join!(environment.deploy(&version), environment.initialize(changed));

        assert!(deployed.is_ok());
        assert_eq!(deploy_error(initialized.unwrap_err()).kind(), DeployErrorKind::Busy);
        assert_eq!(environment.options(), declared);
        assert_eq!(platform.count(Operation::UpdateEnvironment), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_keeps_declared_options() {
        let (platform, deployer) = support::deployer();
        let (_application, environment) = support::demo_app(&deployer).await;
        environment.initialize(support::web_options()).await.unwrap();
        let declared = environment.options();

        platform.fail_next(
            Operation::UpdateEnvironment,
            PlatformError::Validation("bad option".to_string()),
        );
        let err = environment
            .initialize(support::web_options().description("refused"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Platform(PlatformError::Validation(_))));
        assert_eq!(environment.options(), declared);

        environment
            .initialize(support::web_options().description("accepted"))
            .await
            .unwrap();
        assert_eq!(environment.options().description.as_deref(), Some("accepted"));
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_starts_with_the_declared_version() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();

        let mut options = support::web_options();
        options.version_label = Some(v("1.0.0"));
        let created = environment.initialize(options).await.unwrap();

        let described = platform.environment(&created.environment_name).unwrap();
        assert_eq!(described.version_label, Some(v("1.0.0")));
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_without_an_environment_is_an_error() {
        let (_platform, deployer) = support::deployer();
        let (_application, environment) = support::demo_app(&deployer).await;

        let err = environment
            .wait_until_status(EnvironmentStatus::Ready, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotProvisioned(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_without_an_environment_is_a_no_op() {
        let (platform, deployer) = support::deployer();
        let (_application, environment) = support::demo_app(&deployer).await;

        assert!(environment.remove().await.unwrap().is_none());
        assert_eq!(platform.count(Operation::TerminateEnvironment), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn events_report_deploy_and_readiness() {
        let (_platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        let mut events = environment.subscribe();

        let outcome = environment.deploy(&v("1.0.0")).await.unwrap();

        let deployed = events.recv().await.unwrap();
        assert_eq!(
            deployed,
            EnvironmentEvent::Deployed {
                version: v("1.0.0"),
                outcome: outcome.clone(),
            }
        );

        let ready = tokio::time::timeout(Duration::from_secs(30), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            ready,
            EnvironmentEvent::Ready {
                environment: outcome.current().clone(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn demo_scenario_end_to_end() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;

        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        environment.deploy(&v("1.0.0")).await.unwrap();
        environment
            .wait_until_health(Health::Green, None)
            .await
            .unwrap();

        let first = environment.current_name().unwrap();
        assert_eq!(platform.live_environments().len(), 1);

        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        let outcome = environment.deploy(&v("2.0.0")).await.unwrap();

        // Both generations run until the old one's termination is processed
        let live: Vec<_> = platform
            .live_environments()
            .into_iter()
            .map(|env| env.environment_name)
            .collect();
        assert_eq!(live.len(), 2);
        assert!(live.contains(&first));
        assert!(live.contains(outcome.current()));

        deployer.flush().await;
        let live = platform.live_environments();
        assert_eq!(live.len(), 1);
        assert_eq!(&live[0].environment_name, outcome.current());
        assert_eq!(platform.cname_holder("demo-web").as_ref(), Some(outcome.current()));

        let info = environment.info().await.unwrap().unwrap();
        assert_eq!(&info.environment_name, outcome.current());
        assert_eq!(info.version_label, Some(v("2.0.0")));

        let removed = environment.remove().await.unwrap().unwrap();
        assert_eq!(removed.status, EnvironmentStatus::Terminated);
        assert_eq!(environment.current_name(), None);

        application.remove().await.unwrap();
        assert!(deployer.applications().await.unwrap().is_empty());
        assert!(platform.live_environments().is_empty());
    }
}

mod discovery {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fresh_handle_finds_the_alias_holder() {
        let (_platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        application.publish_version(v("2.0.0"), None, None).await.unwrap();
        environment.deploy(&v("1.0.0")).await.unwrap();
        let outcome = environment.deploy(&v("2.0.0")).await.unwrap();

        // The old environment may still be terminating; the alias decides
        let fresh = application
            .environment(EnvironmentName::new("web").unwrap(), support::web_options());
        assert_eq!(fresh.discover().await.unwrap().as_ref(), Some(outcome.current()));
    }

    #[tokio::test(start_paused = true)]
    async fn application_groups_environments_by_slot() {
        let (_platform, deployer) = support::deployer();
        let (application, web) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        let outcome = web.deploy(&v("1.0.0")).await.unwrap();

        let found = application
            .get_environment(&EnvironmentName::new("web").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.current_name().as_ref(), Some(outcome.current()));
        assert_eq!(
            found.options().cname_prefix.map(|p| p.to_string()),
            Some("demo-web".to_string())
        );

        let all = application.get_environments().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(
            application
                .get_environment(&EnvironmentName::new("worker").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn orphans_are_reconciled() {
        let (platform, deployer) = support::deployer();
        let (application, environment) = support::demo_app(&deployer).await;
        application.publish_version(v("1.0.0"), None, None).await.unwrap();
        environment.deploy(&v("1.0.0")).await.unwrap();

        // A sibling left behind by an interrupted deploy
        let slot = EnvironmentName::new("web").unwrap();
        let leftover: PhysicalName = slot.generate_physical();
        platform
            .create_environment(&CreateEnvironmentRequest {
                application_name: ApplicationName::new("demo"),
                environment_name: leftover.clone(),
                version_label: Some(v("1.0.0")),
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

        let orphans = environment.orphans().await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].environment_name, leftover);

        let queued = environment.reconcile().await.unwrap();
        deployer.flush().await;
        assert_eq!(queued, vec![leftover.clone()]);
        assert!(platform.environment(&leftover).unwrap().status.is_gone());
        assert!(environment.orphans().await.unwrap().is_empty());
    }
}
