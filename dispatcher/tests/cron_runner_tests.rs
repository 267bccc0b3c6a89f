//! Cron registration tests: replace-on-register, idempotent removal,
//! and pre-registration validation

mod common;

use common::*;
use dispatcher::batch::{ChangeSpec, OperationKind};
use dispatcher::cron::{CronKey, CronRunner, RegisterOutcome};
use dispatcher::errors::DispatchError;
use dispatcher::services::BatchService;
use std::sync::Arc;

async fn setup_runner() -> (CronRunner, Arc<MockAgent>) {
    let agent = Arc::new(MockAgent::new());
    let service = Arc::new(BatchService::new(
        test_config(),
        Arc::new(StaticFlagStore::enabled()),
        agent.clone(),
    ));
    let runner = CronRunner::new(service)
        .await
        .expect("scheduler should initialize");
    (runner, agent)
}

fn key_for(deployment: &str) -> CronKey {
    CronKey {
        env: TEST_ENV.to_string(),
        namespace: "checkout".to_string(),
        deployment: deployment.to_string(),
        kind: OperationKind::CronScale,
    }
}

#[tokio::test]
async fn registering_same_key_twice_keeps_one_entry_with_second_payload() {
    let (runner, _) = setup_runner().await;

    let first = runner
        .register(
            TEST_ENV,
            false,
            vec![cron_target("checkout", "api", "0 0 8 * * *", 3)],
        )
        .await
        .unwrap();
    assert_eq!(first[0].outcome, RegisterOutcome::Created);

    let second = runner
        .register(
            TEST_ENV,
            false,
            vec![cron_target("checkout", "api", "0 0 20 * * *", 6)],
        )
        .await
        .unwrap();
    assert_eq!(second[0].outcome, RegisterOutcome::Replaced);

    let entries = runner.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].schedule, "0 0 20 * * *");
    match &entries[0].batch.targets[0].change {
        ChangeSpec::CronScale { replicas, .. } => assert_eq!(*replicas, 6),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn entries_with_distinct_deployments_coexist() {
    let (runner, _) = setup_runner().await;

    let registrations = runner
        .register(
            TEST_ENV,
            false,
            vec![
                cron_target("checkout", "api", "0 0 8 * * *", 3),
                cron_target("checkout", "worker", "0 0 8 * * *", 5),
            ],
        )
        .await
        .unwrap();

    assert_eq!(registrations.len(), 2);
    assert!(registrations
        .iter()
        .all(|r| r.outcome == RegisterOutcome::Created));
    assert_eq!(runner.entries().await.len(), 2);
}

#[tokio::test]
async fn unregister_removes_entry_and_is_idempotent() {
    let (runner, _) = setup_runner().await;

    runner
        .register(
            TEST_ENV,
            false,
            vec![cron_target("checkout", "api", "0 0 8 * * *", 3)],
        )
        .await
        .unwrap();

    assert!(runner.unregister(&key_for("api")).await.unwrap());
    assert!(runner.entries().await.is_empty());

    // Second removal is a no-op, not an error
    assert!(!runner.unregister(&key_for("api")).await.unwrap());
}

#[tokio::test]
async fn malformed_schedule_rejects_registration() {
    let (runner, _) = setup_runner().await;

    let err = runner
        .register(
            TEST_ENV,
            false,
            vec![cron_target("checkout", "api", "30 2 * * *", 3)],
        )
        .await
        .unwrap_err();

    match err {
        DispatchError::Validation(e) => assert_eq!(e.problems[0].field, "schedule"),
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(runner.entries().await.is_empty());
}

#[tokio::test]
async fn unknown_environment_rejects_registration() {
    let (runner, _) = setup_runner().await;

    let mut target = cron_target("checkout", "api", "0 0 8 * * *", 3);
    target.env = "nowhere".to_string();

    let err = runner
        .register("nowhere", false, vec![target])
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownEnvironment { .. }));
}

#[tokio::test]
async fn registration_never_dispatches_immediately() {
    let (runner, agent) = setup_runner().await;

    runner
        .register(
            TEST_ENV,
            false,
            vec![cron_target("checkout", "api", "0 0 8 1 1 *", 3)],
        )
        .await
        .unwrap();

    assert_eq!(
        agent.call_count(),
        0,
        "registration stores a template; only the trigger dispatches"
    );
}
