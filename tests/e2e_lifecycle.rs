/// E2E tests for the unit lifecycle: start, status, stop, restart
use std::time::Duration;
use sv_e2e_tests::TestStack;
use sv_engine::{DomainError, HealthStatus, UnitState};

#[tokio::test]
async fn test_e2e_start_status_stop() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("web", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;

    let results = orch.start_group(group.id(), None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].success, "{}", results[0].message);
    let pid = results[0].pid.expect("pid");

    let status = &orch.get_status(group.id(), None).await.unwrap()[0];
    assert_eq!(status.state, UnitState::Running);
    assert_eq!(status.pid, Some(pid));
    assert!(status.uptime_seconds.is_some());
    assert_eq!(status.error, None);

    let stopped = orch.stop_group_by_id(group.id(), None, true).await.unwrap();
    assert!(stopped[0].success);

    let status = &orch.get_status(group.id(), None).await.unwrap()[0];
    assert_eq!(status.state, UnitState::Stopped);
    assert_eq!(status.pid, None);
    assert_eq!(status.uptime_seconds, None);
}

#[tokio::test]
async fn test_e2e_stop_is_idempotent() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("web", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;

    // Never started
    let first = orch.stop_group_by_id(group.id(), None, true).await.unwrap();
    assert!(!first[0].success);
    assert_eq!(first[0].message, "Unit 'web' is not running");
    assert_eq!(stack.state_of(group.id(), "web").await, UnitState::Stopped);

    orch.start_group(group.id(), None).await.unwrap();
    assert!(orch.stop_group_by_id(group.id(), None, true).await.unwrap()[0].success);

    let again = orch.stop_group_by_id(group.id(), None, true).await.unwrap();
    assert!(!again[0].success);
    assert_eq!(stack.state_of(group.id(), "web").await, UnitState::Stopped);
}

#[tokio::test]
async fn test_e2e_sigterm_ignored_escalates_to_kill() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack
            .unit("stubborn", "trap '' TERM; while true; do sleep 1; done")
            .build()
            .unwrap()])
        .await;
    let orch = &stack.orchestrator;
    orch.start_group(group.id(), None).await.unwrap();

    let started = std::time::Instant::now();
    let stopped = orch.stop_group_by_id(group.id(), None, true).await.unwrap();
    assert!(stopped[0].success);
    // 5s graceful window, then SIGKILL
    assert!(started.elapsed() >= Duration::from_secs(4));
    assert_eq!(stack.state_of(group.id(), "stubborn").await, UnitState::Stopped);
}

#[tokio::test]
async fn test_e2e_restart_group_replaces_process() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("web", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;

    let first = orch.start_group(group.id(), None).await.unwrap()[0].pid;
    let restarted = orch.restart_group(group.id(), None).await.unwrap();
    assert_eq!(restarted.stop_results.len(), 1);
    assert!(restarted.stop_results[0].success);
    assert!(restarted.start_results[0].success);
    assert_ne!(restarted.start_results[0].pid, first);

    stack.shutdown().await;
}

#[tokio::test]
async fn test_e2e_crash_is_detected_by_status_poll() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("flaky", "sleep 1; exit 7").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;
    orch.start_group(group.id(), None).await.unwrap();

    assert!(
        stack
            .wait_for_state(group.id(), "flaky", UnitState::Failed, Duration::from_secs(5))
            .await
    );
    let status = &orch.get_status(group.id(), None).await.unwrap()[0];
    assert_eq!(status.exit_code, Some(7));
    assert_eq!(status.health, HealthStatus::Unhealthy);
    assert_eq!(status.error.as_deref(), Some("Process exited with code 7"));

    // A failed unit can be started again explicitly
    let again = orch.start_group(group.id(), None).await.unwrap();
    assert!(again[0].success);
    stack.shutdown().await;
}

#[tokio::test]
async fn test_e2e_missing_binary_fails_fast() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack
            .unit("ghost", "definitely-not-a-real-binary-xyz")
            .build()
            .unwrap()])
        .await;

    let results = stack.orchestrator.start_group(group.id(), None).await.unwrap();
    assert!(!results[0].success);
    assert_eq!(results[0].message, DomainError::ExitedDuringStartup(127).to_string());
}

#[tokio::test]
async fn test_e2e_shutdown_all_stops_everything() {
    let stack = TestStack::new();
    let a = stack
        .create(vec![stack.unit("a", "sleep 30").build().unwrap()])
        .await;
    let b = stack
        .create(vec![stack.unit("b", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;
    orch.start_group(a.id(), None).await.unwrap();
    orch.start_group(b.id(), None).await.unwrap();

    let results = orch.shutdown_all().await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(stack.state_of(a.id(), "a").await, UnitState::Stopped);
    assert_eq!(stack.state_of(b.id(), "b").await, UnitState::Stopped);
}
