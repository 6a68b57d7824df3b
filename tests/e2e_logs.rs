/// E2E tests for per-run log capture, tailing, search and rotation
use std::time::Duration;
use sv_e2e_tests::{wait_until, TestStack};
use sv_engine::{DomainError, LogStream, UnitState};

#[tokio::test]
async fn test_e2e_write_then_read() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("app", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;

    orch.write_log(group.id(), "app", "hello", LogStream::Stdout)
        .unwrap();
    let entries = orch.get_logs(group.id(), "app", 1, None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "hello");
    assert_eq!(entries[0].stream, LogStream::Stdout);
    assert_eq!(entries[0].line_number, 1);
    assert!(entries[0].timestamp.is_some());
}

#[tokio::test]
async fn test_e2e_search_with_context() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("app", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;

    for (line, stream) in [
        ("booting", LogStream::Stdout),
        ("ERROR disk full", LogStream::Stderr),
        ("retrying", LogStream::Stdout),
        ("ERROR still full", LogStream::Stderr),
    ] {
        orch.write_log(group.id(), "app", line, stream).unwrap();
    }

    let hits = orch
        .search_logs(group.id(), "app", "ERROR", 10, true, None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].line_number, 2);
    assert!(hits[0].content.ends_with("[stderr] ERROR disk full"));
    assert_eq!(hits[0].context_before.len(), 1);
    assert_eq!(hits[0].context_after.len(), 2);
    assert_eq!(hits[1].line_number, 4);
    assert!(hits[1].context_after.is_empty());
    assert_eq!(hits[0].run_id, "current");

    let none = orch
        .search_logs(group.id(), "app", "error", 10, true, None)
        .await
        .unwrap();
    assert!(none.is_empty());

    let capped = orch
        .search_logs(group.id(), "app", "error", 1, false, None)
        .await
        .unwrap();
    assert_eq!(capped.len(), 1);
}

#[tokio::test]
async fn test_e2e_process_output_is_captured() {
    let stack = TestStack::new();
    let unit = stack
        .unit("talker", "echo out-line; echo err-line >&2; sleep 30")
        .build()
        .unwrap();
    let group = stack.create(vec![unit]).await;
    let orch = &stack.orchestrator;

    let gid = group.id();

    orch.start_group(gid, None).await.unwrap();
    let captured = wait_until(Duration::from_secs(5), move || async move {
        let entries = orch.get_logs(gid, "talker", 10, None).await.unwrap();
        entries.iter().any(|e| e.content == "out-line" && e.stream == LogStream::Stdout)
            && entries.iter().any(|e| e.content == "err-line" && e.stream == LogStream::Stderr)
    })
    .await;
    assert!(captured, "stdout and stderr lines were not captured");

    stack.shutdown().await;
}

#[tokio::test]
async fn test_e2e_restart_archives_previous_run() {
    let stack = TestStack::new();
    let unit = stack
        .unit("app", "echo run-marker; sleep 30")
        .build()
        .unwrap();
    let group = stack.create(vec![unit]).await;
    let orch = &stack.orchestrator;

    let gid = group.id();

    orch.start_group(gid, None).await.unwrap();
    assert!(
        wait_until(Duration::from_secs(5), move || async move {
            !orch.get_logs(gid, "app", 5, None).await.unwrap().is_empty()
        })
        .await
    );
    assert!(orch.list_log_runs(group.id(), "app").await.unwrap().is_empty());

    orch.restart_group(group.id(), None).await.unwrap();
    assert_eq!(stack.state_of(group.id(), "app").await, UnitState::Running);

    let runs = orch.list_log_runs(group.id(), "app").await.unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].file_size > 0);

    let archived = orch
        .get_logs(group.id(), "app", 10, Some(&runs[0].run_id))
        .await
        .unwrap();
    assert!(archived.iter().any(|e| e.content == "run-marker"));

    stack.shutdown().await;
}

#[tokio::test]
async fn test_e2e_unknown_run_is_rejected() {
    let stack = TestStack::new();
    let group = stack
        .create(vec![stack.unit("app", "sleep 30").build().unwrap()])
        .await;
    let orch = &stack.orchestrator;
    orch.write_log(group.id(), "app", "x", LogStream::Stdout).unwrap();

    for run in ["2001-01-01-00-00-00", "../../etc/passwd"] {
        let err = orch
            .get_logs(group.id(), "app", 10, Some(run))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::RunNotFound(_)), "run {run}: {err}");
    }

    let err = orch.get_logs(group.id(), "ghost", 10, None).await.unwrap_err();
    assert!(err.is_not_found());
}
