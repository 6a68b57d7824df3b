/// E2E tests for dependency-ordered start and stop
use std::net::TcpListener;
use sv_e2e_tests::{free_port, TestStack};
use sv_engine::{DomainError, HealthCheck, UnitState};

#[tokio::test]
async fn test_e2e_db_then_api_with_tcp_health() {
    let stack = TestStack::new();
    // Stands in for the database's listening socket
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let db_port = listener.local_addr().unwrap().port();

    let api = stack.unit("api", "sleep 30").depends_on("db").build().unwrap();
    let db = stack
        .unit("db", "sleep 30")
        .health_check(HealthCheck::tcp(db_port).unwrap())
        .startup_timeout(5)
        .build()
        .unwrap();
    let group = stack.create(vec![api, db]).await;

    let results = stack.orchestrator.start_group(group.id(), None).await.unwrap();
    let order: Vec<&str> = results.iter().map(|r| r.unit_id.as_str()).collect();
    assert_eq!(order, ["db", "api"]);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(stack.state_of(group.id(), "api").await, UnitState::Running);

    let stopped = stack
        .orchestrator
        .stop_group_by_id(group.id(), None, true)
        .await
        .unwrap();
    let order: Vec<&str> = stopped.iter().map(|r| r.unit_id.as_str()).collect();
    assert_eq!(order, ["api", "db"]);
}

#[tokio::test]
async fn test_e2e_unhealthy_db_blocks_api() {
    let stack = TestStack::new();
    let db = stack
        .unit("db", "sleep 30")
        .health_check(HealthCheck::tcp(free_port()).unwrap())
        .startup_timeout(2)
        .build()
        .unwrap();
    let api = stack.unit("api", "sleep 30").depends_on("db").build().unwrap();
    let group = stack.create(vec![db, api]).await;

    let results = stack.orchestrator.start_group(group.id(), None).await.unwrap();
    assert_eq!(results.len(), 1, "api must be absent from the results");
    assert_eq!(results[0].unit_id, "db");
    assert!(!results[0].success);
    assert_eq!(
        results[0].message,
        DomainError::HealthCheckTimeout(2).to_string()
    );

    assert_eq!(stack.state_of(group.id(), "db").await, UnitState::Failed);
    assert_eq!(stack.state_of(group.id(), "api").await, UnitState::Stopped);

    // The timed-out process is still tracked and can be reaped
    let stopped = stack
        .orchestrator
        .stop_group_by_id(group.id(), Some(&["db".to_string()][..]), true)
        .await
        .unwrap();
    assert!(stopped[0].success);
}

#[tokio::test]
async fn test_e2e_dependent_alone_is_rejected() {
    let stack = TestStack::new();
    let db = stack.unit("db", "sleep 30").build().unwrap();
    let api = stack.unit("api", "sleep 30").depends_on("db").build().unwrap();
    let group = stack.create(vec![db, api]).await;

    let only_api = vec!["api".to_string()];
    let results = stack
        .orchestrator
        .start_group(group.id(), Some(only_api.as_slice()))
        .await
        .unwrap();
    assert!(!results[0].success);
    assert_eq!(results[0].message, "Dependency 'db' is not running");
}

#[tokio::test]
async fn test_e2e_independent_failure_does_not_abort() {
    let stack = TestStack::new();
    let broken = stack.unit("broken", "exit 1").build().unwrap();
    let fine = stack.unit("fine", "sleep 30").build().unwrap();
    let group = stack.create(vec![broken, fine]).await;

    let results = stack.orchestrator.start_group(group.id(), None).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(!results[0].success);
    assert!(results[1].success);

    stack.shutdown().await;
}

#[tokio::test]
async fn test_e2e_dependency_port_is_exported() {
    let stack = TestStack::new();
    let db = stack
        .unit("db", "sleep 30")
        .port_env_var("PORT")
        .build()
        .unwrap();
    let api = stack
        .unit("api", "echo \"db at $DB_PORT\"; sleep 30")
        .depends_on("db")
        .build()
        .unwrap();
    let group = stack.create(vec![db, api]).await;

    let results = stack.orchestrator.start_group(group.id(), None).await.unwrap();
    let db_port = results[0].port.expect("db port");

    let logged = stack
        .orchestrator
        .get_logs(group.id(), "api", 10, None)
        .await
        .unwrap();
    assert_eq!(logged[0].content, format!("db at {}", db_port));

    stack.shutdown().await;
}
