mod support;

use edge_router::envelope::{GROUP_RESOURCE, OP_DELETE, OP_INSERT, SOURCE_RULE_CONTROLLER};
use edge_router::providers::rest::source_template;
use edge_router::{Envelope, ExecStatus, Route, RuleState};
use integration_test_utils::wait_until;
use std::sync::Arc;
use std::time::Duration;
use support::{local_config, rest_to_bus, start_router, NAMESPACE};

#[tokio::test(start_paused = true)]
async fn controller_insert_with_missing_endpoint_gives_up_after_three_attempts() {
    let harness = start_router(local_config()).await;
    let rule = edge_router::Rule::new(NAMESPACE, "orphan", "missing-ep", "bus-ep")
        .with_source_resource("path", "/q");

    let insert = Envelope::new(Route::new(
        SOURCE_RULE_CONTROLLER,
        GROUP_RESOURCE,
        "rule/default/orphan",
        OP_INSERT,
    ))
    .json(&rule)
    .unwrap()
    .build();

    let started = tokio::time::Instant::now();
    harness.hub.send_to("router", insert).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        harness.router.store().rule_state(NAMESPACE, "orphan"),
        Some(RuleState::Pending)
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(
        harness.router.store().rule_state(NAMESPACE, "orphan"),
        Some(RuleState::Terminated)
    );
    assert!(started.elapsed() >= Duration::from_secs(15));

    harness.router.shutdown().await;
    let samples: Vec<_> = harness
        .reporter
        .reports()
        .await
        .into_iter()
        .flat_map(|report| report.error_samples)
        .collect();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].rule_id, "orphan");
    assert_eq!(samples[0].status, ExecStatus::Fail);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_rest_path_is_denied_by_router_admission() {
    let harness = start_router(local_config()).await;
    harness
        .router
        .store()
        .add_rule_with_retry(&rest_to_bus("r1", "/q", "t"))
        .await
        .unwrap();

    let review = serde_json::json!({
        "request": {
            "uid": "u1",
            "operation": "CREATE",
            "object": rest_to_bus("r2", "/q", "t2"),
        }
    });
    let reply = harness
        .router
        .admit_rule(&serde_json::to_vec(&review).unwrap())
        .await
        .response
        .unwrap();

    assert!(!reply.allowed);
    assert_eq!(
        reply.message(),
        Some("source properties exist in Rule default/r1. Path: /q")
    );
    harness.router.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn controller_cannot_take_over_a_claimed_rest_path() {
    let harness = start_router(local_config()).await;
    let store = harness.router.store();
    store
        .add_rule_with_retry(&rest_to_bus("r1", "/q", "t1"))
        .await
        .unwrap();

    let insert = Envelope::new(Route::new(
        SOURCE_RULE_CONTROLLER,
        GROUP_RESOURCE,
        "rule/default/r2",
        OP_INSERT,
    ))
    .json(&rest_to_bus("r2", "/q", "t2"))
    .unwrap()
    .build();
    harness.hub.send_to("router", insert).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || {
            let store = Arc::clone(store);
            async move { store.rule_state(NAMESPACE, "r2") == Some(RuleState::Terminated) }
        })
        .await
    );

    let delete = Envelope::new(Route::new(
        SOURCE_RULE_CONTROLLER,
        GROUP_RESOURCE,
        "rule/default/r2",
        OP_DELETE,
    ))
    .build();
    harness.hub.send_to("router", delete).unwrap();
    assert!(
        wait_until(Duration::from_secs(5), || {
            let store = Arc::clone(store);
            async move { store.rule_state(NAMESPACE, "r2").is_none() }
        })
        .await
    );

    assert!(harness
        .router
        .rest_routes()
        .contains(&source_template(NAMESPACE, "/q")));
    assert_eq!(store.rule_state(NAMESPACE, "r1"), Some(RuleState::Active));
    assert_eq!(store.rule_count(), 1);
    harness.router.shutdown().await;
}
