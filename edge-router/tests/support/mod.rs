use edge_router::model::{KEY_NODE_NAME, KEY_PATH, KEY_RESOURCE, KEY_TOPIC};
use edge_router::{
    ChannelHub, EdgeRouter, EndpointKind, Envelope, HubTransport, RouterConfig, Rule,
    RuleEndpoint,
};
use integration_test_utils::{edge_hub, init_logging, RecordingReporter};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const NAMESPACE: &str = "default";
pub(crate) const REST_ENDPOINT: &str = "rest-ep";
pub(crate) const BUS_ENDPOINT: &str = "bus-ep";

pub(crate) struct Harness {
    pub(crate) hub: Arc<ChannelHub>,
    pub(crate) router: EdgeRouter,
    pub(crate) reporter: Arc<RecordingReporter>,
}

pub(crate) fn local_config() -> RouterConfig {
    RouterConfig {
        address: "127.0.0.1".to_string(),
        port: 0,
        ..RouterConfig::default()
    }
}

/// Router with one `rest` and one `eventbus` endpoint in [`NAMESPACE`].
pub(crate) async fn start_router(config: RouterConfig) -> Harness {
    init_logging();
    let hub = edge_hub(64);
    let reporter = RecordingReporter::new();
    let router = EdgeRouter::new(config, hub.clone(), reporter.clone());
    router.start().await;

    let store = router.store();
    store.add_endpoint(RuleEndpoint::new(NAMESPACE, REST_ENDPOINT, EndpointKind::Rest));
    store.add_endpoint(RuleEndpoint::new(NAMESPACE, BUS_ENDPOINT, EndpointKind::EventBus));

    Harness {
        hub,
        router,
        reporter,
    }
}

#[allow(dead_code)]
pub(crate) fn rest_to_bus(name: &str, path: &str, topic: &str) -> Rule {
    Rule::new(NAMESPACE, name, REST_ENDPOINT, BUS_ENDPOINT)
        .with_source_resource(KEY_PATH, path)
        .with_target_resource(KEY_TOPIC, topic)
}

#[allow(dead_code)]
pub(crate) fn bus_to_rest(name: &str, node_name: &str, topic: &str, url: &str) -> Rule {
    Rule::new(NAMESPACE, name, BUS_ENDPOINT, REST_ENDPOINT)
        .with_source_resource(KEY_NODE_NAME, node_name)
        .with_source_resource(KEY_TOPIC, topic)
        .with_target_resource(KEY_RESOURCE, url)
}

/// Next envelope the router sent towards the edge.
#[allow(dead_code)]
pub(crate) async fn next_to_edge(hub: &ChannelHub) -> Envelope {
    tokio::time::timeout(Duration::from_secs(5), hub.receive("cloudhub"))
        .await
        .expect("router should send to the edge")
        .expect("hub should stay open")
}

#[allow(dead_code)]
pub(crate) fn rest_url(harness: &Harness, path: &str) -> String {
    let addr = harness
        .router
        .rest_addr()
        .expect("a rest rule should have started the listener");
    format!("http://{addr}{path}")
}
