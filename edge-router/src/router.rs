/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Router supervisor: owns the shared context and the long-running tasks.

use crate::config::RouterConfig;
use crate::control_plane::admission::{self, AdmissionReview};
use crate::control_plane::controller::{self, RuleControllerHandler};
use crate::control_plane::registry::ProviderRegistry;
use crate::control_plane::rule_store::RuleStore;
use crate::data_plane::hub::HubTransport;
use crate::data_plane::hub_gateway::HubGateway;
use crate::data_plane::rest_listener::RestRoutes;
use crate::observability::events;
use crate::providers::ProviderContext;
use crate::runtime::status_aggregator::{self, StatusAggregator, StatusReporter, StatusSender};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

const COMPONENT: &str = "edge_router";

pub struct EdgeRouter {
    config: RouterConfig,
    gateway: Arc<HubGateway>,
    ctx: Arc<ProviderContext>,
    store: Arc<RuleStore>,
    results: StatusSender,
    aggregator: Mutex<Option<StatusAggregator>>,
    shutdown: CancellationToken,
    status_stop: CancellationToken,
    drain: Mutex<Option<JoinHandle<()>>>,
    status: Mutex<Option<JoinHandle<()>>>,
}

impl EdgeRouter {
    pub fn new(
        config: RouterConfig,
        hub: Arc<dyn HubTransport>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self::with_registry(config, hub, reporter, ProviderRegistry::with_defaults())
    }

    pub fn with_registry(
        config: RouterConfig,
        hub: Arc<dyn HubTransport>,
        reporter: Arc<dyn StatusReporter>,
        registry: ProviderRegistry,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let gateway = Arc::new(HubGateway::new(hub, &config.router_module));
        let ctx = Arc::new(ProviderContext::new(
            config.clone(),
            Arc::clone(&gateway),
            shutdown.clone(),
        ));
        let (results, aggregator) = status_aggregator::channel(&config.status, reporter);
        let store = Arc::new(RuleStore::new(
            registry,
            Arc::clone(&ctx),
            results.clone(),
            &config.retry,
        ));

        Self {
            config,
            gateway,
            ctx,
            store,
            results,
            aggregator: Mutex::new(Some(aggregator)),
            shutdown,
            status_stop: CancellationToken::new(),
            drain: Mutex::new(None),
            status: Mutex::new(None),
        }
    }

    /// Starts the status aggregator and the hub drain loop, and installs the
    /// controller handlers. Calling it again is a no-op.
    pub async fn start(&self) {
        let Some(aggregator) = self.aggregator.lock().await.take() else {
            return;
        };
        *self.status.lock().await = Some(tokio::spawn(aggregator.run(self.status_stop.clone())));
        *self.drain.lock().await = Some(tokio::spawn(
            Arc::clone(&self.gateway).run(self.shutdown.child_token()),
        ));

        let handler = Arc::new(RuleControllerHandler::new(Arc::clone(&self.store)));
        for key in controller::handler_keys() {
            self.gateway.register_handler(key, handler.clone());
        }

        info!(
            event = events::ROUTER_START,
            component = COMPONENT,
            module = self.config.router_module.as_str(),
            hub = self.config.hub_module.as_str(),
            "router started"
        );
    }

    /// Stops ingress and the drain loop, then flushes outstanding results.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(drain) = self.drain.lock().await.take() {
            let _ = drain.await;
        }
        if let Some(listener) = self.ctx.started_rest_listener() {
            listener.join().await;
        }

        self.status_stop.cancel();
        if let Some(status) = self.status.lock().await.take() {
            let _ = status.await;
        }
        info!(
            event = events::ROUTER_SHUTDOWN,
            component = COMPONENT,
            rules = self.store.rule_count(),
            "router stopped"
        );
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<HubGateway> {
        &self.gateway
    }

    pub fn results(&self) -> &StatusSender {
        &self.results
    }

    /// Address of the REST listener once a REST rule has started it.
    pub fn rest_addr(&self) -> Option<SocketAddr> {
        self.ctx
            .started_rest_listener()
            .map(|listener| listener.local_addr())
    }

    /// Template table behind the REST listener.
    pub fn rest_routes(&self) -> &Arc<RestRoutes> {
        self.ctx.rest_routes()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Admission callback for rules, validated against this router's store.
    pub async fn admit_rule(&self, body: &[u8]) -> AdmissionReview {
        admission::admit_rule(self.store.as_ref(), body).await
    }

    /// Admission callback for rule endpoints.
    pub async fn admit_rule_endpoint(&self, body: &[u8]) -> AdmissionReview {
        admission::admit_rule_endpoint(self.store.as_ref(), body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_plane::hub::ChannelHub;
    use crate::data_plane::hub_gateway::HandlerKey;
    use crate::envelope::{RESOURCE_RULE, SOURCE_RULE_CONTROLLER};
    use crate::runtime::status_aggregator::NoopReporter;

    fn router() -> EdgeRouter {
        let hub = Arc::new(ChannelHub::new("cloudhub", 16));
        hub.add_module("router");
        EdgeRouter::new(RouterConfig::default(), hub, Arc::new(NoopReporter))
    }

    #[tokio::test]
    async fn start_is_idempotent_and_shutdown_joins_tasks() {
        let router = router();
        router.start().await;
        router.start().await;

        assert!(router
            .gateway()
            .has_handler(&HandlerKey::new(SOURCE_RULE_CONTROLLER, RESOURCE_RULE)));
        assert!(router.rest_addr().is_none());

        router.shutdown().await;
        assert!(router.is_shutting_down());
        assert!(router.drain.lock().await.is_none());
        assert!(router.status.lock().await.is_none());
    }
}
