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

//! Hub gateway: drains the router module and fans envelopes out to handlers.

use crate::data_plane::correlation::CorrelationTable;
use crate::data_plane::hub::HubTransport;
use crate::envelope::Envelope;
use crate::error::RouterError;
use crate::observability::{events, fields};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "hub_gateway";

/// Receiver of non-reply envelopes routed by `(source, resource prefix)`.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> Result<(), RouterError>;
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
/// Handler identity. The prefix is compared segment by segment against `resource`.
pub struct HandlerKey {
    source: String,
    resource_prefix: String,
}

impl HandlerKey {
    pub fn new(source: impl Into<String>, resource_prefix: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            resource_prefix: resource_prefix.into(),
        }
    }

    /// Number of leading resource segments covered, if this key covers `resource`.
    fn covers(&self, source: &str, resource: &str) -> Option<usize> {
        if self.source != source {
            return None;
        }

        let prefix: Vec<&str> = self.resource_prefix.split('/').collect();
        let mut segments = resource.split('/');
        prefix
            .iter()
            .all(|expected| segments.next() == Some(*expected))
            .then_some(prefix.len())
    }
}

pub struct HubGateway {
    transport: Arc<dyn HubTransport>,
    correlation: Arc<CorrelationTable>,
    handlers: DashMap<HandlerKey, Arc<dyn EnvelopeHandler>>,
    module: String,
}

impl HubGateway {
    pub fn new(transport: Arc<dyn HubTransport>, module: &str) -> Self {
        Self {
            transport,
            correlation: Arc::new(CorrelationTable::new()),
            handlers: DashMap::new(),
            module: module.to_string(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn correlation(&self) -> &Arc<CorrelationTable> {
        &self.correlation
    }

    pub async fn send(&self, envelope: Envelope) -> Result<(), RouterError> {
        self.transport.send(envelope).await
    }

    /// Installs `handler` under `key`, returning the handler it replaced.
    pub fn register_handler(
        &self,
        key: HandlerKey,
        handler: Arc<dyn EnvelopeHandler>,
    ) -> Option<Arc<dyn EnvelopeHandler>> {
        debug!(
            event = events::HUB_HANDLER_REGISTER,
            component = COMPONENT,
            source = key.source.as_str(),
            resource_prefix = key.resource_prefix.as_str(),
            "registering hub handler"
        );
        self.handlers.insert(key, handler)
    }

    /// Removes the handler under `key`. Returns `true` when one existed.
    pub fn unregister_handler(&self, key: &HandlerKey) -> bool {
        debug!(
            event = events::HUB_HANDLER_UNREGISTER,
            component = COMPONENT,
            source = key.source.as_str(),
            resource_prefix = key.resource_prefix.as_str(),
            "unregistering hub handler"
        );
        self.handlers.remove(key).is_some()
    }

    pub fn has_handler(&self, key: &HandlerKey) -> bool {
        self.handlers.contains_key(key)
    }

    /// Longest-prefix handler for `(source, resource)`.
    fn lookup(&self, source: &str, resource: &str) -> Option<Arc<dyn EnvelopeHandler>> {
        self.handlers
            .iter()
            .filter_map(|entry| {
                entry
                    .key()
                    .covers(source, resource)
                    .map(|depth| (depth, Arc::clone(entry.value())))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, handler)| handler)
    }

    /// Routes one envelope: replies complete correlations, others go to handlers.
    pub fn dispatch(&self, envelope: Envelope) {
        if envelope.is_reply() {
            let parent_id = envelope.parent_id().to_string();
            if self.correlation.complete(&parent_id, envelope) {
                debug!(
                    event = events::HUB_REPLY_COMPLETED,
                    component = COMPONENT,
                    parent_id = parent_id.as_str(),
                    "reply delivered to waiting request"
                );
            } else {
                debug!(
                    event = events::HUB_REPLY_UNMATCHED,
                    component = COMPONENT,
                    parent_id = parent_id.as_str(),
                    "dropping reply without a waiting request"
                );
            }
            return;
        }

        let Some(handler) = self.lookup(envelope.source(), envelope.resource()) else {
            warn!(
                event = events::HUB_DISPATCH_NO_HANDLER,
                component = COMPONENT,
                msg_id = envelope.id(),
                route = %fields::format_route(&envelope),
                "no handler for envelope"
            );
            return;
        };

        tokio::spawn(async move {
            let msg_id = envelope.id().to_string();
            let route = fields::format_route(&envelope);
            if let Err(err) = handler.handle(envelope).await {
                warn!(
                    event = events::HUB_HANDLER_FAILED,
                    component = COMPONENT,
                    msg_id = msg_id.as_str(),
                    route = route.as_str(),
                    err = %err,
                    "hub handler failed"
                );
            }
        });
    }

    /// Drains the router module until `cancel` fires or the transport shuts down.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            event = events::HUB_DRAIN_START,
            component = COMPONENT,
            module = self.module.as_str(),
            "hub drain loop started"
        );

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.transport.receive(&self.module) => received,
            };

            match received {
                Ok(envelope) => self.dispatch(envelope),
                Err(err) => {
                    warn!(
                        event = events::HUB_RECEIVE_FAILED,
                        component = COMPONENT,
                        module = self.module.as_str(),
                        err = %err,
                        "hub receive failed, stopping drain loop"
                    );
                    break;
                }
            }
        }

        info!(
            event = events::HUB_DRAIN_STOP,
            component = COMPONENT,
            module = self.module.as_str(),
            "hub drain loop stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_plane::hub::ChannelHub;
    use crate::envelope::{Route, GROUP_USER, OP_INSERT, OP_RESPONSE};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Forwarding {
        tag: &'static str,
        seen: mpsc::UnboundedSender<(&'static str, String)>,
    }

    #[async_trait]
    impl EnvelopeHandler for Forwarding {
        async fn handle(&self, envelope: Envelope) -> Result<(), RouterError> {
            let _ = self.seen.send((self.tag, envelope.resource().to_string()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EnvelopeHandler for Failing {
        async fn handle(&self, _envelope: Envelope) -> Result<(), RouterError> {
            Err(RouterError::Dispatch("boom".to_string()))
        }
    }

    fn gateway() -> (Arc<ChannelHub>, Arc<HubGateway>) {
        let hub = Arc::new(ChannelHub::new("cloudhub", 16));
        hub.add_module("router");
        let gateway = Arc::new(HubGateway::new(hub.clone(), "router"));
        (hub, gateway)
    }

    #[test]
    fn handler_keys_match_whole_segments() {
        let key = HandlerKey::new("rulecontroller", "rule");

        assert_eq!(key.covers("rulecontroller", "rule/default/r1"), Some(1));
        assert_eq!(key.covers("rulecontroller", "ruleendpoint/default/a"), None);
        assert_eq!(key.covers("eventbus", "rule/default/r1"), None);
    }

    #[tokio::test]
    async fn longest_prefix_handler_wins() {
        let (_hub, gateway) = gateway();
        let (seen, mut observed) = mpsc::unbounded_channel();

        gateway.register_handler(
            HandlerKey::new("eventbus", "node/n"),
            Arc::new(Forwarding { tag: "short", seen: seen.clone() }),
        );
        gateway.register_handler(
            HandlerKey::new("eventbus", "node/n/default/t"),
            Arc::new(Forwarding { tag: "long", seen }),
        );

        gateway.dispatch(
            Envelope::new(Route::new("eventbus", GROUP_USER, "node/n/default/t", OP_INSERT)).build(),
        );
        assert_eq!(observed.recv().await.unwrap().0, "long");

        gateway.dispatch(
            Envelope::new(Route::new("eventbus", GROUP_USER, "node/n/other", OP_INSERT)).build(),
        );
        assert_eq!(observed.recv().await.unwrap().0, "short");
    }

    #[tokio::test]
    async fn replies_complete_correlations_instead_of_handlers() {
        let (_hub, gateway) = gateway();
        let request =
            Envelope::new(Route::new("router_eventbus", GROUP_USER, "node/n/t", OP_INSERT)).build();
        let mut pending = gateway.correlation().register(request.id());

        gateway.dispatch(Envelope::response_to(&request).build());

        let reply = pending.recv().await.unwrap();
        assert_eq!(reply.parent_id(), request.id());
        assert_eq!(reply.operation(), OP_RESPONSE);
        assert!(gateway.correlation().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drain_loop_survives_handler_errors_and_stops_on_cancel() {
        let (hub, gateway) = gateway();
        let (seen, mut observed) = mpsc::unbounded_channel();
        gateway.register_handler(HandlerKey::new("rulecontroller", "rule"), Arc::new(Failing));
        gateway.register_handler(
            HandlerKey::new("rulecontroller", "ruleendpoint"),
            Arc::new(Forwarding { tag: "endpoint", seen }),
        );

        let cancel = CancellationToken::new();
        let drain = tokio::spawn(Arc::clone(&gateway).run(cancel.clone()));

        for resource in ["rule/default/r1", "unknown/x", "ruleendpoint/default/a"] {
            hub.send_to(
                "router",
                Envelope::new(Route::new("rulecontroller", GROUP_USER, resource, OP_INSERT)).build(),
            )
            .unwrap();
        }

        let (tag, resource) = tokio::time::timeout(Duration::from_secs(5), observed.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tag, "endpoint");
        assert_eq!(resource, "ruleendpoint/default/a");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), drain)
            .await
            .unwrap()
            .unwrap();
    }
}
