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

//! Event-bus endpoint: topic subscriptions on edge nodes via the hub.
//!
//! As a source the adapter subscribes the node's topic and forwards every
//! published message to the rule target, then acknowledges the producer with
//! a `detail_result` envelope. As a target it publishes on the node's topic and
//! optionally waits for the edge to confirm.

use crate::data_plane::dispatcher;
use crate::data_plane::hub_gateway::{EnvelopeHandler, HandlerKey};
use crate::envelope::{
    Envelope, Route, GROUP_USER, OP_DETAIL_RESULT, OP_ERROR, OP_PUBLISH, OP_SUBSCRIBE,
    OP_UNSUBSCRIBE, SOURCE_EVENTBUS, SOURCE_ROUTER_EVENTBUS,
};
use crate::error::RouterError;
use crate::model::{Rule, KEY_NODE_NAME, KEY_TOPIC};
use crate::observability::events;
use crate::providers::{
    ProviderContext, RuleBinding, Source, Target, TargetParams, TargetResponse, DELIVERED_BODY,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "eventbus";

pub const NAME: &str = "eventbus";

/// Resource a node publishes `topic` on for rules in `namespace`.
pub fn subscription_resource(node_name: &str, namespace: &str, topic: &str) -> String {
    format!("node/{node_name}/{namespace}/{topic}")
}

/// Resource the router publishes on to reach `topic` of `node_name`.
pub fn publish_resource(node_name: &str, topic: &str, param: Option<&str>) -> String {
    match param.filter(|param| !param.is_empty()) {
        Some(param) => format!("node/{node_name}/{topic}/{param}"),
        None => format!("node/{node_name}/{topic}"),
    }
}

/// Acknowledgement sent back to the node that produced `request`.
pub fn ack_envelope(request: &Envelope, node_name: &str, topic: &str, body: Bytes) -> Envelope {
    let route = Route::new(
        SOURCE_ROUTER_EVENTBUS,
        GROUP_USER,
        format!("node/{node_name}/{GROUP_USER}/{topic}"),
        OP_DETAIL_RESULT,
    );
    Envelope::new(route).parent(request).bytes(body).build()
}

fn required<'a>(
    value: Option<&'a str>,
    key: &'static str,
    section: &'static str,
) -> Result<&'a str, RouterError> {
    value.ok_or(RouterError::MissingResource { key, section })
}

pub struct EventBusSource {
    node_name: String,
    topic: String,
    resource: String,
    ctx: Arc<ProviderContext>,
}

impl EventBusSource {
    pub fn new(ctx: Arc<ProviderContext>, rule: &Rule) -> Result<Self, RouterError> {
        let node_name = required(rule.source_property(KEY_NODE_NAME), KEY_NODE_NAME, "sourceResource")?;
        let topic = required(rule.source_property(KEY_TOPIC), KEY_TOPIC, "sourceResource")?;
        Ok(Self {
            node_name: node_name.to_string(),
            topic: topic.to_string(),
            resource: subscription_resource(node_name, rule.namespace(), topic),
            ctx,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    fn handler_key(&self) -> HandlerKey {
        HandlerKey::new(SOURCE_EVENTBUS, self.resource.as_str())
    }

    async fn send_subscription(&self, operation: &'static str) -> Result<(), RouterError> {
        let route = Route::new(
            SOURCE_ROUTER_EVENTBUS,
            GROUP_USER,
            self.resource.as_str(),
            operation,
        );
        let event = if operation == OP_SUBSCRIBE {
            events::EVENTBUS_SUBSCRIBE
        } else {
            events::EVENTBUS_UNSUBSCRIBE
        };
        debug!(
            event,
            operation,
            component = COMPONENT,
            resource = self.resource.as_str(),
            "sending topic subscription change"
        );
        self.ctx.gateway().send(Envelope::new(route).build()).await
    }
}

#[async_trait]
impl Source for EventBusSource {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn register_listener(&self, binding: Arc<RuleBinding>) -> Result<(), RouterError> {
        let handler = EventBusRuleHandler {
            node_name: self.node_name.clone(),
            topic: self.topic.clone(),
            binding,
            ctx: Arc::clone(&self.ctx),
        };
        let key = self.handler_key();
        self.ctx
            .gateway()
            .register_handler(key.clone(), Arc::new(handler));

        if let Err(err) = self.send_subscription(OP_SUBSCRIBE).await {
            self.ctx.gateway().unregister_handler(&key);
            return Err(err);
        }
        Ok(())
    }

    async fn unregister_listener(&self) -> Result<(), RouterError> {
        self.ctx.gateway().unregister_handler(&self.handler_key());
        self.send_subscription(OP_UNSUBSCRIBE).await
    }
}

struct EventBusRuleHandler {
    node_name: String,
    topic: String,
    binding: Arc<RuleBinding>,
    ctx: Arc<ProviderContext>,
}

#[async_trait]
impl EnvelopeHandler for EventBusRuleHandler {
    async fn handle(&self, envelope: Envelope) -> Result<(), RouterError> {
        let params = TargetParams::new(
            envelope.id(),
            self.node_name.as_str(),
            envelope.body_bytes(),
        );
        let body = match dispatcher::deliver(&self.binding, params).await {
            Ok(Some(response)) => response.body,
            Ok(None) => Bytes::from_static(DELIVERED_BODY.as_bytes()),
            Err(err) => Bytes::from(err.to_string()),
        };

        let ack = ack_envelope(&envelope, &self.node_name, &self.topic, body);
        match self.ctx.gateway().send(ack).await {
            Ok(()) => {
                debug!(
                    event = events::EVENTBUS_ACK_SENT,
                    component = COMPONENT,
                    rule = self.binding.rule_id(),
                    parent_id = envelope.id(),
                    "acknowledged producer"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    event = events::EVENTBUS_ACK_FAILED,
                    component = COMPONENT,
                    rule = self.binding.rule_id(),
                    parent_id = envelope.id(),
                    err = %err,
                    "unable to acknowledge producer"
                );
                Err(err)
            }
        }
    }
}

pub struct EventBusTarget {
    topic: String,
    node_name: Option<String>,
    ctx: Arc<ProviderContext>,
}

impl EventBusTarget {
    pub fn new(ctx: Arc<ProviderContext>, rule: &Rule) -> Result<Self, RouterError> {
        let topic = required(rule.target_property(KEY_TOPIC), KEY_TOPIC, "targetResource")?;
        Ok(Self {
            topic: topic.to_string(),
            node_name: rule.target_property(KEY_NODE_NAME).map(str::to_string),
            ctx,
        })
    }

    fn publish_envelope(&self, params: &TargetParams) -> Envelope {
        let node_name = self.node_name.as_deref().unwrap_or(&params.node_name);
        let resource = publish_resource(node_name, &self.topic, params.param.as_deref());
        Envelope::new(Route::new(
            SOURCE_ROUTER_EVENTBUS,
            GROUP_USER,
            resource,
            OP_PUBLISH,
        ))
        .id(params.message_id.as_str())
        .bytes(params.data.clone())
        .build()
    }
}

#[async_trait]
impl Target for EventBusTarget {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn go_to_target(
        &self,
        params: TargetParams,
        stop: Option<CancellationToken>,
    ) -> Result<Option<TargetResponse>, RouterError> {
        let envelope = self.publish_envelope(&params);
        debug!(
            event = events::EVENTBUS_PUBLISH,
            component = COMPONENT,
            msg_id = envelope.id(),
            resource = envelope.resource(),
            callback = params.wants_callback(),
            "publishing to edge topic"
        );

        let stop = match stop {
            Some(stop) if params.wants_callback() => stop,
            _ => {
                self.ctx.gateway().send(envelope).await?;
                return Ok(None);
            }
        };

        // Registered before sending so a fast reply cannot be missed.
        let mut pending = self.ctx.gateway().correlation().register(envelope.id());
        self.ctx.gateway().send(envelope).await?;

        tokio::select! {
            biased;
            _ = stop.cancelled() => Err(RouterError::Cancelled),
            reply = pending.recv() => {
                let reply = reply?;
                if reply.operation() == OP_ERROR {
                    Err(RouterError::Dispatch(
                        String::from_utf8_lossy(&reply.body_bytes()).into_owned(),
                    ))
                } else {
                    Ok(None)
                }
            }
        }
    }
}
