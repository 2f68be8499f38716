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

//! Applies rule and rule-endpoint changes pushed by the cloud rule controller.

use crate::control_plane::rule_store::RuleStore;
use crate::data_plane::hub_gateway::{EnvelopeHandler, HandlerKey};
use crate::envelope::{
    Envelope, OP_DELETE, OP_INSERT, OP_UPDATE, RESOURCE_RULE, RESOURCE_RULE_ENDPOINT,
    SOURCE_RULE_CONTROLLER,
};
use crate::error::RouterError;
use crate::model::{Rule, RuleEndpoint};
use crate::observability::events;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "rule_controller";

/// Gateway keys the controller handler is installed under.
pub fn handler_keys() -> [HandlerKey; 2] {
    [
        HandlerKey::new(SOURCE_RULE_CONTROLLER, RESOURCE_RULE),
        HandlerKey::new(SOURCE_RULE_CONTROLLER, RESOURCE_RULE_ENDPOINT),
    ]
}

/// Splits `<kind>/<namespace>/<name>`.
fn parse_resource(resource: &str) -> Result<(&str, &str, &str), RouterError> {
    let mut segments = resource.split('/');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(kind), Some(namespace), Some(name), None)
            if !namespace.is_empty() && !name.is_empty() =>
        {
            Ok((kind, namespace, name))
        }
        _ => Err(RouterError::Decode(format!(
            "resource {resource} is not <kind>/<namespace>/<name>"
        ))),
    }
}

/// Refuses an object whose metadata disagrees with the resource it arrived on.
fn ensure_named(
    envelope: &Envelope,
    (namespace, name): (&str, &str),
    (object_namespace, object_name): (&str, &str),
) -> Result<(), RouterError> {
    if namespace == object_namespace && name == object_name {
        return Ok(());
    }
    Err(RouterError::Decode(format!(
        "object {object_namespace}/{object_name} does not match resource {}",
        envelope.resource()
    )))
}

pub struct RuleControllerHandler {
    store: Arc<RuleStore>,
}

impl RuleControllerHandler {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    async fn apply_rule(
        &self,
        envelope: &Envelope,
        namespace: &str,
        name: &str,
    ) -> Result<(), RouterError> {
        match envelope.operation() {
            OP_INSERT => {
                let rule: Rule = envelope.decode_content()?;
                ensure_named(envelope, (namespace, name), (rule.namespace(), rule.name()))?;
                self.store.add_rule_with_retry(&rule).await
            }
            OP_UPDATE => {
                let rule: Rule = envelope.decode_content()?;
                ensure_named(envelope, (namespace, name), (rule.namespace(), rule.name()))?;
                self.store.update_rule(&rule).await
            }
            OP_DELETE => self.store.delete_rule(namespace, name).await,
            other => {
                unknown_operation(envelope, other);
                Ok(())
            }
        }
    }

    fn apply_endpoint(
        &self,
        envelope: &Envelope,
        namespace: &str,
        name: &str,
    ) -> Result<(), RouterError> {
        match envelope.operation() {
            OP_INSERT | OP_UPDATE => {
                let endpoint: RuleEndpoint = envelope.decode_content()?;
                ensure_named(
                    envelope,
                    (namespace, name),
                    (&endpoint.metadata.namespace, &endpoint.metadata.name),
                )?;
                self.store.add_endpoint(endpoint);
            }
            OP_DELETE => {
                self.store.delete_endpoint(namespace, name);
            }
            other => unknown_operation(envelope, other),
        }
        Ok(())
    }
}

fn unknown_operation(envelope: &Envelope, operation: &str) {
    warn!(
        event = events::CONTROLLER_UNKNOWN_OPERATION,
        component = COMPONENT,
        msg_id = envelope.id(),
        resource = envelope.resource(),
        operation,
        "ignoring unknown controller operation"
    );
}

#[async_trait]
impl EnvelopeHandler for RuleControllerHandler {
    async fn handle(&self, envelope: Envelope) -> Result<(), RouterError> {
        let (kind, namespace, name) = parse_resource(envelope.resource())?;
        match kind {
            RESOURCE_RULE => self.apply_rule(&envelope, namespace, name).await,
            RESOURCE_RULE_ENDPOINT => self.apply_endpoint(&envelope, namespace, name),
            other => Err(RouterError::Decode(format!("unknown controller resource {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, RouterConfig, StatusConfig};
    use crate::control_plane::registry::ProviderRegistry;
    use crate::control_plane::rule_store::RuleState;
    use crate::data_plane::hub::ChannelHub;
    use crate::data_plane::hub_gateway::HubGateway;
    use crate::envelope::{Route, GROUP_RESOURCE};
    use crate::model::{EndpointKind, KEY_NODE_NAME, KEY_RESOURCE, KEY_TOPIC};
    use crate::providers::ProviderContext;
    use crate::runtime::status_aggregator::{self, NoopReporter};
    use tokio_util::sync::CancellationToken;

    fn handler() -> (RuleControllerHandler, Arc<RuleStore>) {
        let hub = Arc::new(ChannelHub::new("cloudhub", 16));
        let gateway = Arc::new(HubGateway::new(hub, "router"));
        let ctx = Arc::new(ProviderContext::new(
            RouterConfig::default(),
            gateway,
            CancellationToken::new(),
        ));
        let (results, _aggregator) =
            status_aggregator::channel(&StatusConfig::default(), Arc::new(NoopReporter));
        let store = Arc::new(RuleStore::new(
            ProviderRegistry::with_defaults(),
            ctx,
            results,
            &RetryConfig::default(),
        ));
        (RuleControllerHandler::new(Arc::clone(&store)), store)
    }

    fn envelope<T: serde::Serialize>(resource: &str, operation: &str, object: &T) -> Envelope {
        Envelope::new(Route::new(
            SOURCE_RULE_CONTROLLER,
            GROUP_RESOURCE,
            resource,
            operation,
        ))
        .json(object)
        .unwrap()
        .build()
    }

    #[test]
    fn resources_must_name_namespace_and_object() {
        assert_eq!(parse_resource("rule/default/r1").unwrap(), ("rule", "default", "r1"));
        assert!(parse_resource("rule/default").is_err());
        assert!(parse_resource("rule/default/r1/extra").is_err());
    }

    #[tokio::test]
    async fn endpoint_then_rule_lifecycle() {
        let (handler, store) = handler();
        let bus = RuleEndpoint::new("default", "bus-ep", EndpointKind::EventBus);
        let rest = RuleEndpoint::new("default", "rest-ep", EndpointKind::Rest);
        let rule = Rule::new("default", "r1", "bus-ep", "rest-ep")
            .with_source_resource(KEY_NODE_NAME, "n")
            .with_source_resource(KEY_TOPIC, "t")
            .with_target_resource(KEY_RESOURCE, "http://127.0.0.1:1/x");

        handler
            .handle(envelope("ruleendpoint/default/bus-ep", OP_INSERT, &bus))
            .await
            .unwrap();
        handler
            .handle(envelope("ruleendpoint/default/rest-ep", OP_INSERT, &rest))
            .await
            .unwrap();
        handler
            .handle(envelope("rule/default/r1", OP_INSERT, &rule))
            .await
            .unwrap();
        assert_eq!(store.rule_state("default", "r1"), Some(RuleState::Active));

        handler
            .handle(envelope("rule/default/r1", OP_DELETE, &serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(store.rule_state("default", "r1"), None);
        assert_eq!(store.rule_count(), 0);

        handler
            .handle(envelope("ruleendpoint/default/bus-ep", OP_DELETE, &serde_json::Value::Null))
            .await
            .unwrap();
        assert!(store.get_endpoint("default", "bus-ep").is_none());
    }

    #[tokio::test]
    async fn unknown_operations_are_ignored() {
        let (handler, store) = handler();
        handler
            .handle(envelope("rule/default/r1", "patch", &serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(store.rule_count(), 0);
    }

    #[tokio::test]
    async fn objects_must_match_their_resource() {
        let (handler, store) = handler();
        let rest = RuleEndpoint::new("default", "rest-ep", EndpointKind::Rest);
        let rule = Rule::new("default", "r1", "bus-ep", "rest-ep");

        let err = handler
            .handle(envelope("ruleendpoint/default/other", OP_INSERT, &rest))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Decode(_)));
        assert!(store.get_endpoint("default", "rest-ep").is_none());
        assert!(store.get_endpoint("default", "other").is_none());

        let err = handler
            .handle(envelope("rule/prod/r1", OP_INSERT, &rule))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "decode failed: object default/r1 does not match resource rule/prod/r1"
        );
        let err = handler
            .handle(envelope("rule/default/r2", OP_UPDATE, &rule))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Decode(_)));
        assert_eq!(store.rule_state("default", "r1"), None);
        assert_eq!(store.rule_state("default", "r2"), None);
    }

    #[tokio::test]
    async fn undecodable_rule_is_an_error() {
        let (handler, _store) = handler();
        let err = handler
            .handle(envelope("rule/default/r1", OP_INSERT, &"not a rule"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Decode(_)));
    }
}
