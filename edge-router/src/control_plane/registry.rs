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

//! Source and target factories keyed by endpoint kind.

use crate::error::RouterError;
use crate::model::{EndpointKind, Rule, RuleEndpoint};
use crate::providers::eventbus::{EventBusSource, EventBusTarget};
use crate::providers::rest::{RestSource, RestTarget};
use crate::providers::servicebus::ServiceBusTarget;
use crate::providers::{ProviderContext, Source, Target};
use std::collections::HashMap;
use std::sync::Arc;

pub type SourceFactory =
    fn(&Arc<ProviderContext>, &Rule, &RuleEndpoint) -> Result<Arc<dyn Source>, RouterError>;

pub type TargetFactory =
    fn(&Arc<ProviderContext>, &Rule, &RuleEndpoint) -> Result<Arc<dyn Target>, RouterError>;

/// Immutable once the router is built.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    sources: HashMap<EndpointKind, SourceFactory>,
    targets: HashMap<EndpointKind, TargetFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rest` and `eventbus` as source and target, `servicebus` as target.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_source(EndpointKind::Rest, |ctx, rule, _| {
                Ok(Arc::new(RestSource::new(Arc::clone(ctx), rule)?))
            })
            .with_source(EndpointKind::EventBus, |ctx, rule, _| {
                Ok(Arc::new(EventBusSource::new(Arc::clone(ctx), rule)?))
            })
            .with_target(EndpointKind::Rest, |ctx, rule, _| {
                Ok(Arc::new(RestTarget::new(Arc::clone(ctx), rule)?))
            })
            .with_target(EndpointKind::EventBus, |ctx, rule, _| {
                Ok(Arc::new(EventBusTarget::new(Arc::clone(ctx), rule)?))
            })
            .with_target(EndpointKind::ServiceBus, |ctx, rule, endpoint| {
                Ok(Arc::new(ServiceBusTarget::new(Arc::clone(ctx), rule, endpoint)?))
            })
    }

    pub fn with_source(mut self, kind: EndpointKind, factory: SourceFactory) -> Self {
        self.sources.insert(kind, factory);
        self
    }

    pub fn with_target(mut self, kind: EndpointKind, factory: TargetFactory) -> Self {
        self.targets.insert(kind, factory);
        self
    }

    pub fn supports_source(&self, kind: EndpointKind) -> bool {
        self.sources.contains_key(&kind)
    }

    pub fn supports_target(&self, kind: EndpointKind) -> bool {
        self.targets.contains_key(&kind)
    }

    pub fn create_source(
        &self,
        ctx: &Arc<ProviderContext>,
        rule: &Rule,
        endpoint: &RuleEndpoint,
    ) -> Result<Arc<dyn Source>, RouterError> {
        let factory = self
            .sources
            .get(&endpoint.kind())
            .ok_or_else(|| RouterError::UnsupportedSource(endpoint.kind().to_string()))?;
        factory(ctx, rule, endpoint)
    }

    pub fn create_target(
        &self,
        ctx: &Arc<ProviderContext>,
        rule: &Rule,
        endpoint: &RuleEndpoint,
    ) -> Result<Arc<dyn Target>, RouterError> {
        let factory = self
            .targets
            .get(&endpoint.kind())
            .ok_or_else(|| RouterError::UnsupportedTarget(endpoint.kind().to_string()))?;
        factory(ctx, rule, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::data_plane::hub::ChannelHub;
    use crate::data_plane::hub_gateway::HubGateway;
    use crate::model::{KEY_PATH, KEY_RESOURCE, KEY_TOPIC};
    use tokio_util::sync::CancellationToken;

    fn context() -> Arc<ProviderContext> {
        let hub = Arc::new(ChannelHub::new("cloudhub", 4));
        let gateway = Arc::new(HubGateway::new(hub, "router"));
        Arc::new(ProviderContext::new(
            RouterConfig::default(),
            gateway,
            CancellationToken::new(),
        ))
    }

    #[test]
    fn servicebus_is_target_only() {
        let registry = ProviderRegistry::with_defaults();
        let ctx = context();
        let endpoint = RuleEndpoint::new("default", "sb", EndpointKind::ServiceBus);
        let rule = Rule::new("default", "r1", "sb", "rest-ep");

        assert!(!registry.supports_source(EndpointKind::ServiceBus));
        assert!(registry.supports_target(EndpointKind::ServiceBus));
        assert!(matches!(
            registry.create_source(&ctx, &rule, &endpoint),
            Err(RouterError::UnsupportedSource(kind)) if kind == "servicebus"
        ));
    }

    #[test]
    fn default_factories_build_every_supported_adapter() {
        let registry = ProviderRegistry::with_defaults();
        let ctx = context();
        let rest = RuleEndpoint::new("default", "rest-ep", EndpointKind::Rest);
        let bus = RuleEndpoint::new("default", "bus-ep", EndpointKind::EventBus);
        let rule = Rule::new("default", "r1", "rest-ep", "bus-ep")
            .with_source_resource(KEY_PATH, "/q")
            .with_target_resource(KEY_TOPIC, "t")
            .with_target_resource(KEY_RESOURCE, "http://127.0.0.1:1/x");

        assert_eq!(registry.create_source(&ctx, &rule, &rest).unwrap().name(), "rest");
        assert_eq!(registry.create_target(&ctx, &rule, &bus).unwrap().name(), "eventbus");
        assert_eq!(registry.create_target(&ctx, &rule, &rest).unwrap().name(), "rest");
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let registry = ProviderRegistry::new();
        let ctx = context();
        let rest = RuleEndpoint::new("default", "rest-ep", EndpointKind::Rest);
        let rule = Rule::new("default", "r1", "rest-ep", "rest-ep");

        assert!(matches!(
            registry.create_target(&ctx, &rule, &rest),
            Err(RouterError::UnsupportedTarget(_))
        ));
    }
}
