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

//! Read-only rule checks shared by admission and rule seeding.

use crate::error::ValidationError;
use crate::model::{
    EndpointKind, Rule, RuleEndpoint, KEY_NODE_NAME, KEY_PATH, KEY_RESOURCE, KEY_SERVICE_PORT,
    KEY_TOPIC,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Lookups the validator needs. Failures carry the backend's own message.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    async fn get_rule_endpoint(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RuleEndpoint>, String>;

    async fn list_rules(&self, namespace: &str) -> Result<Vec<Rule>, String>;

    async fn list_rule_endpoints(&self, namespace: &str) -> Result<Vec<RuleEndpoint>, String>;
}

fn require(
    resource: &BTreeMap<String, String>,
    key: &'static str,
    missing: fn(&'static str) -> ValidationError,
) -> Result<(), ValidationError> {
    match resource.get(key) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(missing(key)),
    }
}

/// Checks source keys and that no other rule already owns the same source.
pub async fn validate_source_rule_endpoint(
    catalog: &dyn RuleCatalog,
    endpoint: &RuleEndpoint,
    rule: &Rule,
) -> Result<(), ValidationError> {
    let resource = &rule.spec.source_resource;
    match endpoint.kind() {
        EndpointKind::Rest => {
            require(resource, KEY_PATH, ValidationError::MissingSourceProperty)?;
            let path = rule.source_property(KEY_PATH).unwrap_or_default();
            for other in siblings(catalog, rule).await? {
                if other.source_property(KEY_PATH) == Some(path) {
                    return Err(ValidationError::SourcePathInUse {
                        namespace: other.namespace().to_string(),
                        name: other.name().to_string(),
                        path: path.to_string(),
                    });
                }
            }
        }
        EndpointKind::EventBus => {
            require(resource, KEY_TOPIC, ValidationError::MissingSourceProperty)?;
            require(resource, KEY_NODE_NAME, ValidationError::MissingSourceProperty)?;
            let topic = rule.source_property(KEY_TOPIC).unwrap_or_default();
            let node_name = rule.source_property(KEY_NODE_NAME).unwrap_or_default();
            for other in siblings(catalog, rule).await? {
                if other.source_property(KEY_TOPIC) == Some(topic)
                    && other.source_property(KEY_NODE_NAME) == Some(node_name)
                {
                    return Err(ValidationError::SourceTopicInUse {
                        namespace: other.namespace().to_string(),
                        name: other.name().to_string(),
                        node_name: node_name.to_string(),
                        topic: topic.to_string(),
                    });
                }
            }
        }
        EndpointKind::ServiceBus => {
            require(resource, KEY_PATH, ValidationError::MissingSourceProperty)?;
        }
    }
    Ok(())
}

/// Every other rule of the namespace, whatever endpoint it reads from.
async fn siblings(catalog: &dyn RuleCatalog, rule: &Rule) -> Result<Vec<Rule>, ValidationError> {
    let rules = catalog
        .list_rules(rule.namespace())
        .await
        .map_err(ValidationError::Catalog)?;
    Ok(rules
        .into_iter()
        .filter(|other| other.name() != rule.name())
        .collect())
}

pub fn validate_target_rule_endpoint(
    endpoint: &RuleEndpoint,
    target_resource: &BTreeMap<String, String>,
) -> Result<(), ValidationError> {
    let key = match endpoint.kind() {
        EndpointKind::Rest => KEY_RESOURCE,
        EndpointKind::EventBus => KEY_TOPIC,
        EndpointKind::ServiceBus => KEY_PATH,
    };
    require(target_resource, key, ValidationError::MissingTargetProperty)
}

pub fn validate_pair(source: EndpointKind, target: EndpointKind) -> Result<(), ValidationError> {
    if EndpointKind::is_legal_pair(source, target) {
        Ok(())
    } else {
        Err(ValidationError::IllegalPair {
            source_kind: source.to_string(),
            target_kind: target.to_string(),
        })
    }
}

/// Validates `rule` without mutating anything.
pub async fn validate_rule(catalog: &dyn RuleCatalog, rule: &Rule) -> Result<(), ValidationError> {
    let namespace = rule.namespace();

    let source = catalog
        .get_rule_endpoint(namespace, &rule.spec.source)
        .await
        .map_err(|reason| ValidationError::SourceEndpointUnavailable {
            namespace: namespace.to_string(),
            name: rule.spec.source.clone(),
            reason,
        })?
        .ok_or_else(|| ValidationError::SourceEndpointMissing {
            namespace: namespace.to_string(),
            name: rule.spec.source.clone(),
        })?;
    validate_source_rule_endpoint(catalog, &source, rule).await?;

    let target = catalog
        .get_rule_endpoint(namespace, &rule.spec.target)
        .await
        .map_err(|reason| ValidationError::TargetEndpointUnavailable {
            namespace: namespace.to_string(),
            name: rule.spec.target.clone(),
            reason,
        })?
        .ok_or_else(|| ValidationError::TargetEndpointMissing {
            namespace: namespace.to_string(),
            name: rule.spec.target.clone(),
        })?;
    validate_target_rule_endpoint(&target, &rule.spec.target_resource)?;

    validate_pair(source.kind(), target.kind())
}

/// Validates a rule endpoint: servicebus needs a port, rest and eventbus are
/// singletons per namespace.
pub async fn validate_rule_endpoint(
    catalog: &dyn RuleCatalog,
    endpoint: &RuleEndpoint,
) -> Result<(), ValidationError> {
    match endpoint.kind() {
        EndpointKind::ServiceBus => {
            if endpoint.property(KEY_SERVICE_PORT).is_none() {
                return Err(ValidationError::MissingServicePort);
            }
        }
        kind @ (EndpointKind::Rest | EndpointKind::EventBus) => {
            let existing = catalog
                .list_rule_endpoints(&endpoint.metadata.namespace)
                .await
                .map_err(ValidationError::Catalog)?;
            let taken = existing.iter().any(|other| {
                other.kind() == kind && other.metadata.name != endpoint.metadata.name
            });
            if taken {
                return Err(ValidationError::DuplicateEndpointKind(kind.to_string()));
            }
        }
    }
    Ok(())
}
