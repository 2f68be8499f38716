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

//! Rule and rule-endpoint store.
//!
//! Endpoints are plain records. Adding a rule resolves both endpoints, builds
//! the source and target through the [`ProviderRegistry`], and registers the
//! source listener before the rule becomes visible. Missing endpoints are
//! transient: [`RuleStore::add_rule_with_retry`] tries again with a linear
//! backoff before giving up and reporting a failed result.
//!
//! Each rule claims the route its source listens on (the REST template or the
//! event-bus subscription resource). A second rule on the same route in the
//! namespace is refused.

use crate::config::RetryConfig;
use crate::control_plane::registry::ProviderRegistry;
use crate::control_plane::validator::RuleCatalog;
use crate::error::RouterError;
use crate::model::{EndpointKind, Rule, RuleEndpoint, KEY_NODE_NAME, KEY_PATH, KEY_TOPIC};
use crate::observability::{events, fields};
use crate::providers::{eventbus, rest, ProviderContext, RuleBinding, Source};
use crate::runtime::status_aggregator::StatusSender;
use async_trait::async_trait;
use backon::BackoffBuilder;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const COMPONENT: &str = "rule_store";

/// Lifecycle of a rule: `Pending -> Active -> Terminated`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuleState {
    Pending,
    Active,
    Terminated,
}

/// Backoff growing by `base` per attempt: `base`, `2 * base`, ...
#[derive(Clone, Copy, Debug)]
pub struct LinearBuilder {
    base: Duration,
    max_times: usize,
}

impl LinearBuilder {
    pub fn new(base: Duration) -> Self {
        Self { base, max_times: 2 }
    }

    /// Number of delays handed out, one fewer than the attempts they separate.
    pub fn with_max_times(mut self, max_times: usize) -> Self {
        self.max_times = max_times;
        self
    }
}

impl From<&RetryConfig> for LinearBuilder {
    fn from(config: &RetryConfig) -> Self {
        LinearBuilder::new(Duration::from_secs(config.backoff_secs))
            .with_max_times(config.attempts.saturating_sub(1))
    }
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            base: self.base,
            attempt: 0,
            max_times: self.max_times,
        }
    }
}

#[derive(Debug)]
pub struct LinearBackoff {
    base: Duration,
    attempt: u32,
    max_times: usize,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt as usize >= self.max_times {
            return None;
        }
        self.attempt += 1;
        Some(self.base * self.attempt)
    }
}

struct RuleRecord {
    rule: Rule,
    source: Arc<dyn Source>,
    source_key: String,
}

/// Route a rule's source listens on. Two rules with the same key would
/// overwrite each other's listener.
fn source_key(rule: &Rule, kind: EndpointKind) -> String {
    let property = |key| rule.source_property(key).unwrap_or_default();
    match kind {
        EndpointKind::Rest => format!(
            "{kind}:{}",
            rest::source_template(rule.namespace(), property(KEY_PATH))
        ),
        EndpointKind::EventBus => format!(
            "{kind}:{}",
            eventbus::subscription_resource(
                property(KEY_NODE_NAME),
                rule.namespace(),
                property(KEY_TOPIC),
            )
        ),
        EndpointKind::ServiceBus => format!(
            "{kind}:{}/{}",
            rule.namespace(),
            property(KEY_PATH)
        ),
    }
}

pub struct RuleStore {
    registry: ProviderRegistry,
    ctx: Arc<ProviderContext>,
    results: StatusSender,
    backoff: LinearBuilder,
    endpoints: DashMap<String, RuleEndpoint>,
    rules: DashMap<String, RuleRecord>,
    /// source key -> rule key holding it
    sources: DashMap<String, String>,
    states: DashMap<String, RuleState>,
}

impl RuleStore {
    pub fn new(
        registry: ProviderRegistry,
        ctx: Arc<ProviderContext>,
        results: StatusSender,
        retry: &RetryConfig,
    ) -> Self {
        Self {
            registry,
            ctx,
            results,
            backoff: LinearBuilder::from(retry),
            endpoints: DashMap::new(),
            rules: DashMap::new(),
            sources: DashMap::new(),
            states: DashMap::new(),
        }
    }

    pub fn add_endpoint(&self, endpoint: RuleEndpoint) {
        info!(
            event = events::ENDPOINT_UPSERT,
            component = COMPONENT,
            endpoint = %endpoint.key(),
            kind = endpoint.kind().as_str(),
            "storing rule endpoint"
        );
        self.endpoints.insert(endpoint.key(), endpoint);
    }

    /// Rules still pointing at the endpoint keep running.
    pub fn delete_endpoint(&self, namespace: &str, name: &str) -> bool {
        let key = fields::format_object_key(namespace, name);
        let removed = self.endpoints.remove(&key).is_some();
        info!(
            event = events::ENDPOINT_DELETE,
            component = COMPONENT,
            endpoint = key.as_str(),
            removed,
            "deleting rule endpoint"
        );
        removed
    }

    pub fn get_endpoint(&self, namespace: &str, name: &str) -> Option<RuleEndpoint> {
        self.endpoints
            .get(&fields::format_object_key(namespace, name))
            .map(|entry| entry.value().clone())
    }

    pub fn get_rule(&self, namespace: &str, name: &str) -> Option<Rule> {
        self.rules
            .get(&fields::format_object_key(namespace, name))
            .map(|entry| entry.rule.clone())
    }

    pub fn rule_state(&self, namespace: &str, name: &str) -> Option<RuleState> {
        self.states
            .get(&fields::format_object_key(namespace, name))
            .map(|entry| *entry)
    }

    pub fn rules_in(&self, namespace: &str) -> Vec<Rule> {
        self.rules
            .iter()
            .filter(|entry| entry.rule.namespace() == namespace)
            .map(|entry| entry.rule.clone())
            .collect()
    }

    pub fn endpoints_in(&self, namespace: &str) -> Vec<RuleEndpoint> {
        self.endpoints
            .iter()
            .filter(|entry| entry.metadata.namespace == namespace)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn claim_source(&self, source_key: &str, rule_key: &str) -> Result<(), RouterError> {
        match self.sources.entry(source_key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(rule_key.to_string());
                Ok(())
            }
            Entry::Occupied(owner) if owner.get() == rule_key => {
                Err(RouterError::RuleExists(rule_key.to_string()))
            }
            Entry::Occupied(owner) => Err(RouterError::SourceInUse {
                rule: rule_key.to_string(),
                owner: owner.get().clone(),
                source_key: source_key.to_string(),
            }),
        }
    }

    fn release_source(&self, source_key: &str, rule_key: &str) {
        self.sources
            .remove_if(source_key, |_, owner| owner == rule_key);
    }

    async fn wire(
        &self,
        rule: &Rule,
        source_endpoint: &RuleEndpoint,
        target_endpoint: &RuleEndpoint,
    ) -> Result<Arc<dyn Source>, RouterError> {
        let source = self
            .registry
            .create_source(&self.ctx, rule, source_endpoint)?;
        let target = self
            .registry
            .create_target(&self.ctx, rule, target_endpoint)?;
        let binding = Arc::new(RuleBinding::new(rule, target, self.results.clone()));
        source.register_listener(binding).await?;
        Ok(source)
    }

    fn resolve(&self, rule: &Rule, name: &str) -> Result<RuleEndpoint, RouterError> {
        self.get_endpoint(rule.namespace(), name)
            .ok_or_else(|| RouterError::EndpointNotFound {
                namespace: rule.namespace().to_string(),
                name: name.to_string(),
            })
    }

    /// Single wiring attempt. The rule is stored only once its listener is up.
    pub async fn add_rule(&self, rule: &Rule) -> Result<(), RouterError> {
        let key = rule.key();
        if self.rules.contains_key(&key) {
            return Err(RouterError::RuleExists(key));
        }

        let source_endpoint = self.resolve(rule, &rule.spec.source)?;
        let target_endpoint = self.resolve(rule, &rule.spec.target)?;
        if !EndpointKind::is_legal_pair(source_endpoint.kind(), target_endpoint.kind()) {
            return Err(RouterError::IllegalPair {
                source_kind: source_endpoint.kind().to_string(),
                target_kind: target_endpoint.kind().to_string(),
            });
        }

        let claimed = source_key(rule, source_endpoint.kind());
        if let Err(err) = self.claim_source(&claimed, &key) {
            warn!(
                event = events::RULE_ADD_FAILED,
                component = COMPONENT,
                rule = key.as_str(),
                source_key = claimed.as_str(),
                err = %err,
                "rule source is already claimed"
            );
            return Err(err);
        }

        let source = match self.wire(rule, &source_endpoint, &target_endpoint).await {
            Ok(source) => source,
            Err(err) => {
                self.release_source(&claimed, &key);
                return Err(err);
            }
        };

        let inserted = match self.rules.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RuleRecord {
                    rule: rule.clone(),
                    source: Arc::clone(&source),
                    source_key: claimed.clone(),
                });
                true
            }
        };
        if !inserted {
            warn!(
                event = events::RULE_ADD_FAILED,
                component = COMPONENT,
                rule = key.as_str(),
                reason = fields::REASON_ROLLBACK,
                "rule was added concurrently, releasing listener"
            );
            let released = source.unregister_listener().await;
            self.release_source(&claimed, &key);
            released?;
            return Err(RouterError::RuleExists(key));
        }

        self.states.insert(key.clone(), RuleState::Active);
        info!(
            event = events::RULE_ADD_OK,
            component = COMPONENT,
            rule = key.as_str(),
            source = source.name(),
            "rule is active"
        );
        Ok(())
    }

    /// Adds `rule`, retrying transient failures with a linear backoff.
    ///
    /// A final failure marks the rule terminated and posts a failed result.
    pub async fn add_rule_with_retry(&self, rule: &Rule) -> Result<(), RouterError> {
        let key = rule.key();
        info!(
            event = events::RULE_ADD_START,
            component = COMPONENT,
            rule = key.as_str(),
            "adding rule"
        );
        self.states
            .entry(key.clone())
            .and_modify(|state| {
                if *state != RuleState::Active {
                    *state = RuleState::Pending;
                }
            })
            .or_insert(RuleState::Pending);

        let mut delays = self.backoff.build();
        let mut attempt = 1;
        let err = loop {
            let err = match self.add_rule(rule).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if !err.is_transient() {
                break err;
            }
            let Some(delay) = delays.next() else {
                break err;
            };
            warn!(
                event = events::RULE_ADD_RETRY,
                component = COMPONENT,
                rule = key.as_str(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                err = %err,
                "rule wiring failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        if matches!(err, RouterError::RuleExists(_)) {
            return Err(err);
        }

        self.states.insert(key.clone(), RuleState::Terminated);
        self.results
            .fail(rule.name(), rule.namespace(), err.to_string());
        error!(
            event = events::RULE_ADD_FAILED,
            component = COMPONENT,
            rule = key.as_str(),
            attempts = attempt,
            err = %err,
            "giving up on rule"
        );
        Err(err)
    }

    /// Replaces the rule: the old listener goes away before the new one is wired.
    pub async fn update_rule(&self, rule: &Rule) -> Result<(), RouterError> {
        self.delete_rule(rule.namespace(), rule.name()).await?;
        self.add_rule_with_retry(rule).await
    }

    /// Unregisters and forgets the rule, including its lifecycle state. A
    /// missing rule is only logged.
    pub async fn delete_rule(&self, namespace: &str, name: &str) -> Result<(), RouterError> {
        let key = fields::format_object_key(namespace, name);
        self.states.remove(&key);
        let Some((_, record)) = self.rules.remove(&key) else {
            warn!(
                event = events::RULE_DELETE_MISSING,
                component = COMPONENT,
                rule = key.as_str(),
                "rule to delete is not installed"
            );
            return Ok(());
        };

        let released = record.source.unregister_listener().await;
        self.release_source(&record.source_key, &key);
        if let Err(err) = released {
            warn!(
                event = events::RULE_DELETE_FAILED,
                component = COMPONENT,
                rule = key.as_str(),
                err = %err,
                "unable to release rule listener"
            );
            return Err(err);
        }
        info!(
            event = events::RULE_DELETE_OK,
            component = COMPONENT,
            rule = key.as_str(),
            "rule deleted"
        );
        Ok(())
    }
}

#[async_trait]
impl RuleCatalog for RuleStore {
    async fn get_rule_endpoint(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RuleEndpoint>, String> {
        Ok(self.get_endpoint(namespace, name))
    }

    async fn list_rules(&self, namespace: &str) -> Result<Vec<Rule>, String> {
        Ok(self.rules_in(namespace))
    }

    async fn list_rule_endpoints(&self, namespace: &str) -> Result<Vec<RuleEndpoint>, String> {
        Ok(self.endpoints_in(namespace))
    }
}
