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

//! Source and target adapters for each endpoint kind.
//!
//! A rule is wired as one [`Source`] that owns the inbound listener and one
//! [`Target`] that delivers the payload. The two meet in a [`RuleBinding`].

pub mod eventbus;
pub mod rest;
pub mod servicebus;

use crate::config::RouterConfig;
use crate::data_plane::hub_gateway::HubGateway;
use crate::data_plane::rest_listener::{RestListener, RestRoutes};
use crate::error::RouterError;
use crate::model::Rule;
use crate::runtime::status_aggregator::StatusSender;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

pub const DELIVERED_BODY: &str = "message delivered";

/// Inputs for one target invocation.
#[derive(Clone, Debug)]
pub struct TargetParams {
    pub message_id: String,
    pub node_name: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Placeholder values captured after the node segment, joined by `/`.
    pub param: Option<String>,
    pub data: Bytes,
}

impl TargetParams {
    pub fn new(message_id: impl Into<String>, node_name: impl Into<String>, data: Bytes) -> Self {
        Self {
            message_id: message_id.into(),
            node_name: node_name.into(),
            method: Method::POST,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            param: None,
            data,
        }
    }

    /// Whether the caller asked to wait for the edge's acknowledgement.
    pub fn wants_callback(&self) -> bool {
        self.headers
            .get("callback")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}

/// HTTP-shaped outcome written back to a REST caller.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TargetResponse {
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn delivered() -> Self {
        Self::text(StatusCode::OK, DELIVERED_BODY)
    }
}

#[async_trait]
pub trait Target: Send + Sync {
    fn name(&self) -> &'static str;

    /// Delivers `params`. `stop` fires when the caller stopped waiting; a
    /// target that installed a correlation entry must release it.
    async fn go_to_target(
        &self,
        params: TargetParams,
        stop: Option<CancellationToken>,
    ) -> Result<Option<TargetResponse>, RouterError>;
}

#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    async fn register_listener(&self, binding: Arc<RuleBinding>) -> Result<(), RouterError>;

    async fn unregister_listener(&self) -> Result<(), RouterError>;
}

/// Rule identity plus the target and status channel its listener feeds.
pub struct RuleBinding {
    rule_id: String,
    namespace: String,
    target: Arc<dyn Target>,
    results: StatusSender,
}

impl RuleBinding {
    pub fn new(rule: &Rule, target: Arc<dyn Target>, results: StatusSender) -> Self {
        Self {
            rule_id: rule.name().to_string(),
            namespace: rule.namespace().to_string(),
            target,
            results,
        }
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn target(&self) -> &Arc<dyn Target> {
        &self.target
    }

    pub(crate) fn record_success(&self) {
        self.results.success(&self.rule_id, &self.namespace);
    }

    pub(crate) fn record_failure(&self, err: &RouterError) {
        self.results
            .fail(&self.rule_id, &self.namespace, err.to_string());
    }
}

/// Shared handles every adapter is built with.
pub struct ProviderContext {
    config: RouterConfig,
    gateway: Arc<HubGateway>,
    rest_routes: Arc<RestRoutes>,
    rest_listener: OnceCell<Arc<RestListener>>,
    http: reqwest::Client,
    shutdown: CancellationToken,
}

impl ProviderContext {
    pub fn new(config: RouterConfig, gateway: Arc<HubGateway>, shutdown: CancellationToken) -> Self {
        let rest_routes = Arc::new(RestRoutes::new(config.rest_timeout()));
        Self {
            config,
            gateway,
            rest_routes,
            rest_listener: OnceCell::new(),
            http: reqwest::Client::new(),
            shutdown,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<HubGateway> {
        &self.gateway
    }

    pub fn rest_routes(&self) -> &Arc<RestRoutes> {
        &self.rest_routes
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the REST listener, binding it on first use.
    pub async fn rest_listener(&self) -> Result<Arc<RestListener>, RouterError> {
        self.rest_listener
            .get_or_try_init(|| async {
                RestListener::bind(
                    &self.config.address,
                    self.config.port,
                    Arc::clone(&self.rest_routes),
                    self.shutdown.child_token(),
                )
                .await
                .map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }

    /// The REST listener if a REST source already started it.
    pub fn started_rest_listener(&self) -> Option<Arc<RestListener>> {
        self.rest_listener.get().cloned()
    }
}

/// Runs `work` until it finishes or `stop` fires.
pub(crate) async fn until_stopped<T, F>(
    work: F,
    stop: Option<CancellationToken>,
) -> Result<T, RouterError>
where
    F: Future<Output = Result<T, RouterError>>,
{
    match stop {
        Some(stop) => tokio::select! {
            biased;
            _ = stop.cancelled() => Err(RouterError::Cancelled),
            outcome = work => outcome,
        },
        None => work.await,
    }
}
