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

//! REST endpoint: ingress source on the shared listener and HTTP POST target.

use crate::data_plane::dispatcher;
use crate::data_plane::rest_listener::{RestHandler, RestRequest};
use crate::error::RouterError;
use crate::model::{Rule, KEY_PATH, KEY_RESOURCE};
use crate::providers::{
    until_stopped, ProviderContext, RuleBinding, Source, Target, TargetParams, TargetResponse,
};
use async_trait::async_trait;
use http::header;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const NAME: &str = "rest";

/// Listener template for a rule path: node segment, namespace, then the path.
pub fn source_template(namespace: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("/{{node_name}}/{namespace}{path}")
    } else {
        format!("/{{node_name}}/{namespace}/{path}")
    }
}

pub struct RestSource {
    template: String,
    ctx: Arc<ProviderContext>,
}

impl RestSource {
    pub fn new(ctx: Arc<ProviderContext>, rule: &Rule) -> Result<Self, RouterError> {
        let path = rule
            .source_property(KEY_PATH)
            .ok_or(RouterError::MissingResource {
                key: KEY_PATH,
                section: "sourceResource",
            })?;
        Ok(Self {
            template: source_template(rule.namespace(), path),
            ctx,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

#[async_trait]
impl Source for RestSource {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn register_listener(&self, binding: Arc<RuleBinding>) -> Result<(), RouterError> {
        let listener = self.ctx.rest_listener().await?;
        listener
            .routes()
            .add(&self.template, Arc::new(RestRuleHandler { binding }))
    }

    async fn unregister_listener(&self) -> Result<(), RouterError> {
        self.ctx.rest_routes().remove(&self.template);
        Ok(())
    }
}

struct RestRuleHandler {
    binding: Arc<RuleBinding>,
}

#[async_trait]
impl RestHandler for RestRuleHandler {
    async fn handle(&self, request: RestRequest) -> TargetResponse {
        let param = (request.captures.len() > 1).then(|| request.captures[1..].join("/"));
        let params = TargetParams {
            message_id: request.message_id,
            node_name: request.node_name,
            method: request.method,
            uri: request.uri,
            headers: request.headers,
            param,
            data: request.data,
        };
        dispatcher::forward_request(&self.binding, params, request.timeout, request.context).await
    }
}

pub struct RestTarget {
    resource: String,
    ctx: Arc<ProviderContext>,
}

impl RestTarget {
    pub fn new(ctx: Arc<ProviderContext>, rule: &Rule) -> Result<Self, RouterError> {
        let resource = rule
            .target_property(KEY_RESOURCE)
            .ok_or(RouterError::MissingResource {
                key: KEY_RESOURCE,
                section: "targetResource",
            })?;
        Ok(Self {
            resource: resource.to_string(),
            ctx,
        })
    }
}

#[async_trait]
impl Target for RestTarget {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn go_to_target(
        &self,
        params: TargetParams,
        stop: Option<CancellationToken>,
    ) -> Result<Option<TargetResponse>, RouterError> {
        let mut request = self
            .ctx
            .http_client()
            .post(&self.resource)
            .timeout(self.ctx.config().rest_target_timeout())
            .body(params.data);
        if let Some(content_type) = params.headers.get(header::CONTENT_TYPE) {
            request = request.header(header::CONTENT_TYPE, content_type);
        }

        let call = async {
            let response = request
                .send()
                .await
                .map_err(|err| RouterError::Dispatch(err.to_string()))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|err| RouterError::Dispatch(err.to_string()))?;
            Ok(Some(TargetResponse {
                status,
                headers,
                body,
            }))
        };
        until_stopped(call, stop).await
    }
}
