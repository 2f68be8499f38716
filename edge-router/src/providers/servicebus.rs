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

//! Service-bus endpoint: HTTP calls proxied to a service on an edge node.

use crate::envelope::{Envelope, Route, GROUP_USER, OP_ERROR, SOURCE_ROUTER_SERVICEBUS};
use crate::error::RouterError;
use crate::model::{Rule, RuleEndpoint, KEY_PATH, KEY_SERVICE_PORT};
use crate::observability::events;
use crate::providers::{ProviderContext, Target, TargetParams, TargetResponse};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const COMPONENT: &str = "servicebus";

pub const NAME: &str = "servicebus";

/// Request carried to the edge service bus.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ServiceRequest {
    pub method: String,
    pub header: BTreeMap<String, String>,
    pub body: String,
}

/// Reply the edge service bus sends back.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    #[serde(default)]
    pub header: BTreeMap<String, String>,
    pub status_code: u16,
    #[serde(default)]
    pub body: String,
}

impl TryFrom<ServiceResponse> for TargetResponse {
    type Error = RouterError;

    fn try_from(reply: ServiceResponse) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(reply.status_code)
            .map_err(|err| RouterError::Decode(err.to_string()))?;
        let mut headers = HeaderMap::new();
        for (name, value) in &reply.header {
            // Headers that are not valid HTTP are dropped.
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, value);
            }
        }
        Ok(TargetResponse {
            status,
            headers,
            body: Bytes::from(reply.body),
        })
    }
}

pub struct ServiceBusTarget {
    service_port: String,
    path: String,
    ctx: Arc<ProviderContext>,
}

impl ServiceBusTarget {
    pub fn new(
        ctx: Arc<ProviderContext>,
        rule: &Rule,
        endpoint: &RuleEndpoint,
    ) -> Result<Self, RouterError> {
        let service_port = endpoint
            .property(KEY_SERVICE_PORT)
            .ok_or(RouterError::MissingResource {
                key: KEY_SERVICE_PORT,
                section: "properties",
            })?;
        let path = rule
            .target_property(KEY_PATH)
            .ok_or(RouterError::MissingResource {
                key: KEY_PATH,
                section: "targetResource",
            })?;
        Ok(Self {
            service_port: service_port.to_string(),
            path: path.to_string(),
            ctx,
        })
    }

    fn request_envelope(&self, params: &TargetParams) -> Result<Envelope, RouterError> {
        let header = params
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let request = ServiceRequest {
            method: params.method.as_str().to_string(),
            header,
            body: String::from_utf8_lossy(&params.data).into_owned(),
        };
        let route = Route::new(
            SOURCE_ROUTER_SERVICEBUS,
            GROUP_USER,
            format!(
                "node/{}/{}:{}",
                params.node_name, self.service_port, self.path
            ),
            params.method.as_str().to_lowercase(),
        );
        Ok(Envelope::new(route)
            .id(params.message_id.as_str())
            .json(&request)?
            .build())
    }
}

#[async_trait]
impl Target for ServiceBusTarget {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn go_to_target(
        &self,
        params: TargetParams,
        stop: Option<CancellationToken>,
    ) -> Result<Option<TargetResponse>, RouterError> {
        let envelope = self.request_envelope(&params)?;
        debug!(
            event = events::SERVICEBUS_REQUEST,
            component = COMPONENT,
            msg_id = envelope.id(),
            resource = envelope.resource(),
            operation = envelope.operation(),
            "forwarding request to edge service"
        );

        let gateway = self.ctx.gateway();
        let mut pending = gateway.correlation().register(envelope.id());
        gateway.send(envelope).await?;

        let stop = stop.unwrap_or_default();
        let reply = tokio::select! {
            biased;
            _ = stop.cancelled() => return Err(RouterError::Cancelled),
            _ = tokio::time::sleep(self.ctx.config().rest_timeout()) => return Err(RouterError::Timeout),
            reply = pending.recv() => reply?,
        };

        if reply.operation() == OP_ERROR {
            return Err(RouterError::Dispatch(
                String::from_utf8_lossy(&reply.body_bytes()).into_owned(),
            ));
        }
        let response: ServiceResponse = reply.decode_content()?;
        response.try_into().map(Some)
    }
}
