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

//! Hub envelope model.
//!
//! An [`Envelope`] is immutable once built. Identity and timestamp are assigned by
//! [`Envelope::new`], the routing tuple is fixed when the builder is created, and a
//! reply carries the request id as its parent id.

use crate::error::RouterError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const GROUP_USER: &str = "user";
pub const GROUP_RESOURCE: &str = "resource";

pub const SOURCE_RULE_CONTROLLER: &str = "rulecontroller";
pub const SOURCE_EVENTBUS: &str = "eventbus";
pub const SOURCE_ROUTER: &str = "router";
pub const SOURCE_ROUTER_EVENTBUS: &str = "router_eventbus";
pub const SOURCE_ROUTER_SERVICEBUS: &str = "router_servicebus";

pub const OP_PUBLISH: &str = "publish";
pub const OP_SUBSCRIBE: &str = "subscribe";
pub const OP_UNSUBSCRIBE: &str = "unsubscribe";
pub const OP_INSERT: &str = "insert";
pub const OP_UPDATE: &str = "update";
pub const OP_DELETE: &str = "delete";
pub const OP_DETAIL_RESULT: &str = "detail_result";
pub const OP_RESPONSE: &str = "response";
pub const OP_ERROR: &str = "error";

pub const RESOURCE_RULE: &str = "rule";
pub const RESOURCE_RULE_ENDPOINT: &str = "ruleendpoint";
pub const RESOURCE_RULE_STATUS: &str = "rulestatus";

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Millisecond wall-clock time that never goes backwards within the process.
pub(crate) fn now_millis() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default();
    let previous = LAST_TIMESTAMP.fetch_max(now, Ordering::AcqRel);
    previous.max(now)
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Route {
    source: String,
    group: String,
    resource: String,
    operation: String,
}

impl Route {
    pub fn new(
        source: impl Into<String>,
        group: impl Into<String>,
        resource: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            group: group.into(),
            resource: resource.into(),
            operation: operation.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Empty,
    Bytes(Bytes),
    Json(serde_json::Value),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "EnvelopeWire", into = "EnvelopeWire")]
pub struct Envelope {
    id: String,
    parent_id: String,
    timestamp: i64,
    route: Route,
    content: Content,
}

/// Builder returned by [`Envelope::new`]; the route is already fixed.
#[derive(Debug)]
pub struct EnvelopeBuilder {
    id: String,
    parent_id: String,
    timestamp: i64,
    route: Route,
    content: Content,
}

impl Envelope {
    /// Starts an envelope with a fresh id and timestamp.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(route: Route) -> EnvelopeBuilder {
        EnvelopeBuilder {
            id: Uuid::new_v4().to_string(),
            parent_id: String::new(),
            timestamp: now_millis(),
            route,
            content: Content::Empty,
        }
    }

    /// Starts a response to `request` on the request's own route.
    pub fn response_to(request: &Envelope) -> EnvelopeBuilder {
        let route = Route {
            operation: OP_RESPONSE.to_string(),
            ..request.route.clone()
        };
        Envelope::new(route).parent(request)
    }

    /// Builds an error reply to `request` carrying `message` as content.
    pub fn error_reply_to(request: &Envelope, message: impl Into<String>) -> Envelope {
        let route = Route {
            operation: OP_ERROR.to_string(),
            ..request.route.clone()
        };
        Envelope::new(route)
            .parent(request)
            .content(Content::Json(serde_json::Value::String(message.into())))
            .build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn is_reply(&self) -> bool {
        !self.parent_id.is_empty()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.route.source
    }

    pub fn group(&self) -> &str {
        &self.route.group
    }

    pub fn resource(&self) -> &str {
        &self.route.resource
    }

    pub fn operation(&self) -> &str {
        &self.route.operation
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Returns the body as raw bytes. Structured content is a decode error.
    pub fn content_data(&self) -> Result<Bytes, RouterError> {
        match &self.content {
            Content::Bytes(bytes) => Ok(bytes.clone()),
            Content::Empty => Ok(Bytes::new()),
            Content::Json(_) => Err(RouterError::Decode(format!(
                "content of message {} is not a byte sequence",
                self.id
            ))),
        }
    }

    /// Returns the body as bytes, serializing structured content as JSON.
    pub fn body_bytes(&self) -> Bytes {
        match &self.content {
            Content::Bytes(bytes) => bytes.clone(),
            Content::Empty => Bytes::new(),
            Content::Json(serde_json::Value::String(text)) => Bytes::from(text.clone()),
            Content::Json(value) => Bytes::from(value.to_string()),
        }
    }

    /// Deserializes structured content, or a JSON byte body, into `T`.
    pub fn decode_content<T: DeserializeOwned>(&self) -> Result<T, RouterError> {
        let decoded = match &self.content {
            Content::Json(value) => serde_json::from_value(value.clone()),
            Content::Bytes(bytes) => serde_json::from_slice(bytes),
            Content::Empty => serde_json::from_slice(b"null"),
        };
        decoded.map_err(|err| RouterError::Decode(format!("message {}: {err}", self.id)))
    }
}

impl EnvelopeBuilder {
    /// Reuses an externally assigned id, e.g. a REST message id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Marks the envelope as a reply to `request`.
    pub fn parent(mut self, request: &Envelope) -> Self {
        self.parent_id = request.id.clone();
        self
    }

    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    pub fn content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn bytes(self, bytes: impl Into<Bytes>) -> Self {
        self.content(Content::Bytes(bytes.into()))
    }

    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, RouterError> {
        let value =
            serde_json::to_value(value).map_err(|err| RouterError::Decode(err.to_string()))?;
        Ok(self.content(Content::Json(value)))
    }

    pub fn build(self) -> Envelope {
        Envelope {
            id: self.id,
            parent_id: self.parent_id,
            timestamp: self.timestamp,
            route: self.route,
            content: self.content,
        }
    }
}

#[derive(Deserialize, Serialize)]
struct EnvelopeWire {
    id: String,
    #[serde(rename = "parentID", default)]
    parent_id: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    source: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    resource: String,
    #[serde(default)]
    operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<serde_json::Value>,
    #[serde(rename = "contentData", default, skip_serializing_if = "Option::is_none")]
    content_data: Option<Vec<u8>>,
}

impl From<EnvelopeWire> for Envelope {
    fn from(wire: EnvelopeWire) -> Self {
        let content = match (wire.content_data, wire.content) {
            (Some(data), _) => Content::Bytes(Bytes::from(data)),
            (None, Some(serde_json::Value::Null)) | (None, None) => Content::Empty,
            (None, Some(value)) => Content::Json(value),
        };
        Envelope {
            id: wire.id,
            parent_id: wire.parent_id,
            timestamp: wire.timestamp,
            route: Route::new(wire.source, wire.group, wire.resource, wire.operation),
            content,
        }
    }
}

impl From<Envelope> for EnvelopeWire {
    fn from(envelope: Envelope) -> Self {
        let (content, content_data) = match envelope.content {
            Content::Empty => (None, None),
            Content::Bytes(bytes) => (None, Some(bytes.to_vec())),
            Content::Json(value) => (Some(value), None),
        };
        EnvelopeWire {
            id: envelope.id,
            parent_id: envelope.parent_id,
            timestamp: envelope.timestamp,
            source: envelope.route.source,
            group: envelope.route.group,
            resource: envelope.route.resource,
            operation: envelope.route.operation,
            content,
            content_data,
        }
    }
}
