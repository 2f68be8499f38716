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

//! Rule and RuleEndpoint records in their persisted form.

use crate::observability::fields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const KEY_PATH: &str = "path";
pub const KEY_TOPIC: &str = "topic";
pub const KEY_NODE_NAME: &str = "node_name";
pub const KEY_RESOURCE: &str = "resource";
pub const KEY_SERVICE_PORT: &str = "service_port";

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Rest,
    EventBus,
    ServiceBus,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Rest => "rest",
            EndpointKind::EventBus => "eventbus",
            EndpointKind::ServiceBus => "servicebus",
        }
    }

    /// Whether a rule may forward from `source` to `target`.
    pub fn is_legal_pair(source: EndpointKind, target: EndpointKind) -> bool {
        matches!(
            (source, target),
            (EndpointKind::Rest, EndpointKind::EventBus)
                | (EndpointKind::Rest, EndpointKind::ServiceBus)
                | (EndpointKind::EventBus, EndpointKind::Rest)
        )
    }
}

impl Display for EndpointKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rest" => Ok(EndpointKind::Rest),
            "eventbus" => Ok(EndpointKind::EventBus),
            "servicebus" => Ok(EndpointKind::ServiceBus),
            other => Err(format!("unknown rule endpoint type {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEndpointSpec {
    pub rule_endpoint_type: EndpointKind,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RuleEndpoint {
    pub metadata: ObjectMeta,
    pub spec: RuleEndpointSpec,
}

impl RuleEndpoint {
    pub fn new(namespace: &str, name: &str, kind: EndpointKind) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            spec: RuleEndpointSpec {
                rule_endpoint_type: kind,
                properties: BTreeMap::new(),
            },
        }
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.spec
            .properties
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn kind(&self) -> EndpointKind {
        self.spec.rule_endpoint_type
    }

    pub fn key(&self) -> String {
        fields::format_object_key(&self.metadata.namespace, &self.metadata.name)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.spec.properties.get(key).map(String::as_str)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    pub source: String,
    #[serde(default)]
    pub source_resource: BTreeMap<String, String>,
    pub target: String,
    #[serde(default)]
    pub target_resource: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Rule {
    pub metadata: ObjectMeta,
    pub spec: RuleSpec,
}

impl Rule {
    pub fn new(namespace: &str, name: &str, source: &str, target: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            spec: RuleSpec {
                source: source.to_string(),
                source_resource: BTreeMap::new(),
                target: target.to_string(),
                target_resource: BTreeMap::new(),
            },
        }
    }

    pub fn with_source_resource(mut self, key: &str, value: &str) -> Self {
        self.spec
            .source_resource
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_target_resource(mut self, key: &str, value: &str) -> Self {
        self.spec
            .target_resource
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn key(&self) -> String {
        fields::format_object_key(&self.metadata.namespace, &self.metadata.name)
    }

    pub fn source_property(&self, key: &str) -> Option<&str> {
        self.spec.source_resource.get(key).map(String::as_str)
    }

    pub fn target_property(&self, key: &str) -> Option<&str> {
        self.spec.target_resource.get(key).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecStatus {
    Success,
    Fail,
}

/// Outcome of one rule dispatch, fed to the status aggregator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub rule_id: String,
    pub namespace: String,
    pub status: ExecStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}
