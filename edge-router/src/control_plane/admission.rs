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

//! Admission review callbacks for rules and rule endpoints.
//!
//! The webhook server itself lives outside the router; it hands the raw
//! review body to [`admit_rule`] or [`admit_rule_endpoint`] and writes back
//! the returned review.

use crate::control_plane::validator::{self, RuleCatalog};
use crate::error::ValidationError;
use crate::model::{Rule, RuleEndpoint};
use crate::observability::events;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const COMPONENT: &str = "admission";

pub const UNSUPPORTED_OPERATION: &str = "Unsupported webhook operation!";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub object: serde_json::Value,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AdmissionStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AdmissionStatus {
    pub message: String,
}

impl AdmissionResponse {
    pub fn allow(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            allowed: true,
            result: None,
        }
    }

    pub fn deny(uid: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        info!(
            event = events::ADMISSION_DENIED,
            component = COMPONENT,
            uid,
            message = message.as_str(),
            "admission denied"
        );
        Self {
            uid: uid.to_string(),
            allowed: false,
            result: Some(AdmissionStatus { message }),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.result.as_ref().map(|status| status.message.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

impl Operation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Operation::Create),
            "UPDATE" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            "CONNECT" => Some(Operation::Connect),
            _ => None,
        }
    }
}

/// Outcome of decoding a review: either a decision or an object to validate.
enum Triage<T> {
    Validate { uid: String, object: T },
    Decided(AdmissionResponse),
}

fn triage<T: DeserializeOwned>(body: &[u8]) -> Triage<T> {
    let request = match serde_json::from_slice::<AdmissionReview>(body) {
        Ok(AdmissionReview {
            request: Some(request),
            ..
        }) => request,
        Ok(_) => {
            return Triage::Decided(AdmissionResponse::deny(
                "",
                "admission review has no request",
            ))
        }
        Err(err) => return Triage::Decided(AdmissionResponse::deny("", err.to_string())),
    };
    let uid = request.uid;

    match Operation::parse(&request.operation) {
        Some(Operation::Create | Operation::Update) => {
            match serde_json::from_value::<T>(request.object) {
                Ok(object) => Triage::Validate { uid, object },
                Err(err) => Triage::Decided(AdmissionResponse::deny(&uid, err.to_string())),
            }
        }
        Some(Operation::Delete | Operation::Connect) => {
            Triage::Decided(AdmissionResponse::allow(&uid))
        }
        None => {
            debug!(
                component = COMPONENT,
                uid = uid.as_str(),
                operation = request.operation.as_str(),
                "unsupported admission operation"
            );
            Triage::Decided(AdmissionResponse::deny(&uid, UNSUPPORTED_OPERATION))
        }
    }
}

fn decide(uid: &str, outcome: Result<(), ValidationError>) -> AdmissionResponse {
    match outcome {
        Ok(()) => AdmissionResponse::allow(uid),
        Err(err) => AdmissionResponse::deny(uid, err.to_string()),
    }
}

fn respond(response: AdmissionResponse) -> AdmissionReview {
    AdmissionReview {
        api_version: "admission.k8s.io/v1".to_string(),
        kind: "AdmissionReview".to_string(),
        request: None,
        response: Some(response),
    }
}

pub async fn admit_rule(catalog: &dyn RuleCatalog, body: &[u8]) -> AdmissionReview {
    let response = match triage::<Rule>(body) {
        Triage::Validate { uid, object } => {
            decide(&uid, validator::validate_rule(catalog, &object).await)
        }
        Triage::Decided(response) => response,
    };
    respond(response)
}

pub async fn admit_rule_endpoint(catalog: &dyn RuleCatalog, body: &[u8]) -> AdmissionReview {
    let response = match triage::<RuleEndpoint>(body) {
        Triage::Validate { uid, object } => {
            decide(&uid, validator::validate_rule_endpoint(catalog, &object).await)
        }
        Triage::Decided(response) => response,
    };
    respond(response)
}
