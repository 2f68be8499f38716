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

//! Router error taxonomy.
//!
//! Every failure the router surfaces is a [`RouterError`]; callers branch on
//! [`RouterError::kind`] instead of matching individual variants. Admission-time
//! failures use [`ValidationError`], whose `Display` output is the user-visible
//! denial message.

use thiserror::Error;

/// Abstract error classes used for retry and reporting decisions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    Validation,
    Transient,
    Configuration,
    Dispatch,
    Timeout,
    Cancelled,
    Decode,
    Hub,
    Fatal,
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("rule endpoint {namespace}/{name} not found")]
    EndpointNotFound { namespace: String, name: String },

    #[error("rule {0} not found")]
    RuleNotFound(String),

    #[error("rule {0} already exists")]
    RuleExists(String),

    #[error("source {source_key} of rule {rule} is already used by rule {owner}")]
    SourceInUse {
        rule: String,
        owner: String,
        source_key: String,
    },

    #[error("source type {0} is not supported")]
    UnsupportedSource(String),

    #[error("target type {0} is not supported")]
    UnsupportedTarget(String),

    #[error(
        "the rule which is from source ruleEndpoint type {source_kind} to target ruleEndpoint type {target_kind} is not validate"
    )]
    IllegalPair {
        source_kind: String,
        target_kind: String,
    },

    #[error("\"{key}\" property missed in {section}")]
    MissingResource {
        key: &'static str,
        section: &'static str,
    },

    #[error("invalid path template {template:?}: {reason}")]
    InvalidPathTemplate { template: String, reason: String },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("{0}")]
    Dispatch(String),

    #[error("timeout")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("hub: {0}")]
    Hub(String),

    #[error("router is shutting down")]
    Shutdown,

    #[error("failed to bind rest listener on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouterError::EndpointNotFound { .. } => ErrorKind::Transient,
            RouterError::RuleNotFound(_)
            | RouterError::RuleExists(_)
            | RouterError::SourceInUse { .. }
            | RouterError::UnsupportedSource(_)
            | RouterError::UnsupportedTarget(_)
            | RouterError::IllegalPair { .. }
            | RouterError::MissingResource { .. }
            | RouterError::InvalidPathTemplate { .. }
            | RouterError::Config(_) => ErrorKind::Configuration,
            RouterError::Decode(_) => ErrorKind::Decode,
            RouterError::Dispatch(_) => ErrorKind::Dispatch,
            RouterError::Timeout => ErrorKind::Timeout,
            RouterError::Cancelled => ErrorKind::Cancelled,
            RouterError::Hub(_) | RouterError::Shutdown => ErrorKind::Hub,
            RouterError::Bind { .. } => ErrorKind::Fatal,
            RouterError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Only transient wire-up failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Admission-time rule validation failures.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValidationError {
    #[error("source ruleEndpoint {namespace}/{name} has not been created")]
    SourceEndpointMissing { namespace: String, name: String },

    #[error("cant get source ruleEndpoint {namespace}/{name}: {reason}")]
    SourceEndpointUnavailable {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("\"{0}\" property missed in sourceResource")]
    MissingSourceProperty(&'static str),

    #[error("source properties exist in Rule {namespace}/{name}. Path: {path}")]
    SourcePathInUse {
        namespace: String,
        name: String,
        path: String,
    },

    #[error(
        "source properties exist in Rule {namespace}/{name}. Node_name: {node_name}, topic: {topic}"
    )]
    SourceTopicInUse {
        namespace: String,
        name: String,
        node_name: String,
        topic: String,
    },

    #[error("target ruleEndpoint {namespace}/{name} has not been created")]
    TargetEndpointMissing { namespace: String, name: String },

    #[error("cant get target ruleEndpoint {namespace}/{name}: {reason}")]
    TargetEndpointUnavailable {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("\"{0}\" property missed in targetResource")]
    MissingTargetProperty(&'static str),

    #[error(
        "the rule which is from source ruleEndpoint type {source_kind} to target ruleEndpoint type {target_kind} is not validate"
    )]
    IllegalPair {
        source_kind: String,
        target_kind: String,
    },

    #[error("\"service_port\" property missed in property when ruleEndpoint is \"servicebus\"")]
    MissingServicePort,

    #[error("{0} type rule endpoint can only create one in one namespace")]
    DuplicateEndpointKind(String),

    /// Catalog failures are surfaced verbatim.
    #[error("{0}")]
    Catalog(String),
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RouterError, ValidationError};

    #[test]
    fn only_missing_endpoints_are_transient() {
        let missing = RouterError::EndpointNotFound {
            namespace: "default".to_string(),
            name: "a".to_string(),
        };
        assert!(missing.is_transient());

        let illegal = RouterError::IllegalPair {
            source_kind: "servicebus".to_string(),
            target_kind: "rest".to_string(),
        };
        assert!(!illegal.is_transient());
        assert_eq!(illegal.kind(), ErrorKind::Configuration);
        assert!(!RouterError::Timeout.is_transient());
    }

    #[test]
    fn validation_messages_match_admission_contract() {
        let in_use = ValidationError::SourcePathInUse {
            namespace: "default".to_string(),
            name: "r1".to_string(),
            path: "/x".to_string(),
        };
        assert_eq!(
            in_use.to_string(),
            "source properties exist in Rule default/r1. Path: /x"
        );
        assert_eq!(
            ValidationError::MissingSourceProperty("node_name").to_string(),
            "\"node_name\" property missed in sourceResource"
        );

        let wrapped: RouterError = in_use.into();
        assert_eq!(wrapped.kind(), ErrorKind::Validation);
    }
}
