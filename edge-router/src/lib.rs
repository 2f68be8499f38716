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

//! # edge-router
//!
//! `edge-router` moves messages between cloud REST endpoints and edge-node
//! event and service buses according to user-defined rules.
//!
//! A [`Rule`] ties a source [`RuleEndpoint`] to a target one. REST sources are
//! served by a single HTTP listener; event-bus sources subscribe to a topic on
//! an edge node through the hub. Every rule execution reports a success or a
//! failure to the status aggregator.
//!
//! ```
//! use std::sync::Arc;
//! use edge_router::{ChannelHub, EdgeRouter, EndpointKind, NoopReporter, RouterConfig, Rule, RuleEndpoint};
//! use edge_router::model::{KEY_NODE_NAME, KEY_RESOURCE, KEY_TOPIC};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let hub = Arc::new(ChannelHub::new("cloudhub", 64));
//! hub.add_module("router");
//! let router = EdgeRouter::new(RouterConfig::default(), hub, Arc::new(NoopReporter));
//! router.start().await;
//!
//! let store = router.store();
//! store.add_endpoint(RuleEndpoint::new("default", "bus", EndpointKind::EventBus));
//! store.add_endpoint(RuleEndpoint::new("default", "rest", EndpointKind::Rest));
//!
//! let rule = Rule::new("default", "telemetry", "bus", "rest")
//!     .with_source_resource(KEY_NODE_NAME, "edge-1")
//!     .with_source_resource(KEY_TOPIC, "telemetry")
//!     .with_target_resource(KEY_RESOURCE, "http://127.0.0.1:8080/ingest");
//! store.add_rule_with_retry(&rule).await.unwrap();
//!
//! // A second rule on the same topic would be rejected at admission time.
//! store.delete_rule("default", "telemetry").await.unwrap();
//! router.shutdown().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Control plane: rule validation, admission, storage, controller feed
//! - Routing: URL template compilation and most-specific selection
//! - Data plane: hub gateway, correlation table, REST ingress, dispatch
//! - Providers: `rest`, `eventbus` and `servicebus` endpoint adapters
//! - Runtime: status aggregation
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with canonical names from
//! `observability::events` and never installs a subscriber. Binaries and
//! tests initialize `tracing_subscriber` once at the process boundary.

pub mod config;
pub mod control_plane;
pub mod data_plane;
pub mod envelope;
pub mod error;
pub mod model;
mod observability;
pub mod providers;
mod router;
pub mod routing;
pub mod runtime;

pub use config::{configured, init_configure, RetryConfig, RouterConfig, StatusConfig};
pub use control_plane::admission::{
    admit_rule, admit_rule_endpoint, AdmissionResponse, AdmissionReview,
};
pub use control_plane::rule_store::{RuleState, RuleStore};
pub use control_plane::validator::{validate_rule, validate_rule_endpoint, RuleCatalog};
pub use data_plane::hub::{ChannelHub, HubTransport};
pub use envelope::{Content, Envelope, Route};
pub use error::{ErrorKind, RouterError, ValidationError};
pub use model::{EndpointKind, ExecResult, ExecStatus, Rule, RuleEndpoint};
pub use router::EdgeRouter;
pub use runtime::status_aggregator::{
    HubStatusReporter, NoopReporter, RuleCounters, StatusReport, StatusReporter,
};
