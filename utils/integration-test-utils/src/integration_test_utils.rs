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


use async_trait::async_trait;
use edge_router::{ChannelHub, StatusReport, StatusReporter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber once per test binary. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Hub with the router module attached; `cloudhub` plays the edge side.
pub fn edge_hub(capacity: usize) -> Arc<ChannelHub> {
    let hub = Arc::new(ChannelHub::new("cloudhub", capacity));
    hub.add_module("router");
    hub
}

/// Polls `check` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Keeps every report it receives.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<StatusReport>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().await.clone()
    }

    /// Sums success and failure counts for `namespace/name` over all reports.
    pub async fn totals(&self, key: &str) -> (u64, u64) {
        self.reports
            .lock()
            .await
            .iter()
            .filter_map(|report| report.rule_status.get(key))
            .fold((0, 0), |(success, fail), counters| {
                (success + counters.success, fail + counters.fail)
            })
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report(&self, report: StatusReport) {
        self.reports.lock().await.push(report);
    }
}
