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

//! Status aggregation for rule execution results.
//!
//! A single [`StatusAggregator`] loop owns all counters. Producers hold cheap
//! [`StatusSender`] clones and never block: when the channel is full the result
//! is dropped and counted.

use crate::config::StatusConfig;
use crate::data_plane::hub::HubTransport;
use crate::envelope::{
    now_millis, Envelope, Route, GROUP_USER, OP_UPDATE, RESOURCE_RULE_STATUS, SOURCE_ROUTER,
};
use crate::model::{ExecResult, ExecStatus};
use crate::observability::{events, fields};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "status_aggregator";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RuleCounters {
    pub success: u64,
    pub fail: u64,
}

/// Aggregate handed to a [`StatusReporter`] on every flush.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub rule_status: BTreeMap<String, RuleCounters>,
    pub error_samples: Vec<ExecResult>,
    pub dropped: u64,
}

impl StatusReport {
    pub fn is_empty(&self) -> bool {
        self.rule_status.is_empty() && self.error_samples.is_empty() && self.dropped == 0
    }
}

#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, report: StatusReport);
}

/// Discards every report.
pub struct NoopReporter;

#[async_trait]
impl StatusReporter for NoopReporter {
    async fn report(&self, _report: StatusReport) {}
}

/// Publishes reports to the hub as `rulestatus` envelopes.
pub struct HubStatusReporter {
    transport: Arc<dyn HubTransport>,
}

impl HubStatusReporter {
    pub fn new(transport: Arc<dyn HubTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl StatusReporter for HubStatusReporter {
    async fn report(&self, report: StatusReport) {
        let route = Route::new(SOURCE_ROUTER, GROUP_USER, RESOURCE_RULE_STATUS, OP_UPDATE);
        let sent = match Envelope::new(route).json(&report) {
            Ok(builder) => self.transport.send(builder.build()).await,
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            warn!(
                event = events::HUB_SEND_FAILED,
                component = COMPONENT,
                err = %err,
                "unable to publish rule status report"
            );
        }
    }
}

#[derive(Clone)]
pub struct StatusSender {
    sender: mpsc::Sender<ExecResult>,
    dropped: Arc<AtomicU64>,
}

impl StatusSender {
    /// Queues `result` without waiting. Returns `false` when it was dropped.
    pub fn post(&self, result: ExecResult) -> bool {
        match self.sender.try_send(result) {
            Ok(()) => true,
            Err(err) => {
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => fields::REASON_CHANNEL_FULL,
                    mpsc::error::TrySendError::Closed(_) => fields::REASON_CHANNEL_CLOSED,
                };
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    event = events::STATUS_RESULT_DROPPED,
                    component = COMPONENT,
                    reason,
                    dropped,
                    "dropping rule execution result"
                );
                false
            }
        }
    }

    pub fn success(&self, rule_id: &str, namespace: &str) -> bool {
        self.post(exec_result(rule_id, namespace, ExecStatus::Success, None))
    }

    pub fn fail(&self, rule_id: &str, namespace: &str, error: impl Into<String>) -> bool {
        self.post(exec_result(
            rule_id,
            namespace,
            ExecStatus::Fail,
            Some(error.into()),
        ))
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn exec_result(
    rule_id: &str,
    namespace: &str,
    status: ExecStatus,
    error: Option<String>,
) -> ExecResult {
    ExecResult {
        rule_id: rule_id.to_string(),
        namespace: namespace.to_string(),
        status,
        error,
        timestamp: now_millis(),
    }
}

pub struct StatusAggregator {
    receiver: mpsc::Receiver<ExecResult>,
    dropped: Arc<AtomicU64>,
    reporter: Arc<dyn StatusReporter>,
    flush_interval: Duration,
    max_error_samples: usize,
    report: StatusReport,
    reported_dropped: u64,
}

/// Creates the producer handle and the aggregator that drains it.
pub fn channel(
    config: &StatusConfig,
    reporter: Arc<dyn StatusReporter>,
) -> (StatusSender, StatusAggregator) {
    let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        StatusSender {
            sender,
            dropped: Arc::clone(&dropped),
        },
        StatusAggregator {
            receiver,
            dropped,
            reporter,
            flush_interval: Duration::from_secs(config.flush_interval_secs.max(1)),
            max_error_samples: config.max_error_samples.max(1),
            report: StatusReport::default(),
            reported_dropped: 0,
        },
    )
}

impl StatusAggregator {
    #[cfg(test)]
    pub(crate) async fn next_result(&mut self) -> Option<ExecResult> {
        self.receiver.recv().await
    }

    fn record(&mut self, result: ExecResult) {
        let counters = self
            .report
            .rule_status
            .entry(fields::format_object_key(&result.namespace, &result.rule_id))
            .or_default();
        match result.status {
            ExecStatus::Success => counters.success += 1,
            ExecStatus::Fail => {
                counters.fail += 1;
                self.report.error_samples.push(result);
            }
        }
    }

    async fn flush(&mut self, reason: &'static str) {
        let dropped_total = self.dropped.load(Ordering::Relaxed);
        self.report.dropped = dropped_total - self.reported_dropped;
        if self.report.is_empty() {
            return;
        }
        self.reported_dropped = dropped_total;

        let report = std::mem::take(&mut self.report);
        info!(
            event = events::STATUS_FLUSH,
            component = COMPONENT,
            reason,
            rules = report.rule_status.len(),
            error_samples = report.error_samples.len(),
            dropped = report.dropped,
            "flushing rule status"
        );
        self.reporter.report(report).await;
    }

    /// Runs until `stop` fires or every sender is gone, flushing one last time.
    pub async fn run(mut self, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    while let Ok(result) = self.receiver.try_recv() {
                        self.record(result);
                    }
                    break;
                }
                received = self.receiver.recv() => match received {
                    Some(result) => {
                        self.record(result);
                        if self.report.error_samples.len() >= self.max_error_samples {
                            self.flush(fields::REASON_SAMPLE_LIMIT).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.flush(fields::REASON_PERIODIC).await,
            }
        }

        self.flush(fields::REASON_FINAL).await;
        info!(
            event = events::STATUS_AGGREGATOR_STOP,
            component = COMPONENT,
            "status aggregator stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        reports: Mutex<Vec<StatusReport>>,
    }

    #[async_trait]
    impl StatusReporter for Collecting {
        async fn report(&self, report: StatusReport) {
            self.reports.lock().await.push(report);
        }
    }

    fn config(capacity: usize, samples: usize) -> StatusConfig {
        StatusConfig {
            channel_capacity: capacity,
            flush_interval_secs: 30,
            max_error_samples: samples,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_flush_reports_counts_and_resets() {
        let reporter = Arc::new(Collecting::default());
        let (sender, aggregator) = channel(&config(16, 50), reporter.clone());
        let stop = CancellationToken::new();
        let task = tokio::spawn(aggregator.run(stop.clone()));

        sender.success("r1", "default");
        sender.success("r1", "default");
        sender.fail("r1", "default", "boom");
        tokio::time::sleep(Duration::from_secs(31)).await;

        {
            let reports = reporter.reports.lock().await;
            assert_eq!(reports.len(), 1);
            let counters = reports[0].rule_status["default/r1"];
            assert_eq!(counters, RuleCounters { success: 2, fail: 1 });
            assert_eq!(reports[0].error_samples.len(), 1);
        }

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(reporter.reports.lock().await.len(), 1);

        stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn error_sample_limit_triggers_flush() {
        let reporter = Arc::new(Collecting::default());
        let (sender, aggregator) = channel(&config(16, 2), reporter.clone());
        let stop = CancellationToken::new();
        let task = tokio::spawn(aggregator.run(stop.clone()));

        sender.fail("r1", "default", "a");
        sender.fail("r2", "default", "b");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(reporter.reports.lock().await[0].error_samples.len(), 2);

        stop.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn full_channel_drops_and_counts_without_blocking() {
        let reporter = Arc::new(Collecting::default());
        let (sender, aggregator) = channel(&config(1, 50), reporter.clone());

        assert!(sender.success("r1", "default"));
        assert!(!sender.success("r1", "default"));
        assert_eq!(sender.dropped(), 1);

        drop(sender);
        aggregator.run(CancellationToken::new()).await;

        let reports = reporter.reports.lock().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].dropped, 1);
        assert_eq!(reports[0].rule_status["default/r1"].success, 1);
    }
}
