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

//! Hub transport seam and the in-process channel hub.

use crate::envelope::Envelope;
use crate::error::RouterError;
use crate::observability::{events, fields};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "channel_hub";

/// Process-internal bus used to reach the edge hub.
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Enqueues `envelope` for the hub module without waiting for capacity.
    async fn send(&self, envelope: Envelope) -> Result<(), RouterError>;

    /// Waits for the next envelope addressed to `module`.
    async fn receive(&self, module: &str) -> Result<Envelope, RouterError>;
}

struct ModuleQueue {
    sender: mpsc::Sender<Envelope>,
    receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
}

impl ModuleQueue {
    fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }
}

/// Bounded per-module queues keyed by module name.
pub struct ChannelHub {
    hub_module: String,
    capacity: usize,
    queues: DashMap<String, ModuleQueue>,
    shutdown: CancellationToken,
}

impl ChannelHub {
    /// Creates a hub whose outbound queue is `hub_module`.
    pub fn new(hub_module: &str, capacity: usize) -> Self {
        let hub = Self {
            hub_module: hub_module.to_string(),
            capacity,
            queues: DashMap::new(),
            shutdown: CancellationToken::new(),
        };
        hub.add_module(hub_module);
        hub
    }

    /// Registers a module queue. Re-adding an existing module keeps its queue.
    pub fn add_module(&self, module: &str) {
        self.queues
            .entry(module.to_string())
            .or_insert_with(|| ModuleQueue::new(self.capacity));
    }

    pub fn hub_module(&self) -> &str {
        &self.hub_module
    }

    /// Enqueues `envelope` for `module`.
    pub fn send_to(&self, module: &str, envelope: Envelope) -> Result<(), RouterError> {
        if self.shutdown.is_cancelled() {
            return Err(RouterError::Shutdown);
        }

        let sender = self
            .queues
            .get(module)
            .map(|queue| queue.sender.clone())
            .ok_or_else(|| RouterError::Hub(format!("module {module} is not registered")))?;

        sender.try_send(envelope).map_err(|err| {
            let reason = match &err {
                mpsc::error::TrySendError::Full(_) => fields::REASON_CHANNEL_FULL,
                mpsc::error::TrySendError::Closed(_) => fields::REASON_CHANNEL_CLOSED,
            };
            warn!(
                event = events::HUB_SEND_FAILED,
                component = COMPONENT,
                module,
                reason,
                "unable to enqueue envelope"
            );
            RouterError::Hub(format!("module {module}: {reason}"))
        })
    }

    /// Stops every pending and future `receive`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl HubTransport for ChannelHub {
    async fn send(&self, envelope: Envelope) -> Result<(), RouterError> {
        self.send_to(&self.hub_module, envelope)
    }

    async fn receive(&self, module: &str) -> Result<Envelope, RouterError> {
        let receiver = self
            .queues
            .get(module)
            .map(|queue| Arc::clone(&queue.receiver))
            .ok_or_else(|| RouterError::Hub(format!("module {module} is not registered")))?;

        let mut receiver = receiver.lock().await;
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(RouterError::Shutdown),
            received = receiver.recv() => match received {
                Some(envelope) => {
                    debug!(
                        event = events::HUB_RECEIVE,
                        component = COMPONENT,
                        module,
                        msg_id = envelope.id(),
                        parent_id = fields::format_parent_id(&envelope),
                        route = %fields::format_route(&envelope),
                        "received envelope"
                    );
                    Ok(envelope)
                }
                None => Err(RouterError::Shutdown),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Route, GROUP_USER, OP_PUBLISH};

    fn envelope() -> Envelope {
        Envelope::new(Route::new("router_eventbus", GROUP_USER, "node/n/t", OP_PUBLISH)).build()
    }

    #[tokio::test]
    async fn send_reaches_the_hub_module() {
        let hub = ChannelHub::new("cloudhub", 4);
        let sent = envelope();

        hub.send(sent.clone()).await.unwrap();
        assert_eq!(hub.receive("cloudhub").await.unwrap(), sent);
    }

    #[tokio::test]
    async fn full_queue_fails_fast() {
        let hub = ChannelHub::new("cloudhub", 1);

        hub.send(envelope()).await.unwrap();
        assert!(matches!(hub.send(envelope()).await, Err(RouterError::Hub(_))));
    }

    #[tokio::test]
    async fn unknown_module_is_an_error() {
        let hub = ChannelHub::new("cloudhub", 1);

        assert!(hub.send_to("router", envelope()).is_err());
        assert!(hub.receive("router").await.is_err());
    }

    #[tokio::test]
    async fn shutdown_unblocks_receivers() {
        let hub = Arc::new(ChannelHub::new("cloudhub", 1));
        hub.add_module("router");

        let waiting = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.receive("router").await })
        };
        hub.shutdown();

        assert!(matches!(
            waiting.await.unwrap(),
            Err(RouterError::Shutdown)
        ));
    }
}
