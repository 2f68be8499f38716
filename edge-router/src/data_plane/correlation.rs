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

//! Correlation table pairing outstanding requests with their hub replies.

use crate::envelope::Envelope;
use crate::error::RouterError;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Concurrent `message id -> one-shot sink` map.
///
/// Individual operations are atomic and never wait on another writer.
#[derive(Default)]
pub struct CorrelationTable {
    entries: DashMap<String, oneshot::Sender<Envelope>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a sink for `id`, replacing any previous one.
    pub fn set(&self, id: impl Into<String>, sink: oneshot::Sender<Envelope>) {
        self.entries.insert(id.into(), sink);
    }

    /// Evicts `id`. Returns `true` when an entry was present.
    pub fn del(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Delivers `reply` to the sink for `id` and evicts it.
    ///
    /// Returns `false` when no entry exists or the waiter already gave up; the
    /// reply is dropped in both cases.
    pub fn complete(&self, id: &str, reply: Envelope) -> bool {
        match self.entries.remove(id) {
            Some((_, sink)) => sink.send(reply).is_ok(),
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installs an entry for `id` and returns the guard that waits on it.
    pub fn register(self: &Arc<Self>, id: impl Into<String>) -> PendingReply {
        let id = id.into();
        let (sink, receiver) = oneshot::channel();
        self.set(id.clone(), sink);
        PendingReply {
            id,
            table: Arc::clone(self),
            receiver,
        }
    }
}

/// Waiting side of a correlation entry. Dropping it evicts the entry.
pub struct PendingReply {
    id: String,
    table: Arc<CorrelationTable>,
    receiver: oneshot::Receiver<Envelope>,
}

impl PendingReply {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the reply. Fails when the entry was evicted without one.
    pub async fn recv(&mut self) -> Result<Envelope, RouterError> {
        (&mut self.receiver)
            .await
            .map_err(|_| RouterError::Cancelled)
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.receiver.close();
        // Only evict our own sink; a later registration under the same id stays.
        self.table
            .entries
            .remove_if(&self.id, |_, sink| sink.is_closed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Route, GROUP_USER, OP_RESPONSE};

    fn reply_for(id: &str) -> Envelope {
        Envelope::new(Route::new("edge", GROUP_USER, "node/n/t", OP_RESPONSE))
            .parent_id(id)
            .build()
    }

    #[tokio::test]
    async fn complete_delivers_once_and_evicts() {
        let table = Arc::new(CorrelationTable::new());
        let mut pending = table.register("m1");
        assert!(table.contains("m1"));

        assert!(table.complete("m1", reply_for("m1")));
        assert!(!table.contains("m1"));
        assert_eq!(pending.recv().await.unwrap().parent_id(), "m1");

        assert!(!table.complete("m1", reply_for("m1")));
    }

    #[tokio::test]
    async fn dropping_the_guard_evicts_the_entry() {
        let table = Arc::new(CorrelationTable::new());
        {
            let _pending = table.register("m2");
            assert_eq!(table.len(), 1);
        }
        assert!(table.is_empty());
        assert!(!table.complete("m2", reply_for("m2")));
    }

    #[tokio::test]
    async fn del_wakes_the_waiter_with_cancellation() {
        let table = Arc::new(CorrelationTable::new());
        let mut pending = table.register("m3");

        assert!(table.del("m3"));
        assert!(matches!(pending.recv().await, Err(RouterError::Cancelled)));
        assert!(!table.del("m3"));
    }

    #[tokio::test]
    async fn stale_guard_does_not_evict_newer_registration() {
        let table = Arc::new(CorrelationTable::new());
        let stale = table.register("m4");
        let mut fresh = table.register("m4");

        drop(stale);
        assert!(table.contains("m4"));
        assert!(table.complete("m4", reply_for("m4")));
        assert!(fresh.recv().await.is_ok());
    }
}
