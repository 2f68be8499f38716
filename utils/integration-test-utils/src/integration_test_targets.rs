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


use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::Router;
use http::{HeaderMap, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// HTTP endpoint standing in for a REST rule target.
pub struct RecordingTarget {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingTarget {
    /// Serves `POST /ingest`, answering every call with `status` and `reply`.
    pub async fn start(status: StatusCode, reply: &'static str) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/ingest",
                post(
                    move |State(calls): State<Arc<Mutex<Vec<RecordedCall>>>>,
                          headers: HeaderMap,
                          body: Bytes| async move {
                        calls.lock().await.push(RecordedCall { headers, body });
                        (status, reply)
                    },
                ),
            )
            .with_state(Arc::clone(&calls));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("test target should bind");
        let addr = listener.local_addr().expect("test target has an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, calls }
    }

    pub fn url(&self) -> String {
        format!("http://{}/ingest", self.addr)
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}
